//! BIP32 扩展密钥派生（特权进程内执行）
//!
//! secp256k1 币种的派生在本进程完成；ed25519 币种交给 coin SDK。

use coins_bip32::prelude::{MainnetEncoder, Parent, TestnetEncoder, XKeyEncoder};
use sha2::{Digest, Sha256};

use crate::domain::SecretString;

/// 种子派生路径的固定前缀
pub const SEED_PATH_PREFIX: &str = "m/999999";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DerivationError {
    #[error("key is not a BIP32 extended key")]
    InvalidKey,
    #[error("invalid derivation path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("seed must not be empty")]
    EmptySeed,
    #[error("failed to encode derived key: {0}")]
    Encoding(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Network {
    Mainnet,
    Testnet,
}

/// 种子 → `m/999999/<a>/<b>`
///
/// a、b 取 sha256(sha256(seed)) 十六进制的前两段 7 位。
pub fn seed_derivation_path(seed: &str) -> Result<String, DerivationError> {
    if seed.is_empty() {
        return Err(DerivationError::EmptySeed);
    }
    let digest = hex::encode(Sha256::digest(Sha256::digest(seed.as_bytes())));
    // 7 个十六进制位 < 2^28，不会越过 hardened 边界
    let first = u32::from_str_radix(&digest[0..7], 16).map_err(|e| DerivationError::InvalidPath {
        path: SEED_PATH_PREFIX.to_string(),
        reason: e.to_string(),
    })?;
    let second = u32::from_str_radix(&digest[7..14], 16).map_err(|e| DerivationError::InvalidPath {
        path: SEED_PATH_PREFIX.to_string(),
        reason: e.to_string(),
    })?;
    Ok(format!("{}/{}/{}", SEED_PATH_PREFIX, first, second))
}

/// 本地 BIP32 派生器
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyDeriver;

impl KeyDeriver {
    pub fn new() -> Self {
        Self
    }

    /// 按路径派生：私钥得到私钥，公钥得到公钥，网络前缀保持不变
    pub fn derive_by_path(&self, key: &SecretString, path: &str) -> Result<SecretString, DerivationError> {
        let key = key.expose().trim();
        let network = match key.get(..1) {
            Some("x") => Network::Mainnet,
            Some("t") => Network::Testnet,
            _ => return Err(DerivationError::InvalidKey),
        };
        let is_private = key.get(1..4) == Some("prv");

        let invalid_path = |e: coins_bip32::Bip32Error| DerivationError::InvalidPath {
            path: path.to_string(),
            reason: e.to_string(),
        };
        let encoding = |e: coins_bip32::Bip32Error| DerivationError::Encoding(e.to_string());

        let derived = match (network, is_private) {
            (Network::Mainnet, true) => {
                let xpriv = MainnetEncoder::xpriv_from_base58(key).map_err(|_| DerivationError::InvalidKey)?;
                let child = xpriv.derive_path(path).map_err(invalid_path)?;
                MainnetEncoder::xpriv_to_base58(&child).map_err(encoding)?
            }
            (Network::Mainnet, false) => {
                let xpub = MainnetEncoder::xpub_from_base58(key).map_err(|_| DerivationError::InvalidKey)?;
                let child = Parent::derive_path(&xpub, path).map_err(invalid_path)?;
                MainnetEncoder::xpub_to_base58(&child).map_err(encoding)?
            }
            (Network::Testnet, true) => {
                let xpriv = TestnetEncoder::xpriv_from_base58(key).map_err(|_| DerivationError::InvalidKey)?;
                let child = xpriv.derive_path(path).map_err(invalid_path)?;
                TestnetEncoder::xpriv_to_base58(&child).map_err(encoding)?
            }
            (Network::Testnet, false) => {
                let xpub = TestnetEncoder::xpub_from_base58(key).map_err(|_| DerivationError::InvalidKey)?;
                let child = Parent::derive_path(&xpub, path).map_err(invalid_path)?;
                TestnetEncoder::xpub_to_base58(&child).map_err(encoding)?
            }
        };

        Ok(SecretString::new(derived))
    }

    /// 按种子派生，返回 (派生后的密钥, 实际路径)
    pub fn derive_by_seed(
        &self,
        key: &SecretString,
        seed: &SecretString,
    ) -> Result<(SecretString, String), DerivationError> {
        let path = seed_derivation_path(seed.expose())?;
        let derived = self.derive_by_path(key, &path)?;
        Ok((derived, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coins_bip32::prelude::XPriv;

    const MASTER_XPRV: &str = "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi";

    fn master_xpub() -> String {
        let xpriv: XPriv = MainnetEncoder::xpriv_from_base58(MASTER_XPRV).unwrap();
        MainnetEncoder::xpub_to_base58(&xpriv.verify_key()).unwrap()
    }

    #[test]
    fn test_private_and_public_derivation_agree() {
        let deriver = KeyDeriver::new();
        let child_prv = deriver
            .derive_by_path(&MASTER_XPRV.into(), "m/0/1/2")
            .unwrap();
        let child_pub = deriver
            .derive_by_path(&master_xpub().into(), "m/0/1/2")
            .unwrap();

        assert!(child_prv.expose().starts_with("xprv"));
        assert!(child_pub.expose().starts_with("xpub"));

        let child_xpriv = MainnetEncoder::xpriv_from_base58(child_prv.expose()).unwrap();
        let expected_pub = MainnetEncoder::xpub_to_base58(&child_xpriv.verify_key()).unwrap();
        assert_eq!(child_pub.expose(), expected_pub);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let deriver = KeyDeriver::new();
        let a = deriver.derive_by_path(&master_xpub().into(), "m/0").unwrap();
        let b = deriver.derive_by_path(&master_xpub().into(), "m/0").unwrap();
        assert_eq!(a, b);
        assert_ne!(a.expose(), master_xpub());
    }

    #[test]
    fn test_invalid_inputs() {
        let deriver = KeyDeriver::new();
        assert_eq!(
            deriver.derive_by_path(&"not a key".into(), "m/0"),
            Err(DerivationError::InvalidKey)
        );
        assert!(matches!(
            deriver.derive_by_path(&MASTER_XPRV.into(), "m/abc"),
            Err(DerivationError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_seed_path_rule() {
        let path = seed_derivation_path("my seed").unwrap();
        let parts: Vec<&str> = path.split('/').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0..2], ["m", "999999"]);

        let digest = hex::encode(Sha256::digest(Sha256::digest(b"my seed")));
        assert_eq!(parts[2], u32::from_str_radix(&digest[0..7], 16).unwrap().to_string());
        assert_eq!(parts[3], u32::from_str_radix(&digest[7..14], 16).unwrap().to_string());

        assert_eq!(seed_derivation_path("my seed").unwrap(), path);
        assert_eq!(seed_derivation_path(""), Err(DerivationError::EmptySeed));
    }

    #[test]
    fn test_derive_by_seed_uses_seed_path() {
        let deriver = KeyDeriver::new();
        let (key, path) = deriver
            .derive_by_seed(&master_xpub().into(), &"my seed".into())
            .unwrap();
        let direct = deriver.derive_by_path(&master_xpub().into(), &path).unwrap();
        assert_eq!(key, direct);
    }
}
