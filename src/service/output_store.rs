//! 恢复文件写入

use std::path::{Path, PathBuf};

use crate::bridge::TextEncoding;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistError {
    #[error("file path must not be empty")]
    EmptyPath,
    #[error("cannot expand '~': HOME is not set")]
    NoHome,
    #[error("failed to write {path}: {reason}")]
    Write { path: String, reason: String },
}

/// `~` / `~/...` 展开为 $HOME
pub fn expand_home(path: &str) -> Result<PathBuf, PersistError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(PersistError::EmptyPath);
    }
    if trimmed == "~" || trimmed.starts_with("~/") {
        let home = std::env::var("HOME").map_err(|_| PersistError::NoHome)?;
        let rest = trimmed.trim_start_matches('~').trim_start_matches('/');
        return Ok(if rest.is_empty() {
            PathBuf::from(home)
        } else {
            Path::new(&home).join(rest)
        });
    }
    Ok(PathBuf::from(trimmed))
}

/// 文件写入器
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputStore;

impl OutputStore {
    pub fn new() -> Self {
        Self
    }

    /// 写入文本，返回实际路径
    pub async fn write_text(
        &self,
        path: &str,
        content: &str,
        encoding: TextEncoding,
    ) -> Result<PathBuf, PersistError> {
        let target = expand_home(path)?;
        let bytes = match encoding {
            TextEncoding::Utf8 => content.as_bytes(),
        };

        let write_err = |e: std::io::Error| PersistError::Write {
            path: target.display().to_string(),
            reason: e.to_string(),
        };
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(&target, bytes).await.map_err(write_err)?;

        tracing::info!(path = %target.display(), bytes = bytes.len(), "recovery_file_written");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(expand_home("~").unwrap(), PathBuf::from(&home));
        assert_eq!(
            expand_home("~/recover.json").unwrap(),
            Path::new(&home).join("recover.json")
        );
        assert_eq!(expand_home("/tmp/a.json").unwrap(), PathBuf::from("/tmp/a.json"));
        assert_eq!(expand_home("  "), Err(PersistError::EmptyPath));
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        let written = OutputStore::new()
            .write_text(path.to_str().unwrap(), "{\n  \"a\": 1\n}", TextEncoding::Utf8)
            .await
            .unwrap();
        assert_eq!(written, path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\n  \"a\": 1\n}");
    }
}
