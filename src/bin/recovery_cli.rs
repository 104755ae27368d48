//! 恢复客户端（不可信进程）
//!
//! ```text
//! recovery_cli --env test --wallet hot --coin tpolygon --form form.json
//! recovery_cli --env test --cross-chain tbtc:tltc --form params.json
//! ```
//!
//! 通过 HTTP 桥连接本机上的 host。

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use ironrecover::{
    bridge::{BridgeClient, HttpBridgeTransport},
    config::Config,
    domain::{CrossChainParams, Environment, WalletType},
    error::AppError,
    infrastructure::logging,
    service::{
        parameter_builder::FormValues,
        recovery_executor::{CrossChainAttempt, PersistedRecovery, RecoveryAttempt, RecoveryExecutor},
    },
};

#[derive(Debug, Default)]
struct CliArgs {
    environment: Option<String>,
    wallet: Option<String>,
    coin: Option<String>,
    form: Option<String>,
    host: Option<String>,
    cross_chain: Option<String>,
    output_dir: Option<String>,
    evm: bool,
}

fn parse_args() -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = || args.next().ok_or_else(|| anyhow!("{} requires a value", arg));
        match arg.as_str() {
            "--env" => parsed.environment = Some(value()?),
            "--wallet" => parsed.wallet = Some(value()?),
            "--coin" => parsed.coin = Some(value()?),
            "--form" => parsed.form = Some(value()?),
            "--host" => parsed.host = Some(value()?),
            "--cross-chain" => parsed.cross_chain = Some(value()?),
            "--output-dir" => parsed.output_dir = Some(value()?),
            "--evm" => parsed.evm = true,
            other => bail!("unknown argument: {}", other),
        }
    }
    Ok(parsed)
}

fn read_json(path: &str) -> Result<serde_json::Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path))
}

async fn run(args: CliArgs, config: Config) -> Result<PersistedRecovery, AppError> {
    let environment: Environment = args
        .environment
        .as_deref()
        .unwrap_or("test")
        .parse()
        .map_err(AppError::bad_request)?;
    let form_path = args
        .form
        .as_deref()
        .ok_or_else(|| AppError::bad_request("--form is required"))?;
    let form_json = read_json(form_path).map_err(|e| AppError::bad_request(e.to_string()))?;

    let host = args.host.unwrap_or_else(|| config.client.host_url.clone());
    let transport =
        HttpBridgeTransport::new(&host, Duration::from_secs(config.client.timeout_secs))?;
    let executor = RecoveryExecutor::new(
        BridgeClient::new(Arc::new(transport)),
        config.output.default_dir.clone(),
    );

    if let Some(pair) = args.cross_chain {
        let (source, destination) = pair
            .split_once(':')
            .ok_or_else(|| AppError::bad_request("--cross-chain expects <source>:<destination>"))?;
        let params: CrossChainParams = serde_json::from_value(form_json)?;
        let mut attempt = CrossChainAttempt::prepare(environment, source, destination, params)?;
        attempt.output_dir = args.output_dir;
        return executor.execute_cross_chain(attempt).await;
    }

    let wallet_type: WalletType = args
        .wallet
        .as_deref()
        .unwrap_or("hot")
        .parse()
        .map_err(AppError::bad_request)?;
    let coin = args
        .coin
        .as_deref()
        .ok_or_else(|| AppError::bad_request("--coin is required"))?;
    let form = FormValues::from_json(&form_json)?;

    let mut attempt = if args.evm {
        RecoveryAttempt::prepare_evm(environment, wallet_type, coin, &form)?
    } else {
        RecoveryAttempt::prepare(environment, wallet_type, coin, &form)?
    };
    if let Some(dir) = args.output_dir {
        attempt = attempt.with_output_dir(dir);
    }
    executor.execute(attempt).await
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = parse_args()?;
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    logging::init_logging(&config.logging)
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))?;

    match run(args, config).await {
        Ok(persisted) => {
            println!("{}", persisted.path);
            for path in &persisted.derivation_paths {
                eprintln!("derived with path {}", path);
            }
            Ok(())
        }
        Err(e) if e.is_user_declined() => {
            eprintln!("{}", e.user_message());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}
