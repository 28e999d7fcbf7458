use anyhow::Context;
use galileo_runner::accounts::{AccountInputs, CredentialPool, CREDENTIALS_FILE};
use galileo_runner::captcha::SolverConfig;
use galileo_runner::config::chain::ChainConfig;
use galileo_runner::executor;
use galileo_runner::oauth::OauthEndpoints;
use galileo_runner::pipeline::{self, Action, RunContext};
use galileo_runner::utils::config::Settings;
use std::cell::RefCell;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

fn data_dir() -> PathBuf {
    std::env::var("GALILEO_DATA_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn prompt_action() -> anyhow::Result<Action> {
    println!();
    println!("Select an action:");
    println!("  1) Claim faucet (OAuth + captcha)");
    println!("  2) Mint all faucet tokens");
    println!("  3) Run random swaps");
    println!("  4) Exit");
    print!("> ");
    use std::io::Write;
    std::io::stdout().flush().ok();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = lines
            .next_line()
            .await
            .context("reading menu choice")?
            .unwrap_or_else(|| "4".to_string());
        match Action::parse(&line) {
            Some(action) => return Ok(action),
            None => {
                println!("Unrecognized choice `{}`, enter 1-4.", line.trim());
                print!("> ");
                std::io::stdout().flush().ok();
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let chain = ChainConfig::galileo();
    tracing::info!(
        "[STARTUP] {} | chain id {} | rpc {}",
        chain.name,
        chain.chain_id,
        chain.rpc_url
    );

    let settings = Settings::load().context("loading config.json")?;
    let dir = data_dir();
    let inputs =
        AccountInputs::load_from_dir(&dir).context("loading account input files")?;
    anyhow::ensure!(
        !inputs.private_keys.is_empty(),
        "no private keys found under {}",
        dir.display()
    );
    tracing::info!(
        "[STARTUP] loaded {} accounts, {} proxies, {} credentials",
        inputs.private_keys.len(),
        inputs.proxies.len(),
        inputs.credentials.len()
    );

    let provider = executor::connect_provider(&chain.rpc_url)?;
    let block = provider_probe(&provider).await?;
    tracing::info!("[STARTUP] rpc reachable, head block {block}");

    let solver = SolverConfig::new(&settings.captcha_api_key);
    let pool = RefCell::new(CredentialPool::from_lines(
        dir.join(CREDENTIALS_FILE),
        &inputs.credentials,
    ));
    let ctx = RunContext {
        provider,
        chain,
        settings,
        endpoints: OauthEndpoints::from_env(),
        solver,
        pool,
    };

    // One-shot non-interactive mode for scripted runs.
    if let Ok(raw) = std::env::var("GALILEO_ACTION") {
        let action = Action::parse(&raw)
            .with_context(|| format!("unrecognized GALILEO_ACTION `{raw}`"))?;
        if action != Action::Exit {
            pipeline::run_batch(&ctx, &inputs, action).await;
        }
        return Ok(());
    }

    loop {
        let action = prompt_action().await?;
        if action == Action::Exit {
            tracing::info!("[STARTUP] exiting");
            return Ok(());
        }
        pipeline::run_batch(&ctx, &inputs, action).await;
    }
}

async fn provider_probe(
    provider: &executor::HttpProvider,
) -> anyhow::Result<u64> {
    use alloy::providers::Provider;
    provider
        .get_block_number()
        .await
        .context("rpc connectivity probe failed")
}
