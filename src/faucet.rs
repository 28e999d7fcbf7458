use crate::captcha::{self, SolverConfig, FAUCET_PAGE_URL, FAUCET_SITE_KEY};
use crate::config::chain::ChainConfig;
use crate::error::{ClaimError, RunnerError};
use crate::executor::{self, classify_response, HttpProvider, IFaucetToken, ResponseClass};
use crate::oauth::{browser_headers, HandshakeOutcome, OauthEndpoints};
use crate::proxy::EgressProfile;
use crate::retry::with_retries;
use crate::utils::config::Settings;
use crate::utils::error::compact_error_message;
use crate::utils::rng::pause_secs;
use alloy::primitives::{Address, Bytes as AlloyBytes, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;

/// Claim native tokens from the faucet: solve the page challenge, then submit
/// the solution together with the finished handshake tokens.
///
/// A body matching the rate-limit phrases is a terminal success equivalent.
pub async fn claim(
    account_index: usize,
    client: &reqwest::Client,
    endpoints: &OauthEndpoints,
    solver: &SolverConfig,
    settings: &Settings,
    proxy: Option<&EgressProfile>,
    address: Address,
    handshake: &HandshakeOutcome,
) -> Result<(), RunnerError> {
    let solution = with_retries(
        "captcha",
        settings.max_attempts,
        settings.retry_delay_secs,
        || captcha::solve(account_index, client, solver, FAUCET_SITE_KEY, FAUCET_PAGE_URL, proxy),
    )
    .await?;

    tracing::info!("[FAUCET] {account_index} | requesting claim for {address:#x}");
    let referer = format!(
        "{}/?oauth_token={}&oauth_verifier={}",
        endpoints.faucet_base, handshake.oauth_token, handshake.oauth_verifier
    );
    let response = browser_headers(
        client.post(format!("{}/api/faucet", endpoints.faucet_base)),
        &endpoints.faucet_base,
        &referer,
    )
    .json(&serde_json::json!({
        "address": format!("{address:#x}"),
        "hcaptchaToken": solution,
        "oauth_token": handshake.oauth_token,
        "oauth_verifier": handshake.oauth_verifier,
    }))
    .send()
    .await
    .map_err(|err| ClaimError::Transport(err.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ClaimError::Transport(err.to_string()))?;

    match classify_response(&body) {
        ResponseClass::AlreadyCompleted => {
            tracing::info!("[FAUCET] {account_index} | already claimed in this window, skipping");
            Ok(())
        }
        ResponseClass::ServiceBusy => Err(ClaimError::ServiceBusy.into()),
        ResponseClass::InvalidSolution => Err(ClaimError::InvalidSolution.into()),
        ResponseClass::Unclassified if status.is_success() => {
            tracing::info!("[FAUCET] {account_index} | claim accepted");
            Ok(())
        }
        ResponseClass::Unclassified => Err(ClaimError::Unrecognized {
            status: status.as_u16(),
            body: compact_error_message(&body, 200),
        }
        .into()),
    }
}

/// Mint every faucet token for the wallet, one transaction per token.
///
/// The gas floor is checked once up front and a shortfall aborts the whole
/// set without retries. Individual mints retry independently, so one broken
/// token contract never blocks the rest. Returns whether at least one mint
/// went through (counting the already-minted case).
pub async fn mint_all(
    account_index: usize,
    provider: &HttpProvider,
    chain: &ChainConfig,
    settings: &Settings,
    signer: &PrivateKeySigner,
) -> Result<bool, RunnerError> {
    executor::require_gas_floor(provider, chain, signer.address()).await?;

    let calldata = AlloyBytes::from(IFaucetToken::mintCall {}.abi_encode());
    let mut minted = 0usize;

    for (position, token) in chain.tokens.iter().enumerate() {
        tracing::info!(
            "[FAUCET] {account_index} | minting {} ({}/{})",
            token.symbol,
            position + 1,
            chain.tokens.len()
        );

        let result = with_retries(
            "mint",
            settings.max_attempts,
            settings.retry_delay_secs,
            || {
                executor::send_call(
                    account_index,
                    provider,
                    chain,
                    signer,
                    token.address,
                    calldata.clone(),
                    U256::ZERO,
                )
            },
        )
        .await;

        match result {
            Ok(_) => minted += 1,
            Err(err) => tracing::error!(
                "[FAUCET] {account_index} | mint {} failed: {}",
                token.symbol,
                compact_error_message(&err.to_string(), 200)
            ),
        }

        if position + 1 < chain.tokens.len() {
            let (secs, pause) = pause_secs(settings.pause_between_swaps_secs);
            tracing::info!("[FAUCET] {account_index} | pausing {secs}s before the next mint");
            tokio::time::sleep(pause).await;
        }
    }

    Ok(minted > 0)
}
