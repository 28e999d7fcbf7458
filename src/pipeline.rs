use crate::accounts::{normalize_private_key, AccountInputs, CredentialPool};
use crate::captcha::SolverConfig;
use crate::config::chain::ChainConfig;
use crate::executor::{self, HttpProvider};
use crate::faucet;
use crate::oauth::{self, OauthEndpoints};
use crate::proxy::{build_http_client, EgressProfile};
use crate::retry::with_retries;
use crate::swap;
use crate::utils::config::Settings;
use crate::utils::error::compact_error_message;
use crate::utils::rng::{draw_u64, pause_secs, random_bytes32};
use alloy::primitives::{Bytes as AlloyBytes, U256};
use alloy::signers::local::PrivateKeySigner;
use std::cell::RefCell;

/// 4-byte selector of the content-registry submission entrypoint.
const ACTIVITY_SELECTOR: [u8; 4] = [0xef, 0x3e, 0x12, 0xdc];

/// Wei range attached to every proof-of-activity transaction.
const ACTIVITY_VALUE_RANGE_WEI: [u64; 2] = [5_000_000_000_000, 10_000_000_000_000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Claim,
    MintAll,
    Swap,
    Exit,
}

impl Action {
    /// Parse a menu choice or an env override. Accepts the menu digit and a
    /// word form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "claim" => Some(Self::Claim),
            "2" | "mint" => Some(Self::MintAll),
            "3" | "swap" => Some(Self::Swap),
            "4" | "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Everything shared across the account sequence. Accounts run strictly one
/// at a time, so the credential pool needs no locking.
pub struct RunContext {
    pub provider: HttpProvider,
    pub chain: ChainConfig,
    pub settings: Settings,
    pub endpoints: OauthEndpoints,
    pub solver: SolverConfig,
    pub pool: RefCell<CredentialPool>,
}

/// Calldata for the content-registry submission: the fixed ABI head words of
/// the submission tuple followed by a content hash and a zero tail word.
pub fn activity_calldata(content_hash: [u8; 32]) -> AlloyBytes {
    let mut data = Vec::with_capacity(4 + 8 * 32);
    data.extend_from_slice(&ACTIVITY_SELECTOR);
    for tail_byte in [0x20u8, 0x14, 0x60, 0x80, 0x00, 0x01] {
        let mut word = [0u8; 32];
        word[31] = tail_byte;
        data.extend_from_slice(&word);
    }
    data.extend_from_slice(&content_hash);
    data.extend_from_slice(&[0u8; 32]);
    AlloyBytes::from(data)
}

/// Submit one proof-of-activity transaction with a random content hash and a
/// small random value. Runs after every action; failures are logged and never
/// escalate into the account result.
async fn record_activity(ctx: &RunContext, account_index: usize, signer: &PrivateKeySigner) {
    let calldata = activity_calldata(random_bytes32());
    let value = U256::from(draw_u64(ACTIVITY_VALUE_RANGE_WEI));
    tracing::info!("[ACTIVITY] {account_index} | submitting content registry entry");

    let result = with_retries(
        "activity",
        ctx.settings.max_attempts,
        ctx.settings.retry_delay_secs,
        || {
            executor::send_call(
                account_index,
                &ctx.provider,
                &ctx.chain,
                signer,
                ctx.chain.content_registry,
                calldata.clone(),
                value,
            )
        },
    )
    .await;

    if let Err(err) = result {
        tracing::warn!(
            "[ACTIVITY] {account_index} | submission failed: {}",
            compact_error_message(&err.to_string(), 200)
        );
    }
}

async fn run_claim(
    ctx: &RunContext,
    account_index: usize,
    signer: &PrivateKeySigner,
    proxy: Option<&EgressProfile>,
    credential: Option<&str>,
) -> bool {
    let Some(credential) = credential else {
        tracing::error!("[OAUTH] {account_index} | no identity credential configured");
        return false;
    };
    let client = match build_http_client(proxy) {
        Ok(client) => client,
        Err(err) => {
            tracing::error!("[PROXY] {account_index} | client build failed: {err}");
            return false;
        }
    };

    let handshake = with_retries(
        "oauth",
        ctx.settings.max_attempts,
        ctx.settings.retry_delay_secs,
        || oauth::connect(account_index, &client, &ctx.endpoints, credential, &ctx.pool),
    )
    .await;
    let handshake = match handshake {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(
                "[OAUTH] {account_index} | handshake failed: {}",
                compact_error_message(&err.to_string(), 200)
            );
            return false;
        }
    };

    let claimed = with_retries(
        "claim",
        ctx.settings.max_attempts,
        ctx.settings.retry_delay_secs,
        || {
            faucet::claim(
                account_index,
                &client,
                &ctx.endpoints,
                &ctx.solver,
                &ctx.settings,
                proxy,
                signer.address(),
                &handshake,
            )
        },
    )
    .await;

    match claimed {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(
                "[FAUCET] {account_index} | claim failed: {}",
                compact_error_message(&err.to_string(), 200)
            );
            false
        }
    }
}

/// Run one action for one wallet, then the unconditional proof-of-activity
/// transaction. Returns whether the action itself succeeded.
pub async fn process_account(
    ctx: &RunContext,
    account_index: usize,
    raw_key: &str,
    proxy_line: Option<&str>,
    credential: Option<&str>,
    action: Action,
) -> bool {
    let signer: PrivateKeySigner = match normalize_private_key(raw_key).parse() {
        Ok(signer) => signer,
        Err(err) => {
            tracing::error!("[STARTUP] {account_index} | unusable private key, skipping: {err}");
            return false;
        }
    };
    tracing::info!(
        "[STARTUP] {account_index} | wallet {:#x}",
        signer.address()
    );

    let proxy = proxy_line.and_then(EgressProfile::parse);
    if proxy_line.is_some() && proxy.is_none() {
        tracing::warn!("[PROXY] {account_index} | proxy line unusable, continuing direct");
    }

    let succeeded = match action {
        Action::Claim => run_claim(ctx, account_index, &signer, proxy.as_ref(), credential).await,
        Action::MintAll => {
            match faucet::mint_all(account_index, &ctx.provider, &ctx.chain, &ctx.settings, &signer)
                .await
            {
                Ok(any) => any,
                Err(err) => {
                    tracing::error!(
                        "[FAUCET] {account_index} | mint run failed: {}",
                        compact_error_message(&err.to_string(), 200)
                    );
                    false
                }
            }
        }
        Action::Swap => {
            match swap::run_swaps(account_index, &ctx.provider, &ctx.chain, &ctx.settings, &signer)
                .await
            {
                Ok(()) => true,
                Err(err) => {
                    tracing::error!(
                        "[SWAP] {account_index} | swap run failed: {}",
                        compact_error_message(&err.to_string(), 200)
                    );
                    false
                }
            }
        }
        Action::Exit => return true,
    };

    record_activity(ctx, account_index, &signer).await;
    succeeded
}

/// Drive the whole account list through one action, strictly sequentially,
/// with a randomized pause between accounts. Credential lines fall back to
/// the first credential when the per-account line is missing.
pub async fn run_batch(ctx: &RunContext, inputs: &AccountInputs, action: Action) -> usize {
    let total = inputs.private_keys.len();
    let mut succeeded = 0usize;

    for (position, raw_key) in inputs.private_keys.iter().enumerate() {
        let account_index = position + 1;
        tracing::info!("[STARTUP] processing account {account_index}/{total}");

        let proxy_line = inputs.proxies.get(position).map(String::as_str);
        let credential = inputs
            .credentials
            .get(position)
            .or_else(|| inputs.credentials.first())
            .map(String::as_str);

        if process_account(ctx, account_index, raw_key, proxy_line, credential, action).await {
            succeeded += 1;
        }

        if account_index < total {
            let (secs, pause) = pause_secs(ctx.settings.pause_between_accounts_secs);
            tracing::info!("[STARTUP] pausing {secs}s before the next account");
            tokio::time::sleep(pause).await;
        }
    }

    tracing::info!("[STARTUP] batch finished: {succeeded}/{total} accounts succeeded");
    succeeded
}
