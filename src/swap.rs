use crate::config::chain::ChainConfig;
use crate::error::RunnerError;
use crate::executor::{self, HttpProvider, IERC20, ISwapRouter};
use crate::retry::with_retries;
use crate::utils::config::Settings;
use crate::utils::error::compact_error_message;
use crate::utils::rng::{coin_flip, draw_u32, draw_u64, pause_secs};
use alloy::primitives::aliases::U24;
use alloy::primitives::{Bytes as AlloyBytes, U160, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Fixed 0.3% fee tier of the Galileo router pools.
pub const SWAP_FEE_TIER: u16 = 3_000;
pub const SWAP_DEADLINE_OFFSET_SECS: u64 = 1_800;

pub type Balances = BTreeMap<&'static str, U256>;

/// Exact integer sizing: `balance * percent / 100` in smallest units, no
/// floating point anywhere near on-chain amounts.
pub fn swap_amount(balance: U256, percent: u32) -> U256 {
    balance * U256::from(percent) / U256::from(100u8)
}

/// Uniform pick among tokens with a strictly positive balance.
pub fn pick_source(balances: &Balances) -> Option<&'static str> {
    let funded: Vec<&'static str> = balances
        .iter()
        .filter(|(_, balance)| **balance > U256::ZERO)
        .map(|(symbol, _)| *symbol)
        .collect();
    if funded.is_empty() {
        return None;
    }
    let idx = draw_u64([0, (funded.len() - 1) as u64]) as usize;
    Some(funded[idx])
}

/// Destination selection: everything routes into the stable token, except the
/// stable token itself which exits into one of the two alternatives with
/// equal probability.
pub fn pick_destination(chain: &ChainConfig, source: &'static str) -> &'static str {
    if source != chain.stable_symbol {
        return chain.stable_symbol;
    }
    let alternatives: Vec<&'static str> = chain
        .tokens
        .iter()
        .map(|token| token.symbol)
        .filter(|symbol| *symbol != chain.stable_symbol)
        .collect();
    match alternatives.as_slice() {
        [only] => only,
        [first, second, ..] => {
            if coin_flip() {
                first
            } else {
                second
            }
        }
        [] => chain.stable_symbol,
    }
}

pub async fn read_balances(
    account_index: usize,
    provider: &HttpProvider,
    chain: &ChainConfig,
    owner: alloy::primitives::Address,
) -> Result<Balances, RunnerError> {
    let mut balances = Balances::new();
    for token in &chain.tokens {
        let balance = executor::erc20_balance(provider, token.address, owner).await?;
        tracing::info!(
            "[SWAP] {account_index} | balance {}: {balance} wei",
            token.symbol
        );
        balances.insert(token.symbol, balance);
    }
    Ok(balances)
}

fn unix_deadline() -> U256 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    U256::from(now + SWAP_DEADLINE_OFFSET_SECS)
}

/// One approval + one exact-input exchange through the router.
/// `amountOutMinimum` stays zero: behavior parity with the upstream flow.
async fn execute_swap(
    account_index: usize,
    provider: &HttpProvider,
    chain: &ChainConfig,
    signer: &PrivateKeySigner,
    token_in: alloy::primitives::Address,
    token_out: alloy::primitives::Address,
    amount_in: U256,
) -> Result<(), crate::error::ChainError> {
    let approve_calldata = IERC20::approveCall {
        spender: chain.swap_router,
        amount: amount_in,
    }
    .abi_encode();
    executor::send_call(
        account_index,
        provider,
        chain,
        signer,
        token_in,
        AlloyBytes::from(approve_calldata),
        U256::ZERO,
    )
    .await?;

    let swap_calldata = ISwapRouter::exactInputSingleCall {
        params: ISwapRouter::ExactInputSingleParams {
            tokenIn: token_in,
            tokenOut: token_out,
            fee: U24::from(SWAP_FEE_TIER),
            recipient: signer.address(),
            deadline: unix_deadline(),
            amountIn: amount_in,
            amountOutMinimum: U256::ZERO,
            sqrtPriceLimitX96: U160::ZERO,
        },
    }
    .abi_encode();
    executor::send_call(
        account_index,
        provider,
        chain,
        signer,
        chain.swap_router,
        AlloyBytes::from(swap_calldata),
        U256::ZERO,
    )
    .await?;

    Ok(())
}

/// Plan and execute a randomized swap sequence from live balances, mutating
/// the balance map as it goes. The source side is decremented locally; the
/// destination side is re-read from chain so rounding and pool fees never
/// drift the local view.
pub async fn run_swaps(
    account_index: usize,
    provider: &HttpProvider,
    chain: &ChainConfig,
    settings: &Settings,
    signer: &PrivateKeySigner,
) -> Result<(), RunnerError> {
    executor::require_gas_floor(provider, chain, signer.address()).await?;

    let mut balances = read_balances(account_index, provider, chain, signer.address()).await?;
    if pick_source(&balances).is_none() {
        return Err(RunnerError::Swap(
            "no token holds a positive balance".to_string(),
        ));
    }

    let planned = draw_u32(settings.number_of_swaps);
    tracing::info!("[SWAP] {account_index} | planning {planned} swaps");

    let mut executed = 0u32;
    for step in 0..planned {
        let Some(source) = pick_source(&balances) else {
            tracing::warn!("[SWAP] {account_index} | no funded token left after {step} swaps");
            break;
        };
        let destination = pick_destination(chain, source);
        let (Some(token_in), Some(token_out)) = (
            chain.token_address(source),
            chain.token_address(destination),
        ) else {
            return Err(RunnerError::Swap(format!(
                "token table has no address for {source} -> {destination}"
            )));
        };
        let percent = draw_u32(settings.swap_percent);
        let amount_in = swap_amount(balances[source], percent);
        if amount_in == U256::ZERO {
            tracing::warn!(
                "[SWAP] {account_index} | {percent}% of {source} rounds to zero, skipping"
            );
            continue;
        }

        tracing::info!(
            "[SWAP] {account_index} | swap {}/{planned}: {percent}% {source} ({amount_in} wei) -> {destination}",
            step + 1
        );

        let result = with_retries(
            "swap",
            settings.max_attempts,
            settings.retry_delay_secs,
            || execute_swap(account_index, provider, chain, signer, token_in, token_out, amount_in),
        )
        .await;

        match result {
            Ok(()) => {
                executed += 1;
                balances.insert(source, balances[source] - amount_in);
                match executor::erc20_balance(provider, token_out, signer.address()).await {
                    Ok(fresh) => {
                        balances.insert(destination, fresh);
                    }
                    Err(err) => tracing::warn!(
                        "[SWAP] {account_index} | balance refresh for {destination} failed: {}",
                        compact_error_message(&err.to_string(), 200)
                    ),
                }
            }
            // Per-swap failures are isolated: log and move to the next draw.
            Err(err) => tracing::error!(
                "[SWAP] {account_index} | swap {}/{planned} failed: {}",
                step + 1,
                compact_error_message(&err.to_string(), 200)
            ),
        }

        if step + 1 < planned {
            let (secs, pause) = pause_secs(settings.pause_between_swaps_secs);
            tracing::info!("[SWAP] {account_index} | pausing {secs}s before the next swap");
            tokio::time::sleep(pause).await;
        }
    }

    // Same success rule as mint-all: the account counts only if something
    // actually went through.
    if planned > 0 && executed == 0 {
        return Err(RunnerError::Swap(format!(
            "all {planned} planned swaps failed"
        )));
    }
    tracing::info!("[SWAP] {account_index} | executed {executed}/{planned} swaps");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{pick_destination, pick_source, swap_amount, Balances};
    use crate::config::chain::ChainConfig;
    use alloy::primitives::U256;

    #[test]
    fn test_swap_amount_is_exact_integer_floor() {
        // 10^18 at 37% -> 3.7 * 10^17, truncated in integer arithmetic.
        let balance = U256::from(10u8).pow(U256::from(18u8));
        assert_eq!(
            swap_amount(balance, 37),
            U256::from(370_000_000_000_000_000u64)
        );
        // Truncation, never rounding up.
        assert_eq!(swap_amount(U256::from(99u8), 50), U256::from(49u8));
        assert_eq!(swap_amount(U256::ZERO, 80), U256::ZERO);
    }

    #[test]
    fn test_pick_source_only_considers_funded_tokens() {
        let mut balances = Balances::new();
        balances.insert("USDT", U256::ZERO);
        balances.insert("ETH", U256::from(5u8));
        balances.insert("BTC", U256::ZERO);
        for _ in 0..100 {
            assert_eq!(pick_source(&balances), Some("ETH"));
        }
        balances.insert("ETH", U256::ZERO);
        assert_eq!(pick_source(&balances), None);
    }

    #[test]
    fn test_destination_routing() {
        let chain = ChainConfig::galileo();
        assert_eq!(pick_destination(&chain, "ETH"), "USDT");
        assert_eq!(pick_destination(&chain, "BTC"), "USDT");

        let mut seen_eth = false;
        let mut seen_btc = false;
        for _ in 0..200 {
            match pick_destination(&chain, "USDT") {
                "ETH" => seen_eth = true,
                "BTC" => seen_btc = true,
                other => panic!("stable source must not route to {other}"),
            }
        }
        assert!(seen_eth && seen_btc, "both alternatives must be reachable");
    }
}
