use crate::config::chain::ChainConfig;
use crate::error::ChainError;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes as AlloyBytes, B256, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::eth::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use alloy::transports::http::Http;
use reqwest::Client;

pub type HttpProvider = RootProvider<Http<Client>>;

alloy::sol! {
    interface IFaucetToken {
        function mint() external payable;
    }

    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256 balance);
    }

    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params)
            external
            payable
            returns (uint256 amountOut);
    }
}

/// Substring rules the faucet and its contracts use in response bodies and
/// revert reasons. Kept as named constants for behavior parity with the
/// upstream service.
pub const ALREADY_COMPLETED_PHRASES: &[&str] = &[
    "hours before requesting again",
    "Please wait 24 hours",
    "Wait 24 hours",
];
pub const SERVICE_BUSY_PHRASES: &[&str] = &["Internal Server Error", "Service is busy"];
pub const INVALID_SOLUTION_PHRASES: &[&str] = &["Invalid Captcha"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Rate-limit window already consumed. A terminal success-equivalent:
    /// reported as success, never retried.
    AlreadyCompleted,
    /// Transient service-side failure; retryable.
    ServiceBusy,
    /// The solving-service token was not accepted; retryable with a fresh
    /// solution.
    InvalidSolution,
    Unclassified,
}

/// Enumerated classifier over raw response bodies and revert reasons.
pub fn classify_response(body: &str) -> ResponseClass {
    if ALREADY_COMPLETED_PHRASES.iter().any(|p| body.contains(p)) {
        return ResponseClass::AlreadyCompleted;
    }
    if SERVICE_BUSY_PHRASES.iter().any(|p| body.contains(p)) {
        return ResponseClass::ServiceBusy;
    }
    if INVALID_SOLUTION_PHRASES.iter().any(|p| body.contains(p)) {
        return ResponseClass::InvalidSolution;
    }
    ResponseClass::Unclassified
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed { tx_hash: B256 },
    /// The contract reported the action as already performed within the
    /// current rate-limit window.
    AlreadyCompleted,
}

pub fn connect_provider(rpc_url: &str) -> anyhow::Result<HttpProvider> {
    let url = rpc_url
        .parse()
        .map_err(|err| anyhow::anyhow!("invalid RPC URL `{rpc_url}`: {err}"))?;
    Ok(RootProvider::new_http(url))
}

fn transport(err: impl std::fmt::Display) -> ChainError {
    ChainError::Transport(err.to_string())
}

pub async fn native_balance(
    provider: &HttpProvider,
    address: Address,
) -> Result<U256, ChainError> {
    provider.get_balance(address).await.map_err(transport)
}

/// Declare the gas floor before spending anything. Failure here is fatal for
/// the action and must not be retried.
pub async fn require_gas_floor(
    provider: &HttpProvider,
    chain: &ChainConfig,
    address: Address,
) -> Result<U256, ChainError> {
    let balance = native_balance(provider, address).await?;
    if balance < chain.gas_floor_wei {
        return Err(ChainError::InsufficientBalance {
            balance,
            required: chain.gas_floor_wei,
        });
    }
    Ok(balance)
}

pub async fn erc20_balance(
    provider: &HttpProvider,
    token: Address,
    owner: Address,
) -> Result<U256, ChainError> {
    let call = IERC20::balanceOfCall { owner };
    let request = TransactionRequest::default()
        .with_to(token)
        .with_input(AlloyBytes::from(call.abi_encode()));
    let raw = provider.call(&request).await.map_err(transport)?;
    let decoded = <IERC20::balanceOfCall as SolCall>::abi_decode_returns(raw.as_ref(), true)
        .map_err(|err| transport(format!("balanceOf decode failed for {token:#x}: {err}")))?;
    Ok(decoded.balance)
}

/// Build, gas-estimate, sign and broadcast one contract call, then wait for
/// its receipt.
///
/// Gas price and the pending-nonce are fetched fresh per call so bursts from
/// the same wallet never collide; the gas limit is filled only after a
/// successful estimation. A revert reason matching the rate-limit phrases is
/// reported as `AlreadyCompleted` rather than an error.
pub async fn send_call(
    account_index: usize,
    provider: &HttpProvider,
    chain: &ChainConfig,
    signer: &PrivateKeySigner,
    to: Address,
    input: AlloyBytes,
    value: U256,
) -> Result<TxOutcome, ChainError> {
    let gas_price = provider.get_gas_price().await.map_err(transport)?;
    let nonce = provider
        .get_transaction_count(signer.address())
        .pending()
        .await
        .map_err(transport)?;

    let mut tx = TransactionRequest::default()
        .with_to(to)
        .with_input(input)
        .with_value(value)
        .with_nonce(nonce)
        .with_chain_id(chain.chain_id)
        .with_gas_price(gas_price);
    tx.from = Some(signer.address());

    let gas_limit = match provider.estimate_gas(&tx).await {
        Ok(gas) => gas,
        Err(err) => {
            let reason = err.to_string();
            if classify_response(&reason) == ResponseClass::AlreadyCompleted {
                tracing::info!(
                    "[TX] {account_index} | {to:#x}: already performed in this window, skipping"
                );
                return Ok(TxOutcome::AlreadyCompleted);
            }
            return Err(ChainError::GasEstimation { to, reason });
        }
    };
    tx = tx.with_gas_limit(gas_limit);

    let wallet = EthereumWallet::from(signer.clone());
    let signed = tx
        .build(&wallet)
        .await
        .map_err(|err| ChainError::Signing(err.to_string()))?;

    let pending = provider
        .send_raw_transaction(&signed.encoded_2718())
        .await
        .map_err(transport)?;
    let receipt = pending.get_receipt().await.map_err(transport)?;

    if receipt.status() {
        tracing::info!(
            "[TX] {account_index} | confirmed | {}",
            chain.tx_url(receipt.transaction_hash)
        );
        Ok(TxOutcome::Confirmed {
            tx_hash: receipt.transaction_hash,
        })
    } else {
        Err(ChainError::Reverted {
            tx_hash: format!("{:#x}", receipt.transaction_hash),
        })
    }
}
