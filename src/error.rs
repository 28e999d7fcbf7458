use alloy::primitives::{Address, U256};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("captcha error: {0}")]
    Captcha(#[from] CaptchaError),
    #[error("claim error: {0}")]
    Claim(#[from] ClaimError),
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("swap planning error: {0}")]
    Swap(String),
}

/// Failures of the three-legged OAuth handshake.
///
/// `CredentialInvalid` is consumed internally by the rotation loop and only
/// surfaces as `CredentialExhausted` once the spare pool cannot provide a
/// replacement.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("relying party returned no oauth_token in its redirect URL")]
    MissingToken,
    #[error("identity provider rejected the credential")]
    CredentialInvalid,
    #[error("credential rejected and the spare pool is empty")]
    CredentialExhausted,
    #[error("authenticate response carried no oauth_verifier")]
    MissingVerifier,
    #[error("credential pool update failed: {0}")]
    PoolUpdate(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("solving service returned an empty solution")]
    NoSolution,
    #[error("solving service rejected the request: {0}")]
    Rejected(String),
    #[error("solution not ready after {polls} polls")]
    Timeout { polls: usize },
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Classified failures of the faucet claim endpoint. Busy and invalid-solution
/// responses are retryable; the "wait 24 hours" body never reaches this enum
/// because it is reported as success.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("faucet endpoint is busy or errored internally")]
    ServiceBusy,
    #[error("faucet rejected the challenge solution")]
    InvalidSolution,
    #[error("faucet returned an unrecognized failure: status {status} | {body}")]
    Unrecognized { status: u16, body: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("gas estimation failed for to={to:#x}: {reason}")]
    GasEstimation { to: Address, reason: String },
    #[error("native balance {balance} wei is below the {required} wei gas floor")]
    InsufficientBalance { balance: U256, required: U256 },
    #[error("transaction {tx_hash} reverted on-chain")]
    Reverted { tx_hash: String },
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
