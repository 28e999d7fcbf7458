use crate::error::CaptchaError;
use crate::proxy::EgressProfile;
use std::time::Duration;

/// hCaptcha parameters of the faucet page.
pub const FAUCET_SITE_KEY: &str = "914e63b4-ac20-4c24-bc92-cdb6950ccfde";
pub const FAUCET_PAGE_URL: &str = "https://faucet.0g.ai/";

const DEFAULT_API_BASE: &str = "https://2captcha.com";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const MAX_POLLS: usize = 24;
const NOT_READY_MARKER: &str = "CAPCHA_NOT_READY";

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub api_key: String,
    pub api_base: String,
    pub poll_interval: Duration,
}

impl SolverConfig {
    pub fn new(api_key: &str) -> Self {
        let api_base = std::env::var("GALILEO_CAPTCHA_API_BASE")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let poll_ms = std::env::var("GALILEO_CAPTCHA_POLL_MS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        Self {
            api_key: api_key.to_string(),
            api_base,
            poll_interval: Duration::from_millis(poll_ms),
        }
    }
}

fn transport(err: reqwest::Error) -> CaptchaError {
    CaptchaError::Transport(err.to_string())
}

fn field<'a>(value: &'a serde_json::Value, key: &str) -> &'a str {
    value.get(key).and_then(|v| v.as_str()).unwrap_or_default()
}

/// Submit the challenge to the solving service and wait for a solution token.
/// Stateless: pure function of its inputs aside from the service round trips.
pub async fn solve(
    account_index: usize,
    client: &reqwest::Client,
    config: &SolverConfig,
    site_key: &str,
    page_url: &str,
    proxy: Option<&EgressProfile>,
) -> Result<String, CaptchaError> {
    tracing::info!("[CAPTCHA] {account_index} | submitting challenge to the solving service...");

    let mut form: Vec<(&str, String)> = vec![
        ("key", config.api_key.clone()),
        ("method", "hcaptcha".to_string()),
        ("sitekey", site_key.to_string()),
        ("pageurl", page_url.to_string()),
        ("json", "1".to_string()),
    ];
    if let Some(profile) = proxy {
        form.push(("proxy", profile.proxy_url()));
        form.push(("proxytype", "HTTP".to_string()));
    }

    let submitted: serde_json::Value = client
        .post(format!("{}/in.php", config.api_base))
        .form(&form)
        .send()
        .await
        .map_err(transport)?
        .json()
        .await
        .map_err(transport)?;
    if submitted.get("status").and_then(|v| v.as_i64()) != Some(1) {
        return Err(CaptchaError::Rejected(field(&submitted, "request").to_string()));
    }
    let task_id = field(&submitted, "request").to_string();

    for _ in 0..MAX_POLLS {
        tokio::time::sleep(config.poll_interval).await;
        let polled: serde_json::Value = client
            .get(format!("{}/res.php", config.api_base))
            .query(&[
                ("key", config.api_key.as_str()),
                ("action", "get"),
                ("id", task_id.as_str()),
                ("json", "1"),
            ])
            .send()
            .await
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)?;

        let request = field(&polled, "request");
        if polled.get("status").and_then(|v| v.as_i64()) == Some(1) {
            if request.is_empty() {
                return Err(CaptchaError::NoSolution);
            }
            tracing::info!("[CAPTCHA] {account_index} | challenge solved");
            return Ok(request.to_string());
        }
        if request != NOT_READY_MARKER {
            return Err(CaptchaError::Rejected(request.to_string()));
        }
    }

    Err(CaptchaError::Timeout { polls: MAX_POLLS })
}
