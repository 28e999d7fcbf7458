use crate::accounts::CredentialPool;
use crate::error::HandshakeError;
use std::cell::RefCell;

/// Base URLs for the relying party (the faucet) and the identity provider.
/// Env-overridable so tests and forks can point at stand-ins.
#[derive(Debug, Clone)]
pub struct OauthEndpoints {
    pub faucet_base: String,
    pub idp_base: String,
}

impl OauthEndpoints {
    pub fn from_env() -> Self {
        let faucet_base = std::env::var("GALILEO_FAUCET_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "https://faucet.0g.ai".to_string());
        let idp_base = std::env::var("GALILEO_IDP_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "https://api.x.com".to_string());
        Self {
            faucet_base,
            idp_base,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    pub oauth_token: String,
    pub oauth_verifier: String,
}

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

/// Response fragments the identity provider uses to signal a dead credential.
const CREDENTIAL_REJECTED_PHRASES: &[&str] = &["Could not authenticate you", "Invalid"];

/// Dress a request the way the faucet frontend does. The anti-bot layer in
/// front of the faucet inspects these, so every call to it or to the identity
/// provider carries the full set.
pub fn browser_headers(
    request: reqwest::RequestBuilder,
    origin: &str,
    referer: &str,
) -> reqwest::RequestBuilder {
    request
        .header("user-agent", BROWSER_USER_AGENT)
        .header("accept", "*/*")
        .header("accept-language", "en-US,en;q=0.9")
        .header("origin", origin.to_string())
        .header("referer", referer.to_string())
        .header("sec-ch-ua", r#""Chromium";v="135", "Not-A.Brand";v="8""#)
        .header("sec-ch-ua-mobile", "?0")
        .header("sec-ch-ua-platform", r#""Windows""#)
        .header("sec-fetch-dest", "empty")
        .header("sec-fetch-mode", "cors")
        .header("sec-fetch-site", "same-origin")
}

/// Extract the value of `key=` from a URL query string or response body,
/// stopping at the next delimiter.
pub fn extract_param(haystack: &str, key: &str) -> Option<String> {
    let marker = format!("{key}=");
    let start = haystack.find(&marker)? + marker.len();
    let tail = &haystack[start..];
    let value: String = tail
        .chars()
        .take_while(|ch| !matches!(ch, '&' | '"' | '\'' | '<' | '>') && !ch.is_whitespace())
        .collect();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn transport(err: reqwest::Error) -> HandshakeError {
    HandshakeError::Transport(err.to_string())
}

/// Drive the 4-step handshake once with a fixed credential.
async fn attempt_handshake(
    account_index: usize,
    client: &reqwest::Client,
    endpoints: &OauthEndpoints,
    credential: &str,
) -> Result<HandshakeOutcome, HandshakeError> {
    // Step 1: ask the relying party for a temporary token, delivered inside
    // a redirect URL.
    let home = format!("{}/", endpoints.faucet_base);
    let token_response = browser_headers(
        client.post(format!("{}/api/request-token", endpoints.faucet_base)),
        &endpoints.faucet_base,
        &home,
    )
    .header("authorization", format!("Bearer {credential}"))
    .json(&serde_json::json!({ "domain": "0g" }))
    .send()
    .await
    .map_err(transport)?;
    let token_body: serde_json::Value = token_response.json().await.map_err(transport)?;
    let redirect_url = token_body
        .get("url")
        .and_then(|value| value.as_str())
        .unwrap_or_default();
    let oauth_token =
        extract_param(redirect_url, "oauth_token").ok_or(HandshakeError::MissingToken)?;

    // Step 2: present the temporary token and the credential to the identity
    // provider's authenticate endpoint.
    let auth_body = browser_headers(
        client.get(format!("{}/oauth/authenticate", endpoints.idp_base)),
        &endpoints.faucet_base,
        &home,
    )
    .header("authorization", format!("Bearer {credential}"))
    .query(&[("oauth_token", oauth_token.as_str())])
    .send()
    .await
    .map_err(transport)?
    .text()
    .await
    .map_err(transport)?;

    if CREDENTIAL_REJECTED_PHRASES
        .iter()
        .any(|phrase| auth_body.contains(phrase))
    {
        tracing::warn!("[OAUTH] {account_index} | identity provider rejected the credential");
        return Err(HandshakeError::CredentialInvalid);
    }

    // Step 3: the verifier is embedded in the authenticate response body.
    let oauth_verifier =
        extract_param(&auth_body, "oauth_verifier").ok_or(HandshakeError::MissingVerifier)?;

    // Step 4: hand token + verifier back to the relying party to finalize.
    browser_headers(
        client.get(format!("{}/", endpoints.faucet_base)),
        &endpoints.faucet_base,
        &home,
    )
    .query(&[
        ("oauth_token", oauth_token.as_str()),
        ("oauth_verifier", oauth_verifier.as_str()),
    ])
    .send()
    .await
    .map_err(transport)?;

    tracing::info!("[OAUTH] {account_index} | handshake finalized");
    Ok(HandshakeOutcome {
        oauth_token,
        oauth_verifier,
    })
}

/// Run the handshake with automatic credential rotation: an invalid
/// credential pops one spare from the pool (persisting the swap) and restarts
/// the handshake. Bounded by pool size + 1 attempts, so an exhausted pool
/// surfaces `CredentialExhausted` instead of looping.
pub async fn connect(
    account_index: usize,
    client: &reqwest::Client,
    endpoints: &OauthEndpoints,
    credential: &str,
    pool: &RefCell<CredentialPool>,
) -> Result<HandshakeOutcome, HandshakeError> {
    let mut credential = credential.to_string();
    let rotation_budget = pool.borrow().len() + 1;

    for _ in 0..rotation_budget {
        tracing::info!("[OAUTH] {account_index} | connecting identity provider...");
        match attempt_handshake(account_index, client, endpoints, &credential).await {
            Err(HandshakeError::CredentialInvalid) => {
                let rotated = pool
                    .borrow_mut()
                    .rotate(&credential)
                    .map_err(|err| HandshakeError::PoolUpdate(err.to_string()))?;
                match rotated {
                    Some(next) => {
                        tracing::warn!(
                            "[OAUTH] {account_index} | restarting handshake with a spare credential"
                        );
                        credential = next;
                    }
                    None => return Err(HandshakeError::CredentialExhausted),
                }
            }
            other => return other,
        }
    }
    Err(HandshakeError::CredentialExhausted)
}

#[cfg(test)]
mod tests {
    use super::extract_param;

    #[test]
    fn test_extract_param_from_redirect_url() {
        let url = "https://idp.example/oauth/authenticate?oauth_token=tok123&foo=bar";
        assert_eq!(extract_param(url, "oauth_token").as_deref(), Some("tok123"));
        assert_eq!(extract_param(url, "foo").as_deref(), Some("bar"));
        assert!(extract_param(url, "oauth_verifier").is_none());
    }

    #[test]
    fn test_extract_param_from_html_body() {
        let body = r#"<a href="https://faucet.example/?oauth_token=t&oauth_verifier=ver-9">continue</a>"#;
        assert_eq!(extract_param(body, "oauth_verifier").as_deref(), Some("ver-9"));
    }

    #[test]
    fn test_extract_param_rejects_empty_value() {
        assert!(extract_param("oauth_token=&next=1", "oauth_token").is_none());
    }
}
