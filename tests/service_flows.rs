//! End-to-end flows against stubbed HTTP services: the OAuth handshake with
//! credential rotation, the captcha polling loop, and the faucet claim
//! classifier.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use galileo_runner::accounts::{read_lines, CredentialPool};
use galileo_runner::captcha::{self, SolverConfig};
use galileo_runner::config::chain::ChainConfig;
use galileo_runner::error::{CaptchaError, ClaimError, HandshakeError, RunnerError};
use galileo_runner::executor;
use galileo_runner::faucet;
use galileo_runner::oauth::{self, HandshakeOutcome, OauthEndpoints};
use galileo_runner::pipeline::{self, Action, RunContext};
use galileo_runner::swap;
use galileo_runner::utils::config::Settings;
use serde_json::json;
use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn seeded_pool(dir: &tempfile::TempDir, lines: &str) -> (PathBuf, RefCell<CredentialPool>) {
    let path = dir.path().join("tokens.txt");
    std::fs::write(&path, lines).expect("seed credentials file");
    let loaded = read_lines(&path).expect("read credentials file");
    let pool = CredentialPool::from_lines(path.clone(), &loaded);
    (path, RefCell::new(pool))
}

fn endpoints_for(url: &str) -> OauthEndpoints {
    OauthEndpoints {
        faucet_base: url.to_string(),
        idp_base: url.to_string(),
    }
}

fn solver_for(url: &str) -> SolverConfig {
    SolverConfig {
        api_key: "test-key".to_string(),
        api_base: url.to_string(),
        poll_interval: Duration::from_millis(5),
    }
}

fn fast_settings() -> Settings {
    Settings {
        max_attempts: 1,
        retry_delay_secs: [0, 0],
        pause_between_swaps_secs: [0, 0],
        pause_between_accounts_secs: [0, 0],
        number_of_swaps: [1, 1],
        swap_percent: [10, 10],
        captcha_api_key: "test-key".to_string(),
    }
}

/// Serve the workspace root as a JSON-RPC endpoint: `handler` gets the method
/// and params of each request and returns either a result value or a
/// `{"error": {..}}` object.
async fn rpc_stub<F>(server: &mut mockito::Server, handler: F) -> mockito::Mock
where
    F: Fn(&str, &serde_json::Value) -> serde_json::Value + Send + Sync + 'static,
{
    server
        .mock("POST", "/")
        .with_header("content-type", "application/json")
        .with_body_from_request(move |request| {
            let body: serde_json::Value =
                serde_json::from_slice(request.body().expect("rpc request body"))
                    .expect("rpc request json");
            let outcome = handler(body["method"].as_str().unwrap_or_default(), &body["params"]);
            let mut response = json!({ "jsonrpc": "2.0", "id": body["id"] });
            match outcome.get("error") {
                Some(error) => response["error"] = error.clone(),
                None => response["result"] = outcome,
            }
            serde_json::to_vec(&response).expect("rpc response json")
        })
        .expect_at_least(1)
        .create_async()
        .await
}

fn hex_word(value: u64) -> String {
    format!("0x{value:064x}")
}

#[tokio::test]
async fn oauth_rotation_swaps_in_a_spare_credential() {
    let mut server = mockito::Server::new_async().await;

    let _request_token = server
        .mock("POST", "/api/request-token")
        .match_query(mockito::Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(r#"{"url":"https://idp.example/oauth/authenticate?oauth_token=tok-1"}"#)
        .expect_at_least(2)
        .create_async()
        .await;

    let _reject_dead = server
        .mock("GET", "/oauth/authenticate")
        .match_query(mockito::Matcher::Any)
        .match_header("authorization", "Bearer dead")
        .with_body("Could not authenticate you")
        .create_async()
        .await;

    let _accept_spare = server
        .mock("GET", "/oauth/authenticate")
        .match_query(mockito::Matcher::Any)
        .match_header("authorization", "Bearer spare-a")
        .with_body(
            r#"<a href="https://faucet.example/?oauth_token=tok-1&oauth_verifier=ver-9">ok</a>"#,
        )
        .create_async()
        .await;

    let _finalize = server
        .mock("GET", "/")
        .match_query(mockito::Matcher::Any)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let (path, pool) = seeded_pool(&dir, "dead\nspare-a\n");
    let endpoints = endpoints_for(&server.url());
    let client = reqwest::Client::new();

    let outcome = oauth::connect(1, &client, &endpoints, "dead", &pool)
        .await
        .expect("handshake succeeds after rotating to the spare");
    assert_eq!(outcome.oauth_token, "tok-1");
    assert_eq!(outcome.oauth_verifier, "ver-9");

    // The swap must survive on disk: retired credential gone, spare kept once.
    let on_disk = std::fs::read_to_string(&path).expect("read credentials back");
    assert!(!on_disk.contains("dead"));
    assert_eq!(on_disk.matches("spare-a").count(), 1);
}

#[tokio::test]
async fn oauth_exhausted_pool_stops_instead_of_looping() {
    let mut server = mockito::Server::new_async().await;

    let _request_token = server
        .mock("POST", "/api/request-token")
        .match_query(mockito::Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(r#"{"url":"https://idp.example/oauth/authenticate?oauth_token=tok-1"}"#)
        .expect(1)
        .create_async()
        .await;

    let _reject_all = server
        .mock("GET", "/oauth/authenticate")
        .match_query(mockito::Matcher::Any)
        .with_body("Could not authenticate you")
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let (_path, pool) = seeded_pool(&dir, "dead\n");
    let endpoints = endpoints_for(&server.url());
    let client = reqwest::Client::new();

    let result = oauth::connect(1, &client, &endpoints, "dead", &pool).await;
    assert!(matches!(result, Err(HandshakeError::CredentialExhausted)));
}

#[tokio::test]
async fn captcha_polls_until_the_solution_is_ready() {
    let mut server = mockito::Server::new_async().await;

    let _submit = server
        .mock("POST", "/in.php")
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":1,"request":"77"}"#)
        .create_async()
        .await;

    let polls = Arc::new(AtomicUsize::new(0));
    let polls_in_mock = Arc::clone(&polls);
    let _poll = server
        .mock("GET", "/res.php")
        .match_query(mockito::Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |_| {
            if polls_in_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                br#"{"status":0,"request":"CAPCHA_NOT_READY"}"#.to_vec()
            } else {
                br#"{"status":1,"request":"token-xyz"}"#.to_vec()
            }
        })
        .expect_at_least(2)
        .create_async()
        .await;

    let solver = solver_for(&server.url());
    let token = captcha::solve(
        1,
        &reqwest::Client::new(),
        &solver,
        "site-key",
        "https://page.example/",
        None,
    )
    .await
    .expect("solution after one not-ready poll");
    assert_eq!(token, "token-xyz");
    assert!(polls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn captcha_empty_token_is_no_solution_not_success() {
    let mut server = mockito::Server::new_async().await;

    let _submit = server
        .mock("POST", "/in.php")
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":1,"request":"77"}"#)
        .create_async()
        .await;

    let _poll = server
        .mock("GET", "/res.php")
        .match_query(mockito::Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":1,"request":""}"#)
        .create_async()
        .await;

    let solver = solver_for(&server.url());
    let result = captcha::solve(
        1,
        &reqwest::Client::new(),
        &solver,
        "site-key",
        "https://page.example/",
        None,
    )
    .await;
    assert!(matches!(result, Err(CaptchaError::NoSolution)));
}

async fn captcha_happy_path_mocks(server: &mut mockito::Server) -> (mockito::Mock, mockito::Mock) {
    let submit = server
        .mock("POST", "/in.php")
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":1,"request":"77"}"#)
        .create_async()
        .await;
    let poll = server
        .mock("GET", "/res.php")
        .match_query(mockito::Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":1,"request":"token-xyz"}"#)
        .create_async()
        .await;
    (submit, poll)
}

#[tokio::test]
async fn claim_accepts_a_plain_success_body() {
    let mut server = mockito::Server::new_async().await;
    let _captcha = captcha_happy_path_mocks(&mut server).await;
    // The anti-bot layer sees the claim only with the full browser dressing.
    let _faucet = server
        .mock("POST", "/api/faucet")
        .match_header("user-agent", mockito::Matcher::Regex("Mozilla".to_string()))
        .match_header("sec-fetch-site", "same-origin")
        .match_header(
            "referer",
            mockito::Matcher::Regex("oauth_token=tok-1&oauth_verifier=ver-9".to_string()),
        )
        .with_body("Success!")
        .expect(1)
        .create_async()
        .await;

    let endpoints = endpoints_for(&server.url());
    let solver = solver_for(&server.url());
    let handshake = HandshakeOutcome {
        oauth_token: "tok-1".to_string(),
        oauth_verifier: "ver-9".to_string(),
    };

    faucet::claim(
        1,
        &reqwest::Client::new(),
        &endpoints,
        &solver,
        &fast_settings(),
        None,
        Address::ZERO,
        &handshake,
    )
    .await
    .expect("claim accepted");
}

#[tokio::test]
async fn claim_treats_rate_limit_body_as_done() {
    let mut server = mockito::Server::new_async().await;
    let _captcha = captcha_happy_path_mocks(&mut server).await;
    // Even with a failing HTTP status, the rate-limit body means the claim
    // already happened in this window.
    let _faucet = server
        .mock("POST", "/api/faucet")
        .with_status(429)
        .with_body("Please wait 24 hours before requesting again")
        .create_async()
        .await;

    let endpoints = endpoints_for(&server.url());
    let solver = solver_for(&server.url());
    let handshake = HandshakeOutcome {
        oauth_token: "tok-1".to_string(),
        oauth_verifier: "ver-9".to_string(),
    };

    faucet::claim(
        1,
        &reqwest::Client::new(),
        &endpoints,
        &solver,
        &fast_settings(),
        None,
        Address::ZERO,
        &handshake,
    )
    .await
    .expect("rate-limited claim counts as done");
}

#[tokio::test]
async fn claim_surfaces_busy_service_as_a_retryable_error() {
    let mut server = mockito::Server::new_async().await;
    let _captcha = captcha_happy_path_mocks(&mut server).await;
    let _faucet = server
        .mock("POST", "/api/faucet")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let endpoints = endpoints_for(&server.url());
    let solver = solver_for(&server.url());
    let handshake = HandshakeOutcome {
        oauth_token: "tok-1".to_string(),
        oauth_verifier: "ver-9".to_string(),
    };

    let result = faucet::claim(
        1,
        &reqwest::Client::new(),
        &endpoints,
        &solver,
        &fast_settings(),
        None,
        Address::ZERO,
        &handshake,
    )
    .await;
    assert!(matches!(
        result,
        Err(RunnerError::Claim(ClaimError::ServiceBusy))
    ));
}

#[tokio::test]
async fn mint_all_isolates_a_permanently_failing_token() {
    let mut server = mockito::Server::new_async().await;
    let mut chain = ChainConfig::galileo();
    chain.rpc_url = server.url();

    let failing_token = format!("{:#x}", chain.token_address("ETH").expect("ETH token"));
    let failing_attempts = Arc::new(AtomicUsize::new(0));
    let healthy_attempts = Arc::new(AtomicUsize::new(0));
    let failing_in_stub = Arc::clone(&failing_attempts);
    let healthy_in_stub = Arc::clone(&healthy_attempts);

    let _rpc = rpc_stub(&mut server, move |method, params| match method {
        "eth_getBalance" => json!(format!("0x{:x}", 1_000_000_000_000_000u64)),
        "eth_gasPrice" => json!("0x3b9aca00"),
        "eth_getTransactionCount" => json!("0x0"),
        "eth_estimateGas" => {
            let to = params[0]["to"].as_str().unwrap_or_default().to_ascii_lowercase();
            if to == failing_token {
                failing_in_stub.fetch_add(1, Ordering::SeqCst);
                json!({ "error": { "code": 3, "message": "execution reverted: mint paused" } })
            } else {
                healthy_in_stub.fetch_add(1, Ordering::SeqCst);
                // Prior completion in this window is a success equivalent.
                json!({ "error": {
                    "code": 3,
                    "message": "execution reverted: Please wait 24 hours before requesting again"
                } })
            }
        }
        _ => json!({ "error": { "code": -32601, "message": "method not found" } }),
    })
    .await;

    let provider = executor::connect_provider(&chain.rpc_url).expect("provider");
    let signer = PrivateKeySigner::random();
    let mut settings = fast_settings();
    settings.max_attempts = 2;

    let minted = faucet::mint_all(1, &provider, &chain, &settings, &signer)
        .await
        .expect("one broken token must not fail the whole run");
    assert!(minted, "the two healthy tokens count as minted");
    assert_eq!(
        failing_attempts.load(Ordering::SeqCst),
        2,
        "the broken token is retried to exhaustion, then isolated"
    );
    assert_eq!(healthy_attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn activity_runs_after_a_failed_action() {
    let mut server = mockito::Server::new_async().await;
    let mut chain = ChainConfig::galileo();
    chain.rpc_url = server.url();

    let registry = format!("{:#x}", chain.content_registry);
    let activity_attempts = Arc::new(AtomicUsize::new(0));
    let activity_in_stub = Arc::clone(&activity_attempts);

    let _rpc = rpc_stub(&mut server, move |method, params| match method {
        // Below the gas floor: the mint action fails before spending.
        "eth_getBalance" => json!("0x0"),
        "eth_gasPrice" => json!("0x3b9aca00"),
        "eth_getTransactionCount" => json!("0x0"),
        "eth_estimateGas" => {
            let to = params[0]["to"].as_str().unwrap_or_default().to_ascii_lowercase();
            if to == registry {
                activity_in_stub.fetch_add(1, Ordering::SeqCst);
            }
            json!({ "error": { "code": 3, "message": "execution reverted: submissions closed" } })
        }
        _ => json!({ "error": { "code": -32601, "message": "method not found" } }),
    })
    .await;

    let provider = executor::connect_provider(&chain.rpc_url).expect("provider");
    let dir = tempfile::tempdir().expect("tempdir");
    let (_path, pool) = seeded_pool(&dir, "primary\n");
    let ctx = RunContext {
        provider,
        chain,
        settings: fast_settings(),
        endpoints: endpoints_for(&server.url()),
        solver: solver_for(&server.url()),
        pool,
    };

    let succeeded =
        pipeline::process_account(&ctx, 1, TEST_PRIVATE_KEY, None, None, Action::MintAll).await;
    assert!(!succeeded, "an empty wallet cannot mint");
    assert!(
        activity_attempts.load(Ordering::SeqCst) >= 1,
        "the activity transaction is attempted even after the action failed"
    );
}

#[tokio::test]
async fn swap_run_with_no_executed_swaps_reports_failure() {
    let mut server = mockito::Server::new_async().await;
    let mut chain = ChainConfig::galileo();
    chain.rpc_url = server.url();

    let _rpc = rpc_stub(&mut server, move |method, _params| match method {
        "eth_getBalance" => json!(format!("0x{:x}", 1_000_000_000_000_000u64)),
        "eth_call" => json!(hex_word(1_000_000_000_000_000_000)),
        "eth_gasPrice" => json!("0x3b9aca00"),
        "eth_getTransactionCount" => json!("0x0"),
        "eth_estimateGas" => {
            json!({ "error": { "code": 3, "message": "execution reverted: router paused" } })
        }
        _ => json!({ "error": { "code": -32601, "message": "method not found" } }),
    })
    .await;

    let provider = executor::connect_provider(&chain.rpc_url).expect("provider");
    let signer = PrivateKeySigner::random();

    let result = swap::run_swaps(1, &provider, &chain, &fast_settings(), &signer).await;
    assert!(
        matches!(result, Err(RunnerError::Swap(_))),
        "a run where every swap failed must not count as success"
    );
}
