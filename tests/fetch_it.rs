#![cfg(feature = "reqwest")]

// std
use std::net::TcpListener;
// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use bearer_keeper::{
	config::{ClientConfig, RefreshPolicy},
	error::{FetchError, TransportError},
	fetch::ReqwestFetcher,
};

const CLIENT_ID: &str = "keeper-client";
const CLIENT_SECRET: &str = "keeper-secret";
// base64("keeper-client:keeper-secret")
const BASIC_AUTH: &str = "Basic a2VlcGVyLWNsaWVudDprZWVwZXItc2VjcmV0";

// Plain HTTP on loopback; the mock's self-signed HTTPS certificate is not trusted by reqwest.
fn endpoint(server: &MockServer, path: &str) -> String {
	format!("http://{}{path}", server.address())
}

fn build_fetcher(auth_url: &str, policy: &RefreshPolicy) -> ReqwestFetcher {
	let client = ClientConfig::new(CLIENT_ID, CLIENT_SECRET, auth_url)
		.expect("Loopback auth URL should be accepted.");

	ReqwestFetcher::new(client, policy).expect("Reqwest transport should build.")
}

#[tokio::test]
async fn fetch_sends_basic_auth_and_client_credentials_grant() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("authorization", BASIC_AUTH)
				.header("content-type", "application/x-www-form-urlencoded")
				.body("grant_type=client_credentials");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"it-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let fetcher =
		build_fetcher(&endpoint(&server, "/oauth/token"), &RefreshPolicy::default());
	let credential = fetcher.fetch_credential().await.expect("Exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(credential.access_token().expose(), "it-token");
	assert_eq!(credential.token_type(), "Bearer");
	assert_eq!(credential.expires_at() - credential.issued_at(), Duration::seconds(3600));
}

#[tokio::test]
async fn fetch_surfaces_rejection_with_status_and_retry_after() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401)
				.header("retry-after", "7")
				.body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let fetcher =
		build_fetcher(&endpoint(&server, "/oauth/token"), &RefreshPolicy::default());
	let err = fetcher.fetch_credential().await.expect_err("401 must not yield a credential.");

	mock.assert_async().await;

	match err {
		FetchError::AuthRejected { status, body, retry_after } => {
			assert_eq!(status, 401);
			assert!(body.contains("invalid_client"));
			assert_eq!(retry_after, Some(Duration::seconds(7)));
		},
		other => panic!("Expected AuthRejected, got {other:?}."),
	}
}

#[tokio::test]
async fn fetch_rejects_malformed_and_empty_token_bodies() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/malformed");
			then.status(200).body("{\"access_token\":\"x\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/empty");
			then.status(200).body("{\"access_token\":\"\",\"expires_in\":3600}");
		})
		.await;

	let policy = RefreshPolicy::default();
	let malformed = build_fetcher(&endpoint(&server, "/malformed"), &policy)
		.fetch_credential()
		.await
		.expect_err("Missing expires_in must be rejected.");
	let empty = build_fetcher(&endpoint(&server, "/empty"), &policy)
		.fetch_credential()
		.await
		.expect_err("Empty token must be rejected.");

	assert!(matches!(malformed, FetchError::MalformedResponse { status: 200, .. }));
	assert!(matches!(empty, FetchError::EmptyToken));
}

#[tokio::test]
async fn fetch_times_out_on_a_slow_server() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/slow");
			then.status(200)
				.delay(std::time::Duration::from_secs(3))
				.body("{\"access_token\":\"late\",\"expires_in\":3600}");
		})
		.await;

	let policy = RefreshPolicy::default().with_request_timeout(Duration::milliseconds(300));
	let err = build_fetcher(&endpoint(&server, "/slow"), &policy)
		.fetch_credential()
		.await
		.expect_err("Slow server must time out.");

	assert!(err.is_timeout(), "Expected a timeout, got {err:?}.");
}

#[tokio::test]
async fn fetch_reports_network_error_when_nothing_listens() {
	let port = {
		let listener = TcpListener::bind("127.0.0.1:0").expect("Ephemeral port should bind.");

		listener.local_addr().expect("Bound listener has an address.").port()
	};
	let fetcher =
		build_fetcher(&format!("http://127.0.0.1:{port}/oauth/token"), &RefreshPolicy::default());
	let err = fetcher.fetch_credential().await.expect_err("Closed port must fail.");

	assert!(matches!(err, FetchError::Network(TransportError::Network { .. })), "got {err:?}");
}
