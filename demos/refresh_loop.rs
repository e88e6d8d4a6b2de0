//! Runs the refresh scheduler against a mock authorization server and prints the bearer header
//! it keeps fresh for downstream requests.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use bearer_keeper::{
	config::{ClientConfig, RefreshPolicy},
	refresh::RefreshScheduler,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":3}",
			);
		})
		.await;
	let auth_url = format!("http://{}/oauth/token", server.address());
	let client = ClientConfig::new("demo-client", "super-secret", &auth_url)?;
	let policy = RefreshPolicy::default().with_refresh_margin(time::Duration::seconds(1));
	let task = RefreshScheduler::from_config(client, policy)?.spawn();
	let handle = task.token_handle();

	task.ready_within(time::Duration::seconds(10)).await?;

	for _ in 0..3 {
		let credential = handle.current_credential()?;

		println!(
			"Authorization ready ({}), expires at {}.",
			credential.fingerprint(),
			credential.expires_at()
		);

		tokio::time::sleep(std::time::Duration::from_secs(2)).await;
	}

	println!("Token endpoint called {} times.", token_mock.calls_async().await);

	task.shutdown().await;

	Ok(())
}
