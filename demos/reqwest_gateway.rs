//! Demonstrates the default reqwest transport against a mock API: sign in, survive an
//! expired access token, and persist the refreshed pair in a file-backed store.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use auth_gateway::{
	config::{Environment, GatewayConfig},
	endpoints,
	gateway::{Gateway, ReqwestGateway},
	http::{ApiRequest, ReqwestTransport},
	retry::RetryPolicy,
	store::{CredentialStore, FileStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path(endpoints::auth::LOGIN);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"stale-access\",\"refresh_token\":\"demo-refresh\"}");
		})
		.await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(endpoints::dashboard::OVERVIEW)
				.header("authorization", "Bearer stale-access");
			then.status(401).body("{\"detail\":\"Access token expired.\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(endpoints::auth::REFRESH);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"fresh-access\",\"refresh_token\":\"rotated-refresh\"}");
		})
		.await;
	let overview = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(endpoints::dashboard::OVERVIEW)
				.header("authorization", "Bearer fresh-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"widgets\":3}");
		})
		.await;
	let config = GatewayConfig::builder(Url::parse(&server.base_url())?)
		.environment(Environment::Local)
		.build()?;
	let snapshot = env::temp_dir().join("auth_gateway_demo_credentials.json");
	let store: Arc<dyn CredentialStore> = Arc::new(FileStore::open(&snapshot)?);
	// The mock server presents a self-signed certificate.
	let client = ReqwestTransport::client_builder(&config)?
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()?;
	let transport = ReqwestTransport::with_client(client, &config);
	let gateway: ReqwestGateway = Gateway::with_transport(config, transport, store);

	gateway.sign_in(&serde_json::json!({ "login_id": "ada", "password": "correct horse" })).await?;

	let response = gateway
		.request_with_policy(ApiRequest::get(endpoints::dashboard::OVERVIEW), RetryPolicy::QUERY)
		.await?;
	let body: serde_json::Value = response.json()?;

	println!("Dashboard payload: {body}.");
	println!(
		"Login calls: {}, expired calls: {}, refresh calls: {}, replays: {}.",
		login.calls_async().await,
		expired.calls_async().await,
		refresh.calls_async().await,
		overview.calls_async().await,
	);
	println!("Credentials persisted to {}.", snapshot.display());

	gateway.sign_out().await?;

	Ok(())
}
