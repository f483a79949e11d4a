//! Demonstrates plugging a custom [`HttpTransport`] into the gateway.
//!
//! 1. Implement [`HttpTransport`] so every status comes back as an [`ApiResponse`] and only
//!    missing responses become [`TransportError`]s.
//! 2. Wrap the transport in `Arc` and pass it to [`Gateway::with_transport`].
//! 3. Watch an expired access token get refreshed once and the request replayed.
//! 4. Watch a revoked refresh token clear the store and trigger the navigator.

// std
use std::{
	collections::BTreeMap,
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU32, Ordering},
	},
};
// crates.io
use color_eyre::Result;
use url::Url;
// self
use auth_gateway::{
	config::GatewayConfig,
	endpoints,
	error::TransportError,
	gateway::Gateway,
	http::{ApiRequest, ApiResponse, HttpTransport, TransportFuture},
	navigation::{CallbackNavigator, Navigator},
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = GatewayConfig::builder(Url::parse("https://api.example.com")?).build()?;
	let store = Arc::new(MemoryStore::default());
	let store_dyn: Arc<dyn CredentialStore> = store.clone();
	let navigator: Arc<dyn Navigator> = Arc::new(CallbackNavigator::new(|location| {
		println!("Navigator asked to redirect to {location}.");
	}));
	let transport = Arc::new(MockBackend::default());
	let gateway: Gateway<MockBackend> =
		Gateway::with_transport(config, transport.clone(), store_dyn).with_navigator(navigator);
	let pair = gateway
		.sign_in(&serde_json::json!({ "login_id": "ada", "password": "correct horse" }))
		.await?;

	println!("Signed in; access token {} stored.", pair.access_token);

	let overview: serde_json::Value = gateway.get(endpoints::dashboard::OVERVIEW).await?;

	println!("Dashboard after a transparent refresh: {overview}.");
	println!("Refresh calls so far: {}.", gateway.refresh_metrics.attempts());

	transport.revoke_refresh.store(true, Ordering::Relaxed);
	transport.expire_access.store(true, Ordering::Relaxed);

	match gateway.get::<serde_json::Value>(endpoints::dashboard::ANALYTICS).await {
		Ok(_) => println!("Mock backend unexpectedly accepted the revoked session."),
		Err(e) => println!("Refresh failure surfaced to the caller: {e}"),
	}

	println!("Credentials still stored: {}.", store.snapshot().is_some());

	let offline: Gateway<MockBackend> = Gateway::with_transport(
		gateway.config.clone(),
		MockBackend { offline: true, ..Default::default() },
		Arc::new(MemoryStore::default()),
	);

	match offline.request(ApiRequest::get(endpoints::auth::PROFILE)).await {
		Ok(_) => println!("Offline backend unexpectedly answered."),
		Err(e) => println!("Transport error surfaced unchanged: {e}"),
	}

	Ok(())
}

#[derive(Debug)]
struct HostUnreachable(&'static str);
impl Display for HostUnreachable {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Host {} is unreachable", self.0)
	}
}
impl StdError for HostUnreachable {}

/// Backend that issues numbered tokens and expires the first access token it hands out.
#[derive(Debug, Default)]
struct MockBackend {
	generation: AtomicU32,
	expire_access: AtomicBool,
	revoke_refresh: AtomicBool,
	offline: bool,
}
impl MockBackend {
	fn issue(&self) -> ApiResponse {
		let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
		let body = serde_json::json!({
			"access_token": format!("access-{generation}"),
			"refresh_token": format!("refresh-{generation}"),
		});

		self.expire_access.store(generation == 1, Ordering::Relaxed);

		json_response(200, body)
	}

	fn serve(&self, request: &ApiRequest) -> ApiResponse {
		match request.path.as_str() {
			endpoints::auth::LOGIN => self.issue(),
			endpoints::auth::REFRESH if self.revoke_refresh.load(Ordering::Relaxed) =>
				json_response(401, serde_json::json!({ "detail": "Refresh token revoked." })),
			endpoints::auth::REFRESH => self.issue(),
			_ if request.authorization().is_none() || self.expire_access.load(Ordering::Relaxed) =>
				json_response(401, serde_json::json!({ "detail": "Access token expired." })),
			path => json_response(200, serde_json::json!({ "path": path, "widgets": 3 })),
		}
	}
}
impl HttpTransport for MockBackend {
	fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a> {
		Box::pin(async move {
			if self.offline {
				return Err(TransportError::network(HostUnreachable("api.example.com")));
			}

			Ok(self.serve(request))
		})
	}
}

fn json_response(status: u16, body: serde_json::Value) -> ApiResponse {
	let headers = BTreeMap::from([("content-type".to_owned(), "application/json".to_owned())]);

	ApiResponse::new(status, headers, body.to_string().into_bytes())
}
