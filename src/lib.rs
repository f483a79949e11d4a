//! Authenticated request gateway with bearer injection and single-flight credential refresh.
//!
//! A request rejected with `401` is replayed exactly once after the shared refresh settles.
//! See [`gateway::Gateway`] for the entry point.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod gateway;
pub mod http;
pub mod navigation;
pub mod obs;
pub mod retry;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	use crate::{
		auth::CredentialPair,
		config::GatewayConfig,
		gateway::Gateway,
		http::{ApiRequest, ApiResponse, HttpTransport, TransportFuture},
		navigation::{Navigator, RecordingNavigator},
		store::{CredentialStore, MemoryStore},
	};

	/// Scripted reply returned by [`ScriptedTransport`].
	pub type ScriptedReply = std::result::Result<ApiResponse, crate::error::TransportError>;

	type SendHook = Box<dyn Fn(&ApiRequest) + Send + Sync>;

	/// In-process transport that replays scripted responses and records every dispatched request.
	///
	/// Replies are matched by request path in FIFO order. A path with no scripted reply left
	/// answers `200 {}`. The first refresh call can be held open with
	/// [`ScriptedTransport::hold_refresh`] so tests can pile concurrent requests onto it.
	#[derive(Default)]
	pub struct ScriptedTransport {
		replies: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
		sent: Mutex<Vec<ApiRequest>>,
		refresh_gate: Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
		on_send: Mutex<Option<SendHook>>,
		refresh_path: String,
	}
	impl ScriptedTransport {
		/// Creates a transport that treats `refresh_path` as the refresh endpoint.
		pub fn new(refresh_path: impl Into<String>) -> Self {
			Self { refresh_path: refresh_path.into(), ..Default::default() }
		}

		/// Queues a reply for the next request to `path`.
		pub fn reply(&self, path: &str, reply: ScriptedReply) {
			self.replies.lock().entry(path.to_owned()).or_default().push_back(reply);
		}

		/// Queues a JSON reply with the provided status for the next request to `path`.
		pub fn reply_json(&self, path: &str, status: u16, body: Json) {
			let body = serde_json::to_vec(&body).expect("Scripted body should serialize.");

			self.reply(path, Ok(ApiResponse::new(status, BTreeMap::new(), body)));
		}

		/// Blocks the next refresh call until the returned sender fires or is dropped.
		pub fn hold_refresh(&self) -> tokio::sync::oneshot::Sender<()> {
			let (tx, rx) = tokio::sync::oneshot::channel();

			*self.refresh_gate.lock() = Some(rx);

			tx
		}

		/// Runs `hook` on every request as it is dispatched, before its reply is produced.
		pub fn on_send(&self, hook: impl Fn(&ApiRequest) + Send + Sync + 'static) {
			*self.on_send.lock() = Some(Box::new(hook));
		}

		/// Returns every request dispatched so far, in dispatch order.
		pub fn sent(&self) -> Vec<ApiRequest> {
			self.sent.lock().clone()
		}

		/// Returns the dispatched requests whose path matches `path`.
		pub fn sent_to(&self, path: &str) -> Vec<ApiRequest> {
			self.sent.lock().iter().filter(|request| request.path == path).cloned().collect()
		}
	}
	impl Debug for ScriptedTransport {
		fn fmt(&self, f: &mut Formatter) -> FmtResult {
			f.debug_struct("ScriptedTransport")
				.field("refresh_path", &self.refresh_path)
				.field("sent", &self.sent.lock().len())
				.finish_non_exhaustive()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a> {
			Box::pin(async move {
				self.sent.lock().push(request.clone());

				if let Some(hook) = self.on_send.lock().as_ref() {
					hook(request);
				}

				if request.path == self.refresh_path {
					let gate = self.refresh_gate.lock().take();

					if let Some(gate) = gate {
						let _ = gate.await;
					}
				}

				let reply = self.replies.lock().get_mut(&request.path).and_then(VecDeque::pop_front);

				reply.unwrap_or_else(|| Ok(ApiResponse::new(200, BTreeMap::new(), b"{}".to_vec())))
			})
		}
	}

	/// Gateway wired to a [`ScriptedTransport`], an in-memory store, and a recording navigator.
	pub type TestGateway = Gateway<ScriptedTransport>;

	/// Fixture bundle returned by [`build_test_gateway`].
	pub struct TestHarness {
		/// Gateway under test.
		pub gateway: TestGateway,
		/// Transport shared with the gateway.
		pub transport: Arc<ScriptedTransport>,
		/// Store shared with the gateway.
		pub store: Arc<MemoryStore>,
		/// Navigator shared with the gateway.
		pub navigator: Arc<RecordingNavigator>,
	}

	/// Test configuration rooted at `http://localhost`.
	pub fn test_config() -> GatewayConfig {
		GatewayConfig::builder(
			Url::parse("http://localhost").expect("Test base URL should parse successfully."),
		)
		.build()
		.expect("Test configuration should be valid.")
	}

	/// Builds a gateway over scripted collaborators, optionally seeding a credential pair.
	pub async fn build_test_gateway(seed: Option<(&str, &str)>) -> TestHarness {
		let config = test_config();
		let transport = Arc::new(ScriptedTransport::new(config.refresh_path.clone()));
		let store = Arc::new(MemoryStore::default());
		let navigator = Arc::new(RecordingNavigator::default());

		if let Some((access, refresh)) = seed {
			store
				.set(&CredentialPair::new(access, refresh))
				.await
				.expect("Seeding the memory store should succeed.");
		}

		let store_dyn: Arc<dyn CredentialStore> = store.clone();
		let navigator_dyn: Arc<dyn Navigator> = navigator.clone();
		let gateway = Gateway::with_transport(config, transport.clone(), store_dyn)
			.with_navigator(navigator_dyn);

		TestHarness { gateway, transport, store, navigator }
	}

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_transport(config: &GatewayConfig) -> crate::http::ReqwestTransport {
		let client = crate::http::ReqwestTransport::client_builder(config)
			.expect("Test configuration headers should be valid.")
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		crate::http::ReqwestTransport::with_client(client, config)
	}

	/// Builds a reqwest-backed gateway pointed at an `httpmock` server base URL.
	#[cfg(feature = "reqwest")]
	pub fn build_reqwest_test_gateway(
		base_url: &str,
	) -> (Gateway<crate::http::ReqwestTransport>, Arc<MemoryStore>) {
		let config = GatewayConfig::builder(
			Url::parse(base_url).expect("Mock server base URL should parse successfully."),
		)
		.build()
		.expect("Mock server configuration should be valid.");
		let transport = test_reqwest_transport(&config);
		let store = Arc::new(MemoryStore::default());
		let store_dyn: Arc<dyn CredentialStore> = store.clone();
		let gateway = Gateway::with_transport(config, transport, store_dyn);

		(gateway, store)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value as Json;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
