#![cfg(feature = "test")]

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use tokio::sync::oneshot;
// self
use auth_gateway::{
	_preludet::*,
	auth::{CredentialPair, TokenKind, TokenSecret},
	error::TransportError,
	gateway::Gateway,
	http::{ApiRequest, ApiResponse},
	navigation::{Navigator, RecordingNavigator},
	store::{CredentialStore, MemoryStore, StoreFuture},
};

fn pair_body(access: &str, refresh: &str) -> Json {
	serde_json::json!({ "access_token": access, "refresh_token": refresh })
}

async fn stored(harness: &TestHarness, kind: TokenKind) -> Option<String> {
	harness
		.store
		.get(kind)
		.await
		.expect("Memory store reads should succeed.")
		.map(|token| token.expose().to_owned())
}

/// Memory store that can park one refresh-token read after taking its snapshot.
#[derive(Debug, Default)]
struct StallingStore {
	inner: MemoryStore,
	stall: Mutex<Option<oneshot::Receiver<()>>>,
	parked: AtomicBool,
}
impl StallingStore {
	fn stall_next_refresh_read(&self) -> oneshot::Sender<()> {
		let (tx, rx) = oneshot::channel();

		*self.stall.lock() = Some(rx);

		tx
	}

	fn is_parked(&self) -> bool {
		self.parked.load(Ordering::SeqCst)
	}
}
impl CredentialStore for StallingStore {
	fn get(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move {
			let snapshot = self.inner.get(kind).await?;

			if kind == TokenKind::Refresh {
				let stall = self.stall.lock().take();

				if let Some(stall) = stall {
					self.parked.store(true, Ordering::SeqCst);

					let _ = stall.await;
				}
			}

			Ok(snapshot)
		})
	}

	fn set<'a>(&'a self, pair: &'a CredentialPair) -> StoreFuture<'a, ()> {
		self.inner.set(pair)
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		self.inner.clear()
	}
}

#[tokio::test]
async fn non_401_responses_pass_through_unchanged() {
	let harness = build_test_gateway(Some(("T1", "R1"))).await;

	harness.transport.reply_json("/dashboard", 200, serde_json::json!({ "widgets": 3 }));
	harness.transport.reply_json("/dashboard/settings", 403, serde_json::json!({ "detail": "no" }));
	harness
		.transport
		.reply("/dashboard/analytics", Err(TransportError::Io(std::io::Error::other("reset"))));

	let response = harness
		.gateway
		.request(ApiRequest::get("/dashboard"))
		.await
		.expect("200 should pass through.");

	assert_eq!(response, ApiResponse::new(200, BTreeMap::new(), br#"{"widgets":3}"#.to_vec()));

	let err = harness
		.gateway
		.request(ApiRequest::get("/dashboard/settings"))
		.await
		.expect_err("403 should surface as a status error.");

	match err {
		Error::Status(err) => {
			assert_eq!(err.status, 403);
			assert_eq!(err.body, br#"{"detail":"no"}"#);
		},
		other => panic!("Expected a status error, got {other:?}."),
	}

	let err = harness
		.gateway
		.request(ApiRequest::get("/dashboard/analytics"))
		.await
		.expect_err("Transport failures should surface.");

	assert!(matches!(err, Error::Transport(TransportError::Io(_))));
	assert!(harness.transport.sent_to("/auth/refresh").is_empty());

	for request in harness.transport.sent() {
		assert_eq!(request.authorization(), Some("Bearer T1"));
		assert!(!request.is_retried());
	}
}

#[tokio::test]
async fn missing_access_token_sends_without_bearer() {
	let harness = build_test_gateway(None).await;
	let value: Json =
		harness.gateway.get("/dashboard").await.expect("Unauthenticated GET should succeed.");

	assert_eq!(value, serde_json::json!({}));
	assert_eq!(harness.transport.sent()[0].authorization(), None);
}

#[tokio::test]
async fn unauthorized_without_refresh_token_returns_original_401() {
	let harness = build_test_gateway(None).await;

	harness.transport.reply_json("/dashboard", 401, serde_json::json!({ "detail": "expired" }));

	let err = harness
		.gateway
		.request(ApiRequest::get("/dashboard"))
		.await
		.expect_err("401 without a refresh token should fail.");

	assert_eq!(err.status(), Some(401));
	assert!(matches!(err, Error::Status(_)));
	assert!(harness.transport.sent_to("/auth/refresh").is_empty());
	assert_eq!(harness.transport.sent_to("/dashboard").len(), 1);
	assert!(harness.navigator.redirects().is_empty());
}

#[tokio::test]
async fn successful_refresh_replays_once_with_new_bearer() {
	let harness = build_test_gateway(Some(("T1", "R1"))).await;

	harness.transport.reply_json("/dashboard", 401, Json::Null);
	harness.transport.reply_json("/auth/refresh", 200, pair_body("T2", "R2"));
	harness.transport.reply_json("/dashboard", 200, serde_json::json!({ "ok": true }));

	let value: Json =
		harness.gateway.get("/dashboard").await.expect("Replayed request should succeed.");

	assert_eq!(value, serde_json::json!({ "ok": true }));
	assert_eq!(stored(&harness, TokenKind::Access).await.as_deref(), Some("T2"));
	assert_eq!(stored(&harness, TokenKind::Refresh).await.as_deref(), Some("R2"));

	let refresh = harness.transport.sent_to("/auth/refresh");

	assert_eq!(refresh.len(), 1);
	assert_eq!(refresh[0].body, Some(serde_json::json!({ "refresh_token": "R1" })));
	assert_eq!(refresh[0].authorization(), None);

	let sent = harness.transport.sent_to("/dashboard");

	assert_eq!(sent.len(), 2);
	assert_eq!(sent[0].authorization(), Some("Bearer T1"));
	assert!(!sent[0].is_retried());
	assert_eq!(sent[1].authorization(), Some("Bearer T2"));
	assert!(sent[1].is_retried());
	assert_eq!(harness.gateway.refresh_metrics.attempts(), 1);
	assert_eq!(harness.gateway.refresh_metrics.successes(), 1);
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
	let harness = build_test_gateway(Some(("T1", "R1"))).await;
	let gate = harness.transport.hold_refresh();

	for path in ["/a", "/b", "/c"] {
		harness.transport.reply_json(path, 401, Json::Null);
	}

	harness.transport.reply_json("/auth/refresh", 200, pair_body("T2", "R2"));

	let release = async {
		while harness.gateway.pending_waiters() < 2 {
			tokio::task::yield_now().await;
		}

		assert!(harness.gateway.is_refreshing());

		gate.send(()).expect("Refresh gate should still be open.");
	};
	let (a, b, c, ()) = tokio::join!(
		harness.gateway.request(ApiRequest::get("/a")),
		harness.gateway.request(ApiRequest::get("/b")),
		harness.gateway.request(ApiRequest::get("/c")),
		release,
	);

	for result in [a, b, c] {
		result.expect("Every request should succeed after the shared refresh.");
	}

	assert_eq!(harness.transport.sent_to("/auth/refresh").len(), 1);
	assert_eq!(harness.gateway.refresh_metrics.attempts(), 1);
	assert_eq!(harness.gateway.refresh_metrics.waiters(), 2);
	assert_eq!(harness.gateway.refresh_metrics.released(), 2);
	assert!(!harness.gateway.is_refreshing());
	assert_eq!(harness.gateway.pending_waiters(), 0);

	for path in ["/a", "/b", "/c"] {
		let sent = harness.transport.sent_to(path);

		assert_eq!(sent.len(), 2, "{path} should be sent once and replayed once.");
		assert_eq!(sent[1].authorization(), Some("Bearer T2"));
		assert!(sent[1].is_retried());
	}
}

#[tokio::test]
async fn waiters_are_released_in_queue_order_before_the_leader_replays() {
	let harness = build_test_gateway(Some(("T1", "R1"))).await;
	let gate = harness.transport.hold_refresh();
	let metrics = harness.gateway.refresh_metrics.clone();
	let replays = Arc::new(Mutex::new(Vec::new()));
	let log = replays.clone();

	harness.transport.on_send(move |request| {
		if request.is_retried() {
			log.lock().push((request.path.clone(), metrics.released()));
		}
	});

	for path in ["/a", "/b", "/c"] {
		harness.transport.reply_json(path, 401, Json::Null);
	}

	harness.transport.reply_json("/auth/refresh", 200, pair_body("T2", "R2"));

	let spawn = |path: &'static str| {
		let gateway = harness.gateway.clone();

		tokio::spawn(async move { gateway.request(ApiRequest::get(path)).await })
	};
	let a = spawn("/a");

	while !harness.gateway.is_refreshing() {
		tokio::task::yield_now().await;
	}

	let b = spawn("/b");

	while harness.gateway.pending_waiters() < 1 {
		tokio::task::yield_now().await;
	}

	let c = spawn("/c");

	while harness.gateway.pending_waiters() < 2 {
		tokio::task::yield_now().await;
	}

	gate.send(()).expect("Refresh gate should still be open.");

	for handle in [a, b, c] {
		handle
			.await
			.expect("Request task should not panic.")
			.expect("Every request should succeed after the shared refresh.");
	}

	// Both waiters were handed the token before the leader's own replay left.
	assert_eq!(
		*replays.lock(),
		vec![("/a".to_owned(), 2), ("/b".to_owned(), 2), ("/c".to_owned(), 2)]
	);
	assert_eq!(harness.gateway.pending_waiters(), 0);
	assert!(!harness.gateway.is_refreshing());
}

#[tokio::test]
async fn late_leader_refreshes_with_the_rotated_token() {
	let config = test_config();
	let transport = Arc::new(ScriptedTransport::new(config.refresh_path.clone()));
	let store = Arc::new(StallingStore::default());
	let navigator = Arc::new(RecordingNavigator::default());

	store.inner.set(&CredentialPair::new("T1", "R1")).await.expect("Seeding should succeed.");

	let store_dyn: Arc<dyn CredentialStore> = store.clone();
	let navigator_dyn: Arc<dyn Navigator> = navigator.clone();
	let gateway: TestGateway = Gateway::with_transport(config, transport.clone(), store_dyn)
		.with_navigator(navigator_dyn);

	transport.reply_json("/a", 401, Json::Null);
	transport.reply_json("/c", 401, Json::Null);
	transport.reply_json("/auth/refresh", 200, pair_body("T2", "R2"));
	transport.reply_json("/auth/refresh", 200, pair_body("T3", "R3"));

	let resume = store.stall_next_refresh_read();
	// `/c` has seen `R1` and is parked; `/a` rotates the pair to `T2/R2` meanwhile.
	let rotate = async {
		while !store.is_parked() {
			tokio::task::yield_now().await;
		}

		gateway.request(ApiRequest::get("/a")).await.expect("First refresh should succeed.");
		assert!(!gateway.is_refreshing());

		resume.send(()).expect("Parked read should still be waiting.");
	};
	let (late, ()) = tokio::join!(gateway.request(ApiRequest::get("/c")), rotate);

	late.expect("Late request should refresh with the current token and replay.");

	let bodies = transport
		.sent_to("/auth/refresh")
		.into_iter()
		.map(|request| request.body)
		.collect::<Vec<_>>();

	assert_eq!(
		bodies,
		vec![
			Some(serde_json::json!({ "refresh_token": "R1" })),
			Some(serde_json::json!({ "refresh_token": "R2" })),
		]
	);
	assert_eq!(store.inner.snapshot(), Some(CredentialPair::new("T3", "R3")));
	assert!(navigator.redirects().is_empty());

	let replayed = transport.sent_to("/c");

	assert_eq!(replayed.len(), 2);
	assert_eq!(replayed[1].authorization(), Some("Bearer T3"));
}

#[tokio::test]
async fn leader_fails_when_refresh_token_vanishes_before_election() {
	let config = test_config();
	let transport = Arc::new(ScriptedTransport::new(config.refresh_path.clone()));
	let store = Arc::new(StallingStore::default());
	let navigator = Arc::new(RecordingNavigator::default());

	store.inner.set(&CredentialPair::new("T1", "R1")).await.expect("Seeding should succeed.");

	let store_dyn: Arc<dyn CredentialStore> = store.clone();
	let navigator_dyn: Arc<dyn Navigator> = navigator.clone();
	let gateway: TestGateway = Gateway::with_transport(config, transport.clone(), store_dyn)
		.with_navigator(navigator_dyn);

	transport.reply_json("/dashboard", 401, Json::Null);

	let resume = store.stall_next_refresh_read();
	let sign_out = async {
		while !store.is_parked() {
			tokio::task::yield_now().await;
		}

		gateway.sign_out().await.expect("Sign-out should succeed.");
		resume.send(()).expect("Parked read should still be waiting.");
	};
	let (result, ()) = tokio::join!(gateway.request(ApiRequest::get("/dashboard")), sign_out);
	let err = result.expect_err("Refresh without a stored token should fail.");

	match &err {
		Error::RefreshFailed { source } => assert!(matches!(**source, Error::MissingRefreshToken)),
		other => panic!("Expected a refresh failure, got {other:?}."),
	}

	assert!(transport.sent_to("/auth/refresh").is_empty());
	assert!(!gateway.is_refreshing());
	assert_eq!(navigator.redirects(), vec!["/login".to_owned()]);
}

#[tokio::test]
async fn refresh_failure_rejects_waiters_clears_store_and_redirects() {
	let harness = build_test_gateway(Some(("T1", "R1"))).await;
	let gate = harness.transport.hold_refresh();

	harness.transport.reply_json("/a", 401, Json::Null);
	harness.transport.reply_json("/b", 401, Json::Null);
	harness.transport.reply_json("/auth/refresh", 401, serde_json::json!({ "detail": "revoked" }));

	let release = async {
		while harness.gateway.pending_waiters() < 1 {
			tokio::task::yield_now().await;
		}

		gate.send(()).expect("Refresh gate should still be open.");
	};
	let (a, b, ()) = tokio::join!(
		harness.gateway.request(ApiRequest::get("/a")),
		harness.gateway.request(ApiRequest::get("/b")),
		release,
	);
	let a = a.expect_err("Leader should fail with the refresh error.");
	let b = b.expect_err("Waiter should fail with the refresh error.");

	for err in [&a, &b] {
		assert!(err.is_terminal_auth_failure());
		assert_eq!(err.status(), Some(401));
	}

	match (&a, &b) {
		(Error::RefreshFailed { source: left }, Error::RefreshFailed { source: right }) =>
			assert!(Arc::ptr_eq(left, right)),
		other => panic!("Expected shared refresh failures, got {other:?}."),
	}

	assert_eq!(stored(&harness, TokenKind::Access).await, None);
	assert_eq!(stored(&harness, TokenKind::Refresh).await, None);
	assert_eq!(harness.navigator.redirects(), vec!["/login".to_owned()]);
	assert_eq!(harness.gateway.refresh_metrics.failures(), 1);
	assert_eq!(harness.transport.sent_to("/a").len(), 1);
	assert_eq!(harness.transport.sent_to("/b").len(), 1);
}

#[tokio::test]
async fn unusable_refresh_response_counts_as_failure() {
	let harness = build_test_gateway(Some(("T1", "R1"))).await;

	harness.transport.reply_json("/dashboard", 401, Json::Null);
	harness.transport.reply_json("/auth/refresh", 200, pair_body("", "R2"));

	let err = harness
		.gateway
		.request(ApiRequest::get("/dashboard"))
		.await
		.expect_err("Blank access token should fail the refresh.");

	match err {
		Error::RefreshFailed { source } =>
			assert!(matches!(*source, Error::UnusableCredentials { field: "access_token" })),
		other => panic!("Expected a refresh failure, got {other:?}."),
	}

	assert!(harness.store.snapshot().is_none());
	assert_eq!(harness.navigator.redirects(), vec!["/login".to_owned()]);
}

#[tokio::test]
async fn replayed_request_401_does_not_refresh_again() {
	let harness = build_test_gateway(Some(("T1", "R1"))).await;

	harness.transport.reply_json("/dashboard", 401, Json::Null);
	harness.transport.reply_json("/auth/refresh", 200, pair_body("T2", "R2"));
	harness.transport.reply_json("/dashboard", 401, serde_json::json!({ "detail": "still no" }));

	let err = harness
		.gateway
		.request(ApiRequest::get("/dashboard"))
		.await
		.expect_err("Second 401 should surface.");

	match err {
		Error::Status(err) => {
			assert_eq!(err.status, 401);
			assert!(err.request.is_retried());
		},
		other => panic!("Expected the replay's 401, got {other:?}."),
	}

	assert_eq!(harness.transport.sent_to("/auth/refresh").len(), 1);
	assert_eq!(harness.transport.sent_to("/dashboard").len(), 2);
	assert!(harness.navigator.redirects().is_empty());
	assert_eq!(stored(&harness, TokenKind::Access).await.as_deref(), Some("T2"));
}

#[tokio::test]
async fn pre_marked_request_skips_refresh() {
	let harness = build_test_gateway(Some(("T1", "R1"))).await;

	harness.transport.reply_json("/dashboard", 401, Json::Null);

	let err = harness
		.gateway
		.request(ApiRequest::get("/dashboard").mark_retried())
		.await
		.expect_err("401 on a replayed request should surface.");

	assert_eq!(err.status(), Some(401));
	assert!(harness.transport.sent_to("/auth/refresh").is_empty());
}

#[tokio::test]
async fn dropped_leader_abandons_waiters() {
	let harness = build_test_gateway(Some(("T1", "R1"))).await;
	let _gate = harness.transport.hold_refresh();

	harness.transport.reply_json("/a", 401, Json::Null);
	harness.transport.reply_json("/b", 401, Json::Null);

	let leader = tokio::time::timeout(
		std::time::Duration::from_millis(100),
		harness.gateway.request(ApiRequest::get("/a")),
	);
	let waiter = async {
		while !harness.gateway.is_refreshing() {
			tokio::task::yield_now().await;
		}

		harness.gateway.request(ApiRequest::get("/b")).await
	};
	let (leader, waiter) = tokio::join!(leader, waiter);

	assert!(leader.is_err(), "Leader should be cancelled by the timeout.");
	assert!(matches!(waiter, Err(Error::RefreshAbandoned)));
	assert!(!harness.gateway.is_refreshing());
	assert_eq!(harness.transport.sent_to("/b").len(), 1);
	assert_eq!(stored(&harness, TokenKind::Refresh).await.as_deref(), Some("R1"));
}

#[tokio::test]
async fn clones_share_refresh_state() {
	let harness = build_test_gateway(Some(("T1", "R1"))).await;
	let clone = harness.gateway.clone();
	let gate = harness.transport.hold_refresh();

	harness.transport.reply_json("/a", 401, Json::Null);
	harness.transport.reply_json("/b", 401, Json::Null);
	harness.transport.reply_json("/auth/refresh", 200, pair_body("T2", "R2"));

	let release = async {
		while clone.pending_waiters() < 1 {
			tokio::task::yield_now().await;
		}

		gate.send(()).expect("Refresh gate should still be open.");
	};
	let (a, b, ()) = tokio::join!(
		harness.gateway.request(ApiRequest::get("/a")),
		clone.request(ApiRequest::get("/b")),
		release,
	);

	a.expect("Original handle should succeed.");
	b.expect("Cloned handle should succeed.");

	assert_eq!(harness.transport.sent_to("/auth/refresh").len(), 1);
}
