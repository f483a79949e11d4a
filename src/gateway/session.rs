//! Session helpers layered over the gateway: sign-in, sign-up, sign-out.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind},
	gateway::Gateway,
	http::{ApiRequest, HttpTransport},
	obs::{self, CallOutcome, CallSpan, Stage, trace_event},
};

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Exchanges sign-in `credentials` for a credential pair and stores it.
	///
	/// The sign-in call bypasses bearer injection and the 401 protocol; a rejected sign-in
	/// surfaces as [`Error::Status`] and leaves the store untouched.
	pub async fn sign_in<B>(&self, credentials: &B) -> Result<CredentialPair>
	where
		B: ?Sized + Serialize,
	{
		const STAGE: Stage = Stage::SignIn;

		let request = ApiRequest::post(&self.config.sign_in_path).with_json(credentials)?;
		let span = CallSpan::new(STAGE, &request);

		obs::record_call_outcome(STAGE, CallOutcome::Attempt);

		let result = span
			.instrument(async {
				let pair = self.exchange(&request).await?;

				self.store.set(&pair).await?;
				trace_event!(info, "Signed in; credentials stored.");

				Ok(pair)
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(STAGE, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(STAGE, CallOutcome::Failure),
		}

		result
	}

	/// Registers an account with `form` and returns the decoded response.
	///
	/// Registration does not sign the user in; call [`Gateway::sign_in`] afterwards.
	pub async fn sign_up<B, R>(&self, form: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.post(&self.config.sign_up_path, form).await
	}

	/// Drops the stored credential pair.
	pub async fn sign_out(&self) -> Result<()> {
		self.store.clear().await?;
		trace_event!(info, "Signed out; credentials cleared.");

		Ok(())
	}

	/// Returns `true` when an access token is stored.
	pub async fn is_authenticated(&self) -> Result<bool> {
		Ok(self.store.get(TokenKind::Access).await?.is_some())
	}
}

#[cfg(test)]
mod tests {
	// self
	use crate::{_preludet::*, store::CredentialStore};

	#[tokio::test]
	async fn sign_in_stores_the_issued_pair() {
		let harness = build_test_gateway(None).await;

		harness.transport.reply_json(
			"/auth/login",
			200,
			serde_json::json!({ "access_token": "T1", "refresh_token": "R1" }),
		);

		assert!(!harness.gateway.is_authenticated().await.expect("Store read should succeed."));

		let pair = harness
			.gateway
			.sign_in(&serde_json::json!({ "login_id": "ada", "password": "pw" }))
			.await
			.expect("Sign-in should succeed.");

		assert_eq!(pair.access_token.expose(), "T1");
		assert_eq!(harness.store.snapshot(), Some(pair));
		assert!(harness.gateway.is_authenticated().await.expect("Store read should succeed."));

		let sent = harness.transport.sent_to("/auth/login");

		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].authorization(), None);
	}

	#[tokio::test]
	async fn rejected_sign_in_leaves_store_empty() {
		let harness = build_test_gateway(None).await;

		harness.transport.reply_json(
			"/auth/login",
			401,
			serde_json::json!({ "detail": "Invalid credentials." }),
		);

		let err = harness
			.gateway
			.sign_in(&serde_json::json!({ "login_id": "ada", "password": "nope" }))
			.await
			.expect_err("Rejected sign-in should fail.");

		assert_eq!(err.status(), Some(401));
		assert!(harness.store.snapshot().is_none());
		assert!(harness.transport.sent_to("/auth/refresh").is_empty());
	}

	#[tokio::test]
	async fn sign_out_clears_credentials() {
		let harness = build_test_gateway(Some(("T1", "R1"))).await;

		harness.gateway.sign_out().await.expect("Sign-out should succeed.");

		assert!(harness.store.get(crate::auth::TokenKind::Access).await.expect("Read.").is_none());
		assert!(!harness.gateway.is_authenticated().await.expect("Store read should succeed."));
	}
}
