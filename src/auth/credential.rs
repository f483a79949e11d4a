//! Access/refresh credential pair and the token kinds a store can hand out.

// self
use crate::{_prelude::*, auth::TokenSecret, error::DecodeError};

/// Selects one half of a [`CredentialPair`] when reading from a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
	/// Short-lived bearer credential attached to outbound requests.
	Access,
	/// Longer-lived secret exchanged for a new pair.
	Refresh,
}
impl TokenKind {
	/// Returns the stable storage key for this kind.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKind::Access => "access_token",
			TokenKind::Refresh => "refresh_token",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Access and refresh tokens issued together by sign-in or refresh.
///
/// The wire form matches the API's token responses:
/// `{"access_token": "...", "refresh_token": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Bearer credential.
	pub access_token: TokenSecret,
	/// Refresh secret.
	pub refresh_token: TokenSecret,
}
impl CredentialPair {
	/// Creates a pair from raw token strings.
	pub fn new(access: impl Into<TokenSecret>, refresh: impl Into<TokenSecret>) -> Self {
		Self { access_token: access.into(), refresh_token: refresh.into() }
	}

	/// Returns the secret for the requested kind.
	pub fn get(&self, kind: TokenKind) -> &TokenSecret {
		match kind {
			TokenKind::Access => &self.access_token,
			TokenKind::Refresh => &self.refresh_token,
		}
	}

	/// Decodes and validates a token response body.
	pub fn from_response(status: u16, body: &[u8]) -> Result<Self> {
		let pair: Self = DecodeError::decode(status, body)?;

		pair.validate()?;

		Ok(pair)
	}

	/// Rejects pairs where either token is blank.
	pub fn validate(&self) -> Result<()> {
		for kind in [TokenKind::Access, TokenKind::Refresh] {
			if self.get(kind).is_blank() {
				return Err(Error::UnusableCredentials { field: kind.as_str() });
			}
		}

		Ok(())
	}
}
