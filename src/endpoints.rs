//! Paths exposed by the backend API, relative to the configured base URL.

/// Authentication endpoints.
pub mod auth {
	/// Credential sign-in; answers with a credential pair.
	pub const LOGIN: &str = "/auth/login";
	/// Account registration.
	pub const SIGNUP: &str = "/auth/signup";
	/// Refresh-token exchange.
	pub const REFRESH: &str = "/auth/refresh";
	/// Signed-in user profile.
	pub const PROFILE: &str = "/auth/profile";
	/// Server-side session termination.
	pub const LOGOUT: &str = "/auth/logout";
	/// Password change for a signed-in user.
	pub const CHANGE_PASSWORD: &str = "/auth/change-password";
	/// Password reset request.
	pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
	/// Password reset confirmation.
	pub const RESET_PASSWORD: &str = "/auth/reset-password";
	/// Access token verification.
	pub const VERIFY_TOKEN: &str = "/auth/verify-token";
}

/// Dashboard endpoints.
pub mod dashboard {
	/// Dashboard overview.
	pub const OVERVIEW: &str = "/dashboard";
	/// Profile page data.
	pub const PROFILE: &str = "/dashboard/profile";
	/// Analytics data.
	pub const ANALYTICS: &str = "/dashboard/analytics";
	/// User settings.
	pub const SETTINGS: &str = "/dashboard/settings";
}
