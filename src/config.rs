//! Gateway configuration: deployment environment, base URL, timeout, and endpoint paths.
//!
//! Configurations are assembled with [`GatewayConfig::builder`] or loaded from the process
//! environment with [`GatewayConfig::from_env`]. Both paths run the same validation.

// self
use crate::{_prelude::*, endpoints, error::ConfigError};

/// Deployment environment the gateway talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	/// Developer machine; plain HTTP allowed.
	#[default]
	Local,
	/// Pre-production deployment.
	Staging,
	/// Production deployment.
	Production,
}
impl Environment {
	/// Returns a stable lowercase label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Environment::Local => "local",
			Environment::Staging => "staging",
			Environment::Production => "production",
		}
	}

	/// Environment variable holding this environment's API base URL.
	pub const fn base_url_var(self) -> &'static str {
		match self {
			Environment::Local => "AUTH_GATEWAY_API_URL_LOCAL",
			Environment::Staging => "AUTH_GATEWAY_API_URL_STAGING",
			Environment::Production => "AUTH_GATEWAY_API_URL_PRODUCTION",
		}
	}

	/// Base URL used when the environment variable is unset or blank.
	pub const fn default_base_url(self) -> &'static str {
		match self {
			Environment::Local => "http://localhost:5000",
			Environment::Staging => "https://staging.api.ailearncompanion.com",
			Environment::Production => "https://api.ailearncompanion.com",
		}
	}
}
impl FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"local" => Ok(Self::Local),
			"staging" => Ok(Self::Staging),
			"production" => Ok(Self::Production),
			_ => Err(ConfigError::UnknownEnvironment { value: s.to_owned() }),
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Validated gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
	/// Environment the base URL belongs to.
	pub environment: Environment,
	/// API root every request path is appended to.
	pub base_url: Url,
	/// Fixed timeout applied uniformly to every request.
	pub timeout: Duration,
	/// Refresh-token exchange path.
	pub refresh_path: String,
	/// Sign-in path.
	pub sign_in_path: String,
	/// Sign-up path.
	pub sign_up_path: String,
	/// Location handed to the navigator after a refresh failure.
	pub sign_in_redirect: String,
	/// Headers attached to every request unless the request overrides them.
	pub default_headers: BTreeMap<String, String>,
}
impl GatewayConfig {
	/// Environment variable selecting the [`Environment`].
	pub const ENV_VAR: &'static str = "AUTH_GATEWAY_ENV";
	/// Default request timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(15);
	/// Default sign-in redirect location.
	pub const DEFAULT_SIGN_IN_REDIRECT: &'static str = "/login";

	/// Creates a builder rooted at `base_url`.
	pub fn builder(base_url: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(base_url)
	}

	/// Loads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Loads the configuration through `lookup`, which maps variable names to values.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let environment: Environment =
			lookup(Self::ENV_VAR).map(|raw| raw.parse()).transpose()?.unwrap_or_default();
		let raw = lookup(environment.base_url_var())
			.filter(|value| !value.trim().is_empty())
			.unwrap_or_else(|| environment.default_base_url().to_owned());
		let base_url =
			Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		Self::builder(base_url).environment(environment).build()
	}

	/// Returns the timeout as a standard library duration for HTTP clients.
	pub fn std_timeout(&self) -> std::time::Duration {
		std::time::Duration::try_from(self.timeout).unwrap_or_default()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		match self.base_url.scheme() {
			"https" => {},
			"http" if self.environment == Environment::Local => {},
			"http" =>
				return Err(ConfigError::InsecureBaseUrl {
					environment: self.environment.as_str(),
					url: self.base_url.to_string(),
				}),
			_ => return Err(ConfigError::UnsupportedScheme { url: self.base_url.to_string() }),
		}

		if !self.timeout.is_positive() {
			return Err(ConfigError::NonPositiveTimeout);
		}

		validate_path("refresh", &self.refresh_path)?;
		validate_path("sign-in", &self.sign_in_path)?;
		validate_path("sign-up", &self.sign_up_path)?;

		Ok(())
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	config: GatewayConfig,
}
impl GatewayConfigBuilder {
	/// Creates a builder with the default paths, timeout, and JSON headers.
	pub fn new(base_url: Url) -> Self {
		let default_headers = BTreeMap::from([
			("accept".to_owned(), "application/json".to_owned()),
			("content-type".to_owned(), "application/json".to_owned()),
		]);

		Self {
			config: GatewayConfig {
				environment: Environment::default(),
				base_url,
				timeout: GatewayConfig::DEFAULT_TIMEOUT,
				refresh_path: endpoints::auth::REFRESH.into(),
				sign_in_path: endpoints::auth::LOGIN.into(),
				sign_up_path: endpoints::auth::SIGNUP.into(),
				sign_in_redirect: GatewayConfig::DEFAULT_SIGN_IN_REDIRECT.into(),
				default_headers,
			},
		}
	}

	/// Sets the environment.
	pub fn environment(mut self, environment: Environment) -> Self {
		self.config.environment = environment;

		self
	}

	/// Overrides the request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.config.timeout = timeout;

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.config.refresh_path = path.into();

		self
	}

	/// Overrides the sign-in endpoint path.
	pub fn sign_in_path(mut self, path: impl Into<String>) -> Self {
		self.config.sign_in_path = path.into();

		self
	}

	/// Overrides the sign-up endpoint path.
	pub fn sign_up_path(mut self, path: impl Into<String>) -> Self {
		self.config.sign_up_path = path.into();

		self
	}

	/// Overrides the location used after a refresh failure.
	pub fn sign_in_redirect(mut self, location: impl Into<String>) -> Self {
		self.config.sign_in_redirect = location.into();

		self
	}

	/// Adds or replaces a default header.
	pub fn default_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.config.default_headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<GatewayConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

fn validate_path(name: &'static str, path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::InvalidPath { name, path: path.to_owned() })
	}
}
