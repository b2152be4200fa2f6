//! Client configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use portal_auth::GuardConfig;
use portal_core::DomainError;
use portal_navigation::ResolverConfig;

use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_MENU_ENDPOINT: &str = "/menus";
pub const DEFAULT_STORAGE_PATH: &str = "portal-storage.json";

/// Settings shared by the API client, resolver and guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Fixed API prefix every request path is appended to.
    pub base_url: String,
    pub request_timeout: Duration,
    /// Remote menu fetches slower than this fall back to the static catalog.
    pub menu_timeout: Duration,
    /// Menu resource prefix; role menus live at `{menu_endpoint}/role/{role}`.
    pub menu_endpoint: String,
    pub login_path: String,
    pub home_path: String,
    pub storage_path: PathBuf,
    pub verify_remote_menu: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            menu_timeout: Duration::from_secs(5),
            menu_endpoint: DEFAULT_MENU_ENDPOINT.to_string(),
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            verify_remote_menu: false,
        }
    }
}

impl ClientConfig {
    /// Load from `PORTAL_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup. Unset variables keep their
    /// defaults; set-but-invalid ones are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let mut config = Self::default();

        match lookup("PORTAL_API_BASE_URL") {
            Some(url) => config.base_url = url,
            None => tracing::warn!("PORTAL_API_BASE_URL not set; using {DEFAULT_BASE_URL}"),
        }
        if let Some(secs) = lookup("PORTAL_API_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("PORTAL_API_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("PORTAL_MENU_TIMEOUT_SECS") {
            config.menu_timeout = parse_secs("PORTAL_MENU_TIMEOUT_SECS", &secs)?;
        }
        if let Some(endpoint) = lookup("PORTAL_MENU_ENDPOINT") {
            config.menu_endpoint = endpoint;
        }
        if let Some(path) = lookup("PORTAL_LOGIN_PATH") {
            config.login_path = path;
        }
        if let Some(path) = lookup("PORTAL_HOME_PATH") {
            config.home_path = path;
        }
        if let Some(path) = lookup("PORTAL_STORAGE_PATH") {
            config.storage_path = PathBuf::from(path);
        }
        if let Some(flag) = lookup("PORTAL_VERIFY_REMOTE_MENU") {
            config.verify_remote_menu = parse_bool("PORTAL_VERIFY_REMOTE_MENU", &flag)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::Config(format!("invalid base url '{}': {e}", self.base_url))
        })?;
        if url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base url '{}' cannot be a base",
                self.base_url
            )));
        }
        if !self.menu_endpoint.starts_with('/') {
            return Err(ClientError::Config("menu endpoint must start with '/'".to_string()));
        }
        if self.request_timeout.is_zero() || self.menu_timeout.is_zero() {
            return Err(ClientError::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Absolute URL for an API path such as `/menus/role/USER`.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// [`url`](Self::url) for `path` with `segment` appended as one
    /// percent-encoded path segment, so `/` or `..` inside it cannot move the
    /// request to another resource.
    pub fn url_with_segment(&self, path: &str, segment: &str) -> Result<Url, ClientError> {
        if matches!(segment, "" | "." | "..") {
            return Err(ClientError::Domain(DomainError::validation(format!(
                "'{segment}' is not a usable path segment"
            ))));
        }
        let mut url = Url::parse(&self.url(path))
            .map_err(|e| ClientError::Config(format!("invalid url for '{path}': {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Config(format!("'{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    pub fn guard_config(&self) -> GuardConfig {
        GuardConfig {
            login_path: self.login_path.clone(),
            fallback_path: self.home_path.clone(),
            show_notice: true,
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            fetch_timeout: self.menu_timeout,
            verify_remote: self.verify_remote_menu,
        }
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, ClientError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ClientError::Config(format!("{key}: {e}")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ClientError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ClientError::Config(format!("{key}: expected a boolean, got '{other}'"))),
    }
}
