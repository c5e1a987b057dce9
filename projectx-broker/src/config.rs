use model::UpstreamError;

const BASE_URL_VARS: [&str; 5] = [
    "PROJECTX_API_BASE_URL",
    "PROJECTX_BASE_URL",
    "PROJECTX_GATEWAY_URL",
    "TOPSTEP_API_BASE_URL",
    "TOPSTEPX_API_BASE_URL",
];

const USERNAME_VARS: [&str; 4] = [
    "PROJECTX_USERNAME",
    "PROJECTX_USER_NAME",
    "TOPSTEP_USERNAME",
    "TOPSTEPX_USERNAME",
];

const API_KEY_VARS: [&str; 4] = [
    "PROJECTX_API_KEY",
    "TOPSTEP_API_KEY",
    "TOPSTEPX_API_KEY",
    "PX_API_KEY",
];

const DEFAULT_TIMEOUT_SECONDS: u64 = 20;

/// Connection settings for the ProjectX gateway.
#[derive(Clone, Debug)]
pub struct ProjectXConfig {
    /// Gateway base URL without a trailing slash.
    pub base_url: String,
    /// Login user name.
    pub username: String,
    /// Login API key.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout_seconds: u64,
}

impl ProjectXConfig {
    /// Build a config from explicit values.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        ProjectXConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            api_key: api_key.into(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Read credentials from the environment alias groups.
    ///
    /// Every missing credential is reported by its canonical name in one
    /// error so operators can fix the environment in a single pass.
    pub fn from_env() -> Result<Self, UpstreamError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, UpstreamError> {
        let base_url = first_present(&BASE_URL_VARS, &lookup);
        let username = first_present(&USERNAME_VARS, &lookup);
        let api_key = first_present(&API_KEY_VARS, &lookup);

        let mut missing: Vec<&str> = Vec::new();
        if base_url.is_none() {
            missing.push("PROJECTX_API_BASE_URL");
        }
        if username.is_none() {
            missing.push("PROJECTX_USERNAME");
        }
        if api_key.is_none() {
            missing.push("PROJECTX_API_KEY");
        }

        if !missing.is_empty() {
            let joined = missing.join(", ");
            return Err(UpstreamError::message(format!(
                "Missing ProjectX configuration in environment: {joined}."
            )));
        }

        match (base_url, username, api_key) {
            (Some(base_url), Some(username), Some(api_key)) => {
                Ok(ProjectXConfig::new(base_url, username, api_key))
            }
            _ => Err(UpstreamError::message(
                "Missing ProjectX configuration in environment.",
            )),
        }
    }
}

fn first_present(names: &[&str], lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
    names
        .iter()
        .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
}
