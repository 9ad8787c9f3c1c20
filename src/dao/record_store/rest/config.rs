use super::error::{RestDaoError, RestResult};

/// Runtime configuration describing how to reach a PostgREST-compatible backend
/// (Supabase or a self-hosted PostgREST).
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, without the `/rest/v1` suffix.
    pub base_url: String,
    /// Anonymous or service API key, sent as the `apikey` header.
    pub api_key: String,
    /// Signed-in user's access token; the API key is used as bearer when absent.
    pub access_token: Option<String>,
}

impl RestConfig {
    /// Construct a configuration from an explicit project URL and API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
        }
    }

    /// Attach the signed-in user's access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> RestResult<Self> {
        let base_url = std::env::var("SUPABASE_URL").map_err(|_| RestDaoError::MissingEnvVar {
            var: "SUPABASE_URL",
        })?;
        let api_key = std::env::var("SUPABASE_KEY").map_err(|_| RestDaoError::MissingEnvVar {
            var: "SUPABASE_KEY",
        })?;

        let mut config = Self::new(base_url, api_key);

        if let Ok(token) = std::env::var("SUPABASE_ACCESS_TOKEN") {
            config = config.with_access_token(token);
        }

        Ok(config)
    }
}
