use crate::bottle::{BottlePolicy, OnStorageFailure, DEFAULT_CANDIDATE_WINDOW};

#[derive(Clone, Debug)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub bucket: String,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// Runtime configuration, read once from the environment at start-up.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    /// No URL means the in-memory backend.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Secret required to delete files; deletion is refused while unset.
    pub admin_secret: Option<String>,
    /// Value of `Access-Control-Allow-Origin`.
    pub cors_allow_origin: String,
    pub s3: S3Config,
    pub bottle_policy: BottlePolicy,
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Unparseable values fall back to `default` with a warning.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = non_empty_env(name) else {
        return default;
    };
    match raw.parse() {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(var = name, value = %raw, error = %e, "ignoring unparseable environment value, using default");
            default
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let failure_policy = parse_env("BOTTLE_FAILURE_POLICY", OnStorageFailure::Degrade);
        Self {
            bind_addr: non_empty_env("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_env("PORT", 8080),
            database_url: non_empty_env("DATABASE_URL"),
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 5),
            admin_secret: non_empty_env("ADMIN_SECRET"),
            cors_allow_origin: non_empty_env("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".into()),
            s3: S3Config {
                endpoint: non_empty_env("S3_ENDPOINT"),
                bucket: non_empty_env("S3_BUCKET").unwrap_or_else(|| "driftpost-assets".into()),
                region: non_empty_env("S3_REGION").unwrap_or_else(|| "us-east-1".into()),
                access_key: non_empty_env("S3_ACCESS_KEY"),
                secret_key: non_empty_env("S3_SECRET_KEY"),
            },
            bottle_policy: BottlePolicy {
                candidate_window: parse_env("BOTTLE_CANDIDATE_WINDOW", DEFAULT_CANDIDATE_WINDOW).max(1),
                pick: failure_policy,
                close: failure_policy,
            },
        }
    }

    /// Names of required variables that are missing.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.s3.endpoint.is_none() {
            missing.push("S3_ENDPOINT");
        }
        missing
    }
}
