use std::env;

/// Application configuration loaded from environment variables, per §6.
///
/// All subcommands (`worker`, `scheduler`, `run-once`) share this single
/// shape — unlike the multi-role split the pipeline this crate was modeled
/// on uses, the ingestion core has no per-role field split.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,

    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    pub postgres_dsn: String,

    pub gdelt_base_url: String,
    pub gdelt_focus_countries: Vec<String>,

    pub cvr_api_url: String,
    pub cvr_api_key: Option<String>,

    pub rss_feed_urls: Vec<String>,

    pub spacy_model: String,

    pub geocoder_user_agent: String,
    pub geocoder_rate_limit: f64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379/0".to_string()),

            neo4j_uri: required_env("NEO4J_URI"),
            neo4j_user: required_env("NEO4J_USER"),
            neo4j_password: required_env("NEO4J_PASSWORD"),

            postgres_dsn: required_env("POSTGRES_DSN"),

            gdelt_base_url: env::var("GDELT_BASE_URL")
                .unwrap_or_else(|_| "http://data.gdeltproject.org/gdeltv2".to_string()),
            gdelt_focus_countries: split_csv_env("GDELT_FOCUS_COUNTRIES"),

            cvr_api_url: env::var("CVR_API_URL")
                .unwrap_or_else(|_| "https://distribution.virk.dk/cvr-permanent/virksomhed/_search".to_string()),
            cvr_api_key: env::var("CVR_API_KEY").ok().filter(|v| !v.is_empty()),

            rss_feed_urls: split_csv_env("RSS_FEED_URLS"),

            spacy_model: env::var("SPACY_MODEL").unwrap_or_else(|_| "en_core_web_sm".to_string()),

            geocoder_user_agent: env::var("GEOCODER_USER_AGENT")
                .unwrap_or_else(|_| "sentinel-ingest/0.1".to_string()),
            geocoder_rate_limit: env::var("GEOCODER_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1.0),
        }
    }

    /// Log the lengths (never the values) of sensitive env-derived fields.
    pub fn log_redacted(&self) {
        let vars = [
            ("NEO4J_URI", self.neo4j_uri.as_str()),
            ("NEO4J_USER", self.neo4j_user.as_str()),
            ("NEO4J_PASSWORD", self.neo4j_password.as_str()),
            ("POSTGRES_DSN", self.postgres_dsn.as_str()),
            ("CVR_API_KEY", self.cvr_api_key.as_deref().unwrap_or("")),
        ];
        for (name, value) in vars {
            if value.is_empty() {
                tracing::info!("{name} = (empty)");
            } else {
                tracing::info!("{name} = ({} chars)", value.len());
            }
        }
    }
}

fn split_csv_env(key: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_env_trims_and_drops_empty() {
        std::env::set_var("SENTINEL_TEST_CSV", " a, b ,,c");
        assert_eq!(split_csv_env("SENTINEL_TEST_CSV"), vec!["a", "b", "c"]);
        std::env::remove_var("SENTINEL_TEST_CSV");
    }

    #[test]
    fn split_csv_env_missing_is_empty() {
        std::env::remove_var("SENTINEL_TEST_CSV_MISSING");
        assert!(split_csv_env("SENTINEL_TEST_CSV_MISSING").is_empty());
    }
}
