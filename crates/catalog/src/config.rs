//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Catalog view configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Delay applied to search-as-you-type input (default: 500ms).
    pub search_debounce: Duration,

    /// Upper bound on a single catalog fetch (default: 10s).
    pub fetch_timeout: Duration,

    /// Maximum number of records requested per load (default: 50).
    pub result_limit: u32,

    /// JSON-RPC endpoint of the catalog service. Required by the binary only.
    pub rpc_url: Option<String>,

    /// Remote model queried by the RPC source (default: "library.book").
    pub rpc_model: String,

    /// Remote model searched for author suggestions (default: "library.author").
    pub rpc_author_model: String,

    /// Where view preferences are persisted (default: ./lectern-prefs.json).
    pub prefs_path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(500),
            fetch_timeout: Duration::from_secs(10),
            result_limit: 50,
            rpc_url: None,
            rpc_model: "library.book".to_string(),
            rpc_author_model: "library.author".to_string(),
            prefs_path: PathBuf::from("./lectern-prefs.json"),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let search_debounce = parse_var(&lookup, "CATALOG_SEARCH_DEBOUNCE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.search_debounce);

        let fetch_timeout = parse_var(&lookup, "CATALOG_FETCH_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.fetch_timeout);

        let result_limit = parse_var::<u32, _>(&lookup, "CATALOG_RESULT_LIMIT")?
            .unwrap_or(defaults.result_limit);
        if result_limit == 0 {
            bail!("CATALOG_RESULT_LIMIT must be greater than zero");
        }

        let rpc_url = lookup("CATALOG_RPC_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let rpc_model = lookup("CATALOG_RPC_MODEL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.rpc_model);

        let rpc_author_model = lookup("CATALOG_RPC_AUTHOR_MODEL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.rpc_author_model);

        let prefs_path = lookup("CATALOG_PREFS_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.prefs_path);

        Ok(Self {
            search_debounce,
            fetch_timeout,
            result_limit,
            rpc_url,
            rpc_model,
            rpc_author_model,
            prefs_path,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} must be a valid unsigned integer")),
        None => Ok(None),
    }
}
