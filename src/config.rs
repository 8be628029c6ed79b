use crate::browser::{PoolConfig, RenderOptions};
use crate::matcher::{RemoteEmbedderConfig, DEFAULT_SIMILARITY_THRESHOLD};
use crate::refine::{LlmSettings, DEFAULT_ENDPOINT};
use anyhow::{anyhow, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

/// Everything the assessor reads from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub browser: PoolConfig,
    pub render: RenderOptions,
    /// Refinement client; `None` without an API key
    pub llm: Option<LlmSettings>,
    /// Owner-overview client; `None` without an API key
    pub overview: Option<LlmSettings>,
    pub embedding: Option<RemoteEmbedderConfig>,
    pub similarity_threshold: f32,
    pub embedding_cache_size: u64,
    pub cache_maxsize: u64,
    pub cache_ttl: Duration,
    pub log_level: String,
}

impl Settings {
    /// Load `.env` if present, then read the environment.
    ///
    /// Unset variables fall back to defaults; malformed ones are errors.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let browser = PoolConfig {
            headless: parse_or("BROWSER_HEADLESS", true)?,
            max_concurrency: parse_or("BROWSER_MAX_CONCURRENCY", 4)?,
            disable_sandbox: parse_or("BROWSER_DISABLE_SANDBOX", true)?,
            ..PoolConfig::default()
        };

        let render = RenderOptions {
            settle_delay: Duration::from_millis(parse_or("RENDER_SETTLE_MS", 1200)?),
            scroll_step_delay: Duration::from_millis(parse_or("RENDER_SCROLL_STEP_MS", 500)?),
            nav_timeout: Duration::from_secs(parse_or("RENDER_NAV_TIMEOUT_SECS", 60)?),
            payload_timeout: Duration::from_secs(parse_or("RENDER_PAYLOAD_TIMEOUT_SECS", 15)?),
            capture_debug: false,
        };

        let endpoint = var_or("LLM_ENDPOINT", DEFAULT_ENDPOINT);
        let api_key = var("LLM_API_KEY").or_else(|| var("ANTHROPIC_API_KEY"));

        let llm = match &api_key {
            Some(key) => Some(LlmSettings {
                endpoint: endpoint.clone(),
                model: var_or("LLM_MODEL", "claude-haiku-4-5"),
                timeout_secs: parse_or("LLM_TIMEOUT_SECS", 10)?,
                max_tokens: parse_or("LLM_MAX_TOKENS", 512)?,
                ..LlmSettings::new(key.clone())
            }),
            None => None,
        };

        let overview = match var("OVERVIEW_API_KEY").or(api_key) {
            Some(key) => Some(LlmSettings {
                endpoint,
                model: var_or("OVERVIEW_MODEL", "claude-sonnet-4-5"),
                timeout_secs: parse_or("OVERVIEW_TIMEOUT_SECS", 15)?,
                max_tokens: parse_or("OVERVIEW_MAX_TOKENS", 768)?,
                ..LlmSettings::new(key)
            }),
            None => None,
        };

        let embedding = var("EMBEDDING_ENDPOINT").map(|endpoint| RemoteEmbedderConfig {
            endpoint,
            api_key: var("EMBEDDING_API_KEY"),
            model: var_or("EMBEDDING_MODEL", "all-MiniLM-L6-v2"),
            timeout_secs: 10,
        });

        Ok(Self {
            browser,
            render,
            llm,
            overview,
            embedding,
            similarity_threshold: parse_or("AMENITY_SIMILARITY_THRESHOLD", DEFAULT_SIMILARITY_THRESHOLD)?,
            embedding_cache_size: parse_or("EMBEDDING_CACHE_SIZE", 256)?,
            cache_maxsize: parse_or("CACHE_MAXSIZE", 128)?,
            cache_ttl: Duration::from_secs(parse_or("CACHE_TTL_SECS", 900)?),
            log_level: var_or("LOG_LEVEL", "info"),
        })
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `LOG_LEVEL`, which wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

/// Set, non-blank value of `key`
fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| default.to_owned())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const KEYS: &[&str] = &[
        "BROWSER_MAX_CONCURRENCY",
        "BROWSER_HEADLESS",
        "LLM_API_KEY",
        "ANTHROPIC_API_KEY",
        "OVERVIEW_API_KEY",
        "OVERVIEW_MODEL",
        "EMBEDDING_ENDPOINT",
        "CACHE_TTL_SECS",
        "RENDER_SETTLE_MS",
    ];

    fn clear() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn defaults_without_credentials() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear();

        let settings = Settings::from_env().expect("defaults parse");
        assert_eq!(settings.browser.max_concurrency, 4);
        assert!(settings.browser.headless);
        assert_eq!(settings.render.settle_delay, Duration::from_millis(1200));
        assert!(settings.llm.is_none());
        assert!(settings.overview.is_none());
        assert!(settings.embedding.is_none());
        assert_eq!(settings.cache_ttl, Duration::from_secs(900));
    }

    #[test]
    fn overview_falls_back_to_llm_key() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear();
        env::set_var("LLM_API_KEY", "sk-main");
        env::set_var("BROWSER_MAX_CONCURRENCY", "2");

        let settings = Settings::from_env().expect("parse");
        assert_eq!(settings.browser.max_concurrency, 2);
        let llm = settings.llm.expect("llm enabled");
        let overview = settings.overview.expect("overview enabled");
        assert_eq!(llm.api_key, "sk-main");
        assert_eq!(overview.api_key, "sk-main");
        assert_eq!(overview.model, "claude-sonnet-4-5");
        assert_eq!(overview.max_tokens, 768);

        clear();
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear();
        env::set_var("CACHE_TTL_SECS", "fifteen minutes");

        let err = Settings::from_env().unwrap_err();
        assert!(format!("{err:#}").contains("CACHE_TTL_SECS"));

        clear();
    }

    #[test]
    fn malformed_booleans_are_errors() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear();
        env::set_var("BROWSER_HEADLESS", "yes please");

        assert!(Settings::from_env().is_err());

        clear();
    }
}
