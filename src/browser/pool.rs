use crate::error::RenderError;
use anyhow::{Context, Result};
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

const SANDBOX_FREE_ARGS: &[&str] = &[
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-zygote",
];

/// How Chrome gets launched
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub headless: bool,
    pub max_concurrency: usize,
    pub disable_sandbox: bool,
    /// Chrome exits after this long without CDP traffic
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            headless: true,
            max_concurrency: 4,
            disable_sandbox: true,
            idle_timeout: Duration::from_secs(600),
        }
    }
}

struct Session {
    generation: u64,
    browser: Browser,
}

/// A browser handle plus the concurrency slot it occupies.
///
/// Dropping the lease frees the slot.
pub struct BrowserLease {
    pub browser: Browser,
    pub generation: u64,
    _permit: OwnedSemaphorePermit,
}

/// Shared Chrome process behind a counting semaphore.
///
/// The process is launched lazily, checked for liveness on every acquisition,
/// and relaunched after it has been discarded.
pub struct BrowserPool {
    config: PoolConfig,
    semaphore: Arc<Semaphore>,
    session: Mutex<Option<Session>>,
    launches: AtomicU64,
}

impl BrowserPool {
    pub fn new(config: PoolConfig) -> Self {
        let permits = config.max_concurrency.max(1);
        Self {
            config,
            semaphore: Arc::new(Semaphore::new(permits)),
            session: Mutex::new(None),
            launches: AtomicU64::new(0),
        }
    }

    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a free slot, then hand out a live browser
    pub async fn acquire(&self) -> Result<BrowserLease, RenderError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        let (browser, generation) = self.ensure_browser().await?;
        Ok(BrowserLease {
            browser,
            generation,
            _permit: permit,
        })
    }

    /// Swap the browser inside `lease` for a freshly launched one, keeping its slot
    pub async fn relaunch(&self, lease: BrowserLease) -> Result<BrowserLease, RenderError> {
        self.discard(lease.generation).await;
        let (browser, generation) = self.ensure_browser().await?;
        Ok(BrowserLease {
            browser,
            generation,
            _permit: lease._permit,
        })
    }

    /// Drop the session of `generation` if it is still the current one
    pub async fn discard(&self, generation: u64) {
        let mut session = self.session.lock().await;
        if session.as_ref().is_some_and(|s| s.generation == generation) {
            warn!(generation, "discarding browser session");
            *session = None;
        }
    }

    pub async fn close(&self) {
        let mut session = self.session.lock().await;
        if session.take().is_some() {
            info!("browser pool closed");
        }
    }

    fn next_generation(&self) -> u64 {
        self.launches.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn ensure_browser(&self) -> Result<(Browser, u64), RenderError> {
        let mut session = self.session.lock().await;

        if let Some(current) = session.as_ref() {
            let probe = current.browser.clone();
            let alive = tokio::task::spawn_blocking(move || probe.get_version().is_ok())
                .await
                .unwrap_or(false);
            if alive {
                return Ok((current.browser.clone(), current.generation));
            }
            warn!(generation = current.generation, "browser session disconnected");
            *session = None;
        }

        let config = self.config.clone();
        let browser = tokio::task::spawn_blocking(move || launch(&config))
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?
            .map_err(|e| RenderError::Launch(format!("{e:#}")))?;

        let generation = self.next_generation();
        info!(generation, headless = self.config.headless, "launched Chrome");
        *session = Some(Session {
            generation,
            browser: browser.clone(),
        });
        Ok((browser, generation))
    }
}

fn launch(config: &PoolConfig) -> Result<Browser> {
    let args: Vec<&OsStr> = if config.disable_sandbox {
        SANDBOX_FREE_ARGS.iter().map(OsStr::new).collect()
    } else {
        Vec::new()
    };
    debug!(?args, "building launch options");

    let options = LaunchOptions::default_builder()
        .headless(config.headless)
        .sandbox(!config.disable_sandbox)
        .window_size(Some((1280, 900)))
        .idle_browser_timeout(config.idle_timeout)
        .args(args)
        .build()
        .context("Failed to build launch options")?;

    Browser::new(options).context("Failed to launch Chrome browser")
}
