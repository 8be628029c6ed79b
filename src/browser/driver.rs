use super::pool::{BrowserLease, BrowserPool};
use super::scripts;
use super::traits::ListingRenderer;
use super::types::{RawCapture, RenderOptions};
use crate::error::RenderError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use headless_chrome::{Browser, Tab};
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_4) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const RESPONSE_HANDLER: &str = "listing_payload";
const PAYLOAD_MARKERS: &[&str] = &["StaysPdpSections", "PdpPlatformSections", "PdpSections"];
const MAX_DEBUG_RESPONSES: usize = 50;
const PAYLOAD_POLL: Duration = Duration::from_millis(250);
const POST_SCROLL_SETTLE: Duration = Duration::from_millis(500);
const MODAL_OPEN_WAIT: Duration = Duration::from_millis(600);
const MODAL_CLOSE_WAIT: Duration = Duration::from_millis(300);
const DISMISS_WAIT: Duration = Duration::from_millis(200);
const MAX_AMENITY_TRIGGERS: usize = 4;
/// Clicks per trigger while a translation dialog keeps getting in the way
const MAX_CLICK_ATTEMPTS: usize = 4;

/// Photo-modal openers, best first
#[derive(Debug, Clone, Copy)]
enum Trigger {
    Text(&'static str),
    Css(&'static str),
}

const PHOTO_TRIGGERS: &[Trigger] = &[
    Trigger::Text("Show all photos"),
    Trigger::Text("Show all"),
    Trigger::Text("Photos"),
    Trigger::Css(r#"[data-testid="photo-tour-button"]"#),
    Trigger::Css(r#"[data-testid="structured-gallery-view-all-button"]"#),
];

impl Trigger {
    fn script(self) -> String {
        match self {
            Trigger::Text(text) => scripts::click_button_with_text(text),
            Trigger::Css(css) => scripts::click_css(css),
        }
    }
}

/// A clickable element the amenities modal might hide behind
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ButtonCandidate {
    pub index: usize,
    pub text: String,
}

/// Relevance of a button to the amenities modal
pub fn amenity_trigger_score(text: &str) -> u8 {
    let lowered = text.to_lowercase();
    let mut score = 0;
    if lowered.contains("amenit") {
        score += 2;
    }
    if lowered.contains("show all") {
        score += 1;
    }
    score
}

/// Relevant candidates, most relevant first, page order within a score
pub fn rank_amenity_triggers(candidates: Vec<ButtonCandidate>) -> Vec<ButtonCandidate> {
    let mut scored: Vec<(u8, ButtonCandidate)> = candidates
        .into_iter()
        .map(|c| (amenity_trigger_score(&c.text), c))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .map(|(_, c)| c)
        .take(MAX_AMENITY_TRIGGERS)
        .collect()
}

pub fn is_listing_payload_url(url: &str) -> bool {
    PAYLOAD_MARKERS.iter().any(|marker| url.contains(marker))
}

/// Click a modal trigger, dismissing the translation interstitial and clicking
/// again whenever it intercepts. `true` once a click lands with nothing in the way.
fn click_past_interstitial(
    mut click: impl FnMut() -> Result<bool>,
    mut dismiss_interstitial: impl FnMut() -> Result<bool>,
) -> Result<bool> {
    for attempt in 1..=MAX_CLICK_ATTEMPTS {
        if !click()? {
            return Ok(false);
        }
        if !dismiss_interstitial()? {
            return Ok(true);
        }
        debug!(attempt, "translation dialog intercepted the click");
    }
    Ok(false)
}

/// Sessions and captures as the retry policy sees them
#[async_trait]
pub trait RenderSessions: Send + Sync {
    type Lease: Send + Sync;

    async fn acquire(&self) -> Result<Self::Lease, RenderError>;

    /// Replace the lease's session with a fresh one
    async fn relaunch(&self, lease: Self::Lease) -> Result<Self::Lease, RenderError>;

    async fn discard(&self, lease: &Self::Lease);

    async fn capture(&self, lease: &Self::Lease, url: &str, options: &RenderOptions) -> Result<RawCapture, RenderError>;
}

/// One retry against a fresh session on a transient failure. Timeouts and
/// launch failures surface immediately; a second transient failure discards
/// the session before surfacing.
pub async fn render_with_retry<S: RenderSessions>(
    sessions: &S,
    url: &str,
    options: &RenderOptions,
) -> Result<RawCapture, RenderError> {
    let lease = sessions.acquire().await?;
    match sessions.capture(&lease, url, options).await {
        Err(err) if err.is_retryable() => {
            warn!(url, error = %err, "browser session failed, retrying with a fresh one");
            let lease = sessions.relaunch(lease).await?;
            let result = sessions.capture(&lease, url, options).await;
            if let Err(RenderError::Transient(_)) = &result {
                sessions.discard(&lease).await;
            }
            result
        }
        other => other,
    }
}

#[async_trait]
impl RenderSessions for BrowserPool {
    type Lease = BrowserLease;

    async fn acquire(&self) -> Result<BrowserLease, RenderError> {
        BrowserPool::acquire(self).await
    }

    async fn relaunch(&self, lease: BrowserLease) -> Result<BrowserLease, RenderError> {
        BrowserPool::relaunch(self, lease).await
    }

    async fn discard(&self, lease: &BrowserLease) {
        BrowserPool::discard(self, lease.generation).await
    }

    async fn capture(&self, lease: &BrowserLease, url: &str, options: &RenderOptions) -> Result<RawCapture, RenderError> {
        let browser = lease.browser.clone();
        let url = url.to_string();
        let options = options.clone();
        tokio::task::spawn_blocking(move || capture(&browser, &url, &options))
            .await
            .map_err(|e| RenderError::Transient(format!("render task failed: {e}")))?
    }
}

#[derive(Default)]
struct NetworkLog {
    payload: Option<Value>,
    responses: Vec<String>,
}

/// Renders listings in the shared Chrome process
pub struct ChromeRenderer {
    pool: Arc<BrowserPool>,
}

impl ChromeRenderer {
    pub fn new(pool: Arc<BrowserPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingRenderer for ChromeRenderer {
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RawCapture, RenderError> {
        render_with_retry(self.pool.as_ref(), url, options).await
    }

    fn renderer_name(&self) -> &'static str {
        "chrome"
    }
}

/// The whole blocking render sequence for one listing
pub fn capture(browser: &Browser, url: &str, options: &RenderOptions) -> Result<RawCapture, RenderError> {
    let tab = browser
        .new_tab()
        .map_err(|e| RenderError::from_browser(&e.context("Failed to open tab")))?;

    let result = drive(&tab, url, options);

    if let Err(e) = tab.deregister_response_handling(RESPONSE_HANDLER) {
        debug!(error = %e, "response handler removal failed");
    }
    if let Err(e) = tab.close(false) {
        debug!(error = %e, "tab close failed");
    }
    result
}

fn drive(tab: &Arc<Tab>, url: &str, options: &RenderOptions) -> Result<RawCapture, RenderError> {
    tab.set_default_timeout(options.nav_timeout);
    if let Err(e) = tab.set_user_agent(DEFAULT_USER_AGENT, Some("en-US,en"), None) {
        debug!(error = %e, "could not set user agent");
    }

    let network = Arc::new(Mutex::new(NetworkLog::default()));
    if let Err(e) = register_payload_listener(tab, Arc::clone(&network), options.capture_debug) {
        debug!(error = %e, "response interception unavailable");
    }

    info!(url, "navigating to listing");
    let started = Instant::now();
    navigate(tab, url).map_err(|e| RenderError::from_browser(&e))?;

    thread::sleep(options.settle_delay);
    if let Err(e) = tab.evaluate(&scripts::auto_scroll(options.scroll_step_delay.as_millis() as u64), true) {
        debug!(error = %e, "auto-scroll failed");
    }
    thread::sleep(POST_SCROLL_SETTLE);

    let html = eval_string(tab, scripts::PAGE_HTML, false)
        .map_err(|e| RenderError::from_browser(&e))?
        .unwrap_or_default();

    let preloaded_json = wait_for_payload(&network, started + options.payload_timeout).or_else(|| preloaded_state(tab));

    let modal_html = capture_photo_modal(tab);
    let (amenities_modal_html, amenities_items) = capture_amenities_modal(tab);

    let responses = network
        .lock()
        .map(|log| log.responses.clone())
        .unwrap_or_default();

    info!(
        url,
        html_bytes = html.len(),
        payload = preloaded_json.is_some(),
        photo_modal = modal_html.is_some(),
        amenities_modal = amenities_modal_html.is_some(),
        amenity_items = amenities_items.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "listing captured"
    );

    Ok(RawCapture {
        html,
        modal_html,
        amenities_modal_html,
        amenities_items,
        preloaded_json,
        responses,
        rendered_at: Some(Utc::now()),
    })
}

fn navigate(tab: &Arc<Tab>, url: &str) -> Result<()> {
    tab.navigate_to(url).context("Navigation failed")?;
    tab.wait_until_navigated().context("Page load timed out")?;
    Ok(())
}

fn register_payload_listener(tab: &Arc<Tab>, network: Arc<Mutex<NetworkLog>>, capture_debug: bool) -> Result<()> {
    tab.register_response_handling(
        RESPONSE_HANDLER,
        Box::new(move |params, fetch_body| {
            let url = &params.response.url;
            let status = params.response.status;

            let wants_payload = {
                let Ok(mut log) = network.lock() else { return };
                if capture_debug
                    && (url.contains("api") || url.contains("graphql"))
                    && log.responses.len() < MAX_DEBUG_RESPONSES
                {
                    log.responses.push(format!("{status} {url}"));
                }
                log.payload.is_none() && status == 200 && is_listing_payload_url(url)
            };
            if !wants_payload {
                return;
            }

            match fetch_body() {
                Ok(body) => match serde_json::from_str::<Value>(&body.body) {
                    Ok(payload) => {
                        debug!(url = url.as_str(), "captured listing payload");
                        if let Ok(mut log) = network.lock() {
                            log.payload.get_or_insert(payload);
                        }
                    }
                    Err(e) => debug!(error = %e, "listing payload was not JSON"),
                },
                Err(e) => debug!(error = %e, "could not read listing payload body"),
            }
        }),
    )?;
    Ok(())
}

fn wait_for_payload(network: &Arc<Mutex<NetworkLog>>, deadline: Instant) -> Option<Value> {
    loop {
        if let Some(payload) = network.lock().ok().and_then(|mut log| log.payload.take()) {
            return Some(payload);
        }
        if Instant::now() >= deadline {
            debug!("no listing payload seen on the network");
            return None;
        }
        thread::sleep(PAYLOAD_POLL);
    }
}

fn preloaded_state(tab: &Arc<Tab>) -> Option<Value> {
    match eval_string(tab, scripts::PRELOADED_STATE, false) {
        Ok(Some(raw)) => serde_json::from_str(&raw).ok(),
        Ok(None) => None,
        Err(e) => {
            debug!(error = %e, "preloaded state lookup failed");
            None
        }
    }
}

fn capture_photo_modal(tab: &Arc<Tab>) -> Option<String> {
    for trigger in PHOTO_TRIGGERS {
        match open_photo_modal(tab, *trigger) {
            Ok(Some(html)) => {
                debug!(?trigger, bytes = html.len(), "photo modal captured");
                return Some(html);
            }
            Ok(None) => continue,
            Err(e) => {
                debug!(?trigger, error = %e, "photo modal attempt failed");
                continue;
            }
        }
    }
    debug!("photo modal not captured");
    None
}

fn open_photo_modal(tab: &Arc<Tab>, trigger: Trigger) -> Result<Option<String>> {
    if !click_modal_trigger(tab, &trigger.script())? {
        return Ok(None);
    }
    if !eval_bool(tab, scripts::DIALOG_OPEN)? {
        return Ok(None);
    }

    let captured = (|| -> Result<Option<String>> {
        tab.evaluate(scripts::SCROLL_PHOTO_DIALOG, true)?;
        thread::sleep(Duration::from_millis(800));
        eval_string(tab, scripts::DIALOG_HTML, false)
    })();
    close_modal(tab);
    captured
}

fn capture_amenities_modal(tab: &Arc<Tab>) -> (Option<String>, Vec<String>) {
    let candidates = match eval_json::<Vec<ButtonCandidate>>(tab, scripts::BUTTON_CANDIDATES) {
        Ok(candidates) => candidates.unwrap_or_default(),
        Err(e) => {
            debug!(error = %e, "could not list buttons");
            return (None, Vec::new());
        }
    };

    for candidate in rank_amenity_triggers(candidates) {
        match open_amenities_modal(tab, &candidate) {
            Ok(Some((html, items))) if !items.is_empty() => {
                debug!(button = candidate.text.as_str(), items = items.len(), "amenities modal captured");
                return (html, items);
            }
            Ok(_) => continue,
            Err(e) => {
                debug!(button = candidate.text.as_str(), error = %e, "amenities modal attempt failed");
                continue;
            }
        }
    }
    debug!("amenities modal not captured");
    (None, Vec::new())
}

fn open_amenities_modal(tab: &Arc<Tab>, candidate: &ButtonCandidate) -> Result<Option<(Option<String>, Vec<String>)>> {
    let script = scripts::click_button_at(candidate.index, &candidate.text);
    if !click_modal_trigger(tab, &script)? {
        return Ok(None);
    }
    if !eval_bool(tab, scripts::DIALOG_OPEN)? {
        return Ok(None);
    }

    let captured = (|| -> Result<Option<(Option<String>, Vec<String>)>> {
        tab.evaluate(scripts::SCROLL_AMENITY_DIALOG, false)?;
        thread::sleep(MODAL_OPEN_WAIT);
        let html = eval_string(tab, scripts::DIALOG_HTML, false)?;
        let items: Vec<String> = eval_json::<Vec<String>>(tab, scripts::AMENITY_ITEMS)?
            .unwrap_or_default()
            .into_iter()
            .filter(|item| !item.trim().is_empty())
            .collect();
        Ok(Some((html, items)))
    })();
    close_modal(tab);
    captured
}

fn click_modal_trigger(tab: &Arc<Tab>, script: &str) -> Result<bool> {
    click_past_interstitial(
        || {
            let clicked = eval_bool(tab, script)?;
            if clicked {
                thread::sleep(MODAL_OPEN_WAIT);
            }
            Ok(clicked)
        },
        || {
            let dismissed = eval_bool(tab, scripts::DISMISS_TRANSLATION)?;
            if dismissed {
                thread::sleep(DISMISS_WAIT);
            }
            Ok(dismissed)
        },
    )
}

fn close_modal(tab: &Arc<Tab>) {
    match eval_bool(tab, scripts::CLOSE_MODAL) {
        Ok(true) => thread::sleep(MODAL_CLOSE_WAIT),
        _ => {
            if let Err(e) = tab.press_key("Escape") {
                debug!(error = %e, "could not dismiss modal");
            }
            thread::sleep(DISMISS_WAIT);
        }
    }
}

fn eval_bool(tab: &Arc<Tab>, script: &str) -> Result<bool> {
    let result = tab.evaluate(script, false)?;
    Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
}

fn eval_string(tab: &Arc<Tab>, script: &str, await_promise: bool) -> Result<Option<String>> {
    let result = tab.evaluate(script, await_promise)?;
    Ok(result.value.and_then(|v| v.as_str().map(str::to_string)))
}

fn eval_json<T: serde::de::DeserializeOwned>(tab: &Arc<Tab>, script: &str) -> Result<Option<T>> {
    match eval_string(tab, script, false)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw).context("script returned malformed JSON")?)),
        None => Ok(None),
    }
}
