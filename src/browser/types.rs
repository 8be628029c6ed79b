use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Knobs for a single render pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Wait after navigation and after scrolling
    pub settle_delay: Duration,
    /// Wait between auto-scroll steps
    pub scroll_step_delay: Duration,
    /// Bound on the top-level navigation; expiry is fatal
    pub nav_timeout: Duration,
    /// Bound on waiting for the listing-data network response
    pub payload_timeout: Duration,
    /// Keep response URLs and raw HTML around for debugging
    pub capture_debug: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1200),
            scroll_step_delay: Duration::from_millis(500),
            nav_timeout: Duration::from_secs(60),
            payload_timeout: Duration::from_secs(15),
            capture_debug: false,
        }
    }
}

/// Everything the driver pulled out of the browser for one listing
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawCapture {
    pub html: String,
    pub modal_html: Option<String>,
    pub amenities_modal_html: Option<String>,
    pub amenities_items: Vec<String>,
    pub preloaded_json: Option<Value>,
    /// Listing-related network URLs, only filled when debugging
    pub responses: Vec<String>,
    pub rendered_at: Option<DateTime<Utc>>,
}

impl RawCapture {
    /// Capture holding only page HTML, as fixtures and tests use it
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }
}
