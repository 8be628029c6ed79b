use thiserror::Error;

/// Failures surfaced by the rendering driver.
///
/// Only these reach the caller as request-level errors; every later stage
/// degrades instead of failing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Browser session failed: {0}")]
    Transient(String),

    #[error("Navigation timed out: {0}")]
    Timeout(String),

    #[error("Failed to launch browser: {0}")]
    Launch(String),
}

impl RenderError {
    /// Whether a fresh browser session might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, RenderError::Transient(_))
    }

    /// Classify an error raised while driving the browser
    pub fn from_browser(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        let lowered = message.to_lowercase();
        if is_browser_closed(&lowered) {
            RenderError::Transient(message)
        } else if lowered.contains("timed out") || lowered.contains("timeout") || lowered.contains("never came") {
            RenderError::Timeout(message)
        } else {
            RenderError::Transient(message)
        }
    }
}

/// Browser error messages that mean the Chrome process or its tab went away
pub fn is_browser_closed(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("connection is closed")
        || lowered.contains("target closed")
        || lowered.contains("has been closed")
        || lowered.contains("no such target")
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UrlError {
    #[error("Invalid URL: {0}")]
    Invalid(String),

    #[error("URL must include a host")]
    MissingHost,

    #[error("Only Airbnb domains are supported: {0}")]
    UnsupportedHost(String),

    #[error("URL must reference an Airbnb room listing: {0}")]
    NotARoom(String),
}

/// Request-level failures of an assessment. Everything after rendering degrades
/// instead of failing, so only bad input and render failures show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssessError {
    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Assessment task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_not_retryable() {
        let err = RenderError::from_browser(&anyhow::anyhow!("The event waited for never came: Timed out"));
        assert!(matches!(err, RenderError::Timeout(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn other_browser_errors_are_transient() {
        let err = RenderError::from_browser(&anyhow::anyhow!(
            "Unable to make method calls because underlying connection is closed"
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn recognises_closed_browser_messages() {
        assert!(is_browser_closed("Target closed"));
        assert!(is_browser_closed("Browser has been closed"));
        assert!(!is_browser_closed("selector not found"));
    }
}
