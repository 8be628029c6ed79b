use super::types::{RawCapture, RenderOptions};
use crate::error::RenderError;
use async_trait::async_trait;

/// Anything that can turn a listing URL into captured page content.
///
/// Chrome is the production implementation; tests plug in fixtures.
#[async_trait]
pub trait ListingRenderer: Send + Sync {
    /// Render `url` and capture its HTML, modals and preloaded state
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RawCapture, RenderError>;

    /// Short name used in logs
    fn renderer_name(&self) -> &'static str;
}
