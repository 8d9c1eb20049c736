//! The seam to an actual driven page.
//!
//! [`PageDriver`] is what a CDP/WebDriver integration implements; the
//! transport above it only speaks in selectors, text needles, and bounded
//! waits. Markers passed to [`PageDriver::is_visible`] are either CSS
//! selectors or plain text needles — drivers match selectors structurally
//! and fall back to a visible-text search.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use kirana_engine::action::PageItem;

#[derive(Debug, Error)]
pub enum PageFault {
    /// The page settled without the element ever existing.
    #[error("no element matches {0}")]
    NotFound(String),

    #[error("timed out after {seconds}s waiting for {what}")]
    Timeout { what: String, seconds: u64 },

    /// The browser or tab died underneath us.
    #[error("page session gone: {0}")]
    Gone(String),

    #[error("driver error: {0}")]
    Other(String),
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Launch or re-attach the page session and leave it on the
    /// storefront origin.
    async fn start(&self) -> Result<(), PageFault>;

    async fn is_alive(&self) -> bool;

    /// Navigate to a path relative to the storefront origin.
    async fn goto(&self, path: &str) -> Result<(), PageFault>;

    async fn click(&self, selector: &str) -> Result<(), PageFault>;

    /// Click the element whose visible text contains the needle.
    async fn click_text(&self, needle: &str) -> Result<(), PageFault>;

    /// Click the nth match of the selector (zero-based).
    async fn click_nth(&self, selector: &str, index: usize) -> Result<(), PageFault>;

    /// Click the last match of the selector.
    async fn click_last(&self, selector: &str) -> Result<(), PageFault>;

    async fn fill(&self, selector: &str, text: &str) -> Result<(), PageFault>;

    async fn press(&self, key: &str) -> Result<(), PageFault>;

    async fn is_visible(&self, marker: &str) -> Result<bool, PageFault>;

    /// Block until the selector renders, up to `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), PageFault>;

    /// The page's visible text, newline-separated.
    async fn visible_text(&self) -> Result<String, PageFault>;

    /// Inner text (and optionally an id attribute) of every match.
    async fn collect(
        &self,
        selector: &str,
        id_attr: Option<&str>,
    ) -> Result<Vec<PageItem>, PageFault>;
}
