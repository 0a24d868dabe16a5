//! Browser session seam.
//!
//! The protocols talk to the conversation surface exclusively through
//! [`ChatSurface`] and suspend on a human through [`OperatorPort`], so both
//! can be replaced by scripted doubles in tests.

mod chromium;
mod operator;

pub use chromium::ChromiumSurface;
pub use operator::ConsoleOperator;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Best-effort probe primitives over the live conversation surface.
///
/// Probe failures are reported as empty results (`false`, `None`, `0`), never
/// as errors; the protocols aggregate outcomes at their stage-decision points.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Navigate to the conversation page. Unlike the probes, navigation
    /// failures are fatal for the run.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Number of elements matching the CSS selector list.
    async fn count(&self, selector: &str) -> usize;

    /// Whether the first match is rendered with a non-empty box.
    async fn is_visible(&self, selector: &str) -> bool;

    /// Scroll the first match into view and click it.
    async fn click_first(&self, selector: &str) -> bool;

    /// Attribute value of the first match; `None` when absent either way.
    async fn attr_first(&self, selector: &str, name: &str) -> Option<String>;

    /// Inner text of the match at `index` (DOM order).
    async fn text_at(&self, selector: &str, index: usize) -> Option<String>;

    /// Whether the page body text contains `phrase`.
    async fn body_contains(&self, phrase: &str) -> bool;

    /// Whether a visible button whose text contains `phrase` exists.
    async fn button_with_text(&self, phrase: &str) -> bool;

    /// Click the first visible button whose text contains `phrase`.
    async fn click_button_with_text(&self, phrase: &str) -> bool;

    async fn focus_first(&self, selector: &str) -> bool;

    /// Clear the editor's current content.
    async fn clear_editor(&self, selector: &str) -> bool;

    /// Append one chunk of text to the editor.
    async fn insert_text(&self, selector: &str, chunk: &str) -> bool;

    /// Set `file` directly on the first matching file input.
    async fn set_files(&self, selector: &str, file: &Path) -> bool;

    /// Click `trigger` and satisfy the native file chooser it opens.
    async fn attach_via_chooser(&self, trigger: &str, file: &Path) -> bool;

    /// Best-effort teardown; must be callable on every exit path.
    async fn close(&self);
}

/// Human-operator handoff port.
///
/// `confirm` blocks until the operator acknowledges the printed instruction.
/// The wait is intentionally unbounded: the protocols re-check the surface
/// after each confirmation and ask again rather than proceed on an unusable
/// page.
#[async_trait]
pub trait OperatorPort: Send + Sync {
    async fn confirm(&self, instructions: &str);
}
