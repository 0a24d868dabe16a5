//! Submission protocol: fill, gate, click, confirm dispatch.

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use super::ChatProtocol;
use crate::error::{Error, Result};

/// Outcome of the submit-affordance gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendGate {
    /// A submit control is enabled; click it.
    Ready,
    /// The gate timed out and the operator submitted manually; skip the
    /// click and go straight to dispatch confirmation.
    SentManually,
}

const EDITOR_CHUNK_CHARS: usize = 1200;

impl ChatProtocol {
    /// Fill the editor with `prompt`, submit when safe, and confirm the
    /// message entered the conversation. Returns the assistant-turn
    /// watermark captured before submission.
    ///
    /// The watermark is taken before the send gate: when the gate escalates
    /// and the operator sends manually, a fast reply can land before control
    /// returns here, and a post-gate count would skip past it.
    pub async fn submit(&self, prompt: &str) -> Result<usize> {
        self.fill_editor(prompt).await?;
        let watermark = self.assistant_count().await;
        let gate = self.wait_until_send_enabled().await;
        if gate == SendGate::Ready {
            self.click_send().await?;
        }
        self.confirm_dispatch(watermark).await;
        Ok(watermark)
    }

    async fn fill_editor(&self, text: &str) -> Result<()> {
        let editor = match self.find_visible_editor().await {
            Some(editor) => editor,
            None => {
                self.pause_until_ready("chat editor is not visible").await;
                self.find_visible_editor().await.ok_or(Error::NoEditor)?
            }
        };

        self.surface.focus_first(&editor).await;
        self.surface.clear_editor(&editor).await;

        // Chunked insertion keeps the page's input handlers responsive on
        // large article texts.
        for chunk in char_chunks(text, EDITOR_CHUNK_CHARS) {
            self.surface.focus_first(&editor).await;
            if !self.surface.insert_text(&editor, &chunk).await {
                debug!("insert chunk probe failed, retrying once");
                self.surface.insert_text(&editor, &chunk).await;
            }
            sleep(self.timeouts.chunk_pause).await;
        }
        Ok(())
    }

    /// Block until no upload is running and a submit control is enabled, or
    /// hand off to the operator after the configured maximum wait.
    pub(crate) async fn wait_until_send_enabled(&self) -> SendGate {
        let start = Instant::now();
        loop {
            self.dismiss_overlays().await;
            if !self.is_uploading().await && self.send_control_enabled().await {
                return SendGate::Ready;
            }
            if start.elapsed() > self.timeouts.send_enabled_max {
                warn!("submit control did not enable in time");
                self.operator
                    .confirm(
                        "The send control did not become enabled. Check that the upload finished, \
                         then submit the message manually and confirm.",
                    )
                    .await;
                return SendGate::SentManually;
            }
            sleep(self.timeouts.send_poll).await;
        }
    }

    async fn send_control_enabled(&self) -> bool {
        for selector in &self.selectors.send_buttons {
            if self.surface.count(selector).await == 0 || !self.surface.is_visible(selector).await {
                continue;
            }
            if self.control_enabled(selector).await {
                return true;
            }
        }
        false
    }

    /// Disabled either via attribute or ARIA state counts as disabled.
    async fn control_enabled(&self, selector: &str) -> bool {
        if self.surface.attr_first(selector, "disabled").await.is_some() {
            return false;
        }
        let aria = self
            .surface
            .attr_first(selector, "aria-disabled")
            .await
            .unwrap_or_default();
        !matches!(aria.to_ascii_lowercase().as_str(), "true" | "1")
    }

    /// Click the first visible, enabled submit affordance, in priority order.
    async fn click_send(&self) -> Result<()> {
        for selector in &self.selectors.send_buttons {
            if self.surface.count(selector).await == 0 || !self.surface.is_visible(selector).await {
                continue;
            }
            if !self.control_enabled(selector).await {
                continue;
            }
            if self.surface.click_first(selector).await {
                return Ok(());
            }
        }
        for phrase in &self.selectors.send_phrases {
            if self.surface.click_button_with_text(phrase).await {
                return Ok(());
            }
        }
        Err(Error::NoSubmitControl)
    }

    /// Poll for evidence the submission registered: a generation-in-progress
    /// indicator or an assistant-turn count above the watermark. Uncertainty
    /// is a soft warning plus manual confirmation, never a failure.
    async fn confirm_dispatch(&self, watermark: usize) {
        let start = Instant::now();
        while start.elapsed() < self.timeouts.dispatch_confirm {
            if self.generation_in_progress().await {
                return;
            }
            if self.assistant_count().await > watermark {
                return;
            }
            sleep(self.timeouts.dispatch_poll).await;
        }
        warn!("no evidence the message was dispatched");
        self.operator
            .confirm(
                "The message does not appear to have been sent. Submit it in the chat, then \
                 confirm once generation starts.",
            )
            .await;
    }
}

/// Split on char boundaries into chunks of at most `size` chars.
fn char_chunks(text: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut len = 0;
    for ch in text.chars() {
        current.push(ch);
        len += 1;
        if len >= size {
            chunks.push(std::mem::take(&mut current));
            len = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::char_chunks;

    #[test]
    fn chunks_respect_char_boundaries() {
        let text = "ábç".repeat(1000);
        let chunks = char_chunks(&text, 1200);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1200));
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(char_chunks("hello", 1200), vec!["hello".to_string()]);
        assert!(char_chunks("", 1200).is_empty());
    }
}
