//! Readiness gate: never act on a surface without a usable editor.

use tracing::{info, warn};

use super::ChatProtocol;

impl ChatProtocol {
    /// Navigate to the conversation page and gate on readiness. Navigation
    /// failures are fatal; everything after is operator-recoverable.
    pub async fn goto_and_ready(&self, url: &str) -> crate::error::Result<()> {
        self.surface.goto(url).await?;
        self.ensure_ready().await;
        Ok(())
    }

    /// On return the editor is visible and interactive, or the operator has
    /// confirmed it is after an explicit handoff. Never errors.
    pub async fn ensure_ready(&self) {
        self.dismiss_overlays().await;
        if self.human_check_present().await || self.find_visible_editor().await.is_none() {
            self.pause_until_ready("login or human-verification pending")
                .await;
        }
    }

    pub(crate) async fn human_check_present(&self) -> bool {
        for selector in &self.selectors.challenge_frames {
            if self.surface.count(selector).await > 0 {
                return true;
            }
        }
        for phrase in &self.selectors.challenge_phrases {
            if self.surface.body_contains(phrase).await {
                return true;
            }
        }
        false
    }

    /// Blocking manual-resume loop. Intentionally unbounded: availability is
    /// traded for never proceeding on an unusable surface.
    pub(crate) async fn pause_until_ready(&self, reason: &str) {
        info!(reason, "suspending for operator");
        loop {
            self.operator
                .confirm(&format!(
                    "{reason}. Resolve it in the browser; the editor must be visible to resume."
                ))
                .await;
            self.dismiss_overlays().await;
            if self.find_visible_editor().await.is_some() {
                info!("editor detected, resuming");
                return;
            }
            if self.human_check_present().await {
                warn!("human-verification challenge still present");
            } else {
                warn!("editor still not visible");
            }
        }
    }
}
