//! Attachment protocol: cascade of attachment strategies, then a two-phase
//! upload confirmation.

use std::path::Path;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::ChatProtocol;
use crate::error::{Error, Result};

impl ChatProtocol {
    /// Attach `file` and return once the upload is visibly complete.
    ///
    /// Stages, each tried only if the previous one failed to register the
    /// file: direct file-input set, attach-affordance click then retry,
    /// native chooser interception, manual handoff.
    pub async fn attach(&self, file: &Path) -> Result<()> {
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        self.dismiss_overlays().await;

        if self.try_set_on_any_input(file).await {
            debug!(file = %filename, "attached via direct input");
            return self.wait_for_upload_complete(&filename).await;
        }

        for selector in self.selectors.attach_buttons.clone() {
            if self.surface.count(&selector).await == 0 || !self.surface.is_visible(&selector).await
            {
                continue;
            }
            if self.surface.click_first(&selector).await {
                sleep(self.timeouts.dispatch_poll).await;
                if self.try_set_on_any_input(file).await {
                    debug!(file = %filename, "attached after affordance click");
                    return self.wait_for_upload_complete(&filename).await;
                }
            }
        }
        for phrase in self.selectors.attach_phrases.clone() {
            if self.surface.click_button_with_text(&phrase).await {
                sleep(self.timeouts.dispatch_poll).await;
                if self.try_set_on_any_input(file).await {
                    debug!(file = %filename, "attached after phrase-button click");
                    return self.wait_for_upload_complete(&filename).await;
                }
            }
        }

        for selector in self.selectors.attach_buttons.clone() {
            if self.surface.count(&selector).await == 0 {
                continue;
            }
            if self.surface.attach_via_chooser(&selector, file).await {
                debug!(file = %filename, "attached via chooser interception");
                return self.wait_for_upload_complete(&filename).await;
            }
        }

        warn!(file = %filename, "all automated attachment stages failed");
        self.operator
            .confirm(&format!(
                "Attach the file manually: {filename}. Confirm once the preview chip appears and \
                 uploading has finished."
            ))
            .await;
        self.dismiss_overlays().await;
        self.wait_for_upload_complete(&filename).await
    }

    async fn try_set_on_any_input(&self, file: &Path) -> bool {
        for selector in &self.selectors.file_inputs {
            if self.surface.count(selector).await == 0 {
                continue;
            }
            if self.surface.set_files(selector, file).await {
                return true;
            }
        }
        false
    }

    /// Two-phase upload confirmation. Phase A waits for a preview referencing
    /// the file, escalating to the operator on soft timeout. Phase B waits
    /// for the uploading indicator to clear or a done hint, escalating on
    /// each soft timeout. One hard timeout spans the whole wait.
    pub(crate) async fn wait_for_upload_complete(&self, filename: &str) -> Result<()> {
        let hard_deadline = Instant::now() + self.timeouts.upload_hard;

        let soft_deadline = Instant::now() + self.timeouts.upload_soft;
        let mut preview_seen = false;
        while Instant::now() < soft_deadline {
            self.dismiss_overlays().await;
            if self.has_preview(filename).await {
                preview_seen = true;
                break;
            }
            sleep(self.timeouts.upload_poll).await;
        }
        if !preview_seen {
            loop {
                self.operator
                    .confirm(&format!(
                        "No preview detected for {filename}. Attach it manually and confirm once \
                         the chip/preview appears."
                    ))
                    .await;
                self.dismiss_overlays().await;
                if self.has_preview(filename).await {
                    break;
                }
            }
        }

        let mut phase_start = Instant::now();
        loop {
            self.dismiss_overlays().await;
            if !self.is_uploading().await || self.upload_done_hint().await {
                info!(file = %filename, "upload complete");
                return Ok(());
            }
            if phase_start.elapsed() > self.timeouts.upload_soft {
                self.operator
                    .confirm(&format!(
                        "{filename} still appears to be uploading. Confirm once the upload has \
                         finished."
                    ))
                    .await;
                self.dismiss_overlays().await;
                if !self.is_uploading().await || self.upload_done_hint().await {
                    return Ok(());
                }
                phase_start = Instant::now();
            }
            if Instant::now() > hard_deadline {
                return Err(Error::UploadTimeout(self.timeouts.upload_hard));
            }
            sleep(self.timeouts.upload_poll).await;
        }
    }

    async fn has_preview(&self, filename: &str) -> bool {
        if !filename.is_empty() && self.surface.body_contains(filename).await {
            return true;
        }
        for selector in &self.selectors.file_previews {
            if self.surface.count(selector).await > 0 {
                return true;
            }
        }
        false
    }

    async fn upload_done_hint(&self) -> bool {
        for phrase in &self.selectors.upload_done_phrases {
            if self.surface.body_contains(phrase).await {
                return true;
            }
        }
        false
    }
}
