//! Interaction protocols over an unreliable, selector-driven chat surface.
//!
//! Each protocol is a bounded polling loop that escalates to the operator
//! port instead of failing where a human can still rescue the run, and fails
//! with a typed error where one cannot.

mod attach;
mod exchange;
mod readiness;
mod respond;
mod submit;

pub use exchange::{ExchangeRequest, SummaryExchange};
pub use submit::SendGate;

use std::sync::Arc;

use crate::config::Timeouts;
use crate::selectors::Selectors;
use crate::session::{ChatSurface, OperatorPort};

pub struct ChatProtocol {
    surface: Arc<dyn ChatSurface>,
    operator: Arc<dyn OperatorPort>,
    selectors: Selectors,
    timeouts: Timeouts,
}

impl ChatProtocol {
    pub fn new(
        surface: Arc<dyn ChatSurface>,
        operator: Arc<dyn OperatorPort>,
        selectors: Selectors,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            surface,
            operator,
            selectors,
            timeouts,
        }
    }

    /// First editor probe that is present and visible.
    pub(crate) async fn find_visible_editor(&self) -> Option<String> {
        for selector in &self.selectors.editors {
            if self.surface.count(selector).await > 0 && self.surface.is_visible(selector).await {
                return Some(selector.clone());
            }
        }
        None
    }

    /// Click through known consent/overlay buttons. Non-fatal on failure.
    pub(crate) async fn dismiss_overlays(&self) {
        for phrase in &self.selectors.overlay_phrases {
            if self.surface.button_with_text(phrase).await {
                let _ = self.surface.click_button_with_text(phrase).await;
            }
        }
    }

    /// Watermark of assistant turns currently in the conversation.
    pub(crate) async fn assistant_count(&self) -> usize {
        self.surface.count(&self.selectors.assistant_turns).await
    }

    pub(crate) async fn is_uploading(&self) -> bool {
        for selector in &self.selectors.upload_busy {
            if self.surface.count(selector).await > 0 {
                return true;
            }
        }
        for phrase in &self.selectors.upload_busy_phrases {
            if self.surface.body_contains(phrase).await {
                return true;
            }
        }
        false
    }

    pub(crate) async fn generation_in_progress(&self) -> bool {
        for selector in &self.selectors.stop_generating {
            if self.surface.count(selector).await > 0 {
                return true;
            }
        }
        for phrase in &self.selectors.stop_phrases {
            if self.surface.button_with_text(phrase).await {
                return true;
            }
        }
        false
    }
}
