//! Response protocol: stability-window completion detection and turn
//! retrieval by index.

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use super::ChatProtocol;

impl ChatProtocol {
    /// Text of the assistant turn produced after `prior_turns` replies
    /// existed. Retrieval is by index, not "last": a stale last-turn
    /// reference can be read while the DOM lags behind the conversation.
    pub async fn await_reply(&self, prior_turns: usize) -> String {
        self.wait_for_reply_complete(prior_turns).await;
        self.text_by_index(prior_turns).await
    }

    /// A reply is complete when no generation indicator is present, the
    /// candidate text is non-empty, and it has been identical across the
    /// stability window. On overall timeout returns anyway; downstream
    /// parsing rejects insufficient text.
    async fn wait_for_reply_complete(&self, index: usize) {
        let start = Instant::now();
        let mut last_stable = String::new();
        let mut stable_rounds = 0;
        loop {
            if self.human_check_present().await {
                self.ensure_ready().await;
            }

            let generating = self.generation_in_progress().await;
            let text = self
                .surface
                .text_at(&self.selectors.assistant_turns, index)
                .await
                .unwrap_or_default();

            if !generating && !text.trim().is_empty() {
                if text.trim() == last_stable.trim() {
                    stable_rounds += 1;
                    if stable_rounds >= self.timeouts.stability_rounds {
                        debug!(index, "reply stable");
                        return;
                    }
                } else {
                    stable_rounds = 0;
                    last_stable = text;
                }
            }

            if start.elapsed() > self.timeouts.reply_complete {
                warn!(index, "reply completion wait timed out");
                return;
            }
            sleep(self.timeouts.reply_poll).await;
        }
    }

    /// Retry until the turn at `index` exists and yields non-empty text.
    async fn text_by_index(&self, index: usize) -> String {
        let deadline = Instant::now() + self.timeouts.turn_fetch;
        while Instant::now() < deadline {
            if self.assistant_count().await > index {
                if let Some(text) = self
                    .surface
                    .text_at(&self.selectors.assistant_turns, index)
                    .await
                {
                    if !text.trim().is_empty() {
                        return text;
                    }
                }
            }
            sleep(self.timeouts.turn_poll).await;
        }
        self.surface
            .text_at(&self.selectors.assistant_turns, index)
            .await
            .unwrap_or_default()
    }
}
