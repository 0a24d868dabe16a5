//! Real [`ChatSurface`] backend over a Chrome DevTools session.
//!
//! CDP has no text-matching query selectors and no synchronous visibility
//! probe, so most probes are small injected scripts evaluated in the page.
//! Every probe swallows its own failures and reports an empty result; the
//! protocols decide what a run of empty results means.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventFileChooserOpened, SetInterceptFileChooserDialogParams,
};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::debug;

use super::ChatSurface;
use crate::error::{Error, Result};

const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--no-default-browser-check",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--user-agent=Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "--lang=pt-BR",
];

const CHOOSER_WAIT: Duration = Duration::from_millis(2500);

pub struct ChromiumSurface {
    browser: Mutex<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
    /// Pacing delay applied after every interaction probe.
    slow_mo: Duration,
}

impl ChromiumSurface {
    /// Launch a browser with a persistent profile and open the chat page.
    pub async fn launch(profile_dir: &Path, headless: bool, slow_mo: Duration) -> Result<Self> {
        let config = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .args(LAUNCH_ARGS.iter().copied())
            .headless_mode(if headless {
                HeadlessMode::New
            } else {
                HeadlessMode::False
            })
            .build()
            .map_err(Error::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::BrowserLaunch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler stopped");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::BrowserLaunch(e.to_string()))?;

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler_task,
            slow_mo,
        })
    }

    /// Pause after an interaction so the page's handlers keep up.
    async fn pace(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }

    async fn eval_bool(&self, js: String) -> bool {
        match self.page.evaluate(js).await {
            Ok(result) => result.value().and_then(|v| v.as_bool()).unwrap_or(false),
            Err(e) => {
                debug!(error = %e, "probe evaluation failed");
                false
            }
        }
    }
}

/// Embed a Rust string as a JS string literal.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl ChatSurface for ChromiumSurface {
    async fn goto(&self, url: &str) -> Result<()> {
        let _ = self.page.activate().await;
        self.page
            .goto(url)
            .await
            .map_err(|e| Error::Session(format!("navigation to {url} failed: {e}")))?;
        let _ = self.page.wait_for_navigation().await;
        Ok(())
    }

    async fn count(&self, selector: &str) -> usize {
        let js = format!(
            "(() => document.querySelectorAll({sel}).length)()",
            sel = js_str(selector)
        );
        match self.page.evaluate(js).await {
            Ok(result) => result
                .value()
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as usize,
            Err(_) => 0,
        }
    }

    async fn is_visible(&self, selector: &str) -> bool {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                return rect.width > 0 && rect.height > 0
                    && style.display !== 'none' && style.visibility !== 'hidden';
            }})()"#,
            sel = js_str(selector)
        );
        self.eval_bool(js).await
    }

    async fn click_first(&self, selector: &str) -> bool {
        let Ok(elements) = self.page.find_elements(selector).await else {
            return false;
        };
        let Some(element) = elements.into_iter().next() else {
            return false;
        };
        let _ = element.scroll_into_view().await;
        let clicked = element.click().await.is_ok();
        if clicked {
            self.pace().await;
        }
        clicked
    }

    async fn attr_first(&self, selector: &str, name: &str) -> Option<String> {
        let elements = self.page.find_elements(selector).await.ok()?;
        let element = elements.into_iter().next()?;
        element.attribute(name).await.ok().flatten()
    }

    async fn text_at(&self, selector: &str, index: usize) -> Option<String> {
        let js = format!(
            r#"(() => {{
                const els = document.querySelectorAll({sel});
                if (els.length <= {index}) return null;
                return els[{index}].innerText;
            }})()"#,
            sel = js_str(selector)
        );
        match self.page.evaluate(js).await {
            Ok(result) => result
                .value()
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            Err(_) => None,
        }
    }

    async fn body_contains(&self, phrase: &str) -> bool {
        let js = format!(
            "(() => !!document.body && document.body.innerText.includes({p}))()",
            p = js_str(phrase)
        );
        self.eval_bool(js).await
    }

    async fn button_with_text(&self, phrase: &str) -> bool {
        let js = format!(
            r#"(() => {{
                const phrase = {p};
                const buttons = [...document.querySelectorAll('button')];
                return buttons.some(b => b.innerText.includes(phrase) && b.offsetParent !== null);
            }})()"#,
            p = js_str(phrase)
        );
        self.eval_bool(js).await
    }

    async fn click_button_with_text(&self, phrase: &str) -> bool {
        let js = format!(
            r#"(() => {{
                const phrase = {p};
                const buttons = [...document.querySelectorAll('button')];
                const hit = buttons.find(b => b.innerText.includes(phrase) && b.offsetParent !== null);
                if (!hit) return false;
                hit.click();
                return true;
            }})()"#,
            p = js_str(phrase)
        );
        let clicked = self.eval_bool(js).await;
        if clicked {
            self.pace().await;
        }
        clicked
    }

    async fn focus_first(&self, selector: &str) -> bool {
        let Ok(elements) = self.page.find_elements(selector).await else {
            return false;
        };
        let Some(element) = elements.into_iter().next() else {
            return false;
        };
        let _ = element.scroll_into_view().await;
        element.focus().await.is_ok()
    }

    async fn clear_editor(&self, selector: &str) -> bool {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.focus();
                if (el.isContentEditable) {{
                    document.execCommand('selectAll', false, null);
                    document.execCommand('delete', false, null);
                }} else {{
                    el.value = '';
                }}
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()"#,
            sel = js_str(selector)
        );
        self.eval_bool(js).await
    }

    async fn insert_text(&self, selector: &str, chunk: &str) -> bool {
        // execCommand keeps the editor's own input handlers in the loop,
        // which key-by-key dispatch does not guarantee for IME-style text.
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.focus();
                if (el.isContentEditable) {{
                    document.execCommand('insertText', false, {chunk});
                }} else {{
                    el.value = el.value + {chunk};
                }}
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()"#,
            sel = js_str(selector),
            chunk = js_str(chunk)
        );
        let inserted = self.eval_bool(js).await;
        if inserted {
            self.pace().await;
        }
        inserted
    }

    async fn set_files(&self, selector: &str, file: &Path) -> bool {
        let Some(path) = file.to_str() else {
            return false;
        };
        let Ok(elements) = self.page.find_elements(selector).await else {
            return false;
        };
        let Some(input) = elements.into_iter().next() else {
            return false;
        };
        let params = SetFileInputFilesParams::builder()
            .files(vec![path.to_string()])
            .backend_node_id(input.backend_node_id)
            .build();
        match params {
            Ok(params) => {
                let set = self.page.execute(params).await.is_ok();
                if set {
                    self.pace().await;
                }
                set
            }
            Err(e) => {
                debug!(error = %e, "set_files params rejected");
                false
            }
        }
    }

    async fn attach_via_chooser(&self, trigger: &str, file: &Path) -> bool {
        let Some(path) = file.to_str() else {
            return false;
        };
        let Ok(mut chooser_events) = self
            .page
            .event_listener::<EventFileChooserOpened>()
            .await
        else {
            return false;
        };
        if self
            .page
            .execute(SetInterceptFileChooserDialogParams::new(true))
            .await
            .is_err()
        {
            return false;
        }

        let mut attached = false;
        if self.click_first(trigger).await {
            if let Ok(Some(event)) = timeout(CHOOSER_WAIT, chooser_events.next()).await {
                if let Some(node) = event.backend_node_id.clone() {
                    let params = SetFileInputFilesParams::builder()
                        .files(vec![path.to_string()])
                        .backend_node_id(node)
                        .build();
                    if let Ok(params) = params {
                        attached = self.page.execute(params).await.is_ok();
                    }
                }
            }
        }

        let _ = self
            .page
            .execute(SetInterceptFileChooserDialogParams::new(false))
            .await;
        attached
    }

    async fn close(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            debug!(error = %e, "browser close failed");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "browser wait failed");
        }
        self.handler_task.abort();
    }
}
