//! Named groups of UI-element probes for the chat surface.
//!
//! Selectors are volatile configuration, not logic: the defaults target the
//! ChatGPT UI as of writing, and the whole struct is injected so a different
//! surface (or a test double) can swap them wholesale. CDP query selectors
//! cannot match on text, so text-based probes are carried as separate phrase
//! lists matched by injected script.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selectors {
    /// Candidate message editors, in priority order.
    pub editors: Vec<String>,
    pub send_buttons: Vec<String>,
    pub send_phrases: Vec<String>,
    pub attach_buttons: Vec<String>,
    pub attach_phrases: Vec<String>,
    pub file_inputs: Vec<String>,
    pub file_previews: Vec<String>,
    pub upload_busy: Vec<String>,
    pub upload_busy_phrases: Vec<String>,
    pub upload_done_phrases: Vec<String>,
    pub stop_generating: Vec<String>,
    pub stop_phrases: Vec<String>,
    /// Single CSS list addressing assistant turns; turn order is DOM order.
    pub assistant_turns: String,
    /// Buttons that dismiss consent banners and similar overlays.
    pub overlay_phrases: Vec<String>,
    pub challenge_frames: Vec<String>,
    pub challenge_phrases: Vec<String>,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            editors: strings(&[
                "div[contenteditable='true'][data-testid*='composer']",
                "div[contenteditable='true'][data-gramm='false']",
                "div[contenteditable='true']",
                "textarea[name='prompt-textarea']",
                "textarea",
            ]),
            send_buttons: strings(&[
                "button[aria-label*='Send']",
                "button[data-testid*='send']",
                "[data-testid*='send']",
            ]),
            send_phrases: strings(&["Send", "Enviar"]),
            attach_buttons: strings(&[
                "button[aria-label*='Attach']",
                "button[aria-label*='Upload']",
                "button[aria-label*='Adicionar']",
                "[data-testid*='attach']",
                "[data-testid*='upload']",
            ]),
            attach_phrases: strings(&["Attach", "Anexar", "Upload"]),
            file_inputs: strings(&[
                "input[type='file']",
                "input[type='file'][multiple]",
                "input[data-testid*='file']",
                "input[accept*='pdf']",
            ]),
            file_previews: strings(&[
                "[data-testid*='attachment']",
                "[data-testid*='file']",
                "[data-testid*='chip']",
            ]),
            upload_busy: strings(&[
                "[aria-label*='Uploading']",
                "[data-state='uploading']",
                "progress",
            ]),
            upload_busy_phrases: strings(&["Uploading", "Carregando", "Enviando"]),
            upload_done_phrases: strings(&["Uploaded", "Conclu\u{ed}do", "Pronto"]),
            stop_generating: strings(&["button[aria-label*='Stop']"]),
            stop_phrases: strings(&["Stop generating", "Parar"]),
            assistant_turns: "[data-message-author-role='assistant'] .markdown, \
                              div[data-message-author-role='assistant'] .markdown, \
                              div.markdown"
                .to_string(),
            overlay_phrases: strings(&[
                "Aceitar", "Accept", "I agree", "Concordo", "OK", "Entendi", "Got it", "Fechar",
                "Close", "Continuar", "Continue", "Agree",
            ]),
            challenge_frames: strings(&[
                "iframe[src*='hcaptcha.com']",
                "iframe[src*='challenges.cloudflare.com']",
                "iframe[title*='challenge']",
            ]),
            challenge_phrases: strings(&[
                "Verify you are human",
                "Verifique se voc\u{ea} \u{e9} humano",
                "I am human",
                "Sou humano",
                "Please stand by, while we are checking your browser",
                "Checking if the site connection is secure",
            ]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
