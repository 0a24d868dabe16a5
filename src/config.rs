//! Run configuration. Everything the protocols consume is carried in an
//! explicit struct built once at startup; no module-level globals.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::prompts::PromptVariant;

/// Filesystem layout for one run, rooted at a base directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub base_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub output_dir: PathBuf,
    pub json_dir: PathBuf,
    pub debug_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub markdown_path: PathBuf,
    pub prompts_dir: PathBuf,
    pub profile_dir: PathBuf,
}

impl Paths {
    pub fn under(base_dir: PathBuf) -> Self {
        let output_dir = base_dir.join("outputs");
        Self {
            pdf_dir: base_dir.join("PDF"),
            json_dir: output_dir.join("json"),
            debug_dir: output_dir.join("debug"),
            ledger_path: output_dir.join("sent.json"),
            markdown_path: output_dir.join("consolidated.md"),
            prompts_dir: base_dir.join("prompts"),
            profile_dir: base_dir.join(".browser-profile"),
            output_dir,
            base_dir,
        }
    }

    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.pdf_dir)?;
        std::fs::create_dir_all(&self.json_dir)?;
        std::fs::create_dir_all(&self.debug_dir)?;
        std::fs::create_dir_all(&self.prompts_dir)?;
        Ok(())
    }
}

/// Every poll interval and bound used by the interaction protocols.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Phase bound before an upload wait escalates to the operator.
    pub upload_soft: Duration,
    /// Overall bound on the whole upload wait; past this the attach fails.
    pub upload_hard: Duration,
    pub upload_poll: Duration,
    /// Bound on the submit-affordance gate before manual handoff.
    pub send_enabled_max: Duration,
    pub send_poll: Duration,
    /// How long to look for evidence a submission registered.
    pub dispatch_confirm: Duration,
    pub dispatch_poll: Duration,
    /// Overall bound on reply-completion detection.
    pub reply_complete: Duration,
    pub reply_poll: Duration,
    /// Consecutive identical polls required to call a reply stable.
    pub stability_rounds: u32,
    /// Bound on retrieving the assistant turn at the expected index.
    pub turn_fetch: Duration,
    pub turn_poll: Duration,
    /// Pacing delay between editor insertion chunks.
    pub chunk_pause: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            upload_soft: Duration::from_secs(30),
            upload_hard: Duration::from_secs(90),
            upload_poll: Duration::from_millis(500),
            send_enabled_max: Duration::from_secs(240),
            send_poll: Duration::from_secs(4),
            dispatch_confirm: Duration::from_secs(8),
            dispatch_poll: Duration::from_millis(400),
            reply_complete: Duration::from_secs(300),
            reply_poll: Duration::from_secs(1),
            stability_rounds: 3,
            turn_fetch: Duration::from_secs(120),
            turn_poll: Duration::from_millis(500),
            chunk_pause: Duration::from_millis(40),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub paths: Paths,
    pub headless: bool,
    /// Pacing delay after each browser interaction (click, insert, attach).
    pub slow_mo: Duration,
    pub max_docs: usize,
    pub text_max_chars: usize,
    /// Corrective re-prompt budget after the first failed parse.
    pub fix_attempts: u32,
    pub pause_between_docs: Duration,
    pub variant: PromptVariant,
    pub attach_files: bool,
    pub debug_raw: bool,
    pub timeouts: Timeouts,
}

impl RunConfig {
    /// Defaults overridable through the environment, CLI flags applied on top
    /// by the caller.
    pub fn from_env(base_dir: PathBuf) -> Self {
        let mut timeouts = Timeouts::default();
        if let Some(secs) = env_u64("SEND_MAX_WAIT_SEC") {
            timeouts.send_enabled_max = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("SEND_CHECK_INTERVAL_SEC") {
            timeouts.send_poll = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("REPLY_TIMEOUT_SEC") {
            timeouts.reply_complete = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("UPLOAD_HARD_TIMEOUT_SEC") {
            timeouts.upload_hard = Duration::from_secs(secs);
        }

        Self {
            paths: Paths::under(base_dir),
            headless: env_flag("HEADLESS"),
            slow_mo: Duration::from_millis(env_u64("SLOW_MO_MS").unwrap_or(120)),
            max_docs: env_u64("MAX_DOCS_PER_RUN").map(|n| n as usize).unwrap_or(1),
            text_max_chars: env_u64("TEXT_MAX_CHARS")
                .map(|n| n as usize)
                .unwrap_or(20_000),
            fix_attempts: env_u64("FIX_ATTEMPTS").map(|n| n as u32).unwrap_or(2),
            pause_between_docs: Duration::from_secs(env_u64("WAIT_AFTER_SEND_SEC").unwrap_or(6)),
            variant: PromptVariant::Cot,
            attach_files: true,
            debug_raw: env_flag("DEBUG_RAW"),
            timeouts,
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|v| v.trim() == "1").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_the_base_dir() {
        let paths = Paths::under(PathBuf::from("/work"));
        assert_eq!(paths.pdf_dir, PathBuf::from("/work/PDF"));
        assert_eq!(paths.ledger_path, PathBuf::from("/work/outputs/sent.json"));
        assert_eq!(
            paths.markdown_path,
            PathBuf::from("/work/outputs/consolidated.md")
        );
        assert_eq!(paths.json_dir, PathBuf::from("/work/outputs/json"));
    }

    #[test]
    fn slow_mo_defaults_to_interaction_pacing() {
        let config = RunConfig::from_env(PathBuf::from("/work"));
        assert_eq!(config.slow_mo, Duration::from_millis(120));
    }

    #[test]
    fn default_timeouts_match_protocol_contracts() {
        let t = Timeouts::default();
        assert_eq!(t.upload_hard, Duration::from_secs(90));
        assert_eq!(t.send_enabled_max, Duration::from_secs(240));
        assert_eq!(t.dispatch_confirm, Duration::from_secs(8));
        assert_eq!(t.reply_complete, Duration::from_secs(300));
        assert_eq!(t.stability_rounds, 3);
    }
}
