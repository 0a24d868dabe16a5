//! Run outputs: the processed-document ledger, per-document JSON summaries,
//! the consolidated markdown report, and the raw-reply debug sink.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::summary::ArticleSummary;

/// Which document stems have already been processed. Persisted as a sorted
/// JSON array so the file diffs cleanly between runs.
pub struct Ledger {
    path: PathBuf,
    entries: BTreeSet<String>,
}

impl Ledger {
    /// A missing, empty, or corrupt ledger file reads as empty; the run must
    /// not abort over it.
    pub fn load(path: &Path) -> Self {
        let entries = fs::read_to_string(path)
            .ok()
            .and_then(|text| serde_json::from_str::<Vec<String>>(&text).ok())
            .map(BTreeSet::from_iter)
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.entries.contains(stem)
    }

    /// Record a stem and rewrite the file immediately, so a crash mid-run
    /// does not lose completed work.
    pub fn record(&mut self, stem: &str) -> Result<()> {
        self.entries.insert(stem.to_string());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let sorted: Vec<&String> = self.entries.iter().collect();
        fs::write(&self.path, serde_json::to_string_pretty(&sorted)?)?;
        Ok(())
    }
}

/// Write one summary as `<stem>.json` under `dir`.
pub fn write_summary_json(dir: &Path, stem: &str, summary: &ArticleSummary) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{stem}.json"));
    fs::write(&path, serde_json::to_string_pretty(summary)?)?;
    Ok(path)
}

/// Append one summary to the consolidated markdown report.
pub fn append_markdown(path: &Path, summary: &ArticleSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "## {}\n", summary.title)?;
    writeln!(file, "**Objectives:** {}\n", summary.main_objectives)?;
    writeln!(
        file,
        "**Research questions:** {}\n",
        summary.research_questions
    )?;
    writeln!(file, "**Study type:** {}\n", summary.study_type)?;
    writeln!(file, "**Methodology:** {}\n", summary.methodology)?;
    writeln!(file, "**Findings:** {}\n", summary.main_findings)?;
    writeln!(file, "**Conclusions:** {}\n", summary.conclusions)?;
    writeln!(file, "**Limitations:** {}\n", summary.limitations)?;
    if let Some(rationale) = &summary.rationale {
        writeln!(file, "**Rationale:** {rationale}\n")?;
    }
    writeln!(file, "---\n")?;
    Ok(())
}

/// Best-effort dump of raw replies for post-mortem inspection. Failures here
/// are logged and swallowed; debugging output never kills a run.
pub struct DebugSink {
    dir: PathBuf,
    verbose: bool,
}

impl DebugSink {
    pub fn new(dir: PathBuf, verbose: bool) -> Self {
        Self { dir, verbose }
    }

    /// Save `<stem>_<tag>.txt` unconditionally.
    pub fn save(&self, stem: &str, tag: &str, text: &str) {
        if let Err(err) = self.try_save(stem, tag, text) {
            warn!(stem, tag, %err, "failed to write debug dump");
        }
    }

    /// Save only when verbose raw dumping was requested.
    pub fn save_verbose(&self, stem: &str, tag: &str, text: &str) {
        if self.verbose {
            self.save(stem, tag, text);
        }
    }

    fn try_save(&self, stem: &str, tag: &str, text: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(format!("{stem}_{tag}.txt")), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ArticleSummary {
        ArticleSummary {
            title: "T".into(),
            main_objectives: "O".into(),
            research_questions: "Q".into(),
            study_type: "review".into(),
            methodology: "M".into(),
            main_findings: "F".into(),
            conclusions: "C".into(),
            limitations: "L".into(),
            rationale: None,
        }
    }

    #[test]
    fn ledger_round_trips_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");

        let mut ledger = Ledger::load(&path);
        assert!(!ledger.contains("paper-a"));
        ledger.record("paper-b").unwrap();
        ledger.record("paper-a").unwrap();

        let reloaded = Ledger::load(&path);
        assert!(reloaded.contains("paper-a"));
        assert!(reloaded.contains("paper-b"));
        assert!(!reloaded.contains("paper-c"));
    }

    #[test]
    fn ledger_file_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");

        let mut ledger = Ledger::load(&path);
        ledger.record("zebra").unwrap();
        ledger.record("alpha").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let entries: Vec<String> = serde_json::from_str(&text).unwrap();
        assert_eq!(entries, vec!["alpha", "zebra"]);
    }

    #[test]
    fn corrupt_ledger_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");
        fs::write(&path, "{not json").unwrap();

        let ledger = Ledger::load(&path);
        assert!(!ledger.contains("anything"));
    }

    #[test]
    fn markdown_report_labels_fields_and_rules_off_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consolidated.md");

        let mut with_rationale = summary();
        with_rationale.rationale = Some("because".into());
        append_markdown(&path, &summary()).unwrap();
        append_markdown(&path, &with_rationale).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("## T").count(), 2);
        assert_eq!(text.matches("---").count(), 2);
        assert_eq!(text.matches("**Rationale:** because").count(), 1);
        assert!(text.contains("**Study type:** review"));
    }

    #[test]
    fn summary_json_lands_under_the_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_summary_json(dir.path(), "paper-01", &summary()).unwrap();
        assert_eq!(path, dir.path().join("paper-01.json"));

        let text = fs::read_to_string(&path).unwrap();
        let parsed: ArticleSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, summary());
    }

    #[test]
    fn debug_sink_gates_verbose_dumps() {
        let dir = tempfile::tempdir().unwrap();

        let quiet = DebugSink::new(dir.path().to_path_buf(), false);
        quiet.save_verbose("doc", "prompt", "text");
        assert!(!dir.path().join("doc_prompt.txt").exists());

        quiet.save("doc", "raw_no_parse", "text");
        assert!(dir.path().join("doc_raw_no_parse.txt").exists());

        let chatty = DebugSink::new(dir.path().to_path_buf(), true);
        chatty.save_verbose("doc", "prompt", "text");
        assert!(dir.path().join("doc_prompt.txt").exists());
    }
}
