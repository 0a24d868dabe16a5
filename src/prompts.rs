//! Prompt templates: three variants, each with a with-attachment and a
//! without-attachment form, plus a shared corrective prompt.
//!
//! Templates live as plain-text files under the prompts directory and are
//! seeded from built-in defaults when missing. Placeholders are
//! `{file_title}` and `{article_text}`. Loading is an explicit step on an
//! explicit struct; nothing is seeded as an import side effect.

use std::fs;
use std::path::Path;

use clap::ValueEnum;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PromptVariant {
    /// Chain-of-thought instructions followed internally by the assistant.
    Cot,
    /// Direct instructions, no exemplars.
    Zeroshot,
    /// Two abridged exemplars for format guidance.
    Fewshot,
}

impl PromptVariant {
    pub fn stem(self) -> &'static str {
        match self {
            PromptVariant::Cot => "cot",
            PromptVariant::Zeroshot => "zeroshot",
            PromptVariant::Fewshot => "fewshot",
        }
    }

    pub fn all() -> [PromptVariant; 3] {
        [
            PromptVariant::Cot,
            PromptVariant::Zeroshot,
            PromptVariant::Fewshot,
        ]
    }
}

pub struct PromptLibrary {
    with_attachment: String,
    without_attachment: String,
    corrective: String,
}

impl PromptLibrary {
    /// Load the active variant's templates, first seeding any missing prompt
    /// file (for every variant) with its built-in default.
    pub fn load(dir: &Path, variant: PromptVariant) -> Result<Self> {
        fs::create_dir_all(dir)?;
        for v in PromptVariant::all() {
            seed(&dir.join(with_attachment_file(v)), &default_with(v))?;
            seed(&dir.join(without_attachment_file(v)), &default_without(v))?;
        }
        seed(&dir.join(FIX_FILE), DEFAULT_FIX)?;

        Ok(Self {
            with_attachment: fs::read_to_string(dir.join(with_attachment_file(variant)))?,
            without_attachment: fs::read_to_string(dir.join(without_attachment_file(variant)))?,
            corrective: fs::read_to_string(dir.join(FIX_FILE))?,
        })
    }

    pub fn render_with_attachment(&self, file_title: &str) -> String {
        self.with_attachment.replace("{file_title}", file_title)
    }

    pub fn render_without_attachment(&self, file_title: &str, article_text: &str) -> String {
        self.without_attachment
            .replace("{file_title}", file_title)
            .replace("{article_text}", article_text)
    }

    pub fn corrective(&self) -> &str {
        &self.corrective
    }
}

fn with_attachment_file(variant: PromptVariant) -> String {
    format!("{}_with_attachment.txt", variant.stem())
}

fn without_attachment_file(variant: PromptVariant) -> String {
    format!("{}_without_attachment.txt", variant.stem())
}

fn seed(path: &Path, contents: &str) -> Result<()> {
    if !path.exists() {
        fs::write(path, contents)?;
    }
    Ok(())
}

// =================== built-in defaults ===================

const FIX_FILE: &str = "fix_json.txt";

const SCHEMA_BLOCK: &str = r#"Return ONLY this JSON (no markdown, no extra keys):
{
  "title": "...",
  "main_objectives": "... (1-3 sentences)",
  "research_questions": "... (single string; items separated by '; ')",
  "study_type": "...",
  "methodology": "... (2-4 sentences)",
  "main_findings": "... (2-5 sentences)",
  "conclusions": "... (1-3 sentences)",
  "limitations": "... (1-3 sentences or 'Not explicitly stated')",
  "rationale": "... (2-6 sentences explaining how you arrived at the answers; cite sections/excerpts if helpful)"
}"#;

const COT_STEPS: &str = r#"Follow the Chain-of-Thought (CoT) INTERNALLY; DO NOT reveal reasoning:
- Q1 Objectives/RQs: read intro/abstract; find aims/gaps; derive objectives; list RQs.
- Q2 Study type: inspect Methods for design; decide among experimental/case study/review/meta/qualitative/quantitative/etc.
- Q3 Methodology: participants/sample; instruments; collection procedures; analysis techniques/software.
- Q4 Findings: extract main results (tables/figures); focus on primary outcomes.
- Q5 Conclusions: how authors interpret results vs objectives/RQs; key message.
- Q6 Limitations: explicit section or statements about sample/design/collection/analysis constraints; impacts."#;

const FEWSHOT_EXEMPLARS: &str = r#"EXEMPLARS (for guidance; DO NOT copy wording):

Example A (input: methods-driven empirical study)
Expected JSON (abridged):
{
  "title": "Effects of X on Y in Z",
  "main_objectives": "Investigate the relationship between X and Y in Z.",
  "research_questions": "Does X affect Y?; How strong is the effect?",
  "study_type": "experimental",
  "methodology": "Participants ...; Data collected via ...; Analysis used regression ...",
  "main_findings": "X significantly increased Y ...",
  "conclusions": "Findings support ...",
  "limitations": "Small sample; Single site",
  "rationale": "Derived from Abstract purpose, Methods design, Results tables, and Discussion."
}

Example B (input: narrative review)
Expected JSON (abridged):
{
  "title": "A Review of ABC Approaches",
  "main_objectives": "Synthesize literature on ABC ...",
  "research_questions": "What approaches exist?; What gaps remain?",
  "study_type": "review",
  "methodology": "Sources from ...; Inclusion criteria ...; Thematic synthesis ...",
  "main_findings": "Three themes ...",
  "conclusions": "ABC remains limited by ...",
  "limitations": "Potential selection bias; Limited databases",
  "rationale": "Taken from stated aims, methods section, and concluding remarks."
}"#;

const DEFAULT_FIX: &str = "Your previous message did not contain a valid JSON matching the schema.
Please re-send ONLY a valid minified JSON object with exactly these keys (no extra keys, no markdown):
title, main_objectives, research_questions, study_type, methodology, main_findings, conclusions, limitations, rationale.
";

fn default_with(variant: PromptVariant) -> String {
    match variant {
        PromptVariant::Cot => format!(
            "You are a meticulous research assistant. Read the ATTACHED PDF (file: {{file_title}}).\n\
             {COT_STEPS}\n\
             Your final output must be a compact JSON ONLY. {SCHEMA_BLOCK}"
        ),
        PromptVariant::Zeroshot => format!(
            "You are a meticulous research assistant. Read the ATTACHED PDF (file: {{file_title}}).\n\
             Extract the following fields faithfully and concisely. {SCHEMA_BLOCK}"
        ),
        PromptVariant::Fewshot => format!(
            "You are a meticulous research assistant. Read the ATTACHED PDF (file: {{file_title}}).\n\
             Mimic the style of the exemplars below, but keep content faithful to THIS paper. {SCHEMA_BLOCK}\n\n\
             {FEWSHOT_EXEMPLARS}"
        ),
    }
}

fn default_without(variant: PromptVariant) -> String {
    let body = match variant {
        PromptVariant::Cot => format!(
            "You are a meticulous research assistant. The article text is below (file: {{file_title}}).\n\
             {COT_STEPS}\n\
             Your final output must be a compact JSON ONLY. {SCHEMA_BLOCK}"
        ),
        PromptVariant::Zeroshot => format!(
            "You are a meticulous research assistant. The article text is below (file: {{file_title}}).\n\
             Extract the following fields faithfully and concisely. {SCHEMA_BLOCK}"
        ),
        PromptVariant::Fewshot => format!(
            "You are a meticulous research assistant. The article text is below (file: {{file_title}}).\n\
             Mimic the style of the exemplars below, but keep content faithful to THIS paper. {SCHEMA_BLOCK}\n\n\
             {FEWSHOT_EXEMPLARS}"
        ),
    };
    format!("{body}\n\nARTICLE RAW TEXT\n--- START ---\n{{article_text}}\n--- END ---")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_are_seeded_for_every_variant() {
        let dir = tempfile::tempdir().unwrap();
        PromptLibrary::load(dir.path(), PromptVariant::Cot).unwrap();

        for variant in PromptVariant::all() {
            assert!(dir.path().join(with_attachment_file(variant)).exists());
            assert!(dir.path().join(without_attachment_file(variant)).exists());
        }
        assert!(dir.path().join(FIX_FILE).exists());
    }

    #[test]
    fn render_substitutes_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let library = PromptLibrary::load(dir.path(), PromptVariant::Zeroshot).unwrap();

        let with = library.render_with_attachment("paper-01");
        assert!(with.contains("paper-01"));
        assert!(!with.contains("{file_title}"));

        let without = library.render_without_attachment("paper-01", "BODY TEXT");
        assert!(without.contains("BODY TEXT"));
        assert!(!without.contains("{article_text}"));
    }

    #[test]
    fn existing_files_win_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(with_attachment_file(PromptVariant::Cot));
        fs::write(&path, "custom {file_title} template").unwrap();

        let library = PromptLibrary::load(dir.path(), PromptVariant::Cot).unwrap();
        assert_eq!(
            library.render_with_attachment("doc"),
            "custom doc template"
        );
    }

    #[test]
    fn corrective_prompt_names_every_required_key() {
        let dir = tempfile::tempdir().unwrap();
        let library = PromptLibrary::load(dir.path(), PromptVariant::Cot).unwrap();
        for key in crate::summary::REQUIRED_KEYS {
            assert!(library.corrective().contains(key), "missing {key}");
        }
    }
}
