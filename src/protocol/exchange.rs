//! One full document exchange: attach, submit, await, extract, validate,
//! with a bounded corrective re-prompt loop.

use std::path::Path;

use tracing::{info, warn};

use super::ChatProtocol;
use crate::error::{Error, Result};
use crate::extract::extract_object;
use crate::prompts::PromptLibrary;
use crate::storage::DebugSink;
use crate::summary::{ArticleSummary, SchemaViolation};

pub struct ExchangeRequest<'a> {
    /// Stable document identity (file stem).
    pub stem: &'a str,
    /// Extracted article text, already truncated.
    pub article_text: &'a str,
    /// File to attach; `None` pastes the text into the prompt instead.
    pub file: Option<&'a Path>,
}

pub struct SummaryExchange<'a> {
    pub protocol: &'a ChatProtocol,
    pub prompts: &'a PromptLibrary,
    pub debug: &'a DebugSink,
    /// Corrective re-prompts allowed after the first failed attempt.
    pub fix_attempts: u32,
}

enum ParseFailure {
    NoObject,
    Schema(SchemaViolation),
}

impl SummaryExchange<'_> {
    /// Drive one document through the conversation and return its validated
    /// summary. Exhausting the corrective budget is terminal for the
    /// document, not the run.
    pub async fn run(&self, request: ExchangeRequest<'_>) -> Result<ArticleSummary> {
        self.protocol.ensure_ready().await;

        let prompt = match request.file {
            Some(file) => {
                self.protocol.attach(file).await?;
                self.prompts.render_with_attachment(request.stem)
            }
            None => self
                .prompts
                .render_without_attachment(request.stem, request.article_text),
        };
        self.debug.save_verbose(request.stem, "prompt", &prompt);

        let watermark = self.protocol.submit(&prompt).await?;
        let reply = self.protocol.await_reply(watermark).await;
        self.debug.save_verbose(request.stem, "raw", &reply);

        let mut last_violation = None;
        match parse_reply(&reply) {
            Ok(summary) => return Ok(summary),
            Err(ParseFailure::NoObject) => {
                self.debug.save(request.stem, "raw_no_parse", &reply);
            }
            Err(ParseFailure::Schema(violation)) => {
                warn!(doc = request.stem, %violation, "reply failed schema validation");
                self.debug.save(request.stem, "raw_bad_schema", &reply);
                last_violation = Some(violation);
            }
        }

        for attempt in 1..=self.fix_attempts {
            info!(doc = request.stem, attempt, "sending corrective prompt");
            let watermark = self.protocol.submit(self.prompts.corrective()).await?;
            let reply = self.protocol.await_reply(watermark).await;
            self.debug
                .save_verbose(request.stem, &format!("raw_fix_{attempt}"), &reply);

            match parse_reply(&reply) {
                Ok(summary) => return Ok(summary),
                Err(ParseFailure::NoObject) => {
                    self.debug
                        .save(request.stem, &format!("raw_fix_no_parse_{attempt}"), &reply);
                }
                Err(ParseFailure::Schema(violation)) => {
                    warn!(doc = request.stem, attempt, %violation, "corrective reply failed schema validation");
                    self.debug.save(
                        request.stem,
                        &format!("raw_fix_bad_schema_{attempt}"),
                        &reply,
                    );
                    last_violation = Some(violation);
                }
            }
        }

        let attempts = self.fix_attempts + 1;
        match last_violation {
            Some(violation) => Err(Error::Schema {
                detail: violation.to_string(),
                attempts,
            }),
            None => Err(Error::Extraction { attempts }),
        }
    }
}

fn parse_reply(reply: &str) -> std::result::Result<ArticleSummary, ParseFailure> {
    match extract_object(reply) {
        Some(object) => ArticleSummary::from_object(&object).map_err(ParseFailure::Schema),
        None => Err(ParseFailure::NoObject),
    }
}
