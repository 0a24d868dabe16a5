//! Run orchestration: discover documents, drive each through one exchange,
//! persist outcomes. One document failing never aborts the run.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::error::Result;
use crate::pdf;
use crate::prompts::PromptLibrary;
use crate::protocol::{ChatProtocol, ExchangeRequest, SummaryExchange};
use crate::selectors::Selectors;
use crate::session::{ChatSurface, ChromiumSurface, ConsoleOperator};
use crate::storage::{self, DebugSink, Ledger};

const CHAT_URL: &str = "https://chat.openai.com/";

pub async fn run(config: RunConfig) -> Result<()> {
    config.paths.ensure()?;
    let prompts = PromptLibrary::load(&config.paths.prompts_dir, config.variant)?;
    let mut ledger = Ledger::load(&config.paths.ledger_path);

    let batch = discover_batch(&config, &ledger)?;
    if batch.is_empty() {
        info!(dir = %config.paths.pdf_dir.display(), "no unprocessed PDFs found");
        return Ok(());
    }
    info!(count = batch.len(), "starting run");

    let surface: Arc<dyn ChatSurface> = Arc::new(
        ChromiumSurface::launch(&config.paths.profile_dir, config.headless, config.slow_mo)
            .await?,
    );
    let protocol = ChatProtocol::new(
        Arc::clone(&surface),
        Arc::new(ConsoleOperator),
        Selectors::default(),
        config.timeouts.clone(),
    );
    let debug = DebugSink::new(config.paths.debug_dir.clone(), config.debug_raw);
    let exchange = SummaryExchange {
        protocol: &protocol,
        prompts: &prompts,
        debug: &debug,
        fix_attempts: config.fix_attempts,
    };

    let outcome = process_batch(&config, &mut ledger, &protocol, &exchange, &batch).await;
    surface.close().await;
    outcome
}

/// Sorted unprocessed PDFs, capped at the per-run document limit.
fn discover_batch(config: &RunConfig, ledger: &Ledger) -> Result<Vec<PathBuf>> {
    let mut pdfs: Vec<PathBuf> = fs::read_dir(&config.paths.pdf_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort();
    Ok(pdfs
        .into_iter()
        .filter(|path| !ledger.contains(&stem_of(path)))
        .take(config.max_docs)
        .collect())
}

fn stem_of(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn process_batch(
    config: &RunConfig,
    ledger: &mut Ledger,
    protocol: &ChatProtocol,
    exchange: &SummaryExchange<'_>,
    batch: &[PathBuf],
) -> Result<()> {
    protocol.goto_and_ready(CHAT_URL).await?;

    for path in batch {
        let stem = stem_of(path);
        info!(doc = %stem, "processing document");

        let article_text = match pdf::extract_text(path, config.text_max_chars) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(doc = %stem, "extracted text is empty, skipping");
                continue;
            }
            Err(err) => {
                error!(doc = %stem, %err, "text extraction failed, skipping");
                continue;
            }
        };

        let request = ExchangeRequest {
            stem: &stem,
            article_text: &article_text,
            file: config.attach_files.then_some(path.as_path()),
        };
        match exchange.run(request).await {
            Ok(summary) => {
                let json_path =
                    storage::write_summary_json(&config.paths.json_dir, &stem, &summary)?;
                storage::append_markdown(&config.paths.markdown_path, &summary)?;
                ledger.record(&stem)?;
                info!(doc = %stem, path = %json_path.display(), "summary saved");
            }
            Err(err) => {
                error!(doc = %stem, %err, "document failed, continuing with the next");
            }
        }

        sleep(config.pause_between_docs).await;
    }
    Ok(())
}
