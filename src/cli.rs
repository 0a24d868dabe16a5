use std::path::PathBuf;

use clap::Parser;

use crate::prompts::PromptVariant;

#[derive(Parser, Debug)]
#[command(name = "paperchat")]
#[command(about = "Drive a chat assistant's web UI to summarize research PDFs")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Maximum number of PDFs to process this run
    #[arg(short, long, value_name = "N")]
    pub count: Option<usize>,

    /// Root directory holding PDF/, outputs/ and prompts/
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Run the browser headless
    #[arg(long)]
    pub headless: bool,

    /// Prompt variant to use
    #[arg(long, value_enum, default_value = "cot")]
    pub variant: PromptVariant,

    /// Paste extracted text into the prompt instead of attaching the PDF
    #[arg(long)]
    pub no_attach: bool,

    /// Save rendered prompts and raw replies under outputs/debug
    #[arg(long)]
    pub debug_raw: bool,
}
