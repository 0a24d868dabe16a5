use async_trait::async_trait;
use colored::Colorize;

use super::OperatorPort;

const RULE: &str = "────────────────────────────────────────────────────────";

/// Operator port backed by the terminal: prints a banner and blocks until the
/// operator presses ENTER.
pub struct ConsoleOperator;

#[async_trait]
impl OperatorPort for ConsoleOperator {
    async fn confirm(&self, instructions: &str) {
        println!("\n{RULE}");
        println!("{}  {}", "paused".yellow().bold(), instructions);
        println!("{RULE}\n");

        // Stdin reads are blocking; keep them off the runtime threads.
        let _ = tokio::task::spawn_blocking(|| {
            use std::io::{BufRead, Write};
            print!("press ENTER when done... ");
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            let _ = std::io::stdin().lock().read_line(&mut line);
        })
        .await;
    }
}
