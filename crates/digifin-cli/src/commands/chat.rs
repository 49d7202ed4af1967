//! Chatbot commands (one-shot ask, interactive chat)

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use digifin_core::chat::GREETING;
use digifin_core::{Database, QueryResolver, ReplySource, Transcript};
use tracing::debug;

pub async fn cmd_ask(db: &Database, resolver: &QueryResolver, query: &str) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("Query cannot be empty");
    }

    let expenses = db.list_expenses().context("Failed to load expenses")?;
    let resolution = resolver.resolve(query, &expenses).await;
    debug!("Answered via {}", describe_source(&resolution.source));

    println!("{}", resolution.reply);
    Ok(())
}

pub async fn cmd_chat(db: &Database, resolver: &QueryResolver) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_chat(db, resolver, stdin.lock(), stdout.lock()).await
}

/// Drive a chat session over arbitrary input and output streams
///
/// Each line is one query. Expenses are reloaded per query so answers track
/// writes made by other processes. Ends on `exit`, `quit` or end of input.
pub async fn run_chat<R: BufRead, W: Write>(
    db: &Database,
    resolver: &QueryResolver,
    input: R,
    mut output: W,
) -> Result<()> {
    let mut transcript = Transcript::new();
    writeln!(output, "{}", GREETING)?;
    writeln!(output, "   (type 'exit' to leave)")?;

    for line in input.lines() {
        let line = line?;
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }

        let expenses = db.list_expenses().context("Failed to load expenses")?;
        if let Some(resolution) = transcript.send(resolver, query, &expenses).await {
            writeln!(output, "🤖 {}", resolution.reply)?;
            output.flush()?;
        }
    }

    debug!("Chat ended after {} messages", transcript.len());
    writeln!(output, "👋 Bye!")?;
    Ok(())
}

fn describe_source(source: &ReplySource) -> String {
    match source {
        ReplySource::Rule(name) => format!("rule '{}'", name),
        ReplySource::Model => "model".to_string(),
        ReplySource::Fallback => "fallback".to_string(),
    }
}
