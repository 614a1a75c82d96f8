//! Console confirmation
//!
//! Every pending decision is shown with its diff and answered with
//! `yes`, `no` or `all`. `all` approves the current decision and every
//! later one of the same kind for the rest of the pass. End of input
//! declines whatever is left.

use std::collections::HashSet;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use monsync_core::domain::{SyncAction, SyncDecision};
use monsync_core::ports::IConfirmation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    All,
}

fn parse_answer(line: &str) -> Option<Answer> {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Answer::Yes),
        "n" | "no" => Some(Answer::No),
        "a" | "all" => Some(Answer::All),
        _ => None,
    }
}

/// [`IConfirmation`] reading answers from stdin on a blocking thread
pub struct ConsoleConfirmation;

#[async_trait::async_trait]
impl IConfirmation for ConsoleConfirmation {
    async fn confirm(&self, instance: &str, decisions: &[SyncDecision]) -> Result<Vec<usize>> {
        let instance = instance.to_string();
        let decisions = decisions.to_vec();
        tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            confirm_with(&instance, &decisions, &mut input, &mut io::stderr())
        })
        .await
        .context("Confirmation prompt stopped unexpectedly")?
    }
}

pub fn confirm_with<R: BufRead, W: Write>(
    instance: &str,
    decisions: &[SyncDecision],
    input: &mut R,
    output: &mut W,
) -> Result<Vec<usize>> {
    let mut approved = Vec::new();
    let mut approved_kinds: HashSet<SyncAction> = HashSet::new();

    writeln!(
        output,
        "{} pending for instance '{instance}'",
        crate::output::plural(decisions.len(), "change")
    )?;

    for (index, decision) in decisions.iter().enumerate() {
        if approved_kinds.contains(&decision.action) {
            approved.push(index);
            continue;
        }

        writeln!(output)?;
        show(decision, output)?;

        loop {
            write!(output, "Apply {}? [yes/no/all] ", decision.action)?;
            output.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(approved);
            }
            match parse_answer(&line) {
                Some(Answer::Yes) => {
                    approved.push(index);
                    break;
                }
                Some(Answer::No) => break,
                Some(Answer::All) => {
                    approved.push(index);
                    approved_kinds.insert(decision.action);
                    break;
                }
                None => writeln!(output, "Please answer yes, no or all")?,
            }
        }
    }
    Ok(approved)
}

fn show<W: Write>(decision: &SyncDecision, output: &mut W) -> Result<()> {
    writeln!(output, "{}", decision.describe())?;
    if decision.action == SyncAction::Prune {
        if let Some(folder) = decision.local.as_ref().and_then(|l| l.folder.as_deref()) {
            writeln!(
                output,
                "  {} will be removed and its content discarded",
                folder.display()
            )?;
        }
    }
    if decision.concurrent_edit {
        writeln!(
            output,
            "  both sides changed since the last sync; applying keeps the local copy"
        )?;
    }
    if let Some(changes) = decision.changes.as_ref().filter(|c| !c.is_empty()) {
        for line in changes.render().lines() {
            writeln!(output, "    {line}")?;
        }
    }
    Ok(())
}

/// Plain yes/no question; anything but yes is no
pub async fn ask(question: &str) -> Result<bool> {
    let question = question.to_string();
    tokio::task::spawn_blocking(move || {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        ask_with(&question, &mut input, &mut io::stderr())
    })
    .await
    .context("Prompt stopped unexpectedly")?
}

fn ask_with<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> Result<bool> {
    write!(output, "{question} [yes/no] ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(parse_answer(&line) == Some(Answer::Yes))
}
