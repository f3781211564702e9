//! Confirmation - three-way approval for destructive remediation
//!
//! The executor never talks to a terminal itself. It hands a `ConfirmRequest`
//! to an injected `Confirmer`, which answers approve, decline or skip.

use crate::remediation::destructive::DestructiveOperation;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Answer to a destructive-operation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Decline,
    Skip,
}

/// Interpret one line of user input.
///
/// Returns None for anything unrecognized so the caller re-prompts.
/// An empty answer is an explicit decline.
pub fn parse_decision(input: &str) -> Option<Decision> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Decision::Approve),
        "n" | "no" | "" => Some(Decision::Decline),
        "s" | "skip" => Some(Decision::Skip),
        _ => None,
    }
}

/// What the confirmer is asked about
#[derive(Debug, Clone, Copy)]
pub struct ConfirmRequest<'a> {
    pub action_name: &'a str,
    pub action_description: &'a str,
    pub operation: &'a DestructiveOperation,
}

/// Interactive confirmation collaborator
pub trait Confirmer {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> Decision;
}

impl<C: Confirmer + ?Sized> Confirmer for &mut C {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> Decision {
        (**self).confirm(request)
    }
}

impl<C: Confirmer + ?Sized> Confirmer for Box<C> {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> Decision {
        (**self).confirm(request)
    }
}

/// Headless confirmer that always gives the same answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfirmer {
    decision: Decision,
}

impl PolicyConfirmer {
    pub fn new(decision: Decision) -> Self {
        Self { decision }
    }

    pub fn always_decline() -> Self {
        Self::new(Decision::Decline)
    }

    pub fn always_skip() -> Self {
        Self::new(Decision::Skip)
    }

    pub fn always_approve() -> Self {
        Self::new(Decision::Approve)
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }
}

impl Confirmer for PolicyConfirmer {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> Decision {
        warn!(
            "Destructive operation '{}' answered by policy: {:?}",
            request.action_name, self.decision
        );
        self.decision
    }
}

/// Prompts on a terminal (or any reader/writer pair)
pub struct TerminalConfirmer<R, W> {
    input: R,
    output: W,
}

impl TerminalConfirmer<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalConfirmer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn print_banner(&mut self, request: &ConfirmRequest<'_>) -> io::Result<()> {
        let op = request.operation;
        writeln!(self.output)?;
        writeln!(self.output, "⚠️  DESTRUCTIVE OPERATION DETECTED ⚠️")?;
        writeln!(self.output, "Operation: {}", op.description)?;
        writeln!(self.output, "Impact: {}", op.impact)?;
        writeln!(self.output, "Warning: {}", op.warning)?;
        writeln!(self.output)?;
        writeln!(self.output, "This operation cannot be easily undone!")?;
        Ok(())
    }

    fn ask(&mut self, request: &ConfirmRequest<'_>) -> io::Result<Decision> {
        self.print_banner(request)?;

        loop {
            write!(
                self.output,
                "\nProceed with '{}'? (y/N/s for skip): ",
                request.action_description
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                // End of input: nobody is there to approve
                writeln!(self.output)?;
                return Ok(Decision::Decline);
            }

            match parse_decision(&line) {
                Some(decision) => {
                    let label = match decision {
                        Decision::Approve => "✓ User approved",
                        Decision::Skip => "⏩ User skipped",
                        Decision::Decline => "❌ User declined",
                    };
                    writeln!(self.output, "{}: {}", label, request.action_description)?;
                    return Ok(decision);
                }
                None => {
                    writeln!(self.output, "Please enter 'y' (yes), 'n' (no), or 's' (skip)")?;
                }
            }
        }
    }
}

impl<R: BufRead, W: Write> Confirmer for TerminalConfirmer<R, W> {
    fn confirm(&mut self, request: &ConfirmRequest<'_>) -> Decision {
        match self.ask(request) {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Confirmation prompt failed, declining: {}", e);
                Decision::Decline
            }
        }
    }
}
