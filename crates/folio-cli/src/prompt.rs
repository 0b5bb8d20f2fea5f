//! Yes/no questions before destructive commands

use anyhow::{bail, Result};
use std::io::{self, BufRead, Write};

use crate::output::Output;

/// Ask a yes/no question on the terminal
///
/// Without a terminal on stdin the answer is no.
pub fn ask(question: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }
    let stdin = io::stdin();
    Ok(ask_with(question, &mut stdin.lock(), &mut io::stdout())?)
}

/// Confirm a destructive action, honoring `--yes`
///
/// JSON and quiet modes never ask, so they require `--yes`.
pub fn approve(question: &str, yes: bool, output: &Output) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !output.should_prompt() {
        bail!("Refusing to continue without --yes");
    }
    ask(question)
}

fn ask_with(question: &str, input: &mut impl BufRead, out: &mut impl Write) -> io::Result<bool> {
    write!(out, "{} [y/N] ", question)?;
    out.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "s" | "sim"
    ))
}
