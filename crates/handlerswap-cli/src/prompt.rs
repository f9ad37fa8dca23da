use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};

use anyhow::{Context, Result};
use handlerswap_core::SelectionMenu;

/// The operator side of the conversation. Each call is one request and one
/// response; callers decide what an unusable answer means.
pub(crate) trait Operator {
    fn choose(&mut self, title: &str, menu: &SelectionMenu) -> Result<String>;

    fn confirm(&mut self, question: &str) -> Result<bool>;
}

pub(crate) struct TerminalOperator<R, W> {
    input: R,
    output: W,
}

impl TerminalOperator<StdinLock<'static>, Stdout> {
    pub(crate) fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self) -> Result<String> {
        let mut answer = String::new();
        self.input
            .read_line(&mut answer)
            .context("failed reading operator input")?;
        Ok(answer.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn choose(&mut self, title: &str, menu: &SelectionMenu) -> Result<String> {
        writeln!(self.output, "{title}:").context("failed writing menu")?;
        for line in menu.lines() {
            writeln!(self.output, "  {line}").context("failed writing menu")?;
        }
        write!(self.output, "Enter a number [1-{}]: ", menu.entries().len())
            .context("failed writing prompt")?;
        self.output.flush().context("failed flushing prompt")?;
        self.read_answer()
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        write!(self.output, "{question} [y/N]: ").context("failed writing prompt")?;
        self.output.flush().context("failed flushing prompt")?;
        Ok(is_affirmative(&self.read_answer()?))
    }
}

pub(crate) fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
