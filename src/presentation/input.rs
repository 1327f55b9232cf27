//! Line-oriented console input
//!
//! The interactive loop reads through [`LineSource`] so it can be driven by a
//! script in tests.

use std::io::{self, BufRead, Write};

pub trait LineSource {
    /// Show `prompt` and block for one line
    ///
    /// Returns `None` at end of input. The line terminator is stripped.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Prompts on stdout and reads stdin
pub struct StdinLines {
    stdin: io::Stdin,
    stdout: io::Stdout,
}

impl StdinLines {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
        }
    }
}

impl Default for StdinLines {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSource for StdinLines {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = self.stdout.lock();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;

        let mut line = String::new();
        if self.stdin.lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(strip_line_ending(&line).to_string()))
    }
}

fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Replays fixed lines and records every prompt shown
    #[derive(Debug, Default)]
    pub struct ScriptedLines {
        lines: VecDeque<String>,
        pub prompts: Vec<String>,
    }

    impl ScriptedLines {
        pub fn new(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|line| line.to_string()).collect(),
                prompts: Vec::new(),
            }
        }

        pub fn remaining(&self) -> usize {
            self.lines.len()
        }
    }

    impl LineSource for ScriptedLines {
        fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
            self.prompts.push(prompt.to_string());
            Ok(self.lines.pop_front())
        }
    }
}
