//! Line-based prompts for terminals without the full-screen UI, and for
//! piping answers in.

use std::io::{BufRead, Write};

use crate::error::{Result, SubdlError};
use crate::select::Chooser;

pub struct LineChooser<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineChooser<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn io_err(e: std::io::Error) -> SubdlError {
        SubdlError::Io {
            path: "<terminal>".into(),
            source: e,
        }
    }

    fn print(&mut self, text: &str) -> Result<()> {
        write!(self.output, "{text}").map_err(Self::io_err)?;
        self.output.flush().map_err(Self::io_err)
    }

    /// Next input line, trimmed. End of input cancels the prompt.
    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(Self::io_err)?;
        if read == 0 {
            return Err(SubdlError::Cancelled);
        }
        Ok(line.trim().to_string())
    }

    fn list(&mut self, prompt: &str, options: &[String]) -> Result<()> {
        let mut text = format!("\n{prompt}\n");
        for (i, option) in options.iter().enumerate() {
            text.push_str(&format!("  {}. {option}\n", i + 1));
        }
        self.print(&text)
    }
}

/// Parses `"1, 3-5 7"` into zero-based indices; `None` if any token is
/// malformed or out of `1..=len`.
fn parse_selection(answer: &str, len: usize) -> Option<Vec<usize>> {
    let mut indices = Vec::new();
    for token in answer.split([',', ' ']).filter(|t| !t.is_empty()) {
        let (start, end) = match token.split_once('-') {
            Some((a, b)) => (a.trim().parse::<usize>().ok()?, b.trim().parse::<usize>().ok()?),
            None => {
                let n = token.parse::<usize>().ok()?;
                (n, n)
            }
        };
        if start == 0 || start > end || end > len {
            return None;
        }
        indices.extend(start - 1..end);
    }
    (!indices.is_empty()).then_some(indices)
}

impl<R: BufRead, W: Write> Chooser for LineChooser<R, W> {
    fn choose(&mut self, prompt: &str, options: &[String]) -> Result<usize> {
        if options.is_empty() {
            return Err(SubdlError::EmptyChoice(prompt.to_string()));
        }
        self.list(prompt, options)?;
        loop {
            self.print(&format!("Select a number (1-{}): ", options.len()))?;
            let answer = self.read_line()?;
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
                Ok(_) => self.print("Invalid number. Please try again.\n")?,
                Err(_) => self.print("Invalid input. Please enter a number.\n")?,
            }
        }
    }

    fn choose_many(&mut self, prompt: &str, options: &[String]) -> Result<Vec<usize>> {
        if options.is_empty() {
            return Err(SubdlError::EmptyChoice(prompt.to_string()));
        }
        self.list(prompt, options)?;
        loop {
            self.print(&format!(
                "Select numbers or ranges (e.g. 1,3-5), or 'all' (1-{}): ",
                options.len()
            ))?;
            let answer = self.read_line()?.to_lowercase();
            if answer == "all" || answer == "a" {
                return Ok((0..options.len()).collect());
            }
            match parse_selection(&answer, options.len()) {
                Some(indices) => return Ok(indices),
                None => self.print("Invalid selection. Please try again.\n")?,
            }
        }
    }

    fn confirm(&mut self, prompt: &str, details: &[String]) -> Result<bool> {
        let mut text = String::from("\n");
        for line in details {
            text.push_str(&format!("  {line}\n"));
        }
        self.print(&text)?;
        loop {
            self.print(&format!("{prompt} (y/n): "))?;
            match self.read_line()?.to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.print("Invalid input. Please enter 'y' or 'n'.\n")?,
            }
        }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        self.print(&format!("{prompt} "))?;
        self.read_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_accepts_lists_and_ranges() {
        assert_eq!(parse_selection("1, 3-4", 5), Some(vec![0, 2, 3]));
        assert_eq!(parse_selection("2 2", 5), Some(vec![1, 1]));
        assert_eq!(parse_selection("0", 5), None);
        assert_eq!(parse_selection("4-2", 5), None);
        assert_eq!(parse_selection("6", 5), None);
        assert_eq!(parse_selection("", 5), None);
    }
}
