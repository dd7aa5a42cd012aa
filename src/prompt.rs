//! Interactive prompts.
//!
//! All questions are read line by line from the controlling terminal, never from piped stdin,
//! so identifiers can be piped in while the user still answers questions. Prompts and narration
//! go to stderr.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use crate::signal::Signal;

/// Token that selects the "nil option" of a choice.
pub const ESCAPE_TOKEN: &str = "q";
/// Maximum number of matches a search offers.
pub const SEARCH_LIMIT: usize = 10;

const TERMINAL_DEVICE: &str = "/dev/tty";

/// Anything that can be offered in a choice or search.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for String {
    fn name(&self) -> &str {
        self
    }
}

pub struct Prompt {
    input: Option<Box<dyn BufRead>>,
    output: Box<dyn Write>,
}

impl Prompt {
    /// Prompt on the controlling terminal. The device is opened on first use.
    pub fn terminal() -> Self {
        Self {
            input: None,
            output: Box::new(io::stderr()),
        }
    }

    /// Prompt answered from a fixed script.
    #[cfg(test)]
    pub fn scripted(input: impl Into<String>, output: Box<dyn Write>) -> Self {
        Self {
            input: Some(Box::new(io::Cursor::new(input.into().into_bytes()))),
            output,
        }
    }

    /// Write a narration line to the prompt output.
    pub fn say(&mut self, msg: impl AsRef<str>) {
        let _ = writeln!(self.output, "{}", msg.as_ref());
    }

    pub fn text(&mut self, question: &str) -> Result<String, Signal> {
        let _ = write!(self.output, "{question}: ");
        let _ = self.output.flush();
        self.read_line()
    }

    pub fn boolean(&mut self, question: &str) -> Result<bool, Signal> {
        loop {
            let answer = self.text(&format!("{question} (y / n)"))?;
            match answer.to_ascii_lowercase().as_str() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => self.say("Invalid choice"),
            }
        }
    }

    /// Numbered choice. With `nil_option` set, the escape token returns `None`.
    pub fn choice<'o, T: Named>(
        &mut self,
        question: &str,
        options: &'o [T],
        nil_option: Option<&str>,
    ) -> Result<Option<&'o T>, Signal> {
        if options.is_empty() {
            return match nil_option {
                Some(_) => Ok(None),
                None => Err(Signal::abort("No available options")),
            };
        }

        self.say(format!("{question}:"));
        for (i, option) in options.iter().enumerate() {
            self.say(format!("({}) {}", i + 1, option.name()));
        }
        if let Some(label) = nil_option {
            self.say(format!("({ESCAPE_TOKEN}) {label}"));
        }

        let range = match nil_option {
            Some(_) => format!("1-{}, {ESCAPE_TOKEN}", options.len()),
            None => format!("1-{}", options.len()),
        };

        loop {
            let answer = self.text(&format!("Enter number ({range})"))?;
            if nil_option.is_some() && answer.eq_ignore_ascii_case(ESCAPE_TOKEN) {
                return Ok(None);
            }
            if let Ok(idx) = answer.parse::<usize>()
                && (1..=options.len()).contains(&idx)
            {
                let selected = &options[idx - 1];
                self.say(format!("Selected: ({idx}) {}", selected.name()));
                return Ok(Some(selected));
            }
            self.say("Invalid selection");
        }
    }

    /// Free text filter over option names, then a choice among the first matches.
    pub fn search<'o, T: Named>(
        &mut self,
        question: &str,
        options: &'o [T],
    ) -> Result<Option<&'o T>, Signal> {
        if options.is_empty() {
            return Ok(None);
        }

        self.say(question);
        loop {
            let query = simplify(&self.text("Enter search")?);
            let matches: Vec<&'o T> = options
                .iter()
                .filter(|o| simplify(o.name()).contains(&query))
                .take(SEARCH_LIMIT)
                .collect();

            if matches.is_empty() {
                self.say("No matches");
                continue;
            }

            let picked = self.choice("Select a match", &matches, Some("back to search"))?;
            if let Some(option) = picked {
                return Ok(Some(*option));
            }
        }
    }

    fn read_line(&mut self) -> Result<String, Signal> {
        if self.input.is_none() {
            let tty = File::open(TERMINAL_DEVICE).map_err(|e| {
                Signal::abort(format!("Unable to open {TERMINAL_DEVICE} for input: {e}"))
            })?;
            self.input = Some(Box::new(BufReader::new(tty)));
        }
        let Some(input) = self.input.as_mut() else {
            return Err(Signal::abort("No interactive input available"));
        };

        let mut line = String::new();
        let read = input.read_line(&mut line)?;
        if read == 0 {
            return Err(Signal::abort("Input closed while waiting for an answer"));
        }
        Ok(line.trim().to_string())
    }
}

impl<T: Named> Named for &T {
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Lowercase and drop everything that is not alphanumeric.
fn simplify(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
