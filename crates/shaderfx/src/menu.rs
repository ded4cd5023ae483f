use std::io::{BufRead, Write};

use anyhow::{Context, Result};

/// Numbered console prompts over any reader/writer pair.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Lists `options` as `1..=n` and returns the chosen index.
    ///
    /// `q` or end of input returns `None`; anything else unparsable re-asks.
    pub fn choose(&mut self, title: &str, options: &[String]) -> Result<Option<usize>> {
        writeln!(self.output, "{title}:")?;
        for (index, option) in options.iter().enumerate() {
            writeln!(self.output, "  {:>2}) {option}", index + 1)?;
        }

        loop {
            write!(self.output, "Choose 1-{} (q to quit): ", options.len())?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                return Ok(None);
            };
            if line.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            match line.parse::<usize>() {
                Ok(choice) if (1..=options.len()).contains(&choice) => return Ok(Some(choice - 1)),
                _ => writeln!(
                    self.output,
                    "Please enter a number between 1 and {}.",
                    options.len()
                )?,
            }
        }
    }

    /// Yes/no question defaulting to yes; end of input counts as no.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            write!(self.output, "{question} [Y/n] ")?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                return Ok(false);
            };
            match line.to_ascii_lowercase().as_str() {
                "" | "y" | "yes" => return Ok(true),
                "n" | "no" | "q" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read from standard input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn options() -> Vec<String> {
        vec!["cat.png".into(), "dog.png".into()]
    }

    #[test]
    fn reprompts_until_a_valid_choice() {
        let mut prompt = Prompt::new(Cursor::new("zero\n3\n2\n"), Vec::new());
        assert_eq!(prompt.choose("Images", &options()).unwrap(), Some(1));

        let printed = String::from_utf8(prompt.output().clone()).unwrap();
        assert!(printed.contains("   1) cat.png"));
        assert_eq!(printed.matches("between 1 and 2").count(), 2);
    }

    #[test]
    fn quit_and_eof_return_none() {
        let mut prompt = Prompt::new(Cursor::new("Q\n"), Vec::new());
        assert_eq!(prompt.choose("Images", &options()).unwrap(), None);

        let mut prompt = Prompt::new(Cursor::new(""), Vec::new());
        assert_eq!(prompt.choose("Images", &options()).unwrap(), None);
    }

    #[test]
    fn confirm_defaults_to_yes() {
        let mut prompt = Prompt::new(Cursor::new("\nmaybe\nn\n"), Vec::new());
        assert!(prompt.confirm("Again?").unwrap());
        assert!(!prompt.confirm("Again?").unwrap());
        assert!(!prompt.confirm("Again?").unwrap());
    }
}
