//! Console loop that keeps taking questions after the first answer.

use anyhow::Result;
use std::future::Future;
use std::io::{BufRead, Write};

/// Answers one question, writing everything it has to say to `out`.
pub trait Ask {
    fn ask(&mut self, question: &str, out: &mut dyn Write) -> impl Future<Output = Result<()>>;
}

const CONTINUE_WORDS: &[&str] = &["はい", "続ける", "続行", "yes", "y"];
const STOP_WORDS: &[&str] = &["おわり", "終了", "exit", "quit", "no", "n"];
const EXIT_QUESTIONS: &[&str] = &["おわり", "終了", "exit", "quit"];

const FAREWELL: &str = "Bye-nya~! See you again!";

/// Answer to "any more questions?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Continue,
    Stop,
    Unrecognized,
}

impl Reply {
    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Reply {
        let word = input.trim().to_lowercase();
        if CONTINUE_WORDS.contains(&word.as_str()) {
            Reply::Continue
        } else if STOP_WORDS.contains(&word.as_str()) {
            Reply::Stop
        } else {
            Reply::Unrecognized
        }
    }
}

/// Whether a typed question is really a request to leave.
pub fn is_exit_question(input: &str) -> bool {
    let word = input.trim().to_lowercase();
    EXIT_QUESTIONS.contains(&word.as_str())
}

/// Drives follow-up questions over any pair of console streams.
pub struct Session<R, W> {
    input: R,
    output: W,
    interactive: bool,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(input: R, output: W, interactive: bool) -> Self {
        Session {
            input,
            output,
            interactive,
        }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs until the user stops or input ends. Returns how many follow-up
    /// questions were answered.
    pub async fn run<A: Ask>(&mut self, asker: &mut A) -> Result<usize> {
        if self.interactive {
            writeln!(self.output, "\n=== Professor Neko's interactive mode, nyan! ===")?;
            writeln!(self.output, "Ask away, or type 'おわり' / 'exit' to finish, nya\n")?;
        }

        let mut answered = 0;
        while self.wants_more()? {
            let Some(question) = self.read_question()? else {
                break;
            };

            tracing::debug!("Follow-up question #{}", answered + 1);
            asker.ask(&question, &mut self.output).await?;
            answered += 1;
        }

        Ok(answered)
    }

    /// Asks whether to continue until a recognised answer arrives.
    fn wants_more(&mut self) -> Result<bool> {
        loop {
            let Some(line) = self.prompt(
                "\nAny more questions? ('はい'/'yes' to continue, 'おわり'/'exit' to finish, nya) > ",
            )?
            else {
                writeln!(self.output, "\n{}", FAREWELL)?;
                return Ok(false);
            };

            match Reply::parse(&line) {
                Reply::Continue => return Ok(true),
                Reply::Stop => {
                    writeln!(self.output, "{}", FAREWELL)?;
                    return Ok(false);
                }
                Reply::Unrecognized => {
                    writeln!(self.output, "Please answer 'はい' or 'おわり', nya~")?;
                }
            }
        }
    }

    /// Reads a non-blank question. `None` means the user wants to leave.
    fn read_question(&mut self) -> Result<Option<String>> {
        loop {
            let Some(line) = self.prompt("\nWhat would you like to ask Professor Neko? > ")? else {
                writeln!(self.output, "\n{}", FAREWELL)?;
                return Ok(None);
            };

            if is_exit_question(&line) {
                writeln!(self.output, "{}", FAREWELL)?;
                return Ok(None);
            }

            let question = line.trim();
            if question.is_empty() {
                writeln!(self.output, "Please type a question, nya!")?;
                continue;
            }

            return Ok(Some(question.to_string()));
        }
    }

    /// Prints `text` and reads one line. `None` at end of input.
    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
