//! Line-based terminal input for the menu and the update prompt.

use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

use crate::cli::common::describe_offer;
use crate::upgrade::{Decision, DecisionProvider, UpdateOffer};

/// Reads answers line by line from any async reader (stdin in the binary).
pub struct Console<R> {
    reader: R,
}

impl Console<BufReader<Stdin>> {
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> Console<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Print `prompt` and read one trimmed line. `None` at end of input.
    pub async fn ask(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

/// Shows the offer and asks `Install this update? [y/N]`.
///
/// Anything but `y`/`yes` declines, and so do end of input, a read error and
/// Ctrl-C.
pub struct ConsoleDecision<'a, R> {
    console: &'a mut Console<R>,
}

impl<'a, R: AsyncBufRead + Unpin + Send> ConsoleDecision<'a, R> {
    pub fn new(console: &'a mut Console<R>) -> Self {
        Self { console }
    }
}

impl<R: AsyncBufRead + Unpin + Send> DecisionProvider for ConsoleDecision<'_, R> {
    async fn decide(&mut self, offer: &UpdateOffer) -> Decision {
        println!("{}", describe_offer(offer));

        let answer = tokio::select! {
            answer = self.console.ask("Install this update? [y/N] ") => answer,
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Decision::Decline;
            }
        };

        match answer {
            Ok(Some(answer)) if is_yes(&answer) => Decision::Accept,
            _ => Decision::Decline,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;

    fn offer() -> UpdateOffer {
        UpdateOffer {
            current: Version::new(1, 0, 0),
            latest: Version::new(1, 1, 0),
            release_name: None,
            published_at: None,
            changelog: None,
            asset_name: "app.exe".to_string(),
            asset_size: 1,
        }
    }

    async fn decide(input: &'static [u8]) -> Decision {
        let mut console = Console::new(input);
        ConsoleDecision::new(&mut console).decide(&offer()).await
    }

    #[tokio::test]
    async fn test_yes_accepts() {
        assert_eq!(decide(b"y\n").await, Decision::Accept);
        assert_eq!(decide(b"  YES \n").await, Decision::Accept);
    }

    #[tokio::test]
    async fn test_anything_else_declines() {
        assert_eq!(decide(b"\n").await, Decision::Decline);
        assert_eq!(decide(b"nope\n").await, Decision::Decline);
        assert_eq!(decide(b"").await, Decision::Decline);
    }

    #[tokio::test]
    async fn test_ask_reads_lines_in_order() {
        let mut console = Console::new(&b"1\n3\n"[..]);
        assert_eq!(console.ask("> ").await.unwrap().as_deref(), Some("1"));
        assert_eq!(console.ask("> ").await.unwrap().as_deref(), Some("3"));
        assert_eq!(console.ask("> ").await.unwrap(), None);
    }
}
