use std::io::{BufRead, Write};

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    application::{ApplicationRecord, COMPLETION_MARKER},
    completion::{AgentReply, Client, CompletionError, CompletionModel},
    error::Error,
};

pub const GREETING: &str =
    "Hi! I'm your job application assistant. Please tell me your name, email, and skills.";
pub const PROMPT: &str = "You: ";
pub const BOT_PREFIX: &str = "Bot: ";
pub const FAREWELL: &str = "Bye! Good luck.";
pub const COMPLETE: &str = "Application info complete!";
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't reach the assistant just now. Please try again.";

const EXIT_KEYWORDS: [&str; 2] = ["exit", "quit"];

/// Why [`Session::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The assistant reported that everything was collected.
    Completed,
    /// The user typed an exit keyword.
    Exited,
    /// Input closed before either of the above.
    EndOfInput,
}

#[must_use]
pub fn is_exit_keyword(input: &str) -> bool {
    EXIT_KEYWORDS
        .iter()
        .any(|k| input.trim().eq_ignore_ascii_case(k))
}

#[must_use]
pub fn signals_completion(reply: &str) -> bool {
    reply.to_lowercase().contains(COMPLETION_MARKER)
}

/// One applicant's conversation: its own record, its own transcript.
pub struct Session<M: CompletionModel> {
    id: Uuid,
    client: Client<M>,
    record: ApplicationRecord,
}

impl<M: CompletionModel> Session<M> {
    pub fn new(client: Client<M>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            record: ApplicationRecord::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn record(&self) -> &ApplicationRecord {
        &self.record
    }

    #[must_use]
    pub fn client(&self) -> &Client<M> {
        &self.client
    }

    pub async fn turn(&mut self, input: &str) -> Result<AgentReply, CompletionError> {
        self.client.respond(input, &mut self.record).await
    }

    /// Line-oriented chat loop over `input`/`output`.
    ///
    /// Blank lines are skipped. Bytes that are not UTF-8 are replaced rather
    /// than ending the session. A failed model call is logged and answered
    /// with an apology; the loop keeps going.
    #[instrument(skip_all, fields(session = %self.id))]
    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
    ) -> Result<SessionOutcome, Error> {
        writeln!(output, "{GREETING}")?;
        let mut buf = Vec::new();
        loop {
            write!(output, "{PROMPT}")?;
            output.flush()?;

            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                writeln!(output)?;
                info!("Input closed");
                return Ok(SessionOutcome::EndOfInput);
            }
            let line = String::from_utf8_lossy(&buf);
            if std::str::from_utf8(&buf).is_err() {
                warn!("Input line was not valid UTF-8, decoding lossily");
            }
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if is_exit_keyword(text) {
                writeln!(output, "{FAREWELL}")?;
                info!("User left");
                return Ok(SessionOutcome::Exited);
            }

            match self.turn(text).await {
                Ok(reply) => {
                    writeln!(output, "{BOT_PREFIX}{}", reply.text)?;
                    if signals_completion(&reply.text) {
                        writeln!(output, "{COMPLETE}")?;
                        info!(record = ?self.record, "Application complete");
                        return Ok(SessionOutcome::Completed);
                    }
                }
                Err(e) => {
                    error!(error = %e, "Assistant call failed");
                    writeln!(output, "{BOT_PREFIX}{FALLBACK_REPLY}")?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::tests::{text, tool_call, ScriptedModel};
    use crate::completion::{Message, DEFAULT_PREAMBLE};
    use crate::tools::ToolSet;

    fn session(replies: Vec<Result<Message, CompletionError>>) -> Session<ScriptedModel> {
        Session::new(Client::new(
            ScriptedModel::new(replies),
            DEFAULT_PREAMBLE,
            0.0,
            256,
            ToolSet::application(),
        ))
    }

    async fn run(
        session: &mut Session<ScriptedModel>,
        input: &str,
    ) -> (SessionOutcome, String) {
        run_bytes(session, input.as_bytes()).await
    }

    async fn run_bytes(
        session: &mut Session<ScriptedModel>,
        input: &[u8],
    ) -> (SessionOutcome, String) {
        let mut out = Vec::new();
        let outcome = session.run(input, &mut out).await.unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn exit_keywords_ignore_case_and_padding() {
        assert!(is_exit_keyword("exit"));
        assert!(is_exit_keyword(" QUIT "));
        assert!(!is_exit_keyword("exit please"));
    }

    #[test]
    fn completion_marker_is_case_insensitive() {
        assert!(signals_completion("YOU'RE READY! Name: A"));
        assert!(!signals_completion("Still need: email."));
    }

    #[tokio::test]
    async fn exit_ends_without_calling_the_model() {
        let mut session = session(vec![]);
        let (outcome, out) = run(&mut session, "Exit\n").await;
        assert_eq!(outcome, SessionOutcome::Exited);
        assert!(out.starts_with(GREETING));
        assert!(out.ends_with("You: Bye! Good luck.\n"));
        assert_eq!(session.client().export_history().len(), 1);
    }

    #[tokio::test]
    async fn full_conversation_completes() {
        let mut session = session(vec![
            Ok(tool_call(
                "c1",
                "extract_application_info",
                r#"{"text":"My name is Alice Wong"}"#,
            )),
            Ok(text("Nice to meet you, Alice Wong. What's your email?")),
            Ok(tool_call(
                "c2",
                "extract_application_info",
                r#"{"text":"alice@example.com"}"#,
            )),
            Ok(text("Got it. What are your skills?")),
            Ok(tool_call(
                "c3",
                "extract_application_info",
                r#"{"text":"I can use Rust and networking"}"#,
            )),
            Ok(tool_call("c4", "check_application_goal", r#"{"input":""}"#)),
        ]);
        let (outcome, out) = run(
            &mut session,
            "My name is Alice Wong\n\nalice@example.com\nI can use Rust and networking\nnever read\n",
        )
        .await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert!(out.contains(
            "Bot: You're ready! Name: Alice Wong, Email: alice@example.com, Skills: Rust and networking.\n"
        ));
        assert!(out.ends_with("Application info complete!\n"));
        assert_eq!(
            session.record(),
            &ApplicationRecord {
                name: Some("Alice Wong".to_string()),
                email: Some("alice@example.com".to_string()),
                skills: Some("Rust and networking".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn model_failure_is_apologised_for() {
        let mut session = session(vec![
            Err(CompletionError::RequestError("connection reset".to_string())),
            Ok(text("Hello again!")),
        ]);
        let (outcome, out) = run(&mut session, "hi\nhi again\n").await;
        assert_eq!(outcome, SessionOutcome::EndOfInput);
        assert!(out.contains(&format!("Bot: {FALLBACK_REPLY}\n")));
        assert!(out.contains("Bot: Hello again!\n"));
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_end_the_session() {
        let mut session = session(vec![Ok(text("Could you say that again?"))]);
        let (outcome, out) = run_bytes(&mut session, b"\xff\xfe hi\nexit\n").await;
        assert_eq!(outcome, SessionOutcome::Exited);
        assert!(out.contains("Bot: Could you say that again?\n"));
        assert!(out.ends_with("You: Bye! Good luck.\n"));
        assert_eq!(
            session.client().export_history()[1],
            Message::User("\u{fffd}\u{fffd} hi".to_string())
        );
    }

    #[tokio::test]
    async fn sessions_do_not_share_records() {
        let mut first = session(vec![Ok(tool_call(
            "c1",
            "extract_application_info",
            r#"{"text":"my name is Ann Lee"}"#,
        ))]);
        let second = session(vec![]);
        first.turn("my name is Ann Lee").await.unwrap();
        assert_eq!(first.record().name.as_deref(), Some("Ann Lee"));
        assert_eq!(second.record(), &ApplicationRecord::new());
        assert_ne!(first.id(), second.id());
    }
}
