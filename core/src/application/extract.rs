use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{ApplicationRecord, Field};

pub const NO_MATCH_REPLY: &str =
    "I couldn't extract any info. Could you please provide your name, email, or skills?";
const ACK_TRAILER: &str = "Let me check what else I need.";

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:my name is|i am)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)")
        .expect("name pattern is valid")
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[\w.-]+@[\w.-]+\.\w+\b").expect("email pattern is valid")
});
static SKILLS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:skills are|i know|i can use)\s+(.+)").expect("skills pattern is valid")
});

/// A single self-contained extraction rule.
pub trait Matcher: Send + Sync {
    fn try_match(&self, text: &str) -> Option<(Field, String)>;
}

/// "my name is ..." / "i am ..." followed by one or more words.
///
/// Matching is case-insensitive, so every following word of two or more
/// letters is captured, not just capitalised ones. The capture is stored
/// title-cased.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameMatcher;

impl Matcher for NameMatcher {
    fn try_match(&self, text: &str) -> Option<(Field, String)> {
        let caps = NAME_RE.captures(text)?;
        Some((Field::Name, title_case(caps.get(1)?.as_str())))
    }
}

/// First email-shaped token, stored exactly as written.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmailMatcher;

impl Matcher for EmailMatcher {
    fn try_match(&self, text: &str) -> Option<(Field, String)> {
        EMAIL_RE
            .find(text)
            .map(|m| (Field::Email, m.as_str().to_string()))
    }
}

/// "skills are" / "i know" / "i can use" followed by the rest of the line.
///
/// The capture is greedy, so trailing punctuation or chatter ends up in the
/// stored value.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkillsMatcher;

impl Matcher for SkillsMatcher {
    fn try_match(&self, text: &str) -> Option<(Field, String)> {
        let caps = SKILLS_RE.captures(text)?;
        Some((Field::Skills, caps.get(1)?.as_str().trim().to_string()))
    }
}

/// Capitalises the first letter of every word and lower-cases the rest. A
/// word starts after any non-alphabetic character.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Fields found in one piece of text, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub matches: Vec<(Field, String)>,
}

impl Extraction {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        self.matches.iter().map(|(f, _)| *f).collect()
    }

    #[must_use]
    pub fn acknowledgment(&self) -> String {
        if self.is_empty() {
            return NO_MATCH_REPLY.to_string();
        }
        let mut parts: Vec<&str> = self
            .matches
            .iter()
            .map(|(field, _)| match field {
                Field::Name => "Name saved.",
                Field::Email => "Email saved.",
                Field::Skills => "Skills saved.",
            })
            .collect();
        parts.push(ACK_TRAILER);
        parts.join(" ")
    }
}

/// Runs a fixed, ordered list of [`Matcher`]s over free text.
///
/// Rules are independent searches, so a single message can fill several
/// fields at once.
pub struct InfoExtractor {
    rules: Vec<Box<dyn Matcher>>,
}

impl Default for InfoExtractor {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(NameMatcher),
                Box::new(EmailMatcher),
                Box::new(SkillsMatcher),
            ],
        }
    }
}

impl InfoExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule after the built-in ones.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Matcher + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Finds matches without touching any record.
    #[must_use]
    pub fn scan(&self, text: &str) -> Extraction {
        Extraction {
            matches: self.rules.iter().filter_map(|r| r.try_match(text)).collect(),
        }
    }

    /// Writes every match into `record` and returns the acknowledgment shown
    /// to the model. Fields without a match keep their previous value.
    pub fn extract(&self, text: &str, record: &mut ApplicationRecord) -> String {
        let extraction = self.scan(text);
        for (field, value) in &extraction.matches {
            record.set(*field, value.clone());
        }
        debug!(fields = ?extraction.fields(), "Extracted application info");
        extraction.acknowledgment()
    }
}
