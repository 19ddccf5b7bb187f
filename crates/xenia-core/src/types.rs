use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{XeniaError, XeniaResult};

pub const WATERMARK_CLASS: &str = "watermark";
pub const BADGE_CLASS: &str = "powered-by-xenia";
pub const BADGE_TEXT: &str = "Powered by DMI";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// A single CSS class token. Matching is whitespace-token equality against
/// a `class` attribute value, never substring matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassSelector(String);

impl ClassSelector {
    /// Accepts `watermark` or `.watermark`. Rejects empty tokens, embedded
    /// whitespace, quotes, and compound selectors.
    pub fn parse(input: &str) -> XeniaResult<Self> {
        let trimmed = input.trim();
        let token = trimmed.strip_prefix('.').unwrap_or(trimmed);
        if token.is_empty() {
            return Err(XeniaError::Selector("empty class selector".to_string()));
        }
        if token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '.' | '#' | '"' | '\'' | '>' | '<'))
        {
            return Err(XeniaError::Selector(format!(
                "invalid class token: {token}"
            )));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Token match against a raw `class` attribute value.
    pub fn matches_attr(&self, class_attr: &str) -> bool {
        class_attr.split_whitespace().any(|token| token == self.0)
    }

    pub fn watermark() -> Self {
        Self(WATERMARK_CLASS.to_string())
    }

    pub fn badge() -> Self {
        Self(BADGE_CLASS.to_string())
    }
}

impl std::fmt::Display for ClassSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ".{}", self.0)
    }
}

impl std::str::FromStr for ClassSelector {
    type Err = XeniaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The markup installed into the watermark container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub tag: String,
    pub class: String,
    pub text: String,
}

impl Fragment {
    pub fn new(
        tag: impl Into<String>,
        class: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            class: class.into(),
            text: text.into(),
        }
    }

    /// The stock badge: `<span class="powered-by-xenia">Powered by DMI</span>`.
    pub fn badge() -> Self {
        Self::new("span", BADGE_CLASS, BADGE_TEXT)
    }

    pub fn render(&self) -> String {
        format!(
            "<{tag} class=\"{class}\">{text}</{tag}>",
            tag = self.tag,
            class = self.class,
            text = self.text
        )
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Self::badge()
    }
}

/// Observable state of a poll task. `Waiting` is initial; the other three
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjectorPhase {
    Waiting,
    Done,
    GaveUp,
    Cancelled,
}

impl InjectorPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InjectorPhase::Waiting)
    }
}

/// Result of a single poll tick. `TargetMissing` is the normal "not ready
/// yet" condition, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    TargetMissing,
    AlreadyMarked,
    Injected,
}

/// Record of a finished poll task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionReport {
    pub id: String,
    pub target: ClassSelector,
    pub marker: ClassSelector,
    pub phase: InjectorPhase,
    pub attempts: u64,
    pub injected: bool,
    pub finished_at: DateTime<Utc>,
}

impl InjectionReport {
    pub fn new(
        id: impl Into<String>,
        target: ClassSelector,
        marker: ClassSelector,
        phase: InjectorPhase,
        attempts: u64,
        injected: bool,
    ) -> Self {
        Self {
            id: id.into(),
            target,
            marker,
            phase,
            attempts,
            injected,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_accepts_leading_dot() {
        let sel = ClassSelector::parse(".watermark").unwrap();
        assert_eq!(sel.as_str(), "watermark");
        assert_eq!(sel, ClassSelector::parse("watermark").unwrap());
    }

    #[test]
    fn selector_rejects_bad_tokens() {
        assert!(ClassSelector::parse("").is_err());
        assert!(ClassSelector::parse("   ").is_err());
        assert!(ClassSelector::parse("two words").is_err());
        assert!(ClassSelector::parse(".a.b").is_err());
        assert!(ClassSelector::parse("#id").is_err());
    }

    #[test]
    fn selector_matches_tokens_not_substrings() {
        let sel = ClassSelector::watermark();
        assert!(sel.matches_attr("watermark"));
        assert!(sel.matches_attr("card watermark footer"));
        assert!(sel.matches_attr("  watermark  "));
        assert!(!sel.matches_attr("watermarks"));
        assert!(!sel.matches_attr("no-watermark-here"));
        assert!(!sel.matches_attr(""));
    }

    #[test]
    fn badge_fragment_renders() {
        assert_eq!(
            Fragment::badge().render(),
            "<span class=\"powered-by-xenia\">Powered by DMI</span>"
        );
    }

    #[test]
    fn waiting_is_the_only_non_terminal_phase() {
        assert!(!InjectorPhase::Waiting.is_terminal());
        assert!(InjectorPhase::Done.is_terminal());
        assert!(InjectorPhase::GaveUp.is_terminal());
        assert!(InjectorPhase::Cancelled.is_terminal());
    }
}
