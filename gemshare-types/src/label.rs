//! Player labels.
//!
//! A label is the stable, human-facing identity of a player root (`P1`,
//! `P2`, ...). Labels are 1-based; slot index 0 maps to `P1`.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable player label, `P1` through `P255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label(u8);

impl Label {
    pub const P1: Label = Label(1);
    pub const P2: Label = Label(2);

    /// Creates a label from its 1-based player number.
    #[must_use]
    pub const fn new(number: u8) -> Option<Self> {
        if number == 0 { None } else { Some(Self(number)) }
    }

    /// Creates a label from a 0-based slot index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index + 1).ok().map(Self)
    }

    /// The 1-based player number.
    #[must_use]
    pub const fn number(&self) -> u8 {
        self.0
    }

    /// The 0-based slot index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize - 1
    }

    /// Iterates `P1..=Pn`.
    pub fn first_n(n: usize) -> impl Iterator<Item = Label> {
        (0..n.min(u8::MAX as usize)).filter_map(Label::from_index)
    }

    /// Finds the leftmost label mention in free text such as a HUD caption,
    /// an object name or a sprite name: `"P2"`, `"hud_p1"`, `"Player 2"`.
    #[must_use]
    pub fn extract(text: &str) -> Option<Self> {
        let upper = text.to_ascii_uppercase();
        let bytes = upper.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'P' {
                let rest = &upper[i + 1..];
                let digits_at = if rest.starts_with("LAYER") {
                    let after = &rest["LAYER".len()..];
                    let skipped = after.len() - after.trim_start_matches([' ', '_', '-']).len();
                    i + 1 + "LAYER".len() + skipped
                } else {
                    i + 1
                };
                if let Some(label) = parse_number(&upper[digits_at..]) {
                    return Some(label);
                }
            }
            i += 1;
        }
        None
    }
}

fn parse_number(s: &str) -> Option<Label> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    s[..end].parse::<u8>().ok().and_then(Label::new)
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let rest = upper
            .strip_prefix("PLAYER")
            .or_else(|| upper.strip_prefix('P'))
            .ok_or_else(|| Error::InvalidLabel(s.to_string()))?;
        let digits = rest.trim_start_matches([' ', '_', '-']);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidLabel(s.to_string()));
        }
        digits
            .parse::<u8>()
            .ok()
            .and_then(Label::new)
            .ok_or_else(|| Error::InvalidLabel(s.to_string()))
    }
}

impl TryFrom<String> for Label {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}

/// Log rendering of an optional label: `[P1]`, or `[P?]` when unbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LabelTag(pub Option<Label>);

impl LabelTag {
    pub const UNKNOWN: LabelTag = LabelTag(None);

    #[must_use]
    pub fn label(&self) -> Option<Label> {
        self.0
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        self.0.is_some()
    }
}

impl From<Label> for LabelTag {
    fn from(label: Label) -> Self {
        Self(Some(label))
    }
}

impl From<Option<Label>> for LabelTag {
    fn from(label: Option<Label>) -> Self {
        Self(label)
    }
}

impl fmt::Display for LabelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(label) => write!(f, "[{label}]"),
            None => f.write_str("[P?]"),
        }
    }
}
