use serde::{Deserialize, Serialize};
use std::fmt;

/// One timeline entry as returned by the timeline source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub text: String,
}

impl Item {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// An item that matched the promotional marker, plus its public URL.
/// Serialized as the plain-text body of the notification email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromoCandidate {
    pub id: String,
    pub text: String,
    pub url: String,
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing newer than `since`. An absent cursor is rendered as `none`.
    NoNewItems { since: Option<String> },
    NoPromo { count: usize },
    PromoSent { candidate: PromoCandidate },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::NoNewItems { since } => {
                write!(f, "no new tweet since: {}", since.as_deref().unwrap_or("none"))
            }
            Outcome::NoPromo { count } => write!(f, "Found {} new tweet but no promo", count),
            Outcome::PromoSent { .. } => f.write_str("Found a tweet with promotion and sent email"),
        }
    }
}
