//! # BIO labels for sequence labeling
//!
//! Parses tag strings such as `B-LOC`, `I-PER` and `O`, and groups tagged
//! tokens into entity spans.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single BIO tag with its entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BioTag {
    /// First token of an entity (`B-` or `S-`).
    Begin(String),
    /// Continuation of an entity (`I-`, `M-` or `E-`).
    Inside(String),
    /// Token outside any entity.
    Outside,
}

impl BioTag {
    /// Parse a tag string. Unknown shapes are treated as `Outside`.
    pub fn parse(tag: &str) -> Self {
        match tag.split_once('-') {
            Some(("B" | "S", kind)) if !kind.is_empty() => BioTag::Begin(kind.to_string()),
            Some(("I" | "M" | "E", kind)) if !kind.is_empty() => BioTag::Inside(kind.to_string()),
            _ => BioTag::Outside,
        }
    }

    /// Get the entity type for this tag.
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            BioTag::Begin(kind) | BioTag::Inside(kind) => Some(kind),
            BioTag::Outside => None,
        }
    }

    /// Check if this is a "Begin" tag.
    pub fn is_begin(&self) -> bool {
        matches!(self, BioTag::Begin(_))
    }

    /// Check if this is an "Inside" tag.
    pub fn is_inside(&self) -> bool {
        matches!(self, BioTag::Inside(_))
    }

    /// Check if transitioning from `from` tag to `to` tag is valid.
    ///
    /// An inside tag must follow a begin or inside tag of the same type.
    pub fn is_valid_transition(from: &BioTag, to: &BioTag) -> bool {
        match to {
            BioTag::Inside(kind) => from.entity_type() == Some(kind.as_str()),
            _ => true,
        }
    }
}

impl fmt::Display for BioTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BioTag::Begin(kind) => write!(f, "B-{kind}"),
            BioTag::Inside(kind) => write!(f, "I-{kind}"),
            BioTag::Outside => write!(f, "O"),
        }
    }
}

/// An entity located by token indices; `end` is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub entity: String,
}

/// Tokens paired with their entity spans, the input of doccano conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticRecord {
    pub text_raw: Vec<String>,
    pub labels: Vec<EntitySpan>,
}

impl SemanticRecord {
    /// Build a record from a token sequence and its BIO tags.
    pub fn from_tags<S: AsRef<str>>(tokens: &[String], tags: &[S]) -> Self {
        Self {
            text_raw: tokens.to_vec(),
            labels: extract_entities(tags),
        }
    }
}

/// Group a tag sequence into entity spans.
///
/// An inside tag that does not continue the running entity opens a new one,
/// so malformed sequences still yield every tagged token.
pub fn extract_entities<S: AsRef<str>>(tags: &[S]) -> Vec<EntitySpan> {
    let mut entities = Vec::new();
    let mut current: Option<EntitySpan> = None;
    let mut prev = BioTag::Outside;

    for (i, raw) in tags.iter().enumerate() {
        let tag = BioTag::parse(raw.as_ref());

        let continues = tag.is_inside() && BioTag::is_valid_transition(&prev, &tag);
        if continues {
            if let Some(span) = current.as_mut() {
                span.end = i;
            }
        } else {
            entities.extend(current.take());
            if let Some(kind) = tag.entity_type() {
                current = Some(EntitySpan {
                    start: i,
                    end: i,
                    entity: kind.to_string(),
                });
            }
        }

        prev = tag;
    }

    entities.extend(current);
    entities
}
