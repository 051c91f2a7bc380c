//! Free-text clinical notes attached to a claim

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Clinical,
    Administrative,
}

impl NoteKind {
    /// Lowercase tag
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Clinical => "clinical",
            NoteKind::Administrative => "administrative",
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clinical" => Ok(NoteKind::Clinical),
            "administrative" | "admin" => Ok(NoteKind::Administrative),
            other => Err(format!(
                "Invalid note kind '{other}'. Must be one of: clinical, administrative"
            )),
        }
    }
}

/// A free-text note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalNote {
    /// Note text
    pub text: String,

    /// Note kind
    pub kind: NoteKind,

    /// When the note was written
    pub authored_at: Option<DateTime<Utc>>,
}

impl ClinicalNote {
    /// Creates a note, rejecting blank text
    pub fn new(
        text: impl Into<String>,
        kind: NoteKind,
        authored_at: Option<DateTime<Utc>>,
    ) -> Result<Self, String> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err("Note text cannot be empty".to_string());
        }
        Ok(Self {
            text,
            kind,
            authored_at,
        })
    }
}
