// WHY: Row-shaped units of text and their cleaned counterparts
// Field 0 is the identifier, field 1 the text, trailing fields travel through unchanged

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trailing columns kept verbatim (page number, day, month, year)
pub const MAX_PASSTHROUGH_FIELDS: usize = 4;

/// One delimited input line before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source file
    pub line: usize,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(line: usize, fields: Vec<String>) -> Self {
        Self { line, fields }
    }

    /// Split a line on `delimiter`
    pub fn parse(line: usize, text: &str, delimiter: char) -> Self {
        let fields = text.split(delimiter).map(str::to_owned).collect();
        Self { line, fields }
    }
}

/// An independent piece of text plus the fields that travel with it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub line: usize,
    pub id: String,
    pub text: String,
    pub passthrough: Vec<String>,
}

impl Unit {
    pub fn new(line: usize, id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            line,
            id: id.into(),
            text: text.into(),
            passthrough: Vec::new(),
        }
    }
}

impl TryFrom<RawRow> for Unit {
    type Error = UnitError;

    /// Field 0 is the identifier, field 1 the text, and up to the last
    /// [`MAX_PASSTHROUGH_FIELDS`] of the remaining fields are passthrough.
    fn try_from(row: RawRow) -> Result<Self, Self::Error> {
        let RawRow { line, fields } = row;
        if fields.len() < 2 {
            return Err(UnitError::Malformed {
                line,
                reason: format!("expected at least 2 fields, found {}", fields.len()),
            });
        }

        let mut fields = fields.into_iter();
        let id = fields.next().unwrap_or_default();
        let text = fields.next().unwrap_or_default();
        let rest: Vec<String> = fields.collect();
        let skip = rest.len().saturating_sub(MAX_PASSTHROUGH_FIELDS);
        let passthrough = rest.into_iter().skip(skip).collect();

        Ok(Self { line, id, text, passthrough })
    }
}

/// Cleaned text for one unit, ready for the writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedUnit {
    pub line: usize,
    pub id: String,
    pub text: String,
    pub passthrough: Vec<String>,
    /// Tokens produced by normalization
    pub tokens: usize,
    /// Report entries produced for this unit
    pub unknown_words: usize,
}

impl CleanedUnit {
    /// Fields in the unit's original row shape
    pub fn to_fields(&self) -> Vec<&str> {
        let mut fields = Vec::with_capacity(2 + self.passthrough.len());
        fields.push(self.id.as_str());
        fields.push(self.text.as_str());
        fields.extend(self.passthrough.iter().map(String::as_str));
        fields
    }
}

/// Failure confined to a single unit
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnitError {
    #[error("Malformed row at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// `index` is the position in the batch; `line` is filled in once the
    /// unit's source row is known
    #[error("Worker failed on unit {index}{}: {reason}", line_note(.line))]
    Worker {
        index: usize,
        line: Option<usize>,
        reason: String,
    },
}

fn line_note(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" (line {line})"),
        None => String::new(),
    }
}

/// Per-unit result slot in a batch
pub type UnitOutcome = Result<CleanedUnit, UnitError>;
