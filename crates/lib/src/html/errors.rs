//! Error types for the HTML tokenizer.

use thiserror::Error;

/// Structured error types for tokenizing markup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HtmlError {
    /// The tokenizer could not make progress: a `<` opens neither a start tag
    /// nor an end tag
    #[error("Parse error at byte {offset}: {}", excerpt(remaining))]
    Malformed { offset: usize, remaining: String },
}

impl HtmlError {
    /// Byte offset of the failure in the comment-stripped input.
    pub fn offset(&self) -> usize {
        match self {
            HtmlError::Malformed { offset, .. } => *offset,
        }
    }

    /// The unconsumed input at the point of failure.
    pub fn remaining(&self) -> &str {
        match self {
            HtmlError::Malformed { remaining, .. } => remaining,
        }
    }
}

fn excerpt(remaining: &str) -> String {
    const MAX: usize = 40;
    match remaining.char_indices().nth(MAX) {
        Some((end, _)) => format!("{}...", &remaining[..end]),
        None => remaining.to_string(),
    }
}

// Conversion from HtmlError to the main Error type
impl From<HtmlError> for crate::Error {
    fn from(err: HtmlError) -> Self {
        crate::Error::Html(err)
    }
}
