//!
//! livemodel: a path-addressed, reactive document store for live views.
//! This library provides the data layer behind a reactive UI: an in-memory
//! document addressed by dotted paths, which tells a view adapter exactly what
//! changed.
//!
//! ## Core Concepts
//!
//! * **Model (`model::Model`)**: Owns one document tree and exposes `init`, `get`, `set` and `push` over dotted paths such as `"info.users.1.name"`.
//! * **Paths (`model::PathBuf`)**: Parsed dotted paths made of key and index segments. The empty path is the document root.
//! * **References (`model::Reference`)**: Live aliases embedded in the document. A keyed reference re-reads its key on every access, so `user` can follow `userIndex`.
//! * **Functions (`model::FunctionRegistry`)**: Named computed values that are re-evaluated from their argument paths on every read.
//! * **Events (`model::EventDispatcher`)**: Path bindings that drive a view `Adapter`. A binding is unbound once the adapter reports its target gone.
//! * **HTML (`html`)**: A small streaming tokenizer that turns template markup into start, end and text events.

pub mod html;
pub mod model;

/// Re-export the `Model` struct for easier access.
pub use model::Model;

/// Result type used throughout the livemodel library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the livemodel library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structured model errors from the model module
    #[error(transparent)]
    Model(model::ModelError),

    /// Structured tokenizer errors from the html module
    #[error(transparent)]
    Html(html::HtmlError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Model(_) => "model",
            Error::Html(_) => "html",
        }
    }

    /// Check if this error is a reference or function cycle.
    pub fn is_cycle_error(&self) -> bool {
        match self {
            Error::Model(model_err) => model_err.is_cycle_error(),
            _ => false,
        }
    }

    /// Check if this error comes from walking a path into the wrong kind of node.
    pub fn is_path_error(&self) -> bool {
        match self {
            Error::Model(model_err) => model_err.is_path_error(),
            _ => false,
        }
    }

    /// Check if this error is type-related.
    pub fn is_type_error(&self) -> bool {
        match self {
            Error::Model(model_err) => model_err.is_type_error(),
            _ => false,
        }
    }

    /// Check if this error is function-related.
    pub fn is_function_error(&self) -> bool {
        match self {
            Error::Model(model_err) => model_err.is_function_error(),
            _ => false,
        }
    }

    /// Check if this error is a tokenizer failure.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::Html(_))
    }
}
