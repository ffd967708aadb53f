pub mod gemini;
pub mod parser;
pub mod prompt;
pub mod types;

pub use gemini::*;
pub use parser::*;
pub use prompt::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("Narrative provider returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Narrative provider unreachable: {0}")]
    Transport(String),

    #[error("Malformed narrative response: {0}")]
    MalformedResponse(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
