//! Question answering over medication data sheets and leaflets.
//!
//! Two backends:
//! - ChatPDF: upload the downloaded PDFs and ask the hosted service.
//! - Local retrieval: chunk the PDF text, rank chunks lexically and ask a
//!   generative model with a prompt that confines it to those chunks.

pub mod chatpdf;
pub mod chunking;
pub mod gemini;
pub mod pdf;
pub mod prompts;
pub mod rag;
pub mod retrieval;

pub use chatpdf::ChatPdfClient;
pub use chunking::{Chunk, TextChunker};
pub use gemini::{ChatModel, GeminiClient};
pub use prompts::UNKNOWN_ANSWER;
pub use rag::{Answer, DocumentAssistant};
pub use retrieval::LexicalIndex;

use thiserror::Error;

/// Question-answering errors.
#[derive(Error, Debug)]
pub enum QaError {
    #[error("Question is empty")]
    EmptyQuestion,

    #[error("No documents available to answer from")]
    NoSources,

    #[error("Document has no extractable text: {0}")]
    EmptyDocument(String),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid service response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl QaError {
    /// True when the caller sent bad input rather than a backend failing.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::EmptyQuestion)
    }
}

pub type QaResult<T> = Result<T, QaError>;
