//! Domain models for quoting-service.

mod document;
mod line;
mod status;

pub use document::{
    Actor, CreateDocument, Document, DocumentKind, DocumentNumber, UpdateDetails,
};
pub use line::{Line, LineInput, UpdateLine};
pub use status::DocumentStatus;
