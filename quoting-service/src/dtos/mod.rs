pub mod documents;

pub use documents::{
    ChangeStatusRequest, DocumentResponse, LineResponse, ReorderLinesRequest, UpdateNotesRequest,
};
