//! Services module for quoting-service.

pub mod database;
pub mod document_service;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use document_service::DocumentService;
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use store::{DocumentStore, StoreError, WriteBatch, WriteOp};
