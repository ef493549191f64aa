pub mod documents;
pub mod health;
pub mod lines;

pub use documents::{
    add_line, change_status, convert_to_invoice, create_document, delete_document, duplicate,
    get_document, new_version, reorder_lines, tax_breakdown, update_details, update_notes,
};
pub use health::{health_check, metrics_handler, readiness_check};
pub use lines::{remove_line, update_line};
