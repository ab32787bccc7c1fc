//! Request handler module
//!
//! Maps requests onto the served directory: path resolution, directory
//! listings and the static file state machine.

pub mod listing;
pub mod resolve;
pub mod static_files;

// Re-export main entry point
pub use static_files::StaticHandler;
