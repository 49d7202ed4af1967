//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod ai;
pub mod audit;
pub mod chat;
pub mod expenses;
pub mod reports;

// Re-export all handlers for use in router
pub use ai::*;
pub use audit::*;
pub use chat::*;
pub use expenses::*;
pub use reports::*;
