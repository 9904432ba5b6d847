//! Context budgeting module
//!
//! Token estimation used to keep composed prompts inside their budget.

pub mod counter;

// Re-export commonly used types
pub use counter::TokenCounter;
