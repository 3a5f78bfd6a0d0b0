//! myl compiler - Common Types and Utilities
//! 
//! This crate contains shared types, error definitions, and utilities
//! used across all components of the myl compiler.

pub mod error;
pub mod types;
pub mod source_loc;

pub use error::{CompileError, CompileResult};
pub use types::*;
pub use source_loc::SourceLocation;
