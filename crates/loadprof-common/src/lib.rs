//! # loadprof common
//!
//! Types shared by every loadprof crate: the process error taxonomy and the
//! `CommandLine` type used to describe child processes without going through
//! a shell.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{ProcessError, ProcessResult};
pub use types::CommandLine;
