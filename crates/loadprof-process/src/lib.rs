//! # loadprof process
//!
//! Low-level process operations used by the harness:
//! - `ProcessHandle`: spawn, poll, wait, graceful stop and reap of a child
//! - Signal delivery (`terminate_gracefully`, `force_kill`)
//! - Process existence checks
//! - Blocking execution of pipeline stages
//!
//! Signal delivery is Unix-only; on other targets the handle falls back to
//! the runtime's kill primitive.

#[cfg(unix)]
pub mod check;
pub mod execute;
pub mod handle;
#[cfg(unix)]
pub mod terminate;

// Re-export main types
#[cfg(unix)]
pub use check::*;
pub use execute::*;
pub use handle::{OutputMode, ProcessHandle};
#[cfg(unix)]
pub use terminate::*;
