//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Salary configuration commands
pub mod config;

/// General utility commands
pub mod general;

/// Period lifecycle commands
pub mod period;

/// Salary record, report and rotation commands
pub mod salary;

// Export commands
pub use config::*;
pub use general::*;
pub use period::*;
pub use salary::*;
