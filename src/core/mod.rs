//! Core business logic - framework-agnostic salary operations.
//!
//! Leaves first: configuration and pure calculators, then the period manager that
//! composes them, then the batch validator and reports built on top.

/// Audit trail for privileged operations
pub mod audit;
/// Manual batch edits with full violation reporting
pub mod batch;
/// Per-member dimension scoring
pub mod dimension;
/// Pool scaling and range clamping
pub mod distribution;
/// Per-period write locks
pub mod locks;
/// Member directory access
pub mod member;
/// Period lifecycle and salary records
pub mod period;
/// `YYYY-MM` period identifiers
pub mod period_format;
/// Salary reports and pool statistics
pub mod report;
/// Promotion, demotion and dismissal checks
pub mod rotation;
/// Validated salary configuration store
pub mod salary_config;
