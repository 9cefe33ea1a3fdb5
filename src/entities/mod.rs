//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod audit_log;
pub mod member;
pub mod salary_config;
pub mod salary_record;

// Re-export specific types to avoid conflicts
pub use audit_log::{Column as AuditLogColumn, Entity as AuditLog, Model as AuditLogModel};
pub use member::{Column as MemberColumn, Entity as Member, Model as MemberModel};
pub use salary_config::{
    Column as SalaryConfigColumn, Entity as SalaryConfig, Model as SalaryConfigModel,
};
pub use salary_record::{
    Column as SalaryRecordColumn, Entity as SalaryRecord, Model as SalaryRecordModel,
};
