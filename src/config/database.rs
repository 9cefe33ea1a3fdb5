//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the database schema always matches the Rust structs. The one constraint the entity
//! macros cannot express, the composite uniqueness of (`user_id`, `period`) on salary
//! records, is added here as an explicit index.

use crate::entities::{AuditLog, Member, SalaryConfig, SalaryRecord, salary_record};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/pollen_salary.sqlite?mode=rwc";

/// Name of the unique index guarding one record per member per period.
pub const USER_PERIOD_INDEX: &str = "idx_salary_records_user_period";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back
/// to a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the given database URL.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database at {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Members are created before salary records so the foreign key target exists.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut member_table = schema.create_table_from_entity(Member);
    let mut salary_record_table = schema.create_table_from_entity(SalaryRecord);
    let mut salary_config_table = schema.create_table_from_entity(SalaryConfig);
    let mut audit_log_table = schema.create_table_from_entity(AuditLog);

    member_table.if_not_exists();
    salary_record_table.if_not_exists();
    salary_config_table.if_not_exists();
    audit_log_table.if_not_exists();

    db.execute(builder.build(&member_table)).await?;
    db.execute(builder.build(&salary_record_table)).await?;
    db.execute(builder.build(&salary_config_table)).await?;
    db.execute(builder.build(&audit_log_table)).await?;

    let user_period_index = Index::create()
        .name(USER_PERIOD_INDEX)
        .table(SalaryRecord)
        .col(salary_record::Column::UserId)
        .col(salary_record::Column::Period)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&user_period_index)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        audit_log::Model as AuditLogModel, member::Model as MemberModel,
        salary_config::Model as SalaryConfigModel, salary_record::Model as SalaryRecordModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let _: Vec<MemberModel> = Member::find().limit(1).all(&db).await?;
        let _: Vec<SalaryRecordModel> = SalaryRecord::find().limit(1).all(&db).await?;
        let _: Vec<SalaryConfigModel> = SalaryConfig::find().limit(1).all(&db).await?;
        let _: Vec<AuditLogModel> = AuditLog::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
