//! Member entity - the slice of the member directory the salary engine reads.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Member database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
pub struct Model {
    /// Unique identifier, referenced by `salary_records.user_id`
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub username: String,
    /// Role name: `LEADER`, `VICE_LEADER`, `MEMBER`, `INTERN` or `APPLICANT`
    pub role: String,
    /// When the member was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Member and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One member has many salary records
    #[sea_orm(has_many = "super::salary_record::Entity")]
    SalaryRecords,
}

impl Related<super::salary_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalaryRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
