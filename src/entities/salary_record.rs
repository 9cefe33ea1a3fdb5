//! Salary record entity - one member's compensation line for one period.
//!
//! Identity is (`user_id`, `period`); a unique index on that pair is created alongside
//! the table. Records are never physically deleted: archival is a terminal state.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Salary record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "salary_records")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Member this record belongs to
    pub user_id: i64,
    /// Compensation period, `YYYY-MM`
    pub period: String,

    // Base duty dimensions
    /// Community activity points, 0-100
    pub community_activity_points: i32,
    /// Raw check-in count
    pub checkin_count: i32,
    /// Points from the check-in tier table
    pub checkin_points: i32,
    /// Number of violations handled
    pub violation_handling_count: i32,
    /// `violation_handling_count × 3`
    pub violation_handling_points: i32,
    /// Task completion points, 0-100
    pub task_completion_points: i32,
    /// Number of announcements published
    pub announcement_count: i32,
    /// `announcement_count × 5`
    pub announcement_points: i32,

    // Excellence dimensions
    /// Event hosting points, 0-250
    pub event_hosting_points: i32,
    /// Birthday bonus points, 0-25
    pub birthday_bonus_points: i32,
    /// Monthly excellence review points, 0-30
    pub monthly_excellent_points: i32,

    /// Sum of base duty dimensions
    pub base_points: i32,
    /// Sum of excellence dimensions
    pub bonus_points: i32,
    /// `base_points + bonus_points`
    pub total_points: i32,
    /// Final allocated mini-coins
    pub mini_coins: i32,
    /// Display amount, always derived from `mini_coins`
    pub salary_amount: Decimal,
    /// Free-form note
    pub remark: Option<String>,

    /// Whether the record has been frozen
    pub archived: bool,
    /// When the record was frozen
    pub archived_at: Option<DateTimeUtc>,
    /// Optimistic-concurrency counter, bumped on every write
    pub version: i32,
    /// When the record was created
    pub created_at: DateTimeUtc,
    /// When the record was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `SalaryRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each record belongs to one member
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::UserId",
        to = "super::member::Column::Id"
    )]
    Member,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
