//! Shared test utilities for the salary engine.
//!
//! This module provides common helper functions for setting up test databases
//! and creating members and records with sensible defaults.

use crate::{
    core::{
        dimension::DimensionInput,
        member::{self, Role},
        period::{self, SalaryRecordUpdate},
    },
    entities,
    errors::Result,
};
use sea_orm::{DatabaseConnection, prelude::Decimal};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates one member with the given role.
pub async fn create_member_with_role(
    db: &DatabaseConnection,
    username: &str,
    role: Role,
) -> Result<entities::member::Model> {
    member::create_member(db, username, role).await
}

/// Creates `count` salaried members: a leader, a vice-leader, then interns.
///
/// Members are returned in id order, which is also the order periods process them in.
pub async fn create_roster(
    db: &DatabaseConnection,
    count: usize,
) -> Result<Vec<entities::member::Model>> {
    let mut members = Vec::with_capacity(count);
    for index in 0..count {
        let role = match index {
            0 => Role::Leader,
            1 => Role::ViceLeader,
            _ => Role::Intern,
        };
        members.push(member::create_member(db, &format!("member-{index}"), role).await?);
    }
    Ok(members)
}

/// Overwrites the raw dimensions of one record.
pub async fn set_dimensions(
    db: &DatabaseConnection,
    record_id: i64,
    input: DimensionInput,
) -> Result<entities::salary_record::Model> {
    let update = SalaryRecordUpdate {
        community_activity_points: Some(input.community_activity_points),
        checkin_count: Some(input.checkin_count),
        violation_handling_count: Some(input.violation_handling_count),
        task_completion_points: Some(input.task_completion_points),
        announcement_count: Some(input.announcement_count),
        event_hosting_points: Some(input.event_hosting_points),
        birthday_bonus_points: Some(input.birthday_bonus_points),
        monthly_excellent_points: Some(input.monthly_excellent_points),
        ..Default::default()
    };
    period::update_salary_record(db, record_id, &update).await
}

/// Sets `mini_coins` (and `total_points`) on one record.
pub async fn set_outcome(
    db: &DatabaseConnection,
    record_id: i64,
    mini_coins: i32,
    total_points: i32,
) -> Result<entities::salary_record::Model> {
    let update = SalaryRecordUpdate {
        mini_coins: Some(mini_coins),
        total_points: Some(total_points),
        ..Default::default()
    };
    period::update_salary_record(db, record_id, &update).await
}

/// An unsaved, zero-valued record for pure-function tests.
#[must_use]
pub fn blank_record(user_id: i64, period: &str) -> entities::salary_record::Model {
    let now = chrono::Utc::now();
    entities::salary_record::Model {
        id: 0,
        user_id,
        period: period.to_string(),
        community_activity_points: 0,
        checkin_count: 0,
        checkin_points: 0,
        violation_handling_count: 0,
        violation_handling_points: 0,
        task_completion_points: 0,
        announcement_count: 0,
        announcement_points: 0,
        event_hosting_points: 0,
        birthday_bonus_points: 0,
        monthly_excellent_points: 0,
        base_points: 0,
        bonus_points: 0,
        total_points: 0,
        mini_coins: 0,
        salary_amount: Decimal::ZERO,
        remark: None,
        archived: false,
        archived_at: None,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}
