//! Period manager - owns the lifecycle of compensation periods.
//!
//! A period has no table of its own: it exists when at least one salary record carries
//! its `YYYY-MM` string. Its state moves one way only:
//!
//! ```text
//! Absent --create_period--> Active --archive_salary_records--> Archived
//! ```
//!
//! Every period-scoped write holds the per-period lock from [`crate::core::locks`] and
//! runs inside a single database transaction, so partial results are never observable
//! and concurrent writers to the same period are serialized.

use crate::{
    core::{
        audit,
        dimension::{self, DimensionInput},
        distribution,
        locks::lock_period,
        member::{self, roster_order_of},
        period_format::ensure_valid_period,
        salary_config,
    },
    entities::{SalaryRecord, member as member_entity, salary_record},
    errors::{Error, Result},
};
use sea_orm::{
    ActiveValue::NotSet, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Remark stamped on records written by [`calculate_and_distribute`].
pub const AUTO_CALCULATED_REMARK: &str = "系统自动计算";

/// Lifecycle state of one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodState {
    /// No record carries this period.
    Absent,
    /// Records exist and none is archived.
    Active {
        /// The period's records, by user id
        records: Vec<salary_record::Model>,
    },
    /// Records have been archived. Terminal.
    Archived {
        /// The period's records, by user id
        records: Vec<salary_record::Model>,
    },
}

impl PeriodState {
    /// Whether writes to the period are allowed.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// One entry of [`get_period_list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    /// `YYYY-MM`
    pub period: String,
    /// True iff every record of the period is archived
    pub archived: bool,
    /// Number of records in the period
    pub record_count: u64,
}

/// A salaried member joined with their record for one period, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryMember {
    /// Member id
    pub user_id: i64,
    /// Display name
    pub username: String,
    /// Stored role string
    pub role: String,
    /// The member's record for the requested period
    pub record: Option<salary_record::Model>,
}

/// Partial edit of one salary record. `None` leaves a field untouched.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SalaryRecordUpdate {
    pub community_activity_points: Option<i32>,
    pub checkin_count: Option<i32>,
    pub violation_handling_count: Option<i32>,
    pub task_completion_points: Option<i32>,
    pub announcement_count: Option<i32>,
    pub event_hosting_points: Option<i32>,
    pub birthday_bonus_points: Option<i32>,
    pub monthly_excellent_points: Option<i32>,
    pub base_points: Option<i32>,
    pub bonus_points: Option<i32>,
    pub total_points: Option<i32>,
    pub mini_coins: Option<i32>,
    pub remark: Option<String>,
    /// When set, the edit fails with [`Error::StaleVersion`] unless the stored version matches.
    pub expected_version: Option<i32>,
}

impl SalaryRecordUpdate {
    fn touches_dimensions(&self) -> bool {
        self.community_activity_points.is_some()
            || self.checkin_count.is_some()
            || self.violation_handling_count.is_some()
            || self.task_completion_points.is_some()
            || self.announcement_count.is_some()
            || self.event_hosting_points.is_some()
            || self.birthday_bonus_points.is_some()
            || self.monthly_excellent_points.is_some()
    }

    fn apply(&self, record: &mut salary_record::Model) {
        let fields = [
            (self.community_activity_points, &mut record.community_activity_points),
            (self.checkin_count, &mut record.checkin_count),
            (self.violation_handling_count, &mut record.violation_handling_count),
            (self.task_completion_points, &mut record.task_completion_points),
            (self.announcement_count, &mut record.announcement_count),
            (self.event_hosting_points, &mut record.event_hosting_points),
            (self.birthday_bonus_points, &mut record.birthday_bonus_points),
            (self.monthly_excellent_points, &mut record.monthly_excellent_points),
            (self.base_points, &mut record.base_points),
            (self.bonus_points, &mut record.bonus_points),
            (self.total_points, &mut record.total_points),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(coins) = self.mini_coins {
            record.mini_coins = coins;
            record.salary_amount = Decimal::from(coins);
        }
        if let Some(remark) = &self.remark {
            record.remark = Some(remark.clone());
        }
    }
}

fn saturate(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Writes `record` back only if the stored version still equals `expected_version`.
///
/// The stored version becomes `expected_version + 1` and `updated_at` is refreshed.
pub(crate) async fn write_versioned<C>(
    db: &C,
    mut record: salary_record::Model,
    expected_version: i32,
) -> Result<salary_record::Model>
where
    C: ConnectionTrait,
{
    let id = record.id;
    record.version = expected_version + 1;
    record.updated_at = chrono::Utc::now();

    let result = SalaryRecord::update_many()
        .set(salary_record::ActiveModel::from(record.clone()).reset_all())
        .filter(salary_record::Column::Id.eq(id))
        .filter(salary_record::Column::Version.eq(expected_version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::StaleVersion {
            id,
            expected: expected_version,
        });
    }
    Ok(record)
}

/// Fails with [`Error::ArchivedPeriod`] if any record of `period` is archived.
pub async fn ensure_period_writable<C>(db: &C, period: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let archived = SalaryRecord::find()
        .filter(salary_record::Column::Period.eq(period))
        .filter(salary_record::Column::Archived.eq(true))
        .count(db)
        .await?;

    if archived > 0 {
        return Err(Error::ArchivedPeriod {
            period: period.to_string(),
        });
    }
    Ok(())
}

/// Every record of `period`, by user id.
pub async fn get_records_for_period<C>(db: &C, period: &str) -> Result<Vec<salary_record::Model>>
where
    C: ConnectionTrait,
{
    SalaryRecord::find()
        .filter(salary_record::Column::Period.eq(period))
        .order_by_asc(salary_record::Column::UserId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Current lifecycle state of `period`.
pub async fn period_state<C>(db: &C, period: &str) -> Result<PeriodState>
where
    C: ConnectionTrait,
{
    let records = get_records_for_period(db, period).await?;
    Ok(if records.is_empty() {
        PeriodState::Absent
    } else if records.iter().any(|r| r.archived) {
        PeriodState::Archived { records }
    } else {
        PeriodState::Active { records }
    })
}

fn zero_record(user_id: i64, period: &str, now: DateTimeUtc) -> salary_record::ActiveModel {
    salary_record::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        period: Set(period.to_string()),
        community_activity_points: Set(0),
        checkin_count: Set(0),
        checkin_points: Set(0),
        violation_handling_count: Set(0),
        violation_handling_points: Set(0),
        task_completion_points: Set(0),
        announcement_count: Set(0),
        announcement_points: Set(0),
        event_hosting_points: Set(0),
        birthday_bonus_points: Set(0),
        monthly_excellent_points: Set(0),
        base_points: Set(0),
        bonus_points: Set(0),
        total_points: Set(0),
        mini_coins: Set(0),
        salary_amount: Set(Decimal::ZERO),
        remark: Set(None),
        archived: Set(false),
        archived_at: Set(None),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

fn duplicate_period(period: &str) -> Error {
    Error::Conflict {
        message: format!("薪资周期 {period} 已存在"),
    }
}

/// Maps a failed record insert, turning a `(user_id, period)` index hit into a conflict.
fn insert_error(err: DbErr, period: &str) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_period(period),
        _ => err.into(),
    }
}

/// Opens `period` with one zero-valued record per salaried member.
///
/// Fails with [`Error::Conflict`] if any record already carries `period`; the unique
/// `(user_id, period)` index backs this check up should two writers slip past it.
#[instrument(skip(db))]
pub async fn create_period(
    db: &DatabaseConnection,
    operator_id: i64,
    period: &str,
) -> Result<Vec<salary_record::Model>> {
    ensure_valid_period(period)?;
    let _guard = lock_period(period).await;
    let txn = db.begin().await?;

    let existing = SalaryRecord::find()
        .filter(salary_record::Column::Period.eq(period))
        .count(&txn)
        .await?;
    if existing > 0 {
        return Err(duplicate_period(period));
    }

    let members = member::find_formal_members(&txn).await?;
    let now = chrono::Utc::now();
    let mut records = Vec::with_capacity(members.len());
    for m in &members {
        let record = zero_record(m.id, period, now)
            .insert(&txn)
            .await
            .map_err(|e| insert_error(e, period))?;
        records.push(record);
    }

    let user_ids: Vec<i64> = records.iter().map(|r| r.user_id).collect();
    audit::record(
        &txn,
        operator_id,
        audit::SALARY_PERIOD_CREATE,
        format!("创建薪资周期 {period}，{}", audit::describe_user_ids(&user_ids)),
    )
    .await?;

    txn.commit().await?;
    info!("Created period {} with {} records", period, records.len());
    Ok(records)
}

/// Recomputes every unarchived record of `period` and distributes the pool.
///
/// Records are scored from their stored dimensions, scaled onto the pool, clamped into the
/// configured range and written back with remark [`AUTO_CALCULATED_REMARK`]. Members are
/// processed in ascending user id, so the last (highest) id absorbs rounding loss.
///
/// # Errors
/// * [`Error::InvalidPeriod`] for a malformed period
/// * [`Error::ArchivedPeriod`] if the period is archived
/// * [`Error::NotFound`] if the period has no unarchived record
#[instrument(skip(db))]
pub async fn calculate_and_distribute(
    db: &DatabaseConnection,
    period: &str,
) -> Result<Vec<salary_record::Model>> {
    ensure_valid_period(period)?;
    let _guard = lock_period(period).await;
    let txn = db.begin().await?;

    ensure_period_writable(&txn, period).await?;

    let records = SalaryRecord::find()
        .filter(salary_record::Column::Period.eq(period))
        .filter(salary_record::Column::Archived.eq(false))
        .order_by_asc(salary_record::Column::UserId)
        .all(&txn)
        .await?;
    if records.is_empty() {
        return Err(Error::NotFound {
            message: format!("薪资周期 {period} 没有未归档的薪资记录，请先录入数据"),
        });
    }

    let config = salary_config::load_snapshot(&txn).await?;
    let scores: Vec<_> = records
        .iter()
        .map(|r| dimension::score_record(r, &config))
        .collect();
    let raw: Vec<i64> = scores.iter().map(|s| i64::from(s.mini_coins)).collect();
    let final_coins = distribution::distribute(&raw, &config);
    debug!(?raw, ?final_coins, "Distributed salary pool");

    let mut saved = Vec::with_capacity(records.len());
    for ((mut record, score), coins) in records.into_iter().zip(scores).zip(final_coins) {
        let version = record.version;
        let coins = saturate(coins);
        record.checkin_points = score.checkin_points;
        record.violation_handling_points = score.violation_handling_points;
        record.announcement_points = score.announcement_points;
        record.base_points = score.base_points;
        record.bonus_points = score.bonus_points;
        record.total_points = score.total_points;
        record.mini_coins = coins;
        record.salary_amount = Decimal::from(coins);
        record.remark = Some(AUTO_CALCULATED_REMARK.to_string());
        saved.push(write_versioned(&txn, record, version).await?);
    }

    txn.commit().await?;
    info!("Calculated {} salary records for {}", saved.len(), period);
    Ok(saved)
}

/// Salaried members joined with their record for `period`, leader first then by user id.
pub async fn get_salary_members<C>(db: &C, period: &str) -> Result<Vec<SalaryMember>>
where
    C: ConnectionTrait,
{
    let mut members = member::find_formal_members(db).await?;
    members.sort_by_key(|m| (roster_order_of(&m.role), m.id));

    let mut records: HashMap<i64, salary_record::Model> = get_records_for_period(db, period)
        .await?
        .into_iter()
        .map(|r| (r.user_id, r))
        .collect();

    Ok(members
        .into_iter()
        .map(|m: member_entity::Model| SalaryMember {
            record: records.remove(&m.id),
            user_id: m.id,
            username: m.username,
            role: m.role,
        })
        .collect())
}

/// Every record, newest period first, then by user id.
pub async fn get_salary_list<C>(db: &C) -> Result<Vec<salary_record::Model>>
where
    C: ConnectionTrait,
{
    SalaryRecord::find()
        .order_by_desc(salary_record::Column::Period)
        .order_by_asc(salary_record::Column::UserId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial edit to one record.
///
/// Edited dimensions are range-checked; `salary_amount` follows `mini_coins`.
///
/// # Errors
/// * [`Error::NotFound`] if no record has `id`
/// * [`Error::ArchivedPeriod`] if the record's period is archived
/// * [`Error::StaleVersion`] if `expected_version` no longer matches
#[instrument(skip(db, update))]
pub async fn update_salary_record(
    db: &DatabaseConnection,
    id: i64,
    update: &SalaryRecordUpdate,
) -> Result<salary_record::Model> {
    let not_found = || Error::NotFound {
        message: format!("薪资记录不存在: {id}"),
    };

    let period = SalaryRecord::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(not_found)?
        .period;
    let _guard = lock_period(&period).await;
    let txn = db.begin().await?;

    let mut record = SalaryRecord::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(not_found)?;
    ensure_period_writable(&txn, &record.period).await?;

    let expected = update.expected_version.unwrap_or(record.version);
    if expected != record.version {
        return Err(Error::StaleVersion { id, expected });
    }

    update.apply(&mut record);
    if update.touches_dimensions() {
        dimension::validate_dimension_input(&DimensionInput::from(&record))?;
    }

    let saved = write_versioned(&txn, record, expected).await?;
    txn.commit().await?;
    debug!(id, version = saved.version, "Updated salary record");
    Ok(saved)
}

/// Freezes every unarchived record of `period` with one shared timestamp.
///
/// Returns how many records were archived; 0 for a period with no records.
///
/// # Errors
/// * [`Error::InvalidPeriod`] for a malformed period
/// * [`Error::ArchivedPeriod`] if the period is already archived
#[instrument(skip(db))]
pub async fn archive_salary_records(
    db: &DatabaseConnection,
    operator_id: i64,
    period: &str,
) -> Result<usize> {
    ensure_valid_period(period)?;
    let _guard = lock_period(period).await;
    let txn = db.begin().await?;

    ensure_period_writable(&txn, period).await?;

    let user_ids: Vec<i64> = SalaryRecord::find()
        .select_only()
        .column(salary_record::Column::UserId)
        .filter(salary_record::Column::Period.eq(period))
        .filter(salary_record::Column::Archived.eq(false))
        .order_by_asc(salary_record::Column::UserId)
        .into_tuple()
        .all(&txn)
        .await?;
    if user_ids.is_empty() {
        return Ok(0);
    }

    let now = chrono::Utc::now();
    SalaryRecord::update_many()
        .col_expr(salary_record::Column::Archived, Expr::value(true))
        .col_expr(salary_record::Column::ArchivedAt, Expr::value(now))
        .col_expr(salary_record::Column::UpdatedAt, Expr::value(now))
        .col_expr(
            salary_record::Column::Version,
            Expr::col(salary_record::Column::Version).add(1),
        )
        .filter(salary_record::Column::Period.eq(period))
        .filter(salary_record::Column::Archived.eq(false))
        .exec(&txn)
        .await?;

    audit::record(
        &txn,
        operator_id,
        audit::SALARY_ARCHIVE,
        format!("归档薪资记录 {}", audit::describe_user_ids(&user_ids)),
    )
    .await?;

    txn.commit().await?;
    info!("Archived {} salary records for {}", user_ids.len(), period);
    Ok(user_ids.len())
}

/// One entry per period, newest first.
///
/// Aggregated in the database so the autocomplete handler stays cheap as history grows.
/// A period counts as archived only when every one of its records is.
pub async fn get_period_list<C>(db: &C) -> Result<Vec<PeriodSummary>>
where
    C: ConnectionTrait,
{
    let rows: Vec<(String, i64, i32)> = SalaryRecord::find()
        .select_only()
        .column(salary_record::Column::Period)
        .column_as(Expr::col(salary_record::Column::Id).count(), "record_count")
        .column_as(Expr::col(salary_record::Column::Archived).min(), "all_archived")
        .group_by(salary_record::Column::Period)
        .order_by_desc(salary_record::Column::Period)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(period, record_count, all_archived)| PeriodSummary {
            period,
            archived: all_archived != 0,
            record_count: u64::try_from(record_count).unwrap_or_default(),
        })
        .collect())
}

/// The greatest period that still has an unarchived record.
pub async fn get_latest_active_period<C>(db: &C) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    SalaryRecord::find()
        .select_only()
        .column(salary_record::Column::Period)
        .filter(salary_record::Column::Archived.eq(false))
        .order_by_desc(salary_record::Column::Period)
        .into_tuple()
        .one(db)
        .await
        .map_err(Into::into)
}
