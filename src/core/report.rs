//! Report generation business logic.
//!
//! This module provides functions for generating salary reports, pool usage statistics,
//! and plain-text summaries. Reports reflect what is persisted: nothing is recomputed
//! from dimensions. All functions are framework-agnostic and return structured data
//! that can be formatted by the bot layer.

use crate::{
    core::{member, period::get_records_for_period, period_format::ensure_valid_period, salary_config},
    entities::salary_record,
    errors::{Error, Result},
};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

const UNKNOWN: &str = "unknown";

/// One member's row in a salary report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSalaryDetail {
    /// Member name, `unknown` when the member no longer exists
    pub username: String,
    /// Member role, `unknown` when the member no longer exists
    pub role: String,
    /// The persisted record, verbatim
    #[serde(flatten)]
    pub record: salary_record::Model,
}

/// A reconciled salary report for one period.
///
/// `allocated_total + remaining_amount == salary_pool_total` always holds; `remaining_amount`
/// goes negative rather than being clamped when the pool is overrun.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryReport {
    /// `YYYY-MM`
    pub period: String,
    /// When the report was produced
    pub generated_at: chrono::DateTime<chrono::Utc>,
    /// Configured pool at generation time
    pub salary_pool_total: i64,
    /// Sum of `mini_coins` over all rows
    pub allocated_total: i64,
    /// `salary_pool_total - allocated_total`
    pub remaining_amount: i64,
    /// One row per record, by user id
    pub details: Vec<MemberSalaryDetail>,
}

/// A member's position in the pool ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSalaryRank {
    /// Member id
    pub user_id: i64,
    /// Member name
    pub username: String,
    /// Persisted total points
    pub total_points: i32,
    /// Persisted final mini-coins
    pub mini_coins: i32,
}

/// Pool usage and ranking for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryStats {
    /// Configured pool
    pub total_pool: i64,
    /// Sum of `mini_coins`
    pub allocated: i64,
    /// `allocated / total_pool`, 0 for an empty pool
    pub usage_rate: f64,
    /// Members by mini-coins, highest first
    pub ranking: Vec<MemberSalaryRank>,
}

/// Pool totals for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    /// Configured pool
    pub total: i64,
    /// Sum of `mini_coins`
    pub allocated: i64,
    /// `total - allocated`
    pub remaining: i64,
}

fn allocated_total(records: &[salary_record::Model]) -> i64 {
    records.iter().map(|r| i64::from(r.mini_coins)).sum()
}

/// Generates the salary report for `period`.
///
/// # Arguments
/// * `db` - Database connection
/// * `period` - `YYYY-MM` period to report on
///
/// # Returns
/// A `SalaryReport` whose rows carry every persisted field plus the member's name and role
///
/// # Errors
/// * [`Error::InvalidPeriod`] for a malformed period
/// * [`Error::NotFound`] if the period has no records
pub async fn generate_salary_report<C>(db: &C, period: &str) -> Result<SalaryReport>
where
    C: ConnectionTrait,
{
    ensure_valid_period(period)?;
    let records = get_records_for_period(db, period).await?;
    if records.is_empty() {
        return Err(Error::NotFound {
            message: format!("薪资周期 {period} 没有薪资记录"),
        });
    }

    let salary_pool_total = i64::from(salary_config::get_salary_pool_total(db).await?);
    let allocated_total = allocated_total(&records);
    let members = member::members_by_id(db).await?;

    let details = records
        .into_iter()
        .map(|record| {
            let (username, role) = members.get(&record.user_id).map_or_else(
                || (UNKNOWN.to_string(), UNKNOWN.to_string()),
                |m| (m.username.clone(), m.role.clone()),
            );
            MemberSalaryDetail {
                username,
                role,
                record,
            }
        })
        .collect();

    Ok(SalaryReport {
        period: period.to_string(),
        generated_at: chrono::Utc::now(),
        salary_pool_total,
        allocated_total,
        remaining_amount: salary_pool_total - allocated_total,
        details,
    })
}

/// Pool totals for `period`; an absent period reports nothing allocated.
pub async fn pool_summary<C>(db: &C, period: &str) -> Result<PoolSummary>
where
    C: ConnectionTrait,
{
    ensure_valid_period(period)?;
    let total = i64::from(salary_config::get_salary_pool_total(db).await?);
    let allocated = allocated_total(&get_records_for_period(db, period).await?);
    Ok(PoolSummary {
        total,
        allocated,
        remaining: total - allocated,
    })
}

/// Pool usage rate and mini-coin ranking for `period`.
pub async fn generate_salary_stats<C>(db: &C, period: &str) -> Result<SalaryStats>
where
    C: ConnectionTrait,
{
    ensure_valid_period(period)?;
    let total_pool = i64::from(salary_config::get_salary_pool_total(db).await?);
    let records = get_records_for_period(db, period).await?;
    let allocated = allocated_total(&records);
    let members = member::members_by_id(db).await?;

    let mut ranking: Vec<MemberSalaryRank> = records
        .iter()
        .map(|r| MemberSalaryRank {
            user_id: r.user_id,
            username: members
                .get(&r.user_id)
                .map_or_else(|| UNKNOWN.to_string(), |m| m.username.clone()),
            total_points: r.total_points,
            mini_coins: r.mini_coins,
        })
        .collect();
    ranking.sort_by(|a, b| b.mini_coins.cmp(&a.mini_coins).then(a.user_id.cmp(&b.user_id)));

    Ok(SalaryStats {
        total_pool,
        allocated,
        usage_rate: calculate_usage_rate(allocated, total_pool),
        ranking,
    })
}

/// Fraction of the pool that has been allocated.
///
/// Returns 0 for a non-positive pool. Overruns produce a rate above 1.
#[must_use]
pub fn calculate_usage_rate(allocated: i64, total_pool: i64) -> f64 {
    if total_pool <= 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let rate = allocated as f64 / total_pool as f64;
    rate
}

/// Generates a usage bar string for visual representation.
///
/// Creates a text-based bar like: `[████████░░] 80.0%`
///
/// # Arguments
/// * `usage_rate` - Fraction of the pool used (0.0-1.0)
/// * `bar_length` - Length of the bar in characters (default 10)
#[must_use]
pub fn format_usage_bar(usage_rate: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped = usage_rate.clamp(0.0, 1.0);

    // Cast safety: clamped ∈ [0, 1], length is small.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = (clamped * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!(
        "[{}{}] {:.1}%",
        "█".repeat(filled),
        "░".repeat(empty),
        usage_rate * 100.0
    )
}

/// Renders a report as plain text, one line per member.
pub fn format_salary_report_summary(report: &SalaryReport) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "薪资报告 {}", report.period)?;
    writeln!(
        out,
        "薪酬池 {} | 已分配 {} | 剩余 {}",
        report.salary_pool_total, report.allocated_total, report.remaining_amount
    )?;
    writeln!(
        out,
        "{}",
        format_usage_bar(
            calculate_usage_rate(report.allocated_total, report.salary_pool_total),
            None
        )
    )?;

    for detail in &report.details {
        let r = &detail.record;
        writeln!(
            out,
            "{} ({}) | 基础 {} + 奖励 {} = {} 积分 | {} 迷你币{}",
            detail.username,
            detail.role,
            r.base_points,
            r.bonus_points,
            r.total_points,
            r.mini_coins,
            if r.archived { " | 已归档" } else { "" }
        )?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp, clippy::unwrap_used)]
    use super::*;
    use crate::core::dimension::DimensionInput;
    use crate::core::period::{calculate_and_distribute, create_period};
    use crate::entities::Member;
    use crate::test_utils::*;
    use sea_orm::{EntityTrait, prelude::Decimal};
    use std::collections::BTreeMap;

    const OPERATOR: i64 = 1;

    #[tokio::test]
    async fn test_report_end_to_end() -> Result<()> {
        let db = setup_test_db().await?;
        create_roster(&db, 5).await?;
        let records = create_period(&db, OPERATOR, "2024-03").await?;
        for record in &records {
            set_dimensions(
                &db,
                record.id,
                DimensionInput {
                    community_activity_points: 100,
                    checkin_count: 35,
                    task_completion_points: 100,
                    event_hosting_points: 50,
                    ..DimensionInput::default()
                },
            )
            .await?;
        }
        calculate_and_distribute(&db, "2024-03").await?;

        let report = generate_salary_report(&db, "2024-03").await?;
        assert_eq!(report.salary_pool_total, 2000);
        assert_eq!(report.allocated_total, 2000);
        assert_eq!(report.remaining_amount, 0);
        assert_eq!(report.details.len(), 5);
        assert_eq!(report.details[0].role, "LEADER");
        assert!(report.details.iter().all(|d| d.record.mini_coins == 400));

        Ok(())
    }

    #[tokio::test]
    async fn test_report_reflects_persisted_values() -> Result<()> {
        let db = setup_test_db().await?;
        create_roster(&db, 2).await?;
        let records = create_period(&db, OPERATOR, "2024-03").await?;
        set_outcome(&db, records[0].id, 1500, 10).await?;
        set_outcome(&db, records[1].id, 900, 20).await?;

        let report = generate_salary_report(&db, "2024-03").await?;
        assert_eq!(report.allocated_total, 2400);
        assert_eq!(report.remaining_amount, -400);
        assert_eq!(
            report.allocated_total + report.remaining_amount,
            report.salary_pool_total
        );
        assert_eq!(report.details[0].record.total_points, 10);
        assert_eq!(report.details[0].record.salary_amount, Decimal::from(1500));

        Ok(())
    }

    #[tokio::test]
    async fn test_report_unknown_member() -> Result<()> {
        let db = setup_test_db().await?;
        let roster = create_roster(&db, 1).await?;
        create_period(&db, OPERATOR, "2024-03").await?;
        db.execute_unprepared("PRAGMA foreign_keys = OFF").await?;
        Member::delete_by_id(roster[0].id).exec(&db).await?;

        let report = generate_salary_report(&db, "2024-03").await?;
        assert_eq!(report.details[0].username, "unknown");
        assert_eq!(report.details[0].role, "unknown");

        Ok(())
    }

    #[tokio::test]
    async fn test_report_absent_period() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(matches!(
            generate_salary_report(&db, "2024-03").await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            generate_salary_report(&db, "March").await,
            Err(Error::InvalidPeriod { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_and_pool_summary() -> Result<()> {
        let db = setup_test_db().await?;
        let roster = create_roster(&db, 3).await?;
        let records = create_period(&db, OPERATOR, "2024-03").await?;
        set_outcome(&db, records[0].id, 200, 100).await?;
        set_outcome(&db, records[1].id, 400, 200).await?;
        set_outcome(&db, records[2].id, 400, 190).await?;

        let stats = generate_salary_stats(&db, "2024-03").await?;
        assert_eq!(stats.allocated, 1000);
        assert_eq!(stats.usage_rate, 0.5);
        let order: Vec<i64> = stats.ranking.iter().map(|r| r.user_id).collect();
        assert_eq!(order, vec![roster[1].id, roster[2].id, roster[0].id]);

        let summary = pool_summary(&db, "2024-03").await?;
        assert_eq!(
            summary,
            PoolSummary {
                total: 2000,
                allocated: 1000,
                remaining: 1000
            }
        );
        assert_eq!(pool_summary(&db, "2030-01").await?.allocated, 0);

        Ok(())
    }

    #[test]
    fn test_usage_rate() {
        assert_eq!(calculate_usage_rate(1000, 2000), 0.5);
        assert_eq!(calculate_usage_rate(2400, 2000), 1.2);
        assert_eq!(calculate_usage_rate(100, 0), 0.0);
    }

    #[test]
    fn test_format_usage_bar() {
        assert_eq!(format_usage_bar(0.8, None), "[████████░░] 80.0%");
        assert_eq!(format_usage_bar(0.0, Some(4)), "[░░░░] 0.0%");
        assert_eq!(format_usage_bar(1.5, Some(4)), "[████] 150.0%");
    }

    #[test]
    fn test_format_summary() {
        let mut record = blank_record(3, "2024-03");
        record.mini_coins = 300;
        record.total_points = 150;
        let report = SalaryReport {
            period: "2024-03".to_string(),
            generated_at: chrono::Utc::now(),
            salary_pool_total: 2000,
            allocated_total: 300,
            remaining_amount: 1700,
            details: vec![MemberSalaryDetail {
                username: "alice".to_string(),
                role: "INTERN".to_string(),
                record,
            }],
        };

        let text = format_salary_report_summary(&report).unwrap();
        assert!(text.starts_with("薪资报告 2024-03\n"));
        assert!(text.contains("薪酬池 2000 | 已分配 300 | 剩余 1700"));
        assert!(text.contains("alice (INTERN)"));
        assert!(text.contains("300 迷你币"));
    }

    #[test]
    fn test_detail_serializes_flat() {
        let detail = MemberSalaryDetail {
            username: "bob".to_string(),
            role: "LEADER".to_string(),
            record: blank_record(9, "2024-03"),
        };
        let value = serde_json::to_value(&detail).unwrap();
        let fields: BTreeMap<String, serde_json::Value> = serde_json::from_value(value).unwrap();
        assert_eq!(fields["username"], "bob");
        assert_eq!(fields["userId"], 9);
        assert!(fields.contains_key("monthlyExcellentPoints"));
    }
}
