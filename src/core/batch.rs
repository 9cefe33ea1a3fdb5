//! Batch validator - checks a manually edited set of records before saving it.
//!
//! Unlike the rest of the engine, validation here does not stop at the first problem:
//! every violation is collected so a caller can highlight all offending rows at once.

use crate::{
    core::{
        audit,
        locks::lock_period,
        period::{ensure_period_writable, get_records_for_period, write_versioned},
        period_format::ensure_valid_period,
        salary_config::{self, ConfigSnapshot},
    },
    entities::salary_record,
    errors::{Error, Result},
};
use sea_orm::{TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

/// Global error reported when a record changed underneath the batch.
pub const STALE_BATCH_MESSAGE: &str = "并发修改冲突，请刷新后重试";

/// One edited row of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    /// Member whose record is edited
    pub user_id: i64,
    /// New final mini-coins
    pub mini_coins: i32,
    /// New remark; `None` keeps the stored one
    #[serde(default)]
    pub remark: Option<String>,
    /// Version the edit was based on; `None` skips the check
    #[serde(default)]
    pub version: Option<i32>,
}

/// A per-row problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchViolation {
    /// Offending member
    pub user_id: i64,
    /// Offending field, e.g. `miniCoins`
    pub field: String,
    /// What is wrong
    pub message: String,
}

/// Outcome of [`batch_save_with_validation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSaveResponse {
    /// Whether the batch was persisted
    pub success: bool,
    /// The persisted records, on success
    pub saved_records: Vec<salary_record::Model>,
    /// Problems affecting the batch as a whole
    pub global_error: Option<String>,
    /// Per-row problems
    pub violations: Vec<BatchViolation>,
    /// Every member with at least one violation, in first-seen order
    pub violating_user_ids: Vec<i64>,
}

impl BatchSaveResponse {
    fn failure(global_error: impl Into<String>) -> Self {
        Self {
            global_error: Some(global_error.into()),
            ..Self::default()
        }
    }
}

/// Checks `records` against the period's live records and the configured bounds.
///
/// Returns a response with `success == true` and no saved records when nothing is wrong.
#[must_use]
pub fn validate_batch(
    records: &[BatchRecord],
    known_user_ids: &HashSet<i64>,
    config: &ConfigSnapshot,
) -> BatchSaveResponse {
    let mut global_errors = Vec::new();
    let mut violations = Vec::new();

    let required = usize::try_from(config.formal_member_count).unwrap_or(0);
    if records.len() != required {
        global_errors.push(format!(
            "正式成员数量不符，当前 {} 条记录，要求 {} 条",
            records.len(),
            config.formal_member_count
        ));
    }

    let mut seen = HashSet::new();
    for record in records {
        let mut violation = |field: &str, message: String| {
            violations.push(BatchViolation {
                user_id: record.user_id,
                field: field.to_string(),
                message,
            });
        };

        if !known_user_ids.contains(&record.user_id) {
            violation("userId", format!("成员(userId={})在本周期没有薪资记录", record.user_id));
        }
        if !seen.insert(record.user_id) {
            violation("userId", format!("成员(userId={})重复出现", record.user_id));
        }
        if record.mini_coins < config.mini_coins_min || record.mini_coins > config.mini_coins_max {
            violation(
                "miniCoins",
                format!(
                    "迷你币 {} 不在 [{}, {}] 范围内",
                    record.mini_coins, config.mini_coins_min, config.mini_coins_max
                ),
            );
        }
    }

    let total: i64 = records.iter().map(|r| i64::from(r.mini_coins)).sum();
    if total > i64::from(config.salary_pool_total) {
        global_errors.push(format!(
            "迷你币总额 {total} 超过薪资池上限 {}",
            config.salary_pool_total
        ));
    }

    let mut violating_user_ids = Vec::new();
    for v in &violations {
        if !violating_user_ids.contains(&v.user_id) {
            violating_user_ids.push(v.user_id);
        }
    }

    BatchSaveResponse {
        success: global_errors.is_empty() && violations.is_empty(),
        saved_records: Vec::new(),
        global_error: (!global_errors.is_empty()).then(|| global_errors.join("；")),
        violations,
        violating_user_ids,
    }
}

/// Validates and persists a manually edited batch for `period`.
///
/// Validation failures and version conflicts come back as `success == false` with
/// nothing written. On success every row is saved in one transaction and a
/// `SALARY_BATCH_SAVE` audit entry is appended.
///
/// # Errors
/// * [`Error::InvalidPeriod`] for a malformed period
/// * [`Error::ArchivedPeriod`] if the period is archived
#[instrument(skip(db, records), fields(rows = records.len()))]
pub async fn batch_save_with_validation(
    db: &DatabaseConnection,
    records: &[BatchRecord],
    operator_id: i64,
    period: &str,
) -> Result<BatchSaveResponse> {
    ensure_valid_period(period)?;
    let _guard = lock_period(period).await;
    let txn = db.begin().await?;

    ensure_period_writable(&txn, period).await?;
    let config = salary_config::load_snapshot(&txn).await?;
    let mut existing: HashMap<i64, salary_record::Model> = get_records_for_period(&txn, period)
        .await?
        .into_iter()
        .map(|r| (r.user_id, r))
        .collect();
    let known: HashSet<i64> = existing.keys().copied().collect();

    let response = validate_batch(records, &known, &config);
    if !response.success {
        warn!(
            global_error = ?response.global_error,
            violations = response.violations.len(),
            "Rejected salary batch"
        );
        return Ok(response);
    }

    let mut saved = Vec::with_capacity(records.len());
    for edit in records {
        let Some(mut record) = existing.remove(&edit.user_id) else {
            return Err(Error::NotFound {
                message: format!("薪资记录不存在: userId={}", edit.user_id),
            });
        };
        let expected = edit.version.unwrap_or(record.version);
        record.mini_coins = edit.mini_coins;
        record.salary_amount = Decimal::from(edit.mini_coins);
        if let Some(remark) = &edit.remark {
            record.remark = Some(remark.clone());
        }

        match write_versioned(&txn, record, expected).await {
            Ok(record) => saved.push(record),
            Err(Error::StaleVersion { id, expected }) => {
                warn!(id, expected, "Salary batch hit a stale version");
                return Ok(BatchSaveResponse::failure(STALE_BATCH_MESSAGE));
            }
            Err(e) => return Err(e),
        }
    }

    let user_ids: Vec<i64> = saved.iter().map(|r| r.user_id).collect();
    audit::record(
        &txn,
        operator_id,
        audit::SALARY_BATCH_SAVE,
        format!("批量保存薪资记录 {}", audit::describe_user_ids(&user_ids)),
    )
    .await?;

    txn.commit().await?;
    info!("Saved salary batch of {} records for {}", saved.len(), period);
    Ok(BatchSaveResponse {
        success: true,
        saved_records: saved,
        ..BatchSaveResponse::default()
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::period::{archive_salary_records, create_period};
    use crate::test_utils::*;

    const OPERATOR: i64 = 7;
    const PERIOD: &str = "2024-06";

    fn edit(user_id: i64, mini_coins: i32) -> BatchRecord {
        BatchRecord {
            user_id,
            mini_coins,
            remark: None,
            version: None,
        }
    }

    async fn open_period(db: &DatabaseConnection) -> Result<Vec<salary_record::Model>> {
        create_roster(db, 5).await?;
        create_period(db, OPERATOR, PERIOD).await
    }

    #[test]
    fn test_validate_batch_accepts_valid_rows() {
        let known: HashSet<i64> = (1..=5).collect();
        let records: Vec<_> = (1..=5).map(|id| edit(id, 400)).collect();
        let response = validate_batch(&records, &known, &ConfigSnapshot::default());
        assert!(response.success);
        assert!(response.global_error.is_none());
        assert!(response.violations.is_empty());
    }

    #[test]
    fn test_validate_batch_collects_everything() {
        let known: HashSet<i64> = (1..=5).collect();
        let records = vec![
            edit(1, 100),
            edit(2, 500),
            edit(2, 300),
            edit(99, 300),
            edit(4, 400),
            edit(5, 400),
        ];
        let response = validate_batch(&records, &known, &ConfigSnapshot::default());

        assert!(!response.success);
        let global = response.global_error.unwrap();
        assert!(global.contains("正式成员数量不符，当前 6 条记录，要求 5 条"));
        assert!(!global.contains("迷你币总额"));
        assert_eq!(response.violating_user_ids, vec![1, 2, 99]);

        let coins: Vec<_> = response
            .violations
            .iter()
            .filter(|v| v.field == "miniCoins")
            .map(|v| v.user_id)
            .collect();
        assert_eq!(coins, vec![1, 2]);
        assert!(
            response
                .violations
                .iter()
                .any(|v| v.user_id == 1 && v.message == "迷你币 100 不在 [200, 400] 范围内")
        );
        assert_eq!(
            response
                .violations
                .iter()
                .filter(|v| v.field == "userId")
                .count(),
            2
        );
    }

    #[test]
    fn test_validate_batch_pool_overrun() {
        let known: HashSet<i64> = (1..=5).collect();
        let config = ConfigSnapshot {
            salary_pool_total: 1500,
            ..ConfigSnapshot::default()
        };
        let records: Vec<_> = (1..=5).map(|id| edit(id, 400)).collect();
        let response = validate_batch(&records, &known, &config);

        assert!(!response.success);
        assert_eq!(
            response.global_error.as_deref(),
            Some("迷你币总额 2000 超过薪资池上限 1500")
        );
        assert!(response.violations.is_empty());
    }

    #[tokio::test]
    async fn test_batch_save_success() -> Result<()> {
        let db = setup_test_db().await?;
        let records = open_period(&db).await?;

        let edits: Vec<_> = records
            .iter()
            .map(|r| BatchRecord {
                remark: Some("人工调整".to_string()),
                version: Some(r.version),
                ..edit(r.user_id, 350)
            })
            .collect();
        let response = batch_save_with_validation(&db, &edits, OPERATOR, PERIOD).await?;

        assert!(response.success);
        assert_eq!(response.saved_records.len(), 5);
        let stored = get_records_for_period(&db, PERIOD).await?;
        assert!(stored.iter().all(|r| r.mini_coins == 350
            && r.salary_amount == Decimal::from(350)
            && r.remark.as_deref() == Some("人工调整")
            && r.version == 1));

        let audits = audit::entries_for_action(&db, audit::SALARY_BATCH_SAVE).await?;
        assert_eq!(audits.len(), 1);
        assert!(audits[0].detail.starts_with("批量保存薪资记录 5 条"));

        Ok(())
    }

    #[tokio::test]
    async fn test_batch_save_invalid_persists_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let records = open_period(&db).await?;

        let mut edits: Vec<_> = records.iter().map(|r| edit(r.user_id, 300)).collect();
        edits[2].mini_coins = 450;
        let response = batch_save_with_validation(&db, &edits, OPERATOR, PERIOD).await?;

        assert!(!response.success);
        assert_eq!(response.violating_user_ids, vec![records[2].user_id]);
        assert_eq!(get_records_for_period(&db, PERIOD).await?, records);
        assert!(
            audit::entries_for_action(&db, audit::SALARY_BATCH_SAVE)
                .await?
                .is_empty()
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_batch_save_stale_version_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        let records = open_period(&db).await?;

        let mut edits: Vec<_> = records
            .iter()
            .map(|r| BatchRecord {
                version: Some(r.version),
                ..edit(r.user_id, 300)
            })
            .collect();
        // Someone else edited the last row in the meantime.
        set_outcome(&db, records[4].id, 250, 0).await?;
        edits[4].version = Some(0);

        let response = batch_save_with_validation(&db, &edits, OPERATOR, PERIOD).await?;
        assert!(!response.success);
        assert_eq!(response.global_error.as_deref(), Some(STALE_BATCH_MESSAGE));

        let stored = get_records_for_period(&db, PERIOD).await?;
        assert!(stored[..4].iter().all(|r| r.mini_coins == 0));
        assert_eq!(stored[4].mini_coins, 250);

        Ok(())
    }

    #[tokio::test]
    async fn test_batch_save_archived_period_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let records = open_period(&db).await?;
        archive_salary_records(&db, OPERATOR, PERIOD).await?;
        let before = get_records_for_period(&db, PERIOD).await?;

        let edits: Vec<_> = records.iter().map(|r| edit(r.user_id, 300)).collect();
        let result = batch_save_with_validation(&db, &edits, OPERATOR, PERIOD).await;
        assert!(matches!(result, Err(Error::ArchivedPeriod { .. })));
        assert_eq!(get_records_for_period(&db, PERIOD).await?, before);

        Ok(())
    }
}
