//! Salary configuration store.
//!
//! Persists opaque key/value pairs in the `salary_config` table and exposes typed,
//! validated accessors. Calculations never read the table directly: they receive a
//! [`ConfigSnapshot`] taken once at the start of a unit of work, so a multi-step
//! calculation cannot observe a half-applied configuration change.

use crate::{
    entities::{SalaryConfig, salary_config},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

/// Total mini-coin budget of one period.
pub const SALARY_POOL_TOTAL: &str = "salary_pool_total";
/// Expected number of salaried members.
pub const FORMAL_MEMBER_COUNT: &str = "formal_member_count";
/// Baseline allocation per member.
pub const BASE_ALLOCATION: &str = "base_allocation";
/// Lower bound of a member's final mini-coins.
pub const MINI_COINS_MIN: &str = "mini_coins_min";
/// Upper bound of a member's final mini-coins.
pub const MINI_COINS_MAX: &str = "mini_coins_max";
/// Mini-coins granted per point.
pub const POINTS_TO_COINS_RATIO: &str = "points_to_coins_ratio";
/// JSON list of [`CheckinTier`].
pub const CHECKIN_TIERS: &str = "checkin_tiers";
/// Intern monthly points needed for promotion.
pub const PROMOTION_POINTS_THRESHOLD: &str = "promotion_points_threshold";
/// Mini-coins below which a formal member counts as under-performing.
pub const DEMOTION_SALARY_THRESHOLD: &str = "demotion_salary_threshold";
/// Consecutive under-performing periods before demotion review.
pub const DEMOTION_CONSECUTIVE_MONTHS: &str = "demotion_consecutive_months";
/// Intern points below which a period counts towards dismissal.
pub const DISMISSAL_POINTS_THRESHOLD: &str = "dismissal_points_threshold";
/// Consecutive low periods before an intern is flagged for dismissal.
pub const DISMISSAL_CONSECUTIVE_MONTHS: &str = "dismissal_consecutive_months";

pub(crate) const DEFAULT_SALARY_POOL_TOTAL: i32 = 2000;
pub(crate) const DEFAULT_FORMAL_MEMBER_COUNT: i32 = 5;
pub(crate) const DEFAULT_BASE_ALLOCATION: i32 = 400;
pub(crate) const DEFAULT_MINI_COINS_MIN: i32 = 200;
pub(crate) const DEFAULT_MINI_COINS_MAX: i32 = 400;
pub(crate) const DEFAULT_POINTS_TO_COINS_RATIO: i32 = 2;
pub(crate) const DEFAULT_PROMOTION_POINTS_THRESHOLD: i32 = 100;
pub(crate) const DEFAULT_DEMOTION_SALARY_THRESHOLD: i32 = 150;
pub(crate) const DEFAULT_DEMOTION_CONSECUTIVE_MONTHS: i32 = 2;
pub(crate) const DEFAULT_DISMISSAL_POINTS_THRESHOLD: i32 = 100;
pub(crate) const DEFAULT_DISMISSAL_CONSECUTIVE_MONTHS: i32 = 2;

/// One row of the check-in reward table: counts in `[min_count, max_count]` earn `points`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinTier {
    /// Inclusive lower bound
    pub min_count: i32,
    /// Inclusive upper bound
    pub max_count: i32,
    /// Points awarded, may be negative
    pub points: i32,
    /// Display label, e.g. "合格"
    #[serde(default)]
    pub label: String,
}

impl CheckinTier {
    /// Builds a tier.
    pub fn new(min_count: i32, max_count: i32, points: i32, label: impl Into<String>) -> Self {
        Self {
            min_count,
            max_count,
            points,
            label: label.into(),
        }
    }

    /// Whether `count` falls inside this tier.
    #[must_use]
    pub const fn contains(&self, count: i32) -> bool {
        count >= self.min_count && count <= self.max_count
    }
}

/// The built-in tier table used when none is configured.
#[must_use]
pub fn default_checkin_tiers() -> Vec<CheckinTier> {
    vec![
        CheckinTier::new(0, 19, -20, "不合格"),
        CheckinTier::new(20, 29, -10, "需改进"),
        CheckinTier::new(30, 39, 0, "合格"),
        CheckinTier::new(40, 49, 30, "良好"),
        CheckinTier::new(50, 999, 50, "优秀"),
    ]
}

/// Member rotation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationThresholds {
    /// Intern points needed for promotion
    pub promotion_points_threshold: i32,
    /// Mini-coins below which a formal member under-performs
    pub demotion_salary_threshold: i32,
    /// Consecutive periods before demotion review
    pub demotion_consecutive_months: i32,
    /// Intern points below which a period counts towards dismissal
    pub dismissal_points_threshold: i32,
    /// Consecutive periods before dismissal
    pub dismissal_consecutive_months: i32,
}

impl Default for RotationThresholds {
    fn default() -> Self {
        Self {
            promotion_points_threshold: DEFAULT_PROMOTION_POINTS_THRESHOLD,
            demotion_salary_threshold: DEFAULT_DEMOTION_SALARY_THRESHOLD,
            demotion_consecutive_months: DEFAULT_DEMOTION_CONSECUTIVE_MONTHS,
            dismissal_points_threshold: DEFAULT_DISMISSAL_POINTS_THRESHOLD,
            dismissal_consecutive_months: DEFAULT_DISMISSAL_CONSECUTIVE_MONTHS,
        }
    }
}

/// Immutable view of every setting a calculation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    /// Total mini-coin budget
    pub salary_pool_total: i32,
    /// Expected number of salaried members
    pub formal_member_count: i32,
    /// Baseline allocation per member
    pub base_allocation: i32,
    /// Lower bound of final mini-coins
    pub mini_coins_min: i32,
    /// Upper bound of final mini-coins
    pub mini_coins_max: i32,
    /// Mini-coins per point
    pub points_to_coins_ratio: i32,
    /// Check-in tier table
    pub checkin_tiers: Vec<CheckinTier>,
    /// Rotation thresholds
    pub rotation: RotationThresholds,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            salary_pool_total: DEFAULT_SALARY_POOL_TOTAL,
            formal_member_count: DEFAULT_FORMAL_MEMBER_COUNT,
            base_allocation: DEFAULT_BASE_ALLOCATION,
            mini_coins_min: DEFAULT_MINI_COINS_MIN,
            mini_coins_max: DEFAULT_MINI_COINS_MAX,
            points_to_coins_ratio: DEFAULT_POINTS_TO_COINS_RATIO,
            checkin_tiers: default_checkin_tiers(),
            rotation: RotationThresholds::default(),
        }
    }
}

impl ConfigSnapshot {
    /// Builds a snapshot from raw stored values, defaulting anything absent or unparsable.
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self> {
        let int = |key: &str, default: i32| parse_int_or(values.get(key).map(String::as_str), default);

        let checkin_tiers = match values.get(CHECKIN_TIERS) {
            Some(json) => parse_tiers(json)?,
            None => default_checkin_tiers(),
        };

        Ok(Self {
            salary_pool_total: int(SALARY_POOL_TOTAL, DEFAULT_SALARY_POOL_TOTAL),
            formal_member_count: int(FORMAL_MEMBER_COUNT, DEFAULT_FORMAL_MEMBER_COUNT),
            base_allocation: int(BASE_ALLOCATION, DEFAULT_BASE_ALLOCATION),
            mini_coins_min: int(MINI_COINS_MIN, DEFAULT_MINI_COINS_MIN),
            mini_coins_max: int(MINI_COINS_MAX, DEFAULT_MINI_COINS_MAX),
            points_to_coins_ratio: int(POINTS_TO_COINS_RATIO, DEFAULT_POINTS_TO_COINS_RATIO),
            checkin_tiers,
            rotation: RotationThresholds {
                promotion_points_threshold: int(
                    PROMOTION_POINTS_THRESHOLD,
                    DEFAULT_PROMOTION_POINTS_THRESHOLD,
                ),
                demotion_salary_threshold: int(
                    DEMOTION_SALARY_THRESHOLD,
                    DEFAULT_DEMOTION_SALARY_THRESHOLD,
                ),
                demotion_consecutive_months: int(
                    DEMOTION_CONSECUTIVE_MONTHS,
                    DEFAULT_DEMOTION_CONSECUTIVE_MONTHS,
                ),
                dismissal_points_threshold: int(
                    DISMISSAL_POINTS_THRESHOLD,
                    DEFAULT_DISMISSAL_POINTS_THRESHOLD,
                ),
                dismissal_consecutive_months: int(
                    DISMISSAL_CONSECUTIVE_MONTHS,
                    DEFAULT_DISMISSAL_CONSECUTIVE_MONTHS,
                ),
            },
        })
    }
}

fn parse_int_or(raw: Option<&str>, default: i32) -> i32 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_tiers(json: &str) -> Result<Vec<CheckinTier>> {
    serde_json::from_str(json).map_err(|e| Error::Config {
        message: format!("签到奖惩表配置 JSON 解析失败: {e}"),
    })
}

/// Every stored key/value pair.
pub async fn get_all_config<C>(db: &C) -> Result<HashMap<String, String>>
where
    C: ConnectionTrait,
{
    Ok(SalaryConfig::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.key, c.value))
        .collect())
}

/// The stored value for `key`, or `default` if unset.
pub async fn get_config_value<C>(db: &C, key: &str, default: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    Ok(find_entry(db, key)
        .await?
        .map_or_else(|| default.to_string(), |c| c.value))
}

/// The stored value for `key` parsed as an integer, or `default` if unset or unparsable.
pub async fn get_int_config<C>(db: &C, key: &str, default: i32) -> Result<i32>
where
    C: ConnectionTrait,
{
    let entry = find_entry(db, key).await?;
    Ok(parse_int_or(entry.as_ref().map(|c| c.value.as_str()), default))
}

async fn find_entry<C>(db: &C, key: &str) -> Result<Option<salary_config::Model>>
where
    C: ConnectionTrait,
{
    SalaryConfig::find()
        .filter(salary_config::Column::Key.eq(key))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Total mini-coin budget of a period.
///
/// Upper bound for the distribution engine and for the sum of a manual batch. Falls
/// back to the built-in default when unset or unparsable.
pub async fn get_salary_pool_total<C: ConnectionTrait>(db: &C) -> Result<i32> {
    get_int_config(db, SALARY_POOL_TOTAL, DEFAULT_SALARY_POOL_TOTAL).await
}

/// Expected number of salaried members.
pub async fn get_formal_member_count<C: ConnectionTrait>(db: &C) -> Result<i32> {
    get_int_config(db, FORMAL_MEMBER_COUNT, DEFAULT_FORMAL_MEMBER_COUNT).await
}

/// `(min, max)` bounds of a member's final mini-coins.
///
/// The two keys are read independently, so a pair stored before validation existed
/// may come back with `min > max`; [`save_config`] never writes such a pair.
pub async fn get_mini_coins_range<C: ConnectionTrait>(db: &C) -> Result<(i32, i32)> {
    let min = get_int_config(db, MINI_COINS_MIN, DEFAULT_MINI_COINS_MIN).await?;
    let max = get_int_config(db, MINI_COINS_MAX, DEFAULT_MINI_COINS_MAX).await?;
    Ok((min, max))
}

/// Mini-coins granted per point.
pub async fn get_points_to_coins_ratio<C: ConnectionTrait>(db: &C) -> Result<i32> {
    get_int_config(db, POINTS_TO_COINS_RATIO, DEFAULT_POINTS_TO_COINS_RATIO).await
}

/// The configured check-in tier table, or the built-in one.
///
/// # Errors
/// Returns [`Error::Config`] if the stored JSON cannot be parsed.
pub async fn get_checkin_tiers<C: ConnectionTrait>(db: &C) -> Result<Vec<CheckinTier>> {
    match find_entry(db, CHECKIN_TIERS).await? {
        Some(entry) => parse_tiers(&entry.value),
        None => Ok(default_checkin_tiers()),
    }
}

/// The configured rotation thresholds.
pub async fn get_rotation_thresholds<C: ConnectionTrait>(db: &C) -> Result<RotationThresholds> {
    Ok(RotationThresholds {
        promotion_points_threshold: get_int_config(
            db,
            PROMOTION_POINTS_THRESHOLD,
            DEFAULT_PROMOTION_POINTS_THRESHOLD,
        )
        .await?,
        demotion_salary_threshold: get_int_config(
            db,
            DEMOTION_SALARY_THRESHOLD,
            DEFAULT_DEMOTION_SALARY_THRESHOLD,
        )
        .await?,
        demotion_consecutive_months: get_int_config(
            db,
            DEMOTION_CONSECUTIVE_MONTHS,
            DEFAULT_DEMOTION_CONSECUTIVE_MONTHS,
        )
        .await?,
        dismissal_points_threshold: get_int_config(
            db,
            DISMISSAL_POINTS_THRESHOLD,
            DEFAULT_DISMISSAL_POINTS_THRESHOLD,
        )
        .await?,
        dismissal_consecutive_months: get_int_config(
            db,
            DISMISSAL_CONSECUTIVE_MONTHS,
            DEFAULT_DISMISSAL_CONSECUTIVE_MONTHS,
        )
        .await?,
    })
}

/// Reads every setting once and returns an immutable snapshot.
///
/// Taken at the start of each calculation and batch save, inside the same transaction,
/// so one unit of work sees one consistent configuration.
pub async fn load_snapshot<C: ConnectionTrait>(db: &C) -> Result<ConfigSnapshot> {
    ConfigSnapshot::from_map(&get_all_config(db).await?)
}

/// Validates the union of stored and incoming values, then upserts every incoming key.
///
/// Nothing is written unless every rule passes; all violations are reported together.
#[instrument(skip(db, config_map), fields(keys = config_map.len()))]
pub async fn save_config(db: &DatabaseConnection, config_map: &BTreeMap<String, String>) -> Result<()> {
    let txn = db.begin().await?;

    let stored = get_all_config(&txn).await?;
    let violations = validate_config(&stored, config_map);
    if !violations.is_empty() {
        warn!(?violations, "Rejected salary configuration");
        return Err(Error::Validation { violations });
    }

    let now = chrono::Utc::now().naive_utc();
    for (key, value) in config_map {
        if let Some(existing) = find_entry(&txn, key).await? {
            let mut active_model: salary_config::ActiveModel = existing.into();
            active_model.value = Set(value.clone());
            active_model.updated_at = Set(now);
            active_model.update(&txn).await?;
        } else {
            let entry = salary_config::ActiveModel {
                key: Set(key.clone()),
                value: Set(value.clone()),
                updated_at: Set(now),
                ..Default::default()
            };
            entry.insert(&txn).await?;
        }
    }

    txn.commit().await?;
    info!("Saved {} salary configuration entries", config_map.len());
    Ok(())
}

/// Validates and stores a new check-in tier table.
pub async fn save_checkin_tiers(db: &DatabaseConnection, tiers: &[CheckinTier]) -> Result<()> {
    let json = serde_json::to_string(tiers)?;
    let mut entry = BTreeMap::new();
    entry.insert(CHECKIN_TIERS.to_string(), json);
    save_config(db, &entry).await
}

/// Stores the entries of `defaults` whose keys have no stored value yet.
///
/// Used at startup to apply `config.toml`. Keys already in the table keep their value,
/// so changes made at runtime survive a restart. The new entries go through
/// [`save_config`] and are validated like any other edit. Returns how many were stored.
pub async fn seed_missing_config(
    db: &DatabaseConnection,
    defaults: &BTreeMap<String, String>,
) -> Result<usize> {
    let stored = get_all_config(db).await?;
    let missing: BTreeMap<String, String> = defaults
        .iter()
        .filter(|(key, _)| !stored.contains_key(*key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if missing.is_empty() {
        debug!("Every configured salary key already has a stored value");
        return Ok(0);
    }
    save_config(db, &missing).await?;
    Ok(missing.len())
}

/// Checks a configuration change against the stored values.
///
/// Each value resolves from the incoming map first, then the stored value, then the
/// built-in default. Returns every violation found; empty means valid.
#[must_use]
pub fn validate_config(
    stored: &HashMap<String, String>,
    incoming: &BTreeMap<String, String>,
) -> Vec<String> {
    let resolve = |key: &str, default: i32| {
        let raw = incoming.get(key).or_else(|| stored.get(key));
        parse_int_or(raw.map(String::as_str), default)
    };

    let mut violations = Vec::new();

    let min = resolve(MINI_COINS_MIN, DEFAULT_MINI_COINS_MIN);
    let max = resolve(MINI_COINS_MAX, DEFAULT_MINI_COINS_MAX);
    if min > max {
        violations.push(format!(
            "个人最低迷你币({min})不能大于个人最高迷你币({max})"
        ));
    }

    let base_allocation = resolve(BASE_ALLOCATION, DEFAULT_BASE_ALLOCATION);
    let member_count = resolve(FORMAL_MEMBER_COUNT, DEFAULT_FORMAL_MEMBER_COUNT);
    let pool_total = resolve(SALARY_POOL_TOTAL, DEFAULT_SALARY_POOL_TOTAL);
    let allocation_total = i64::from(base_allocation) * i64::from(member_count);
    if allocation_total > i64::from(pool_total) {
        violations.push(format!(
            "基准分配额({base_allocation}) × 正式成员数({member_count}) = {allocation_total} 超过薪酬池总额({pool_total})"
        ));
    }

    for (key, label, default) in [
        (
            PROMOTION_POINTS_THRESHOLD,
            "转正积分阈值",
            DEFAULT_PROMOTION_POINTS_THRESHOLD,
        ),
        (
            DEMOTION_SALARY_THRESHOLD,
            "降级薪酬阈值",
            DEFAULT_DEMOTION_SALARY_THRESHOLD,
        ),
        (
            DISMISSAL_POINTS_THRESHOLD,
            "开除积分阈值",
            DEFAULT_DISMISSAL_POINTS_THRESHOLD,
        ),
    ] {
        let value = resolve(key, default);
        if value < 0 {
            violations.push(format!("{label}不能为负数: {value}"));
        }
    }

    if let Some(json) = incoming.get(CHECKIN_TIERS) {
        match serde_json::from_str::<Vec<CheckinTier>>(json) {
            Ok(tiers) => violations.extend(validate_tiers(&tiers)),
            Err(e) => violations.push(format!("签到奖惩表配置 JSON 解析失败: {e}")),
        }
    }

    violations
}

/// Checks that a tier table covers `[0, ∞)` with ascending, contiguous, disjoint ranges.
#[must_use]
pub fn validate_tiers(tiers: &[CheckinTier]) -> Vec<String> {
    let mut violations = Vec::new();

    let Some(first) = tiers.first() else {
        violations.push("签到奖惩表不能为空".to_string());
        return violations;
    };
    if first.min_count != 0 {
        violations.push(format!("签到奖惩表必须从 0 次开始，当前为 {}", first.min_count));
    }

    for (index, tier) in tiers.iter().enumerate() {
        if tier.min_count > tier.max_count {
            violations.push(format!(
                "第 {} 档区间无效: [{}, {}]",
                index + 1,
                tier.min_count,
                tier.max_count
            ));
        }
    }

    for (index, pair) in tiers.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        let Some(expected) = prev.max_count.checked_add(1) else {
            violations.push(format!(
                "第 {} 档已覆盖到最大次数 {}，其后不能再有第 {} 档",
                index + 1,
                prev.max_count,
                index + 2
            ));
            continue;
        };
        if next.min_count != expected {
            violations.push(format!(
                "第 {} 档与第 {} 档不连续: {} 之后应从 {} 开始，当前为 {}",
                index + 1,
                index + 2,
                prev.max_count,
                expected,
                next.min_count
            ));
        }
    }

    violations
}
