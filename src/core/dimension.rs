//! Dimension calculator: raw contribution counters to points and mini-coins.
//!
//! Pure functions only. Configuration arrives as a [`ConfigSnapshot`] so a calculation
//! sees one consistent set of values from start to finish.

use crate::{
    core::salary_config::{CheckinTier, ConfigSnapshot},
    entities::salary_record,
    errors::{Error, Result},
};
use serde::{Deserialize, Serialize};

/// Points per handled violation.
pub const VIOLATION_HANDLING_MULTIPLIER: i32 = 3;
/// Points per published announcement.
pub const ANNOUNCEMENT_MULTIPLIER: i32 = 5;

/// One member's raw contribution counters for a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionInput {
    /// Community activity points, 0-100
    pub community_activity_points: i32,
    /// Raw check-in count; negative counts are treated as zero
    pub checkin_count: i32,
    /// Number of violations handled, non-negative
    pub violation_handling_count: i32,
    /// Task completion points, 0-100
    pub task_completion_points: i32,
    /// Number of announcements published, non-negative
    pub announcement_count: i32,
    /// Event hosting points, 0-250
    pub event_hosting_points: i32,
    /// Birthday bonus points, 0-25
    pub birthday_bonus_points: i32,
    /// Monthly excellence review points, 0-30
    pub monthly_excellent_points: i32,
}

impl From<&salary_record::Model> for DimensionInput {
    fn from(record: &salary_record::Model) -> Self {
        Self {
            community_activity_points: record.community_activity_points,
            checkin_count: record.checkin_count,
            violation_handling_count: record.violation_handling_count,
            task_completion_points: record.task_completion_points,
            announcement_count: record.announcement_count,
            event_hosting_points: record.event_hosting_points,
            birthday_bonus_points: record.birthday_bonus_points,
            monthly_excellent_points: record.monthly_excellent_points,
        }
    }
}

/// Derived points for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionResult {
    /// Sum of base duty dimensions
    pub base_points: i32,
    /// Sum of excellence dimensions
    pub bonus_points: i32,
    /// `base_points + bonus_points`
    pub total_points: i32,
    /// `total_points × ratio`, before any pool adjustment
    pub mini_coins: i32,
    /// Points from the check-in tier table
    pub checkin_points: i32,
    /// `violation_handling_count × 3`
    pub violation_handling_points: i32,
    /// `announcement_count × 5`
    pub announcement_points: i32,
    /// Label of the matched check-in tier, if any
    pub checkin_level: Option<String>,
}

fn find_tier(count: i32, tiers: &[CheckinTier]) -> Option<&CheckinTier> {
    let count = count.max(0);
    tiers.iter().find(|tier| tier.contains(count))
}

/// Points of the first tier containing `count`, or 0 when no tier matches.
#[must_use]
pub fn lookup_checkin_points(count: i32, tiers: &[CheckinTier]) -> i32 {
    find_tier(count, tiers).map_or(0, |tier| tier.points)
}

/// Label of the first tier containing `count`.
#[must_use]
pub fn lookup_checkin_level(count: i32, tiers: &[CheckinTier]) -> Option<String> {
    find_tier(count, tiers).map(|tier| tier.label.clone())
}

fn check_range(violations: &mut Vec<String>, name: &str, value: i32, max: i32) {
    if !(0..=max).contains(&value) {
        violations.push(format!("{name}超出范围，合法范围: 0-{max}，当前值: {value}"));
    }
}

fn check_non_negative(violations: &mut Vec<String>, name: &str, value: i32) {
    if value < 0 {
        violations.push(format!("{name}不能为负数，当前值: {value}"));
    }
}

/// Rejects out-of-range counters, listing every offending dimension.
pub fn validate_dimension_input(input: &DimensionInput) -> Result<()> {
    let mut violations = Vec::new();

    check_range(&mut violations, "社群活跃度积分", input.community_activity_points, 100);
    check_range(&mut violations, "任务完成积分", input.task_completion_points, 100);
    check_non_negative(&mut violations, "违规处理次数", input.violation_handling_count);
    check_non_negative(&mut violations, "公告发布次数", input.announcement_count);
    check_range(&mut violations, "活动举办积分", input.event_hosting_points, 250);
    check_range(&mut violations, "生日福利积分", input.birthday_bonus_points, 25);
    check_range(&mut violations, "月度优秀评议积分", input.monthly_excellent_points, 30);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation { violations })
    }
}

/// Validates `input` and derives its points and raw mini-coins.
pub fn calculate_member_points(
    input: &DimensionInput,
    config: &ConfigSnapshot,
) -> Result<DimensionResult> {
    validate_dimension_input(input)?;
    Ok(score(input, config))
}

/// Derives points for a stored record without range checks.
#[must_use]
pub fn score_record(record: &salary_record::Model, config: &ConfigSnapshot) -> DimensionResult {
    score(&DimensionInput::from(record), config)
}

fn saturate(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

fn score(input: &DimensionInput, config: &ConfigSnapshot) -> DimensionResult {
    let checkin_points = lookup_checkin_points(input.checkin_count, &config.checkin_tiers);
    let violation_handling_points =
        i64::from(input.violation_handling_count) * i64::from(VIOLATION_HANDLING_MULTIPLIER);
    let announcement_points =
        i64::from(input.announcement_count) * i64::from(ANNOUNCEMENT_MULTIPLIER);

    let base_points = i64::from(input.community_activity_points)
        + i64::from(checkin_points)
        + violation_handling_points
        + i64::from(input.task_completion_points)
        + announcement_points;
    let bonus_points = i64::from(input.event_hosting_points)
        + i64::from(input.birthday_bonus_points)
        + i64::from(input.monthly_excellent_points);
    let total_points = base_points + bonus_points;
    let mini_coins = total_points * i64::from(config.points_to_coins_ratio);

    DimensionResult {
        base_points: saturate(base_points),
        bonus_points: saturate(bonus_points),
        total_points: saturate(total_points),
        mini_coins: saturate(mini_coins),
        checkin_points,
        violation_handling_points: saturate(violation_handling_points),
        announcement_points: saturate(announcement_points),
        checkin_level: lookup_checkin_level(input.checkin_count, &config.checkin_tiers),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::core::salary_config::default_checkin_tiers;
    use proptest::prelude::*;

    fn sample_input() -> DimensionInput {
        DimensionInput {
            community_activity_points: 50,
            checkin_count: 35,
            violation_handling_count: 4,
            task_completion_points: 60,
            announcement_count: 2,
            event_hosting_points: 100,
            birthday_bonus_points: 25,
            monthly_excellent_points: 30,
        }
    }

    #[test]
    fn test_checkin_tier_lookup() {
        let tiers = default_checkin_tiers();
        assert_eq!(lookup_checkin_points(15, &tiers), -20);
        assert_eq!(lookup_checkin_points(20, &tiers), -10);
        assert_eq!(lookup_checkin_points(35, &tiers), 0);
        assert_eq!(lookup_checkin_points(49, &tiers), 30);
        assert_eq!(lookup_checkin_points(999, &tiers), 50);
        assert_eq!(lookup_checkin_points(-5, &tiers), lookup_checkin_points(0, &tiers));
        assert_eq!(lookup_checkin_points(1000, &tiers), 0);
        assert_eq!(lookup_checkin_points(10, &[]), 0);
    }

    #[test]
    fn test_checkin_level_lookup() {
        let tiers = default_checkin_tiers();
        assert_eq!(lookup_checkin_level(35, &tiers).as_deref(), Some("合格"));
        assert_eq!(lookup_checkin_level(-1, &tiers).as_deref(), Some("不合格"));
        assert_eq!(lookup_checkin_level(5000, &tiers), None);
    }

    #[test]
    fn test_calculate_member_points() {
        let result = calculate_member_points(&sample_input(), &ConfigSnapshot::default()).unwrap();

        assert_eq!(result.checkin_points, 0);
        assert_eq!(result.violation_handling_points, 12);
        assert_eq!(result.announcement_points, 10);
        assert_eq!(result.base_points, 50 + 12 + 60 + 10);
        assert_eq!(result.bonus_points, 155);
        assert_eq!(result.total_points, 132 + 155);
        assert_eq!(result.mini_coins, 287 * 2);
        assert_eq!(result.checkin_level.as_deref(), Some("合格"));
    }

    #[test]
    fn test_ratio_comes_from_snapshot() {
        let config = ConfigSnapshot {
            points_to_coins_ratio: 3,
            ..ConfigSnapshot::default()
        };
        let result = calculate_member_points(&sample_input(), &config).unwrap();
        assert_eq!(result.mini_coins, result.total_points * 3);
    }

    #[test]
    fn test_each_out_of_range_dimension_is_named() {
        let cases: [(DimensionInput, &str); 7] = [
            (
                DimensionInput {
                    community_activity_points: 101,
                    ..sample_input()
                },
                "社群活跃度积分",
            ),
            (
                DimensionInput {
                    task_completion_points: -1,
                    ..sample_input()
                },
                "任务完成积分",
            ),
            (
                DimensionInput {
                    violation_handling_count: -1,
                    ..sample_input()
                },
                "违规处理次数不能为负数",
            ),
            (
                DimensionInput {
                    announcement_count: -3,
                    ..sample_input()
                },
                "公告发布次数不能为负数",
            ),
            (
                DimensionInput {
                    event_hosting_points: 251,
                    ..sample_input()
                },
                "活动举办积分",
            ),
            (
                DimensionInput {
                    birthday_bonus_points: 26,
                    ..sample_input()
                },
                "生日福利积分",
            ),
            (
                DimensionInput {
                    monthly_excellent_points: 31,
                    ..sample_input()
                },
                "月度优秀评议积分",
            ),
        ];

        for (input, name) in cases {
            let Err(Error::Validation { violations }) = validate_dimension_input(&input) else {
                panic!("{name} should be rejected");
            };
            assert_eq!(violations.len(), 1);
            assert!(violations[0].contains(name), "{} lacks {name}", violations[0]);
        }
    }

    #[test]
    fn test_all_violations_reported_together() {
        let input = DimensionInput {
            community_activity_points: -1,
            monthly_excellent_points: 99,
            ..sample_input()
        };
        let Err(Error::Validation { violations }) = validate_dimension_input(&input) else {
            panic!("expected validation error");
        };
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_score_record_skips_validation() {
        let record = salary_record::Model {
            community_activity_points: 500,
            ..crate::test_utils::blank_record(1, "2024-01")
        };
        let result = score_record(&record, &ConfigSnapshot::default());
        assert_eq!(result.base_points, 500 - 20);
    }

    fn valid_input() -> impl Strategy<Value = DimensionInput> {
        (
            0..=100i32,
            -10..1200i32,
            0..1000i32,
            0..=100i32,
            0..1000i32,
            0..=250i32,
            0..=25i32,
            0..=30i32,
        )
            .prop_map(
                |(community, checkin, violations, task, announcements, event, birthday, excellent)| {
                    DimensionInput {
                        community_activity_points: community,
                        checkin_count: checkin,
                        violation_handling_count: violations,
                        task_completion_points: task,
                        announcement_count: announcements,
                        event_hosting_points: event,
                        birthday_bonus_points: birthday,
                        monthly_excellent_points: excellent,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn prop_dimension_summation(input in valid_input(), ratio in 1..5i32) {
            let config = ConfigSnapshot {
                points_to_coins_ratio: ratio,
                ..ConfigSnapshot::default()
            };
            let result = calculate_member_points(&input, &config).unwrap();

            let checkin = lookup_checkin_points(input.checkin_count, &config.checkin_tiers);
            prop_assert_eq!(
                result.base_points,
                input.community_activity_points
                    + checkin
                    + input.violation_handling_count * 3
                    + input.task_completion_points
                    + input.announcement_count * 5
            );
            prop_assert_eq!(
                result.bonus_points,
                input.event_hosting_points + input.birthday_bonus_points + input.monthly_excellent_points
            );
            prop_assert_eq!(result.total_points, result.base_points + result.bonus_points);
            prop_assert_eq!(result.mini_coins, result.total_points * ratio);
        }
    }
}
