//! Member rotation checks driven by the configured thresholds.
//!
//! Read-only: these functions flag members for review, changing roles stays with the
//! member directory.

use crate::{
    core::{
        member::{self, Role},
        period_format::ensure_valid_period,
        salary_config,
    },
    entities::{SalaryRecord, member as member_entity, salary_record},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Outcome of a full rotation review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationReview {
    /// Interns who reached the promotion threshold
    pub promotion_eligible: Vec<member_entity::Model>,
    /// Formal members under the salary threshold for consecutive archived periods
    pub demotion_candidates: Vec<member_entity::Model>,
    /// Interns under the dismissal threshold for consecutive archived periods
    pub dismissal_candidates: Vec<member_entity::Model>,
    /// True when someone can be promoted and someone demoted
    pub review_triggered: bool,
}

/// Archived records per user, newest period first.
async fn archived_history<C>(
    db: &C,
    user_ids: Vec<i64>,
) -> Result<HashMap<i64, Vec<salary_record::Model>>>
where
    C: ConnectionTrait,
{
    let records = SalaryRecord::find()
        .filter(salary_record::Column::UserId.is_in(user_ids))
        .filter(salary_record::Column::Archived.eq(true))
        .order_by_desc(salary_record::Column::Period)
        .all(db)
        .await?;

    let mut history: HashMap<i64, Vec<salary_record::Model>> = HashMap::new();
    for record in records {
        history.entry(record.user_id).or_default().push(record);
    }
    Ok(history)
}

/// Whether the newest `months` entries of `history` exist and all satisfy `below`.
fn below_for_consecutive_periods(
    history: Option<&Vec<salary_record::Model>>,
    months: i32,
    below: impl Fn(&salary_record::Model) -> bool,
) -> bool {
    let Ok(months) = usize::try_from(months) else {
        return false;
    };
    if months == 0 {
        return false;
    }
    history.is_some_and(|records| records.len() >= months && records[..months].iter().all(below))
}

/// Vice-leaders and members whose last `demotion_consecutive_months` archived periods all
/// paid below `demotion_salary_threshold`.
pub async fn check_demotion_candidates<C>(db: &C) -> Result<Vec<member_entity::Model>>
where
    C: ConnectionTrait,
{
    let thresholds = salary_config::get_rotation_thresholds(db).await?;
    let members = member::find_members_by_roles(db, &[Role::ViceLeader, Role::Member]).await?;
    let history = archived_history(db, members.iter().map(|m| m.id).collect()).await?;

    Ok(members
        .into_iter()
        .filter(|m| {
            below_for_consecutive_periods(
                history.get(&m.id),
                thresholds.demotion_consecutive_months,
                |r| r.mini_coins < thresholds.demotion_salary_threshold,
            )
        })
        .collect())
}

/// Interns whose `total_points` in `period` reached `promotion_points_threshold`.
pub async fn check_promotion_eligibility<C>(db: &C, period: &str) -> Result<Vec<member_entity::Model>>
where
    C: ConnectionTrait,
{
    ensure_valid_period(period)?;
    let thresholds = salary_config::get_rotation_thresholds(db).await?;
    let interns = member::find_members_by_roles(db, &[Role::Intern]).await?;

    let points: HashMap<i64, i32> = SalaryRecord::find()
        .filter(salary_record::Column::Period.eq(period))
        .filter(salary_record::Column::UserId.is_in(interns.iter().map(|m| m.id)))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.user_id, r.total_points))
        .collect();

    Ok(interns
        .into_iter()
        .filter(|m| {
            points
                .get(&m.id)
                .is_some_and(|p| *p >= thresholds.promotion_points_threshold)
        })
        .collect())
}

/// Interns whose last `dismissal_consecutive_months` archived periods all scored below
/// `dismissal_points_threshold`.
pub async fn check_dismissal_candidates<C>(db: &C) -> Result<Vec<member_entity::Model>>
where
    C: ConnectionTrait,
{
    let thresholds = salary_config::get_rotation_thresholds(db).await?;
    let interns = member::find_members_by_roles(db, &[Role::Intern]).await?;
    let history = archived_history(db, interns.iter().map(|m| m.id).collect()).await?;

    Ok(interns
        .into_iter()
        .filter(|m| {
            below_for_consecutive_periods(
                history.get(&m.id),
                thresholds.dismissal_consecutive_months,
                |r| r.total_points < thresholds.dismissal_points_threshold,
            )
        })
        .collect())
}

/// Runs every rotation check against `period`.
pub async fn review_rotation<C>(db: &C, period: &str) -> Result<RotationReview>
where
    C: ConnectionTrait,
{
    let promotion_eligible = check_promotion_eligibility(db, period).await?;
    let demotion_candidates = check_demotion_candidates(db).await?;
    let dismissal_candidates = check_dismissal_candidates(db).await?;
    let review_triggered = !promotion_eligible.is_empty() && !demotion_candidates.is_empty();

    info!(
        promotion = promotion_eligible.len(),
        demotion = demotion_candidates.len(),
        dismissal = dismissal_candidates.len(),
        review_triggered,
        "Rotation review for {period}"
    );

    Ok(RotationReview {
        promotion_eligible,
        demotion_candidates,
        dismissal_candidates,
        review_triggered,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::period::{archive_salary_records, create_period};
    use crate::test_utils::*;
    use sea_orm::DatabaseConnection;

    const OPERATOR: i64 = 1;

    /// Opens, scores and archives `period`, giving each member `(mini_coins, total_points)`.
    async fn archived_period(
        db: &DatabaseConnection,
        period: &str,
        outcomes: &HashMap<i64, (i32, i32)>,
    ) -> Result<()> {
        for record in create_period(db, OPERATOR, period).await? {
            if let Some(&(coins, points)) = outcomes.get(&record.user_id) {
                set_outcome(db, record.id, coins, points).await?;
            }
        }
        archive_salary_records(db, OPERATOR, period).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_demotion_needs_consecutive_low_salary() -> Result<()> {
        let db = setup_test_db().await?;
        let vice = create_member_with_role(&db, "vice", Role::ViceLeader).await?;
        let steady = create_member_with_role(&db, "steady", Role::ViceLeader).await?;
        create_member_with_role(&db, "leader", Role::Leader).await?;

        let outcomes = HashMap::from([(vice.id, (100, 0)), (steady.id, (100, 0))]);
        archived_period(&db, "2024-01", &outcomes).await?;
        assert!(check_demotion_candidates(&db).await?.is_empty(), "one period is not enough");

        let outcomes = HashMap::from([(vice.id, (120, 0)), (steady.id, (300, 0))]);
        archived_period(&db, "2024-02", &outcomes).await?;

        let ids: Vec<i64> = check_demotion_candidates(&db)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![vice.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_promotion_uses_period_points() -> Result<()> {
        let db = setup_test_db().await?;
        let strong = create_member_with_role(&db, "strong", Role::Intern).await?;
        let weak = create_member_with_role(&db, "weak", Role::Intern).await?;
        let records = create_period(&db, OPERATOR, "2024-03").await?;
        for record in &records {
            let points = if record.user_id == strong.id { 100 } else { 99 };
            set_outcome(&db, record.id, 200, points).await?;
        }

        let ids: Vec<i64> = check_promotion_eligibility(&db, "2024-03")
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![strong.id]);
        assert!(!ids.contains(&weak.id));
        assert!(check_promotion_eligibility(&db, "2024-04").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_dismissal_and_review() -> Result<()> {
        let db = setup_test_db().await?;
        let idle = create_member_with_role(&db, "idle", Role::Intern).await?;
        let busy = create_member_with_role(&db, "busy", Role::Intern).await?;
        let vice = create_member_with_role(&db, "vice", Role::ViceLeader).await?;

        for period in ["2024-01", "2024-02"] {
            let outcomes = HashMap::from([
                (idle.id, (200, 40)),
                (busy.id, (300, 150)),
                (vice.id, (100, 0)),
            ]);
            archived_period(&db, period, &outcomes).await?;
        }
        let current = create_period(&db, OPERATOR, "2024-03").await?;
        for record in &current {
            set_outcome(&db, record.id, 300, 150).await?;
        }

        let dismissal: Vec<i64> = check_dismissal_candidates(&db)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(dismissal, vec![idle.id]);

        let review = review_rotation(&db, "2024-03").await?;
        assert!(review.review_triggered);
        assert_eq!(review.promotion_eligible.len(), 2);
        assert_eq!(review.demotion_candidates[0].id, vice.id);

        Ok(())
    }

    #[test]
    fn test_zero_months_never_flags() {
        let history = vec![blank_record(1, "2024-01")];
        assert!(!below_for_consecutive_periods(Some(&history), 0, |_| true));
        assert!(!below_for_consecutive_periods(Some(&history), -1, |_| true));
        assert!(below_for_consecutive_periods(Some(&history), 1, |_| true));
        assert!(!below_for_consecutive_periods(None, 1, |_| true));
    }
}
