//! Audit trail for privileged salary operations.
//!
//! Entries are appended through the caller's connection so they commit or roll back
//! together with the change they describe.

use crate::{
    entities::{AuditLog, audit_log},
    errors::Result,
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// Action recorded when a period's records are archived.
pub const SALARY_ARCHIVE: &str = "SALARY_ARCHIVE";
/// Action recorded when a manually edited batch is saved.
pub const SALARY_BATCH_SAVE: &str = "SALARY_BATCH_SAVE";
/// Action recorded when a period is created.
pub const SALARY_PERIOD_CREATE: &str = "SALARY_PERIOD_CREATE";

/// Appends one audit entry.
pub async fn record<C>(
    db: &C,
    operator_id: i64,
    action: &str,
    detail: String,
) -> Result<audit_log::Model>
where
    C: ConnectionTrait,
{
    debug!(operator_id, action, "Recording audit entry");
    let entry = audit_log::ActiveModel {
        operator_id: Set(operator_id),
        action: Set(action.to_string()),
        detail: Set(detail),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(entry.insert(db).await?)
}

/// Audit entries for one action, oldest first.
pub async fn entries_for_action<C>(db: &C, action: &str) -> Result<Vec<audit_log::Model>>
where
    C: ConnectionTrait,
{
    AuditLog::find()
        .filter(audit_log::Column::Action.eq(action))
        .order_by_asc(audit_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renders "N 条，用户ID: a, b, c" for audit details.
#[must_use]
pub fn describe_user_ids(user_ids: &[i64]) -> String {
    let ids: Vec<String> = user_ids.iter().map(ToString::to_string).collect();
    format!("{} 条，用户ID: {}", user_ids.len(), ids.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_describe_user_ids() {
        assert_eq!(describe_user_ids(&[3, 1, 2]), "3 条，用户ID: 3, 1, 2");
        assert_eq!(describe_user_ids(&[]), "0 条，用户ID: ");
    }

    #[tokio::test]
    async fn test_record_and_query() -> Result<()> {
        let db = setup_test_db().await?;
        record(&db, 7, SALARY_ARCHIVE, "first".to_string()).await?;
        record(&db, 8, SALARY_BATCH_SAVE, "other".to_string()).await?;
        record(&db, 9, SALARY_ARCHIVE, "second".to_string()).await?;

        let entries = entries_for_action(&db, SALARY_ARCHIVE).await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operator_id, 7);
        assert_eq!(entries[1].detail, "second");

        Ok(())
    }
}
