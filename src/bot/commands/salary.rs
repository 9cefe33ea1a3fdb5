//! Salary Discord commands - roster, edits, reports and rotation review.
//!
//! This module contains commands that read and edit salary records through the core
//! modules. Manual batch edits are entered as `user_id:mini_coins` pairs.

use crate::{
    core::batch::BatchRecord,
    errors::{Error, Result},
};

/// Parses `"12:300, 13:350"` into batch rows.
pub fn parse_batch_entries(text: &str) -> Result<Vec<BatchRecord>> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || Error::validation(format!("Invalid entry '{entry}', expected user_id:mini_coins"));
            let (user, coins) = entry.split_once(':').ok_or_else(invalid)?;
            Ok(BatchRecord {
                user_id: user.trim().parse().map_err(|_| invalid())?,
                mini_coins: coins.trim().parse().map_err(|_| invalid())?,
                remark: None,
                version: None,
            })
        })
        .collect()
}

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use super::parse_batch_entries;
    use crate::{
        bot::{BotData, handlers::autocomplete, operator_id},
        core::{
            batch,
            period::{self, SalaryRecordUpdate},
            report, rotation,
        },
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Parent command for salary records.
    #[poise::command(
        slash_command,
        rename = "salary",
        subcommands(
            "salary_members",
            "salary_set",
            "salary_batch",
            "salary_report",
            "salary_stats",
            "salary_rotation"
        )
    )]
    pub async fn salary_manage(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Salary command. Available subcommands:\n\
            `/salary members` - Roster with records\n\
            `/salary set` - Edit one record\n\
            `/salary batch` - Save manual mini-coins for the roster\n\
            `/salary report` - Reconciled report\n\
            `/salary stats` - Pool usage and ranking\n\
            `/salary rotation` - Rotation candidates";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Shows the salaried roster with each member's record for a period.
    #[poise::command(slash_command, rename = "members")]
    pub async fn salary_members(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Period (YYYY-MM)"]
        #[autocomplete = "autocomplete::autocomplete_period"]
        period: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let members = period::get_salary_members(db, &period).await?;

        let mut text = format!("👥 **Roster for {period}**\n");
        for m in &members {
            match &m.record {
                Some(r) => writeln!(
                    text,
                    "• {} ({}) - record #{} v{} - {} points - {} mini-coins",
                    m.username, m.role, r.id, r.version, r.total_points, r.mini_coins
                )?,
                None => writeln!(text, "• {} ({}) - no record", m.username, m.role)?,
            }
        }
        ctx.say(text).await?;
        Ok(())
    }

    /// Edits one salary record. Omitted fields are left unchanged.
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command, rename = "set")]
    pub async fn salary_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Record id (see /salary members)"] record_id: i64,
        #[description = "Community activity points (0-100)"] community_activity: Option<i32>,
        #[description = "Check-in count"] checkin_count: Option<i32>,
        #[description = "Violations handled"] violations_handled: Option<i32>,
        #[description = "Task completion points (0-100)"] task_completion: Option<i32>,
        #[description = "Announcements published"] announcements: Option<i32>,
        #[description = "Event hosting points (0-250)"] event_hosting: Option<i32>,
        #[description = "Birthday bonus points (0-25)"] birthday_bonus: Option<i32>,
        #[description = "Monthly excellence points (0-30)"] monthly_excellent: Option<i32>,
        #[description = "Final mini-coins"] mini_coins: Option<i32>,
        #[description = "Remark"] remark: Option<String>,
        #[description = "Version you are editing (from /salary members)"] version: Option<i32>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let update = SalaryRecordUpdate {
            community_activity_points: community_activity,
            checkin_count,
            violation_handling_count: violations_handled,
            task_completion_points: task_completion,
            announcement_count: announcements,
            event_hosting_points: event_hosting,
            birthday_bonus_points: birthday_bonus,
            monthly_excellent_points: monthly_excellent,
            mini_coins,
            remark,
            expected_version: version,
            ..Default::default()
        };

        let record = period::update_salary_record(db, record_id, &update).await?;
        ctx.say(format!(
            "✅ Record #{} for {} updated (version {}).",
            record.id, record.period, record.version
        ))
        .await?;
        Ok(())
    }

    /// Saves manually edited mini-coins for the whole roster of a period.
    #[poise::command(slash_command, rename = "batch")]
    pub async fn salary_batch(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Period (YYYY-MM)"]
        #[autocomplete = "autocomplete::autocomplete_period"]
        period: String,
        #[description = "Comma-separated user_id:mini_coins pairs, e.g. 1:400,2:350"]
        entries: String,
    ) -> Result<()> {
        let records = parse_batch_entries(&entries)?;
        let operator = operator_id(ctx)?;
        let db = &ctx.data().database;

        let response = batch::batch_save_with_validation(db, &records, operator, &period).await?;
        if response.success {
            ctx.say(format!(
                "✅ Saved {} records for **{period}**.",
                response.saved_records.len()
            ))
            .await?;
            return Ok(());
        }

        let mut text = String::from("❌ Batch rejected, nothing was saved.\n");
        if let Some(global) = &response.global_error {
            writeln!(text, "**{global}**")?;
        }
        for v in &response.violations {
            writeln!(text, "• user {} `{}`: {}", v.user_id, v.field, v.message)?;
        }
        ctx.say(text).await?;
        Ok(())
    }

    /// Shows the reconciled salary report for a period.
    #[poise::command(slash_command, rename = "report")]
    pub async fn salary_report(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Period (YYYY-MM)"]
        #[autocomplete = "autocomplete::autocomplete_period"]
        period: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let salary_report = report::generate_salary_report(db, &period).await?;
        let summary = report::format_salary_report_summary(&salary_report)?;
        ctx.say(format!("📊 **Salary Report**\n```\n{summary}```")).await?;
        Ok(())
    }

    /// Shows pool usage and the mini-coin ranking for a period.
    #[poise::command(slash_command, rename = "stats")]
    pub async fn salary_stats(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Period (YYYY-MM)"]
        #[autocomplete = "autocomplete::autocomplete_period"]
        period: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let stats = report::generate_salary_stats(db, &period).await?;

        let mut text = format!(
            "📈 **Pool usage {period}**\n{} / {}\n{}\n",
            stats.allocated,
            stats.total_pool,
            report::format_usage_bar(stats.usage_rate, None)
        );
        for (rank, entry) in stats.ranking.iter().enumerate() {
            writeln!(
                text,
                "{}. {} - {} mini-coins ({} points)",
                rank + 1,
                entry.username,
                entry.mini_coins,
                entry.total_points
            )?;
        }
        ctx.say(text).await?;
        Ok(())
    }

    /// Lists promotion, demotion and dismissal candidates.
    #[poise::command(slash_command, rename = "rotation")]
    pub async fn salary_rotation(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Period whose points decide promotion (YYYY-MM)"]
        #[autocomplete = "autocomplete::autocomplete_period"]
        period: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let review = rotation::review_rotation(db, &period).await?;

        let names = |members: &[crate::entities::MemberModel]| {
            if members.is_empty() {
                "-".to_string()
            } else {
                members
                    .iter()
                    .map(|m| m.username.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        };

        ctx.say(format!(
            "🔄 **Rotation review {period}**\n\
            Promotion eligible: {}\n\
            Demotion candidates: {}\n\
            Dismissal candidates: {}\n\
            Review triggered: {}",
            names(&review.promotion_eligible),
            names(&review.demotion_candidates),
            names(&review.dismissal_candidates),
            if review.review_triggered { "yes" } else { "no" }
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
