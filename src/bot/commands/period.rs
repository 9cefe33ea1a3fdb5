//! Period Discord commands - create, list, calculate and archive periods.
//!
//! Each subcommand forwards to `core::period`; errors are reported to the user by the
//! framework's error handler.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, operator_id},
        core::{period, period_format},
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Parent command for the period lifecycle.
    #[poise::command(
        slash_command,
        rename = "period",
        subcommands(
            "period_create",
            "period_list",
            "period_latest",
            "period_calculate",
            "period_archive"
        )
    )]
    pub async fn period_manage(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Period command. Available subcommands:\n\
            `/period create` - Open a period\n\
            `/period list` - List periods\n\
            `/period latest` - Show the newest open period\n\
            `/period calculate` - Score and distribute a period\n\
            `/period archive` - Freeze a period";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Opens a period with one zero-valued record per salaried member.
    #[poise::command(slash_command, rename = "create")]
    pub async fn period_create(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Period to open (YYYY-MM). Defaults to the current month."]
        #[autocomplete = "autocomplete::autocomplete_period"]
        period: Option<String>,
    ) -> Result<()> {
        let period = period.unwrap_or_else(period_format::current_period);
        let operator = operator_id(ctx)?;
        let db = &ctx.data().database;

        let records = period::create_period(db, operator, &period).await?;
        ctx.say(format!(
            "✅ Opened period **{period}** with {} salary records.",
            records.len()
        ))
        .await?;
        Ok(())
    }

    /// Lists every period, newest first.
    #[poise::command(slash_command, rename = "list")]
    pub async fn period_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let periods = period::get_period_list(db).await?;

        if periods.is_empty() {
            ctx.say("📅 No periods yet. Open one with `/period create`.")
                .await?;
            return Ok(());
        }

        let mut text = String::from("📅 **Periods**\n");
        for p in &periods {
            writeln!(
                text,
                "• `{}` - {} records - {}",
                p.period,
                p.record_count,
                if p.archived { "🔒 archived" } else { "🟢 open" }
            )?;
        }
        ctx.say(text).await?;
        Ok(())
    }

    /// Shows the newest period that still has unarchived records.
    #[poise::command(slash_command, rename = "latest")]
    pub async fn period_latest(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        match period::get_latest_active_period(db).await? {
            Some(p) => ctx.say(format!("🟢 Latest open period: **{p}**")).await?,
            None => ctx.say("ℹ️ No open period.").await?,
        };
        Ok(())
    }

    /// Scores every record of a period and distributes the salary pool.
    #[poise::command(slash_command, rename = "calculate")]
    pub async fn period_calculate(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Period to calculate (YYYY-MM)"]
        #[autocomplete = "autocomplete::autocomplete_period"]
        period: String,
    ) -> Result<()> {
        ctx.defer().await?;
        let db = &ctx.data().database;

        let records = period::calculate_and_distribute(db, &period).await?;
        let total: i64 = records.iter().map(|r| i64::from(r.mini_coins)).sum();
        ctx.say(format!(
            "✅ Calculated **{period}**: {} records, {total} mini-coins allocated.",
            records.len()
        ))
        .await?;
        Ok(())
    }

    /// Archives a period. Archived periods can no longer be modified.
    #[poise::command(slash_command, rename = "archive")]
    pub async fn period_archive(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Period to archive (YYYY-MM)"]
        #[autocomplete = "autocomplete::autocomplete_period"]
        period: String,
    ) -> Result<()> {
        let operator = operator_id(ctx)?;
        let db = &ctx.data().database;

        let count = period::archive_salary_records(db, operator, &period).await?;
        if count == 0 {
            ctx.say(format!("ℹ️ Period **{period}** has no records to archive."))
                .await?;
        } else {
            ctx.say(format!("🔒 Archived {count} records for **{period}**."))
                .await?;
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
