//! Config Discord commands - inspect and change salary settings.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::salary_config::{self, CheckinTier},
        errors::{Error, Result},
    };
    use std::{collections::BTreeMap, fmt::Write};

    /// Parent command for salary configuration.
    #[poise::command(
        slash_command,
        rename = "config",
        subcommands("config_show", "config_set", "config_tiers", "config_set_tiers")
    )]
    pub async fn config_manage(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Config command. Available subcommands:\n\
            `/config show` - Effective settings\n\
            `/config set` - Change one setting\n\
            `/config tiers` - Check-in tier table\n\
            `/config set_tiers` - Replace the check-in tier table";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Shows the effective salary settings, defaults included.
    #[poise::command(slash_command, rename = "show")]
    pub async fn config_show(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let config = salary_config::load_snapshot(db).await?;
        let rotation = &config.rotation;

        let text = format!(
            "⚙️ **Salary settings**\n\
            • Pool total: {}\n\
            • Formal members: {}\n\
            • Base allocation: {}\n\
            • Mini-coins range: {}-{}\n\
            • Points per mini-coin: {}\n\
            • Promotion threshold: {} points\n\
            • Demotion: below {} mini-coins for {} periods\n\
            • Dismissal: below {} points for {} periods",
            config.salary_pool_total,
            config.formal_member_count,
            config.base_allocation,
            config.mini_coins_min,
            config.mini_coins_max,
            config.points_to_coins_ratio,
            rotation.promotion_points_threshold,
            rotation.demotion_salary_threshold,
            rotation.demotion_consecutive_months,
            rotation.dismissal_points_threshold,
            rotation.dismissal_consecutive_months,
        );
        ctx.say(text).await?;
        Ok(())
    }

    /// Changes one setting after validating it against the stored configuration.
    #[poise::command(slash_command, rename = "set")]
    pub async fn config_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Setting key, e.g. salary_pool_total"] key: String,
        #[description = "New value"] value: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let mut entries = BTreeMap::new();
        entries.insert(key.clone(), value.clone());

        salary_config::save_config(db, &entries).await?;
        ctx.say(format!("✅ `{key}` set to `{value}`.")).await?;
        Ok(())
    }

    /// Shows the check-in tier table.
    #[poise::command(slash_command, rename = "tiers")]
    pub async fn config_tiers(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let tiers = salary_config::get_checkin_tiers(db).await?;

        let mut text = String::from("📋 **Check-in tiers**\n");
        for tier in &tiers {
            writeln!(
                text,
                "• {}-{} check-ins: {:+} points ({})",
                tier.min_count, tier.max_count, tier.points, tier.label
            )?;
        }
        ctx.say(text).await?;
        Ok(())
    }

    /// Replaces the check-in tier table with a JSON array.
    #[poise::command(slash_command, rename = "set_tiers")]
    pub async fn config_set_tiers(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "JSON array of {minCount, maxCount, points, label}"] tiers: String,
    ) -> Result<()> {
        let parsed: Vec<CheckinTier> = serde_json::from_str(&tiers)?;
        let db = &ctx.data().database;

        salary_config::save_checkin_tiers(db, &parsed).await?;
        ctx.say(format!("✅ Saved {} check-in tiers.", parsed.len()))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
