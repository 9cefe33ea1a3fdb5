//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Pollen Salary Help**\n\
        Periods are written `YYYY-MM`.\n\n\
        **Period Commands**\n\
        • `/period create [period]` - Opens a period with one record per salaried member.\n\
        • `/period list` - Lists every period with its record count and archive status.\n\
        • `/period latest` - Shows the newest period that is still open.\n\
        • `/period calculate <period>` - Scores every record and distributes the pool.\n\
        • `/period archive <period>` - Freezes a period. This cannot be undone.\n\n\
        **Salary Commands**\n\
        • `/salary members <period>` - Shows the roster with each member's record.\n\
        • `/salary set <record_id> ...` - Edits one record's dimensions or mini-coins.\n\
        • `/salary batch <period> <user:coins,...>` - Saves manual mini-coins for the whole roster.\n\
        • `/salary report <period>` - Shows the reconciled salary report.\n\
        • `/salary stats <period>` - Shows pool usage and the mini-coin ranking.\n\
        • `/salary rotation <period>` - Lists promotion, demotion and dismissal candidates.\n\n\
        **Configuration Commands**\n\
        • `/config show` - Shows the effective salary configuration.\n\
        • `/config set <key> <value>` - Changes one setting after validation.\n\
        • `/config tiers` - Shows the check-in reward table.\n\
        • `/config set_tiers <json>` - Replaces the check-in reward table.\n\n\
        **Utility Commands**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
