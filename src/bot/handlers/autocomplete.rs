//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggests existing periods, newest first, so users rarely have to type `YYYY-MM`.

use crate::{
    bot::BotData,
    core::{period, period_format},
    errors::Error,
};

/// Provides autocomplete suggestions for period strings.
///
/// Known periods containing the partial input come first, newest first; the current
/// month is offered as well when it has not been opened yet.
///
/// # Arguments
/// * `ctx` - The poise context containing the database connection
/// * `partial` - The partial string the user has typed so far
pub async fn autocomplete_period(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;

    let Ok(periods) = period::get_period_list(db).await else {
        return Vec::new();
    };

    let mut matching: Vec<String> = periods
        .into_iter()
        .map(|p| p.period)
        .filter(|p| p.contains(partial))
        .take(25) // Discord autocomplete limit
        .collect();

    let current = period_format::current_period();
    if current.contains(partial) && !matching.contains(&current) && matching.len() < 25 {
        matching.insert(0, current);
    }
    matching
}
