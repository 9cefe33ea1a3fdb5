//! Pool distribution engine.
//!
//! Two composable phases over a fixed-order list of per-member raw mini-coins:
//! [`adjust_to_pool`] scales an over-budget list down to exactly the pool, then
//! [`performance_adjust`] clamps every member into the configured range.
//!
//! Clamping does not redistribute what it frees or consumes. When
//! `mini_coins_min × n > salary_pool_total`, raising members to the floor can push
//! the total above the pool; that configuration is not rejected anywhere and the
//! overrun is reported as-is.

use crate::core::salary_config::ConfigSnapshot;

/// `floor(a / b)` for any signs.
fn floor_div(a: i128, b: i128) -> i128 {
    let quotient = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        quotient - 1
    } else {
        quotient
    }
}

fn narrow(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Phase 1: proportional scaling onto the pool.
///
/// Returns `raw` unchanged when `raw_total ≤ pool_total`. Otherwise every member but the
/// last receives `floor(raw[i] × pool_total / raw_total)` and the last receives whatever
/// remains, so the result sums to exactly `pool_total`.
#[must_use]
pub fn adjust_to_pool(raw: &[i64], raw_total: i64, pool_total: i64) -> Vec<i64> {
    let Some((_, head)) = raw.split_last() else {
        return Vec::new();
    };
    if raw_total <= pool_total {
        return raw.to_vec();
    }

    let mut adjusted: Vec<i64> = head
        .iter()
        .map(|&coins| {
            narrow(floor_div(
                i128::from(coins) * i128::from(pool_total),
                i128::from(raw_total),
            ))
        })
        .collect();
    let allocated: i64 = adjusted.iter().sum();
    adjusted.push(pool_total - allocated);
    adjusted
}

/// Phase 2: clamps every value into `[min, max]`.
#[must_use]
pub fn performance_adjust(adjusted: &[i64], min: i64, max: i64) -> Vec<i64> {
    adjusted.iter().map(|&coins| coins.max(min).min(max)).collect()
}

/// Runs both phases with the pool and bounds from `config`.
#[must_use]
pub fn distribute(raw: &[i64], config: &ConfigSnapshot) -> Vec<i64> {
    let raw_total: i64 = raw.iter().sum();
    let adjusted = adjust_to_pool(raw, raw_total, i64::from(config.salary_pool_total));
    performance_adjust(
        &adjusted,
        i64::from(config.mini_coins_min),
        i64::from(config.mini_coins_max),
    )
}
