//! Subscription value arithmetic.
//!
//! A month counts as fully used at [`BREAK_EVEN_HOURS`] of viewing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{check_range, require_fee};
use crate::mcp::registry::{Tool, ToolCallResult, ToolError, ToolOutput};
use crate::ott::{format_won, normalize_platform, SubscriptionCatalog};

/// Hours of viewing that make a month "worth it".
pub const BREAK_EVEN_HOURS: f64 = 30.0;

/// Share of monthly value one movie is worth, in percent.
const MOVIE_PERCENT: f64 = 10.0;

/// Share of monthly value one series episode is worth, in percent.
const EPISODE_PERCENT: f64 = 3.3;

/// Percentage of the monthly value used after `hours` of viewing, capped at 100.
#[must_use]
pub fn usage_percentage(hours: f64) -> f64 {
    (hours * 100.0 / BREAK_EVEN_HOURS).min(100.0)
}

/// `calculate_usage`
pub struct CalculateUsage {
    catalog: Arc<SubscriptionCatalog>,
}

impl CalculateUsage {
    /// Creates the tool over a fee catalogue.
    #[must_use]
    pub const fn new(catalog: Arc<SubscriptionCatalog>) -> Self {
        Self { catalog }
    }
}

/// Parameters for `calculate_usage`.
#[derive(Debug, Deserialize)]
pub struct UsageParams {
    /// Platform key, e.g. `netflix`.
    pub platform: String,
    /// Hours watched this month.
    pub watched_hours: f64,
}

#[async_trait]
impl Tool for CalculateUsage {
    type Params = UsageParams;

    fn name(&self) -> &'static str {
        "calculate_usage"
    }

    fn description(&self) -> &'static str {
        "Calculate what percentage of this month's OTT subscription value has been used"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "platform": {
                    "type": "string",
                    "description": "OTT platform (netflix, watcha, tving, wavve, disney, apple, amazon)"
                },
                "watched_hours": {
                    "type": "number",
                    "minimum": 0,
                    "description": "Hours watched this month"
                }
            },
            "required": ["platform", "watched_hours"]
        })
    }

    async fn call(&self, params: UsageParams) -> Result<ToolOutput, ToolError> {
        let fee = require_fee(&self.catalog, &params.platform)?;
        check_range("watched_hours", params.watched_hours, 0.0..=f64::MAX)?;

        let platform = normalize_platform(&params.platform);
        let hours = params.watched_hours;
        let percentage = usage_percentage(hours);

        let headline = if percentage >= 100.0 {
            format!(
                "🎉 Great! You've watched {hours:.1} hours on {platform}, using {percentage:.1}% of your subscription value!"
            )
        } else if percentage >= 80.0 {
            format!("👍 Good job! {percentage:.1}% used on {platform}. Almost at full value!")
        } else if percentage >= 50.0 {
            format!("📺 {percentage:.1}% used on {platform}. Consider a weekend binge-watch!")
        } else {
            format!("😅 Only {percentage:.1}% used on {platform}. Time to watch something tonight?")
        };

        let text = format!(
            "{headline}\nMonthly fee: {} (full value at {BREAK_EVEN_HOURS} hours)",
            format_won(u64::from(fee))
        );
        Ok(ToolCallResult::text(text).into())
    }
}

/// `calculate_remaining`
pub struct CalculateRemaining {
    catalog: Arc<SubscriptionCatalog>,
}

impl CalculateRemaining {
    /// Creates the tool over a fee catalogue.
    #[must_use]
    pub const fn new(catalog: Arc<SubscriptionCatalog>) -> Self {
        Self { catalog }
    }
}

/// Parameters for `calculate_remaining`.
#[derive(Debug, Deserialize)]
pub struct RemainingParams {
    /// Platform key, e.g. `netflix`.
    pub platform: String,
    /// Value already used, in percent.
    pub current_percentage: f64,
}

#[async_trait]
impl Tool for CalculateRemaining {
    type Params = RemainingParams;

    fn name(&self) -> &'static str {
        "calculate_remaining"
    }

    fn description(&self) -> &'static str {
        "Calculate how many more movies or episodes are needed to get full subscription value"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "platform": {
                    "type": "string",
                    "description": "OTT platform"
                },
                "current_percentage": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 100,
                    "description": "Current usage percentage"
                }
            },
            "required": ["platform", "current_percentage"]
        })
    }

    async fn call(&self, params: RemainingParams) -> Result<ToolOutput, ToolError> {
        require_fee(&self.catalog, &params.platform)?;
        check_range("current_percentage", params.current_percentage, 0.0..=100.0)?;

        let platform = normalize_platform(&params.platform);
        let current = params.current_percentage;
        let remaining = 100.0 - current;

        if remaining <= 0.0 {
            return Ok(ToolCallResult::text(format!(
                "🎉 {platform}: you've already got full value this month!"
            ))
            .into());
        }

        let movies = remaining / MOVIE_PERCENT;
        let episodes = remaining / EPISODE_PERCENT;
        let text = format!(
            "📊 {platform} usage analysis\n\
             Current usage: {current:.1}%\n\
             To reach 100% value:\n\
             • Watch {movies:.0} more movies OR\n\
             • Watch {episodes:.0} more drama episodes\n\
             💡 Tip: Weekend binge-watching is the way to go!"
        );
        Ok(ToolCallResult::text(text).into())
    }
}
