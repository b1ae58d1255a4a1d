//! Weekly trend report backed by a [`TrendSource`].

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::mcp::registry::{Tool, ToolCallResult, ToolError, ToolOutput};
use crate::ott::{normalize_platform, TrendSource, TrendingTitle};

/// Titles shown in the report.
pub const TOP_N: usize = 5;

const INSIGHTS: &[&str] = &[
    "Korean content keeps trending!",
    "Family movies are popular on weekends",
    "Viewers in their 20s and 30s prefer romance dramas",
];

/// `ott_trend_report`
pub struct OttTrendReport {
    source: Arc<dyn TrendSource>,
}

impl OttTrendReport {
    /// Creates the tool over a trend source.
    #[must_use]
    pub fn new(source: Arc<dyn TrendSource>) -> Self {
        Self { source }
    }
}

/// Parameters for `ott_trend_report`.
#[derive(Debug, Deserialize)]
pub struct TrendParams {
    /// Platform named in the report heading.
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_platform() -> String {
    "netflix".to_string()
}

fn insights() -> String {
    let mut text = String::from("💡 Trend insights:");
    for insight in INSIGHTS {
        let _ = write!(text, "\n• {insight}");
    }
    text
}

fn report(platform: &str, titles: &[TrendingTitle]) -> String {
    let mut text = format!(
        "📈 {} trend report for this week\n\n🔥 Top {} titles:",
        platform.to_uppercase(),
        titles.len()
    );
    for (rank, title) in titles.iter().enumerate() {
        let _ = write!(text, "\n{}. {} ⭐{:.1}", rank + 1, title.title, title.rating);
    }
    text.push_str("\n\n");
    text.push_str(&insights());
    text
}

fn unavailable(platform: &str) -> String {
    format!(
        "📈 {} trend report for this week\n\n\
         Trend data is unavailable right now 😅\n\n{}",
        platform.to_uppercase(),
        insights()
    )
}

#[async_trait]
impl Tool for OttTrendReport {
    type Params = TrendParams;

    fn name(&self) -> &'static str {
        "ott_trend_report"
    }

    fn description(&self) -> &'static str {
        "Weekly OTT trend report with the most popular titles"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "platform": {
                    "type": "string",
                    "default": "netflix",
                    "description": "OTT platform for the report heading"
                }
            }
        })
    }

    async fn call(&self, params: TrendParams) -> Result<ToolOutput, ToolError> {
        let platform = normalize_platform(&params.platform);

        let reason = match self.source.weekly_trending(TOP_N).await {
            Ok(titles) if !titles.is_empty() => {
                return Ok(ToolCallResult::text(report(&platform, &titles)).into());
            }
            Ok(_) => "no trending titles returned".to_string(),
            Err(e) => {
                let mut reason = e.to_string();
                let mut source = std::error::Error::source(&e);
                while let Some(cause) = source {
                    let _ = write!(reason, ": {cause}");
                    source = cause.source();
                }
                reason
            }
        };

        Ok(ToolOutput::Fallback {
            result: ToolCallResult::text(unavailable(&platform)),
            reason,
        })
    }
}
