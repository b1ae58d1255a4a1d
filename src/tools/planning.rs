//! Viewing-time and spending plans.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value};

use super::check_range;
use super::usage::BREAK_EVEN_HOURS;
use crate::mcp::registry::{Tool, ToolCallResult, ToolError, ToolOutput};
use crate::ott::{format_won, normalize_platform, SubscriptionCatalog};

/// Weeks counted in a month.
const WEEKS_PER_MONTH: f64 = 4.0;

/// Monthly usage below this is a pause candidate, in hours.
const LOW_USAGE_HOURS: f64 = 5.0;

fn default_platform() -> String {
    "netflix".to_string()
}

/// `analyze_viewing_pattern`
pub struct AnalyzeViewingPattern;

/// Parameters for `analyze_viewing_pattern`.
#[derive(Debug, Deserialize)]
pub struct ViewingPatternParams {
    /// Free hours per weekday.
    #[serde(default = "default_weekday_hours")]
    pub weekday_free_time: f64,
    /// Free hours per weekend day.
    #[serde(default = "default_weekend_hours")]
    pub weekend_free_time: f64,
    /// Preferred time of day, free text.
    #[serde(default)]
    pub preferred_time: Option<String>,
    /// `movie` or `series`.
    #[serde(default)]
    pub content_type: Option<String>,
}

const fn default_weekday_hours() -> f64 {
    2.0
}

const fn default_weekend_hours() -> f64 {
    6.0
}

/// Hours available in a month given daily free time.
#[must_use]
pub fn monthly_hours(weekday: f64, weekend: f64) -> f64 {
    (weekday * 5.0 + weekend * 2.0) * WEEKS_PER_MONTH
}

fn content_suggestion(content_type: Option<&str>, monthly: f64) -> String {
    match content_type.map(|c| c.trim().to_lowercase()).as_deref() {
        Some("movie" | "movies" | "film" | "영화") => {
            format!("about {:.0} movies a month (2 hours each)", (monthly / 2.0).floor())
        }
        Some("series" | "drama" | "tv" | "episodes" | "드라마" | "시리즈") => format!(
            "about {:.0} episodes a month (50 minutes each)",
            (monthly * 60.0 / 50.0).floor()
        ),
        _ => "movies on weekends, episodes on weekday evenings".to_string(),
    }
}

#[async_trait]
impl Tool for AnalyzeViewingPattern {
    type Params = ViewingPatternParams;

    fn name(&self) -> &'static str {
        "analyze_viewing_pattern"
    }

    fn description(&self) -> &'static str {
        "Analyse free time and check whether it covers a month of subscription value"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "weekday_free_time": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 24,
                    "default": 2,
                    "description": "Free hours per weekday"
                },
                "weekend_free_time": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 24,
                    "default": 6,
                    "description": "Free hours per weekend day"
                },
                "preferred_time": {
                    "type": "string",
                    "description": "Preferred viewing time (e.g. late night)"
                },
                "content_type": {
                    "type": "string",
                    "enum": ["movie", "series"],
                    "description": "Preferred content type"
                }
            }
        })
    }

    async fn call(&self, params: ViewingPatternParams) -> Result<ToolOutput, ToolError> {
        check_range("weekday_free_time", params.weekday_free_time, 0.0..=24.0)?;
        check_range("weekend_free_time", params.weekend_free_time, 0.0..=24.0)?;

        let weekday = params.weekday_free_time;
        let weekend = params.weekend_free_time;
        let monthly = monthly_hours(weekday, weekend);

        let verdict = if monthly >= BREAK_EVEN_HOURS {
            "✅ Plenty of time to get full value!"
        } else {
            "⚠️ Not enough time for full value, consider a cheaper plan."
        };
        let slot = match params.preferred_time.as_deref().map(str::trim) {
            Some(preferred) if !preferred.is_empty() => preferred.to_string(),
            _ if weekend * 2.0 >= weekday * 5.0 => "weekends".to_string(),
            _ => "weekday evenings".to_string(),
        };

        let text = format!(
            "📊 Viewing pattern analysis\n\
             • Available per month: {monthly:.1} hours\n\
             • Needed for full value: {BREAK_EVEN_HOURS} hours\n\
             {verdict}\n\
             • Best slot: {slot}\n\
             • Suggestion: {}",
            content_suggestion(params.content_type.as_deref(), monthly)
        );
        Ok(ToolCallResult::text(text).into())
    }
}

/// `share_account_optimizer`
pub struct ShareAccountOptimizer {
    catalog: Arc<SubscriptionCatalog>,
}

impl ShareAccountOptimizer {
    /// Creates the tool over a fee catalogue.
    #[must_use]
    pub const fn new(catalog: Arc<SubscriptionCatalog>) -> Self {
        Self { catalog }
    }
}

/// Parameters for `share_account_optimizer`.
#[derive(Debug, Deserialize)]
pub struct ShareParams {
    /// The caller's favourite genres.
    #[serde(default)]
    pub my_genres: Vec<String>,
    /// The friend's favourite genres.
    #[serde(default)]
    pub friend_genres: Vec<String>,
    /// Platform to share.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// People splitting the fee.
    #[serde(default = "default_people")]
    pub people: u32,
}

const fn default_people() -> u32 {
    2
}

/// Genres in both lists, case-insensitive, in the order of `mine`.
#[must_use]
pub fn common_genres(mine: &[String], theirs: &[String]) -> Vec<String> {
    let theirs: HashSet<String> = theirs.iter().map(|g| g.trim().to_lowercase()).collect();
    let mut seen = HashSet::new();
    mine.iter()
        .map(|g| g.trim())
        .filter(|g| {
            let key = g.to_lowercase();
            theirs.contains(&key) && seen.insert(key)
        })
        .map(str::to_string)
        .collect()
}

/// `fee / people`, rounded half up.
#[must_use]
pub const fn split_fee(fee: u32, people: u32) -> u32 {
    (fee + people / 2) / people
}

#[async_trait]
impl Tool for ShareAccountOptimizer {
    type Params = ShareParams;

    fn name(&self) -> &'static str {
        "share_account_optimizer"
    }

    fn description(&self) -> &'static str {
        "Find shared tastes and the per-person cost of sharing an account"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "my_genres": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Your favourite genres"
                },
                "friend_genres": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Your friend's favourite genres"
                },
                "platform": {
                    "type": "string",
                    "default": "netflix",
                    "description": "OTT platform to share"
                },
                "people": {
                    "type": "integer",
                    "minimum": 2,
                    "maximum": 6,
                    "default": 2,
                    "description": "Number of people splitting the fee"
                }
            }
        })
    }

    async fn call(&self, params: ShareParams) -> Result<ToolOutput, ToolError> {
        check_range("people", f64::from(params.people), 2.0..=6.0)?;

        let platform = normalize_platform(&params.platform);
        let (fee, estimated) = match self.catalog.fee(&platform) {
            Some(fee) => (fee, ""),
            None => (self.catalog.fallback_fee(), ", estimated fee"),
        };
        let per_person = split_fee(fee, params.people);
        let common = common_genres(&params.my_genres, &params.friend_genres);

        let mut text = format!(
            "👥 Account sharing analysis ({platform}, {} people)\n",
            params.people
        );
        if common.is_empty() {
            text.push_str("🤷 No shared genres, set up separate profiles\n");
        } else {
            let _ = writeln!(text, "🤝 Shared genres: {}", common.join(", "));
        }
        let _ = write!(
            text,
            "💰 Per person: {} (instead of {}{estimated})",
            format_won(u64::from(per_person)),
            format_won(u64::from(fee))
        );
        Ok(ToolCallResult::text(text).into())
    }
}

/// `subscription_manager`
pub struct SubscriptionManager {
    catalog: Arc<SubscriptionCatalog>,
}

impl SubscriptionManager {
    /// Creates the tool over a fee catalogue.
    #[must_use]
    pub const fn new(catalog: Arc<SubscriptionCatalog>) -> Self {
        Self { catalog }
    }
}

/// Parameters for `subscription_manager`.
#[derive(Debug, Deserialize)]
pub struct ManagerParams {
    /// Active subscriptions.
    #[serde(default)]
    pub subscriptions: Vec<String>,
    /// Hours watched this month per platform.
    #[serde(default)]
    pub monthly_usage: IndexMap<String, f64>,
    /// Monthly budget in KRW.
    #[serde(default = "default_budget")]
    pub budget: u64,
}

const fn default_budget() -> u64 {
    30_000
}

struct Subscription {
    platform: String,
    fee: u32,
    hours: Option<f64>,
}

#[async_trait]
impl Tool for SubscriptionManager {
    type Params = ManagerParams;

    fn name(&self) -> &'static str {
        "subscription_manager"
    }

    fn description(&self) -> &'static str {
        "Check subscriptions against a monthly budget and suggest what to pause or cancel"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "subscriptions": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Platforms currently subscribed to"
                },
                "monthly_usage": {
                    "type": "object",
                    "additionalProperties": { "type": "number" },
                    "description": "Hours watched this month per platform"
                },
                "budget": {
                    "type": "integer",
                    "minimum": 0,
                    "default": 30000,
                    "description": "Monthly budget in KRW"
                }
            }
        })
    }

    async fn call(&self, params: ManagerParams) -> Result<ToolOutput, ToolError> {
        let usage: IndexMap<String, f64> = params
            .monthly_usage
            .iter()
            .map(|(platform, hours)| (normalize_platform(platform), *hours))
            .collect();
        for (platform, hours) in &usage {
            check_range(&format!("monthly_usage.{platform}"), *hours, 0.0..=744.0)?;
        }

        let mut seen = HashSet::new();
        let subscriptions: Vec<Subscription> = params
            .subscriptions
            .iter()
            .map(|p| normalize_platform(p))
            .filter(|p| !p.is_empty() && seen.insert(p.clone()))
            .map(|platform| Subscription {
                fee: self.catalog.fee_or_fallback(&platform),
                hours: usage.get(&platform).copied(),
                platform,
            })
            .collect();

        let total: u64 = subscriptions.iter().map(|s| u64::from(s.fee)).sum();
        let budget = params.budget;

        let mut text = String::from("💼 Subscription overview\n");
        if subscriptions.is_empty() {
            text.push_str("• No subscriptions listed\n");
        } else {
            let listed: Vec<_> = subscriptions
                .iter()
                .map(|s| format!("{} {}", s.platform, format_won(u64::from(s.fee))))
                .collect();
            let _ = writeln!(
                text,
                "• {} subscriptions: {}",
                subscriptions.len(),
                listed.join(", ")
            );
        }
        let _ = writeln!(
            text,
            "• Total: {} / budget {}",
            format_won(total),
            format_won(budget)
        );

        if total <= budget {
            let _ = write!(
                text,
                "✅ Within budget ({} to spare)",
                format_won(budget - total)
            );
        } else {
            let _ = write!(text, "⚠️ {} over budget!", format_won(total - budget));
        }

        let low: Vec<_> = subscriptions
            .iter()
            .filter_map(|s| s.hours.filter(|h| *h < LOW_USAGE_HOURS).map(|h| (s, h)))
            .map(|(s, h)| format!("{} ({h:.1}h)", s.platform))
            .collect();
        if !low.is_empty() {
            let _ = write!(
                text,
                "\n💤 Low usage (under {LOW_USAGE_HOURS}h): {}",
                low.join(", ")
            );
        }

        if total > budget {
            let least_watched = subscriptions.iter().min_by(|a, b| {
                let (ha, hb) = (a.hours.unwrap_or(0.0), b.hours.unwrap_or(0.0));
                ha.total_cmp(&hb).then_with(|| b.fee.cmp(&a.fee))
            });
            if let Some(s) = least_watched {
                let _ = write!(
                    text,
                    "\n✂️ Consider cancelling {} (least watched, saves {})",
                    s.platform,
                    format_won(u64::from(s.fee))
                );
            }
        }

        Ok(ToolCallResult::text(text).into())
    }
}
