//! The OTT tool set.
//!
//! | Tool | Module |
//! |------|--------|
//! | `calculate_usage`, `calculate_remaining` | [`usage`] |
//! | `recommend_short_content`, `search_by_description`, `expiring_content_alert` | [`content`] |
//! | `analyze_viewing_pattern`, `share_account_optimizer`, `subscription_manager` | [`planning`] |
//! | `ott_trend_report` | [`trends`] |

pub mod content;
pub mod planning;
pub mod trends;
pub mod usage;

use std::sync::Arc;

use crate::mcp::registry::{ToolError, ToolRegistry};
use crate::ott::{SubscriptionCatalog, TrendSource};

/// Registers every tool, in the order `tools/list` advertises them.
pub fn register_all(
    registry: &mut ToolRegistry,
    catalog: &Arc<SubscriptionCatalog>,
    trends: &Arc<dyn TrendSource>,
) {
    registry.register_tool(usage::CalculateUsage::new(Arc::clone(catalog)));
    registry.register_tool(usage::CalculateRemaining::new(Arc::clone(catalog)));
    registry.register_tool(content::RecommendShortContent);
    registry.register_tool(content::SearchByDescription);
    registry.register_tool(planning::AnalyzeViewingPattern);
    registry.register_tool(planning::ShareAccountOptimizer::new(Arc::clone(catalog)));
    registry.register_tool(content::ExpiringContentAlert);
    registry.register_tool(planning::SubscriptionManager::new(Arc::clone(catalog)));
    registry.register_tool(trends::OttTrendReport::new(Arc::clone(trends)));
}

/// Builds a registry holding the full tool set.
#[must_use]
pub fn registry(catalog: SubscriptionCatalog, trends: Arc<dyn TrendSource>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_all(&mut registry, &Arc::new(catalog), &trends);
    registry
}

/// Looks up a platform fee, rejecting platforms the catalogue does not know.
fn require_fee(catalog: &SubscriptionCatalog, platform: &str) -> Result<u32, ToolError> {
    catalog.fee(platform).ok_or_else(|| {
        ToolError::InvalidArguments(format!(
            "Unknown platform: {platform}. Supported: {}",
            catalog.platforms().collect::<Vec<_>>().join(", ")
        ))
    })
}

/// Rejects a number outside `range`.
fn check_range(
    field: &str,
    value: f64,
    range: std::ops::RangeInclusive<f64>,
) -> Result<(), ToolError> {
    if value.is_finite() && range.contains(&value) {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments(format!(
            "{field} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}
