//! OTT domain data: subscription fees and trending-title lookups.

mod catalog;
mod tmdb;

pub use catalog::{format_won, normalize_platform, SubscriptionCatalog};
pub use tmdb::{TmdbClient, TrendSource, TrendingTitle, UpstreamError};
