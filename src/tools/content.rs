//! Static content tables: short picks, description search and expiring titles.

use std::fmt::Write as _;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::check_range;
use crate::mcp::registry::{Tool, ToolCallResult, ToolError, ToolOutput};
use crate::ott::normalize_platform;

/// Genres used by the short-content table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Genre {
    /// Sitcoms and comedy.
    Comedy,
    /// Drama and anthology.
    Drama,
    /// Documentary series.
    Documentary,
    /// Animation.
    Animation,
}

impl Genre {
    /// Parses an English or Korean genre name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "comedy" | "sitcom" | "코미디" => Some(Self::Comedy),
            "drama" | "드라마" => Some(Self::Drama),
            "documentary" | "docu" | "다큐" | "다큐멘터리" => Some(Self::Documentary),
            "animation" | "anime" | "애니" | "애니메이션" => Some(Self::Animation),
            _ => None,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Comedy => "comedy",
            Self::Drama => "drama",
            Self::Documentary => "documentary",
            Self::Animation => "animation",
        }
    }
}

struct ShortTitle {
    title: &'static str,
    minutes: u32,
    genre: Genre,
}

/// Sorted by running time.
const SHORT_TITLES: &[ShortTitle] = &[
    ShortTitle { title: "Love, Death & Robots", minutes: 15, genre: Genre::Animation },
    ShortTitle { title: "Explained", minutes: 20, genre: Genre::Documentary },
    ShortTitle { title: "Friends", minutes: 22, genre: Genre::Comedy },
    ShortTitle { title: "Brooklyn Nine-Nine", minutes: 22, genre: Genre::Comedy },
    ShortTitle { title: "What If...?", minutes: 23, genre: Genre::Animation },
    ShortTitle { title: "Midnight Diner", minutes: 24, genre: Genre::Drama },
    ShortTitle { title: "Abstract: The Art of Design", minutes: 45, genre: Genre::Documentary },
    ShortTitle { title: "Black Mirror", minutes: 60, genre: Genre::Drama },
];

/// `recommend_short_content`
pub struct RecommendShortContent;

/// Parameters for `recommend_short_content`.
#[derive(Debug, Deserialize)]
pub struct ShortContentParams {
    /// Longest acceptable running time, in minutes.
    #[serde(default = "default_max_duration")]
    pub max_duration: u32,
    /// Optional genre filter.
    #[serde(default)]
    pub genre: Option<String>,
}

const fn default_max_duration() -> u32 {
    30
}

#[async_trait]
impl Tool for RecommendShortContent {
    type Params = ShortContentParams;

    fn name(&self) -> &'static str {
        "recommend_short_content"
    }

    fn description(&self) -> &'static str {
        "Recommend short shows that fit in a limited time slot"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "max_duration": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 600,
                    "default": 30,
                    "description": "Maximum running time in minutes"
                },
                "genre": {
                    "type": "string",
                    "description": "Genre (comedy, drama, documentary, animation)"
                }
            }
        })
    }

    async fn call(&self, params: ShortContentParams) -> Result<ToolOutput, ToolError> {
        check_range("max_duration", f64::from(params.max_duration), 1.0..=600.0)?;
        let max = params.max_duration;

        let requested = params.genre.as_deref().filter(|g| !g.trim().is_empty());
        let genre = requested.and_then(Genre::parse);
        let in_genre = |t: &&ShortTitle| genre.map_or(true, |g| t.genre == g);

        let mut text = match genre {
            Some(g) => format!("🎬 {} picks under {max} minutes:\n", g.label()),
            None => format!("🎬 Content under {max} minutes:\n"),
        };
        if let (Some(name), None) = (requested, genre) {
            let _ = writeln!(text, "(Unknown genre '{name}', showing every genre)");
        }

        let picks: Vec<_> = SHORT_TITLES
            .iter()
            .filter(in_genre)
            .filter(|t| t.minutes <= max)
            .collect();

        if picks.is_empty() {
            text.clear();
            let _ = write!(text, "🎬 Nothing runs {max} minutes or less.");
            if let Some(shortest) = SHORT_TITLES.iter().find(in_genre) {
                let _ = write!(
                    text,
                    " Shortest pick: {} ({} min)",
                    shortest.title, shortest.minutes
                );
            }
        } else {
            let lines: Vec<_> = picks
                .iter()
                .map(|t| format!("• {} ({} min)", t.title, t.minutes))
                .collect();
            text.push_str(&lines.join("\n"));
        }

        Ok(ToolCallResult::text(text).into())
    }
}

/// A keyword rule: every group must match somewhere in the description.
struct SearchRule {
    groups: Vec<Regex>,
    heading: &'static str,
    picks: &'static [&'static str],
}

impl SearchRule {
    fn new(groups: &[&str], heading: &'static str, picks: &'static [&'static str]) -> Self {
        Self {
            groups: groups.iter().map(|pattern| keyword_regex(pattern)).collect(),
            heading,
            picks,
        }
    }

    fn matches(&self, description: &str) -> bool {
        self.groups.iter().all(|group| group.is_match(description))
    }
}

/// Case-insensitive matcher for a `|`-separated list of literal keywords.
fn keyword_regex(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("keyword pattern is a valid alternation")
}

// Compiled once, on first search.
static SEARCH_RULES: Lazy<[SearchRule; 3]> = Lazy::new(|| {
    [
        SearchRule::new(
            &["princess|공주", "dwarf|dwarves|난쟁이"],
            "🍎 You're looking for Snow White!",
            &[
                "Disney+: Snow White and the Seven Dwarfs",
                "Netflix: Mirror Mirror",
                "Various platforms: Snow White adaptations",
            ],
        ),
        SearchRule::new(
            &["cry|emotional|tear|눈물|감동"],
            "😭 Emotional recommendations:",
            &[
                "Eternal Sunshine of the Spotless Mind",
                "About Time",
                "La La Land",
                "Your Name",
                "A Star is Born",
            ],
        ),
        SearchRule::new(
            &["zombie|undead|좀비"],
            "🧟 Zombie picks:",
            &["Netflix: Kingdom", "Train to Busan", "All of Us Are Dead"],
        ),
    ]
});

/// `search_by_description`
pub struct SearchByDescription;

/// Parameters for `search_by_description`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Free-text description of the wanted title.
    pub description: String,
}

#[async_trait]
impl Tool for SearchByDescription {
    type Params = SearchParams;

    fn name(&self) -> &'static str {
        "search_by_description"
    }

    fn description(&self) -> &'static str {
        "Find movies or shows from a natural-language description"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "description": "Natural language description of the content"
                }
            },
            "required": ["description"]
        })
    }

    async fn call(&self, params: SearchParams) -> Result<ToolOutput, ToolError> {
        let description = params.description.trim();
        if description.is_empty() {
            return Err(ToolError::InvalidArguments(
                "description must not be empty".to_string(),
            ));
        }

        for rule in SEARCH_RULES.iter() {
            if rule.matches(description) {
                let picks: Vec<_> = rule.picks.iter().map(|p| format!("• {p}")).collect();
                let text = format!("{}\n{}", rule.heading, picks.join("\n"));
                return Ok(ToolCallResult::text(text).into());
            }
        }

        Ok(ToolCallResult::text(format!(
            "Searching for: {description}... Try being more specific!"
        ))
        .into())
    }
}

/// Titles leaving each platform, soonest first.
const EXPIRING: &[(&str, &[(&str, u32)])] = &[
    ("netflix", &[("Squid Game", 3), ("Parasite", 5), ("The Glory", 12), ("Kingdom", 20)]),
    ("watcha", &[("Eternal Sunshine of the Spotless Mind", 4), ("Little Forest", 9)]),
    ("tving", &[("Yumi's Cells", 6), ("Transit Love", 15)]),
    ("wavve", &[("Monstrous", 10)]),
    ("disney", &[("Big Bet", 2), ("Moving", 8)]),
];

/// Days left at or below which a title is flagged red.
const URGENT_DAYS: u32 = 3;

/// `expiring_content_alert`
pub struct ExpiringContentAlert;

/// Parameters for `expiring_content_alert`.
#[derive(Debug, Deserialize)]
pub struct ExpiringParams {
    /// Platform key.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Look-ahead window, in days.
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_platform() -> String {
    "netflix".to_string()
}

const fn default_days() -> u32 {
    7
}

fn plural_days(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

#[async_trait]
impl Tool for ExpiringContentAlert {
    type Params = ExpiringParams;

    fn name(&self) -> &'static str {
        "expiring_content_alert"
    }

    fn description(&self) -> &'static str {
        "List titles that are about to leave a platform"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "platform": {
                    "type": "string",
                    "default": "netflix",
                    "description": "OTT platform"
                },
                "days": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 90,
                    "default": 7,
                    "description": "Look-ahead window in days"
                }
            }
        })
    }

    async fn call(&self, params: ExpiringParams) -> Result<ToolOutput, ToolError> {
        check_range("days", f64::from(params.days), 1.0..=90.0)?;
        let platform = normalize_platform(&params.platform);
        let window = plural_days(params.days);

        let leaving: Vec<_> = EXPIRING
            .iter()
            .find(|(name, _)| *name == platform)
            .map(|(_, titles)| titles.iter().filter(|(_, left)| *left <= params.days).collect())
            .unwrap_or_default();

        if leaving.is_empty() {
            return Ok(ToolCallResult::text(format!(
                "✅ Nothing is leaving {platform} in the next {window}."
            ))
            .into());
        }

        let mut text = format!("⏰ Leaving {platform} within {window}:");
        for (title, left) in leaving {
            let marker = if *left <= URGENT_DAYS { "🔴" } else { "🟡" };
            let _ = write!(text, "\n{marker} {title} ({})", plural_days(*left));
        }
        Ok(ToolCallResult::text(text).into())
    }
}
