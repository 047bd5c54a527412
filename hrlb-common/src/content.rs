//! Normalized content model
//!
//! Every upstream provider is mapped onto [`ContentItem`]; the leaderboard
//! only ever compares items of the same [`Category`] drawn from the same
//! [`TimeWindow`].

use crate::{Error, Result};
use chrono::{Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Image shown when a provider supplies no artwork
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/500x750?text=No+Image";

/// Lower bound used by the `all` time range
pub const ALL_TIME_START: (i32, u32, u32) = (1900, 1, 1);

/// Supported content domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Movie,
    Tv,
    Music,
    Book,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Movie, Category::Tv, Category::Music, Category::Book];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Movie => "movie",
            Category::Tv => "tv",
            Category::Music => "music",
            Category::Book => "book",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "movie" => Ok(Category::Movie),
            "tv" => Ok(Category::Tv),
            "music" => Ok(Category::Music),
            "book" => Ok(Category::Book),
            other => Err(Error::InvalidInput(format!("Invalid category: {}", other))),
        }
    }
}

/// Relative window bounding eligible release dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "1w")]
    Week,
    #[serde(rename = "1m")]
    Month,
    #[serde(rename = "1y")]
    Year,
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Week => "1w",
            TimeRange::Month => "1m",
            TimeRange::Year => "1y",
            TimeRange::All => "all",
        }
    }

    /// First eligible release date for a window ending on `today`
    ///
    /// Month arithmetic clamps to the end of the shorter month
    /// (2024-03-31 minus one month is 2024-02-29).
    pub fn start_date(&self, today: NaiveDate) -> NaiveDate {
        let all_time = || {
            let (y, m, d) = ALL_TIME_START;
            NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
        };
        match self {
            TimeRange::Week => today - chrono::Duration::days(7),
            TimeRange::Month => today.checked_sub_months(Months::new(1)).unwrap_or_else(all_time),
            TimeRange::Year => today.checked_sub_months(Months::new(12)).unwrap_or_else(all_time),
            TimeRange::All => all_time(),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1w" => Ok(TimeRange::Week),
            "1m" => Ok(TimeRange::Month),
            "1y" => Ok(TimeRange::Year),
            "all" => Ok(TimeRange::All),
            other => Err(Error::InvalidInput(format!("Invalid time range: {}", other))),
        }
    }
}

/// Concrete date window derived from a [`TimeRange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub range: TimeRange,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    /// Window ending on an explicit day (used by tests and the pipeline)
    pub fn ending_on(range: TimeRange, today: NaiveDate) -> Self {
        Self {
            range,
            start: range.start_date(today),
            end: today,
        }
    }

    /// Window ending today (UTC)
    pub fn current(range: TimeRange) -> Self {
        Self::ending_on(range, Utc::now().date_naive())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Parse a provider date string and check it against the window
    pub fn contains_release(&self, release_date: &str) -> bool {
        parse_release_date(release_date).is_some_and(|d| self.contains(d))
    }

    /// `YYYY-MM-DD` form of the window start
    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// `YYYY-MM-DD` form of the window end
    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

/// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
///
/// Partial dates resolve to the first day of the period. Anything else is
/// treated as absent.
pub fn parse_release_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let mut parts = value.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    let day: u32 = match parts.next() {
        // Google Books occasionally appends a time component
        Some(d) => d.get(..2).unwrap_or(d).parse().ok()?,
        None => 1,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Release year as text, used by search matching
pub fn release_year(value: &str) -> Option<String> {
    parse_release_date(value).map(|d| d.year().to_string())
}

/// Common normalized item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    /// Dense 1-based position, assigned only by the leaderboard pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    pub title: String,
    pub image_url: String,
    /// Provider scale: TMDB 0-10, Google Books 0-5, Spotify popularity/20 (0-5)
    pub rating: f64,
    pub release_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_classification: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// TMDB vote_count or Google Books ratingsCount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming_links: Option<Vec<String>>,
}

impl ContentItem {
    /// Item with the required fields set and every optional field empty
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        rating: f64,
        release_date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            rank: None,
            title: title.into(),
            image_url: PLACEHOLDER_IMAGE_URL.to_string(),
            rating,
            release_date: release_date.into(),
            duration: None,
            rating_classification: None,
            genres: Vec::new(),
            description: String::new(),
            vote_count: None,
            user_rating: None,
            streaming_links: None,
        }
    }
}

/// A user's engagement record for one content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInteraction {
    pub user_id: String,
    pub content_id: String,
    pub bookmarked: bool,
    pub liked: bool,
    pub in_list: bool,
    pub viewed: bool,
    pub view_count: u32,
    /// Star rating in [0, 10]; 0 means unrated
    pub rating: f64,
    /// Last write time (Unix milliseconds)
    pub timestamp: i64,
}

impl UserInteraction {
    /// Record created on first interaction for a (user, content) pair
    pub fn new(user_id: impl Into<String>, content_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            content_id: content_id.into(),
            bookmarked: false,
            liked: false,
            in_list: false,
            viewed: false,
            view_count: 0,
            rating: 0.0,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
