use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use crate::error::AnalyticsError;
use crate::utils::{parse_clock, round_to};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayType {
    Run,
    Pass,
    Other(String), // punt, field_goal, kickoff, no_play, ...
}

impl From<&str> for PlayType {
    fn from(value: &str) -> Self {
        match value.trim() {
            "run" => PlayType::Run,
            "pass" => PlayType::Pass,
            other => PlayType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PlayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayType::Run => write!(f, "run"),
            PlayType::Pass => write!(f, "pass"),
            PlayType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// One play-by-play event. Immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Play {
    pub game_id: String,
    pub season: u16,
    pub week: u8,
    pub play_id: Option<f64>,
    pub qtr: Option<u8>,
    pub time: Option<String>, // "MM:SS" remaining in the quarter
    pub drive: Option<u32>,
    pub posteam: Option<String>,
    pub defteam: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub down: Option<u8>,
    pub ydstogo: Option<f64>,
    pub yardline_100: Option<f64>,
    pub play_type: PlayType,
    pub yards_gained: Option<i32>,
    pub epa: Option<f64>,
    pub wpa: Option<f64>,
    pub wp: Option<f64>,
    pub home_wp: Option<f64>,
    pub away_wp: Option<f64>,
    pub total_home_score: u16,
    pub total_away_score: u16,
    /// Positive favours the home team (nflverse convention, fixed at ingestion).
    pub spread_line: Option<f64>,
    pub desc: Option<String>,
}

impl Play {
    /// Quarter plus elapsed clock, ascending through the game.
    pub fn clock_key(&self) -> Option<(u8, Reverse<u32>)> {
        let qtr = self.qtr?;
        let remaining = parse_clock(self.time.as_deref()?)?;
        Some((qtr, Reverse(remaining)))
    }

    pub fn score(&self) -> Score {
        Score {
            away: self.total_away_score,
            home: self.total_home_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub away: u16,
    pub home: u16,
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.away, self.home)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriveKey {
    pub game_id: String,
    pub drive: u32,
}

/// Aggregate over the plays of one drive. Computed per query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveSummary {
    pub game_id: String,
    pub drive: u32,
    pub season: u16,
    pub week: u8,
    pub posteam: Option<String>,
    pub defteam: Option<String>,
    pub play_count: usize,
    pub epa_total: f64,
    pub wpa_total: f64,
    pub yards_total: i32,
    pub run_pct: f64,
    pub pass_pct: f64,
    pub start_wp: Option<f64>,
    pub end_wp: Option<f64>,
    pub start_score: Score,
    pub end_score: Score,
}

impl DriveSummary {
    pub fn key(&self) -> DriveKey {
        DriveKey {
            game_id: self.game_id.clone(),
            drive: self.drive,
        }
    }

    pub fn metrics(&self) -> MetricVector {
        MetricVector {
            play_count: self.play_count as f64,
            epa_total: self.epa_total,
            wpa_total: self.wpa_total,
            yards_total: self.yards_total as f64,
            run_pct: self.run_pct,
            pass_pct: self.pass_pct,
        }
    }
}

impl fmt::Display for DriveSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Drive {} — Plays: {} | EPA: {} | WPA: {} | Yards: {} | Score: {}",
            self.drive,
            self.play_count,
            round_to(self.epa_total, 4),
            round_to(self.wpa_total, 4),
            self.yards_total,
            self.start_score
        )
    }
}

/// The six drive metrics used for comparison, in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricVector {
    pub play_count: f64,
    pub epa_total: f64,
    pub wpa_total: f64,
    pub yards_total: f64,
    pub run_pct: f64,
    pub pass_pct: f64,
}

impl MetricVector {
    pub const DIMENSIONS: [&'static str; 6] = [
        "play_count",
        "epa_total",
        "wpa_total",
        "yards_total",
        "run_pct",
        "pass_pct",
    ];

    pub fn ones() -> Self {
        Self::from_array([1.0; 6])
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.play_count,
            self.epa_total,
            self.wpa_total,
            self.yards_total,
            self.run_pct,
            self.pass_pct,
        ]
    }

    pub fn from_array(values: [f64; 6]) -> Self {
        let [play_count, epa_total, wpa_total, yards_total, run_pct, pass_pct] = values;
        Self {
            play_count,
            epa_total,
            wpa_total,
            yards_total,
            run_pct,
            pass_pct,
        }
    }
}

/// Candidate pool used as the normalization baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonScope {
    Game,
    Week,
    Season,
    All,
}

impl FromStr for ComparisonScope {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "game" => Ok(ComparisonScope::Game),
            "week" => Ok(ComparisonScope::Week),
            "season" => Ok(ComparisonScope::Season),
            "all" => Ok(ComparisonScope::All),
            _ => Err(AnalyticsError::InvalidScope(s.to_string())),
        }
    }
}

impl fmt::Display for ComparisonScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonScope::Game => write!(f, "game"),
            ComparisonScope::Week => write!(f, "week"),
            ComparisonScope::Season => write!(f, "season"),
            ComparisonScope::All => write!(f, "all"),
        }
    }
}

/// A drive's metrics divided by the scope median, next to the median drive (all ones).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveFingerprint {
    pub values: MetricVector,
    pub reference: MetricVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub game_id: String,
    pub drive: u32,
    pub epa_total: f64,
    pub wpa_total: f64,
    pub yards_total: f64,
    pub is_target: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveComparison {
    pub target: DriveKey,
    pub scope: ComparisonScope,
    pub pool_size: usize,
    /// `None` when the pool is empty.
    pub baseline: Option<MetricVector>,
    pub fingerprint: DriveFingerprint,
    pub scatter: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingDirection {
    SwingUp,
    SwingDown,
    Neutral,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentumSwings {
    pub swing_up: Vec<DriveSummary>,
    pub swing_down: Vec<DriveSummary>,
}

/// One completed game, read from its terminal play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub season: u16,
    pub week: u8,
    pub home_team: String,
    pub away_team: String,
    pub spread_line: Option<f64>,
    pub total_home_score: u16,
    pub total_away_score: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    ConfirmedWin,
    Upset,
    EvenMatch,
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultType::ConfirmedWin => write!(f, "confirmed_win"),
            ResultType::Upset => write!(f, "upset"),
            ResultType::EvenMatch => write!(f, "even_match"),
        }
    }
}

pub const EVEN: &str = "Even";
pub const TIE: &str = "Tie";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeClassification {
    pub game_id: String,
    pub season: u16,
    pub home_team: String,
    pub away_team: String,
    pub spread: f64,
    pub expected_winner: String, // team, or "Even"
    pub actual_winner: String,   // team, or "Tie"
    pub result_type: ResultType,
    pub big_home_favorite_upset: bool,
    pub big_away_favorite_upset: bool,
}

impl OutcomeClassification {
    pub fn is_big_upset(&self) -> bool {
        self.big_home_favorite_upset || self.big_away_favorite_upset
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameListing {
    pub game_id: String,
    pub season: u16,
    pub week: u8,
    pub home_team: String,
    pub away_team: String,
}

impl GameListing {
    pub fn label(&self) -> String {
        format!(
            "{} @ {} (Week {:02}, {})",
            self.away_team, self.home_team, self.week, self.season
        )
    }
}

/// A drive seen from the eventual winner's side of the win-probability model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerDriveRow {
    pub drive: u32,
    pub posteam: Option<String>,
    pub defteam: Option<String>,
    pub start_wp: Option<f64>,
    pub end_wp: Option<f64>,
    pub wp_change: Option<f64>,
    pub yards_gained: i32,
    pub total_home_score: u16,
    pub total_away_score: u16,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn play(game_id: &str, drive: Option<u32>, play_type: &str) -> Play {
        Play {
            game_id: game_id.to_string(),
            season: 2023,
            week: 1,
            play_id: None,
            qtr: None,
            time: None,
            drive,
            posteam: Some("KC".to_string()),
            defteam: Some("DET".to_string()),
            home_team: Some("KC".to_string()),
            away_team: Some("DET".to_string()),
            down: None,
            ydstogo: None,
            yardline_100: None,
            play_type: PlayType::from(play_type),
            yards_gained: Some(0),
            epa: Some(0.0),
            wpa: None,
            wp: Some(0.5),
            home_wp: None,
            away_wp: None,
            total_home_score: 0,
            total_away_score: 0,
            spread_line: None,
            desc: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parsing() {
        assert_eq!("Week".parse::<ComparisonScope>().unwrap(), ComparisonScope::Week);
        assert_eq!(" all ".parse::<ComparisonScope>().unwrap(), ComparisonScope::All);
        let err = "league".parse::<ComparisonScope>().unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidScope(ref s) if s == "league"));
    }

    #[test]
    fn test_clock_key_orders_within_game() {
        let mut early = fixtures::play("g", Some(1), "run");
        early.qtr = Some(1);
        early.time = Some("14:10".to_string());
        let mut late = early.clone();
        late.time = Some("02:00".to_string());
        let mut next_quarter = early.clone();
        next_quarter.qtr = Some(2);
        next_quarter.time = Some("15:00".to_string());

        assert!(early.clock_key() < late.clock_key());
        assert!(late.clock_key() < next_quarter.clock_key());
    }

    #[test]
    fn test_metric_vector_array_order() {
        let v = MetricVector::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(v.epa_total, 2.0);
        assert_eq!(v.pass_pct, 6.0);
        assert_eq!(v.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(MetricVector::ones().to_array(), [1.0; 6]);
    }

    #[test]
    fn test_game_listing_label() {
        let listing = GameListing {
            game_id: "2023_01_DET_KC".to_string(),
            season: 2023,
            week: 1,
            home_team: "KC".to_string(),
            away_team: "DET".to_string(),
        };
        assert_eq!(listing.label(), "DET @ KC (Week 01, 2023)");
    }
}
