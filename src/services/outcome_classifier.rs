use std::collections::BTreeMap;

use crate::models::{GameRecord, OutcomeClassification, Play, ResultType, EVEN, TIE};
use crate::services::drive_aggregator::in_game_order;

/// Spread magnitude beyond which an upset counts as "big".
pub const BIG_SPREAD_THRESHOLD: f64 = 6.0;

/// Build one `GameRecord` per game from its terminal play, in game id order.
///
/// Games whose terminal play lacks team identities are skipped.
pub fn terminal_games(plays: &[Play]) -> Vec<GameRecord> {
    let mut by_game: BTreeMap<&str, Vec<&Play>> = BTreeMap::new();
    for play in plays {
        by_game.entry(play.game_id.as_str()).or_default().push(play);
    }

    by_game
        .into_values()
        .filter_map(|game_plays| {
            let ordered = in_game_order(game_plays);
            let last = *ordered.last()?;
            let (Some(home_team), Some(away_team)) = (&last.home_team, &last.away_team) else {
                tracing::debug!("Game {} has no team identities, skipping", last.game_id);
                return None;
            };

            Some(GameRecord {
                game_id: last.game_id.clone(),
                season: last.season,
                week: last.week,
                home_team: home_team.clone(),
                away_team: away_team.clone(),
                spread_line: last.spread_line,
                total_home_score: last.total_home_score,
                total_away_score: last.total_away_score,
            })
        })
        .collect()
}

/// Compares the pregame spread with the final score.
pub struct GameOutcomeClassifier {
    big_spread_threshold: f64,
}

impl GameOutcomeClassifier {
    pub fn new() -> Self {
        Self {
            big_spread_threshold: BIG_SPREAD_THRESHOLD,
        }
    }

    pub fn with_threshold(big_spread_threshold: f64) -> Self {
        Self { big_spread_threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.big_spread_threshold
    }

    /// Classify a single game. `None` when the spread is absent or not a number.
    pub fn classify(&self, game: &GameRecord) -> Option<OutcomeClassification> {
        let spread = game.spread_line.filter(|s| s.is_finite())?;

        let expected_winner = if spread > 0.0 {
            game.home_team.clone()
        } else if spread < 0.0 {
            game.away_team.clone()
        } else {
            EVEN.to_string()
        };

        let actual_winner = match game.total_home_score.cmp(&game.total_away_score) {
            std::cmp::Ordering::Greater => game.home_team.clone(),
            std::cmp::Ordering::Less => game.away_team.clone(),
            std::cmp::Ordering::Equal => TIE.to_string(),
        };

        let result_type = if expected_winner == EVEN || actual_winner == TIE {
            ResultType::EvenMatch
        } else if expected_winner == actual_winner {
            ResultType::ConfirmedWin
        } else {
            ResultType::Upset
        };

        let upset = result_type == ResultType::Upset;

        Some(OutcomeClassification {
            game_id: game.game_id.clone(),
            season: game.season,
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            spread,
            expected_winner,
            actual_winner,
            result_type,
            big_home_favorite_upset: upset && spread > self.big_spread_threshold,
            big_away_favorite_upset: upset && spread < -self.big_spread_threshold,
        })
    }

    /// Classify every game that has a usable spread.
    pub fn classify_all(&self, games: &[GameRecord]) -> Vec<OutcomeClassification> {
        let classified: Vec<OutcomeClassification> =
            games.iter().filter_map(|g| self.classify(g)).collect();

        let skipped = games.len() - classified.len();
        if skipped > 0 {
            tracing::debug!("Skipped {} games without a usable spread", skipped);
        }
        classified
    }

    /// Terminal plays straight to classifications.
    pub fn classify_plays(&self, plays: &[Play]) -> Vec<OutcomeClassification> {
        self.classify_all(&terminal_games(plays))
    }
}

impl Default for GameOutcomeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Games where a big favourite lost.
pub fn big_upsets(classified: &[OutcomeClassification]) -> Vec<&OutcomeClassification> {
    classified.iter().filter(|c| c.is_big_upset()).collect()
}
