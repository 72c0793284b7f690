use clap::ValueEnum;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{OutcomeClassification, ResultType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UpsetCategory {
    /// Every game the spread favourite lost
    AllUpsets,
    /// Upsets of a home team favoured by more than the big-spread threshold
    HomeFavorite,
    /// Upsets of an away team favoured by more than the big-spread threshold
    AwayFavorite,
}

impl UpsetCategory {
    pub fn matches(&self, game: &OutcomeClassification) -> bool {
        match self {
            UpsetCategory::AllUpsets => game.result_type == ResultType::Upset,
            UpsetCategory::HomeFavorite => game.big_home_favorite_upset,
            UpsetCategory::AwayFavorite => game.big_away_favorite_upset,
        }
    }
}

/// Games in `category`, optionally one season, most recent season first.
pub fn select_games<'a>(
    classified: &'a [OutcomeClassification],
    category: UpsetCategory,
    season: Option<u16>,
) -> Vec<&'a OutcomeClassification> {
    let mut selected: Vec<&OutcomeClassification> = classified
        .iter()
        .filter(|g| category.matches(g))
        .filter(|g| season.map_or(true, |s| g.season == s))
        .collect();
    selected.sort_by(|a, b| b.season.cmp(&a.season));
    selected
}

/// Games per season in `category`, most recent first.
pub fn season_counts(
    classified: &[OutcomeClassification],
    category: UpsetCategory,
) -> Vec<(u16, usize)> {
    let mut counts: BTreeMap<u16, usize> = BTreeMap::new();
    for game in classified.iter().filter(|g| category.matches(g)) {
        *counts.entry(game.season).or_default() += 1;
    }
    counts.into_iter().rev().collect()
}

/// Every team appearing in the classified set, sorted.
pub fn teams(classified: &[OutcomeClassification]) -> Vec<String> {
    let set: BTreeSet<&str> = classified
        .iter()
        .flat_map(|g| [g.home_team.as_str(), g.away_team.as_str()])
        .collect();
    set.into_iter().map(str::to_string).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamUpsets {
    pub team: String,
    pub total_upsets: usize,
    pub big_spread_upsets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsetReport {
    pub total_games: usize,
    pub upsets: usize,
    pub other_games: usize,
    pub big_spread_upsets: usize,
    pub small_spread_upsets: usize,
    pub big_home_favorite_upsets: usize,
    pub big_away_favorite_upsets: usize,
    /// Keyed by the expected winner, i.e. the favourite that lost.
    pub by_team: Vec<TeamUpsets>,
    pub by_season: Vec<(u16, usize)>,
}

impl UpsetReport {
    pub fn build(classified: &[OutcomeClassification]) -> Self {
        let upsets: Vec<&OutcomeClassification> = classified
            .iter()
            .filter(|g| g.result_type == ResultType::Upset)
            .collect();
        let big = upsets.iter().filter(|g| g.is_big_upset()).count();

        let mut by_team: BTreeMap<&str, TeamUpsets> = BTreeMap::new();
        let mut by_season: BTreeMap<u16, usize> = BTreeMap::new();
        for game in &upsets {
            let entry = by_team
                .entry(game.expected_winner.as_str())
                .or_insert_with(|| TeamUpsets {
                    team: game.expected_winner.clone(),
                    total_upsets: 0,
                    big_spread_upsets: 0,
                });
            entry.total_upsets += 1;
            if game.is_big_upset() {
                entry.big_spread_upsets += 1;
            }
            *by_season.entry(game.season).or_default() += 1;
        }

        Self {
            total_games: classified.len(),
            upsets: upsets.len(),
            other_games: classified.len() - upsets.len(),
            big_spread_upsets: big,
            small_spread_upsets: upsets.len() - big,
            big_home_favorite_upsets: upsets.iter().filter(|g| g.big_home_favorite_upset).count(),
            big_away_favorite_upsets: upsets.iter().filter(|g| g.big_away_favorite_upset).count(),
            by_team: by_team.into_values().collect(),
            by_season: by_season.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameRecord;
    use crate::services::GameOutcomeClassifier;

    fn classified() -> Vec<OutcomeClassification> {
        let rows = [
            ("2022_01_A_B", 2022, "B", "A", 7.5, 10, 20),  // big home fav upset (B lost)
            ("2022_02_C_B", 2022, "B", "C", 2.5, 14, 17),  // small upset (B lost)
            ("2023_01_A_C", 2023, "C", "A", -8.0, 24, 21), // big away fav upset (A lost)
            ("2023_02_A_B", 2023, "B", "A", 3.0, 27, 3),   // confirmed
            ("2023_03_C_A", 2023, "A", "C", 0.0, 9, 6),    // even
        ];
        let games: Vec<GameRecord> = rows
            .iter()
            .map(|(id, season, home, away, spread, hs, aw)| GameRecord {
                game_id: id.to_string(),
                season: *season,
                week: 1,
                home_team: home.to_string(),
                away_team: away.to_string(),
                spread_line: Some(*spread),
                total_home_score: *hs,
                total_away_score: *aw,
            })
            .collect();
        GameOutcomeClassifier::new().classify_all(&games)
    }

    #[test]
    fn test_report_counts() {
        let report = UpsetReport::build(&classified());
        assert_eq!(report.total_games, 5);
        assert_eq!(report.upsets, 3);
        assert_eq!(report.other_games, 2);
        assert_eq!(report.big_spread_upsets, 2);
        assert_eq!(report.small_spread_upsets, 1);
        assert_eq!(report.big_home_favorite_upsets, 1);
        assert_eq!(report.big_away_favorite_upsets, 1);
        assert_eq!(report.by_season, vec![(2022, 2), (2023, 1)]);
        assert_eq!(
            report.by_team,
            vec![
                TeamUpsets { team: "A".to_string(), total_upsets: 1, big_spread_upsets: 1 },
                TeamUpsets { team: "B".to_string(), total_upsets: 2, big_spread_upsets: 1 },
            ]
        );
    }

    #[test]
    fn test_select_games_most_recent_first() {
        let games = classified();
        let all = select_games(&games, UpsetCategory::AllUpsets, None);
        let ids: Vec<&str> = all.iter().map(|g| g.game_id.as_str()).collect();
        assert_eq!(ids, vec!["2023_01_A_C", "2022_01_A_B", "2022_02_C_B"]);

        assert_eq!(select_games(&games, UpsetCategory::HomeFavorite, None).len(), 1);
        assert_eq!(select_games(&games, UpsetCategory::AwayFavorite, Some(2022)).len(), 0);
        assert_eq!(season_counts(&games, UpsetCategory::AllUpsets), vec![(2023, 1), (2022, 2)]);
    }

    #[test]
    fn test_teams_are_distinct() {
        assert_eq!(teams(&classified()), vec!["A", "B", "C"]);
    }
}
