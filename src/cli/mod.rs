use anyhow::{bail, Result};
use serde::Serialize;
use std::path::Path;

use crate::config::AppConfig;
use crate::data::{export_classifications, SeasonStore};
use crate::models::{ComparisonScope, DriveSummary, OutcomeClassification};
use crate::services::drive_aggregator::{
    drive_plays, drive_summary, list_games, summarize_all, summarize_game, winner_drive_table,
};
use crate::services::upset_report::{
    select_games, season_counts, teams, UpsetCategory, UpsetReport,
};
use crate::services::{
    big_upsets, ComparativeNormalizer, GameOutcomeClassifier, MomentumSwingDetector,
};
use crate::utils::{closest_team, round_to};

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Season files on disk that fall inside the configured window.
async fn available_seasons(store: &SeasonStore, config: &AppConfig) -> Result<Vec<u16>> {
    let seasons = config.seasons_within(&store.available_seasons().await?);
    if seasons.is_empty() {
        tracing::warn!(
            "No season files between {} and {} in {}",
            config.first_season,
            config.last_season,
            config.season_data_dir.display()
        );
    }
    Ok(seasons)
}

fn fmt_wp(wp: Option<f64>) -> String {
    wp.map_or("-".to_string(), |v| format!("{:.3}", v))
}

pub async fn show_games(store: &SeasonStore, season: u16, week: u8, json: bool) -> Result<()> {
    let plays = store.get(season).await?;
    let games = list_games(&plays, week);

    if json {
        return print_json(&games);
    }
    if games.is_empty() {
        println!("📭 No games found for week {} of {}", week, season);
        return Ok(());
    }

    println!("🏈 Week {} games ({}):\n", week, season);
    for game in &games {
        println!("   {}  [{}]", game.label(), game.game_id);
    }
    Ok(())
}

pub async fn show_drives(
    store: &SeasonStore,
    season: u16,
    game_id: &str,
    json: bool,
) -> Result<()> {
    let plays = store.get(season).await?;
    let drives = summarize_game(&plays, game_id);

    if json {
        let list: Vec<&DriveSummary> = drives.values().collect();
        return print_json(&list);
    }
    if drives.is_empty() {
        println!("📭 No drives found for game {} in {}", game_id, season);
        return Ok(());
    }

    println!("📋 Drives for {}:\n", game_id);
    for summary in drives.values() {
        println!("   {}", summary);
    }
    Ok(())
}

pub async fn show_drive(
    store: &SeasonStore,
    season: u16,
    game_id: &str,
    drive: u32,
    json: bool,
) -> Result<()> {
    let plays = store.get(season).await?;
    let Some(summary) = drive_summary(&plays, game_id, drive) else {
        bail!("Drive {} not found in game {} ({})", drive, game_id, season);
    };
    let plays_in_drive = drive_plays(&plays, game_id, drive);

    if json {
        #[derive(Serialize)]
        struct DriveDetail<'a> {
            summary: &'a DriveSummary,
            plays: Vec<&'a crate::models::Play>,
        }
        return print_json(&DriveDetail {
            summary: &summary,
            plays: plays_in_drive,
        });
    }

    println!("📊 {}", summary);
    println!(
        "   {} vs {} | Run {:.0}% | Pass {:.0}% | WP {} → {} | Score {} → {}\n",
        summary.posteam.as_deref().unwrap_or("?"),
        summary.defteam.as_deref().unwrap_or("?"),
        summary.run_pct * 100.0,
        summary.pass_pct * 100.0,
        fmt_wp(summary.start_wp),
        fmt_wp(summary.end_wp),
        summary.start_score,
        summary.end_score
    );

    for play in plays_in_drive {
        println!(
            "   Q{} {:>5} | {} & {} at {} | {:<8} | {:>3} yds | EPA {:>6} | WP {} | {}",
            play.qtr.map_or("-".to_string(), |q| q.to_string()),
            play.time.as_deref().unwrap_or("-"),
            play.down.map_or("-".to_string(), |d| d.to_string()),
            play.ydstogo.map_or("-".to_string(), |y| format!("{:.0}", y)),
            play.yardline_100.map_or("-".to_string(), |y| format!("{:.0}", y)),
            play.play_type,
            play.yards_gained.unwrap_or(0),
            play.epa.map_or("-".to_string(), |e| format!("{:.3}", e)),
            fmt_wp(play.wp),
            play.desc.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn suggest_swings(
    store: &SeasonStore,
    season: u16,
    week: Option<u8>,
    json: bool,
) -> Result<()> {
    let plays = store.get(season).await?;
    let summaries = summarize_all(&plays);
    let swings = MomentumSwingDetector::new().detect_in(summaries.values(), season, week);

    if json {
        return print_json(&swings);
    }

    let scope = week.map_or(format!("{}", season), |w| format!("week {} of {}", w, season));
    println!("📈 Swing-up drives ({}): {}", scope, swings.swing_up.len());
    for s in &swings.swing_up {
        println!("   {} | {} → {}  {}", s.game_id, fmt_wp(s.start_wp), fmt_wp(s.end_wp), s);
    }
    println!("\n📉 Swing-down drives ({}): {}", scope, swings.swing_down.len());
    for s in &swings.swing_down {
        println!("   {} | {} → {}  {}", s.game_id, fmt_wp(s.start_wp), fmt_wp(s.end_wp), s);
    }
    Ok(())
}

pub async fn compare_drive(
    store: &SeasonStore,
    config: &AppConfig,
    season: u16,
    game_id: &str,
    drive: u32,
    scope: ComparisonScope,
    json: bool,
) -> Result<()> {
    let plays = store.get(season).await?;
    let Some(target) = drive_summary(&plays, game_id, drive) else {
        bail!("Drive {} not found in game {} ({})", drive, game_id, season);
    };

    let seasons = match scope {
        ComparisonScope::All => available_seasons(store, config).await?,
        _ => vec![season],
    };
    let loaded = store.get_many(&seasons).await?;
    tracing::debug!("Seasons in memory: {:?}", store.cached_seasons().await);
    let candidates: Vec<DriveSummary> = loaded
        .iter()
        .flat_map(|plays| summarize_all(plays).into_values())
        .collect();

    let comparison = ComparativeNormalizer::compare(&target, scope, &candidates);

    if json {
        return print_json(&comparison);
    }

    println!(
        "🔬 Drive {} of {} vs {} scope ({} drives)\n",
        drive, game_id, scope, comparison.pool_size
    );
    let values = comparison.fingerprint.values.to_array();
    let baseline = comparison.baseline.map(|b| b.to_array());
    let raw = target.metrics().to_array();
    println!("   {:<12} {:>10} {:>10} {:>8}", "metric", "drive", "median", "ratio");
    for (dim, name) in crate::models::MetricVector::DIMENSIONS.iter().enumerate() {
        println!(
            "   {:<12} {:>10} {:>10} {:>8}",
            name,
            round_to(raw[dim], 4),
            baseline.map_or("-".to_string(), |b| round_to(b[dim], 4).to_string()),
            round_to(values[dim], 3)
        );
    }
    println!("\n   Scatter points: {}", comparison.scatter.len());
    Ok(())
}

async fn classify_seasons(
    store: &SeasonStore,
    classifier: &GameOutcomeClassifier,
    seasons: &[u16],
) -> Result<Vec<OutcomeClassification>> {
    let mut classified = Vec::new();
    for plays in store.get_many(seasons).await? {
        classified.extend(classifier.classify_plays(&plays));
    }
    Ok(classified)
}

pub async fn classify_games(
    store: &SeasonStore,
    config: &AppConfig,
    season: Option<u16>,
    export: Option<&Path>,
    json: bool,
) -> Result<()> {
    let seasons = match season {
        Some(season) => vec![season],
        None => available_seasons(store, config).await?,
    };
    let classifier = GameOutcomeClassifier::with_threshold(config.big_spread_threshold);
    let classified = classify_seasons(store, &classifier, &seasons).await?;

    if let Some(dir) = export {
        let (all, big) = export_classifications(dir, &classified)?;
        println!("💾 Wrote {} and {}", all.display(), big.display());
    }

    if json {
        return print_json(&classified);
    }

    let big = big_upsets(&classified);
    println!(
        "🎯 Classified {} games: {} upsets, {} big-spread upsets (|spread| > {})",
        classified.len(),
        classified
            .iter()
            .filter(|c| c.result_type == crate::models::ResultType::Upset)
            .count(),
        big.len(),
        classifier.threshold()
    );
    for game in big {
        println!(
            "   {} | spread {:+} | {} expected, {} won",
            game.game_id, game.spread, game.expected_winner, game.actual_winner
        );
    }
    Ok(())
}

pub async fn explore_upsets(
    store: &SeasonStore,
    config: &AppConfig,
    category: UpsetCategory,
    season: Option<u16>,
    team: Option<&str>,
    json: bool,
) -> Result<()> {
    let classifier = GameOutcomeClassifier::with_threshold(config.big_spread_threshold);
    let seasons = available_seasons(store, config).await?;
    let mut classified = classify_seasons(store, &classifier, &seasons).await?;

    if let Some(query) = team {
        let known = teams(&classified);
        let Some(resolved) = closest_team(query, &known, 0.8) else {
            bail!("No team matching '{}'", query);
        };
        if !resolved.eq_ignore_ascii_case(query) {
            println!("🔍 Using team {} for '{}'", resolved, query);
        }
        let resolved = resolved.to_string();
        classified.retain(|g| g.home_team == resolved || g.away_team == resolved);
    }

    let report = UpsetReport::build(&classified);
    let games = select_games(&classified, category, season);

    if json {
        #[derive(Serialize)]
        struct UpsetView<'a> {
            report: &'a UpsetReport,
            games: &'a [&'a OutcomeClassification],
        }
        return print_json(&UpsetView {
            report: &report,
            games: &games,
        });
    }

    println!(
        "📊 {} games | {} upsets ({} big: {} home favourites, {} away favourites)",
        report.total_games,
        report.upsets,
        report.big_spread_upsets,
        report.big_home_favorite_upsets,
        report.big_away_favorite_upsets
    );

    println!("\n📅 Seasons:");
    for (year, count) in season_counts(&classified, category) {
        println!("   {} ({} games)", year, count);
    }

    println!("\n🏈 Games (most recent first):");
    for game in games {
        println!(
            "   {} - {} expected, {} won",
            game.game_id, game.expected_winner, game.actual_winner
        );
    }
    Ok(())
}

pub async fn show_winner_drives(
    store: &SeasonStore,
    season: u16,
    game_id: &str,
    json: bool,
) -> Result<()> {
    let plays = store.get(season).await?;
    let rows = winner_drive_table(&plays, game_id);

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("📭 No drives found for game {} in {}", game_id, season);
        return Ok(());
    }

    println!("🏆 Drives of {} from the winner's side:\n", game_id);
    for row in rows {
        println!(
            "   Drive {:>2} | {:<3} vs {:<3} | WP {} → {} ({}) | {:>3} yds | {}-{}",
            row.drive,
            row.posteam.as_deref().unwrap_or("?"),
            row.defteam.as_deref().unwrap_or("?"),
            fmt_wp(row.start_wp),
            fmt_wp(row.end_wp),
            row.wp_change.map_or("-".to_string(), |c| format!("{:+.4}", c)),
            row.yards_gained,
            row.total_away_score,
            row.total_home_score
        );
    }
    Ok(())
}
