use std::collections::BTreeMap;

use crate::models::{DriveKey, DriveSummary, GameListing, Play, PlayType, WinnerDriveRow};
use crate::utils::{round_to, safe_pct};

/// Put plays into in-game order.
///
/// `play_id` is used when every play carries one, quarter plus clock when
/// every play carries those; otherwise arrival order is kept.
pub fn in_game_order<'a, I>(plays: I) -> Vec<&'a Play>
where
    I: IntoIterator<Item = &'a Play>,
{
    let mut ordered: Vec<&Play> = plays.into_iter().collect();

    if ordered.iter().all(|p| p.play_id.is_some()) {
        ordered.sort_by(|a, b| {
            a.play_id
                .unwrap_or_default()
                .total_cmp(&b.play_id.unwrap_or_default())
        });
    } else if ordered.iter().all(|p| p.clock_key().is_some()) {
        ordered.sort_by_key(|p| p.clock_key());
    }

    ordered
}

/// Summaries for every drive of one game, keyed by drive number.
///
/// Plays from other games and plays without a drive number are ignored.
pub fn summarize_game(plays: &[Play], game_id: &str) -> BTreeMap<u32, DriveSummary> {
    group_drives(plays.iter().filter(|p| p.game_id == game_id))
        .into_iter()
        .filter_map(|(key, drive_plays)| summarize_drive(&drive_plays).map(|s| (key.drive, s)))
        .collect()
}

/// Summaries for every `(game_id, drive)` present in `plays`.
///
/// Each key appears once however many times its plays are interleaved in the input.
pub fn summarize_all(plays: &[Play]) -> BTreeMap<DriveKey, DriveSummary> {
    let summaries: BTreeMap<DriveKey, DriveSummary> = group_drives(plays.iter())
        .into_iter()
        .filter_map(|(key, drive_plays)| summarize_drive(&drive_plays).map(|s| (key, s)))
        .collect();

    tracing::debug!(
        "Aggregated {} plays into {} drives",
        plays.len(),
        summaries.len()
    );
    summaries
}

/// The summary of a single `(game_id, drive)`, if it has any plays.
pub fn drive_summary(plays: &[Play], game_id: &str, drive: u32) -> Option<DriveSummary> {
    let selected = drive_plays(plays, game_id, drive);
    summarize_drive(&selected)
}

/// The plays of a single drive in in-game order.
pub fn drive_plays<'a>(plays: &'a [Play], game_id: &str, drive: u32) -> Vec<&'a Play> {
    in_game_order(
        plays
            .iter()
            .filter(|p| p.game_id == game_id && p.drive == Some(drive)),
    )
}

/// Aggregate an already-selected drive. `None` when there are no plays.
pub fn summarize_drive(plays: &[&Play]) -> Option<DriveSummary> {
    let ordered = in_game_order(plays.iter().copied());
    let first = *ordered.first()?;
    let last = *ordered.last()?;

    let mut epa_total = 0.0;
    let mut wpa_total = 0.0;
    let mut yards_total = 0;
    let mut runs = 0usize;
    let mut passes = 0usize;

    for play in &ordered {
        epa_total += play.epa.unwrap_or(0.0);
        wpa_total += play.wpa.unwrap_or(0.0);
        yards_total += play.yards_gained.unwrap_or(0);
        match play.play_type {
            PlayType::Run => runs += 1,
            PlayType::Pass => passes += 1,
            PlayType::Other(_) => {}
        }
    }

    let called = runs + passes;

    Some(DriveSummary {
        game_id: first.game_id.clone(),
        drive: first.drive.unwrap_or_default(),
        season: first.season,
        week: first.week,
        posteam: first.posteam.clone(),
        defteam: first.defteam.clone(),
        play_count: ordered.len(),
        epa_total,
        wpa_total,
        yards_total,
        run_pct: safe_pct(runs, called),
        pass_pct: safe_pct(passes, called),
        start_wp: first.wp,
        end_wp: last.wp,
        start_score: first.score(),
        end_score: last.score(),
    })
}

/// Distinct games of one week, in game id order.
pub fn list_games(plays: &[Play], week: u8) -> Vec<GameListing> {
    let mut games: BTreeMap<&str, GameListing> = BTreeMap::new();

    for play in plays.iter().filter(|p| p.week == week) {
        let (Some(home), Some(away)) = (&play.home_team, &play.away_team) else {
            continue;
        };
        games.entry(play.game_id.as_str()).or_insert_with(|| GameListing {
            game_id: play.game_id.clone(),
            season: play.season,
            week: play.week,
            home_team: home.clone(),
            away_team: away.clone(),
        });
    }

    games.into_values().collect()
}

/// Per-drive win probability from the eventual winner's side.
///
/// `home_wp`/`away_wp` are used when every play of the game carries both;
/// otherwise the whole game reports the possession team's `wp` unchanged.
/// A tied game is read from the away side.
pub fn winner_drive_table(plays: &[Play], game_id: &str) -> Vec<WinnerDriveRow> {
    let game_plays = in_game_order(plays.iter().filter(|p| p.game_id == game_id));
    let Some(last) = game_plays.last() else {
        return Vec::new();
    };
    let home_won = last.total_home_score > last.total_away_score;
    let has_sides = game_plays
        .iter()
        .all(|p| p.home_wp.is_some() && p.away_wp.is_some());
    if !has_sides {
        tracing::debug!("{} lacks home/away win probability, using wp", game_id);
    }

    let winner_wp = |play: &Play| match (has_sides, home_won) {
        (true, true) => play.home_wp,
        (true, false) => play.away_wp,
        (false, _) => play.wp,
    };

    group_drives(game_plays.iter().copied())
        .into_values()
        .filter_map(|drive| {
            let first = *drive.first()?;
            let last = *drive.last()?;
            let start_wp = winner_wp(first);
            let end_wp = winner_wp(last);
            let wp_change = match (start_wp, end_wp) {
                (Some(start), Some(end)) => Some(round_to(end - start, 4)),
                _ => None,
            };

            Some(WinnerDriveRow {
                drive: first.drive.unwrap_or_default(),
                posteam: first.posteam.clone(),
                defteam: first.defteam.clone(),
                start_wp,
                end_wp,
                wp_change,
                yards_gained: drive.iter().map(|p| p.yards_gained.unwrap_or(0)).sum(),
                total_home_score: last.total_home_score,
                total_away_score: last.total_away_score,
            })
        })
        .collect()
}

/// Group plays by `(game_id, drive)`, dropping plays with no drive number.
/// Plays inside each group are put into in-game order.
fn group_drives<'a, I>(plays: I) -> BTreeMap<DriveKey, Vec<&'a Play>>
where
    I: IntoIterator<Item = &'a Play>,
{
    let mut groups: BTreeMap<DriveKey, Vec<&Play>> = BTreeMap::new();
    for play in plays {
        let Some(drive) = play.drive else {
            continue;
        };
        groups
            .entry(DriveKey {
                game_id: play.game_id.clone(),
                drive,
            })
            .or_default()
            .push(play);
    }

    for group in groups.values_mut() {
        *group = in_game_order(group.iter().copied());
    }
    groups
}
