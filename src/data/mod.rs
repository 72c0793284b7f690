//! Season data: CSV ingestion and the shared read-through season store.
//!
//! Season files follow the nflfastR play-by-play layout, one file per season
//! named `nfl_{season}.csv`. Only the columns the analytics need are read;
//! the rest are ignored.
//!
//! `spread_line` is taken as published by nflverse: a positive line means the
//! home team is favoured. Everything downstream relies on that convention.

use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

use crate::error::{AnalyticsError, Result};
use crate::models::{OutcomeClassification, Play, PlayType};

// ── Ingestion ────────────────────────────────────────────────────────────────

/// Numeric cells are read as floats: dataframe exports write integer columns
/// with gaps as "3.0", and "NA" or other junk becomes `None`.
#[derive(Debug, Deserialize)]
struct RawPlayRow {
    #[serde(default)]
    game_id: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    season: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    week: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    play_id: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    qtr: Option<f64>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    drive: Option<f64>,
    #[serde(default)]
    posteam: Option<String>,
    #[serde(default)]
    defteam: Option<String>,
    #[serde(default)]
    home_team: Option<String>,
    #[serde(default)]
    away_team: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    down: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    ydstogo: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    yardline_100: Option<f64>,
    #[serde(default)]
    play_type: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    yards_gained: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    epa: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    wpa: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    wp: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    home_wp: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    away_wp: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total_home_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total_away_score: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    spread_line: Option<f64>,
    #[serde(default)]
    desc: Option<String>,
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "NA")
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Non-negative whole number that fits `T`; anything else is absent.
fn whole<T: TryFrom<u32>>(value: Option<f64>) -> Option<T> {
    finite(value)
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .and_then(|v| T::try_from(v.round() as u32).ok())
}

impl RawPlayRow {
    /// `Ok(None)` for rows without a play type (timeouts, quarter ends, ...).
    fn into_play(self, row: usize, season_hint: u16) -> Result<Option<Play>> {
        let game_id = text(self.game_id).ok_or(AnalyticsError::MalformedPlay {
            row,
            field: "game_id",
        })?;
        let Some(play_type) = text(self.play_type) else {
            return Ok(None);
        };

        Ok(Some(Play {
            game_id,
            season: whole(self.season).unwrap_or(season_hint),
            week: whole(self.week).unwrap_or(0),
            play_id: finite(self.play_id),
            qtr: whole(self.qtr),
            time: text(self.time),
            drive: whole(self.drive),
            posteam: text(self.posteam),
            defteam: text(self.defteam),
            home_team: text(self.home_team),
            away_team: text(self.away_team),
            down: whole(self.down),
            ydstogo: finite(self.ydstogo),
            yardline_100: finite(self.yardline_100),
            play_type: PlayType::from(play_type.as_str()),
            yards_gained: finite(self.yards_gained).map(|y| y.round() as i32),
            epa: finite(self.epa),
            wpa: finite(self.wpa),
            wp: finite(self.wp),
            home_wp: finite(self.home_wp),
            away_wp: finite(self.away_wp),
            total_home_score: whole(self.total_home_score).unwrap_or(0),
            total_away_score: whole(self.total_away_score).unwrap_or(0),
            spread_line: finite(self.spread_line),
            desc: text(self.desc),
        }))
    }
}

/// Parse plays from any CSV source with a header row.
pub fn read_plays<R: io::Read>(reader: R, season_hint: u16) -> Result<Vec<Play>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut plays = Vec::new();
    let mut dropped = 0usize;

    for (idx, record) in rdr.deserialize::<RawPlayRow>().enumerate() {
        match record?.into_play(idx + 1, season_hint)? {
            Some(play) => plays.push(play),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} rows without a play type", dropped);
    }
    Ok(plays)
}

// ── Sources ──────────────────────────────────────────────────────────────────

/// Supplies raw plays for a season. `None` means the season is not available.
pub trait SeasonSource: Send + Sync {
    fn load_season(&self, season: u16) -> Result<Option<Vec<Play>>>;

    /// Seasons this source can load, ascending.
    fn available_seasons(&self) -> Result<Vec<u16>>;
}

pub struct CsvSeasonSource {
    dir: PathBuf,
}

impl CsvSeasonSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn season_path(&self, season: u16) -> PathBuf {
        self.dir.join(format!("nfl_{}.csv", season))
    }
}

fn season_from_file_name(name: &str) -> Option<u16> {
    name.strip_prefix("nfl_")?.strip_suffix(".csv")?.parse().ok()
}

impl SeasonSource for CsvSeasonSource {
    fn load_season(&self, season: u16) -> Result<Option<Vec<Play>>> {
        let path = self.season_path(season);
        if !path.exists() {
            tracing::debug!("No data file for season {} at {}", season, path.display());
            return Ok(None);
        }

        let file = std::fs::File::open(&path)?;
        let plays = read_plays(io::BufReader::new(file), season)?;
        tracing::info!("Loaded season {}: {} plays from {}", season, plays.len(), path.display());
        Ok(Some(plays))
    }

    fn available_seasons(&self) -> Result<Vec<u16>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("Season data directory {} does not exist", self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut seasons = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(season) = entry.file_name().to_str().and_then(season_from_file_name) {
                seasons.push(season);
            }
        }
        seasons.sort_unstable();
        Ok(seasons)
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

enum LoadFailure {
    Missing,
    Failed(AnalyticsError),
}

/// Read-through cache of season plays, shared by cloning.
///
/// Each season is loaded at most once, even when several callers ask for it
/// at the same time; afterwards the plays are shared read-only. Seasons the
/// source does not have resolve to an empty set and are not remembered.
#[derive(Clone)]
pub struct SeasonStore {
    source: Arc<dyn SeasonSource>,
    cells: Arc<Mutex<HashMap<u16, Arc<OnceCell<Arc<Vec<Play>>>>>>>,
}

impl SeasonStore {
    pub fn new(source: Arc<dyn SeasonSource>) -> Self {
        Self {
            source,
            cells: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get(&self, season: u16) -> Result<Arc<Vec<Play>>> {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells.entry(season).or_default().clone()
        };

        if let Some(plays) = cell.get() {
            tracing::debug!("Season {} served from cache", season);
            return Ok(plays.clone());
        }

        let source = self.source.clone();
        let loaded = cell
            .get_or_try_init(|| async move {
                match tokio::task::spawn_blocking(move || source.load_season(season)).await {
                    Ok(Ok(Some(plays))) => Ok(Arc::new(plays)),
                    Ok(Ok(None)) => Err(LoadFailure::Missing),
                    Ok(Err(e)) => Err(LoadFailure::Failed(e)),
                    Err(e) => Err(LoadFailure::Failed(e.into())),
                }
            })
            .await;

        match loaded {
            Ok(plays) => Ok(plays.clone()),
            Err(LoadFailure::Missing) => Ok(Arc::new(Vec::new())),
            Err(LoadFailure::Failed(e)) => Err(e),
        }
    }

    /// Several seasons, in the order asked for. Missing seasons come back empty.
    pub async fn get_many(&self, seasons: &[u16]) -> Result<Vec<Arc<Vec<Play>>>> {
        let mut loaded = Vec::with_capacity(seasons.len());
        for season in seasons {
            loaded.push(self.get(*season).await?);
        }
        Ok(loaded)
    }

    /// Seasons the source can supply, ascending.
    pub async fn available_seasons(&self) -> Result<Vec<u16>> {
        let source = self.source.clone();
        tokio::task::spawn_blocking(move || source.available_seasons()).await?
    }

    /// Seasons currently held in memory.
    pub async fn cached_seasons(&self) -> Vec<u16> {
        let cells = self.cells.lock().await;
        let mut seasons: Vec<u16> = cells
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(season, _)| *season)
            .collect();
        seasons.sort_unstable();
        seasons
    }
}

// ── Export ───────────────────────────────────────────────────────────────────

/// Write `classified_games.csv` and `big_upsets.csv` into `dir`.
pub fn export_classifications(
    dir: &Path,
    classified: &[OutcomeClassification],
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)?;

    let all_path = dir.join("classified_games.csv");
    let mut writer = csv::Writer::from_path(&all_path)?;
    for game in classified {
        writer.serialize(game)?;
    }
    writer.flush()?;

    let big_path = dir.join("big_upsets.csv");
    let mut writer = csv::Writer::from_path(&big_path)?;
    for game in classified.iter().filter(|g| g.is_big_upset()) {
        writer.serialize(game)?;
    }
    writer.flush()?;

    tracing::info!(
        "Exported {} classified games to {}",
        classified.len(),
        dir.display()
    );
    Ok((all_path, big_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const SAMPLE: &str = "\
game_id,season,week,play_id,qtr,time,drive,posteam,defteam,home_team,away_team,play_type,yards_gained,epa,wp,total_home_score,total_away_score,spread_line,desc
2023_01_DET_KC,2023,1,1.0,1,15:00,,,,KC,DET,,,,,0,0,4.5,GAME
2023_01_DET_KC,2023,1,40.0,1,15:00,1.0,DET,KC,KC,DET,kickoff,0.0,0.0,0.45,0,0,4.5,kickoff
2023_01_DET_KC,2023,1,55.0,1,14:55,1.0,DET,KC,KC,DET,run,4.0,0.12,0.47,0,0,4.5,run left
2023_01_DET_KC,2023,1,76.0,1,14:20,1.0,DET,KC,KC,DET,pass,NA,NA,0.49,0,0,NA,incomplete
";

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("driveforge-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_read_plays_from_csv() {
        let plays = read_plays(SAMPLE.as_bytes(), 2023).unwrap();

        // The first row has no play type and is dropped at ingestion.
        assert_eq!(plays.len(), 3);
        let run = &plays[1];
        assert_eq!(run.drive, Some(1));
        assert_eq!(run.play_type, PlayType::Run);
        assert_eq!(run.yards_gained, Some(4));
        assert_eq!(run.epa, Some(0.12));
        assert_eq!(run.wpa, None);
        assert_eq!(run.spread_line, Some(4.5));
        assert_eq!(run.qtr, Some(1));

        let pass = &plays[2];
        assert_eq!(pass.yards_gained, None);
        assert_eq!(pass.epa, None);
        assert_eq!(pass.spread_line, None);
    }

    #[test]
    fn test_missing_game_id_is_malformed() {
        let csv = "game_id,play_type,drive\n,run,1\n";
        let err = read_plays(csv.as_bytes(), 2023).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::MalformedPlay { row: 1, field: "game_id" }
        ));
    }

    #[test]
    fn test_csv_source_missing_and_present() {
        let dir = temp_dir("source");
        let source = CsvSeasonSource::new(&dir);
        std::fs::write(source.season_path(2023), SAMPLE).unwrap();

        assert!(source.load_season(1850).unwrap().is_none());
        let plays = source.load_season(2023).unwrap().unwrap();
        assert_eq!(plays.len(), 3);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_csv_source_available_seasons() {
        let dir = temp_dir("available");
        let source = CsvSeasonSource::new(&dir);
        std::fs::write(source.season_path(2021), SAMPLE).unwrap();
        std::fs::write(source.season_path(2019), SAMPLE).unwrap();
        std::fs::write(dir.join("nfl_notes.csv"), "x").unwrap();
        std::fs::write(dir.join("classified_games.csv"), "x").unwrap();
        std::fs::create_dir_all(dir.join("nfl_2030.csv")).unwrap();

        assert_eq!(source.available_seasons().unwrap(), vec![2019, 2021]);

        std::fs::remove_dir_all(&dir).ok();
        assert!(source.available_seasons().unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_integers_are_absent() {
        let csv = "game_id,play_type,season,week,qtr,down,drive,total_home_score\n\
                   g,run,70000,300,1,300,2.0,-3\n";
        let plays = read_plays(csv.as_bytes(), 2023).unwrap();

        let play = &plays[0];
        assert_eq!(play.season, 2023);
        assert_eq!(play.week, 0);
        assert_eq!(play.qtr, Some(1));
        assert_eq!(play.down, None);
        assert_eq!(play.drive, Some(2));
        assert_eq!(play.total_home_score, 0);
    }

    struct CountingSource {
        loads: AtomicUsize,
    }

    impl SeasonSource for CountingSource {
        fn load_season(&self, season: u16) -> Result<Option<Vec<Play>>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            if season == 2023 {
                Ok(Some(read_plays(SAMPLE.as_bytes(), season)?))
            } else {
                Ok(None)
            }
        }

        fn available_seasons(&self) -> Result<Vec<u16>> {
            Ok(vec![2023])
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_store_populates_once_under_concurrency() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let store = SeasonStore::new(source.clone());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.get(2023).await }));
        }
        for handle in handles {
            let plays = handle.await.unwrap().unwrap();
            assert_eq!(plays.len(), 3);
        }

        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert_eq!(store.cached_seasons().await, vec![2023]);
    }

    #[tokio::test]
    async fn test_store_missing_season_is_empty_and_not_cached() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let store = SeasonStore::new(source.clone());

        assert!(store.get(1900).await.unwrap().is_empty());
        assert!(store.get(1900).await.unwrap().is_empty());
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
        assert!(store.cached_seasons().await.is_empty());

        let many = store.get_many(&[2023, 1900]).await.unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[0].len(), 3);
        assert!(many[1].is_empty());
        assert_eq!(store.available_seasons().await.unwrap(), vec![2023]);
    }

    #[test]
    fn test_export_classifications() {
        use crate::models::ResultType;

        let dir = temp_dir("export");
        let game = OutcomeClassification {
            game_id: "2023_05_NYJ_DEN".to_string(),
            season: 2023,
            home_team: "DEN".to_string(),
            away_team: "NYJ".to_string(),
            spread: -10.0,
            expected_winner: "NYJ".to_string(),
            actual_winner: "DEN".to_string(),
            result_type: ResultType::Upset,
            big_home_favorite_upset: false,
            big_away_favorite_upset: true,
        };
        let confirmed = OutcomeClassification {
            game_id: "2023_05_A_B".to_string(),
            result_type: ResultType::ConfirmedWin,
            big_away_favorite_upset: false,
            ..game.clone()
        };

        let (all, big) = export_classifications(&dir, &[game, confirmed]).unwrap();
        let all = std::fs::read_to_string(all).unwrap();
        let big = std::fs::read_to_string(big).unwrap();

        assert_eq!(all.lines().count(), 3);
        assert!(all.lines().next().unwrap().starts_with("game_id,season,home_team"));
        assert_eq!(big.lines().count(), 2);
        assert!(big.contains("upset"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
