use crate::models::{DriveSummary, MomentumSwings, SwingDirection};

/// Flags drives whose win probability crossed the midpoint.
pub struct MomentumSwingDetector {
    threshold: f64,
}

impl MomentumSwingDetector {
    pub fn new() -> Self {
        Self { threshold: 0.5 }
    }

    /// Strict crossings only: a drive starting or ending exactly on the
    /// threshold, or missing either win probability, is neutral.
    pub fn classify(&self, summary: &DriveSummary) -> SwingDirection {
        let (Some(start), Some(end)) = (summary.start_wp, summary.end_wp) else {
            return SwingDirection::Neutral;
        };

        if start < self.threshold && end > self.threshold {
            SwingDirection::SwingUp
        } else if start > self.threshold && end < self.threshold {
            SwingDirection::SwingDown
        } else {
            SwingDirection::Neutral
        }
    }

    /// Split a pool into swing-up and swing-down drives, each ordered by
    /// `(game_id, drive)` ascending. Neutral drives are left out.
    pub fn detect<'a, I>(&self, pool: I) -> MomentumSwings
    where
        I: IntoIterator<Item = &'a DriveSummary>,
    {
        let mut swings = MomentumSwings::default();

        for summary in pool {
            match self.classify(summary) {
                SwingDirection::SwingUp => swings.swing_up.push(summary.clone()),
                SwingDirection::SwingDown => swings.swing_down.push(summary.clone()),
                SwingDirection::Neutral => {}
            }
        }

        let by_key = |a: &DriveSummary, b: &DriveSummary| {
            (a.game_id.as_str(), a.drive).cmp(&(b.game_id.as_str(), b.drive))
        };
        swings.swing_up.sort_by(by_key);
        swings.swing_down.sort_by(by_key);

        tracing::debug!(
            "Momentum swings: {} up, {} down",
            swings.swing_up.len(),
            swings.swing_down.len()
        );
        swings
    }

    /// `detect`, restricted to one season and optionally one week.
    pub fn detect_in<'a, I>(&self, pool: I, season: u16, week: Option<u8>) -> MomentumSwings
    where
        I: IntoIterator<Item = &'a DriveSummary>,
    {
        self.detect(
            pool.into_iter()
                .filter(|s| s.season == season && week.map_or(true, |w| s.week == w)),
        )
    }
}

impl Default for MomentumSwingDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Score;

    fn summary(
        game_id: &str,
        drive: u32,
        start_wp: Option<f64>,
        end_wp: Option<f64>,
    ) -> DriveSummary {
        DriveSummary {
            game_id: game_id.to_string(),
            drive,
            season: 2023,
            week: 1,
            posteam: None,
            defteam: None,
            play_count: 1,
            epa_total: 0.0,
            wpa_total: 0.0,
            yards_total: 0,
            run_pct: 0.0,
            pass_pct: 0.0,
            start_wp,
            end_wp,
            start_score: Score::default(),
            end_score: Score::default(),
        }
    }

    #[test]
    fn test_classify_crossings() {
        let detector = MomentumSwingDetector::new();
        assert_eq!(
            detector.classify(&summary("g", 1, Some(0.40), Some(0.55))),
            SwingDirection::SwingUp
        );
        assert_eq!(
            detector.classify(&summary("g", 1, Some(0.70), Some(0.20))),
            SwingDirection::SwingDown
        );
        assert_eq!(
            detector.classify(&summary("g", 1, Some(0.30), Some(0.45))),
            SwingDirection::Neutral
        );
    }

    #[test]
    fn test_exact_threshold_is_neutral() {
        let detector = MomentumSwingDetector::new();
        for (start, end) in [(0.5, 0.5), (0.4, 0.5), (0.5, 0.6), (0.6, 0.5), (0.5, 0.4)] {
            assert_eq!(
                detector.classify(&summary("g", 1, Some(start), Some(end))),
                SwingDirection::Neutral
            );
        }
        assert_eq!(
            detector.classify(&summary("g", 1, None, Some(0.9))),
            SwingDirection::Neutral
        );
    }

    #[test]
    fn test_detect_is_sorted_and_disjoint() {
        let pool = vec![
            summary("b", 3, Some(0.2), Some(0.8)),
            summary("a", 7, Some(0.9), Some(0.1)),
            summary("a", 2, Some(0.3), Some(0.6)),
            summary("a", 4, Some(0.5), Some(0.5)),
        ];
        let swings = MomentumSwingDetector::new().detect(&pool);

        let up: Vec<(&str, u32)> = swings
            .swing_up
            .iter()
            .map(|s| (s.game_id.as_str(), s.drive))
            .collect();
        assert_eq!(up, vec![("a", 2), ("b", 3)]);
        assert_eq!(swings.swing_down.len(), 1);
        assert_eq!(swings.swing_down[0].drive, 7);
        assert!(swings
            .swing_up
            .iter()
            .all(|u| !swings.swing_down.iter().any(|d| d.key() == u.key())));
    }

    #[test]
    fn test_detect_in_week() {
        let mut week_two = summary("c", 1, Some(0.1), Some(0.9));
        week_two.week = 2;
        let pool = vec![summary("a", 1, Some(0.1), Some(0.9)), week_two];

        let detector = MomentumSwingDetector::new();
        assert_eq!(detector.detect_in(&pool, 2023, Some(2)).swing_up.len(), 1);
        assert_eq!(detector.detect_in(&pool, 2023, None).swing_up.len(), 2);
        assert!(detector.detect_in(&pool, 2022, None).swing_up.is_empty());
    }
}
