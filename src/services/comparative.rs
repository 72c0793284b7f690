//! Drive fingerprints against a scoped median baseline.

use std::collections::BTreeMap;

use crate::models::{
    ComparisonScope, DriveComparison, DriveFingerprint, DriveKey, DriveSummary, MetricVector,
    ScatterPoint,
};
use crate::utils::{median, ratio_or_zero};

pub struct ComparativeNormalizer;

impl ComparativeNormalizer {
    /// Drives of `candidates` that fall in `scope` around `target`.
    ///
    /// The result holds each `(game_id, drive)` once, in key order, even if
    /// `candidates` repeats a drive.
    pub fn resolve_pool<'a, I>(
        target: &DriveSummary,
        scope: ComparisonScope,
        candidates: I,
    ) -> Vec<&'a DriveSummary>
    where
        I: IntoIterator<Item = &'a DriveSummary>,
    {
        let in_scope = |s: &DriveSummary| match scope {
            ComparisonScope::Game => s.game_id == target.game_id,
            ComparisonScope::Week => s.season == target.season && s.week == target.week,
            ComparisonScope::Season => s.season == target.season,
            ComparisonScope::All => true,
        };

        let mut unique: BTreeMap<DriveKey, &DriveSummary> = BTreeMap::new();
        for summary in candidates.into_iter().filter(|s| in_scope(*s)) {
            unique.entry(summary.key()).or_insert(summary);
        }
        unique.into_values().collect()
    }

    /// Per-dimension median of the pool, `None` when the pool is empty.
    pub fn baseline(pool: &[&DriveSummary]) -> Option<MetricVector> {
        if pool.is_empty() {
            return None;
        }

        let columns: Vec<[f64; 6]> = pool.iter().map(|s| s.metrics().to_array()).collect();
        let mut medians = [0.0; 6];
        for (dim, slot) in medians.iter_mut().enumerate() {
            let column: Vec<f64> = columns.iter().map(|row| row[dim]).collect();
            *slot = median(&column).unwrap_or(0.0);
        }
        Some(MetricVector::from_array(medians))
    }

    /// Divide each metric by the baseline. A zero median yields 0 for that
    /// dimension, and a missing baseline yields all zeros.
    pub fn fingerprint(target: &DriveSummary, baseline: Option<&MetricVector>) -> DriveFingerprint {
        let values = match baseline {
            Some(baseline) => {
                let target = target.metrics().to_array();
                let base = baseline.to_array();
                let mut ratios = [0.0; 6];
                for (dim, slot) in ratios.iter_mut().enumerate() {
                    *slot = ratio_or_zero(target[dim], base[dim]);
                }
                MetricVector::from_array(ratios)
            }
            None => MetricVector::default(),
        };

        DriveFingerprint {
            values,
            reference: MetricVector::ones(),
        }
    }

    /// EPA / WPA / yards for every pooled drive, with the target flagged.
    pub fn scatter(pool: &[&DriveSummary], target: &DriveKey) -> Vec<ScatterPoint> {
        pool.iter()
            .map(|s| ScatterPoint {
                game_id: s.game_id.clone(),
                drive: s.drive,
                epa_total: s.epa_total,
                wpa_total: s.wpa_total,
                yards_total: s.yards_total as f64,
                is_target: s.game_id == target.game_id && s.drive == target.drive,
            })
            .collect()
    }

    /// Resolve the scope, then fingerprint `target` against it.
    pub fn compare<'a, I>(
        target: &DriveSummary,
        scope: ComparisonScope,
        candidates: I,
    ) -> DriveComparison
    where
        I: IntoIterator<Item = &'a DriveSummary>,
    {
        let pool = Self::resolve_pool(target, scope, candidates);
        let baseline = Self::baseline(&pool);
        let fingerprint = Self::fingerprint(target, baseline.as_ref());
        let key = target.key();
        let scatter = Self::scatter(&pool, &key);

        tracing::debug!(
            "Compared drive {} of {} against {} drives in {} scope",
            key.drive,
            key.game_id,
            pool.len(),
            scope
        );

        DriveComparison {
            target: key,
            scope,
            pool_size: pool.len(),
            baseline,
            fingerprint,
            scatter,
        }
    }
}
