use statrs::statistics::{Data, Median};

/// Divide, treating a zero denominator as "contributes nothing".
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Share of `count` in `total`, 0 when `total` is 0.
pub fn safe_pct(count: usize, total: usize) -> f64 {
    ratio_or_zero(count as f64, total as f64)
}

/// Median of a sample, `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Data::new(values.to_vec()).median())
}

/// Seconds remaining from a "MM:SS" game clock.
pub fn parse_clock(clock: &str) -> Option<u32> {
    let (minutes, seconds) = clock.trim().split_once(':')?;
    let minutes: u32 = minutes.parse().ok()?;
    let seconds: u32 = seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    minutes.checked_mul(60)?.checked_add(seconds)
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Resolve a user-typed team name against the known teams.
///
/// Exact (case-insensitive) matches win; otherwise the closest name by
/// Jaro-Winkler similarity is returned if it clears `min_similarity`.
pub fn closest_team<'a>(query: &str, teams: &'a [String], min_similarity: f64) -> Option<&'a str> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    if let Some(exact) = teams.iter().find(|t| t.eq_ignore_ascii_case(query)) {
        return Some(exact.as_str());
    }

    let query = query.to_uppercase();
    teams
        .iter()
        .map(|t| (t, strsim::jaro_winkler(&query, &t.to_uppercase())))
        .filter(|(_, score)| *score >= min_similarity)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_or_zero() {
        assert_eq!(ratio_or_zero(3.0, 4.0), 0.75);
        assert_eq!(ratio_or_zero(3.0, 0.0), 0.0);
        assert_eq!(safe_pct(0, 0), 0.0);
        assert_eq!(safe_pct(1, 2), 0.5);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[5.0]), Some(5.0));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        let even = median(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!((even - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("15:00"), Some(900));
        assert_eq!(parse_clock("0:07"), Some(7));
        assert_eq!(parse_clock("12:75"), None);
        assert_eq!(parse_clock("end"), None);
        assert_eq!(parse_clock("99999999:00"), None);
        assert_eq!(parse_clock("71582788:16"), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(-1.5, 0), -2.0);
    }

    #[test]
    fn test_closest_team() {
        let teams = vec!["KC".to_string(), "BUF".to_string(), "LAC".to_string()];
        assert_eq!(closest_team("kc", &teams, 0.8), Some("KC"));
        assert_eq!(closest_team("BUFF", &teams, 0.8), Some("BUF"));
        assert_eq!(closest_team("zzz", &teams, 0.8), None);
        assert_eq!(closest_team("  ", &teams, 0.8), None);
    }
}
