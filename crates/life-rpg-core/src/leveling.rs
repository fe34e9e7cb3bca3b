//! Level curve.
//!
//! Cumulative XP for level L is `floor(sum_{i=1}^{L-1} floor(i + 300 * 2^(i/7)) / 4)`.
//! The inner floor happens per term and the outer floor after the division;
//! saved profiles depend on exactly this ordering.

use std::sync::OnceLock;

pub const MAX_LEVEL: u8 = 99;

/// Cumulative XP thresholds, index = level. Index 0 is unused.
fn table() -> &'static [u64; MAX_LEVEL as usize + 1] {
    static TABLE: OnceLock<[u64; MAX_LEVEL as usize + 1]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u64; MAX_LEVEL as usize + 1];
        let mut points: u64 = 0;
        for level in 2..=MAX_LEVEL as usize {
            let i = (level - 1) as f64;
            points += (i + 300.0 * 2f64.powf(i / 7.0)).floor() as u64;
            table[level] = points / 4;
        }
        table
    })
}

/// Total XP needed to reach `level`. Levels above 99 are treated as 99,
/// level 0 as level 1.
pub fn xp_required_for_level(level: u8) -> u64 {
    let level = level.clamp(1, MAX_LEVEL);
    table()[level as usize]
}

/// Highest level whose threshold is at or below `xp`. Never below 1.
pub fn level_from_xp(xp: u64) -> u8 {
    let mut level = 1u8;
    while level < MAX_LEVEL && xp_required_for_level(level + 1) <= xp {
        level += 1;
    }
    level
}

/// XP still missing for the next level, `None` at the cap.
pub fn xp_to_next_level(xp: u64) -> Option<u64> {
    let level = level_from_xp(xp);
    if level >= MAX_LEVEL {
        return None;
    }
    Some(xp_required_for_level(level + 1) - xp)
}

/// Progress within the current level (0.0-1.0). 1.0 at the cap.
pub fn level_progress(xp: u64) -> f64 {
    let level = level_from_xp(xp);
    if level >= MAX_LEVEL {
        return 1.0;
    }
    let start = xp_required_for_level(level);
    let end = xp_required_for_level(level + 1);
    (xp - start) as f64 / (end - start) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_thresholds() {
        assert_eq!(xp_required_for_level(1), 0);
        assert_eq!(xp_required_for_level(2), 83);
        assert_eq!(xp_required_for_level(3), 174);
        assert_eq!(xp_required_for_level(10), 1154);
        assert_eq!(xp_required_for_level(50), 101_333);
        assert_eq!(xp_required_for_level(99), 13_034_431);
    }

    #[test]
    fn test_level_floor_and_cap() {
        assert_eq!(level_from_xp(0), 1);
        assert_eq!(level_from_xp(82), 1);
        assert_eq!(level_from_xp(83), 2);
        assert_eq!(level_from_xp(u64::MAX), 99);
        assert_eq!(xp_required_for_level(120), xp_required_for_level(99));
    }

    #[test]
    fn test_threshold_round_trip() {
        for level in 1..=MAX_LEVEL {
            assert_eq!(level_from_xp(xp_required_for_level(level)), level);
        }
    }

    #[test]
    fn test_monotonic() {
        let mut prev = 1;
        for xp in (0..200_000u64).step_by(37) {
            let level = level_from_xp(xp);
            assert!(level >= prev, "level dropped at xp={}", xp);
            prev = level;
        }
    }

    #[test]
    fn test_progress_and_remaining() {
        assert_eq!(xp_to_next_level(0), Some(83));
        assert_eq!(xp_to_next_level(13_034_431), None);
        assert_eq!(level_progress(0), 0.0);
        assert_eq!(level_progress(13_034_431), 1.0);
        let mid = level_progress(128);
        assert!(mid > 0.4 && mid < 0.6, "got {}", mid);
    }
}
