use rand::Rng;
use std::time::Duration;

/// Uniform integer draw from an inclusive `[min, max]` range. Degenerate
/// ranges (`min == max`) and inverted ranges both resolve without panicking;
/// an inverted range collapses to its lower bound.
pub fn draw_u64(range: [u64; 2]) -> u64 {
    let [min, max] = range;
    if max <= min {
        return min.min(max);
    }
    rand::thread_rng().gen_range(min..=max)
}

pub fn draw_u32(range: [u32; 2]) -> u32 {
    draw_u64([u64::from(range[0]), u64::from(range[1])]) as u32
}

/// Pacing sleep duration drawn from an inclusive seconds range.
pub fn pause_secs(range: [u64; 2]) -> (u64, Duration) {
    let secs = draw_u64(range);
    (secs, Duration::from_secs(secs))
}

/// One chance in two. Used for the stable-source destination coin flip.
pub fn coin_flip() -> bool {
    rand::thread_rng().gen_bool(0.5)
}

/// 32 fresh random bytes, used as synthetic content hashes.
pub fn random_bytes32() -> [u8; 32] {
    let mut buf = [0u8; 32];
    rand::thread_rng().fill(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::{draw_u32, draw_u64};

    #[test]
    fn test_draw_u64_stays_within_inclusive_bounds() {
        for _ in 0..1_000 {
            let drawn = draw_u64([5, 10]);
            assert!((5..=10).contains(&drawn), "drawn {drawn} out of [5,10]");
        }
    }

    #[test]
    fn test_draw_u64_covers_both_endpoints() {
        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..1_000 {
            match draw_u64([1, 2]) {
                1 => seen_min = true,
                2 => seen_max = true,
                other => panic!("unexpected draw {other}"),
            }
        }
        assert!(seen_min && seen_max);
    }

    #[test]
    fn test_degenerate_and_inverted_ranges() {
        assert_eq!(draw_u64([7, 7]), 7);
        assert_eq!(draw_u64([9, 3]), 3);
        assert_eq!(draw_u32([4, 4]), 4);
    }
}
