//! Pure barrier arithmetic.
//!
//! Kept free of I/O so the release and overflow rules can be tested with
//! explicit inputs.

/// Whether a barrier waiting for `target` participants is released at `count`.
#[inline]
pub fn is_barrier_reached(count: u64, target: u64) -> bool {
    count >= target
}

/// Whether a counter value produced by a signal is still within the target.
#[inline]
pub fn is_within_target(count: u64, target: u64) -> bool {
    count <= target
}

/// Number of participants still expected before release.
#[inline]
pub fn remaining_participants(count: u64, target: u64) -> u64 {
    target.saturating_sub(count)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_release_exactly_at_target() {
        assert!(!is_barrier_reached(2, 3));
        assert!(is_barrier_reached(3, 3));
        assert_eq!(remaining_participants(1, 3), 2);
        assert_eq!(remaining_participants(5, 3), 0);
    }

    proptest! {
        #[test]
        fn prop_released_iff_nothing_remaining(count in 0u64..10_000, target in 1u64..10_000) {
            prop_assert_eq!(is_barrier_reached(count, target), remaining_participants(count, target) == 0);
        }

        #[test]
        fn prop_within_target_until_released(count in 0u64..10_000, target in 1u64..10_000) {
            if is_within_target(count, target) && count != target {
                prop_assert!(!is_barrier_reached(count, target));
            }
        }
    }
}
