//! Property-based tests for window gating and delta computation

use monetary_policy::{compute_supply_delta, window_for, RebaseTiming, MAX_RATE};
use proptest::prelude::*;
use rebase_ledger::{FixedPoint, MAX_SUPPLY, MIN_SUPPLY, U256};

/// Valid timing: interval up to a week, window inside the period
fn timing_strategy() -> impl Strategy<Value = RebaseTiming> {
    (1u64..604_800)
        .prop_flat_map(|interval| (Just(interval), 0..=interval))
        .prop_flat_map(|(interval, offset)| (Just(interval), Just(offset), 0..=interval - offset))
        .prop_map(|(interval, offset, length)| RebaseTiming::new(interval, offset, length).unwrap())
}

fn fixed_strategy() -> impl Strategy<Value = FixedPoint> {
    // Up to 10^7 with 18 decimals
    (0u128..10_000_000_000_000_000_000_000_000).prop_map(|raw| FixedPoint::from_raw(U256::from(raw)))
}

proptest! {
    #[test]
    fn window_respects_interval_and_alignment(
        timing in timing_strategy(),
        now in 1_000_000_000u64..2_000_000_000,
        since_last in 0u64..1_000_000,
    ) {
        let interval = timing.min_rebase_time_interval_sec;
        let last = now - since_last;
        let window = window_for(now, last, &timing);

        prop_assert_eq!(window.open % interval, timing.rebase_window_offset_sec % interval);
        prop_assert_eq!(window.close - window.open, timing.rebase_window_length_sec);
        prop_assert!(window.open >= last + interval);
        // Never more than one period past what the interval requires
        let unshifted = now - now % interval + timing.rebase_window_offset_sec;
        prop_assert!(window.open < unshifted.max(last + interval) + interval);
    }

    #[test]
    fn accepted_rebases_are_an_interval_apart(
        timing in timing_strategy(),
        start in 1_000_000_000u64..2_000_000_000,
        steps in prop::collection::vec(1u64..200_000, 1..30),
    ) {
        let mut now = start;
        let mut last = 0u64;

        for step in steps {
            now += step;
            let window = window_for(now, last, &timing);
            if window.contains(now) {
                if last > 0 {
                    prop_assert!(window.open >= last + timing.min_rebase_time_interval_sec);
                }
                last = window.open;
            }
        }
    }

    #[test]
    fn delta_keeps_supply_in_bounds(
        supply in MIN_SUPPLY..=MAX_SUPPLY,
        rate in fixed_strategy(),
        target in fixed_strategy().prop_filter("non-zero target", |t| !t.is_zero()),
        threshold in (0u64..200_000_000_000_000_000).prop_map(|raw| FixedPoint::from_raw(U256::from(raw))),
        lag in 1u64..100,
    ) {
        let delta = compute_supply_delta(supply, rate, target, threshold, lag).unwrap();
        let after = delta.apply_to(supply);

        prop_assert!(after >= MIN_SUPPLY);
        if delta.is_negative() {
            prop_assert_eq!(supply - after, delta.magnitude());
        } else {
            prop_assert!(delta.magnitude() <= MAX_SUPPLY - supply);
            prop_assert_eq!(after - supply, delta.magnitude());
        }
    }

    #[test]
    fn rates_above_max_rate_match_max_rate(
        supply in 1u128..1_000_000_000_000_000_000,
        excess in 1u128..1_000_000_000_000_000_000_000_000,
        lag in 1u64..100,
    ) {
        let target = FixedPoint::ONE;
        let threshold = FixedPoint::from_raw(U256::from(50_000_000_000_000_000u64));
        let above = FixedPoint::from_raw(MAX_RATE.raw() + U256::from(excess));

        prop_assert_eq!(
            compute_supply_delta(supply, above, target, threshold, lag).unwrap(),
            compute_supply_delta(supply, MAX_RATE, target, threshold, lag).unwrap()
        );
    }

    #[test]
    fn damping_shrinks_the_adjustment(
        supply in 1_000u128..1_000_000_000_000_000_000,
        rate in fixed_strategy(),
        lag in 2u64..100,
    ) {
        let target = FixedPoint::ONE;
        let undamped = compute_supply_delta(supply, rate, target, FixedPoint::ZERO, 1).unwrap();
        let damped = compute_supply_delta(supply, rate, target, FixedPoint::ZERO, lag).unwrap();
        prop_assert!(damped.magnitude() <= undamped.magnitude());
    }
}
