//! Converts cumulative byte counters into per-period deltas

use crate::parser::Counters;

/// Compute the traffic attributable to the current period from a fresh
/// cumulative reading and the last known one.
///
/// Counters only grow while the router stays up; a reading below the last
/// known value in either direction means the counter was reset (reboot,
/// interface restart, overflow). Whatever accrued between the last sample
/// and the reset is unrecoverable, so the post-reset reading itself stands
/// in as the period's traffic. A device seen for the first time contributes
/// nothing this period: the reading only establishes the baseline.
pub fn period_delta(observed: Counters, last: Option<Counters>) -> Counters {
    let Some(last) = last else {
        return Counters { rx: 0, tx: 0 };
    };

    if observed.rx < last.rx || observed.tx < last.tx {
        // Counter reset: both directions restart from the observed reading
        observed
    } else {
        Counters {
            rx: observed.rx - last.rx,
            tx: observed.tx - last.tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(rx: u64, tx: u64) -> Counters {
        Counters { rx, tx }
    }

    #[test]
    fn first_observation_contributes_nothing() {
        assert_eq!(period_delta(c(1000, 2000), None), c(0, 0));
    }

    #[test]
    fn monotonic_growth_yields_difference() {
        assert_eq!(period_delta(c(1500, 2600), Some(c(1000, 2000))), c(500, 600));
    }

    #[test]
    fn unchanged_counters_yield_zero() {
        assert_eq!(period_delta(c(1000, 2000), Some(c(1000, 2000))), c(0, 0));
    }

    #[test]
    fn reset_yields_observed_reading() {
        assert_eq!(period_delta(c(200, 300), Some(c(1500, 2600))), c(200, 300));
    }

    #[test]
    fn reset_in_one_direction_resets_both() {
        // rx went backwards while tx kept growing: the counters are from a
        // new epoch, so the raw tx difference would mix epochs
        assert_eq!(period_delta(c(40, 9000), Some(c(1500, 2600))), c(40, 9000));
        assert_eq!(period_delta(c(9000, 40), Some(c(1500, 2600))), c(9000, 40));
    }

    #[test]
    fn delta_is_never_negative() {
        for (new, old) in [(c(0, 0), c(1, 1)), (c(5, 0), c(0, 5)), (c(7, 7), c(7, 8))] {
            let delta = period_delta(new, Some(old));
            assert_eq!(delta, new, "reset path must return the raw reading");
        }
    }
}
