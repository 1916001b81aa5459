/// Client-side turn timer seeded from a snapshot's `time_left`.
///
/// The local value ticks down once per tick interval. Authoritative values only replace it
/// when they drift past a threshold, so small disagreements never make the display jump.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Countdown {
    remaining: u64,
}

impl Countdown {
    pub fn new(remaining: u64) -> Self {
        Self { remaining }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    pub fn tick(&mut self) -> u64 {
        self.elapse(1)
    }

    pub fn elapse(&mut self, secs: u64) -> u64 {
        self.remaining = self.remaining.saturating_sub(secs);
        self.remaining
    }

    /// Snaps to `authoritative` when it differs from the local value by more than
    /// `threshold` seconds. Returns whether the local value changed.
    pub fn reconcile(&mut self, authoritative: u64, threshold: u64) -> bool {
        if authoritative.abs_diff(self.remaining) > threshold {
            self.remaining = authoritative;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tick__stops_at_zero() {
        let mut countdown = Countdown::new(1);
        assert_eq!(countdown.tick(), 0);
        assert_eq!(countdown.tick(), 0);
        assert!(countdown.is_expired());
    }

    #[test]
    fn reconcile__keeps_local_value_within_threshold() {
        // given
        let mut countdown = Countdown::new(30);

        // when
        let changed = countdown.reconcile(32, 2);

        // then
        assert!(!changed);
        assert_eq!(countdown.remaining(), 30);
    }

    #[test]
    fn reconcile__snaps_to_authoritative_past_threshold() {
        // given
        let mut countdown = Countdown::new(30);

        // when
        let changed = countdown.reconcile(12, 10);

        // then
        assert!(changed);
        assert_eq!(countdown.remaining(), 12);
    }

    proptest! {
        #[test]
        fn reconcile_respects_threshold(
            local in 0u64..600,
            authoritative in 0u64..600,
            threshold in 0u64..20,
        ) {
            let mut countdown = Countdown::new(local);
            countdown.reconcile(authoritative, threshold);
            if authoritative.abs_diff(local) <= threshold {
                prop_assert_eq!(countdown.remaining(), local);
            } else {
                prop_assert_eq!(countdown.remaining(), authoritative);
            }
        }
    }
}
