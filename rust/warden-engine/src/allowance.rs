/// A rate-limited spending budget.
///
/// Balances refill linearly: every elapsed `refill_interval` seconds since
/// `refill_timestamp` adds `refill_amount`, capped at `max_balance`. A zero
/// interval disables refill entirely, and a timestamp in the future defers
/// it. All arithmetic saturates; a budget can never wrap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Allowance {
    /// The balance recorded at `refill_timestamp`.
    pub balance: u128,
    /// The ceiling refills accrue towards.
    pub max_balance: u128,
    /// Amount added per elapsed interval.
    pub refill_amount: u128,
    /// Refill interval in seconds; zero disables refill.
    pub refill_interval: u64,
    /// When the balance was last settled.
    pub refill_timestamp: u64,
}

impl Allowance {
    /// The balance available at `now`, with accrued refills applied.
    pub fn available(&self, now: u64) -> u128 {
        if self.refill_interval == 0 || self.refill_timestamp > now {
            return self.balance;
        }
        let intervals = (now - self.refill_timestamp) / self.refill_interval;
        self.balance
            .saturating_add(u128::from(intervals).saturating_mul(self.refill_amount))
            .min(self.max_balance)
    }

    /// The allowance after debiting `spend` at `now`, or `None` when the
    /// spend exceeds the available balance. On success the timestamp settles
    /// to `now` (unless refill is disabled or deferred).
    pub fn debit(&self, spend: u128, now: u64) -> Option<Allowance> {
        let available = self.available(now);
        if spend > available {
            return None;
        }
        Some(Allowance {
            balance: available - spend,
            refill_timestamp: if self.refill_interval > 0 && self.refill_timestamp <= now {
                now
            } else {
                self.refill_timestamp
            },
            ..*self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowance() -> Allowance {
        Allowance {
            balance: 250,
            max_balance: u128::MAX,
            refill_amount: 100,
            refill_interval: 500,
            refill_timestamp: 1_000,
        }
    }

    #[test]
    fn accrues_one_refill_per_whole_interval() {
        assert_eq!(allowance().available(1_000), 250);
        assert_eq!(allowance().available(1_499), 250);
        assert_eq!(allowance().available(1_500), 350);
        assert_eq!(allowance().available(1_750), 350);
        assert_eq!(allowance().available(2_000), 450);
    }

    #[test]
    fn refills_cap_at_the_maximum_balance() {
        let capped = Allowance {
            max_balance: 400,
            ..allowance()
        };
        assert_eq!(capped.available(1_000_000), 400);
    }

    #[test]
    fn a_zero_interval_never_refills() {
        let frozen = Allowance {
            refill_interval: 0,
            ..allowance()
        };
        assert_eq!(frozen.available(1_000_000), 250);
    }

    #[test]
    fn a_future_timestamp_defers_refill() {
        let deferred = Allowance {
            refill_timestamp: 5_000,
            ..allowance()
        };
        assert_eq!(deferred.available(1_750), 250);
        // The timestamp also stays put on a successful debit.
        assert_eq!(deferred.debit(50, 1_750).unwrap().refill_timestamp, 5_000);
    }

    #[test]
    fn debits_settle_the_balance_and_timestamp() {
        let settled = allowance().debit(350, 1_750).unwrap();
        assert_eq!(settled.balance, 0);
        assert_eq!(settled.refill_timestamp, 1_750);

        assert_eq!(allowance().debit(351, 1_750), None);
    }
}
