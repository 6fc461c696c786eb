//! Per-wallet rolling spend and transaction-count windows.
//!
//! Grounded on `coinbase/validators/transaction.py`'s `SpendingTracker`
//! dataclass: running totals per wallet with lazily-rolled windows,
//! modeled here as a `HashMap<String, WalletWindow>` behind one mutex.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rust_decimal::Decimal;

const HOUR: Duration = Duration::from_secs(3600);
const DAY: Duration = Duration::from_secs(86_400);

#[derive(Debug, Clone)]
struct WalletWindow {
    hourly_spending: Decimal,
    daily_spending: Decimal,
    hourly_tx_count: u32,
    daily_tx_count: u32,
    hourly_reset: Instant,
    daily_reset: Instant,
}

impl WalletWindow {
    fn starting_now(now: Instant) -> Self {
        WalletWindow {
            hourly_spending: Decimal::ZERO,
            daily_spending: Decimal::ZERO,
            hourly_tx_count: 0,
            daily_tx_count: 0,
            hourly_reset: now,
            daily_reset: now,
        }
    }

    /// Rolls expired windows over to zero, mirroring `_check_reset`'s
    /// `now - reset_time >= 3600` / `>= 86400` checks.
    fn check_reset(&mut self, now: Instant) {
        if now.duration_since(self.hourly_reset) >= HOUR {
            self.hourly_spending = Decimal::ZERO;
            self.hourly_tx_count = 0;
            self.hourly_reset = now;
        }
        if now.duration_since(self.daily_reset) >= DAY {
            self.daily_spending = Decimal::ZERO;
            self.daily_tx_count = 0;
            self.daily_reset = now;
        }
    }
}

/// A snapshot of one wallet's current spend and transaction counts,
/// returned by [`SpendingTracker::summary`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpendingSummary {
    pub hourly_spent: Decimal,
    pub daily_spent: Decimal,
    pub hourly_tx_count: u32,
    pub daily_tx_count: u32,
}

/// Tracks hourly and daily spend plus transaction counts per wallet
/// address. One instance is shared (behind an `Arc`) across every call
/// to [`crate::guard::TransactionGuard::validate`] for a given agent.
pub struct SpendingTracker {
    wallets: Mutex<HashMap<String, WalletWindow>>,
}

impl Default for SpendingTracker {
    fn default() -> Self {
        SpendingTracker::new()
    }
}

impl SpendingTracker {
    pub fn new() -> Self {
        SpendingTracker { wallets: Mutex::new(HashMap::new()) }
    }

    /// Records a transaction of `amount` for `wallet`, rolling over any
    /// expired windows first. `wallet` is lowercased before use as the
    /// map key so `0xAB…` and `0xab…` share a counter.
    pub fn record_transaction(&self, wallet: &str, amount: Decimal) {
        let now = Instant::now();
        let mut wallets = self.wallets.lock();
        let window = wallets.entry(wallet.to_ascii_lowercase()).or_insert_with(|| WalletWindow::starting_now(now));
        window.check_reset(now);
        window.hourly_spending += amount;
        window.daily_spending += amount;
        window.hourly_tx_count += 1;
        window.daily_tx_count += 1;
    }

    pub fn hourly_spent(&self, wallet: &str) -> Decimal {
        self.read(wallet, |w| w.hourly_spending)
    }

    pub fn daily_spent(&self, wallet: &str) -> Decimal {
        self.read(wallet, |w| w.daily_spending)
    }

    pub fn hourly_tx_count(&self, wallet: &str) -> u32 {
        self.read(wallet, |w| w.hourly_tx_count)
    }

    pub fn daily_tx_count(&self, wallet: &str) -> u32 {
        self.read(wallet, |w| w.daily_tx_count)
    }

    pub fn summary(&self, wallet: &str) -> SpendingSummary {
        let now = Instant::now();
        let mut wallets = self.wallets.lock();
        let window = wallets.entry(wallet.to_ascii_lowercase()).or_insert_with(|| WalletWindow::starting_now(now));
        window.check_reset(now);
        SpendingSummary {
            hourly_spent: window.hourly_spending,
            daily_spent: window.daily_spending,
            hourly_tx_count: window.hourly_tx_count,
            daily_tx_count: window.daily_tx_count,
        }
    }

    /// Clears one wallet's windows.
    pub fn reset(&self, wallet: &str) {
        self.wallets.lock().remove(&wallet.to_ascii_lowercase());
    }

    /// Clears every tracked wallet.
    pub fn reset_all(&self) {
        self.wallets.lock().clear();
    }

    fn read<T>(&self, wallet: &str, f: impl FnOnce(&WalletWindow) -> T) -> T
    where
        T: Default,
    {
        let now = Instant::now();
        let mut wallets = self.wallets.lock();
        match wallets.get_mut(&wallet.to_ascii_lowercase()) {
            Some(window) => {
                window.check_reset(now);
                f(window)
            }
            None => T::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn records_accumulate_within_window() {
        let tracker = SpendingTracker::new();
        tracker.record_transaction("0xabc", dec!(10));
        tracker.record_transaction("0xabc", dec!(15));
        assert_eq!(tracker.hourly_spent("0xabc"), dec!(25));
        assert_eq!(tracker.daily_spent("0xabc"), dec!(25));
        assert_eq!(tracker.hourly_tx_count("0xabc"), 2);
    }

    #[test]
    fn unknown_wallet_reads_as_zero() {
        let tracker = SpendingTracker::new();
        assert_eq!(tracker.hourly_spent("0xnope"), dec!(0));
        assert_eq!(tracker.hourly_tx_count("0xnope"), 0);
    }

    #[test]
    fn wallets_are_tracked_independently() {
        let tracker = SpendingTracker::new();
        tracker.record_transaction("0xa", dec!(100));
        tracker.record_transaction("0xb", dec!(1));
        assert_eq!(tracker.hourly_spent("0xa"), dec!(100));
        assert_eq!(tracker.hourly_spent("0xb"), dec!(1));
    }

    #[test]
    fn reset_clears_wallet_state() {
        let tracker = SpendingTracker::new();
        tracker.record_transaction("0xa", dec!(100));
        tracker.reset("0xa");
        assert_eq!(tracker.hourly_spent("0xa"), dec!(0));
    }

    #[test]
    fn reset_all_clears_every_wallet() {
        let tracker = SpendingTracker::new();
        tracker.record_transaction("0xa", dec!(100));
        tracker.record_transaction("0xb", dec!(50));
        tracker.reset_all();
        assert_eq!(tracker.hourly_spent("0xa"), dec!(0));
        assert_eq!(tracker.hourly_spent("0xb"), dec!(0));
    }

    #[test]
    fn wallet_keys_are_case_insensitive() {
        let tracker = SpendingTracker::new();
        tracker.record_transaction("0xABC", dec!(10));
        tracker.record_transaction("0xabc", dec!(5));
        assert_eq!(tracker.hourly_spent("0xAbC"), dec!(15));
        assert_eq!(tracker.hourly_tx_count("0xabc"), 2);
    }

    #[test]
    fn summary_matches_individual_accessors() {
        let tracker = SpendingTracker::new();
        tracker.record_transaction("0xa", dec!(5));
        let summary = tracker.summary("0xa");
        assert_eq!(summary.hourly_spent, dec!(5));
        assert_eq!(summary.daily_tx_count, 1);
    }
}
