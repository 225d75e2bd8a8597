use ark_bn254::Fr;
use creds_types::{CredsError, CredsResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Seconds since the Unix epoch, as seen by the ledger.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Settable clock for driving root expiry deterministically.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootEntry {
    pub root: Fr,
    pub inserted_at: u64,
}

/// Roots a credential has had, with the time each one was created.
///
/// The current root is always accepted. Any earlier root is accepted while
/// `now - inserted_at <= duration`. The root a credential is created with is
/// never dated, so once the first change replaces it, it is unknown.
#[derive(Clone, Debug)]
pub struct RootHistory {
    duration: Duration,
    entries: Vec<RootEntry>,
    created: HashMap<Fr, u64>,
}

impl RootHistory {
    pub fn new(initial_root: Fr, now: u64, duration: Duration) -> Self {
        Self {
            duration,
            entries: vec![RootEntry {
                root: initial_root,
                inserted_at: now,
            }],
            created: HashMap::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn current(&self) -> Fr {
        // `new` always records one entry.
        self.entries
            .last()
            .map(|e| e.root)
            .unwrap_or_default()
    }

    pub fn entries(&self) -> &[RootEntry] {
        &self.entries
    }

    /// Timestamps never go backwards within one history.
    pub fn record(&mut self, root: Fr, now: u64) {
        let inserted_at = self
            .entries
            .last()
            .map(|e| e.inserted_at.max(now))
            .unwrap_or(now);
        self.entries.push(RootEntry { root, inserted_at });
        self.created.insert(root, inserted_at);
    }

    pub fn check(&self, root: &Fr, now: u64) -> CredsResult<()> {
        if *root == self.current() {
            return Ok(());
        }
        let inserted_at = self.created.get(root).ok_or(CredsError::RootUnknown)?;
        if now.saturating_sub(*inserted_at) > self.duration.as_secs() {
            return Err(CredsError::RootExpired);
        }
        Ok(())
    }

    pub fn is_accepted(&self, root: &Fr, now: u64) -> bool {
        self.check(root, now).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3_600);

    #[test]
    fn test_current_root_never_expires() {
        let history = RootHistory::new(Fr::from(1u64), 100, HOUR);
        assert!(history.is_accepted(&Fr::from(1u64), 100 + 10 * 3_600));
    }

    #[test]
    fn test_previous_root_window() {
        let mut history = RootHistory::new(Fr::from(0u64), 0, HOUR);
        history.record(Fr::from(1u64), 100);
        history.record(Fr::from(2u64), 200);

        assert!(history.check(&Fr::from(1u64), 100 + 3_600).is_ok());
        assert_eq!(
            history.check(&Fr::from(1u64), 100 + 3_601).unwrap_err(),
            CredsError::RootExpired
        );
        assert_eq!(history.current(), Fr::from(2u64));
    }

    #[test]
    fn test_creation_root_not_dated() {
        let mut history = RootHistory::new(Fr::from(1u64), 100, HOUR);
        assert!(history.is_accepted(&Fr::from(1u64), 100));

        history.record(Fr::from(2u64), 100);
        assert_eq!(
            history.check(&Fr::from(1u64), 100).unwrap_err(),
            CredsError::RootUnknown
        );
    }

    #[test]
    fn test_unknown_root() {
        let history = RootHistory::new(Fr::from(1u64), 0, HOUR);
        assert_eq!(
            history.check(&Fr::from(9u64), 0).unwrap_err(),
            CredsError::RootUnknown
        );
    }

    #[test]
    fn test_timestamps_monotonic() {
        let mut history = RootHistory::new(Fr::from(1u64), 500, HOUR);
        history.record(Fr::from(2u64), 400);
        let times: Vec<u64> = history.entries().iter().map(|e| e.inserted_at).collect();
        assert_eq!(times, vec![500, 500]);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(10);
        let shared = clock.clone();
        clock.advance(Duration::from_secs(5));
        assert_eq!(shared.now(), 15);
        shared.set(1);
        assert_eq!(clock.now(), 1);
    }

    #[test]
    fn test_system_clock_is_recent() {
        assert!(SystemClock.now() > 1_600_000_000);
    }
}
