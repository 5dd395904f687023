// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::sync::{atomic::AtomicBool, Arc};

/// Cooperative cancellation flag shared between a solve and its caller
///
/// Workers poll the signal at loop boundaries only; a set signal makes the
/// current tier tear down its allocations and return
/// [`Error::Aborted`](crate::Error::Aborted). Positions already written are
/// discarded with the tier, so an aborted solve leaves no partial record file.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Requests cancellation, typically on observed memory pressure.
    pub fn send(&self) {
        self.0.store(true, std::sync::atomic::Ordering::Release);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Returns `Err(Aborted)` if the signal was sent.
    pub(crate) fn check(&self) -> crate::Result<()> {
        if self.is_stopped() {
            Err(crate::Error::Aborted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn stop_signal_observed_by_clones() {
        let signal = StopSignal::default();
        let clone = signal.clone();

        assert!(!clone.is_stopped());
        assert!(clone.check().is_ok());

        signal.send();

        assert!(clone.is_stopped());
        assert!(matches!(clone.check(), Err(crate::Error::Aborted)));
    }
}
