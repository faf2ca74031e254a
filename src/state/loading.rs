//! Loading barrier: one readiness signal over several independent fetches.
//!
//! Each dashboard widget performs its own fetch and signals its named source
//! from both the success and the failure branch; "settled" means "stopped
//! waiting", not "succeeded". The barrier therefore never blocks on one
//! widget's failure. A hung request does leave its source unsettled for the
//! life of the view; that is an accepted transport limitation, not
//! something the barrier papers over.

#[cfg(test)]
#[path = "loading_test.rs"]
mod loading_test;

use std::collections::BTreeMap;

/// Barrier lifecycle: no sources signaled yet, some signaled, all signaled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BarrierPhase {
    #[default]
    Pending,
    Settling,
    Settled,
}

/// Per-view readiness registry. Constructed fresh on every view mount so
/// concurrent view instances never share flags.
#[derive(Debug, Default)]
pub struct LoadingBarrier {
    sources: BTreeMap<&'static str, bool>,
    registered: bool,
    released: bool,
}

impl LoadingBarrier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the source membership. Must be called exactly once, before any
    /// signal.
    ///
    /// # Panics
    ///
    /// Panics on a second call; membership is fixed for the instance.
    pub fn register_sources(&mut self, names: &[&'static str]) {
        assert!(!self.registered, "barrier sources already registered");
        self.registered = true;
        for name in names.iter().copied() {
            self.sources.insert(name, false);
        }
    }

    /// Mark one source settled. Idempotent on already-settled sources; once
    /// settled a source never unsettles within this instance.
    ///
    /// # Panics
    ///
    /// Panics on an unregistered name; that is a programming error in the
    /// caller, not a runtime condition.
    pub fn signal(&mut self, name: &str) {
        let Some(settled) = self.sources.get_mut(name) else {
            panic!("signal on unregistered loading source {name:?}");
        };
        *settled = true;
    }

    /// True iff every registered source has settled.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.registered && self.sources.values().all(|settled| *settled)
    }

    #[must_use]
    pub fn phase(&self) -> BarrierPhase {
        if self.is_ready() {
            BarrierPhase::Settled
        } else if self.sources.values().any(|settled| *settled) {
            BarrierPhase::Settling
        } else {
            BarrierPhase::Pending
        }
    }

    /// True exactly once, on or after the first transition to ready: the
    /// presentation's "drop the blocking overlay" hook. Later re-fetches
    /// within the same view instance never re-block.
    pub fn take_release(&mut self) -> bool {
        if self.released || !self.is_ready() {
            return false;
        }
        self.released = true;
        true
    }
}
