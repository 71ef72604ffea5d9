//! Stop, deadline and node-budget accounting shared by every thread taking
//! part in one search.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Where the wall-clock deadline and the external stop flag are polled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlinePolling {
    #[default]
    /// Between root moves and between depths only. A subtree already being
    /// searched always runs to completion.
    RootMoves,
    /// Additionally every `n` nodes inside the recursion, including inside
    /// worker tasks.
    EveryNodes(u64),
}

#[derive(Debug)]
pub struct SearchControl {
    stopped: AtomicBool,
    external_stop: Option<Arc<AtomicBool>>,
    nodes: AtomicU64,
    max_nodes: Option<u64>,
    started_at: Instant,
    deadline: Option<Instant>,
    polling: DeadlinePolling,
}

impl SearchControl {
    pub fn new(
        movetime_ms: Option<u64>,
        max_nodes: Option<u64>,
        external_stop: Option<Arc<AtomicBool>>,
        polling: DeadlinePolling,
    ) -> Self {
        let started_at = Instant::now();
        Self {
            stopped: AtomicBool::new(false),
            external_stop,
            nodes: AtomicU64::new(0),
            max_nodes: max_nodes.filter(|n| *n > 0),
            started_at,
            deadline: movetime_ms.map(|ms| started_at + Duration::from_millis(ms.max(1))),
            polling,
        }
    }

    #[inline]
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    /// Count one node and return the new total.
    #[inline]
    pub fn count_node(&self) -> u64 {
        self.nodes.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    fn external_stop_requested(&self) -> bool {
        self.external_stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn node_budget_spent(&self) -> bool {
        self.max_nodes.is_some_and(|cap| self.nodes() >= cap)
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|limit| Instant::now() >= limit)
    }

    /// Full check used between root moves and between depths. Latches the
    /// stop flag once any limit is hit.
    pub fn should_stop_at_root(&self) -> bool {
        if self.is_stopped() {
            return true;
        }
        if self.external_stop_requested() || self.node_budget_spent() || self.deadline_passed() {
            self.request_stop();
            return true;
        }
        false
    }

    /// Check used at every interior node. The node budget and an already
    /// latched stop are always honoured; the clock and the external flag only
    /// on the configured node interval.
    pub fn should_stop_in_tree(&self, nodes: u64) -> bool {
        if self.is_stopped() {
            return true;
        }
        if self.node_budget_spent() {
            self.request_stop();
            return true;
        }
        match self.polling {
            DeadlinePolling::RootMoves => false,
            DeadlinePolling::EveryNodes(interval) => {
                if nodes % interval.max(1) != 0 {
                    return false;
                }
                if self.external_stop_requested() || self.deadline_passed() {
                    self.request_stop();
                    return true;
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::{DeadlinePolling, SearchControl};

    #[test]
    fn node_budget_stops_everywhere() {
        let control = SearchControl::new(None, Some(5), None, DeadlinePolling::RootMoves);
        for _ in 0..4 {
            control.count_node();
        }
        assert!(!control.should_stop_in_tree(4));
        control.count_node();
        assert!(control.should_stop_in_tree(5));
        assert!(control.should_stop_at_root());
    }

    #[test]
    fn deadline_is_only_polled_at_the_root_by_default() {
        let control = SearchControl::new(Some(1), None, None, DeadlinePolling::RootMoves);
        thread::sleep(Duration::from_millis(5));
        assert!(!control.should_stop_in_tree(1024));
        assert!(control.should_stop_at_root());
        // Latched: the tree sees it from now on.
        assert!(control.should_stop_in_tree(1));
    }

    #[test]
    fn every_nodes_polling_checks_the_clock_on_the_interval() {
        let control = SearchControl::new(Some(1), None, None, DeadlinePolling::EveryNodes(64));
        thread::sleep(Duration::from_millis(5));
        assert!(!control.should_stop_in_tree(63));
        assert!(control.should_stop_in_tree(64));
    }

    #[test]
    fn external_flag_is_observed() {
        let flag = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new(None, None, Some(Arc::clone(&flag)), DeadlinePolling::RootMoves);
        assert!(!control.should_stop_at_root());
        flag.store(true, Ordering::Relaxed);
        assert!(control.should_stop_at_root());
        assert!(control.is_stopped());
    }
}
