//! Correlation table for in-flight queries.
//!
//! Maps a request id to the oneshot responder of the HTTP caller waiting
//! on it, plus the timer that will fail the request at its deadline. All
//! mutation goes through one mutex, so for any id exactly one of
//! {peer reply, timeout} wins and the loser is a silent no-op.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use plexbridge_core::outcome::{FailureReason, QueryOutcome};

struct PendingEntry {
    responder: oneshot::Sender<QueryOutcome>,
    timer: JoinHandle<()>,
}

/// Table of requests awaiting a peer reply.
#[derive(Default)]
pub struct PendingTable {
    entries: Mutex<HashMap<String, PendingEntry>>,
}

impl PendingTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a pending request and arm its deadline timer.
    ///
    /// Returns false (and registers nothing) if the id is already pending;
    /// ids are freshly generated uuids, so a hit here is a bug upstream.
    pub fn register(
        self: &Arc<Self>,
        id: &str,
        responder: oneshot::Sender<QueryOutcome>,
        timeout: Duration,
    ) -> bool {
        let mut entries = match self.entries.lock() {
            Ok(e) => e,
            Err(poisoned) => poisoned.into_inner(),
        };

        if entries.contains_key(id) {
            error!(id, "Duplicate pending request id");
            return false;
        }

        // The timer calls resolve(), which needs this same lock, so it
        // cannot fire before the insert below completes.
        let table = Arc::clone(self);
        let timer_id = id.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if table.resolve(&timer_id, QueryOutcome::Failed(FailureReason::Timeout)) {
                debug!(id = %timer_id, "Pending request timed out");
            }
        });

        entries.insert(id.to_string(), PendingEntry { responder, timer });
        true
    }

    /// Deliver an outcome to the request waiting on `id`.
    ///
    /// Returns true if an entry was found and resolved. An absent id is a
    /// no-op returning false: a late peer reply racing a just-fired
    /// timeout (or vice versa) is expected, not an error.
    pub fn resolve(&self, id: &str, outcome: QueryOutcome) -> bool {
        let entry = {
            let mut entries = match self.entries.lock() {
                Ok(e) => e,
                Err(poisoned) => poisoned.into_inner(),
            };
            entries.remove(id)
        };

        match entry {
            Some(entry) => {
                entry.timer.abort();
                // The receiver may already be gone if the HTTP caller
                // dropped the connection; nothing left to deliver then.
                let _ = entry.responder.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Number of requests currently awaiting resolution.
    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(e) => e.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answered(text: &str) -> QueryOutcome {
        QueryOutcome::Answered(text.to_string())
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let table = PendingTable::new();
        let (tx, rx) = oneshot::channel();

        assert!(table.register("a", tx, Duration::from_secs(60)));
        assert_eq!(table.len(), 1);

        assert!(table.resolve("a", answered("Paris")));
        assert_eq!(rx.await.unwrap(), answered("Paris"));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let table = PendingTable::new();
        let (tx, rx) = oneshot::channel();
        table.register("a", tx, Duration::from_secs(60));

        assert!(table.resolve("a", answered("first")));
        assert!(!table.resolve("a", answered("second")));
        assert_eq!(rx.await.unwrap(), answered("first"));
    }

    #[tokio::test]
    async fn test_resolve_unknown_id_is_noop() {
        let table = PendingTable::new();
        assert!(!table.resolve("nope", answered("x")));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_register_rejected() {
        let table = PendingTable::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();

        assert!(table.register("a", tx1, Duration::from_secs(60)));
        assert!(!table.register("a", tx2, Duration::from_secs(60)));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_fires_and_removes_entry() {
        let table = PendingTable::new();
        let (tx, rx) = oneshot::channel();
        table.register("a", tx, Duration::from_millis(20));

        assert_eq!(
            rx.await.unwrap(),
            QueryOutcome::Failed(FailureReason::Timeout)
        );
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_cancels_timer() {
        let table = PendingTable::new();
        let (tx, rx) = oneshot::channel();
        table.register("a", tx, Duration::from_millis(20));

        assert!(table.resolve("a", answered("Paris")));
        assert_eq!(rx.await.unwrap(), answered("Paris"));

        // If the timer were still alive it would have fired by now and
        // tried to double-resolve; the table must stay empty and quiet.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_resolve_single_winner() {
        for _ in 0..50 {
            let table = PendingTable::new();
            let (tx, rx) = oneshot::channel();
            table.register("a", tx, Duration::from_secs(60));

            let t1 = {
                let table = Arc::clone(&table);
                tokio::spawn(async move { table.resolve("a", answered("one")) })
            };
            let t2 = {
                let table = Arc::clone(&table);
                tokio::spawn(async move { table.resolve("a", answered("two")) })
            };

            let (r1, r2) = (t1.await.unwrap(), t2.await.unwrap());
            assert!(r1 ^ r2, "exactly one resolver must win");

            let outcome = rx.await.unwrap();
            assert!(outcome == answered("one") || outcome == answered("two"));
        }
    }

    #[tokio::test]
    async fn test_timeout_vs_reply_race_one_outcome() {
        // Arm a short deadline and race a reply against it; whichever wins,
        // the waiter sees exactly one outcome and the entry is gone.
        for _ in 0..20 {
            let table = PendingTable::new();
            let (tx, rx) = oneshot::channel();
            table.register("a", tx, Duration::from_millis(5));

            let racer = {
                let table = Arc::clone(&table);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    table.resolve("a", answered("Paris"))
                })
            };

            let outcome = rx.await.unwrap();
            assert!(
                outcome == answered("Paris")
                    || outcome == QueryOutcome::Failed(FailureReason::Timeout)
            );
            racer.await.unwrap();
            assert!(table.is_empty());
        }
    }

    #[tokio::test]
    async fn test_independent_ids_do_not_interfere() {
        let table = PendingTable::new();
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        table.register("a", tx_a, Duration::from_secs(60));
        table.register("b", tx_b, Duration::from_secs(60));

        assert!(table.resolve("b", answered("beta")));
        assert_eq!(table.len(), 1);
        assert_eq!(rx_b.await.unwrap(), answered("beta"));

        assert!(table.resolve("a", answered("alpha")));
        assert_eq!(rx_a.await.unwrap(), answered("alpha"));
    }
}
