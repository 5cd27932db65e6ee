//! One-shot abort latch.

use std::sync::Arc;

use tokio::sync::watch;

/// Broadcast latch: fires once, observed by every executor, never reset.
///
/// Backed by a `watch` channel so that late subscribers still see the fired
/// state and waiting executors are all woken at once.
#[derive(Clone)]
pub(crate) struct AbortSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortSignal {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the latch. Returns `true` only for the call that fired it.
    pub(crate) fn trigger(&self) -> bool {
        // send_replace works with or without live receivers
        !self.tx.send_replace(true)
    }

    pub(crate) fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the latch has fired.
    pub(crate) async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives inside `self`, so wait_for cannot observe a closed channel
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn fires_exactly_once() {
        let signal = AbortSignal::new();
        assert!(!signal.is_triggered());
        assert!(signal.trigger());
        assert!(!signal.trigger());
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn wakes_every_waiter() {
        let signal = AbortSignal::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.triggered().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.trigger();

        for w in waiters {
            timeout(Duration::from_secs(1), w).await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn already_fired_resolves_immediately() {
        let signal = AbortSignal::new();
        signal.trigger();
        timeout(Duration::from_millis(100), signal.triggered())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn pending_until_fired() {
        let signal = AbortSignal::new();
        assert!(timeout(Duration::from_millis(30), signal.triggered()).await.is_err());
    }
}
