//! Bounded MPMC channel shared by the intake and result buffers.
//!
//! # 実装詳細
//! - `Mutex<State>` で排他制御（ロック区間で await しない）
//! - `Notify` で状態変化を待機中の sender / receiver に通知
//! - capacity 0 は rendezvous: 値が受け取られるまで `send` は完了しない

use std::collections::VecDeque;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Why a value could not be sent. The value is handed back.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SendError<T> {
    /// The channel was closed for new values.
    Closed(T),
    /// The channel is discarding (abort): the value is dropped by the caller.
    Discarded(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TryRecvError {
    #[error("no value is currently available")]
    Empty,
}

struct State<T> {
    buf: VecDeque<T>,

    /// Values ever pushed; the n-th pushed value has ticket n.
    pushed: u64,

    /// Values ever removed, either received or discarded.
    removed: u64,

    closed: bool,
    discarding: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    changed: Notify,
}

/// Handle to a bounded channel. Cloning shares the same buffer.
pub(crate) struct Channel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

pub(crate) fn bounded<T>(capacity: usize) -> Channel<T> {
    Channel {
        shared: Arc::new(Shared {
            state: Mutex::new(State {
                buf: VecDeque::with_capacity(capacity),
                pushed: 0,
                removed: 0,
                closed: false,
                discarding: false,
            }),
            capacity,
            changed: Notify::new(),
        }),
    }
}

impl<T> Channel<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // no user code runs under the lock, so a poisoned state is still consistent
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().buf.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Push a value, waiting while the buffer is full.
    ///
    /// With capacity 0 the value occupies a single hand-off slot and this
    /// returns only after a receiver took it (or it was discarded). Dropping
    /// the future before that withdraws the value again.
    pub(crate) async fn send(&self, value: T) -> Result<(), SendError<T>> {
        let slots = self.shared.capacity.max(1);

        let ticket = loop {
            let mut notified = pin!(self.shared.changed.notified());
            notified.as_mut().enable();
            {
                let mut state = self.lock();
                if state.closed {
                    return Err(SendError::Closed(value));
                }
                if state.discarding {
                    return Err(SendError::Discarded(value));
                }
                if state.buf.len() < slots {
                    state.buf.push_back(value);
                    let ticket = state.pushed;
                    state.pushed += 1;
                    drop(state);
                    self.shared.changed.notify_waiters();
                    break ticket;
                }
            }
            notified.await;
        };

        if self.shared.capacity == 0 {
            let _handoff = PendingHandoff {
                channel: self,
                ticket,
            };
            loop {
                let mut notified = pin!(self.shared.changed.notified());
                notified.as_mut().enable();
                if self.lock().removed > ticket {
                    break;
                }
                notified.await;
            }
        }

        Ok(())
    }

    /// Receive the next value, or `None` once the channel is closed (or
    /// discarding) and empty.
    pub(crate) async fn recv(&self) -> Option<T> {
        loop {
            let mut notified = pin!(self.shared.changed.notified());
            notified.as_mut().enable();
            match self.try_recv() {
                Ok(value) => return value,
                Err(TryRecvError::Empty) => {}
            }
            notified.await;
        }
    }

    pub(crate) fn try_recv(&self) -> Result<Option<T>, TryRecvError> {
        let mut state = self.lock();
        if let Some(value) = state.buf.pop_front() {
            state.removed += 1;
            drop(state);
            self.shared.changed.notify_waiters();
            return Ok(Some(value));
        }
        if state.closed || state.discarding {
            return Ok(None);
        }
        Err(TryRecvError::Empty)
    }

    /// Refuse new values. Buffered values stay receivable.
    /// Returns `false` if the channel was already closed.
    pub(crate) fn close(&self) -> bool {
        let was_open = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.closed, true)
        };
        self.shared.changed.notify_waiters();
        was_open
    }

    /// Drop every buffered value and every value sent from now on.
    /// Returns the number of buffered values dropped.
    pub(crate) fn discard(&self) -> usize {
        let dropped: VecDeque<T> = {
            let mut state = self.lock();
            state.discarding = true;
            let dropped = std::mem::take(&mut state.buf);
            state.removed = state.pushed;
            dropped
        };
        self.shared.changed.notify_waiters();
        // values are dropped outside the lock
        dropped.len()
    }
}

/// Rendezvous send waiting for a receiver.
///
/// If the send future is dropped before its value was taken, the value is
/// pulled back out of the hand-off slot so a cancelled send enqueues nothing.
struct PendingHandoff<'a, T> {
    channel: &'a Channel<T>,
    ticket: u64,
}

impl<T> Drop for PendingHandoff<'_, T> {
    fn drop(&mut self) {
        let withdrawn = {
            let mut state = self.channel.lock();
            if state.removed > self.ticket {
                None
            } else {
                // single slot: an untaken value at or past our ticket is ours
                state.removed += 1;
                state.buf.pop_front()
            }
        };
        if withdrawn.is_some() {
            self.channel.shared.changed.notify_waiters();
        }
    }
}
