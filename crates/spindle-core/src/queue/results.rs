use crate::channel::{Channel, TryRecvError};

/// Consumer side of a queue's result buffer.
///
/// Single pass: every result is delivered once. Clones compete for results
/// rather than each seeing all of them. The stream ends (`recv` returns
/// `None`) once every executor has exited and the buffer is empty.
pub struct Results<R> {
    channel: Channel<R>,
}

impl<R> Clone for Results<R> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

impl<R> Results<R> {
    pub(crate) fn new(channel: Channel<R>) -> Self {
        Self { channel }
    }

    /// Wait for the next result. `None` means no further results will arrive.
    pub async fn recv(&self) -> Option<R> {
        self.channel.recv().await
    }

    /// Take a result if one is ready.
    ///
    /// `Ok(None)` means the stream has ended; `Err(Empty)` means nothing is
    /// buffered right now but more may come.
    pub fn try_recv(&self) -> Result<Option<R>, TryRecvError> {
        self.channel.try_recv()
    }

    /// Drain the stream until it ends.
    ///
    /// Never returns if the queue is never started or never finished/aborted.
    pub async fn collect_all(&self) -> Vec<R> {
        let mut out = Vec::new();
        while let Some(result) = self.recv().await {
            out.push(result);
        }
        out
    }

    /// Results buffered and not yet consumed.
    pub fn buffered(&self) -> usize {
        self.channel.len()
    }

    /// `true` once the coordinator closed the stream. Buffered results may
    /// still be pending.
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}
