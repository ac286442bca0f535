//! Delta Sink
//!
//! The transport seam a streaming run forwards deltas through. Delivery
//! order must be preserved by the transport; the core does not retry
//! failed sends. A closed sink signals cooperative cancellation: the
//! run stops pulling from its source and commits nothing.

use crate::delta::Delta;
use crate::error::{Error, Result};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Outbound channel accepting deltas bound to one client/session
#[async_trait::async_trait]
pub trait DeltaSink: Send + Sync {
    /// Forward one delta to the client
    ///
    /// Fails with [`Error::SinkClosed`] once the client has gone away.
    async fn send(&self, delta: Delta) -> Result<()>;

    /// Whether the client side has been torn down
    fn is_closed(&self) -> bool;
}

/// Sink backed by a bounded tokio mpsc channel
///
/// The receiving half is typically drained by an SSE or WebSocket
/// writer; dropping the receiver closes the sink.
pub struct ChannelSink {
    tx: mpsc::Sender<Delta>,
}

impl ChannelSink {
    /// Create a sink from the sending half of a delta channel
    #[must_use]
    pub fn new(tx: mpsc::Sender<Delta>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl DeltaSink for ChannelSink {
    async fn send(&self, delta: Delta) -> Result<()> {
        self.tx.send(delta).await.map_err(|_| Error::SinkClosed)
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Sink collecting deltas in memory (test double)
#[derive(Default)]
pub struct CollectingSink {
    deltas: Mutex<Vec<Delta>>,
    closed: Mutex<bool>,
}

impl CollectingSink {
    /// Create an open collecting sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the deltas received so far, in delivery order
    #[must_use]
    pub fn collected(&self) -> Vec<Delta> {
        self.deltas.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// Close the sink, simulating client disconnect
    pub fn close(&self) {
        if let Ok(mut closed) = self.closed.lock() {
            *closed = true;
        }
    }

    /// Close the sink after `n` deltas have been accepted
    #[must_use]
    pub fn close_after(self, n: usize) -> ClosingSink {
        ClosingSink {
            inner: self,
            limit: n,
        }
    }
}

#[async_trait::async_trait]
impl DeltaSink for CollectingSink {
    async fn send(&self, delta: Delta) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SinkClosed);
        }
        self.deltas
            .lock()
            .map_err(|_| Error::Internal("sink poisoned".to_string()))?
            .push(delta);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.lock().map(|c| *c).unwrap_or(true)
    }
}

/// Collecting sink that closes itself after a fixed number of deltas
///
/// Models a client that navigates away mid-stream.
pub struct ClosingSink {
    inner: CollectingSink,
    limit: usize,
}

impl ClosingSink {
    /// Snapshot of the deltas accepted before closure
    #[must_use]
    pub fn collected(&self) -> Vec<Delta> {
        self.inner.collected()
    }
}

#[async_trait::async_trait]
impl DeltaSink for ClosingSink {
    async fn send(&self, delta: Delta) -> Result<()> {
        self.inner.send(delta).await?;
        if self.inner.collected().len() >= self.limit {
            self.inner.close();
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = ChannelSink::new(tx);

        sink.send(Delta::TextDelta("a".to_string())).await.unwrap();
        sink.send(Delta::TextDelta("b".to_string())).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().content(), "a");
        assert_eq!(rx.recv().await.unwrap().content(), "b");
    }

    #[tokio::test]
    async fn test_channel_sink_closed_on_receiver_drop() {
        let (tx, rx) = mpsc::channel(8);
        let sink = ChannelSink::new(tx);
        drop(rx);

        assert!(sink.is_closed());
        let err = sink.send(Delta::TextDelta("x".to_string())).await;
        assert!(matches!(err, Err(Error::SinkClosed)));
    }

    #[tokio::test]
    async fn test_collecting_sink_close() {
        let sink = CollectingSink::new();
        sink.send(Delta::CodeDelta("fn main() {}".to_string()))
            .await
            .unwrap();
        sink.close();

        assert!(sink.is_closed());
        assert!(sink
            .send(Delta::CodeDelta("more".to_string()))
            .await
            .is_err());
        assert_eq!(sink.collected().len(), 1);
    }

    #[tokio::test]
    async fn test_closing_sink_closes_after_limit() {
        let sink = CollectingSink::new().close_after(1);
        sink.send(Delta::TextDelta("first".to_string()))
            .await
            .unwrap();

        assert!(sink.is_closed());
        assert!(sink
            .send(Delta::TextDelta("second".to_string()))
            .await
            .is_err());
    }
}
