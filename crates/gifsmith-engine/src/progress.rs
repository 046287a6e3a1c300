//! Percentage progress reporting.
//!
//! A [`ProgressReporter`] is handed to long-running operations (engine load,
//! engine invocation). Observers subscribe to a [`ProgressStream`] and see
//! percentages that never decrease. Dropping a stream only ends that
//! subscription; the operation keeps running.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Create a reporter together with a subscription to it.
pub fn channel() -> (ProgressReporter, ProgressStream) {
    let reporter = ProgressReporter::new();
    let stream = reporter.subscribe();
    (reporter, stream)
}

/// Producer side of a progress channel. Cheap to clone.
///
/// A reporter may cover only part of its channel (see [`ProgressReporter::span`]);
/// its own 0..=100 is then mapped onto that part.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<u8>>,
    start: u8,
    end: u8,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    /// Create a reporter starting at 0%.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0u8);
        Self {
            tx: Arc::new(tx),
            start: 0,
            end: 100,
        }
    }

    /// A reporter on the same channel whose 0..=100 covers `from..=to` of
    /// this one.
    ///
    /// Lets one observer follow several consecutive stages, such as an engine
    /// load followed by the conversion it was needed for.
    pub fn span(&self, from: u8, to: u8) -> ProgressReporter {
        let from = from.min(100);
        let to = to.clamp(from, 100);
        ProgressReporter {
            tx: self.tx.clone(),
            start: self.scale(from),
            end: self.scale(to),
        }
    }

    fn scale(&self, pct: u8) -> u8 {
        let width = u16::from(self.end - self.start);
        self.start + (u16::from(pct.min(100)) * width / 100) as u8
    }

    /// Publish `pct` (clamped to 100). Values lower than or equal to the
    /// current one are dropped. Returns whether the value was published.
    pub fn report(&self, pct: u8) -> bool {
        let pct = self.scale(pct);
        self.tx.send_if_modified(|current| {
            if pct > *current {
                *current = pct;
                true
            } else {
                false
            }
        })
    }

    /// Publish 100%.
    pub fn finish(&self) {
        self.report(100);
    }

    /// Last published percentage of the whole channel.
    pub fn current(&self) -> u8 {
        *self.tx.borrow()
    }

    /// Subscribe to this reporter. The stream yields the current value first.
    pub fn subscribe(&self) -> ProgressStream {
        ProgressStream {
            inner: WatchStream::new(self.tx.subscribe()).boxed(),
        }
    }
}

/// Consumer side of a progress channel.
///
/// Ends once every clone of the reporter has been dropped.
pub struct ProgressStream {
    inner: BoxStream<'static, u8>,
}

impl std::fmt::Debug for ProgressStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStream").finish_non_exhaustive()
    }
}

impl Stream for ProgressStream {
    type Item = u8;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<u8>> {
        self.inner.poll_next_unpin(cx)
    }
}
