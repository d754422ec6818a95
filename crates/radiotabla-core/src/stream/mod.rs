// ── Display feed ──
//
// Subscription type for consuming display updates from the coordinator.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::{Channel, ChannelId, ProgramEntry};
use crate::store::FetchState;

/// What the display layer should currently show.
///
/// Every notification from the coordinator produces a new value with a
/// higher `revision`, even when the schedule itself did not change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DisplayState {
    pub selected: Option<ChannelId>,
    pub channel: Option<Arc<Channel>>,
    pub schedule: Arc<Vec<ProgramEntry>>,
    pub state: FetchState,
    pub revision: u64,
}

impl DisplayState {
    /// `true` while the selected channel's schedule is being fetched.
    pub fn is_loading(&self) -> bool {
        matches!(self.state, FetchState::Fetching { .. })
    }
}

/// A subscription to the display feed.
///
/// Provides both point-in-time access and change notification via
/// `changed()` or by converting into a `Stream`.
pub struct DisplayStream {
    current: DisplayState,
    receiver: watch::Receiver<DisplayState>,
}

impl DisplayStream {
    pub(crate) fn new(receiver: watch::Receiver<DisplayState>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The state captured at creation or at the last `changed()`.
    pub fn current(&self) -> &DisplayState {
        &self.current
    }

    /// The latest state (may be newer than `current()`).
    pub fn latest(&self) -> DisplayState {
        self.receiver.borrow().clone()
    }

    /// Wait for the next notification.
    /// Returns `None` once the coordinator has been dropped.
    pub async fn changed(&mut self) -> Option<DisplayState> {
        self.receiver.changed().await.ok()?;
        let state = self.receiver.borrow_and_update().clone();
        self.current = state.clone();
        Some(state)
    }

    /// Wait until `pred` holds for the latest state, then return it.
    pub async fn wait_for(&mut self, pred: impl FnMut(&DisplayState) -> bool) -> Option<DisplayState> {
        let state = self.receiver.wait_for(pred).await.ok()?.clone();
        self.current = state.clone();
        Some(state)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> DisplayWatchStream {
        DisplayWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the current state first, then every subsequent notification.
pub struct DisplayWatchStream {
    inner: WatchStream<DisplayState>,
}

impl Stream for DisplayWatchStream {
    type Item = DisplayState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
