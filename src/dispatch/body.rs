//! Response body wrapper measuring how long readers wait for it.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};

/// Shared handle to the accumulated read duration of a [`DurationBody`].
///
/// Stays readable after the body itself has been moved or dropped.
#[derive(Debug, Clone, Default)]
pub struct BodyTimer {
    nanos: Arc<AtomicU64>,
}

impl BodyTimer {
    /// Total time spent waiting for body frames so far.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }

    fn add(&self, d: Duration) {
        let nanos = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }
}

/// Body wrapper that accumulates the time between asking for a frame and
/// getting it, across the whole stream.
pub struct DurationBody<B> {
    inner: B,
    timer: BodyTimer,
    waiting_since: Option<Instant>,
}

impl<B> DurationBody<B> {
    /// Wrap `inner`, returning the body and a handle to its timer.
    pub fn new(inner: B) -> (Self, BodyTimer) {
        let timer = BodyTimer::default();
        (
            Self {
                inner,
                timer: timer.clone(),
                waiting_since: None,
            },
            timer,
        )
    }
}

impl<B> Body for DurationBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let started = *self.waiting_since.get_or_insert_with(Instant::now);

        let poll = Pin::new(&mut self.inner).poll_frame(cx);
        if poll.is_ready() {
            self.waiting_since = None;
            self.timer.add(started.elapsed());
        }
        poll
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
