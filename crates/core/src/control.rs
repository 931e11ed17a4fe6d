//! Cooperative run control: cancellation and progress notification.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use types::Progress;

/// Cheap cooperative cancel token shared across threads.
#[derive(Clone, Default, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Relaxed)
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Relaxed)
    }
}

impl fmt::Display for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CancelToken(cancelled: {})", self.is_cancelled())
    }
}

/// Receives progress snapshots from a running search.
///
/// Implementations must return promptly; the engine calls this between
/// generations and never waits on the consumer.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn report(&self, progress: &Progress) {
        self(progress)
    }
}

/// Unbounded channel; a dropped receiver is ignored.
pub struct ChannelSink(pub Sender<Progress>);

impl ProgressSink for ChannelSink {
    fn report(&self, progress: &Progress) {
        let _ = self.0.send(progress.clone());
    }
}

#[derive(Clone, Default)]
pub struct RunControl {
    pub cancel: CancelToken,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn report(&self, progress: &Progress) {
        if let Some(sink) = &self.progress {
            sink.report(progress);
        }
    }
}
