//! One-way progress stream from a transfer run to whoever displays it.

use plyt_core::PlytError;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    NotFound,
    QuotaExceeded,
    AuthRequired,
    Other,
}

impl FatalKind {
    pub fn of(err: &PlytError) -> Self {
        match err {
            PlytError::NotFound(_) => FatalKind::NotFound,
            PlytError::QuotaExceeded(_) => FatalKind::QuotaExceeded,
            PlytError::AuthRequired(_) => FatalKind::AuthRequired,
            _ => FatalKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Status(String),
    /// Matching finished without a single hit; no playlist was created.
    NoMatches(String),
    /// The run finished; always carries the playlist URL.
    Completed { playlist_url: String, summary: String },
    Fatal { kind: FatalKind, message: String },
    EndOfStream,
}

impl ProgressEvent {
    pub fn status(message: impl Into<String>) -> Self {
        ProgressEvent::Status(message.into())
    }

    pub fn fatal(err: &PlytError) -> Self {
        let kind = FatalKind::of(err);
        let message = match kind {
            FatalKind::QuotaExceeded => format!(
                "YouTube API quota exceeded ({err}). Try again after the daily quota resets."
            ),
            FatalKind::AuthRequired => format!(
                "YouTube authorization is missing or expired ({err}). Authorize again and retry."
            ),
            FatalKind::NotFound => format!("{err}. The playlist may be private or the link wrong."),
            FatalKind::Other => err.to_string(),
        };
        ProgressEvent::Fatal { kind, message }
    }
}

/// Producer half. Sending never waits on the consumer.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSender {
    /// Returns `false` once the consumer is gone.
    pub fn emit(&self, event: ProgressEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half; yields `None` after [`ProgressEvent::EndOfStream`].
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
    finished: bool,
}

impl ProgressReceiver {
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }
        let event = self.rx.recv().await?;
        if event == ProgressEvent::EndOfStream {
            self.finished = true;
        }
        Some(event)
    }

    /// Drains every event up to and including the end marker.
    pub async fn collect(mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ProgressSender { tx },
        ProgressReceiver {
            rx,
            finished: false,
        },
    )
}
