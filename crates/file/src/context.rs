//! Cancellation and deadlines for upload and download operations.
//!
//! A [`Context`] is cloned into every task an operation fans out to. Each
//! suspending store or fetch call goes through [`Context::run`], which races
//! it against cancellation and the deadline.

use std::{future::Future, time::Duration};

use tokio::{sync::watch, time::Instant};

use crate::error::{FileError, FileResult};

/// Cancellation scope of one operation.
#[derive(Debug, Clone)]
pub struct Context {
    cancel: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Cancels every [`Context`] derived from the one it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        // With the sender gone the flag can never flip.
        let (_, cancel) = watch::channel(false);
        Self {
            cancel,
            deadline: None,
        }
    }

    /// A context plus the handle that cancels it.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, cancel) = watch::channel(false);
        (
            Self {
                cancel,
                deadline: None,
            },
            CancelHandle { tx },
        )
    }

    /// Bound the context by an absolute deadline. An earlier existing
    /// deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The error the context has ended with, if it has.
    pub fn err(&self) -> Option<FileError> {
        if *self.cancel.borrow() {
            return Some(FileError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(FileError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    async fn cancelled(&self) {
        let mut rx = self.cancel.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> FileError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancelled() => FileError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => FileError::DeadlineExceeded,
            },
            None => {
                self.cancelled().await;
                FileError::Cancelled
            }
        }
    }

    /// Drive `fut` unless the context ends first, in which case `fut` is
    /// dropped.
    pub async fn run<T, E, F>(&self, fut: F) -> FileResult<T>
    where
        F: Future<Output = Result<T, E>>,
        FileError: From<E>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            res = fut => res.map_err(FileError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_background_never_ends() {
        let ctx = Context::background();
        assert!(!ctx.is_done());
        let res = ctx.run(async { Ok::<_, FileError>(7) }).await;
        assert_matches!(res, Ok(7));
    }

    #[tokio::test]
    async fn test_cancel_aborts_pending_call() {
        let (ctx, handle) = Context::with_cancel();
        let task = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                ctx.run(std::future::pending::<Result<(), FileError>>())
                    .await
            })
        };
        handle.cancel();
        assert_matches!(task.await.unwrap(), Err(FileError::Cancelled));
        assert!(ctx.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        let res = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, FileError>(())
            })
            .await;
        let err = res.unwrap_err();
        assert_matches!(err, FileError::DeadlineExceeded);
        assert_eq!(err.kind(), crate::ErrorKind::Cancelled);
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = Context::background()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }
}
