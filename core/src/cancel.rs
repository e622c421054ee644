//! Caller-side cancellation handle.
//!
//! A `CancelToken` is a one-shot event: the first `cancel` call stores a
//! reason and wakes every observer; later calls are ignored. The adapter only
//! observes the token, it never cancels it.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// The reason a request was cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cancel {
    pub message: Option<String>,
}

impl Cancel {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

impl fmt::Display for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "Cancel: {message}"),
            None => f.write_str("Cancel"),
        }
    }
}

#[derive(Clone)]
pub struct CancelToken {
    reason: Arc<watch::Sender<Option<Cancel>>>,
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("reason", &*self.reason.borrow())
            .finish()
    }
}

impl CancelToken {
    /// Build a token and hand its cancel function to `executor`, mirroring
    /// the executor-style constructor of the calling library.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Canceller),
    {
        let (tx, _rx) = watch::channel(None);
        let token = Self {
            reason: Arc::new(tx),
        };
        executor(Canceller {
            token: token.clone(),
        });
        token
    }

    /// Token plus the function that cancels it.
    pub fn source() -> CancelTokenSource {
        let mut canceller = None;
        let token = CancelToken::new(|c| canceller = Some(c));
        let cancel = canceller.unwrap_or_else(|| Canceller {
            token: token.clone(),
        });
        CancelTokenSource { token, cancel }
    }

    /// The stored reason, if cancellation was requested.
    pub fn reason(&self) -> Option<Cancel> {
        self.reason.borrow().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason.borrow().is_some()
    }

    /// Resolves with the reason once cancellation is requested. Resolves
    /// immediately if it already was.
    pub async fn cancelled(&self) -> Cancel {
        let mut rx = self.reason.subscribe();
        let reason = rx.wait_for(Option::is_some).await.ok().and_then(|r| (*r).clone());
        match reason {
            Some(reason) => reason,
            // The sender lives as long as `self`, so this cannot happen.
            None => std::future::pending().await,
        }
    }

    fn request(&self, reason: Cancel) -> bool {
        self.reason.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(reason);
            true
        })
    }
}

/// The cancel function tied to one token.
#[derive(Debug, Clone)]
pub struct Canceller {
    token: CancelToken,
}

impl Canceller {
    /// Request cancellation. Returns false if the token was already
    /// cancelled, in which case the first reason is kept.
    pub fn cancel(&self, message: impl Into<String>) -> bool {
        self.token.request(Cancel::new(message))
    }

    pub fn cancel_with(&self, reason: Cancel) -> bool {
        self.token.request(reason)
    }
}

#[derive(Debug, Clone)]
pub struct CancelTokenSource {
    pub token: CancelToken,
    pub cancel: Canceller,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_reason_wins() {
        let source = CancelToken::source();
        assert!(!source.token.is_cancelled());

        assert!(source.cancel.cancel("first"));
        assert!(!source.cancel.cancel("second"));
        assert_eq!(source.token.cancelled().await, Cancel::new("first"));
        assert_eq!(source.token.reason(), Some(Cancel::new("first")));
    }

    #[tokio::test]
    async fn observer_wakes_on_later_cancel() {
        let source = CancelToken::source();
        let token = source.token.clone();
        let waiter = tokio::spawn(async move { token.cancelled().await });

        tokio::task::yield_now().await;
        source.cancel.cancel("stop");
        assert_eq!(waiter.await.unwrap(), Cancel::new("stop"));
    }

    #[test]
    fn executor_receives_canceller() {
        let mut slot = None;
        let token = CancelToken::new(|c| slot = Some(c));
        slot.unwrap().cancel_with(Cancel::default());
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_display() {
        assert_eq!(Cancel::new("gone").to_string(), "Cancel: gone");
        assert_eq!(Cancel::default().to_string(), "Cancel");
    }
}
