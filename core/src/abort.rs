//! Per-call abort controller / signal pair.
//!
//! One controller is created for every adapter call. It is dropped once the
//! call settles, or once the call's timer expires if that comes later. The signal travels with the `FetchOptions`; transports that
//! honour it stop work once it fires. Aborting is advisory: nothing forces a
//! transport to release resources immediately.

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct AbortController {
    token: CancellationToken,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            token: self.token.clone(),
        }
    }

    /// Fire the signal. Idempotent.
    pub fn abort(&self) {
        self.token.cancel();
    }
}

/// Observer half handed to the transport.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    pub fn aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the controller aborts.
    pub async fn wait(&self) {
        self.token.cancelled().await
    }
}
