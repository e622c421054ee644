//! Status-based settlement.
//!
//! Decides whether a response resolves or rejects. The policy comes from the
//! config's `validate_status`; without one, 2xx resolves. A status of 0
//! (opaque responses) always resolves, as the calling library does.

use crate::config::ValidateStatus;
use crate::error::AdapterError;
use crate::response::Response;

pub fn default_validate_status(status: u16) -> bool {
    (200..300).contains(&status)
}

pub fn settle(response: Response) -> Result<Response, AdapterError> {
    if response.status == 0 || validate(response.config.validate_status.as_ref(), response.status) {
        Ok(response)
    } else {
        Err(AdapterError::Status {
            response: Box::new(response),
        })
    }
}

fn validate(policy: Option<&ValidateStatus>, status: u16) -> bool {
    match policy {
        Some(policy) => policy.check(status),
        None => default_validate_status(status),
    }
}
