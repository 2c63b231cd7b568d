use std::collections::BTreeSet;

/// Outcome of one delivery attempt.
///
/// The caller decides what to do with the batch based on this value only;
/// it never needs to look at HTTP status codes itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// The remote accepted the batch. It can be released.
    Success,
    /// Transient remote or network failure. Keep the batch and try again later.
    RetryableFailure(String),
    /// The remote rejected the batch and escalation was requested.
    /// Do not retry; halt or alert.
    PermanentFailure(String),
    /// The remote rejected the batch but escalation is disabled. The batch
    /// has been logged and is considered handled: it is **lost**.
    SilentFailure(String),
}

impl Disposition {
    pub fn is_success(&self) -> bool {
        matches!(self, Disposition::Success)
    }

    pub fn should_retry(&self) -> bool {
        matches!(self, Disposition::RetryableFailure(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Disposition::Success => None,
            Disposition::RetryableFailure(reason)
            | Disposition::PermanentFailure(reason)
            | Disposition::SilentFailure(reason) => Some(reason),
        }
    }

    /// Collapse into the raise-or-return shape some schedulers expect.
    ///
    /// `SilentFailure` maps to `Ok(())` because the batch counts as handled.
    pub fn into_result(self) -> Result<(), DeliveryError> {
        match self {
            Disposition::Success | Disposition::SilentFailure(_) => Ok(()),
            Disposition::RetryableFailure(reason) => Err(DeliveryError::Retryable(reason)),
            Disposition::PermanentFailure(reason) => Err(DeliveryError::Unrecoverable(reason)),
        }
    }
}

/// Error form of a failed [`Disposition`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("retryable delivery failure: {0}")]
    Retryable(String),

    #[error("unrecoverable delivery failure: {0}")]
    Unrecoverable(String),
}

impl DeliveryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Retryable(_))
    }
}

/// How non-2xx responses are classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponsePolicy {
    pub retryable_codes: BTreeSet<u16>,
    pub error_response_as_unrecoverable: bool,
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self {
            retryable_codes: BTreeSet::from([503]),
            error_response_as_unrecoverable: false,
        }
    }
}

impl ResponsePolicy {
    /// Classify a response by status code. `body` only feeds the reason.
    pub fn classify(&self, status: u16, body: &str) -> Disposition {
        if (200..300).contains(&status) {
            return Disposition::Success;
        }

        let msg = format!("remote responded: {}", body);

        if self.retryable_codes.contains(&status) {
            Disposition::RetryableFailure(msg)
        } else if self.error_response_as_unrecoverable {
            Disposition::PermanentFailure(msg)
        } else {
            Disposition::SilentFailure(msg)
        }
    }
}
