use async_trait::async_trait;

/// How a one-time code left the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the SMS provider.
    Delivered,
    /// Development mode: nothing was sent, the caller may surface the code directly.
    Simulated,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("SMS provider rejected the message: {0}")]
    Rejected(String),
    #[error("SMS transport failed: {0}")]
    Transport(String),
}

/// Out-of-band channel for one-time codes.
#[async_trait]
pub trait OtpNotifier: Send + Sync {
    async fn send(&self, phone_number: &str, code: &str) -> Result<Delivery, NotifierError>;
}
