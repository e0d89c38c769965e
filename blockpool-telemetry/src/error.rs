use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("A global tracing subscriber is already installed")]
    SubscriberAlreadySet,

    #[error("Metrics registry error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metrics encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
