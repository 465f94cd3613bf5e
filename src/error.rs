use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate capture devices: {0}")]
    Enumerate(#[source] pcap::Error),

    #[error("failed to open capture device {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: pcap::Error,
    },

    #[error("invalid capture filter {filter:?}: {source}")]
    Filter {
        filter: String,
        #[source]
        source: pcap::Error,
    },

    #[error("a capture session is already running")]
    AlreadyRunning,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
