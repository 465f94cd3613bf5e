//! Live packet sniffer library
//!
//! Captures frames from a network interface, dissects them into typed
//! layer structs and classifies the application payload with best-effort
//! heuristics (DNS, HTTP, TLS record headers, FTP).
//!
//! The main entry point is [`CaptureSession`]: pick a device from
//! [`list_devices`], start a session with a callback and stop it when
//! done. [`dissect::dissect`] and [`protocols::classify`] are also usable
//! standalone, for instance over replayed frames.

pub mod capture;
pub mod config;
pub mod core;
pub mod dissect;
pub mod error;
pub mod protocols;

pub use crate::capture::session::CaptureSession;
pub use crate::capture::{find_device, list_devices};
pub use crate::config::CaptureConfig;
pub use crate::core::layers::LayerStack;
pub use crate::core::packet::{CapturedPacket, Protocol};
pub use crate::error::{CaptureError, Result};
pub use crate::protocols::{classify, AppProtocol, AppRecord};

pub use pcap::Device;
