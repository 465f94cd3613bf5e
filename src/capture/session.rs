//! Capture session state machine
//!
//! One session owns one background capture thread plus the shared stop
//! flag. Dissection and the delivery callback run synchronously on the
//! capture thread between reads, so packet records arrive in capture
//! order with strictly increasing ids.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use pcap::Device;
use tracing::{info, trace, warn};

use crate::config::CaptureConfig;
use crate::core::packet::CapturedPacket;
use crate::dissect;
use crate::error::{CaptureError, Result};

pub struct CaptureSession {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Start capturing on `device`. The handle is opened and the filter
    /// installed on the caller's thread, so open or filter failure aborts
    /// here with no thread spawned and no state changed. Packet ids and
    /// timestamps restart from zero.
    ///
    /// Errors with [`CaptureError::AlreadyRunning`] while a previous
    /// capture is still active.
    pub fn start<F>(&mut self, device: Device, config: &CaptureConfig, mut on_packet: F) -> Result<()>
    where
        F: FnMut(CapturedPacket) + Send + 'static,
    {
        if !self.is_stopped() {
            return Err(CaptureError::AlreadyRunning);
        }

        let name = device.name.clone();
        let handle = super::open(device, config, config.filter.as_deref())?;

        let stop = Arc::new(AtomicBool::new(false));
        self.stop = Arc::clone(&stop);
        let started = Instant::now();

        self.worker = Some(
            thread::Builder::new()
                .name("packetscope-capture".to_string())
                .spawn(move || {
                    info!("capture session started on {}", name);
                    super::run(handle, &stop, |id, data| {
                        match dissect::dissect(id, data, started) {
                            Some(packet) => on_packet(packet),
                            None => trace!("frame {} not dissected", id),
                        }
                    });
                })?,
        );
        Ok(())
    }

    /// Signal the capture loop to stop and wait for the thread to finish.
    /// A no-op when nothing is running.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("capture worker panicked");
            }
        }
    }

    /// True before any start, after `stop()`, and once the loop has ended
    /// on its own (device gone, fatal read error).
    pub fn is_stopped(&self) -> bool {
        match &self.worker {
            None => true,
            Some(worker) => worker.is_finished(),
        }
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}
