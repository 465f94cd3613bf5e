//! Capture source
//!
//! Device enumeration with selection-priority ordering, handle opening
//! with optional BPF filter, and the blocking read loop.

pub mod session;

use std::sync::atomic::{AtomicBool, Ordering};

use pcap::{Active, Capture, Device};
use tracing::{debug, info};

use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};

/// Device descriptions that mark an interface as rarely the one a user
/// wants to sniff on. Matching devices sort after all others.
const LOW_PRIORITY_KEYWORDS: [&str; 4] = ["VMware", "Bluetooth", "Virtual", "WAN Miniport"];

/// Enumerate capture devices, fresh on every call, ordered so that
/// virtual-ish interfaces come last. Order is otherwise the system order.
pub fn list_devices() -> Result<Vec<Device>> {
    let devices = Device::list().map_err(CaptureError::Enumerate)?;
    Ok(prioritize(devices, |d| d.desc.as_deref()))
}

/// Stable partition: items whose description matches a low-priority
/// keyword move behind everything else.
pub(crate) fn prioritize<T, F>(items: Vec<T>, desc_of: F) -> Vec<T>
where
    F: Fn(&T) -> Option<&str>,
{
    let (low, high): (Vec<T>, Vec<T>) = items
        .into_iter()
        .partition(|item| desc_of(item).is_some_and(is_low_priority));
    high.into_iter().chain(low).collect()
}

fn is_low_priority(desc: &str) -> bool {
    LOW_PRIORITY_KEYWORDS.iter().any(|kw| desc.contains(kw))
}

/// Look up a device by name in priority order.
pub fn find_device(name: &str) -> Result<Device> {
    list_devices()?
        .into_iter()
        .find(|d| d.name == name)
        .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))
}

/// Open a device for live capture. A non-blank filter is compiled and
/// installed before any packet is read; a filter that fails to compile
/// aborts the open and the handle is never used.
pub fn open(
    device: Device,
    config: &CaptureConfig,
    filter: Option<&str>,
) -> Result<Capture<Active>> {
    let name = device.name.clone();

    let mut handle = Capture::from_device(device)
        .map_err(|e| CaptureError::Open {
            device: name.clone(),
            source: e,
        })?
        .promisc(config.promiscuous)
        .snaplen(config.snaplen)
        .timeout(config.timeout_ms)
        .open()
        .map_err(|e| CaptureError::Open {
            device: name.clone(),
            source: e,
        })?;

    if let Some(filter) = filter {
        let filter = filter.trim();
        if !filter.is_empty() {
            handle
                .filter(filter, true)
                .map_err(|e| CaptureError::Filter {
                    filter: filter.to_string(),
                    source: e,
                })?;
            debug!("installed filter {:?} on {}", filter, name);
        }
    }

    info!("capture open on {}", name);
    Ok(handle)
}

/// Blocking read loop. The stop flag is checked once per frame before
/// delivery, so a frame already being processed always completes. Read
/// timeouts just re-check the flag, which bounds cancellation latency to
/// the configured read timeout. Any other read error ends the loop; the
/// handle is closed exactly once when it drops here.
pub fn run<F>(mut handle: Capture<Active>, stop: &AtomicBool, mut on_frame: F)
where
    F: FnMut(u64, &[u8]),
{
    let mut sequence: u64 = 0;
    loop {
        if stop.load(Ordering::Acquire) {
            break;
        }
        match handle.next_packet() {
            Ok(frame) => {
                on_frame(sequence, frame.data);
                sequence += 1;
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(e) => {
                debug!("capture loop ended: {}", e);
                break;
            }
        }
    }
    info!("capture loop finished after {} frames", sequence);
}
