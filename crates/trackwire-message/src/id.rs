//! Message identifier allocation.
//!
//! An identifier is `floor(unix_time_seconds + device_identity)`. The device
//! identity is established once per process and passed in explicitly.
//!
//! Two messages prepared by the same process within the same wall-clock
//! second receive the same identifier. Peers on the wire depend on this
//! scheme, so it is kept as is; callers that need unique ids must not rely on
//! `id` alone.

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::types::MessageId;

const MAC_MASK: u64 = 0xFFFF_FFFF_FFFF;
const MULTICAST_BIT: u64 = 0x0100_0000_0000;

/// Stable per-host integer mixed into every message identifier.
///
/// Usually the 48-bit hardware address of the first network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity(u64);

impl DeviceIdentity {
    /// Use an explicit identity.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Derive the identity from this host's network hardware.
    ///
    /// Falls back to a random 48-bit value with the multicast bit set, which
    /// can never equal a real interface address.
    pub fn detect() -> Self {
        if let Some(mac) = first_hardware_address() {
            debug!(device = %format!("{mac:012x}"), "device identity from hardware address");
            return Self(mac);
        }
        let random = (rand::random::<u64>() & MAC_MASK) | MULTICAST_BIT;
        debug!(device = %format!("{random:012x}"), "device identity randomly generated");
        Self(random)
    }

    /// The identity of this process, detected on first use and fixed afterwards.
    pub fn process() -> Self {
        static PROCESS_IDENTITY: OnceLock<DeviceIdentity> = OnceLock::new();
        *PROCESS_IDENTITY.get_or_init(Self::detect)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Seconds since the Unix epoch as a float.
pub fn unix_time_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

/// Derives identifiers and timestamps for outgoing messages.
#[derive(Debug, Clone, Copy)]
pub struct IdAllocator {
    device: DeviceIdentity,
    clock: fn() -> f64,
}

impl IdAllocator {
    /// Allocator reading the system wall clock.
    pub fn new(device: DeviceIdentity) -> Self {
        Self::with_clock(device, unix_time_now)
    }

    /// Allocator reading time from `clock`, in seconds since the Unix epoch.
    pub fn with_clock(device: DeviceIdentity, clock: fn() -> f64) -> Self {
        Self { device, clock }
    }

    pub fn device(&self) -> DeviceIdentity {
        self.device
    }

    /// Identifier for a message sent now.
    pub fn next_id(&self) -> MessageId {
        self.stamp().0
    }

    /// Identifier and timestamp for a message sent now, read from one clock sample.
    pub fn stamp(&self) -> (MessageId, f64) {
        let time = (self.clock)();
        (self.id_at(time), time)
    }

    /// Identifier for a message sent at `time`.
    pub fn id_at(&self, time: f64) -> MessageId {
        (time + self.device.0 as f64).floor() as MessageId
    }
}

#[cfg(target_os = "linux")]
fn first_hardware_address() -> Option<u64> {
    let mut interfaces: Vec<_> = std::fs::read_dir("/sys/class/net")
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.file_name().is_some_and(|name| name != "lo"))
        .collect();
    interfaces.sort();

    interfaces.iter().find_map(|path| {
        let text = std::fs::read_to_string(path.join("address")).ok()?;
        parse_hardware_address(text.trim()).filter(|mac| *mac != 0)
    })
}

#[cfg(not(target_os = "linux"))]
fn first_hardware_address() -> Option<u64> {
    None
}

/// Parse `aa:bb:cc:dd:ee:ff` into a 48-bit integer.
fn parse_hardware_address(text: &str) -> Option<u64> {
    let mut value = 0u64;
    let mut octets = 0;
    for part in text.split(':') {
        if part.len() != 2 {
            return None;
        }
        value = (value << 8) | u64::from(u8::from_str_radix(part, 16).ok()?);
        octets += 1;
    }
    (octets == 6).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_floor_of_time_plus_device() {
        let allocator = IdAllocator::new(DeviceIdentity::new(0x0242_ac11_0002));
        assert_eq!(
            allocator.id_at(1_700_000_000.75),
            1_700_000_000 + 0x0242_ac11_0002
        );
    }

    #[test]
    fn same_second_collides() {
        let allocator = IdAllocator::new(DeviceIdentity::new(1000));
        assert_eq!(allocator.id_at(50.1), allocator.id_at(50.9));
        assert_ne!(allocator.id_at(50.9), allocator.id_at(51.0));
    }

    #[test]
    fn injected_clock_drives_stamp() {
        let allocator = IdAllocator::with_clock(DeviceIdentity::new(7), || 100.5);
        assert_eq!(allocator.stamp(), (107, 100.5));
        assert_eq!(allocator.next_id(), 107);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(unix_time_now() > 1_577_836_800.0);
    }

    #[test]
    fn parses_hardware_addresses() {
        assert_eq!(
            parse_hardware_address("02:42:ac:11:00:02"),
            Some(0x0242_ac11_0002)
        );
        assert_eq!(parse_hardware_address("00:00:00:00:00:00"), Some(0));
        assert_eq!(parse_hardware_address("02:42:ac:11:00"), None);
        assert_eq!(parse_hardware_address("zz:42:ac:11:00:02"), None);
        assert_eq!(parse_hardware_address(""), None);
    }

    #[test]
    fn detected_identity_fits_48_bits() {
        let device = DeviceIdentity::detect();
        assert!(device.value() <= MAC_MASK);
    }

    #[test]
    fn process_identity_is_stable() {
        assert_eq!(DeviceIdentity::process(), DeviceIdentity::process());
    }
}
