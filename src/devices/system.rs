//! Panel-wide state: system trouble flags and firmware versions.

use bitflags::bitflags;
use chrono::{DateTime, Utc};

use crate::codec::Message;

bitflags! {
    /// Trouble conditions from the `SS` reply.
    ///
    /// The reply is a positional flag string, one ASCII digit per
    /// condition; a nonzero digit sets the flag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SystemTroubleFlags: u16 {
        const AC_FAIL              = 1 << 0;
        const BOX_TAMPER           = 1 << 1;
        const FAIL_TO_COMMUNICATE  = 1 << 2;
        const EEPROM_MEMORY_ERROR  = 1 << 3;
        const LOW_BATTERY          = 1 << 4;
        const TRANSMITTER_LOW_BATTERY = 1 << 5;
        const OVER_CURRENT         = 1 << 6;
        const TELEPHONE_FAULT      = 1 << 7;
        const OUTPUT_2             = 1 << 8;
        const MISSING_KEYPAD       = 1 << 9;
        const ZONE_EXPANDER        = 1 << 10;
        const OUTPUT_EXPANDER      = 1 << 11;
        const LOST_TRANSMITTER     = 1 << 12;
        const ETHERNET_FAULT       = 1 << 13;
    }
}

/// Payload position of each trouble condition in the `SS` reply.
const TROUBLE_POSITIONS: [(usize, SystemTroubleFlags); 14] = [
    (0, SystemTroubleFlags::AC_FAIL),
    (1, SystemTroubleFlags::BOX_TAMPER),
    (2, SystemTroubleFlags::FAIL_TO_COMMUNICATE),
    (3, SystemTroubleFlags::EEPROM_MEMORY_ERROR),
    (4, SystemTroubleFlags::LOW_BATTERY),
    (5, SystemTroubleFlags::TRANSMITTER_LOW_BATTERY),
    (6, SystemTroubleFlags::OVER_CURRENT),
    (7, SystemTroubleFlags::TELEPHONE_FAULT),
    (9, SystemTroubleFlags::OUTPUT_2),
    (10, SystemTroubleFlags::MISSING_KEYPAD),
    (11, SystemTroubleFlags::ZONE_EXPANDER),
    (12, SystemTroubleFlags::OUTPUT_EXPANDER),
    (21, SystemTroubleFlags::LOST_TRANSMITTER),
    (23, SystemTroubleFlags::ETHERNET_FAULT),
];

impl SystemTroubleFlags {
    /// Parse the positional flag string from an `SS` reply payload.
    pub fn from_payload(payload: &str) -> Self {
        let mut flags = Self::empty();
        let bytes = payload.as_bytes();
        for (pos, flag) in TROUBLE_POSITIONS {
            if bytes.get(pos).is_some_and(|&b| b != b'0') {
                flags |= flag;
            }
        }
        flags
    }
}

/// System-wide trouble status.
#[derive(Debug, Clone, Default)]
pub struct SystemTrouble {
    flags: SystemTroubleFlags,
    last_updated_at: Option<DateTime<Utc>>,
}

impl SystemTrouble {
    /// `SS` reply: refresh the trouble flag set.
    pub(crate) fn unpack_event_trouble_status(&mut self, msg: &Message) -> bool {
        let flags = SystemTroubleFlags::from_payload(&msg.payload);
        if self.flags == flags {
            return false;
        }
        self.flags = flags;
        self.last_updated_at = Some(Utc::now());
        true
    }

    pub fn flags(&self) -> SystemTroubleFlags {
        self.flags
    }

    pub fn has_trouble(&self) -> bool {
        !self.flags.is_empty()
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated_at
    }
}

/// Firmware versions from the `VN` reply: three hex octet pairs for
/// the M1 and three for the M1XEP ethernet interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelVersions {
    pub m1: String,
    pub m1xep: String,
}

impl PanelVersions {
    /// Parse a `VN` reply payload (12 hex digits minimum).
    pub fn from_payload(payload: &str) -> Option<Self> {
        if payload.len() < 12 || !payload[..12].bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let octet = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&payload[range], 16).unwrap_or(0)
        };
        Some(Self {
            m1: format!("{}.{}.{}", octet(0..2), octet(2..4), octet(4..6)),
            m1xep: format!("{}.{}.{}", octet(6..8), octet(8..10), octet(10..12)),
        })
    }
}
