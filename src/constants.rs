//! Protocol-wide fixed values: entity maxima, the auto-dispatch kind
//! set, queue sizing and description-lookup codes.

/// Maximum zone number on an M1 Gold.
pub const MAX_ZONES: u16 = 208;
/// Maximum control output number.
pub const MAX_OUTPUTS: u16 = 208;
/// Maximum area (partition) number.
pub const MAX_AREAS: u16 = 8;
/// Maximum keypad number.
pub const MAX_KEYPADS: u16 = 16;
/// Maximum automation task number.
pub const MAX_TASKS: u16 = 32;

/// Kinds the panel sends on its own initiative. Messages of these
/// kinds are never replies; the dispatcher claims and routes them as
/// soon as it sees them, even while a request/reply wait is pending.
pub const AUTO_DISPATCH_KINDS: [&str; 9] = [
    crate::protocol::kind::INSTALLER_EXIT,
    crate::protocol::kind::ALARM_MEMORY,
    crate::protocol::kind::ENTRY_EXIT_TIMER,
    crate::protocol::kind::USER_CODE_ENTERED,
    crate::protocol::kind::TASK_UPDATE,
    crate::protocol::kind::OUTPUT_UPDATE,
    crate::protocol::kind::ZONE_UPDATE,
    crate::protocol::kind::KEYPAD_STATUS_REPORT,
    crate::protocol::kind::ETHERNET_TEST,
];

/// Dispatch queue capacity; the oldest entry is dropped beyond this.
pub const QUEUE_CAPACITY: usize = 1000;

/// Queued messages older than this are evicted on the next drain pass.
pub const STALE_AFTER_SECS: u64 = 60;

/// Text-description categories for the `sd` lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DescriptionType {
    ZoneName = 0,
    AreaName = 1,
    UserName = 2,
    KeypadName = 3,
    OutputName = 4,
    TaskName = 5,
}

impl DescriptionType {
    /// Two-digit wire form used in the `sd` request payload.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Reply number the description walk treats as "no more names".
/// The panel answers with an address below the requested one (or this
/// out-of-range value) once the list is exhausted.
pub const DESCRIPTION_END: u16 = 255;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_dispatch_kinds_are_unsolicited() {
        // Every auto kind is an update the panel pushes, so none of them
        // doubles as a lowercase request code.
        for kind in AUTO_DISPATCH_KINDS {
            assert_eq!(kind.len(), 2);
            assert!(kind.chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_description_type_codes() {
        assert_eq!(DescriptionType::ZoneName.code(), 0);
        assert_eq!(DescriptionType::OutputName.code(), 4);
        assert_eq!(DescriptionType::TaskName.code(), 5);
    }
}
