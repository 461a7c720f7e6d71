//! Panel event stream.
//!
//! State changes are published on a broadcast channel; sends are
//! fire-and-forget so a slow subscriber can never stall the dispatch
//! path. Subscribers read current entity state through the panel's
//! snapshot accessors after a change notification.

use crate::devices::area::ArmedStatus;
use crate::devices::system::SystemTroubleFlags;
use crate::devices::zone::{ZoneLogicalStatus, ZonePhysicalState};

/// All events that can be emitted by the panel.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    /// Connection to the panel established.
    Connected,
    /// Connection to the panel lost. Entity state is retained as-is
    /// and should be treated as stale until the next rescan.
    Disconnected,
    /// A full rescan has started; entity state is being repopulated.
    RescanStarted,
    /// A full rescan finished. `complete` is false if any scan step
    /// failed and left part of the registry stale.
    RescanComplete { complete: bool },
    /// A zone's state or status changed.
    ZoneChanged {
        zone: u16,
        state: ZonePhysicalState,
        status: ZoneLogicalStatus,
    },
    /// An output switched on or off.
    OutputChanged { output: u16, on: bool },
    /// An area's arming status, alarm state or timers changed.
    AreaChanged { area: u8, armed: ArmedStatus },
    /// A keypad keypress or illumination change.
    KeypadChanged { keypad: u8 },
    /// System trouble flags changed.
    TroubleChanged { flags: SystemTroubleFlags },
    /// A valid or invalid user code was entered at a keypad.
    UserCodeEntered { user: u16, keypad: u8 },
    /// A task was activated at the panel.
    TaskChanged { task: u16 },
    /// The installer left programming mode; a rescan is triggered
    /// automatically because the panel configuration may have changed.
    InstallerExited,
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<PanelEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<PanelEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
