//! Panel entities. Each entity owns its protocol-to-domain decoding:
//! the only code that mutates an entity's fields is that entity's own
//! `unpack_event_*` family, given a received [`Message`](crate::codec::Message).

pub mod area;
pub mod keypad;
pub mod output;
pub mod system;
pub mod zone;

pub use area::{Area, AreaAlarmState, ArmUpState, ArmedStatus, ChimeMode};
pub use keypad::{Keypad, KeypadKey};
pub use output::Output;
pub use system::{PanelVersions, SystemTrouble, SystemTroubleFlags};
pub use zone::{Zone, ZoneDefinition, ZoneLogicalStatus, ZonePhysicalState};
