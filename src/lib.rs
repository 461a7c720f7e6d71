//! # elkm1-link
//!
//! Direct TCP/serial communication with Elk M1 alarm control panels
//! (M1 Gold, M1 EZ8) over the M1XEP ASCII protocol.
//!
//! The engine frames the panel's newline-terminated, checksummed
//! messages, correlates replies to requests, mirrors zone, output,
//! area and keypad state in memory from the asynchronous event stream,
//! and resynchronizes the whole mirror at startup and whenever the
//! installer leaves programming mode. No external dependencies beyond
//! tokio, thiserror, tracing, bitflags and chrono.
//!
//! ## Quick Start
//!
//! ```no_run
//! use elkm1_link::{ArmLevel, ElkPanel, PanelConfig, PanelEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PanelConfig::builder()
//!         .address("192.168.0.251:2101")
//!         .user_code("1234")
//!         .build();
//!
//!     let mut panel = ElkPanel::connect(config).await?;
//!
//!     let mut events = panel.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let PanelEvent::ZoneChanged { zone, status, .. } = event {
//!                 println!("zone {zone} is now {}", status.as_str());
//!             }
//!         }
//!     });
//!
//!     panel.arm(1, ArmLevel::Away).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     panel.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod codec;
pub mod comm;
pub mod config;
pub mod constants;
pub mod devices;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod panel;
pub mod protocol;
pub mod registry;
pub mod transport;

// Re-exports for convenience
pub use codec::{decode_line, Message};
pub use config::{PanelConfig, PanelConfigBuilder, ScanFilter};
pub use devices::area::{Area, AreaAlarmState, ArmUpState, ArmedStatus};
pub use devices::keypad::{Keypad, KeypadKey};
pub use devices::output::Output;
pub use devices::system::{PanelVersions, SystemTrouble, SystemTroubleFlags};
pub use devices::zone::{Zone, ZoneDefinition, ZoneLogicalStatus, ZonePhysicalState};
pub use error::{ElkError, FrameError, Result};
pub use event::{EventReceiver, PanelEvent};
pub use panel::ElkPanel;
pub use protocol::{ArmLevel, Command};
