//! The public handle for a panel connection.
//!
//! `ElkPanel` owns the connection lifecycle explicitly: connect (with
//! retry/backoff), a dispatcher task that continuously routes
//! unsolicited updates into the registry, command issue, and
//! disconnect. There is no process-wide singleton; drop the handle and
//! everything it spawned stops.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, info, warn};

use crate::comm::ElkComm;
use crate::config::PanelConfig;
use crate::constants::{MAX_AREAS, MAX_OUTPUTS, MAX_TASKS, MAX_ZONES};
use crate::devices::area::Area;
use crate::devices::keypad::Keypad;
use crate::devices::output::Output;
use crate::devices::system::{PanelVersions, SystemTrouble};
use crate::devices::zone::Zone;
use crate::error::{ElkError, Result};
use crate::event::{event_channel, EventReceiver, EventSender, PanelEvent};
use crate::protocol::{ArmLevel, Command};
use crate::registry::Registry;
use crate::transport::Connection;

/// An open connection to an Elk M1 panel.
///
/// # Example
///
/// ```no_run
/// use elkm1_link::{ArmLevel, PanelConfig, ElkPanel};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = PanelConfig::builder()
///         .address("192.168.0.251:2101")
///         .user_code("1234")
///         .build();
///
///     let mut panel = ElkPanel::connect(config).await?;
///
///     let mut events = panel.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("event: {event:?}");
///         }
///     });
///
///     for zone in panel.zones().await {
///         if zone.is_configured() {
///             println!("{}: {}", zone.description(), zone.status().as_str());
///         }
///     }
///
///     panel.arm(1, ArmLevel::Away).await?;
///     panel.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct ElkPanel {
    comm: Arc<ElkComm>,
    event_tx: EventSender,
    dispatcher_handle: Option<JoinHandle<()>>,
}

impl ElkPanel {
    /// Connect over TCP with the configured retry policy.
    ///
    /// Transient failures (refused/dropped connections, reply
    /// timeouts) are retried with exponential backoff starting from
    /// `reconnect_delay_ms`.
    pub async fn connect(config: PanelConfig) -> Result<Self> {
        let max_retries = config.max_connect_retries;
        let base_delay_ms = config.reconnect_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay_ms = base_delay_ms * (1 << (attempt - 1).min(4));
                warn!(
                    "connection attempt {attempt} failed, retrying in {:.1}s",
                    delay_ms as f64 / 1000.0
                );
                sleep(Duration::from_millis(delay_ms)).await;
            }

            match Self::try_connect(config.clone()).await {
                Ok(panel) => return Ok(panel),
                Err(e) => {
                    if !e.is_retryable() || attempt == max_retries {
                        return Err(e);
                    }
                    warn!("connection error (attempt {}): {e}", attempt + 1);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(ElkError::Disconnected))
    }

    async fn try_connect(config: PanelConfig) -> Result<Self> {
        let (event_tx, _event_rx) = event_channel(256);
        let conn = Connection::connect_tcp(&config.address, event_tx.clone()).await?;
        Self::start(conn, config, event_tx).await
    }

    /// Drive an already-established byte stream (serial port device,
    /// test transport) instead of opening a TCP connection.
    pub async fn connect_stream<S>(stream: S, config: PanelConfig) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (event_tx, _event_rx) = event_channel(256);
        let conn = Connection::from_stream(stream, event_tx.clone());
        Self::start(conn, config, event_tx).await
    }

    async fn start(
        conn: Arc<Connection>,
        config: PanelConfig,
        event_tx: EventSender,
    ) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let rescan_on_connect = config.rescan_on_connect;
        let comm = Arc::new(ElkComm::new(conn, registry, event_tx.clone(), config));

        let _ = event_tx.send(PanelEvent::Connected);
        info!("panel connection established");

        if rescan_on_connect {
            // A failed initial scan leaves the handle usable; the host
            // can retry with an explicit rescan() later.
            if let Err(e) = comm.rescan().await {
                warn!("initial rescan incomplete: {e}");
            }
        }

        let dispatcher_handle = Some(spawn_dispatcher(comm.clone(), event_tx.clone()));

        Ok(Self {
            comm,
            event_tx,
            dispatcher_handle,
        })
    }

    /// Subscribe to panel events.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.comm.connection().is_connected()
    }

    /// Whether a rescan is currently repopulating the registry.
    pub fn rescan_in_progress(&self) -> bool {
        self.comm.rescan_in_progress()
    }

    /// Re-query the complete state of every entity kind.
    pub async fn rescan(&self) -> Result<()> {
        self.comm.rescan().await
    }

    // --- Entity snapshots ---

    /// Snapshot of all zones (entity numbers 1-208).
    pub async fn zones(&self) -> Vec<Zone> {
        self.comm.registry().zones().await
    }

    /// One zone by its 1-based number.
    pub async fn zone(&self, number: u16) -> Option<Zone> {
        self.comm.registry().zone(number).await
    }

    pub async fn outputs(&self) -> Vec<Output> {
        self.comm.registry().outputs().await
    }

    pub async fn output(&self, number: u16) -> Option<Output> {
        self.comm.registry().output(number).await
    }

    pub async fn areas(&self) -> Vec<Area> {
        self.comm.registry().areas().await
    }

    pub async fn area(&self, number: u8) -> Option<Area> {
        self.comm.registry().area(number).await
    }

    pub async fn keypads(&self) -> Vec<Keypad> {
        self.comm.registry().keypads().await
    }

    pub async fn keypad(&self, number: u8) -> Option<Keypad> {
        self.comm.registry().keypad(number).await
    }

    pub async fn trouble(&self) -> SystemTrouble {
        self.comm.registry().trouble().await
    }

    pub async fn versions(&self) -> Option<PanelVersions> {
        self.comm.registry().versions().await
    }

    // --- Commands ---

    /// Arm or disarm an area using the configured user code. The panel
    /// confirms through an unsolicited arming-status update.
    pub async fn arm(&self, area: u8, level: ArmLevel) -> Result<()> {
        check_range("area", u16::from(area), MAX_AREAS)?;
        debug!("arming area {area} ({level:?})");
        self.comm
            .send_command(&Command::Arm {
                level,
                area,
                code: self.comm.config().user_code.clone(),
            })
            .await
    }

    /// Disarm an area using the configured user code.
    pub async fn disarm(&self, area: u8) -> Result<()> {
        self.arm(area, ArmLevel::Disarm).await
    }

    /// Turn an output on for `seconds` (0 latches it on).
    pub async fn output_on(&self, output: u16, seconds: u32) -> Result<()> {
        check_range("output", output, MAX_OUTPUTS)?;
        self.comm
            .send_command(&Command::OutputOn { output, seconds })
            .await
    }

    pub async fn output_off(&self, output: u16) -> Result<()> {
        check_range("output", output, MAX_OUTPUTS)?;
        self.comm.send_command(&Command::OutputOff { output }).await
    }

    pub async fn output_toggle(&self, output: u16) -> Result<()> {
        check_range("output", output, MAX_OUTPUTS)?;
        self.comm
            .send_command(&Command::OutputToggle { output })
            .await
    }

    /// Toggle bypass on a zone. Returns the new bypass state reported
    /// by the panel.
    pub async fn bypass_zone(&self, zone: u16, area: u8) -> Result<bool> {
        check_range("zone", zone, MAX_ZONES)?;
        check_range("area", u16::from(area), MAX_AREAS)?;
        let reply = self
            .comm
            .request_reply(&Command::ZoneBypass {
                zone,
                area,
                code: self.comm.config().user_code.clone(),
            })
            .await?;
        // Reply payload: zone(3) then the resulting bypass flag.
        Ok(reply.payload.chars().nth(3) == Some('1'))
    }

    /// Activate a panel task.
    pub async fn activate_task(&self, task: u16) -> Result<()> {
        check_range("task", task, MAX_TASKS)?;
        self.comm.send_command(&Command::ActivateTask { task }).await
    }

    /// Close the connection. Entity state is retained as a stale
    /// snapshot so the host can keep displaying last-known values.
    pub async fn disconnect(&mut self) {
        info!("disconnecting from panel");
        if let Some(h) = self.dispatcher_handle.take() {
            h.abort();
        }
        self.comm.connection().close();
        let _ = self.event_tx.send(PanelEvent::Disconnected);
    }
}

impl Drop for ElkPanel {
    fn drop(&mut self) {
        if let Some(h) = self.dispatcher_handle.take() {
            h.abort();
        }
        self.comm.connection().close();
    }
}

fn check_range(entity: &'static str, number: u16, max: u16) -> Result<()> {
    if number == 0 || number > max {
        return Err(ElkError::InvalidNumber {
            entity,
            number,
            max,
        });
    }
    Ok(())
}

/// The dispatcher task: on every tick, drain unsolicited messages from
/// the queue and route them through the registry. Held off while a
/// rescan is repopulating the registry so partial scan state is never
/// interleaved with live updates. An installer-exit event triggers a
/// rescan because the panel configuration may have changed.
fn spawn_dispatcher(comm: Arc<ElkComm>, event_tx: EventSender) -> JoinHandle<()> {
    let tick_ms = comm.config().dispatch_tick_ms;
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(tick_ms));
        loop {
            tick.tick().await;
            if comm.connection().queue().is_closed()
                && comm.connection().queue().is_empty().await
            {
                debug!("dispatcher stopping: queue closed and drained");
                break;
            }
            if comm.rescan_in_progress() {
                continue;
            }

            for msg in comm.connection().queue().drain_auto().await {
                let mut rescan_needed = false;
                for event in comm.registry().route_auto(&msg).await {
                    if matches!(event, PanelEvent::InstallerExited) {
                        rescan_needed = true;
                    }
                    let _ = event_tx.send(event);
                }
                if rescan_needed {
                    info!("installer exited programming mode, rescanning");
                    if let Err(e) = comm.rescan().await {
                        warn!("post-installer rescan incomplete: {e}");
                    }
                }
            }
        }
    })
}
