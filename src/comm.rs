//! The synchronization engine: issues the full sequence of status,
//! definition and description queries that repopulate the entity
//! registry, at startup and again whenever the installer leaves
//! programming mode.
//!
//! Scan steps are independent failure domains: a timed-out step is
//! retried per the configured policy, then reported failed while the
//! remaining steps still run, so one dead query never leaves the whole
//! registry stale.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::codec::Message;
use crate::config::PanelConfig;
use crate::constants::{DescriptionType, MAX_AREAS, MAX_KEYPADS, MAX_OUTPUTS, MAX_ZONES};
use crate::devices::system::PanelVersions;
use crate::error::{ElkError, Result};
use crate::event::{EventSender, PanelEvent};
use crate::protocol::{parse_description_reply, Command};
use crate::registry::Registry;
use crate::transport::Connection;

/// Rescan orchestrator. Shared between the panel handle (explicit
/// rescans, commands) and the dispatcher task (installer-exit rescans).
pub struct ElkComm {
    conn: Arc<Connection>,
    registry: Arc<Registry>,
    event_tx: EventSender,
    config: PanelConfig,
    rescan_in_progress: AtomicBool,
}

impl ElkComm {
    pub fn new(
        conn: Arc<Connection>,
        registry: Arc<Registry>,
        event_tx: EventSender,
        config: PanelConfig,
    ) -> Self {
        Self {
            conn,
            registry,
            event_tx,
            config,
            rescan_in_progress: AtomicBool::new(false),
        }
    }

    /// Whether a rescan is currently repopulating the registry. The
    /// dispatcher consults this to defer auto-dispatch delivery so the
    /// host never observes a half-updated registry interleaved with
    /// live events.
    pub fn rescan_in_progress(&self) -> bool {
        self.rescan_in_progress.load(Ordering::SeqCst)
    }

    /// Run a full resynchronization pass over every entity kind.
    ///
    /// Returns the first step failure after attempting every step.
    /// Re-entrant calls while a rescan is already running are no-ops.
    pub async fn rescan(&self) -> Result<()> {
        if self.rescan_in_progress.swap(true, Ordering::SeqCst) {
            debug!("rescan already in progress");
            return Ok(());
        }
        info!("rescan starting");
        let _ = self.event_tx.send(PanelEvent::RescanStarted);

        let result = self.run_scan().await;

        self.rescan_in_progress.store(false, Ordering::SeqCst);
        let complete = result.is_ok();
        info!("rescan finished (complete: {complete})");
        let _ = self.event_tx.send(PanelEvent::RescanComplete { complete });
        result
    }

    async fn run_scan(&self) -> Result<()> {
        let mut first_err = None;
        let mut record = |step: &str, result: Result<()>| {
            if let Err(e) = result {
                warn!("rescan step {step} failed: {e}");
                first_err.get_or_insert(e);
            }
        };

        record("version", self.get_version().await);
        record("zones", self.scan_zones().await);
        record("outputs", self.scan_outputs().await);
        record("areas", self.scan_areas().await);
        record("keypads", self.scan_keypads().await);
        record("trouble", self.scan_trouble_status().await);

        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Query the M1 and M1XEP firmware versions.
    pub async fn get_version(&self) -> Result<()> {
        let reply = self.request_reply(&Command::Version).await?;
        let versions =
            PanelVersions::from_payload(&reply.payload).ok_or(ElkError::InvalidResponse {
                details: format!("bad VN payload {:?}", reply.payload),
            })?;
        info!("panel versions: M1 {}, M1XEP {}", versions.m1, versions.m1xep);
        self.registry.set_versions(versions).await;
        Ok(())
    }

    /// Zone sub-scans: status, alarm type, definition, partition,
    /// per-analog-zone voltage and the description walk. The status
    /// report is the step's hard requirement; the follow-up passes
    /// degrade to warnings so a panel that answers slowly still yields
    /// usable open/closed state.
    pub async fn scan_zones(&self) -> Result<()> {
        let reply = self.request_reply(&Command::ZoneStatus).await?;
        self.publish(self.registry.apply_zone_status_report(&reply).await);

        for command in [
            Command::AlarmByZone,
            Command::ZoneDefinitions,
            Command::ZonePartitions,
        ] {
            match self.request_reply(&command).await {
                Ok(reply) => {
                    let events = match command {
                        Command::AlarmByZone => self.registry.apply_alarm_by_zone(&reply).await,
                        Command::ZoneDefinitions => {
                            self.registry.apply_zone_definitions(&reply).await
                        }
                        _ => self.registry.apply_zone_partitions(&reply).await,
                    };
                    self.publish(events);
                }
                Err(e) => warn!("zone sub-scan {command:?} skipped: {e}"),
            }
        }

        for zone in self.registry.analog_zones().await {
            if !self.config.scan_filter.zone_included(zone) {
                continue;
            }
            match self.request_reply(&Command::ZoneVoltage { zone }).await {
                Ok(reply) => self.publish(self.registry.apply_zone_voltage(&reply).await),
                Err(e) => warn!("voltage query for zone {zone} skipped: {e}"),
            }
        }

        self.describe(DescriptionType::ZoneName, MAX_ZONES, |n| {
            self.config.scan_filter.zone_included(n)
        })
        .await;
        Ok(())
    }

    pub async fn scan_outputs(&self) -> Result<()> {
        let reply = self.request_reply(&Command::OutputStatus).await?;
        self.publish(self.registry.apply_output_status_report(&reply).await);

        self.describe(DescriptionType::OutputName, MAX_OUTPUTS, |n| {
            self.config.scan_filter.output_included(n)
        })
        .await;
        Ok(())
    }

    pub async fn scan_areas(&self) -> Result<()> {
        let reply = self.request_reply(&Command::ArmingStatus).await?;
        self.publish(self.registry.apply_arming_status_report(&reply).await);

        self.describe(DescriptionType::AreaName, MAX_AREAS, |n| {
            self.config.scan_filter.area_included(n as u8)
        })
        .await;
        Ok(())
    }

    /// Keypad scan: area assignments for all keypads, then a status
    /// query per included keypad.
    pub async fn scan_keypads(&self) -> Result<()> {
        let reply = self.request_reply(&Command::KeypadAreas).await?;
        self.publish(self.registry.apply_keypad_areas(&reply).await);

        for keypad in 1..=MAX_KEYPADS as u8 {
            if !self.config.scan_filter.keypad_included(keypad) {
                continue;
            }
            match self.request_reply(&Command::KeypadStatus { keypad }).await {
                Ok(reply) => self.publish(self.registry.apply_keypad_status(&reply).await),
                Err(e) => warn!("keypad {keypad} status query skipped: {e}"),
            }
        }
        Ok(())
    }

    pub async fn scan_trouble_status(&self) -> Result<()> {
        let reply = self.request_reply(&Command::TroubleStatus).await?;
        self.publish(self.registry.apply_trouble_status(&reply).await);
        Ok(())
    }

    /// Walk one description list. The panel answers each request with
    /// the next programmed name at or after the requested number and
    /// signals end-of-list with a number below the requested one (or
    /// an out-of-range 255/0). Failures here only cost names, so a
    /// timeout ends the walk with a warning instead of failing the
    /// scan step.
    async fn describe<F: Fn(u16) -> bool>(
        &self,
        desc_type: DescriptionType,
        max: u16,
        included: F,
    ) {
        let mut number = 1u16;
        while number <= max {
            let reply = match self
                .request_reply(&Command::Description { desc_type, number })
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("description walk for {desc_type:?} ended early: {e}");
                    return;
                }
            };
            let Some((reply_type, reply_number, name)) = parse_description_reply(&reply.payload)
            else {
                warn!("malformed SD payload {:?}", reply.payload);
                return;
            };
            if reply_type != desc_type.code() {
                debug!("SD reply for different list ({reply_type}), ending walk");
                return;
            }
            if reply_number < number || reply_number > max {
                // End of list.
                return;
            }
            if included(reply_number) {
                self.publish(
                    self.registry
                        .apply_description(desc_type, reply_number, &name)
                        .await,
                );
            }
            number = reply_number + 1;
        }
    }

    /// Send a request and wait for its reply kind, retrying timed-out
    /// attempts up to the configured limit.
    pub async fn request_reply(&self, command: &Command) -> Result<Message> {
        let Some(reply_kind) = command.reply_kind() else {
            return Err(ElkError::InvalidResponse {
                details: format!("{command:?} has no reply kind"),
            });
        };
        let timeout = Duration::from_millis(self.config.reply_timeout_ms);

        let mut attempt = 0;
        loop {
            self.conn.send(&command.to_message()).await?;
            match self.conn.queue().wait_for_kind(reply_kind, timeout).await {
                Ok(reply) => return Ok(reply),
                Err(e @ ElkError::ReplyTimeout { .. }) if attempt < self.config.scan_retry_limit => {
                    attempt += 1;
                    warn!("{e}; retry {attempt}/{}", self.config.scan_retry_limit);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fire a command that has no direct reply.
    pub async fn send_command(&self, command: &Command) -> Result<()> {
        self.conn.send(&command.to_message()).await
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    fn publish(&self, events: Vec<PanelEvent>) {
        for event in events {
            // Fire-and-forget: a lagging subscriber must never stall
            // the scan or dispatch path.
            let _ = self.event_tx.send(event);
        }
    }
}
