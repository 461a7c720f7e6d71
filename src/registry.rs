//! The entity registry: fixed-capacity, 1-indexed collections of every
//! panel entity kind, plus the routing table that maps unsolicited
//! message kinds to the entity they update.
//!
//! Collections are sized `max + 1` with slot 0 left as an untouched
//! placeholder, so protocol entity numbers index directly without
//! off-by-one translation. All mutation funnels through the entities'
//! own `unpack_event_*` methods; the registry only selects the target.

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::codec::Message;
use crate::constants::{DescriptionType, MAX_AREAS, MAX_KEYPADS, MAX_OUTPUTS, MAX_ZONES};
use crate::devices::area::Area;
use crate::devices::keypad::Keypad;
use crate::devices::output::Output;
use crate::devices::system::{PanelVersions, SystemTrouble};
use crate::devices::zone::{self, Zone};
use crate::event::PanelEvent;
use crate::protocol::{kind, payload_number};

/// Where an unsolicited message is routed and how its entity index is
/// extracted. One row per auto-dispatch kind; the widths differ per
/// kind and must not be assumed uniform.
#[derive(Debug, Clone, Copy)]
enum RouteTarget {
    /// 3-digit zone number, single-zone status update.
    Zone,
    /// 3-digit output number, single-output update.
    Output,
    /// 2-digit keypad number; also carries per-area chime modes.
    Keypad,
    /// 1-digit area number, entry/exit timer data.
    AreaTimer,
    /// Whole-collection update, one flag per area.
    AlarmMemory,
    /// Notification only, no registry mutation.
    UserCode,
    /// Notification only.
    Task,
    /// Panel configuration may have changed; the caller must rescan.
    InstallerExit,
    /// M1XEP keep-alive, consumed silently.
    Heartbeat,
}

struct AutoRoute {
    kind: &'static str,
    target: RouteTarget,
}

/// Built once; used by both the dispatcher task and tests. The scan
/// engine's full-pass replies do not go through this table.
const AUTO_ROUTES: [AutoRoute; 9] = [
    AutoRoute { kind: kind::ZONE_UPDATE, target: RouteTarget::Zone },
    AutoRoute { kind: kind::OUTPUT_UPDATE, target: RouteTarget::Output },
    AutoRoute { kind: kind::KEYPAD_STATUS_REPORT, target: RouteTarget::Keypad },
    AutoRoute { kind: kind::ENTRY_EXIT_TIMER, target: RouteTarget::AreaTimer },
    AutoRoute { kind: kind::ALARM_MEMORY, target: RouteTarget::AlarmMemory },
    AutoRoute { kind: kind::USER_CODE_ENTERED, target: RouteTarget::UserCode },
    AutoRoute { kind: kind::TASK_UPDATE, target: RouteTarget::Task },
    AutoRoute { kind: kind::INSTALLER_EXIT, target: RouteTarget::InstallerExit },
    AutoRoute { kind: kind::ETHERNET_TEST, target: RouteTarget::Heartbeat },
];

/// Owner of all entity instances for the life of the connection.
pub struct Registry {
    zones: RwLock<Vec<Zone>>,
    outputs: RwLock<Vec<Output>>,
    areas: RwLock<Vec<Area>>,
    keypads: RwLock<Vec<Keypad>>,
    trouble: RwLock<SystemTrouble>,
    versions: RwLock<Option<PanelVersions>>,
}

impl Registry {
    pub fn new() -> Self {
        // Slot 0 of each collection is a placeholder no protocol path
        // ever dereferences; entity numbers start at 1.
        Self {
            zones: RwLock::new((0..=MAX_ZONES).map(Zone::new).collect()),
            outputs: RwLock::new((0..=MAX_OUTPUTS).map(Output::new).collect()),
            areas: RwLock::new((0..=MAX_AREAS).map(|n| Area::new(n as u8)).collect()),
            keypads: RwLock::new((0..=MAX_KEYPADS).map(|n| Keypad::new(n as u8)).collect()),
            trouble: RwLock::new(SystemTrouble::default()),
            versions: RwLock::new(None),
        }
    }

    // --- Auto-dispatch routing ---

    /// Route one unsolicited message to its entity update and collect
    /// the change notifications to publish. An
    /// [`PanelEvent::InstallerExited`] entry signals that a rescan is
    /// required.
    pub async fn route_auto(&self, msg: &Message) -> Vec<PanelEvent> {
        let Some(route) = AUTO_ROUTES.iter().find(|r| r.kind == msg.kind) else {
            debug!("no auto-dispatch route for kind {}", msg.kind);
            return Vec::new();
        };

        let mut events = Vec::new();
        match route.target {
            RouteTarget::Zone => {
                let Some(number) = entity_number(msg, 3, MAX_ZONES, "zone") else {
                    return events;
                };
                let mut zones = self.zones.write().await;
                let z = &mut zones[usize::from(number)];
                if z.unpack_event_zone_update(msg) {
                    events.push(PanelEvent::ZoneChanged {
                        zone: number,
                        state: z.state(),
                        status: z.status(),
                    });
                }
            }
            RouteTarget::Output => {
                let Some(number) = entity_number(msg, 3, MAX_OUTPUTS, "output") else {
                    return events;
                };
                let mut outputs = self.outputs.write().await;
                let o = &mut outputs[usize::from(number)];
                if o.unpack_event_output_update(msg) {
                    events.push(PanelEvent::OutputChanged {
                        output: number,
                        on: o.is_on(),
                    });
                }
            }
            RouteTarget::Keypad => {
                events.extend(self.apply_keypad_status(msg).await);
            }
            RouteTarget::AreaTimer => {
                let Some(number) = entity_number(msg, 1, MAX_AREAS, "area") else {
                    return events;
                };
                let mut areas = self.areas.write().await;
                let a = &mut areas[usize::from(number)];
                if a.unpack_event_entry_exit_timer(msg) {
                    events.push(PanelEvent::AreaChanged {
                        area: number as u8,
                        armed: a.armed(),
                    });
                }
            }
            RouteTarget::AlarmMemory => {
                let mut areas = self.areas.write().await;
                for number in 1..=usize::from(MAX_AREAS) {
                    let a = &mut areas[number];
                    if a.unpack_event_alarm_memory(msg) {
                        events.push(PanelEvent::AreaChanged {
                            area: number as u8,
                            armed: a.armed(),
                        });
                    }
                }
            }
            RouteTarget::UserCode => {
                // Code digits(12), user number(3), keypad number(2).
                if let (Some(user), Some(keypad)) = (
                    payload_number(&msg.payload, 12, 3),
                    payload_number(&msg.payload, 15, 2),
                ) {
                    events.push(PanelEvent::UserCodeEntered {
                        user,
                        keypad: keypad as u8,
                    });
                }
            }
            RouteTarget::Task => {
                if let Some(task) = payload_number(&msg.payload, 0, 3) {
                    events.push(PanelEvent::TaskChanged { task });
                }
            }
            RouteTarget::InstallerExit => {
                events.push(PanelEvent::InstallerExited);
            }
            RouteTarget::Heartbeat => {
                debug!("M1XEP heartbeat");
            }
        }
        events
    }

    // --- Full-pass scan unpacking ---

    /// `ZS` reply: refresh every zone's state and status.
    pub async fn apply_zone_status_report(&self, msg: &Message) -> Vec<PanelEvent> {
        let mut events = Vec::new();
        let mut zones = self.zones.write().await;
        for number in 1..=usize::from(MAX_ZONES) {
            let z = &mut zones[number];
            if z.unpack_event_zone_status_report(msg) {
                events.push(PanelEvent::ZoneChanged {
                    zone: number as u16,
                    state: z.state(),
                    status: z.status(),
                });
            }
        }
        events
    }

    /// `AZ` reply: refresh every zone's alarm type.
    pub async fn apply_alarm_by_zone(&self, msg: &Message) -> Vec<PanelEvent> {
        self.apply_zone_pass(msg, Zone::unpack_event_alarm_zone).await
    }

    /// `ZD` reply: refresh every zone's definition.
    pub async fn apply_zone_definitions(&self, msg: &Message) -> Vec<PanelEvent> {
        self.apply_zone_pass(msg, Zone::unpack_event_zone_definition)
            .await
    }

    /// `ZP` reply: refresh every zone's partition assignment.
    pub async fn apply_zone_partitions(&self, msg: &Message) -> Vec<PanelEvent> {
        self.apply_zone_pass(msg, Zone::unpack_event_zone_partition)
            .await
    }

    async fn apply_zone_pass(
        &self,
        msg: &Message,
        unpack: fn(&mut Zone, &Message) -> bool,
    ) -> Vec<PanelEvent> {
        let mut events = Vec::new();
        let mut zones = self.zones.write().await;
        for number in 1..=usize::from(MAX_ZONES) {
            let z = &mut zones[number];
            if unpack(z, msg) {
                events.push(PanelEvent::ZoneChanged {
                    zone: number as u16,
                    state: z.state(),
                    status: z.status(),
                });
            }
        }
        events
    }

    /// `ZV` reply: refresh one analog zone's voltage.
    pub async fn apply_zone_voltage(&self, msg: &Message) -> Vec<PanelEvent> {
        let Some(number) = entity_number(msg, 3, MAX_ZONES, "zone") else {
            return Vec::new();
        };
        let mut zones = self.zones.write().await;
        let z = &mut zones[usize::from(number)];
        if z.unpack_event_zone_voltage(msg) {
            vec![PanelEvent::ZoneChanged {
                zone: number,
                state: z.state(),
                status: z.status(),
            }]
        } else {
            Vec::new()
        }
    }

    /// `CS` reply: refresh every output.
    pub async fn apply_output_status_report(&self, msg: &Message) -> Vec<PanelEvent> {
        let mut events = Vec::new();
        let mut outputs = self.outputs.write().await;
        for number in 1..=usize::from(MAX_OUTPUTS) {
            let o = &mut outputs[number];
            if o.unpack_event_output_status_report(msg) {
                events.push(PanelEvent::OutputChanged {
                    output: number as u16,
                    on: o.is_on(),
                });
            }
        }
        events
    }

    /// `AS` reply: refresh every area's arming status.
    pub async fn apply_arming_status_report(&self, msg: &Message) -> Vec<PanelEvent> {
        let mut events = Vec::new();
        let mut areas = self.areas.write().await;
        for number in 1..=usize::from(MAX_AREAS) {
            let a = &mut areas[number];
            if a.unpack_event_arming_status_report(msg) {
                events.push(PanelEvent::AreaChanged {
                    area: number as u8,
                    armed: a.armed(),
                });
            }
        }
        events
    }

    /// `KA` reply: refresh every keypad's area assignment.
    pub async fn apply_keypad_areas(&self, msg: &Message) -> Vec<PanelEvent> {
        let mut events = Vec::new();
        let mut keypads = self.keypads.write().await;
        for number in 1..=usize::from(MAX_KEYPADS) {
            let k = &mut keypads[number];
            if k.unpack_event_keypad_area_reply(msg) {
                events.push(PanelEvent::KeypadChanged {
                    keypad: number as u8,
                });
            }
        }
        events
    }

    /// `KC` report: update the named keypad, and let each area decode
    /// its chime-mode position from the same payload.
    pub async fn apply_keypad_status(&self, msg: &Message) -> Vec<PanelEvent> {
        let mut events = Vec::new();
        if let Some(number) = entity_number(msg, 2, MAX_KEYPADS, "keypad") {
            let mut keypads = self.keypads.write().await;
            let k = &mut keypads[usize::from(number)];
            if k.unpack_event_keypad_status_report(msg) {
                events.push(PanelEvent::KeypadChanged {
                    keypad: number as u8,
                });
            }
        }
        let mut areas = self.areas.write().await;
        for number in 1..=usize::from(MAX_AREAS) {
            let a = &mut areas[number];
            if a.unpack_event_keypad_status_report(msg) {
                events.push(PanelEvent::AreaChanged {
                    area: number as u8,
                    armed: a.armed(),
                });
            }
        }
        events
    }

    /// `SS` reply: refresh the system trouble flags.
    pub async fn apply_trouble_status(&self, msg: &Message) -> Vec<PanelEvent> {
        let mut trouble = self.trouble.write().await;
        if trouble.unpack_event_trouble_status(msg) {
            vec![PanelEvent::TroubleChanged {
                flags: trouble.flags(),
            }]
        } else {
            Vec::new()
        }
    }

    /// `SD` reply: install a description on the addressed entity.
    pub async fn apply_description(
        &self,
        desc_type: DescriptionType,
        number: u16,
        name: &str,
    ) -> Vec<PanelEvent> {
        match desc_type {
            DescriptionType::ZoneName if (1..=MAX_ZONES).contains(&number) => {
                let mut zones = self.zones.write().await;
                let z = &mut zones[usize::from(number)];
                if z.unpack_event_description(name) {
                    return vec![PanelEvent::ZoneChanged {
                        zone: number,
                        state: z.state(),
                        status: z.status(),
                    }];
                }
            }
            DescriptionType::OutputName if (1..=MAX_OUTPUTS).contains(&number) => {
                let mut outputs = self.outputs.write().await;
                let o = &mut outputs[usize::from(number)];
                if o.unpack_event_description(name) {
                    return vec![PanelEvent::OutputChanged {
                        output: number,
                        on: o.is_on(),
                    }];
                }
            }
            DescriptionType::AreaName if (1..=MAX_AREAS).contains(&number) => {
                let mut areas = self.areas.write().await;
                let a = &mut areas[usize::from(number)];
                if a.unpack_event_description(name) {
                    return vec![PanelEvent::AreaChanged {
                        area: number as u8,
                        armed: a.armed(),
                    }];
                }
            }
            DescriptionType::KeypadName if (1..=MAX_KEYPADS).contains(&number) => {
                let mut keypads = self.keypads.write().await;
                if keypads[usize::from(number)].unpack_event_description(name) {
                    return vec![PanelEvent::KeypadChanged {
                        keypad: number as u8,
                    }];
                }
            }
            _ => {}
        }
        Vec::new()
    }

    pub async fn set_versions(&self, versions: PanelVersions) {
        *self.versions.write().await = Some(versions);
    }

    /// Zone numbers defined as analog zones, for the voltage sub-scan.
    pub async fn analog_zones(&self) -> Vec<u16> {
        let zones = self.zones.read().await;
        zones
            .iter()
            .skip(1)
            .filter(|z| zone::is_analog(z.definition()))
            .map(Zone::number)
            .collect()
    }

    // --- Snapshot accessors ---

    /// Snapshot of all zones, entity numbers 1 to 208.
    pub async fn zones(&self) -> Vec<Zone> {
        self.zones.read().await[1..].to_vec()
    }

    pub async fn zone(&self, number: u16) -> Option<Zone> {
        if number == 0 || number > MAX_ZONES {
            return None;
        }
        Some(self.zones.read().await[usize::from(number)].clone())
    }

    pub async fn outputs(&self) -> Vec<Output> {
        self.outputs.read().await[1..].to_vec()
    }

    pub async fn output(&self, number: u16) -> Option<Output> {
        if number == 0 || number > MAX_OUTPUTS {
            return None;
        }
        Some(self.outputs.read().await[usize::from(number)].clone())
    }

    pub async fn areas(&self) -> Vec<Area> {
        self.areas.read().await[1..].to_vec()
    }

    pub async fn area(&self, number: u8) -> Option<Area> {
        if number == 0 || u16::from(number) > MAX_AREAS {
            return None;
        }
        Some(self.areas.read().await[usize::from(number)].clone())
    }

    pub async fn keypads(&self) -> Vec<Keypad> {
        self.keypads.read().await[1..].to_vec()
    }

    pub async fn keypad(&self, number: u8) -> Option<Keypad> {
        if number == 0 || u16::from(number) > MAX_KEYPADS {
            return None;
        }
        Some(self.keypads.read().await[usize::from(number)].clone())
    }

    pub async fn trouble(&self) -> SystemTrouble {
        self.trouble.read().await.clone()
    }

    pub async fn versions(&self) -> Option<PanelVersions> {
        self.versions.read().await.clone()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract and range-check a leading fixed-width entity number.
fn entity_number(msg: &Message, width: usize, max: u16, entity: &str) -> Option<u16> {
    match payload_number(&msg.payload, 0, width) {
        Some(n) if (1..=max).contains(&n) => Some(n),
        Some(n) => {
            warn!("{} message addresses out-of-range {} {}", msg.kind, entity, n);
            None
        }
        None => {
            warn!("{} message with malformed {} number", msg.kind, entity);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::zone::{ZoneLogicalStatus, ZonePhysicalState};

    #[tokio::test]
    async fn test_collections_sized_with_unused_slot_zero() {
        let registry = Registry::new();
        assert_eq!(registry.zones.read().await.len(), usize::from(MAX_ZONES) + 1);
        assert_eq!(registry.areas.read().await.len(), usize::from(MAX_AREAS) + 1);
        // Public snapshots skip the placeholder.
        assert_eq!(registry.zones().await.len(), usize::from(MAX_ZONES));
        assert_eq!(registry.zones().await[0].number(), 1);
        assert!(registry.zone(0).await.is_none());
    }

    #[tokio::test]
    async fn test_route_zone_update() {
        let registry = Registry::new();
        let events = registry.route_auto(&Message::new("ZC", "0059")).await;
        assert_eq!(events.len(), 1);
        let zone = registry.zone(5).await.unwrap();
        assert_eq!(zone.status(), ZoneLogicalStatus::Violated);
        assert_eq!(zone.state(), ZonePhysicalState::Open);

        // Same update again: no change, no event.
        let events = registry.route_auto(&Message::new("ZC", "0059")).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_route_rejects_out_of_range_index() {
        let registry = Registry::new();
        let events = registry.route_auto(&Message::new("ZC", "2099")).await;
        assert!(events.is_empty());
        let events = registry.route_auto(&Message::new("ZC", "0009")).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_route_installer_exit_flags_rescan() {
        let registry = Registry::new();
        let events = registry.route_auto(&Message::new("IE", "")).await;
        assert!(matches!(events[0], PanelEvent::InstallerExited));
    }

    #[tokio::test]
    async fn test_route_user_code() {
        let registry = Registry::new();
        let events = registry
            .route_auto(&Message::new("IC", "00000000123400301"))
            .await;
        match &events[0] {
            PanelEvent::UserCodeEntered { user, keypad } => {
                assert_eq!(*user, 3);
                assert_eq!(*keypad, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_full_zone_status_pass() {
        let registry = Registry::new();
        // Zone 5 violated (digit 9 = open + violated), everything else
        // EOL normal (digit 2).
        let mut payload = "2".repeat(208);
        payload.replace_range(4..5, "9");
        let events = registry
            .apply_zone_status_report(&Message::new("ZS", &payload))
            .await;
        assert_eq!(events.len(), 208);
        assert_eq!(
            registry.zone(5).await.unwrap().status(),
            ZoneLogicalStatus::Violated
        );
        assert_eq!(
            registry.zone(6).await.unwrap().status(),
            ZoneLogicalStatus::Normal
        );
    }

    #[tokio::test]
    async fn test_keypad_status_routes_chimes_to_areas() {
        let registry = Registry::new();
        // Keypad 2 pressed Stay; area 1 chime mode 8.
        let msg = Message::new("KC", "0217000000080000000");
        let events = registry.apply_keypad_status(&msg).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, PanelEvent::KeypadChanged { keypad: 2 })));
        assert!(events
            .iter()
            .any(|e| matches!(e, PanelEvent::AreaChanged { area: 1, .. })));
        assert!(registry.area(1).await.unwrap().chime_mode().chime());
    }

    #[tokio::test]
    async fn test_description_routing() {
        let registry = Registry::new();
        registry
            .apply_description(DescriptionType::ZoneName, 7, "Back Door       ")
            .await;
        assert_eq!(registry.zone(7).await.unwrap().description(), "Back Door");

        registry
            .apply_description(DescriptionType::OutputName, 3, "Siren")
            .await;
        assert_eq!(registry.output(3).await.unwrap().description(), "Siren");
    }

    #[tokio::test]
    async fn test_analog_zone_listing() {
        let registry = Registry::new();
        // Zone 4 defined as analog (34 = 'R' in offset digits... use
        // the raw substrate: '0' + 34 = 'R').
        let mut payload = "0".repeat(208);
        payload.replace_range(3..4, "R");
        registry
            .apply_zone_definitions(&Message::new("ZD", &payload))
            .await;
        assert_eq!(registry.analog_zones().await, vec![4]);
    }
}
