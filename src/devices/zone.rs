//! Zones: the panel's wired and wireless sensor inputs.

use chrono::{DateTime, Utc};

use crate::codec::Message;
use crate::protocol::{offset_digit, payload_hex_digit, payload_number, payload_offset_digit};

/// Physical wiring state of a zone, bits 0-1 of a status digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZonePhysicalState {
    #[default]
    Unconfigured,
    Open,
    Eol,
    Short,
}

impl ZonePhysicalState {
    pub fn from_code(v: u8) -> Self {
        match v & 0b11 {
            1 => Self::Open,
            2 => Self::Eol,
            3 => Self::Short,
            _ => Self::Unconfigured,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "Unconfigured",
            Self::Open => "Open",
            Self::Eol => "EOL",
            Self::Short => "Short",
        }
    }
}

/// Logical status of a zone, bits 2-3 of a status digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneLogicalStatus {
    #[default]
    Normal,
    Trouble,
    Violated,
    Bypassed,
}

impl ZoneLogicalStatus {
    pub fn from_code(v: u8) -> Self {
        match v & 0b11 {
            1 => Self::Trouble,
            2 => Self::Violated,
            3 => Self::Bypassed,
            _ => Self::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Trouble => "Trouble",
            Self::Violated => "Violated",
            Self::Bypassed => "Bypassed",
        }
    }
}

/// Zone definition as programmed at the panel. The alarm-by-zone
/// report uses the same code table (values 0-25), so this enum serves
/// both the `definition` and `alarm` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneDefinition {
    #[default]
    Disabled,
    BurglarEntryExit1,
    BurglarEntryExit2,
    BurglarPerimeterInstant,
    BurglarInterior,
    BurglarInteriorFollower,
    BurglarInteriorNight,
    BurglarInteriorNightDelay,
    Burglar24Hour,
    BurglarBoxTamper,
    FireAlarm,
    FireVerified,
    FireSupervisory,
    AuxAlarm1,
    AuxAlarm2,
    Keyfob,
    NonAlarm,
    CarbonMonoxide,
    EmergencyAlarm,
    FreezeAlarm,
    GasAlarm,
    HeatAlarm,
    MedicalAlarm,
    PoliceAlarm,
    PoliceNoIndication,
    WaterAlarm,
    KeyMomentaryArmDisarm,
    KeyMomentaryArmAway,
    KeyMomentaryArmStay,
    KeyMomentaryDisarm,
    KeyOnOff,
    MuteAudibles,
    PowerSupervisory,
    Temperature,
    AnalogZone,
    PhoneKey,
    IntercomKey,
}

impl ZoneDefinition {
    pub fn from_code(v: u8) -> Self {
        match v {
            1 => Self::BurglarEntryExit1,
            2 => Self::BurglarEntryExit2,
            3 => Self::BurglarPerimeterInstant,
            4 => Self::BurglarInterior,
            5 => Self::BurglarInteriorFollower,
            6 => Self::BurglarInteriorNight,
            7 => Self::BurglarInteriorNightDelay,
            8 => Self::Burglar24Hour,
            9 => Self::BurglarBoxTamper,
            10 => Self::FireAlarm,
            11 => Self::FireVerified,
            12 => Self::FireSupervisory,
            13 => Self::AuxAlarm1,
            14 => Self::AuxAlarm2,
            15 => Self::Keyfob,
            16 => Self::NonAlarm,
            17 => Self::CarbonMonoxide,
            18 => Self::EmergencyAlarm,
            19 => Self::FreezeAlarm,
            20 => Self::GasAlarm,
            21 => Self::HeatAlarm,
            22 => Self::MedicalAlarm,
            23 => Self::PoliceAlarm,
            24 => Self::PoliceNoIndication,
            25 => Self::WaterAlarm,
            26 => Self::KeyMomentaryArmDisarm,
            27 => Self::KeyMomentaryArmAway,
            28 => Self::KeyMomentaryArmStay,
            29 => Self::KeyMomentaryDisarm,
            30 => Self::KeyOnOff,
            31 => Self::MuteAudibles,
            32 => Self::PowerSupervisory,
            33 => Self::Temperature,
            34 => Self::AnalogZone,
            35 => Self::PhoneKey,
            36 => Self::IntercomKey,
            _ => Self::Disabled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::BurglarEntryExit1 => "Burglar Entry/Exit 1",
            Self::BurglarEntryExit2 => "Burglar Entry/Exit 2",
            Self::BurglarPerimeterInstant => "Burglar Perimeter Instant",
            Self::BurglarInterior => "Burglar Interior",
            Self::BurglarInteriorFollower => "Burglar Interior Follower",
            Self::BurglarInteriorNight => "Burglar Interior Night",
            Self::BurglarInteriorNightDelay => "Burglar Interior Night Delay",
            Self::Burglar24Hour => "Burglar 24 Hour",
            Self::BurglarBoxTamper => "Burglar Box Tamper",
            Self::FireAlarm => "Fire Alarm",
            Self::FireVerified => "Fire Verified",
            Self::FireSupervisory => "Fire Supervisory",
            Self::AuxAlarm1 => "Aux Alarm 1",
            Self::AuxAlarm2 => "Aux Alarm 2",
            Self::Keyfob => "Keyfob",
            Self::NonAlarm => "Non Alarm",
            Self::CarbonMonoxide => "Carbon Monoxide",
            Self::EmergencyAlarm => "Emergency Alarm",
            Self::FreezeAlarm => "Freeze Alarm",
            Self::GasAlarm => "Gas Alarm",
            Self::HeatAlarm => "Heat Alarm",
            Self::MedicalAlarm => "Medical Alarm",
            Self::PoliceAlarm => "Police Alarm",
            Self::PoliceNoIndication => "Police No Indication",
            Self::WaterAlarm => "Water Alarm",
            Self::KeyMomentaryArmDisarm => "Key Momentary Arm / Disarm",
            Self::KeyMomentaryArmAway => "Key Momentary Arm Away",
            Self::KeyMomentaryArmStay => "Key Momentary Arm Stay",
            Self::KeyMomentaryDisarm => "Key Momentary Disarm",
            Self::KeyOnOff => "Key On/Off",
            Self::MuteAudibles => "Mute Audibles",
            Self::PowerSupervisory => "Power Supervisory",
            Self::Temperature => "Temperature",
            Self::AnalogZone => "Analog Zone",
            Self::PhoneKey => "Phone Key",
            Self::IntercomKey => "Intercom Key",
        }
    }
}

/// A single alarm zone.
///
/// Fields are only mutated by this type's `unpack_event_*` methods;
/// every method returns whether anything actually changed so callers
/// can skip redundant notifications.
#[derive(Debug, Clone)]
pub struct Zone {
    number: u16,
    state: ZonePhysicalState,
    status: ZoneLogicalStatus,
    definition: ZoneDefinition,
    alarm: ZoneDefinition,
    partition: u8,
    voltage_tenths: u16,
    description: String,
    last_updated_at: Option<DateTime<Utc>>,
}

impl Zone {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            state: ZonePhysicalState::default(),
            status: ZoneLogicalStatus::default(),
            definition: ZoneDefinition::default(),
            alarm: ZoneDefinition::default(),
            partition: 0,
            voltage_tenths: 0,
            description: String::new(),
            last_updated_at: None,
        }
    }

    /// `ZS` report: one hex digit per zone, bits 0-1 physical state,
    /// bits 2-3 logical status.
    pub(crate) fn unpack_event_zone_status_report(&mut self, msg: &Message) -> bool {
        let Some(digit) = payload_hex_digit(&msg.payload, usize::from(self.number) - 1) else {
            return false;
        };
        self.apply_status_digit(digit)
    }

    /// `ZC` update: 3-digit zone number then a single hex status digit.
    pub(crate) fn unpack_event_zone_update(&mut self, msg: &Message) -> bool {
        let Some(digit) = payload_hex_digit(&msg.payload, 3) else {
            return false;
        };
        self.apply_status_digit(digit)
    }

    fn apply_status_digit(&mut self, digit: u8) -> bool {
        let state = ZonePhysicalState::from_code(digit & 0b11);
        let status = ZoneLogicalStatus::from_code((digit >> 2) & 0b11);
        if self.state == state && self.status == status {
            return false;
        }
        self.state = state;
        self.status = status;
        self.touch();
        true
    }

    /// `AZ` report: one offset digit per zone with the alarm type.
    pub(crate) fn unpack_event_alarm_zone(&mut self, msg: &Message) -> bool {
        let Some(v) = payload_offset_digit(&msg.payload, usize::from(self.number) - 1) else {
            return false;
        };
        let alarm = ZoneDefinition::from_code(v);
        if self.alarm == alarm {
            return false;
        }
        self.alarm = alarm;
        self.touch();
        true
    }

    /// `ZD` report: one offset digit per zone with the definition.
    pub(crate) fn unpack_event_zone_definition(&mut self, msg: &Message) -> bool {
        let Some(v) = payload_offset_digit(&msg.payload, usize::from(self.number) - 1) else {
            return false;
        };
        let definition = ZoneDefinition::from_code(v);
        if self.definition == definition {
            return false;
        }
        self.definition = definition;
        self.touch();
        true
    }

    /// `ZP` report: one offset digit per zone with the partition number.
    pub(crate) fn unpack_event_zone_partition(&mut self, msg: &Message) -> bool {
        let Some(partition) = payload_offset_digit(&msg.payload, usize::from(self.number) - 1)
        else {
            return false;
        };
        if self.partition == partition {
            return false;
        }
        self.partition = partition;
        self.touch();
        true
    }

    /// `ZV` reply: 3-digit zone number then 3 digits of tenths of a
    /// volt (`"138"` = 13.8V).
    pub(crate) fn unpack_event_zone_voltage(&mut self, msg: &Message) -> bool {
        let Some(tenths) = payload_number(&msg.payload, 3, 3) else {
            return false;
        };
        if self.voltage_tenths == tenths {
            return false;
        }
        self.voltage_tenths = tenths;
        self.touch();
        true
    }

    /// `SD` reply: install the zone's programmed name.
    pub(crate) fn unpack_event_description(&mut self, name: &str) -> bool {
        let name = name.trim();
        if self.description == name {
            return false;
        }
        self.description = name.to_string();
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.last_updated_at = Some(Utc::now());
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn state(&self) -> ZonePhysicalState {
        self.state
    }

    pub fn status(&self) -> ZoneLogicalStatus {
        self.status
    }

    pub fn definition(&self) -> ZoneDefinition {
        self.definition
    }

    /// The alarm type this zone generates when violated.
    pub fn alarm(&self) -> ZoneDefinition {
        self.alarm
    }

    pub fn partition(&self) -> u8 {
        self.partition
    }

    /// Analog zone voltage in volts.
    pub fn voltage(&self) -> f32 {
        f32::from(self.voltage_tenths) / 10.0
    }

    /// Programmed name, or `"Zone N"` when none is set.
    pub fn description(&self) -> String {
        if self.description.is_empty() {
            format!("Zone {}", self.number)
        } else {
            self.description.clone()
        }
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated_at
    }

    pub fn is_configured(&self) -> bool {
        self.state != ZonePhysicalState::Unconfigured
            || self.definition != ZoneDefinition::Disabled
    }
}

// The decoded alarm column doubles as the definition table; keep the
// parse helper nearby for the registry's analog-zone sweep.
pub(crate) fn is_analog(definition: ZoneDefinition) -> bool {
    definition == ZoneDefinition::AnalogZone
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_report(digits: &str) -> Message {
        // Pad out to the full 208-zone report.
        let mut payload = digits.to_string();
        payload.push_str(&"0".repeat(208 - digits.len()));
        Message::new("ZS", &payload)
    }

    #[test]
    fn test_status_report_decodes_state_and_status() {
        let mut zone = Zone::new(2);
        // Digit 'A' = 0b1010: EOL wiring, violated.
        let changed = zone.unpack_event_zone_status_report(&status_report("0A"));
        assert!(changed);
        assert_eq!(zone.state(), ZonePhysicalState::Eol);
        assert_eq!(zone.status(), ZoneLogicalStatus::Violated);
        assert!(zone.last_updated_at().is_some());
    }

    #[test]
    fn test_unchanged_status_is_noop() {
        let mut zone = Zone::new(1);
        assert!(zone.unpack_event_zone_status_report(&status_report("2")));
        let stamp = zone.last_updated_at();
        // Same digit again: no change, no timestamp bump.
        assert!(!zone.unpack_event_zone_status_report(&status_report("2")));
        assert_eq!(zone.last_updated_at(), stamp);
    }

    #[test]
    fn test_zone_update_reads_digit_after_number() {
        let mut zone = Zone::new(16);
        let msg = Message::new("ZC", "0169");
        assert!(zone.unpack_event_zone_update(&msg));
        // '9' = 0b1001: open wiring, violated.
        assert_eq!(zone.state(), ZonePhysicalState::Open);
        assert_eq!(zone.status(), ZoneLogicalStatus::Violated);
    }

    #[test]
    fn test_definition_uses_offset_digits() {
        let mut zone = Zone::new(3);
        // ':' is 10 in the offset substrate = Fire Alarm.
        let mut payload = "00:".to_string();
        payload.push_str(&"0".repeat(205));
        assert!(zone.unpack_event_zone_definition(&Message::new("ZD", &payload)));
        assert_eq!(zone.definition(), ZoneDefinition::FireAlarm);
        assert_eq!(zone.definition().as_str(), "Fire Alarm");
    }

    #[test]
    fn test_voltage_reply() {
        let mut zone = Zone::new(7);
        let msg = Message::new("ZV", "007138");
        assert!(zone.unpack_event_zone_voltage(&msg));
        assert!((zone.voltage() - 13.8).abs() < f32::EPSILON);
        assert!(!zone.unpack_event_zone_voltage(&msg));
    }

    #[test]
    fn test_short_payload_is_ignored() {
        let mut zone = Zone::new(208);
        let msg = Message::new("ZS", "22");
        assert!(!zone.unpack_event_zone_status_report(&msg));
        assert_eq!(zone.state(), ZonePhysicalState::Unconfigured);
    }

    #[test]
    fn test_description_fallback() {
        let mut zone = Zone::new(5);
        assert_eq!(zone.description(), "Zone 5");
        assert!(zone.unpack_event_description("Front Door      "));
        assert_eq!(zone.description(), "Front Door");
        assert!(!zone.unpack_event_description("Front Door"));
    }

    #[test]
    fn test_analog_detection() {
        assert!(is_analog(ZoneDefinition::from_code(34)));
        assert!(!is_analog(ZoneDefinition::from_code(1)));
    }
}
