//! Areas (partitions): independently armable groups of zones.

use chrono::{DateTime, Utc};

use crate::codec::Message;
use crate::protocol::{payload_hex_digit, payload_number, payload_offset_digit};

/// Arming status reported in the `AS` message, one digit per area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmedStatus {
    #[default]
    Disarmed,
    ArmedAway,
    ArmedStay,
    ArmedStayInstant,
    ArmedNight,
    ArmedNightInstant,
    ArmedVacation,
}

impl ArmedStatus {
    pub fn from_code(v: u8) -> Self {
        match v {
            1 => Self::ArmedAway,
            2 => Self::ArmedStay,
            3 => Self::ArmedStayInstant,
            4 => Self::ArmedNight,
            5 => Self::ArmedNightInstant,
            6 => Self::ArmedVacation,
            _ => Self::Disarmed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disarmed => "Disarmed",
            Self::ArmedAway => "Armed Away",
            Self::ArmedStay => "Armed Stay",
            Self::ArmedStayInstant => "Armed Stay Instant",
            Self::ArmedNight => "Armed Night",
            Self::ArmedNightInstant => "Armed Night Instant",
            Self::ArmedVacation => "Armed Vacation",
        }
    }

    pub fn is_armed(&self) -> bool {
        !matches!(self, Self::Disarmed)
    }
}

/// Readiness-to-arm state, second block of the `AS` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmUpState {
    #[default]
    NotReady,
    Ready,
    ReadyForceArm,
    ArmedExitTimer,
    Armed,
    ForceArmedViolated,
    ArmedBypass,
}

impl ArmUpState {
    pub fn from_code(v: u8) -> Self {
        match v {
            1 => Self::Ready,
            2 => Self::ReadyForceArm,
            3 => Self::ArmedExitTimer,
            4 => Self::Armed,
            5 => Self::ForceArmedViolated,
            6 => Self::ArmedBypass,
            _ => Self::NotReady,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotReady => "Not Ready To Arm",
            Self::Ready => "Ready To Arm",
            Self::ReadyForceArm => "Ready To Arm if Force Armed",
            Self::ArmedExitTimer => "Armed with Exit Timer Running",
            Self::Armed => "Armed Fully",
            Self::ForceArmedViolated => "Force Armed with a Violated Zone",
            Self::ArmedBypass => "Armed with a Bypass",
        }
    }
}

/// Active alarm state, third block of the `AS` report (offset digits,
/// values run past 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaAlarmState {
    #[default]
    None,
    EntranceDelay,
    AbortDelay,
    Fire,
    Medical,
    Police,
    Burglar,
    Aux1,
    Aux2,
    Aux3,
    Aux4,
    CarbonMonoxide,
    Emergency,
    Freeze,
    Gas,
    Heat,
    Water,
    FireSupervisory,
    FireVerify,
}

impl AreaAlarmState {
    pub fn from_code(v: u8) -> Self {
        match v {
            1 => Self::EntranceDelay,
            2 => Self::AbortDelay,
            3 => Self::Fire,
            4 => Self::Medical,
            5 => Self::Police,
            6 => Self::Burglar,
            7 => Self::Aux1,
            8 => Self::Aux2,
            9 => Self::Aux3,
            10 => Self::Aux4,
            11 => Self::CarbonMonoxide,
            12 => Self::Emergency,
            13 => Self::Freeze,
            14 => Self::Gas,
            15 => Self::Heat,
            16 => Self::Water,
            17 => Self::FireSupervisory,
            18 => Self::FireVerify,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "No Alarm Active",
            Self::EntranceDelay => "Entrance Delay Active",
            Self::AbortDelay => "Alarm Abort Delay Active",
            Self::Fire => "Fire Alarm",
            Self::Medical => "Medical Alarm",
            Self::Police => "Police Alarm",
            Self::Burglar => "Burglar Alarm",
            Self::Aux1 => "Aux 1 Alarm",
            Self::Aux2 => "Aux 2 Alarm",
            Self::Aux3 => "Aux 3 Alarm",
            Self::Aux4 => "Aux 4 Alarm",
            Self::CarbonMonoxide => "Carbon Monoxide Alarm",
            Self::Emergency => "Emergency Alarm",
            Self::Freeze => "Freeze Alarm",
            Self::Gas => "Gas Alarm",
            Self::Heat => "Heat Alarm",
            Self::Water => "Water Alarm",
            Self::FireSupervisory => "Fire Supervisory",
            Self::FireVerify => "Verify Fire",
        }
    }
}

/// Chime mode, reported per area in `KC` updates. Bit 0 = single
/// beep, bit 1 = constant beep, bit 3 = chime tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChimeMode(pub u8);

impl ChimeMode {
    pub fn single_beep(&self) -> bool {
        self.0 & 0b0001 != 0
    }

    pub fn constant_beep(&self) -> bool {
        self.0 & 0b0010 != 0
    }

    pub fn chime(&self) -> bool {
        self.0 & 0b1000 != 0
    }

    pub fn is_silent(&self) -> bool {
        self.0 == 0
    }
}

/// A single area.
#[derive(Debug, Clone)]
pub struct Area {
    number: u8,
    armed: ArmedStatus,
    arm_up: ArmUpState,
    alarm: AreaAlarmState,
    chime_mode: ChimeMode,
    alarm_memory: bool,
    timer_entrance_1: u16,
    timer_entrance_2: u16,
    timer_exit_1: u16,
    timer_exit_2: u16,
    description: String,
    last_updated_at: Option<DateTime<Utc>>,
}

impl Area {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            armed: ArmedStatus::default(),
            arm_up: ArmUpState::default(),
            alarm: AreaAlarmState::default(),
            chime_mode: ChimeMode::default(),
            alarm_memory: false,
            timer_entrance_1: 0,
            timer_entrance_2: 0,
            timer_exit_1: 0,
            timer_exit_2: 0,
            description: String::new(),
            last_updated_at: None,
        }
    }

    /// `AS` report: 8 armed digits, 8 arm-up digits, 8 alarm digits.
    /// The alarm block uses the offset substrate (values reach 18).
    pub(crate) fn unpack_event_arming_status_report(&mut self, msg: &Message) -> bool {
        let idx = usize::from(self.number) - 1;
        let (Some(armed), Some(arm_up), Some(alarm)) = (
            payload_hex_digit(&msg.payload, idx),
            payload_hex_digit(&msg.payload, 8 + idx),
            payload_offset_digit(&msg.payload, 16 + idx),
        ) else {
            return false;
        };
        let armed = ArmedStatus::from_code(armed);
        let arm_up = ArmUpState::from_code(arm_up);
        let alarm = AreaAlarmState::from_code(alarm);
        if self.armed == armed && self.arm_up == arm_up && self.alarm == alarm {
            return false;
        }
        self.armed = armed;
        self.arm_up = arm_up;
        self.alarm = alarm;
        self.touch();
        true
    }

    /// `EE` update: area(1), entrance flag(1), timer1(3), timer2(3),
    /// armed state(1).
    pub(crate) fn unpack_event_entry_exit_timer(&mut self, msg: &Message) -> bool {
        let entrance = msg.payload.chars().nth(1) == Some('1');
        let (Some(timer_1), Some(timer_2)) = (
            payload_number(&msg.payload, 2, 3),
            payload_number(&msg.payload, 5, 3),
        ) else {
            return false;
        };
        if let Some(armed) = payload_offset_digit(&msg.payload, 8) {
            self.armed = ArmedStatus::from_code(armed);
        }
        if entrance {
            self.timer_entrance_1 = timer_1;
            self.timer_entrance_2 = timer_2;
        } else {
            self.timer_exit_1 = timer_1;
            self.timer_exit_2 = timer_2;
        }
        self.touch();
        true
    }

    /// `AM` update: one flag digit per area.
    pub(crate) fn unpack_event_alarm_memory(&mut self, msg: &Message) -> bool {
        let idx = usize::from(self.number) - 1;
        let Some(flag) = msg.payload.chars().nth(idx) else {
            return false;
        };
        let memory = flag == '1';
        if self.alarm_memory == memory {
            return false;
        }
        self.alarm_memory = memory;
        self.touch();
        true
    }

    /// `KC` update: positions 11-18 carry the chime mode for each of
    /// the eight areas.
    pub(crate) fn unpack_event_keypad_status_report(&mut self, msg: &Message) -> bool {
        let idx = 11 + usize::from(self.number) - 1;
        let Some(mode) = payload_offset_digit(&msg.payload, idx) else {
            return false;
        };
        let mode = ChimeMode(mode);
        if self.chime_mode == mode {
            return false;
        }
        self.chime_mode = mode;
        self.touch();
        true
    }

    /// `SD` reply: install the area's programmed name.
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

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn armed(&self) -> ArmedStatus {
        self.armed
    }

    pub fn arm_up(&self) -> ArmUpState {
        self.arm_up
    }

    pub fn alarm(&self) -> AreaAlarmState {
        self.alarm
    }

    pub fn chime_mode(&self) -> ChimeMode {
        self.chime_mode
    }

    /// Whether an alarm occurred during the last arm cycle.
    pub fn alarm_memory(&self) -> bool {
        self.alarm_memory
    }

    pub fn entrance_timers(&self) -> (u16, u16) {
        (self.timer_entrance_1, self.timer_entrance_2)
    }

    pub fn exit_timers(&self) -> (u16, u16) {
        (self.timer_exit_1, self.timer_exit_2)
    }

    /// Programmed name, or `"Area N"` when none is set.
    pub fn description(&self) -> String {
        if self.description.is_empty() {
            format!("Area {}", self.number)
        } else {
            self.description.clone()
        }
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arming_report(armed: &str, arm_up: &str, alarm: &str) -> Message {
        Message::new("AS", &format!("{armed:0<8}{arm_up:0<8}{alarm:0<8}"))
    }

    #[test]
    fn test_arming_status_blocks() {
        let mut area = Area::new(1);
        let changed = area.unpack_event_arming_status_report(&arming_report("1", "4", "6"));
        assert!(changed);
        assert_eq!(area.armed(), ArmedStatus::ArmedAway);
        assert_eq!(area.arm_up(), ArmUpState::Armed);
        assert_eq!(area.alarm(), AreaAlarmState::Burglar);
    }

    #[test]
    fn test_arming_status_second_area_offsets() {
        let mut area = Area::new(2);
        let msg = arming_report("02", "01", "00");
        assert!(area.unpack_event_arming_status_report(&msg));
        assert_eq!(area.armed(), ArmedStatus::ArmedStay);
        assert_eq!(area.arm_up(), ArmUpState::Ready);
        assert_eq!(area.alarm(), AreaAlarmState::None);
    }

    #[test]
    fn test_alarm_block_uses_offset_digits() {
        let mut area = Area::new(1);
        // ':' = 10 = Aux 4 alarm.
        let msg = arming_report("1", "4", ":");
        area.unpack_event_arming_status_report(&msg);
        assert_eq!(area.alarm(), AreaAlarmState::Aux4);
    }

    #[test]
    fn test_unchanged_arming_status_is_noop() {
        let mut area = Area::new(1);
        let msg = arming_report("1", "4", "0");
        assert!(area.unpack_event_arming_status_report(&msg));
        assert!(!area.unpack_event_arming_status_report(&msg));
    }

    #[test]
    fn test_entry_exit_timer() {
        let mut area = Area::new(1);
        // Entrance timer: 30s and 60s, armed away.
        let msg = Message::new("EE", "110300601");
        assert!(area.unpack_event_entry_exit_timer(&msg));
        assert_eq!(area.entrance_timers(), (30, 60));
        assert_eq!(area.armed(), ArmedStatus::ArmedAway);

        // Exit timer variant.
        let msg = Message::new("EE", "100600601");
        assert!(area.unpack_event_entry_exit_timer(&msg));
        assert_eq!(area.exit_timers(), (60, 60));
    }

    #[test]
    fn test_alarm_memory_flag() {
        let mut area = Area::new(3);
        assert!(area.unpack_event_alarm_memory(&Message::new("AM", "00100000")));
        assert!(area.alarm_memory());
        assert!(!area.unpack_event_alarm_memory(&Message::new("AM", "00100000")));
    }

    #[test]
    fn test_chime_mode_from_keypad_report() {
        let mut area = Area::new(1);
        // Keypad 1, key 00, no illumination, no bypass, area 1 chime 9
        // (chime tone + single beep).
        let msg = Message::new("KC", "0100000000090000000");
        assert!(area.unpack_event_keypad_status_report(&msg));
        assert!(area.chime_mode().chime());
        assert!(area.chime_mode().single_beep());
        assert!(!area.chime_mode().constant_beep());
    }
}
