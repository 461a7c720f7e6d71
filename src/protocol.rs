//! Message kinds, outbound command builders and payload digit helpers.
//!
//! Requests use lowercase kind codes and replies the matching
//! uppercase code; unsolicited update kinds are uppercase with no
//! request counterpart. Payload fields are fixed-width decimal or
//! single "digit" characters in one of two substrates (see
//! [`hex_digit`] and [`offset_digit`]).

use crate::codec::Message;

/// Two-character message-type codes.
pub mod kind {
    /// `zs` — request zone status.
    pub const ZONE_STATUS_REQUEST: &str = "zs";
    /// `ZS` — zone status report (208 hex digits).
    pub const ZONE_STATUS_REPORT: &str = "ZS";
    /// `ZC` — unsolicited zone change update.
    pub const ZONE_UPDATE: &str = "ZC";
    /// `az` — request alarm-by-zone data.
    pub const ALARM_BY_ZONE_REQUEST: &str = "az";
    /// `AZ` — alarm-by-zone report.
    pub const ALARM_BY_ZONE_REPORT: &str = "AZ";
    /// `zd` — request zone definitions.
    pub const ZONE_DEFINITION_REQUEST: &str = "zd";
    /// `ZD` — zone definition report.
    pub const ZONE_DEFINITION_REPORT: &str = "ZD";
    /// `zp` — request zone partition assignments.
    pub const ZONE_PARTITION_REQUEST: &str = "zp";
    /// `ZP` — zone partition report.
    pub const ZONE_PARTITION_REPORT: &str = "ZP";
    /// `zv` — request one analog zone's voltage.
    pub const ZONE_VOLTAGE_REQUEST: &str = "zv";
    /// `ZV` — zone voltage reply.
    pub const ZONE_VOLTAGE_REPLY: &str = "ZV";
    /// `zb` — zone bypass toggle request.
    pub const ZONE_BYPASS_REQUEST: &str = "zb";
    /// `ZB` — zone bypass state reply.
    pub const ZONE_BYPASS_REPLY: &str = "ZB";
    /// `cs` — request control output status.
    pub const OUTPUT_STATUS_REQUEST: &str = "cs";
    /// `CS` — control output status report.
    pub const OUTPUT_STATUS_REPORT: &str = "CS";
    /// `CC` — unsolicited output change update.
    pub const OUTPUT_UPDATE: &str = "CC";
    /// `cn` — turn a control output on.
    pub const OUTPUT_ON: &str = "cn";
    /// `cf` — turn a control output off.
    pub const OUTPUT_OFF: &str = "cf";
    /// `ct` — toggle a control output.
    pub const OUTPUT_TOGGLE: &str = "ct";
    /// `as` — request area arming status.
    pub const ARMING_STATUS_REQUEST: &str = "as";
    /// `AS` — arming status report.
    pub const ARMING_STATUS_REPORT: &str = "AS";
    /// `EE` — unsolicited entry/exit timer data.
    pub const ENTRY_EXIT_TIMER: &str = "EE";
    /// `AM` — unsolicited alarm memory update.
    pub const ALARM_MEMORY: &str = "AM";
    /// `ka` — request keypad area assignments.
    pub const KEYPAD_AREA_REQUEST: &str = "ka";
    /// `KA` — keypad area reply.
    pub const KEYPAD_AREA_REPLY: &str = "KA";
    /// `kc` — request keypad function-key illumination.
    pub const KEYPAD_STATUS_REQUEST: &str = "kc";
    /// `KC` — keypad key change update (reply and unsolicited).
    pub const KEYPAD_STATUS_REPORT: &str = "KC";
    /// `IC` — unsolicited user-code-entered notification.
    pub const USER_CODE_ENTERED: &str = "IC";
    /// `sd` — request an ASCII text description.
    pub const DESCRIPTION_REQUEST: &str = "sd";
    /// `SD` — text description reply.
    pub const DESCRIPTION_REPLY: &str = "SD";
    /// `vn` — request M1 version numbers.
    pub const VERSION_REQUEST: &str = "vn";
    /// `VN` — version reply.
    pub const VERSION_REPLY: &str = "VN";
    /// `ss` — request system trouble status.
    pub const TROUBLE_STATUS_REQUEST: &str = "ss";
    /// `SS` — system trouble status reply.
    pub const TROUBLE_STATUS_REPLY: &str = "SS";
    /// `tn` — activate a task.
    pub const TASK_ACTIVATE: &str = "tn";
    /// `TC` — unsolicited task change update.
    pub const TASK_UPDATE: &str = "TC";
    /// `IE` — installer program mode exited.
    pub const INSTALLER_EXIT: &str = "IE";
    /// `RP` — ELKRP installer software connected.
    pub const INSTALLER_CONNECT: &str = "RP";
    /// `XK` — M1XEP heartbeat ping; consumed silently.
    pub const ETHERNET_TEST: &str = "XK";
}

/// Decode one payload character in the hex substrate
/// (`'0'..'9'`, `'A'..'F'` → 0..15). Used for fields whose values fit
/// a nibble, such as zone status and output flags.
pub fn hex_digit(c: char) -> Option<u8> {
    c.to_digit(16).map(|v| v as u8)
}

/// Decode one payload character in the ASCII-offset substrate
/// (`value = char - '0'`, so `':'` is 10, `';'` is 11 and so on). Used
/// for fields whose range exceeds 15, such as zone definitions.
pub fn offset_digit(c: char) -> Option<u8> {
    let v = (c as u32).checked_sub('0' as u32)?;
    u8::try_from(v).ok()
}

/// Fetch and hex-decode the payload character at `idx`.
pub fn payload_hex_digit(payload: &str, idx: usize) -> Option<u8> {
    payload.chars().nth(idx).and_then(hex_digit)
}

/// Fetch and offset-decode the payload character at `idx`.
pub fn payload_offset_digit(payload: &str, idx: usize) -> Option<u8> {
    payload.chars().nth(idx).and_then(offset_digit)
}

/// Parse a fixed-width decimal field starting at `idx`.
pub fn payload_number(payload: &str, idx: usize, width: usize) -> Option<u16> {
    payload.get(idx..idx + width)?.parse().ok()
}

/// Parse an `SD` reply payload into its description type code, entity
/// number and 16-character name field.
pub fn parse_description_reply(payload: &str) -> Option<(u8, u16, String)> {
    let desc_type = payload_number(payload, 0, 2)? as u8;
    let number = payload_number(payload, 2, 3)?;
    let name = payload.get(5..).unwrap_or("").chars().take(16).collect();
    Some((desc_type, number, name))
}

/// Arming level for the `a0`..`a:` command family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmLevel {
    Disarm,
    Away,
    Stay,
    StayInstant,
    Night,
    NightInstant,
    Vacation,
    NextAway,
    NextStay,
    ForceAway,
    ForceStay,
}

impl ArmLevel {
    /// The request kind code for this level. The level is encoded in
    /// the kind itself, not the payload; `ForceStay` uses the `:`
    /// character that follows `9` in ASCII.
    pub fn kind(self) -> &'static str {
        match self {
            Self::Disarm => "a0",
            Self::Away => "a1",
            Self::Stay => "a2",
            Self::StayInstant => "a3",
            Self::Night => "a4",
            Self::NightInstant => "a5",
            Self::Vacation => "a6",
            Self::NextAway => "a7",
            Self::NextStay => "a8",
            Self::ForceAway => "a9",
            Self::ForceStay => "a:",
        }
    }
}

/// Outbound command messages.
///
/// Each variant knows its kind code and fixed payload field widths;
/// [`Command::to_message`] is the single place request payloads are
/// assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Arm or disarm an area with a user code.
    Arm {
        level: ArmLevel,
        area: u8,
        code: String,
    },
    ZoneStatus,
    AlarmByZone,
    ZoneDefinitions,
    ZonePartitions,
    /// Query the analog voltage of a single zone.
    ZoneVoltage { zone: u16 },
    /// Toggle bypass on a zone (zone 0 = bypass all violated zones).
    ZoneBypass { zone: u16, area: u8, code: String },
    OutputStatus,
    /// Turn an output on for `seconds` (0 = latched on).
    OutputOn { output: u16, seconds: u32 },
    OutputOff { output: u16 },
    OutputToggle { output: u16 },
    ArmingStatus,
    KeypadAreas,
    KeypadStatus { keypad: u8 },
    /// Look up a text description by category and number.
    Description {
        desc_type: crate::constants::DescriptionType,
        number: u16,
    },
    Version,
    TroubleStatus,
    ActivateTask { task: u16 },
}

impl Command {
    /// Build the wire message for this command.
    pub fn to_message(&self) -> Message {
        match self {
            Command::Arm { level, area, code } => {
                Message::new(level.kind(), &format!("{}{:0>6}", area, code))
            }
            Command::ZoneStatus => Message::new(kind::ZONE_STATUS_REQUEST, ""),
            Command::AlarmByZone => Message::new(kind::ALARM_BY_ZONE_REQUEST, ""),
            Command::ZoneDefinitions => Message::new(kind::ZONE_DEFINITION_REQUEST, ""),
            Command::ZonePartitions => Message::new(kind::ZONE_PARTITION_REQUEST, ""),
            Command::ZoneVoltage { zone } => {
                Message::new(kind::ZONE_VOLTAGE_REQUEST, &format!("{zone:03}"))
            }
            Command::ZoneBypass { zone, area, code } => Message::new(
                kind::ZONE_BYPASS_REQUEST,
                &format!("{zone:03}{area}{code:0>6}"),
            ),
            Command::OutputStatus => Message::new(kind::OUTPUT_STATUS_REQUEST, ""),
            Command::OutputOn { output, seconds } => {
                Message::new(kind::OUTPUT_ON, &format!("{output:03}{seconds:05}"))
            }
            Command::OutputOff { output } => Message::new(kind::OUTPUT_OFF, &format!("{output:03}")),
            Command::OutputToggle { output } => {
                Message::new(kind::OUTPUT_TOGGLE, &format!("{output:03}"))
            }
            Command::ArmingStatus => Message::new(kind::ARMING_STATUS_REQUEST, ""),
            Command::KeypadAreas => Message::new(kind::KEYPAD_AREA_REQUEST, ""),
            Command::KeypadStatus { keypad } => {
                Message::new(kind::KEYPAD_STATUS_REQUEST, &format!("{keypad:02}"))
            }
            Command::Description { desc_type, number } => Message::new(
                kind::DESCRIPTION_REQUEST,
                &format!("{:02}{:03}", desc_type.code(), number),
            ),
            Command::Version => Message::new(kind::VERSION_REQUEST, ""),
            Command::TroubleStatus => Message::new(kind::TROUBLE_STATUS_REQUEST, ""),
            Command::ActivateTask { task } => {
                Message::new(kind::TASK_ACTIVATE, &format!("{task:03}"))
            }
        }
    }

    /// The reply kind this request is answered with, if any.
    /// Arm and output control commands are fire-and-forget; state
    /// changes come back as unsolicited updates.
    pub fn reply_kind(&self) -> Option<&'static str> {
        match self {
            Command::ZoneStatus => Some(kind::ZONE_STATUS_REPORT),
            Command::AlarmByZone => Some(kind::ALARM_BY_ZONE_REPORT),
            Command::ZoneDefinitions => Some(kind::ZONE_DEFINITION_REPORT),
            Command::ZonePartitions => Some(kind::ZONE_PARTITION_REPORT),
            Command::ZoneVoltage { .. } => Some(kind::ZONE_VOLTAGE_REPLY),
            Command::ZoneBypass { .. } => Some(kind::ZONE_BYPASS_REPLY),
            Command::OutputStatus => Some(kind::OUTPUT_STATUS_REPORT),
            Command::ArmingStatus => Some(kind::ARMING_STATUS_REPORT),
            Command::KeypadAreas => Some(kind::KEYPAD_AREA_REPLY),
            Command::KeypadStatus { .. } => Some(kind::KEYPAD_STATUS_REPORT),
            Command::Description { .. } => Some(kind::DESCRIPTION_REPLY),
            Command::Version => Some(kind::VERSION_REPLY),
            Command::TroubleStatus => Some(kind::TROUBLE_STATUS_REPLY),
            Command::Arm { .. }
            | Command::OutputOn { .. }
            | Command::OutputOff { .. }
            | Command::OutputToggle { .. }
            | Command::ActivateTask { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DescriptionType;

    #[test]
    fn test_digit_substrates() {
        assert_eq!(hex_digit('0'), Some(0));
        assert_eq!(hex_digit('9'), Some(9));
        assert_eq!(hex_digit('A'), Some(10));
        assert_eq!(hex_digit('F'), Some(15));
        assert_eq!(hex_digit('-'), None);

        assert_eq!(offset_digit('0'), Some(0));
        assert_eq!(offset_digit(':'), Some(10));
        assert_eq!(offset_digit(';'), Some(11));
        // 'T' = '0' + 36, the highest zone definition.
        assert_eq!(offset_digit('T'), Some(36));
    }

    #[test]
    fn test_payload_number() {
        assert_eq!(payload_number("016230", 0, 3), Some(16));
        assert_eq!(payload_number("016230", 3, 2), Some(23));
        assert_eq!(payload_number("01", 0, 3), None);
        assert_eq!(payload_number("0x6", 0, 3), None);
    }

    #[test]
    fn test_parse_description_reply() {
        let (desc_type, number, name) = parse_description_reply("00005Front Door      ").unwrap();
        assert_eq!(desc_type, 0);
        assert_eq!(number, 5);
        assert_eq!(name, "Front Door      ");
        assert!(parse_description_reply("00").is_none());
    }

    #[test]
    fn test_arm_command_payload() {
        let msg = Command::Arm {
            level: ArmLevel::Away,
            area: 1,
            code: "1234".into(),
        }
        .to_message();
        assert_eq!(msg.kind, "a1");
        assert_eq!(msg.payload, "1001234");
    }

    #[test]
    fn test_force_stay_kind() {
        assert_eq!(ArmLevel::ForceStay.kind(), "a:");
    }

    #[test]
    fn test_output_command_widths() {
        let msg = Command::OutputOn {
            output: 3,
            seconds: 10,
        }
        .to_message();
        assert_eq!(msg.kind, "cn");
        assert_eq!(msg.payload, "00300010");

        let msg = Command::OutputOff { output: 208 }.to_message();
        assert_eq!(msg.payload, "208");
    }

    #[test]
    fn test_description_request_payload() {
        let msg = Command::Description {
            desc_type: DescriptionType::OutputName,
            number: 7,
        }
        .to_message();
        assert_eq!(msg.kind, "sd");
        assert_eq!(msg.payload, "04007");
    }

    #[test]
    fn test_zone_bypass_payload() {
        let msg = Command::ZoneBypass {
            zone: 5,
            area: 1,
            code: "1234".into(),
        }
        .to_message();
        assert_eq!(msg.payload, "0051001234");
    }

    #[test]
    fn test_request_reply_pairing() {
        assert_eq!(Command::ZoneStatus.reply_kind(), Some("ZS"));
        assert_eq!(Command::ArmingStatus.reply_kind(), Some("AS"));
        assert_eq!(
            Command::KeypadStatus { keypad: 1 }.reply_kind(),
            Some("KC")
        );
        assert_eq!(
            Command::Arm {
                level: ArmLevel::Disarm,
                area: 1,
                code: "1".into()
            }
            .reply_kind(),
            None
        );
    }
}
