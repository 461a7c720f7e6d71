//! Keypads: the panel's wall consoles.

use chrono::{DateTime, Utc};

use crate::codec::Message;
use crate::protocol::{payload_hex_digit, payload_number, payload_offset_digit};

/// Key codes reported in the `KC` update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeypadKey {
    #[default]
    None,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Digit0,
    Star,
    Pound,
    F1,
    F2,
    F3,
    F4,
    Stay,
    Exit,
    Chime,
    Bypass,
    Elk,
    Down,
    Up,
    Right,
    Left,
    F5,
    F6,
    DataKeyMode,
}

impl KeypadKey {
    pub fn from_code(v: u16) -> Self {
        match v {
            1 => Self::Digit1,
            2 => Self::Digit2,
            3 => Self::Digit3,
            4 => Self::Digit4,
            5 => Self::Digit5,
            6 => Self::Digit6,
            7 => Self::Digit7,
            8 => Self::Digit8,
            9 => Self::Digit9,
            10 => Self::Digit0,
            11 => Self::Star,
            12 => Self::Pound,
            13 => Self::F1,
            14 => Self::F2,
            15 => Self::F3,
            16 => Self::F4,
            17 => Self::Stay,
            18 => Self::Exit,
            19 => Self::Chime,
            20 => Self::Bypass,
            21 => Self::Elk,
            22 => Self::Down,
            23 => Self::Up,
            24 => Self::Right,
            25 => Self::Left,
            26 => Self::F5,
            27 => Self::F6,
            28 => Self::DataKeyMode,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Digit1 => "1",
            Self::Digit2 => "2",
            Self::Digit3 => "3",
            Self::Digit4 => "4",
            Self::Digit5 => "5",
            Self::Digit6 => "6",
            Self::Digit7 => "7",
            Self::Digit8 => "8",
            Self::Digit9 => "9",
            Self::Digit0 => "0",
            Self::Star => "*",
            Self::Pound => "#",
            Self::F1 => "F1",
            Self::F2 => "F2",
            Self::F3 => "F3",
            Self::F4 => "F4",
            Self::Stay => "Stay",
            Self::Exit => "Exit",
            Self::Chime => "Chime",
            Self::Bypass => "Bypass",
            Self::Elk => "Elk",
            Self::Down => "Down",
            Self::Up => "Up",
            Self::Right => "Right",
            Self::Left => "Left",
            Self::F5 => "F5",
            Self::F6 => "F6",
            Self::DataKeyMode => "Data Entered",
        }
    }
}

/// A single keypad.
#[derive(Debug, Clone)]
pub struct Keypad {
    number: u8,
    area: u8,
    last_pressed: KeypadKey,
    illumination: [u8; 6],
    code_bypass: bool,
    description: String,
    last_updated_at: Option<DateTime<Utc>>,
}

impl Keypad {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            area: 0,
            last_pressed: KeypadKey::default(),
            illumination: [0; 6],
            code_bypass: false,
            description: String::new(),
            last_updated_at: None,
        }
    }

    /// `KA` reply: one offset digit per keypad with the assigned area.
    pub(crate) fn unpack_event_keypad_area_reply(&mut self, msg: &Message) -> bool {
        let Some(area) = payload_offset_digit(&msg.payload, usize::from(self.number) - 1) else {
            return false;
        };
        if self.area == area {
            return false;
        }
        self.area = area;
        self.touch();
        true
    }

    /// `KC` report: keypad(2), key(2), six illumination digits, then a
    /// code-bypass flag. The trailing per-area chime block is decoded
    /// by the areas, not here.
    pub(crate) fn unpack_event_keypad_status_report(&mut self, msg: &Message) -> bool {
        let Some(key) = payload_number(&msg.payload, 2, 2) else {
            return false;
        };
        let key = KeypadKey::from_code(key);

        let mut illumination = [0u8; 6];
        for (i, slot) in illumination.iter_mut().enumerate() {
            let Some(v) = payload_hex_digit(&msg.payload, 4 + i) else {
                return false;
            };
            *slot = v;
        }
        let code_bypass = msg.payload.chars().nth(10) == Some('1');

        if self.last_pressed == key
            && self.illumination == illumination
            && self.code_bypass == code_bypass
        {
            return false;
        }
        self.last_pressed = key;
        self.illumination = illumination;
        self.code_bypass = code_bypass;
        self.touch();
        true
    }

    /// `SD` reply: install the keypad's programmed name.
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

    /// The area this keypad is assigned to (0 = unassigned).
    pub fn area(&self) -> u8 {
        self.area
    }

    pub fn last_pressed(&self) -> KeypadKey {
        self.last_pressed
    }

    /// Function-key illumination levels, keys F1-F6.
    pub fn illumination(&self) -> [u8; 6] {
        self.illumination
    }

    /// Whether a bypass code is awaited at this keypad.
    pub fn code_bypass(&self) -> bool {
        self.code_bypass
    }

    /// Programmed name, or `"Keypad N"` when none is set.
    pub fn description(&self) -> String {
        if self.description.is_empty() {
            format!("Keypad {}", self.number)
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

    #[test]
    fn test_area_assignment() {
        let mut keypad = Keypad::new(2);
        let msg = Message::new("KA", "0100000000000000");
        assert!(keypad.unpack_event_keypad_area_reply(&msg));
        assert_eq!(keypad.area(), 1);
        assert!(!keypad.unpack_event_keypad_area_reply(&msg));
    }

    #[test]
    fn test_status_report_decodes_key_and_illumination() {
        let mut keypad = Keypad::new(1);
        // Keypad 01, Stay key (17), F1 lit, bypass pending.
        let msg = Message::new("KC", "0117100000100000000");
        assert!(keypad.unpack_event_keypad_status_report(&msg));
        assert_eq!(keypad.last_pressed(), KeypadKey::Stay);
        assert_eq!(keypad.illumination(), [1, 0, 0, 0, 0, 0]);
        assert!(keypad.code_bypass());
    }

    #[test]
    fn test_repeated_report_is_noop() {
        let mut keypad = Keypad::new(1);
        let msg = Message::new("KC", "0100000000000000000");
        // The all-zero report matches the zero-initialized keypad.
        assert!(!keypad.unpack_event_keypad_status_report(&msg));
        assert!(keypad.last_updated_at().is_none());
    }

    #[test]
    fn test_key_code_labels() {
        assert_eq!(KeypadKey::from_code(11).as_str(), "*");
        assert_eq!(KeypadKey::from_code(28), KeypadKey::DataKeyMode);
        assert_eq!(KeypadKey::from_code(99), KeypadKey::None);
    }
}
