//! Control outputs: the panel's relay and voltage outputs.

use chrono::{DateTime, Utc};

use crate::codec::Message;
use crate::protocol::payload_hex_digit;

/// A single control output.
#[derive(Debug, Clone)]
pub struct Output {
    number: u16,
    on: bool,
    description: String,
    last_updated_at: Option<DateTime<Utc>>,
}

impl Output {
    pub fn new(number: u16) -> Self {
        Self {
            number,
            on: false,
            description: String::new(),
            last_updated_at: None,
        }
    }

    /// `CS` report: one digit per output, nonzero = on.
    pub(crate) fn unpack_event_output_status_report(&mut self, msg: &Message) -> bool {
        let Some(digit) = payload_hex_digit(&msg.payload, usize::from(self.number) - 1) else {
            return false;
        };
        self.apply(digit != 0)
    }

    /// `CC` update: 3-digit output number then a single state digit.
    pub(crate) fn unpack_event_output_update(&mut self, msg: &Message) -> bool {
        let Some(digit) = payload_hex_digit(&msg.payload, 3) else {
            return false;
        };
        self.apply(digit != 0)
    }

    fn apply(&mut self, on: bool) -> bool {
        if self.on == on {
            return false;
        }
        self.on = on;
        self.last_updated_at = Some(Utc::now());
        true
    }

    /// `SD` reply: install the output's programmed name.
    pub(crate) fn unpack_event_description(&mut self, name: &str) -> bool {
        let name = name.trim();
        if self.description == name {
            return false;
        }
        self.description = name.to_string();
        self.last_updated_at = Some(Utc::now());
        true
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Programmed name, or `"Output N"` when none is set.
    pub fn description(&self) -> String {
        if self.description.is_empty() {
            format!("Output {}", self.number)
        } else {
            self.description.clone()
        }
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated_at
    }
}
