use std::collections::HashMap;
use std::fmt;

use crate::models::{Control, ControlEvent, ControlKind, ControlValue};

use super::READ_TIMEOUT;
use super::error::CodecError;

/// Axis values travel with two decimals.
const AXIS_SCALE: f32 = 100.0;

/// Rate limit for axis frames.
///
/// Duplicate suppression is unconditional. On top of it, the last decimal
/// digit of the quantised value must be a multiple of `factor`, which bounds
/// the packet rate of a moving stick. A factor of 2 halves the update rate at
/// the cost of 0.02 effective resolution; 0 or 1 turns the digit rule off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub factor: u32,
}

impl ThrottlePolicy {
    pub fn disabled() -> Self {
        Self { factor: 1 }
    }

    fn admits(&self, hundredths: i32) -> bool {
        if self.factor <= 1 {
            return true;
        }
        (hundredths.unsigned_abs() % 10) % self.factor == 0
    }
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self { factor: 2 }
    }
}

/// One encoded command line, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame(String);

impl WireFrame {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WireFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.trim_end())
    }
}

/// Decoded command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Event(ControlEvent),
    ReadTimeout,
}

/// Encoder state for one link. Keeps the last value sent per axis.
#[derive(Debug, Default)]
pub struct Codec {
    policy: ThrottlePolicy,
    last_sent: HashMap<String, i32>,
}

impl Codec {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            last_sent: HashMap::new(),
        }
    }

    pub fn policy(&self) -> ThrottlePolicy {
        self.policy
    }

    /// Forgets what was sent so the next value of every axis goes out.
    pub fn reset(&mut self) {
        self.last_sent.clear();
    }

    /// Encodes `event`, or returns `None` when the axis throttle suppresses it.
    pub fn encode(&mut self, event: &ControlEvent) -> Option<WireFrame> {
        let abbr = Control::from_name(&event.name)
            .map(|c| c.abbr())
            .unwrap_or(event.name.as_str());

        let value = match event.kind {
            ControlKind::Axis => {
                let Some(raw) = event.value.as_f32() else {
                    tracing::debug!("Dropping non-numeric axis value for {}", event.name);
                    return None;
                };
                let hundredths = (raw.clamp(-1.0, 1.0) * AXIS_SCALE).round() as i32;

                if self.last_sent.get(&event.name) == Some(&hundredths) {
                    return None;
                }
                if !self.policy.admits(hundredths) {
                    return None;
                }
                self.last_sent.insert(event.name.clone(), hundredths);

                format!("{:.2}", hundredths as f32 / AXIS_SCALE)
            }
            ControlKind::Button | ControlKind::Hat => match event.value.as_i32() {
                Some(v) => v.to_string(),
                None => {
                    tracing::debug!("Dropping non-numeric value for {}", event.name);
                    return None;
                }
            },
            ControlKind::Custom => match &event.value {
                ControlValue::Text(s) => s.clone(),
                ControlValue::Number(n) => n.to_string(),
            },
        };

        Some(WireFrame(format!("EV:{}:{}\n", abbr, value)))
    }

    /// Decodes one frame (terminator optional).
    pub fn decode(frame: &[u8]) -> Result<Command, CodecError> {
        let text = std::str::from_utf8(frame).map_err(|_| CodecError::NotText)?.trim();
        if text.is_empty() {
            return Err(CodecError::EmptyFrame);
        }

        let mut tokens = text.split(':');
        let command = tokens.next().unwrap_or_default();
        match command {
            "EV" | "Event" => {}
            READ_TIMEOUT => return Ok(Command::ReadTimeout),
            other => return Err(CodecError::UnsupportedCommand(other.into())),
        }

        let token = tokens
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CodecError::MissingValue(command.into()))?;
        let args: Vec<&str> = tokens.collect();

        let Some(control) = Control::from_abbr(token).or_else(|| Control::from_name(token)) else {
            // Unknown controls pass through under their raw token.
            return Ok(Command::Event(ControlEvent::custom(token, args.join(":"))));
        };

        let raw = args
            .first()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CodecError::MissingValue(control.name().into()))?;
        let invalid = || CodecError::InvalidValue {
            control: control.name().into(),
            value: raw.into(),
        };

        let number: f32 = raw.parse().map_err(|_| invalid())?;
        if !number.is_finite() {
            return Err(invalid());
        }

        let event = match control.kind() {
            ControlKind::Axis => ControlEvent::axis(control, number),
            ControlKind::Hat => ControlEvent::hat(control, number.round() as i32),
            _ => ControlEvent {
                name: control.name().into(),
                kind: ControlKind::Button,
                value: ControlValue::Number(number.round()),
            },
        };

        Ok(Command::Event(event))
    }
}
