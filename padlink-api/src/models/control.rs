use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    /// Digital button, 0 or 1
    Button,
    /// Analog axis normalised to [-1.0, 1.0]
    Axis,
    /// Directional hat, -1, 0 or 1
    Hat,
    /// Anything outside the canonical table
    Custom,
}

/// Canonical controls known to both ends of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    ButtonA,
    ButtonB,
    ButtonX,
    ButtonY,
    LeftBumper,
    RightBumper,
    Select,
    Start,
    LeftThumb,
    RightThumb,
    LeftJoystickX,
    LeftJoystickY,
    LeftTrigger,
    RightJoystickX,
    RightJoystickY,
    RightTrigger,
    HatX,
    HatY,
}

impl Control {
    pub const ALL: [Control; 18] = [
        Control::ButtonA,
        Control::ButtonB,
        Control::ButtonX,
        Control::ButtonY,
        Control::LeftBumper,
        Control::RightBumper,
        Control::Select,
        Control::Start,
        Control::LeftThumb,
        Control::RightThumb,
        Control::LeftJoystickX,
        Control::LeftJoystickY,
        Control::LeftTrigger,
        Control::RightJoystickX,
        Control::RightJoystickY,
        Control::RightTrigger,
        Control::HatX,
        Control::HatY,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Control::ButtonA => "ButtonA",
            Control::ButtonB => "ButtonB",
            Control::ButtonX => "ButtonX",
            Control::ButtonY => "ButtonY",
            Control::LeftBumper => "LeftBumper",
            Control::RightBumper => "RightBumper",
            Control::Select => "Select",
            Control::Start => "Start",
            Control::LeftThumb => "LeftThumb",
            Control::RightThumb => "RightThumb",
            Control::LeftJoystickX => "LeftJoystickX",
            Control::LeftJoystickY => "LeftJoystickY",
            Control::LeftTrigger => "LeftTrigger",
            Control::RightJoystickX => "RightJoystickX",
            Control::RightJoystickY => "RightJoystickY",
            Control::RightTrigger => "RightTrigger",
            Control::HatX => "HatX",
            Control::HatY => "HatY",
        }
    }

    /// Short code used on the wire.
    pub fn abbr(&self) -> &'static str {
        match self {
            Control::ButtonA => "BA",
            Control::ButtonB => "BB",
            Control::ButtonX => "BX",
            Control::ButtonY => "BY",
            Control::LeftBumper => "LB",
            Control::RightBumper => "RB",
            Control::Select => "SEL",
            Control::Start => "ST",
            Control::LeftThumb => "LTH",
            Control::RightThumb => "RTH",
            Control::LeftJoystickX => "LX",
            Control::LeftJoystickY => "LY",
            Control::LeftTrigger => "LT",
            Control::RightJoystickX => "RX",
            Control::RightJoystickY => "RY",
            Control::RightTrigger => "RT",
            Control::HatX => "HX",
            Control::HatY => "HY",
        }
    }

    pub fn kind(&self) -> ControlKind {
        match self {
            Control::LeftJoystickX
            | Control::LeftJoystickY
            | Control::LeftTrigger
            | Control::RightJoystickX
            | Control::RightJoystickY
            | Control::RightTrigger => ControlKind::Axis,
            Control::HatX | Control::HatY => ControlKind::Hat,
            _ => ControlKind::Button,
        }
    }

    pub fn from_abbr(abbr: &str) -> Option<Control> {
        Self::ALL.into_iter().find(|c| c.abbr() == abbr)
    }

    pub fn from_name(name: &str) -> Option<Control> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Control {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlValue {
    Number(f32),
    Text(String),
}

impl ControlValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ControlValue::Number(v) => Some(*v),
            ControlValue::Text(s) => s.parse().ok(),
        }
    }

    /// Button and hat values are small integers.
    pub fn as_i32(&self) -> Option<i32> {
        self.as_f32().map(|v| v.round() as i32)
    }
}

/// Canonical unit of operator input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub name: String,
    pub kind: ControlKind,
    pub value: ControlValue,
}

impl ControlEvent {
    pub fn axis(control: Control, value: f32) -> Self {
        Self {
            name: control.name().into(),
            kind: ControlKind::Axis,
            value: ControlValue::Number(value.clamp(-1.0, 1.0)),
        }
    }

    pub fn button(control: Control, pressed: bool) -> Self {
        Self {
            name: control.name().into(),
            kind: ControlKind::Button,
            value: ControlValue::Number(if pressed { 1.0 } else { 0.0 }),
        }
    }

    pub fn hat(control: Control, value: i32) -> Self {
        Self {
            name: control.name().into(),
            kind: ControlKind::Hat,
            value: ControlValue::Number(value.clamp(-1, 1) as f32),
        }
    }

    pub fn custom(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ControlKind::Custom,
            value: ControlValue::Text(value.into()),
        }
    }

    pub fn control(&self) -> Option<Control> {
        Control::from_name(&self.name)
    }

    /// Buttons count as pressed when their value is non-zero.
    pub fn is_pressed(&self) -> bool {
        self.value.as_i32().is_some_and(|v| v != 0)
    }
}
