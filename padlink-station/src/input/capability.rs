use padlink_api::Control;

/// Hardware layout of a gamepad, picked when the device attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    XInput,
    XInputWindows,
    DirectInput,
    /// Linux event codes
    Evdev,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSpec {
    pub control: Control,
    pub min: f32,
    pub max: f32,
    /// Rescale to [0, 1] instead of [-1, 1]
    pub scaled: bool,
}

impl AxisSpec {
    const fn stick(control: Control) -> Self {
        Self { control, min: -1.0, max: 1.0, scaled: false }
    }

    const fn trigger(control: Control) -> Self {
        Self { control, min: -1.0, max: 1.0, scaled: true }
    }

    pub fn normalize(&self, raw: f32) -> f32 {
        let range = self.max - self.min;
        if range <= 0.0 {
            return 0.0;
        }
        let unit = ((raw - self.min) / range).clamp(0.0, 1.0);
        if self.scaled { unit } else { unit * 2.0 - 1.0 }
    }
}

/// What an absolute-axis code drives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbsTarget {
    Axis(AxisSpec),
    Hat(Control),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityMap {
    layout: Layout,
}

const EVDEV_STICK_MIN: f32 = -32768.0;
const EVDEV_STICK_MAX: f32 = 32767.0;
const EVDEV_TRIGGER_MAX: f32 = 255.0;

impl CapabilityMap {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Six axes means an XInput pad; everything else is treated as DirectInput.
    pub fn detect(axis_count: usize, windows: bool) -> Self {
        let layout = match (axis_count, windows) {
            (6, true) => Layout::XInputWindows,
            (6, false) => Layout::XInput,
            _ => Layout::DirectInput,
        };
        Self { layout }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn button(&self, code: u16) -> Option<Control> {
        use Control::*;

        match self.layout {
            Layout::XInput | Layout::XInputWindows => match code {
                0 => Some(ButtonA),
                1 => Some(ButtonB),
                2 => Some(ButtonX),
                3 => Some(ButtonY),
                4 => Some(LeftBumper),
                5 => Some(RightBumper),
                6 => Some(Select),
                7 => Some(Start),
                _ => None,
            },
            Layout::DirectInput => match code {
                0 => Some(ButtonX),
                1 => Some(ButtonA),
                2 => Some(ButtonB),
                3 => Some(ButtonY),
                4 => Some(LeftBumper),
                5 => Some(RightBumper),
                6 => Some(LeftTrigger),
                7 => Some(RightTrigger),
                8 => Some(Select),
                9 => Some(Start),
                _ => None,
            },
            Layout::Evdev => match code {
                304 => Some(ButtonA),
                305 => Some(ButtonB),
                307 => Some(ButtonX),
                308 => Some(ButtonY),
                310 => Some(LeftBumper),
                311 => Some(RightBumper),
                314 => Some(Select),
                315 => Some(Start),
                317 => Some(LeftThumb),
                318 => Some(RightThumb),
                _ => None,
            },
        }
    }

    pub fn abs(&self, code: u16) -> Option<AbsTarget> {
        use Control::*;

        let axis = |spec| Some(AbsTarget::Axis(spec));
        match self.layout {
            Layout::XInput => match code {
                0 => axis(AxisSpec::stick(LeftJoystickX)),
                1 => axis(AxisSpec::stick(LeftJoystickY)),
                2 => axis(AxisSpec::trigger(LeftTrigger)),
                3 => axis(AxisSpec::stick(RightJoystickX)),
                4 => axis(AxisSpec::stick(RightJoystickY)),
                5 => axis(AxisSpec::trigger(RightTrigger)),
                _ => None,
            },
            Layout::XInputWindows => match code {
                0 => axis(AxisSpec::stick(LeftJoystickX)),
                1 => axis(AxisSpec::stick(LeftJoystickY)),
                2 => axis(AxisSpec::stick(RightJoystickX)),
                3 => axis(AxisSpec::stick(RightJoystickY)),
                4 => axis(AxisSpec::trigger(LeftTrigger)),
                5 => axis(AxisSpec::trigger(RightTrigger)),
                _ => None,
            },
            Layout::DirectInput => match code {
                0 => axis(AxisSpec::stick(LeftJoystickX)),
                1 => axis(AxisSpec::stick(LeftJoystickY)),
                2 => axis(AxisSpec::stick(RightJoystickX)),
                3 => axis(AxisSpec::stick(RightJoystickY)),
                _ => None,
            },
            Layout::Evdev => {
                let stick = |control| AxisSpec {
                    control,
                    min: EVDEV_STICK_MIN,
                    max: EVDEV_STICK_MAX,
                    scaled: false,
                };
                let trigger = |control| AxisSpec {
                    control,
                    min: 0.0,
                    max: EVDEV_TRIGGER_MAX,
                    scaled: true,
                };
                match code {
                    0 => axis(stick(LeftJoystickX)),
                    1 => axis(stick(LeftJoystickY)),
                    2 => axis(trigger(LeftTrigger)),
                    3 => axis(stick(RightJoystickX)),
                    4 => axis(stick(RightJoystickY)),
                    5 => axis(trigger(RightTrigger)),
                    16 => Some(AbsTarget::Hat(HatX)),
                    17 => Some(AbsTarget::Hat(HatY)),
                    _ => None,
                }
            }
        }
    }

    /// Hat axes reported by index: 0 is X, 1 is Y.
    pub fn hat(&self, index: u16) -> Option<Control> {
        match index {
            0 => Some(Control::HatX),
            1 => Some(Control::HatY),
            _ => None,
        }
    }
}
