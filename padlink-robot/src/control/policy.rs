use padlink_api::{Control, ControlEvent};

use crate::configs::settings::{Drive, DriveProfile};

use super::ControlState;

/// Per-chassis behavior: how events change intent and how intent becomes wheel efforts.
pub trait ActuationPolicy: Send {
    /// Application name reported to the registry.
    fn application(&self) -> &'static str;

    fn handle_event(&self, state: &mut ControlState, event: &ControlEvent);

    /// Efforts in [-1, 1], one per wheel.
    fn mix(&self, state: &ControlState) -> Vec<f32>;

    fn wheel_count(&self) -> usize {
        2
    }

    /// Whether the gyro heading-hold applies to this chassis.
    fn heading_hold(&self) -> bool {
        true
    }

    /// Efforts that drive straight at `speed` while steering by `correction`.
    fn correct_heading(&self, speed: f32, correction: f32) -> Vec<f32> {
        vec![speed - correction, speed + correction]
    }
}

pub fn create_policy(drive: &Drive) -> Box<dyn ActuationPolicy> {
    let arcade = Arcade {
        turn_damping: drive.turn_damping,
    };
    match drive.profile {
        DriveProfile::Arcade => Box::new(arcade),
        DriveProfile::Mecanum => Box::new(Mecanum { buttons: arcade }),
        DriveProfile::ServoTriggers => Box::new(ServoTriggers { arcade }),
    }
}

fn axis_value(event: &ControlEvent) -> Option<f32> {
    let value = event.value.as_f32();
    if value.is_none() {
        tracing::debug!("Ignoring non-numeric value for {}", event.name);
    }
    value
}

/// Two-wheel differential drive with servo and assist buttons.
#[derive(Debug, Clone, Copy)]
pub struct Arcade {
    pub turn_damping: f32,
}

impl ActuationPolicy for Arcade {
    fn application(&self) -> &'static str {
        "XRP_Base"
    }

    fn handle_event(&self, state: &mut ControlState, event: &ControlEvent) {
        let Some(control) = event.control() else {
            tracing::debug!("Ignoring unknown control {}", event.name);
            return;
        };

        match control {
            Control::LeftJoystickY => {
                if let Some(v) = axis_value(event) {
                    state.speed = -v;
                }
            }
            Control::LeftJoystickX | Control::RightJoystickX => {
                let Some(v) = axis_value(event) else {
                    return;
                };
                let damped = if state.speed != 0.0 { v * self.turn_damping } else { v };
                // Reversing flips the turn so the nose follows the stick.
                let turn = if state.speed < 0.0 { damped } else { -damped };
                state.set_turn(turn);
            }
            Control::LeftBumper if event.is_pressed() => state.set_selected_angle(state.min_angle),
            Control::RightBumper if event.is_pressed() => state.set_selected_angle(state.max_angle),
            Control::ButtonA if event.is_pressed() => state.select_servo(0),
            Control::ButtonB if event.is_pressed() => state.select_servo(1),
            Control::ButtonY if event.is_pressed() => {
                state.assist.imu_assist = !state.assist.imu_assist;
                tracing::info!("IMU assist {}", if state.assist.imu_assist { "enabled" } else { "disabled" });
            }
            Control::ButtonX if event.is_pressed() => {
                state.assist.proximity_assist = !state.assist.proximity_assist;
                tracing::info!(
                    "Proximity assist {}",
                    if state.assist.proximity_assist { "enabled" } else { "disabled" }
                );
            }
            _ => tracing::trace!("No action for {}", event.name),
        }
    }

    fn mix(&self, state: &ControlState) -> Vec<f32> {
        let scale = (state.speed.abs() + state.turn.abs()).max(1.0);
        vec![(state.speed - state.turn) / scale, (state.speed + state.turn) / scale]
    }
}

/// Four independently driven mecanum wheels: front-left, front-right, rear-left, rear-right.
#[derive(Debug, Clone, Copy)]
pub struct Mecanum {
    /// Handles the servo buttons
    pub buttons: Arcade,
}

impl ActuationPolicy for Mecanum {
    fn application(&self) -> &'static str {
        "XRP_Mecanum"
    }

    fn handle_event(&self, state: &mut ControlState, event: &ControlEvent) {
        match event.control() {
            Some(Control::LeftJoystickY) => {
                if let Some(v) = axis_value(event) {
                    state.speed = -v;
                }
            }
            Some(Control::LeftJoystickX) => {
                if let Some(v) = axis_value(event) {
                    state.set_turn(-v);
                }
            }
            Some(Control::RightJoystickX) => {
                if let Some(v) = axis_value(event) {
                    state.twist = v;
                }
            }
            // Face buttons drive lighting on this chassis, which is not modelled.
            Some(Control::ButtonA | Control::ButtonB | Control::ButtonX | Control::ButtonY) => {
                tracing::trace!("No action for {}", event.name);
            }
            _ => self.buttons.handle_event(state, event),
        }
    }

    fn mix(&self, state: &ControlState) -> Vec<f32> {
        let (s, t, w) = (state.speed, state.turn, state.twist);
        let mut efforts = [s - t + w, s + t - w, s + t + w, s - t - w];

        let max = efforts.iter().fold(0.0_f32, |max, e| max.max(e.abs()));
        if max > 1.0 {
            for effort in efforts.iter_mut() {
                *effort /= max;
            }
        }

        // Rear motors are mounted mirrored.
        vec![efforts[0], efforts[1], -efforts[2], -efforts[3]]
    }

    fn wheel_count(&self) -> usize {
        4
    }

    fn heading_hold(&self) -> bool {
        false
    }
}

/// Arcade drive where the triggers sweep the selected servo.
#[derive(Debug, Clone, Copy)]
pub struct ServoTriggers {
    pub arcade: Arcade,
}

impl ActuationPolicy for ServoTriggers {
    fn application(&self) -> &'static str {
        "XRP_BasePlusTriggers"
    }

    fn handle_event(&self, state: &mut ControlState, event: &ControlEvent) {
        let Some(current) = state.selected_angle() else {
            return self.arcade.handle_event(state, event);
        };

        match event.control() {
            // Left trigger only ever lowers the arm
            Some(Control::LeftTrigger) => {
                if let Some(v) = axis_value(event) {
                    let angle = state.max_angle - (state.max_angle * v).trunc();
                    if angle < current {
                        state.set_selected_angle(angle);
                    }
                }
            }
            // Right trigger only ever raises it
            Some(Control::RightTrigger) => {
                if let Some(v) = axis_value(event) {
                    let angle = (state.max_angle * v).trunc();
                    if angle > current {
                        state.set_selected_angle(angle);
                    }
                }
            }
            _ => self.arcade.handle_event(state, event),
        }
    }

    fn mix(&self, state: &ControlState) -> Vec<f32> {
        self.arcade.mix(state)
    }
}
