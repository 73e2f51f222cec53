use std::fmt;

use crate::configs::settings::{Assist, Servos};

pub mod assist;
pub mod pid;
pub mod policy;

pub use assist::Actuator;
pub use pid::{PdController, PdParams};
pub use policy::{ActuationPolicy, Arcade, Mecanum, ServoTriggers, create_policy};

/// Link status reported by the heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Initialized,
    WaitingForConnection,
    Connected,
    ProcessingCommand,
    WaitingForCommand,
    Disconnected,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Initialized => "Initialized",
            LinkStatus::WaitingForConnection => "Waiting For Connection",
            LinkStatus::Connected => "Connected",
            LinkStatus::ProcessingCommand => "Processing Command",
            LinkStatus::WaitingForCommand => "Waiting For Command",
            LinkStatus::Disconnected => "Disconnected",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistFlags {
    /// Heading-hold from the gyro while driving straight
    pub imu_assist: bool,
    /// Refuse forward motion near an obstacle
    pub proximity_assist: bool,
}

impl From<Assist> for AssistFlags {
    fn from(assist: Assist) -> Self {
        Self {
            imu_assist: assist.imu_assist,
            proximity_assist: assist.proximity_assist,
        }
    }
}

/// Operator intent. Written by frame processing, read by actuation.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub speed: f32,
    pub turn: f32,
    pub twist: f32,
    pub servo_angles: Vec<f32>,
    pub selected_servo: usize,
    pub assist: AssistFlags,
    /// Bumped each time turning stops; actuation re-latches its heading on change.
    pub turn_epoch: u64,
    pub min_angle: f32,
    pub max_angle: f32,
}

impl ControlState {
    pub fn new(servos: Servos, assist: Assist) -> Self {
        Self {
            speed: 0.0,
            turn: 0.0,
            twist: 0.0,
            servo_angles: vec![servos.min_angle; servos.count],
            selected_servo: 0,
            assist: assist.into(),
            turn_epoch: 0,
            min_angle: servos.min_angle,
            max_angle: servos.max_angle,
        }
    }

    pub fn set_turn(&mut self, turn: f32) {
        if self.turn != 0.0 && turn == 0.0 {
            self.turn_epoch += 1;
        }
        self.turn = turn;
    }

    pub fn stop_movement(&mut self) {
        self.speed = 0.0;
        self.set_turn(0.0);
        self.twist = 0.0;
    }

    pub fn select_servo(&mut self, index: usize) {
        if index < self.servo_angles.len() {
            self.selected_servo = index;
        } else {
            tracing::debug!("No servo {} to select", index);
        }
    }

    pub fn selected_angle(&self) -> Option<f32> {
        self.servo_angles.get(self.selected_servo).copied()
    }

    pub fn set_selected_angle(&mut self, angle: f32) {
        let angle = angle.clamp(self.min_angle, self.max_angle);
        if let Some(slot) = self.servo_angles.get_mut(self.selected_servo) {
            *slot = angle;
        }
    }

    pub fn is_moving(&self) -> bool {
        self.speed != 0.0 || self.turn != 0.0 || self.twist != 0.0
    }
}
