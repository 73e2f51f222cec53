use std::time::Duration;

use crate::configs::settings::Drive;
use crate::hardware::Chassis;

use super::pid::{PdController, PdParams};
use super::policy::ActuationPolicy;
use super::ControlState;

/// What drove the wheels on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    ProximityHold,
    HeadingHold,
    Direct,
}

/// Turns [`ControlState`] into chassis commands once per tick.
///
/// Assists apply in order: proximity-hold, then heading-hold, then the
/// policy's own mix.
pub struct Actuator {
    heading: PdController,
    proximity_threshold_cm: f32,
    dt: f32,
    /// Turn epoch and yaw the heading was latched at
    latched: Option<(u64, f32)>,
    applied_servos: Vec<Option<f32>>,
    mode: Option<DriveMode>,
}

impl Actuator {
    pub fn new(drive: &Drive) -> Self {
        Self::with_tick(drive, drive.tick())
    }

    pub fn with_tick(drive: &Drive, tick: Duration) -> Self {
        Self {
            heading: PdController::new(PdParams {
                kp: drive.heading_kp,
                kd: drive.heading_kd,
                ..PdParams::default()
            }),
            proximity_threshold_cm: drive.proximity_threshold_cm,
            dt: tick.as_secs_f32(),
            latched: None,
            applied_servos: Vec::new(),
            mode: None,
        }
    }

    pub fn desired_heading(&self) -> Option<f32> {
        self.latched.map(|(_, heading)| heading)
    }

    pub fn step<C: Chassis>(
        &mut self,
        policy: &dyn ActuationPolicy,
        state: &ControlState,
        chassis: &mut C,
    ) -> DriveMode {
        self.sync_servos(state, chassis);

        let (mode, efforts) = self.efforts(policy, state, chassis);
        chassis.set_efforts(&efforts);

        if self.mode != Some(mode) {
            tracing::debug!("Drive mode {:?}", mode);
            self.mode = Some(mode);
        }
        mode
    }

    /// Commands every wheel to zero.
    pub fn halt<C: Chassis>(&mut self, policy: &dyn ActuationPolicy, chassis: &mut C) {
        chassis.set_efforts(&vec![0.0; policy.wheel_count()]);
    }

    fn efforts<C: Chassis>(
        &mut self,
        policy: &dyn ActuationPolicy,
        state: &ControlState,
        chassis: &C,
    ) -> (DriveMode, Vec<f32>) {
        if state.assist.proximity_assist
            && state.speed > 0.0
            && chassis.distance_cm() <= self.proximity_threshold_cm
        {
            return (DriveMode::ProximityHold, vec![0.0; policy.wheel_count()]);
        }

        if policy.heading_hold() && state.assist.imu_assist && state.speed != 0.0 && state.turn == 0.0 {
            let yaw = chassis.yaw();
            let desired = match self.latched {
                Some((epoch, heading)) if epoch == state.turn_epoch => heading,
                _ => {
                    tracing::debug!("Holding heading {:.1}", yaw);
                    self.latched = Some((state.turn_epoch, yaw));
                    self.heading.reset();
                    yaw
                }
            };

            let correction = self.heading.update_error(wrap_degrees(desired - yaw), self.dt);
            let efforts = policy
                .correct_heading(state.speed, correction)
                .into_iter()
                .map(|e| e.clamp(-1.0, 1.0))
                .collect();
            return (DriveMode::HeadingHold, efforts);
        }

        (DriveMode::Direct, policy.mix(state))
    }

    fn sync_servos<C: Chassis>(&mut self, state: &ControlState, chassis: &mut C) {
        self.applied_servos.resize(state.servo_angles.len(), None);
        for (index, (angle, applied)) in state
            .servo_angles
            .iter()
            .zip(self.applied_servos.iter_mut())
            .enumerate()
        {
            if *applied != Some(*angle) {
                chassis.set_servo_angle(index, *angle);
                *applied = Some(*angle);
            }
        }
    }
}

/// Wraps an angle difference into (-180, 180].
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped - 360.0
    } else if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
