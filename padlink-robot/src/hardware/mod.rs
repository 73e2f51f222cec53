/// Drive, servo and sensor primitives of the robot body.
pub trait Chassis {
    /// One effort in [-1, 1] per wheel, in the order the drive profile defines.
    fn set_efforts(&mut self, efforts: &[f32]);

    fn set_servo_angle(&mut self, index: usize, angle: f32);

    /// Heading in degrees.
    fn yaw(&self) -> f32;

    /// Distance to the nearest obstacle ahead.
    fn distance_cm(&self) -> f32;
}

/// In-memory chassis that remembers what it was told.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedChassis {
    pub efforts: Vec<f32>,
    pub servo_angles: Vec<f32>,
    pub yaw: f32,
    pub distance_cm: f32,
    pub effort_writes: usize,
}

impl SimulatedChassis {
    pub fn new(servos: usize) -> Self {
        Self {
            efforts: Vec::new(),
            servo_angles: vec![0.0; servos],
            yaw: 0.0,
            distance_cm: f32::INFINITY,
            effort_writes: 0,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.efforts.iter().all(|e| *e == 0.0)
    }
}

impl Chassis for SimulatedChassis {
    fn set_efforts(&mut self, efforts: &[f32]) {
        if self.efforts != efforts {
            tracing::trace!("Efforts {:?}", efforts);
        }
        self.efforts.clear();
        self.efforts.extend_from_slice(efforts);
        self.effort_writes += 1;
    }

    fn set_servo_angle(&mut self, index: usize, angle: f32) {
        match self.servo_angles.get_mut(index) {
            Some(slot) => {
                tracing::debug!("Servo {} -> {}", index, angle);
                *slot = angle;
            }
            None => tracing::warn!("No servo {} on this chassis", index),
        }
    }

    fn yaw(&self) -> f32 {
        self.yaw
    }

    fn distance_cm(&self) -> f32 {
        self.distance_cm
    }
}
