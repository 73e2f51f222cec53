#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdParams {
    pub kp: f32,
    pub kd: f32,
    pub min_output: f32,
    pub max_output: f32,
}

impl Default for PdParams {
    fn default() -> Self {
        Self {
            kp: 0.075,
            kd: 0.001,
            min_output: -1.0,
            max_output: 1.0,
        }
    }
}

/// Proportional-derivative controller for heading correction.
#[derive(Debug)]
pub struct PdController {
    params: PdParams,
    previous_error: Option<f32>,
    last_output: f32,
}

impl PdController {
    pub fn new(params: PdParams) -> Self {
        Self {
            params,
            previous_error: None,
            last_output: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.previous_error = None;
        self.last_output = 0.0;
    }

    pub fn update(&mut self, setpoint: f32, measurement: f32, dt: f32) -> f32 {
        self.update_error(setpoint - measurement, dt)
    }

    /// Advances the controller with an already computed error.
    pub fn update_error(&mut self, error: f32, dt: f32) -> f32 {
        const DT_EPSILON: f32 = 1e-6;
        if dt < DT_EPSILON {
            return self.last_output;
        }

        let p_term = self.params.kp * error;

        // No derivative kick on the first sample after a reset
        let derivative = match self.previous_error {
            Some(previous) => (error - previous) / dt,
            None => 0.0,
        };
        let d_term = self.params.kd * derivative;

        let output = (p_term + d_term).clamp(self.params.min_output, self.params.max_output);

        self.previous_error = Some(error);
        self.last_output = output;

        output
    }

    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    pub fn params(&self) -> &PdParams {
        &self.params
    }
}
