use num_traits::Float;

/// Noise parameters and prior for one fused scalar channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Noise<T> {
    /// Process noise (Q)
    pub process: T,
    /// Measurement noise (R), must stay positive
    pub measurement: T,
    /// Prior estimate
    pub initial: T,
}

impl<T: Float> Noise<T> {
    pub fn new(process: T, measurement: T) -> Self {
        Self {
            process,
            measurement,
            initial: T::zero(),
        }
    }

    pub fn with_initial(mut self, initial: T) -> Self {
        self.initial = initial;
        self
    }
}

/// One dimensional Kalman filter.
///
/// Each call to [`update`](Self::update) runs a random-walk predict step followed by the
/// measurement correction:
/// ```text
/// P' = P + Q
/// K  = P' / (P' + R)
/// x  = x + K (z - x)
/// P  = (1 - K) P'
/// ```
#[derive(Clone, Debug)]
pub struct ScalarKalman<T> {
    estimate: T,
    error_covariance: T,
    gain: T,
    process_noise: T,
    measurement_noise: T,
}

impl<T: Float> ScalarKalman<T> {
    pub fn new(noise: Noise<T>) -> Self {
        Self {
            estimate: noise.initial,
            error_covariance: T::one(),
            gain: T::zero(),
            process_noise: noise.process,
            measurement_noise: noise.measurement,
        }
    }

    /// Fuse `measurement` into the estimate and return the corrected estimate.
    pub fn update(&mut self, measurement: T) -> T {
        self.correct(self.estimate, measurement)
    }

    /// Fuse `measurement` using `predicted` as the prior state instead of the last estimate.
    pub fn update_with_prediction(&mut self, predicted: T, measurement: T) -> T {
        self.correct(predicted, measurement)
    }

    fn correct(&mut self, predicted: T, measurement: T) -> T {
        let covariance = self.error_covariance + self.process_noise;
        self.gain = covariance / (covariance + self.measurement_noise);

        self.estimate = predicted + self.gain * (measurement - predicted);
        self.error_covariance = (T::one() - self.gain) * covariance;

        self.estimate
    }

    pub fn estimate(&self) -> T {
        self.estimate
    }

    pub fn error_covariance(&self) -> T {
        self.error_covariance
    }

    /// Kalman gain used by the most recent update (zero before the first update).
    pub fn gain(&self) -> T {
        self.gain
    }

    pub fn reset(&mut self, estimate: T) {
        self.estimate = estimate;
        self.error_covariance = T::one();
        self.gain = T::zero();
    }
}

/// Velocity estimator that predicts with a constant-acceleration motion model
/// before correcting toward the observed velocity.
#[derive(Clone, Debug)]
pub struct VelocityKalman<T> {
    filter: ScalarKalman<T>,
}

impl<T: Float> VelocityKalman<T> {
    pub fn new(noise: Noise<T>) -> Self {
        Self {
            filter: ScalarKalman::new(noise),
        }
    }

    /// Predict `v + acceleration * dt`, then correct toward `observed_velocity`.
    /// `dt` is in seconds.
    pub fn update(&mut self, acceleration: T, observed_velocity: T, dt: T) -> T {
        let predicted = self.filter.estimate() + acceleration * dt;
        self.filter.update_with_prediction(predicted, observed_velocity)
    }

    pub fn velocity(&self) -> T {
        self.filter.estimate()
    }

    pub fn error_covariance(&self) -> T {
        self.filter.error_covariance()
    }

    pub fn reset(&mut self, velocity: T) {
        self.filter.reset(velocity)
    }
}
