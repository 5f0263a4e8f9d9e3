use num_traits::{Float, NumCast};
use serde::Deserialize;

/// Inclusive actuator power range for one axis.
///
/// Bounds may be asymmetric, e.g. allowing more downward than upward throttle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Bounds {
    pub lower: i8,
    pub upper: i8,
}

impl Bounds {
    pub const fn new(lower: i8, upper: i8) -> Self {
        Self { lower, upper }
    }

    /// `[-|limit|, |limit|]`, saturating at `i8::MIN`.
    pub const fn symmetric(limit: i8) -> Self {
        let limit = limit.saturating_abs();
        Self::new(-limit, limit)
    }

    pub fn is_valid(&self) -> bool {
        self.lower <= self.upper
    }

    pub fn clamp(&self, power: i8) -> i8 {
        power.max(self.lower).min(self.upper)
    }
}

/// Stateless proportional controller with a clamped integer output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisController<T> {
    pub gain: T,
    pub bounds: Bounds,
}

impl<T: Float> AxisController<T> {
    pub fn new(gain: T, bounds: Bounds) -> Self {
        Self { gain, bounds }
    }

    /// Calculate `clamp(round(gain * (target - estimate)))` with this controller's gain and bounds.
    pub fn control(&self, target: T, estimate: T) -> i8 {
        compute(target, estimate, self.gain, self.bounds.lower, self.bounds.upper)
    }
}

/// Calculate the power `clamp(round(gain * (target - estimate)), lower, upper)`.
///
/// The output is always within `[lower, upper]`, including for infinite errors.
/// An undefined product (NaN) resolves to the middle of the range.
pub fn compute<T: Float>(target: T, estimate: T, gain: T, lower: i8, upper: i8) -> i8 {
    let (lower, upper) = if lower <= upper {
        (lower, upper)
    } else {
        (upper, lower)
    };

    let output = gain * (target - estimate);
    if output.is_nan() {
        let middle = (<i16 as From<i8>>::from(lower) + <i16 as From<i8>>::from(upper)) / 2;
        return middle as i8;
    }

    // Clamp in the float domain first so the cast can not overflow.
    let low = <T as NumCast>::from(lower).unwrap_or_else(T::min_value);
    let high = <T as NumCast>::from(upper).unwrap_or_else(T::max_value);
    let clamped = output.round().max(low).min(high);

    <i8 as NumCast>::from(clamped).unwrap_or(if output > T::zero() { upper } else { lower })
}
