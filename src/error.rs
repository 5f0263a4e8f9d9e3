use crate::config::ConfigError;
use crate::hal::TransportError;
use embedded_time::{clock, ConversionError};
use thiserror::Error;

/// A flight session error.
///
/// Any of these ends the current session; the session lands before reporting it.
#[derive(Debug, Error)]
pub enum FlightError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("clock error: {0:?}")]
    Clock(clock::Error),
    #[error("time conversion error: {0:?}")]
    Time(ConversionError),
    #[error("aborted by operator")]
    Aborted,
    #[error("vehicle is not airborne")]
    NotAirborne,
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
}

impl From<clock::Error> for FlightError {
    fn from(clock_error: clock::Error) -> Self {
        FlightError::Clock(clock_error)
    }
}

impl From<ConversionError> for FlightError {
    fn from(time_error: ConversionError) -> Self {
        FlightError::Time(time_error)
    }
}
