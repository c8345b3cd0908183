use std::fmt::Display;

use thiserror::Error;

/// A relative humidity reading in percent, as reported by the sensor.
///
/// The raw sensor value is carried as-is; only the derived progress value
/// is bounded to the 0-100 range the display widget accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Humidity {
    value: f32,
}

/// Represents errors in creating a `Humidity` reading.
#[derive(Error, Debug)]
pub enum HumidityError {
    /// The raw value was NaN or infinite. Such values can come out of a
    /// float parse but are never a usable reading.
    #[error("Humidity value is not a finite number.")]
    NotFinite,
}

impl Humidity {
    /// Get the underlying humidity value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Integer progress value for a bounded 0-100 display widget.
    pub fn progress(&self) -> u8 {
        self.value.clamp(0f32, 100f32) as u8
    }
}

impl TryFrom<f32> for Humidity {
    type Error = HumidityError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(HumidityError::NotFinite);
        }
        Ok(Self { value })
    }
}

impl Display for Humidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.value)
    }
}
