//! VIN compatibility check
//!
//! Decides from three characters of a 17-character VIN whether the vehicle
//! speaks the BLE command protocol:
//!
//! ```text
//! index:  0 1 2 3 4 5 6 7 8 9 ...
//!               ^       ^   ^
//!               |       |   model year
//!               |       drive unit
//!               model
//! ```
//!
//! The comparisons are on raw characters. `'L'` and `'M'` are thresholds, not
//! decoded model years.

use std::fmt;
use thiserror::Error;

/// Required VIN length in characters
pub const VIN_LENGTH: usize = 17;

const MODEL_INDEX: usize = 3;
const DRIVE_UNIT_INDEX: usize = 7;
const MODEL_YEAR_INDEX: usize = 9;

/// Models that are compatible up to and including model year `'L'`
const COMPATIBLE_MODELS: [char; 2] = ['3', 'Y'];

/// Drive units that are incompatible in model year `'M'`
const INCOMPATIBLE_DRIVE_UNITS: [char; 4] = ['1', '2', '3', '4'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VinError {
    #[error("{vin} is not a valid VIN.")]
    InvalidLength { vin: String, length: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    Incompatible,
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compatible => f.write_str("compatible"),
            Self::Incompatible => f.write_str("incompatible"),
        }
    }
}

/// A VIN that passed the length check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vin {
    raw: String,
    chars: [char; VIN_LENGTH],
}

impl Vin {
    pub fn parse(input: &str) -> Result<Self, VinError> {
        let chars: Vec<char> = input.chars().collect();
        let chars: [char; VIN_LENGTH] =
            chars
                .try_into()
                .map_err(|rejected: Vec<char>| VinError::InvalidLength {
                    vin: input.to_string(),
                    length: rejected.len(),
                })?;

        Ok(Self {
            raw: input.to_string(),
            chars,
        })
    }

    pub fn model(&self) -> char {
        self.chars[MODEL_INDEX]
    }

    pub fn drive_unit(&self) -> char {
        self.chars[DRIVE_UNIT_INDEX]
    }

    pub fn model_year(&self) -> char {
        self.chars[MODEL_YEAR_INDEX]
    }
}

impl fmt::Display for Vin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

pub fn check_compatibility(vin: &Vin) -> Compatibility {
    let compatible = match vin.model_year() {
        year if year <= 'L' => COMPATIBLE_MODELS.contains(&vin.model()),
        'M' => !INCOMPATIBLE_DRIVE_UNITS.contains(&vin.drive_unit()),
        _ => true,
    };

    if compatible {
        Compatibility::Compatible
    } else {
        Compatibility::Incompatible
    }
}

/// Validate and classify in one step
pub fn check_vin(input: &str) -> Result<Compatibility, VinError> {
    Vin::parse(input).map(|vin| check_compatibility(&vin))
}

/// The line printed for a classified VIN
pub fn verdict_message(vin: &str, verdict: Compatibility) -> String {
    format!("{} is {}!", vin, verdict)
}
