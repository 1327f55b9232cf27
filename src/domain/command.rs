//! Interactive command tokens
//!
//! Console input is normalized (lowercase, spaces to underscores) and mapped
//! onto a closed set of commands. Anything outside the set becomes
//! [`ShellCommand::Unrecognized`] so the caller decides what to do with it.

use std::fmt;

/// Single-shot operations a connected vehicle accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleAction {
    Lock,
    Unlock,
    OpenTrunk,
    OpenFrunk,
    OpenChargePort,
    CloseChargePort,
}

impl VehicleAction {
    pub const ALL: [VehicleAction; 6] = [
        Self::Lock,
        Self::Unlock,
        Self::OpenTrunk,
        Self::OpenFrunk,
        Self::OpenChargePort,
        Self::CloseChargePort,
    ];

    /// Normalized token typed at the prompt
    pub fn token(&self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::OpenTrunk => "trunk",
            Self::OpenFrunk => "frunk",
            Self::OpenChargePort => "charge_open",
            Self::CloseChargePort => "charge_close",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Lock => "Lock the vehicle",
            Self::Unlock => "Unlock the vehicle",
            Self::OpenTrunk => "Open the vehicle's trunk",
            Self::OpenFrunk => "Open the vehicle's front trunk",
            Self::OpenChargePort => "Open the vehicle's charge port",
            Self::CloseChargePort => "Close the vehicle's charge port",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.token() == token)
    }
}

impl fmt::Display for VehicleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Vehicle(VehicleAction),
    Help,
    Exit,
    /// Prompt for a VIN and classify it
    Check,
    /// Holds the normalized token
    Unrecognized(String),
}

impl ShellCommand {
    pub fn parse(input: &str) -> Self {
        let token = normalize(input);
        match token.as_str() {
            "exit" => Self::Exit,
            "help" => Self::Help,
            "check" => Self::Check,
            other => match VehicleAction::from_token(other) {
                Some(action) => Self::Vehicle(action),
                None => Self::Unrecognized(token),
            },
        }
    }
}

/// Lowercase and replace spaces with underscores
///
/// Surrounding whitespace (including the line terminator) is dropped first.
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase().replace(' ', "_")
}
