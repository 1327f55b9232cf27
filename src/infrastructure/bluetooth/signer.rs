//! Command Signer
//!
//! Vehicle actions only take effect when sent inside an authenticated
//! session. Building that session (key exchange, counters, signatures) is
//! delegated to an external program configured in the settings; this module
//! only runs it and collects the sealed message body.

use crate::domain::command::VehicleAction;
use crate::domain::error::VehicleError;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Produces the message body for one vehicle action
pub trait CommandSigner {
    fn seal(&self, action: VehicleAction) -> Result<Vec<u8>, VehicleError>;
}

/// Runs `<program> <args..> --key <private_key> <action-token>` and reads a
/// hex-encoded body from its stdout
#[derive(Debug, Clone)]
pub struct ExternalSigner {
    program: String,
    args: Vec<String>,
    key_path: PathBuf,
}

impl ExternalSigner {
    pub fn new(program: impl Into<String>, args: Vec<String>, key_path: PathBuf) -> Self {
        Self {
            program: program.into(),
            args,
            key_path,
        }
    }
}

impl CommandSigner for ExternalSigner {
    fn seal(&self, action: VehicleAction) -> Result<Vec<u8>, VehicleError> {
        debug!("Sealing '{}' with {}", action, self.program);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--key")
            .arg(&self.key_path)
            .arg(action.token())
            .output()
            .map_err(|e| VehicleError::Signer(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VehicleError::Signer(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        hex::decode(stdout.trim())
            .map_err(|e| VehicleError::Signer(format!("invalid hex from {}: {}", self.program, e)))
    }
}

/// Used when no signer program is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSigner;

impl CommandSigner for NoSigner {
    fn seal(&self, action: VehicleAction) -> Result<Vec<u8>, VehicleError> {
        Err(VehicleError::SignerUnavailable(action))
    }
}

pub fn signer_from_settings(
    program: Option<&str>,
    args: &[String],
    key_path: PathBuf,
) -> Box<dyn CommandSigner> {
    match program {
        Some(program) if !program.trim().is_empty() => {
            Box::new(ExternalSigner::new(program, args.to_vec(), key_path))
        }
        _ => Box::new(NoSigner),
    }
}
