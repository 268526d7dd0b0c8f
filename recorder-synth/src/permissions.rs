//! Simulated microphone permission outcome.
//!
//! Real backends learn this from the OS prompt; the synthetic backend is told
//! up front so tests and demos can exercise the denial paths.

use std::fmt;
use std::str::FromStr;

use recorder_core::CaptureError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionOutcome {
    #[default]
    Granted,
    Denied,
    /// No input device is attached.
    NoDevice,
}

impl PermissionOutcome {
    /// Map the outcome onto the result of a capture request.
    pub fn check(self) -> Result<(), CaptureError> {
        match self {
            Self::Granted => Ok(()),
            Self::Denied => Err(CaptureError::PermissionDenied),
            Self::NoDevice => Err(CaptureError::DeviceUnavailable),
        }
    }

    pub fn device_present(self) -> bool {
        self != Self::NoDevice
    }
}

impl fmt::Display for PermissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::NoDevice => "no-device",
        })
    }
}

impl FromStr for PermissionOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "granted" => Ok(Self::Granted),
            "denied" => Ok(Self::Denied),
            "no-device" => Ok(Self::NoDevice),
            other => Err(format!("unknown permission outcome '{}'", other)),
        }
    }
}
