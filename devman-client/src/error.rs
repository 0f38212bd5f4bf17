use std::fmt;

use devman_shared::tags::{TagRejection, TagSet};
use reqwest::StatusCode;
use thiserror::Error;

/// Registry call a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListDevices,
    GetDevice,
    RemoveDevice,
    SetTags,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ListDevices => "list devices",
            Operation::GetDevice => "get device",
            Operation::RemoveDevice => "remove device",
            Operation::SetTags => "set tags",
        };
        f.write_str(name)
    }
}

/// Network failure, non-2xx response, or a body that could not be decoded.
#[derive(Debug)]
pub struct TransportError {
    pub operation: Operation,
    pub device_id: Option<String>,
    pub status: Option<StatusCode>,
    /// Response body returned by the registry, when there was one
    pub body: Option<String>,
    pub source: Option<reqwest::Error>,
}

impl TransportError {
    pub(crate) fn request(
        operation: Operation,
        device_id: Option<&str>,
        source: reqwest::Error,
    ) -> Self {
        Self {
            operation,
            device_id: device_id.map(str::to_string),
            status: source.status(),
            body: None,
            source: Some(source),
        }
    }

    pub(crate) fn status(
        operation: Operation,
        device_id: Option<&str>,
        status: StatusCode,
        body: String,
    ) -> Self {
        Self {
            operation,
            device_id: device_id.map(str::to_string),
            status: Some(status),
            body: (!body.trim().is_empty()).then_some(body),
            source: None,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed", self.operation)?;
        if let Some(id) = &self.device_id {
            write!(f, " for device {id}")?;
        }
        if let Some(status) = self.status {
            write!(f, " (HTTP {status})")?;
        }
        if let Some(body) = &self.body {
            write!(f, ": {}", body.trim())?;
        }
        Ok(())
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Error)]
pub enum DeviceAdminError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("device {device_id} has no tags to remove")]
    NoTags { device_id: String },

    #[error("refusing to remove the last tag(s) of device {device_id}; a device must keep at least one tag")]
    LastTag { device_id: String },

    /// The tag write succeeded but reading the device back did not.
    #[error("tags were written to device {device_id} ({submitted}) but the verification read failed")]
    Unverified {
        device_id: String,
        submitted: TagSet,
        #[source]
        source: Box<DeviceAdminError>,
    },
}

impl DeviceAdminError {
    pub(crate) fn rejected(device_id: &str, rejection: TagRejection) -> Self {
        let device_id = device_id.to_string();
        match rejection {
            TagRejection::NoTags => DeviceAdminError::NoTags { device_id },
            TagRejection::LastTag => DeviceAdminError::LastTag { device_id },
        }
    }

    /// Status code of the failed registry call, if the error came from one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DeviceAdminError::Transport(e) => e.status,
            DeviceAdminError::Unverified { source, .. } => source.status(),
            _ => None,
        }
    }
}

pub type Result<T, E = DeviceAdminError> = std::result::Result<T, E>;
