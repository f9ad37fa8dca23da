use std::io;
use std::path::PathBuf;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_PRIVILEGE_REQUIRED: u8 = 2;
pub const EXIT_HOST_MISSING: u8 = 3;
pub const EXIT_INVALID_INPUT: u8 = 4;
pub const EXIT_INTERRUPTED: u8 = 130;

/// Failures that abort a workflow step. Per-domain switch failures are not
/// errors; they are reported as `SwitchOutcome::Failed`.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("host unreachable while trying to {operation}: {detail}")]
    HostUnreachable { operation: String, detail: String },

    #[error("invalid selection '{input}': {reason}")]
    InvalidSelection { input: String, reason: String },

    #[error("source and target handler are both '{handler}': nothing to switch")]
    NoOpSelection { handler: String },

    #[error("failed to write {artifact}: {}", path.display())]
    ArtifactWriteFailed {
        artifact: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("handlerswap must run as root (effective uid is {uid})")]
    PrivilegeRequired { uid: u32 },

    #[error("control-panel CLI not found or not executable: {}", path.display())]
    HostMissing { path: PathBuf },

    #[error("interrupted after {processed} of {total} domains")]
    Interrupted { processed: usize, total: usize },
}

impl SwitchError {
    pub fn host_unreachable(operation: &str, err: &anyhow::Error) -> Self {
        Self::HostUnreachable {
            operation: operation.to_string(),
            detail: format!("{err:#}"),
        }
    }

    pub fn invalid_selection(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSelection {
            input: input.trim().to_string(),
            reason: reason.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::PrivilegeRequired { .. } => EXIT_PRIVILEGE_REQUIRED,
            Self::HostMissing { .. } => EXIT_HOST_MISSING,
            Self::Interrupted { .. } => EXIT_INTERRUPTED,
            Self::InvalidSelection { .. } | Self::NoOpSelection { .. } => EXIT_INVALID_INPUT,
            Self::HostUnreachable { .. } | Self::ArtifactWriteFailed { .. } => EXIT_FAILURE,
        }
    }
}
