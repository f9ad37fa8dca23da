use anyhow::Result;

use crate::SwitchError;

/// One handler entry as reported by the control panel, before family filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRecord {
    pub id: String,
    pub display_name: Option<String>,
    pub full_version: Option<String>,
    pub enabled: bool,
}

/// Boundary to the control-panel host. Queries fail with
/// `SwitchError::HostUnreachable`; a failed rebind carries the host's
/// diagnostic text and never aborts a batch on its own.
pub trait HostPanel {
    fn handler_records(&self) -> Result<Vec<HandlerRecord>, SwitchError>;

    /// Usage counts for handlers whose id starts with `prefix`.
    fn usage_counts(&self, prefix: &str) -> Result<Vec<(String, u64)>, SwitchError>;

    fn entities_for(&self, handler: &str) -> Result<Vec<String>, SwitchError>;

    /// Must be idempotent: rebinding to the current handler succeeds.
    fn rebind(&self, entity: &str, handler: &str) -> Result<()>;
}
