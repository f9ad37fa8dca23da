mod config;
mod error;
mod handler;
mod outcome;
mod panel;
mod selection;

pub use config::{HostConfig, DEFAULT_CONFIG_PATH};
pub use error::{
    SwitchError, EXIT_FAILURE, EXIT_HOST_MISSING, EXIT_INTERRUPTED, EXIT_INVALID_INPUT,
    EXIT_PRIVILEGE_REQUIRED,
};
pub use handler::{is_family_handler, validate_handler_id, Handler};
pub use outcome::{SwitchOutcome, SwitchSummary};
pub use panel::{HandlerRecord, HostPanel};
pub use selection::{ensure_distinct, select_handler, SelectionMenu, SelectionMode};
