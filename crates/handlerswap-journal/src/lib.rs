mod executor;
mod fs_utils;
mod layout;
mod rollback;
mod session_log;

pub use executor::{replay_all, switch_all};
pub use layout::StateLayout;
pub use rollback::{parse_rollback_artifact, ReversalLine, RollbackArtifact, RollbackRecorder};
pub use session_log::{LogLevel, SessionLog};
