mod assignment;
mod command;
mod inventory;
mod plesk_ops;

pub use assignment::{Assignment, AssignmentIndex};
pub use inventory::HandlerInventory;
pub use plesk_ops::PleskCli;
