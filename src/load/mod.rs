//! Screen-facing load orchestration: one cancellable load per slot and its
//! tri-state result stream.

pub mod coordinator;
pub mod result;

pub use coordinator::{LoadCoordinator, Slot};
pub use result::ResultModel;
