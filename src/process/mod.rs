// Process management for schedsim
pub mod manager;
pub mod pcb;
pub mod scheduler;

pub use manager::{CurrentStats, InvariantViolation, ProcessManager};
pub use pcb::{BlockReason, EndReason, Process, ProcessError, ProcessId, ProcessState};
pub use scheduler::{ScheduleOutcome, SchedulerStats, StarvationScheduler};
