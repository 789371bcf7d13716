//! schedsim - a didactic CPU scheduling simulation.
//!
//! A fixed set of processes competes for a fixed pool of CPUs. Every
//! scheduling round serves the most starved runnable processes first;
//! processes block on a shared IO queue or on page faults and come back
//! once the user (or the autoplay) services them.
//!
//! ```
//! use schedsim::{EventQueue, Simulation, SimulationConfig};
//!
//! let mut sim = Simulation::new(&SimulationConfig::scheduling_only(10, 4)).unwrap();
//! let events = EventQueue::new(16);
//! sim.tick(0, &events);
//! assert_eq!(sim.process_manager().running_count(), 4);
//! ```

pub mod config;
pub mod cpu;
pub mod events;
pub mod io_queue;
pub mod logger;
pub mod process;
pub mod services;

pub use config::{ConfigError, SimulationConfig};
pub use cpu::{Cpu, CpuId, CpuPool};
pub use events::{EventQueue, UserEvent};
pub use io_queue::IoQueue;
pub use process::{
    BlockReason, CurrentStats, EndReason, InvariantViolation, Process, ProcessError, ProcessId,
    ProcessManager, ProcessState, ScheduleOutcome, SchedulerStats,
};
pub use services::{EventError, PageError, PageId, PageManager, PageState, Simulation, SimulationHandle};
