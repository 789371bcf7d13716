// Process Control Block for schedsim
use core::fmt;

use crate::cpu::{CpuId, CpuPool};
use crate::services::page_manager::PageId;

/// Process ID type
pub type ProcessId = u64;

/// Process state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Waiting,              // Runnable, no CPU
    Running(CpuId),       // Holding a CPU
    Blocked(BlockReason), // Waiting on IO or a page, no CPU
    Ended(EndReason),     // Terminal, kept for accounting
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Io,
    PageFault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Completed,
    TerminatedByUser,
}

/// A simulated process.
///
/// Fields are private: presentation code reads them through accessors and
/// only the process manager and scheduler drive transitions.
#[derive(Debug, Clone)]
pub struct Process {
    pid: ProcessId,
    state: ProcessState,
    starvation_level: u32,
    page: Option<PageId>,
    cpu_time_ms: u64,
    lifespan_ms: Option<u64>,
}

impl Process {
    pub fn new(pid: ProcessId, page: Option<PageId>, lifespan_ms: Option<u64>) -> Self {
        Self {
            pid,
            state: ProcessState::Waiting,
            starvation_level: 0,
            page,
            cpu_time_ms: 0,
            lifespan_ms,
        }
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn starvation_level(&self) -> u32 {
        self.starvation_level
    }

    pub fn page(&self) -> Option<PageId> {
        self.page
    }

    pub fn cpu_time_ms(&self) -> u64 {
        self.cpu_time_ms
    }

    pub fn lifespan_ms(&self) -> Option<u64> {
        self.lifespan_ms
    }

    pub fn cpu(&self) -> Option<CpuId> {
        match self.state {
            ProcessState::Running(cpu) => Some(cpu),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ProcessState::Running(_))
    }

    pub fn is_waiting(&self) -> bool {
        self.state == ProcessState::Waiting
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.state, ProcessState::Blocked(_))
    }

    pub fn has_ended(&self) -> bool {
        matches!(self.state, ProcessState::Ended(_))
    }

    /// Take a free CPU. Already running: no-op, returns the current CPU.
    /// Blocked or ended processes never get one.
    pub(crate) fn use_cpu(&mut self, cpus: &mut CpuPool, floor: u32) -> Option<CpuId> {
        match self.state {
            ProcessState::Running(cpu) => Some(cpu),
            ProcessState::Waiting => {
                let cpu = cpus.acquire(self.pid)?;
                self.state = ProcessState::Running(cpu);
                self.starvation_level = floor;
                Some(cpu)
            }
            ProcessState::Blocked(_) | ProcessState::Ended(_) => None,
        }
    }

    /// Give the CPU back. Returns the freed CPU, `None` if none was held.
    pub(crate) fn yield_cpu(&mut self, cpus: &mut CpuPool) -> Option<CpuId> {
        let ProcessState::Running(cpu) = self.state else {
            return None;
        };
        cpus.release(cpu, self.pid);
        self.state = ProcessState::Waiting;
        Some(cpu)
    }

    /// One more scheduling round without a CPU
    pub(crate) fn starve(&mut self) {
        self.starvation_level = self.starvation_level.saturating_add(1);
    }

    /// Block on `reason`, giving up any CPU. Returns whether the state
    /// changed; blocked and ended processes are left alone.
    pub(crate) fn block(&mut self, reason: BlockReason, cpus: &mut CpuPool) -> bool {
        match self.state {
            ProcessState::Waiting | ProcessState::Running(_) => {
                self.yield_cpu(cpus);
                self.state = ProcessState::Blocked(reason);
                true
            }
            ProcessState::Blocked(_) | ProcessState::Ended(_) => false,
        }
    }

    /// Back to waiting if blocked on `reason`
    pub(crate) fn unblock(&mut self, reason: BlockReason) -> bool {
        if self.state == ProcessState::Blocked(reason) {
            self.state = ProcessState::Waiting;
            true
        } else {
            false
        }
    }

    /// Move to the terminal state, giving up any CPU
    pub(crate) fn end(&mut self, reason: EndReason, cpus: &mut CpuPool) -> Result<(), ProcessError> {
        if self.has_ended() {
            return Err(ProcessError::ProcessEnded);
        }
        self.yield_cpu(cpus);
        self.state = ProcessState::Ended(reason);
        Ok(())
    }

    /// Account `elapsed_ms` of CPU time. Returns true once the lifespan
    /// is used up.
    pub(crate) fn run_for(&mut self, elapsed_ms: u64) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cpu_time_ms = self.cpu_time_ms.saturating_add(elapsed_ms);
        self.lifespan_ms
            .is_some_and(|lifespan| self.cpu_time_ms >= lifespan)
    }

    #[cfg(test)]
    pub(crate) fn with_starvation(pid: ProcessId, starvation_level: u32) -> Self {
        Self {
            starvation_level,
            ..Self::new(pid, None, None)
        }
    }
}

/// Process management errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    ProcessNotFound,
    ProcessEnded,
    TerminationSlotsFull,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessError::ProcessNotFound => write!(f, "Process not found"),
            ProcessError::ProcessEnded => write!(f, "Process has already ended"),
            ProcessError::TerminationSlotsFull => write!(f, "No termination slots left"),
        }
    }
}

impl std::error::Error for ProcessError {}
