// Process Manager for schedsim
use core::fmt;

use rand::Rng;

use crate::config::{ConfigError, SimulationConfig};
use crate::cpu::{CpuId, CpuPool};
use crate::io_queue::IoQueue;
use crate::process::pcb::{BlockReason, EndReason, Process, ProcessError, ProcessId, ProcessState};
use crate::process::scheduler::{ScheduleOutcome, SchedulerStats, StarvationScheduler};
use crate::services::page_manager::PageManager;

/// Owns every process, the CPU pool and the IO queue. The only place
/// where CPU ownership and starvation levels change.
#[derive(Debug, Clone)]
pub struct ProcessManager {
    processes: Vec<Process>,
    cpus: CpuPool,
    io_queue: Option<IoQueue>,
    scheduler: StarvationScheduler,
    terminated_by_user: Vec<ProcessId>,
    termination_slots: usize,
    stats_levels: usize,
    io_request_probability: f64,
}

/// Display snapshot of the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentStats {
    /// CPU holders per starvation level; the last bucket also counts
    /// every level above it
    pub active_process_count_by_starvation_level: Vec<usize>,
    pub cpu_count: usize,
    pub free_cpu_count: usize,
    pub waiting_count: usize,
    pub blocked_count: usize,
    pub ended_count: usize,
    pub terminated_by_user_count: usize,
}

impl ProcessManager {
    /// Create the fixed process set (pids `1..=process_count`) and CPU
    /// pool. When `pages` is given every process gets one page.
    pub fn new(
        config: &SimulationConfig,
        mut pages: Option<&mut PageManager>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let processes = (1..=config.process_count as ProcessId)
            .map(|pid| {
                let page = pages.as_deref_mut().map(|pages| pages.allocate(pid));
                Process::new(pid, page, config.process_lifespan_ms)
            })
            .collect();

        log::info!(
            "[sched] Created {} processes on {} CPUs",
            config.process_count,
            config.cpu_count
        );

        Ok(Self {
            processes,
            cpus: CpuPool::new(config.cpu_count),
            io_queue: config.enable_io_queue.then(IoQueue::new),
            scheduler: StarvationScheduler::new(config.starvation_floor),
            terminated_by_user: Vec::new(),
            termination_slots: config.termination_slots,
            stats_levels: config.stats_levels,
            io_request_probability: config.io_request_probability,
        })
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Get process information
    pub fn process(&self, pid: ProcessId) -> Option<&Process> {
        self.processes.iter().find(|process| process.pid() == pid)
    }

    pub fn cpus(&self) -> &CpuPool {
        &self.cpus
    }

    pub fn cpu_count(&self) -> usize {
        self.cpus.len()
    }

    pub fn io_queue(&self) -> Option<&IoQueue> {
        self.io_queue.as_ref()
    }

    pub fn running_count(&self) -> usize {
        self.processes.iter().filter(|process| process.is_running()).count()
    }

    /// Pids terminated by the user, in termination order
    pub fn terminated_by_user(&self) -> &[ProcessId] {
        &self.terminated_by_user
    }

    pub fn termination_slots_left(&self) -> usize {
        self.termination_slots
            .saturating_sub(self.terminated_by_user.len())
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    fn index_of(&self, pid: ProcessId) -> Result<usize, ProcessError> {
        self.processes
            .iter()
            .position(|process| process.pid() == pid)
            .ok_or(ProcessError::ProcessNotFound)
    }

    /// Run one scheduling round and keep page claims in step with it
    pub fn schedule(&mut self, mut pages: Option<&mut PageManager>) -> ScheduleOutcome {
        let outcome = self.scheduler.schedule(&mut self.processes, &mut self.cpus);

        if let Some(pages) = pages.as_deref_mut() {
            for &pid in &outcome.granted {
                self.sync_page(pid, pages, true);
            }
            for &pid in &outcome.revoked {
                self.sync_page(pid, pages, false);
            }
        }

        if !outcome.is_noop() {
            log::debug!(
                "[sched] {} granted, {} revoked, {} starved ({} of {} CPUs busy)",
                outcome.granted.len(),
                outcome.revoked.len(),
                outcome.starved.len(),
                self.cpus.in_use_count(),
                self.cpus.len()
            );
        }
        debug_assert_eq!(self.check_invariants(), Ok(()));
        outcome
    }

    fn sync_page(&self, pid: ProcessId, pages: &mut PageManager, claim: bool) {
        let Some(page) = self.process(pid).and_then(Process::page) else {
            return;
        };
        let result = if claim {
            pages.claim(page)
        } else {
            pages.release(page)
        };
        if let Err(e) = result {
            log::error!("[page] Page {} of PID {}: {}", page, pid, e);
        }
    }

    /// Flip the IO queue toggle. `None` when there is no IO queue.
    pub fn on_io_queue_click(&mut self) -> Option<bool> {
        self.io_queue.as_mut().map(IoQueue::on_click)
    }

    /// Manual dispatch by the user: a running process yields, a waiting
    /// one takes a free CPU if there is one. Blocked and ended processes
    /// are left as they are.
    pub fn toggle_process(
        &mut self,
        pid: ProcessId,
        mut pages: Option<&mut PageManager>,
    ) -> Result<ProcessState, ProcessError> {
        let index = self.index_of(pid)?;
        let floor = self.scheduler.floor();
        let process = &mut self.processes[index];

        let claim = match process.state() {
            ProcessState::Running(_) => process.yield_cpu(&mut self.cpus).map(|_| false),
            ProcessState::Waiting => process.use_cpu(&mut self.cpus, floor).map(|_| true),
            ProcessState::Blocked(_) | ProcessState::Ended(_) => None,
        };
        let state = process.state();

        if let (Some(claim), Some(pages)) = (claim, pages.as_deref_mut()) {
            self.sync_page(pid, pages, claim);
        }
        log::debug!("[sched] PID {} toggled to {:?}", pid, state);
        debug_assert_eq!(self.check_invariants(), Ok(()));
        Ok(state)
    }

    /// User termination. Limited by the number of termination slots.
    pub fn terminate(
        &mut self,
        pid: ProcessId,
        pages: Option<&mut PageManager>,
    ) -> Result<(), ProcessError> {
        let index = self.index_of(pid)?;
        if self.processes[index].has_ended() {
            return Err(ProcessError::ProcessEnded);
        }
        if self.termination_slots_left() == 0 {
            return Err(ProcessError::TerminationSlotsFull);
        }

        self.end_process(index, EndReason::TerminatedByUser, pages)?;
        self.terminated_by_user.push(pid);
        log::info!(
            "[sched] Terminated PID {} ({} slots left)",
            pid,
            self.termination_slots_left()
        );
        Ok(())
    }

    fn end_process(
        &mut self,
        index: usize,
        reason: EndReason,
        pages: Option<&mut PageManager>,
    ) -> Result<(), ProcessError> {
        let process = &mut self.processes[index];
        let pid = process.pid();
        process.end(reason, &mut self.cpus)?;
        if let Some(queue) = self.io_queue.as_mut() {
            queue.cancel(pid);
        }
        if let Some(pages) = pages {
            self.sync_page(pid, pages, false);
        }
        Ok(())
    }

    /// Process-level behaviour for one frame: IO completion, page faults,
    /// natural completion and new IO requests. Never touches starvation.
    pub fn advance<R: Rng>(
        &mut self,
        elapsed_ms: u64,
        mut pages: Option<&mut PageManager>,
        rng: &mut R,
    ) {
        if let Some(queue) = self.io_queue.as_mut() {
            for pid in queue.drain_serviced() {
                if let Some(process) = self.processes.iter_mut().find(|p| p.pid() == pid) {
                    if process.unblock(BlockReason::Io) {
                        log::debug!("[io] PID {} IO serviced", pid);
                    }
                }
            }
        }

        for index in 0..self.processes.len() {
            let pid = self.processes[index].pid();
            let page = self.processes[index].page();
            let resident = match (page, pages.as_deref()) {
                (Some(page), Some(pages)) => pages.is_resident(page),
                _ => true,
            };

            match self.processes[index].state() {
                ProcessState::Blocked(BlockReason::PageFault) if resident => {
                    self.processes[index].unblock(BlockReason::PageFault);
                    log::debug!("[page] PID {} page resident again", pid);
                }
                ProcessState::Running(_) if !resident => {
                    // Keeps its page claim while it waits for the swap-in
                    self.processes[index].block(BlockReason::PageFault, &mut self.cpus);
                    log::debug!("[page] PID {} page fault", pid);
                }
                ProcessState::Running(_) => {
                    if self.processes[index].run_for(elapsed_ms) {
                        // Cannot fail: the process is running
                        let _ = self.end_process(index, EndReason::Completed, pages.as_deref_mut());
                        log::info!("[sched] PID {} completed", pid);
                        continue;
                    }
                    let Some(queue) = self.io_queue.as_mut() else {
                        continue;
                    };
                    if rng.random_bool(self.io_request_probability) {
                        self.processes[index].block(BlockReason::Io, &mut self.cpus);
                        queue.request(pid);
                        if let Some(pages) = pages.as_deref_mut() {
                            self.sync_page(pid, pages, false);
                        }
                        log::debug!("[io] PID {} waiting for IO", pid);
                    }
                }
                _ => {}
            }
        }
        debug_assert_eq!(self.check_invariants(), Ok(()));
    }

    /// Get current statistics
    pub fn current_stats(&self) -> CurrentStats {
        let mut by_level = vec![0; self.stats_levels];
        let last = self.stats_levels.saturating_sub(1);
        for process in self.processes.iter().filter(|p| p.is_running()) {
            let level = (process.starvation_level() as usize).min(last);
            if let Some(bucket) = by_level.get_mut(level) {
                *bucket += 1;
            }
        }

        let count = |predicate: fn(&Process) -> bool| {
            self.processes.iter().filter(|p| predicate(p)).count()
        };

        CurrentStats {
            active_process_count_by_starvation_level: by_level,
            cpu_count: self.cpus.len(),
            free_cpu_count: self.cpus.free_count(),
            waiting_count: count(Process::is_waiting),
            blocked_count: count(Process::is_blocked),
            ended_count: count(Process::has_ended),
            terminated_by_user_count: self.terminated_by_user.len(),
        }
    }

    /// Cross-check process states against CPU ownership
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let running = self.running_count();
        if running > self.cpus.len() {
            return Err(InvariantViolation::CpuOvercommitted {
                running,
                cpus: self.cpus.len(),
            });
        }

        for process in &self.processes {
            if let Some(cpu) = process.cpu() {
                let owner = self.cpus.get(cpu).and_then(|c| c.owner());
                if owner != Some(process.pid()) {
                    return Err(InvariantViolation::CpuOwnerMismatch {
                        cpu,
                        pid: process.pid(),
                    });
                }
            }
        }

        for cpu in self.cpus.iter() {
            let Some(pid) = cpu.owner() else { continue };
            let holder = self.process(pid);
            match holder.map(Process::state) {
                Some(ProcessState::Running(held)) if held == cpu.id() => {}
                Some(ProcessState::Blocked(_)) => return Err(InvariantViolation::BlockedHoldsCpu(pid)),
                Some(ProcessState::Ended(_)) => return Err(InvariantViolation::EndedHoldsCpu(pid)),
                _ => {
                    return Err(InvariantViolation::CpuOwnerMismatch {
                        cpu: cpu.id(),
                        pid,
                    })
                }
            }
        }

        let expected = self.cpus.len() - running;
        if self.cpus.free_count() != expected {
            return Err(InvariantViolation::FreeCountMismatch {
                free: self.cpus.free_count(),
                expected,
            });
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn cpus_mut(&mut self) -> &mut CpuPool {
        &mut self.cpus
    }

    #[cfg(test)]
    pub(crate) fn processes_mut(&mut self) -> &mut [Process] {
        &mut self.processes
    }
}

/// Broken scheduling invariant. Always a bug in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    CpuOvercommitted { running: usize, cpus: usize },
    CpuOwnerMismatch { cpu: CpuId, pid: ProcessId },
    BlockedHoldsCpu(ProcessId),
    EndedHoldsCpu(ProcessId),
    FreeCountMismatch { free: usize, expected: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvariantViolation::CpuOvercommitted { running, cpus } => {
                write!(f, "{} running processes on {} CPUs", running, cpus)
            }
            InvariantViolation::CpuOwnerMismatch { cpu, pid } => {
                write!(f, "CPU {} and PID {} disagree on ownership", cpu, pid)
            }
            InvariantViolation::BlockedHoldsCpu(pid) => write!(f, "Blocked PID {} holds a CPU", pid),
            InvariantViolation::EndedHoldsCpu(pid) => write!(f, "Ended PID {} holds a CPU", pid),
            InvariantViolation::FreeCountMismatch { free, expected } => {
                write!(f, "{} free CPUs, expected {}", free, expected)
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}
