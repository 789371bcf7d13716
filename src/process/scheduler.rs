// Starvation-aware CPU scheduler for schedsim
use crate::cpu::CpuPool;
use crate::process::pcb::{Process, ProcessId};

/// Decides CPU ownership once per scheduling round.
///
/// A round partitions processes into excluded (blocked, ended, or holding
/// no starvation credit while every CPU is taken) and eligible. Excluded
/// CPU holders yield; eligible processes are served highest starvation
/// first, and whoever finds no free CPU starves one more level.
#[derive(Debug, Clone, Default)]
pub struct StarvationScheduler {
    floor: u32,
    rounds: u64,
    grants: u64,
    revocations: u64,
    starved_waits: u64,
}

/// What a single round changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleOutcome {
    pub granted: Vec<ProcessId>,
    pub revoked: Vec<ProcessId>,
    pub starved: Vec<ProcessId>,
}

impl ScheduleOutcome {
    pub fn is_noop(&self) -> bool {
        self.granted.is_empty() && self.revoked.is_empty() && self.starved.is_empty()
    }
}

impl StarvationScheduler {
    /// `floor` is the starvation level a process is reset to on grant
    pub fn new(floor: u32) -> Self {
        Self {
            floor,
            ..Self::default()
        }
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }

    /// Run one scheduling round over `processes`
    pub fn schedule(&mut self, processes: &mut [Process], cpus: &mut CpuPool) -> ScheduleOutcome {
        let mut outcome = ScheduleOutcome::default();
        if processes.is_empty() || cpus.is_empty() {
            return outcome;
        }
        self.rounds += 1;

        // Measured once, before anyone yields
        let saturated = cpus.is_saturated();

        let mut eligible: Vec<usize> = Vec::with_capacity(processes.len());
        for (index, process) in processes.iter_mut().enumerate() {
            let excluded = process.is_blocked()
                || process.has_ended()
                || (saturated && process.starvation_level() == self.floor);
            if excluded {
                if process.yield_cpu(cpus).is_some() {
                    outcome.revoked.push(process.pid());
                }
                continue;
            }
            eligible.push(index);
        }

        // Stable: creation order wins ties
        eligible.sort_by(|&a, &b| {
            processes[b]
                .starvation_level()
                .cmp(&processes[a].starvation_level())
        });

        for index in eligible {
            let process = &mut processes[index];
            if process.is_running() {
                continue;
            }
            if process.use_cpu(cpus, self.floor).is_some() {
                outcome.granted.push(process.pid());
            } else {
                process.starve();
                outcome.starved.push(process.pid());
            }
        }

        self.grants += outcome.granted.len() as u64;
        self.revocations += outcome.revoked.len() as u64;
        self.starved_waits += outcome.starved.len() as u64;

        log::trace!(
            "[sched] Round {}: granted {:?}, revoked {:?}, starved {:?}",
            self.rounds,
            outcome.granted,
            outcome.revoked,
            outcome.starved
        );
        outcome
    }

    /// Get scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            rounds: self.rounds,
            grants: self.grants,
            revocations: self.revocations,
            starved_waits: self.starved_waits,
        }
    }
}

/// Scheduler statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub rounds: u64,
    pub grants: u64,
    pub revocations: u64,
    pub starved_waits: u64,
}
