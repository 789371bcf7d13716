// Simulation service for schedsim
//
// Drives one frame at a time: user events first, then process-level
// behaviour, then a scheduling round gated by the random source.
use core::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spin::{Mutex, MutexGuard};

use crate::config::{ConfigError, SimulationConfig};
use crate::events::{EventQueue, UserEvent};
use crate::process::{CurrentStats, ProcessError, ProcessManager, ScheduleOutcome};
use crate::services::page_manager::{PageError, PageManager};

/// The whole simulated machine plus its random source
pub struct Simulation<R = StdRng> {
    processes: ProcessManager,
    pages: Option<PageManager>,
    rng: R,
    tick_probability: f64,
    autoplay_io: bool,
    autoplay_pages: bool,
    last_tick_ms: Option<u64>,
    frames: u64,
}

impl Simulation<StdRng> {
    /// Build from `config`, seeding from `config.seed` or OS entropy
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Simulation<R> {
    pub fn with_rng(config: &SimulationConfig, rng: R) -> Result<Self, ConfigError> {
        let mut pages = config.enable_paging.then(PageManager::new);
        let processes = ProcessManager::new(config, pages.as_mut())?;
        Ok(Self {
            processes,
            pages,
            rng,
            tick_probability: config.tick_probability,
            autoplay_io: config.autoplay_io,
            autoplay_pages: config.autoplay_pages,
            last_tick_ms: None,
            frames: 0,
        })
    }

    /// One frame. Returns whether a scheduling round ran.
    pub fn tick(&mut self, current_time_ms: u64, events: &EventQueue) -> bool {
        let elapsed_ms = self
            .last_tick_ms
            .map_or(0, |last| current_time_ms.saturating_sub(last));
        self.last_tick_ms = Some(current_time_ms);
        self.frames += 1;

        // Only what was queued before this frame started
        for _ in 0..events.len() {
            let Some(event) = events.pop() else { break };
            if let Err(e) = self.dispatch(event) {
                log::warn!("[events] {:?} rejected: {}", event, e);
            }
        }

        self.processes
            .advance(elapsed_ms, self.pages.as_mut(), &mut self.rng);

        if !self.rng.random_bool(self.tick_probability) {
            return false;
        }
        self.schedule_now();
        true
    }

    /// Apply one user action right away
    pub fn dispatch(&mut self, event: UserEvent) -> Result<(), EventError> {
        match event {
            UserEvent::IoQueueClick => {
                if self.processes.on_io_queue_click().is_none() {
                    log::trace!("[io] No IO queue; click ignored");
                }
            }
            UserEvent::PageClick(page) => {
                if let Some(pages) = self.pages.as_mut() {
                    pages.on_click(page)?;
                }
            }
            UserEvent::ProcessClick(pid) => {
                self.processes.toggle_process(pid, self.pages.as_mut())?;
            }
            UserEvent::TerminateProcess(pid) => {
                self.processes.terminate(pid, self.pages.as_mut())?;
            }
        }
        Ok(())
    }

    /// Run a scheduling round now, followed by the autoplay IO click and
    /// page resolution when enabled
    pub fn schedule_now(&mut self) -> ScheduleOutcome {
        let outcome = self.processes.schedule(self.pages.as_mut());
        if self.autoplay_io {
            self.processes.on_io_queue_click();
        }
        if self.autoplay_pages {
            if let Some(pages) = self.pages.as_mut() {
                pages.resolve_transitional();
            }
        }
        outcome
    }

    pub fn current_stats(&self) -> CurrentStats {
        self.processes.current_stats()
    }

    pub fn process_manager(&self) -> &ProcessManager {
        &self.processes
    }

    pub fn page_manager(&self) -> Option<&PageManager> {
        self.pages.as_ref()
    }

    /// Frames seen by `tick`
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn into_handle(self) -> SimulationHandle<R> {
        SimulationHandle::new(self)
    }
}

/// Errors from dispatching a user event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventError {
    Process(ProcessError),
    Page(PageError),
}

impl From<ProcessError> for EventError {
    fn from(e: ProcessError) -> Self {
        EventError::Process(e)
    }
}

impl From<PageError> for EventError {
    fn from(e: PageError) -> Self {
        EventError::Page(e)
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventError::Process(e) => write!(f, "{}", e),
            EventError::Page(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EventError {}

/// Shared handle to one simulation, handed to every consumer
/// (frame loop, presentation, stats reporter) instead of a global.
pub struct SimulationHandle<R = StdRng> {
    inner: Arc<Mutex<Simulation<R>>>,
}

impl<R> Clone for SimulationHandle<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Rng> SimulationHandle<R> {
    pub fn new(simulation: Simulation<R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(simulation)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Simulation<R>> {
        self.inner.lock()
    }

    pub fn tick(&self, current_time_ms: u64, events: &EventQueue) -> bool {
        self.lock().tick(current_time_ms, events)
    }

    pub fn current_stats(&self) -> CurrentStats {
        self.lock().current_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessState;
    use crate::services::page_manager::PageState;

    fn scheduling_only(processes: usize, cpus: usize) -> Simulation {
        Simulation::new(&SimulationConfig::scheduling_only(processes, cpus)).unwrap()
    }

    #[test]
    fn zero_probability_never_schedules() {
        let config = SimulationConfig {
            tick_probability: 0.0,
            ..SimulationConfig::scheduling_only(3, 1)
        };
        let mut sim = Simulation::new(&config).unwrap();
        let events = EventQueue::new(4);
        for frame in 0..100 {
            assert!(!sim.tick(frame * 16, &events));
        }
        assert_eq!(sim.process_manager().scheduler_stats().rounds, 0);
        assert_eq!(sim.frames(), 100);
    }

    #[test]
    fn full_probability_schedules_every_frame() {
        let mut sim = scheduling_only(3, 1);
        let events = EventQueue::new(4);
        for frame in 0..10 {
            assert!(sim.tick(frame * 16, &events));
        }
        assert_eq!(sim.process_manager().scheduler_stats().rounds, 10);
    }

    #[test]
    fn same_seed_same_run() {
        let config = SimulationConfig {
            seed: Some(42),
            ..SimulationConfig::default()
        };
        let run = || {
            let mut sim = Simulation::new(&config).unwrap();
            let events = EventQueue::new(8);
            let gates: Vec<bool> = (0..300).map(|frame| sim.tick(frame * 16, &events)).collect();
            (gates, sim.current_stats(), sim.process_manager().scheduler_stats())
        };
        let (gates, stats, scheduler) = run();
        assert_eq!(run(), (gates.clone(), stats, scheduler));

        let rounds = gates.iter().filter(|&&gate| gate).count();
        assert!(rounds > 0 && rounds < 300);
    }

    #[test]
    fn events_are_dispatched_before_scheduling() {
        let mut sim = scheduling_only(2, 2);
        let events = EventQueue::new(4);
        events.push(UserEvent::TerminateProcess(2)).unwrap();
        sim.tick(0, &events);

        assert!(events.is_empty());
        assert!(sim.process_manager().process(2).unwrap().has_ended());
        assert!(sim.process_manager().process(1).unwrap().is_running());
    }

    #[test]
    fn rejected_events_do_not_stop_the_frame() {
        let config = SimulationConfig {
            tick_probability: 0.0,
            ..SimulationConfig::scheduling_only(2, 1)
        };
        let mut sim = Simulation::new(&config).unwrap();
        let events = EventQueue::new(4);
        events.push(UserEvent::ProcessClick(99)).unwrap();
        events.push(UserEvent::ProcessClick(2)).unwrap();
        assert!(!sim.tick(0, &events));

        // pid 2 took the CPU by hand
        assert_eq!(
            sim.process_manager().process(2).unwrap().state(),
            ProcessState::Running(1)
        );
        assert_eq!(
            sim.dispatch(UserEvent::ProcessClick(99)),
            Err(EventError::Process(ProcessError::ProcessNotFound))
        );
    }

    #[test]
    fn clicks_without_queue_or_pages_are_noops() {
        let mut sim = scheduling_only(1, 1);
        assert!(sim.page_manager().is_none());
        assert_eq!(sim.dispatch(UserEvent::IoQueueClick), Ok(()));
        assert_eq!(sim.dispatch(UserEvent::PageClick(1)), Ok(()));
    }

    #[test]
    fn page_click_reaches_page_manager() {
        let config = SimulationConfig {
            enable_paging: true,
            ..SimulationConfig::scheduling_only(1, 1)
        };
        let mut sim = Simulation::new(&config).unwrap();
        assert_eq!(sim.dispatch(UserEvent::PageClick(1)), Ok(()));
        assert_eq!(
            sim.page_manager().unwrap().get(1).unwrap().state(),
            PageState::Swapped
        );
        assert_eq!(
            sim.dispatch(UserEvent::PageClick(5)),
            Err(EventError::Page(PageError::PageNotFound))
        );
    }

    #[test]
    fn autoplay_resolves_pages_after_round() {
        let config = SimulationConfig {
            enable_paging: true,
            autoplay_pages: true,
            ..SimulationConfig::scheduling_only(2, 1)
        };
        let mut sim = Simulation::new(&config).unwrap();
        sim.schedule_now();

        // pid 1 is running on its page; pid 2's idle page got swapped out
        let pages = sim.page_manager().unwrap();
        assert_eq!(pages.get(1).unwrap().state(), PageState::Resident);
        assert_eq!(pages.get(2).unwrap().state(), PageState::Swapped);
    }

    #[test]
    fn handle_shares_one_simulation() {
        let handle = scheduling_only(4, 2).into_handle();
        let reporter = handle.clone();
        let events = EventQueue::new(4);

        assert!(handle.tick(0, &events));
        let stats = reporter.current_stats();
        assert_eq!(stats.cpu_count, 2);
        assert_eq!(stats.free_cpu_count, 0);
        assert_eq!(reporter.lock().frames(), 1);
    }
}
