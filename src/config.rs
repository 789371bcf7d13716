// Simulation configuration for schedsim
use core::fmt;

/// Processes created at setup in the reference wiring
pub const DEFAULT_PROCESS_COUNT: usize = 10;
/// CPUs created at setup in the reference wiring
pub const DEFAULT_CPU_COUNT: usize = 4;
/// Roughly one frame in ten performs a scheduling round
pub const DEFAULT_TICK_PROBABILITY: f64 = 0.1;
/// Slots available for processes terminated by the user
pub const DEFAULT_TERMINATION_SLOTS: usize = 5;
/// Bounded capacity of the user event queue
pub const DEFAULT_EVENT_CAPACITY: usize = 100;
/// Starvation buckets reported by the stats snapshot (levels 0..=5)
pub const DEFAULT_STATS_LEVELS: usize = 6;
/// Per-frame chance that a running process asks for IO
pub const DEFAULT_IO_REQUEST_PROBABILITY: f64 = 0.01;
/// CPU time a process needs before it completes on its own
pub const DEFAULT_PROCESS_LIFESPAN_MS: u64 = 20_000;

/// Tunables for one simulation run.
///
/// `Default` reproduces the reference wiring: 10 processes sharing
/// 4 CPUs, one IO queue and one page per process.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub process_count: usize,
    pub cpu_count: usize,
    /// Chance in `[0, 1]` that a frame runs a scheduling round
    pub tick_probability: f64,
    /// Value starvation is reset to when a CPU is granted
    pub starvation_floor: u32,
    pub stats_levels: usize,
    pub termination_slots: usize,
    pub event_capacity: usize,
    pub enable_io_queue: bool,
    pub enable_paging: bool,
    /// Chance in `[0, 1]` that a running process blocks on IO each frame
    pub io_request_probability: f64,
    /// `None` means processes never complete on their own
    pub process_lifespan_ms: Option<u64>,
    /// Click the IO queue after every scheduling round
    pub autoplay_io: bool,
    /// Click every transitional page after every scheduling round
    pub autoplay_pages: bool,
    /// Seed for the default random source, OS entropy when `None`
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            process_count: DEFAULT_PROCESS_COUNT,
            cpu_count: DEFAULT_CPU_COUNT,
            tick_probability: DEFAULT_TICK_PROBABILITY,
            starvation_floor: 0,
            stats_levels: DEFAULT_STATS_LEVELS,
            termination_slots: DEFAULT_TERMINATION_SLOTS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            enable_io_queue: true,
            enable_paging: true,
            io_request_probability: DEFAULT_IO_REQUEST_PROBABILITY,
            process_lifespan_ms: Some(DEFAULT_PROCESS_LIFESPAN_MS),
            autoplay_io: true,
            autoplay_pages: true,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Pure scheduling: no IO requests, no paging, no natural completion
    /// and a scheduling round on every tick.
    pub fn scheduling_only(process_count: usize, cpu_count: usize) -> Self {
        Self {
            process_count,
            cpu_count,
            tick_probability: 1.0,
            enable_io_queue: false,
            enable_paging: false,
            io_request_probability: 0.0,
            process_lifespan_ms: None,
            autoplay_io: false,
            autoplay_pages: false,
            seed: Some(0),
            ..Self::default()
        }
    }

    /// Check the values that would otherwise panic at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.tick_probability) {
            return Err(ConfigError::InvalidProbability("tick_probability"));
        }
        if !(0.0..=1.0).contains(&self.io_request_probability) {
            return Err(ConfigError::InvalidProbability("io_request_probability"));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }
        if self.stats_levels == 0 {
            return Err(ConfigError::ZeroStatsLevels);
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    InvalidProbability(&'static str),
    ZeroEventCapacity,
    ZeroStatsLevels,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::InvalidProbability(field) => {
                write!(f, "{} must be within [0, 1]", field)
            }
            ConfigError::ZeroEventCapacity => write!(f, "Event queue capacity must be non-zero"),
            ConfigError::ZeroStatsLevels => write!(f, "Stats need at least one starvation level"),
        }
    }
}

impl std::error::Error for ConfigError {}
