// Headless frame loop for schedsim
use std::process::ExitCode;

use log::LevelFilter;
use schedsim::{logger, EventQueue, Simulation, SimulationConfig};

const FPS: u64 = 60;
const FRAME_MS: u64 = 1000 / FPS;
/// One simulated minute
const FRAMES: u64 = FPS * 60;
const REPORT_EVERY: u64 = FPS * 10;

fn main() -> ExitCode {
    let level = std::env::var("SCHEDSIM_LOG")
        .ok()
        .and_then(|name| logger::parse_level(&name))
        .unwrap_or(LevelFilter::Info);
    if let Err(e) = logger::init(level) {
        eprintln!("logger already installed: {}", e);
    }

    let seed = std::env::args().nth(1).and_then(|arg| arg.parse().ok());
    let config = SimulationConfig {
        seed,
        ..SimulationConfig::default()
    };

    let mut sim = match Simulation::new(&config) {
        Ok(sim) => sim,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let events = EventQueue::new(config.event_capacity);

    log::info!(
        "Simulating {} processes on {} CPUs for {} frames (seed {:?})",
        config.process_count,
        config.cpu_count,
        FRAMES,
        seed
    );

    for frame in 0..FRAMES {
        sim.tick(frame * FRAME_MS, &events);

        if (frame + 1) % REPORT_EVERY == 0 {
            let stats = sim.current_stats();
            log::info!(
                "t={}s active by starvation {:?}, {} waiting, {} blocked, {} ended",
                (frame + 1) / FPS,
                stats.active_process_count_by_starvation_level,
                stats.waiting_count,
                stats.blocked_count,
                stats.ended_count
            );
        }
    }

    let manager = sim.process_manager();
    let scheduler = manager.scheduler_stats();
    println!(
        "{} rounds, {} grants, {} revocations, {} starved waits",
        scheduler.rounds, scheduler.grants, scheduler.revocations, scheduler.starved_waits
    );
    for process in manager.processes() {
        println!(
            "  PID {:>2}: {:?}, starvation {}, cpu time {} ms",
            process.pid(),
            process.state(),
            process.starvation_level(),
            process.cpu_time_ms()
        );
    }
    ExitCode::SUCCESS
}
