// Full simulation runs: IO, paging, user events and tick gating
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schedsim::{
    BlockReason, EndReason, EventQueue, PageState, ProcessState, Simulation, SimulationConfig,
    UserEvent,
};

fn random_event(rng: &mut StdRng) -> UserEvent {
    match rng.random_range(0..4) {
        0 => UserEvent::IoQueueClick,
        1 => UserEvent::PageClick(rng.random_range(1..=12)),
        2 => UserEvent::ProcessClick(rng.random_range(1..=11)),
        _ => UserEvent::TerminateProcess(rng.random_range(1..=11)),
    }
}

#[test]
fn invariants_hold_under_random_play() {
    for seed in 0..4 {
        let config = SimulationConfig {
            seed: Some(seed),
            tick_probability: 0.3,
            io_request_probability: 0.05,
            process_lifespan_ms: Some(3_000),
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::new(&config).unwrap();
        let events = EventQueue::new(config.event_capacity);
        let mut player = StdRng::seed_from_u64(seed + 100);

        for frame in 0..2_000u64 {
            if player.random_bool(0.05) {
                let _ = events.push(random_event(&mut player));
            }
            sim.tick(frame * 16, &events);

            let manager = sim.process_manager();
            assert_eq!(manager.check_invariants(), Ok(()), "seed {} frame {}", seed, frame);
            assert!(manager.running_count() <= manager.cpu_count());

            let stats = sim.current_stats();
            let active: usize = stats.active_process_count_by_starvation_level.iter().sum();
            assert_eq!(active, manager.running_count());
            assert_eq!(stats.free_cpu_count, stats.cpu_count - active);
            assert!(stats.terminated_by_user_count <= config.termination_slots);
        }
    }
}

#[test]
fn processes_complete_over_time() {
    let config = SimulationConfig {
        seed: Some(3),
        tick_probability: 0.5,
        io_request_probability: 0.0,
        enable_paging: false,
        process_lifespan_ms: Some(500),
        ..SimulationConfig::default()
    };
    let mut sim = Simulation::new(&config).unwrap();
    let events = EventQueue::new(4);
    for frame in 0..5_000u64 {
        sim.tick(frame * 16, &events);
    }

    let manager = sim.process_manager();
    assert!(manager
        .processes()
        .iter()
        .all(|p| p.state() == ProcessState::Ended(EndReason::Completed)));
    assert!(manager.processes().iter().all(|p| p.cpu_time_ms() >= 500));
    assert_eq!(sim.current_stats().free_cpu_count, 4);
}

#[test]
fn io_blocked_process_waits_for_click() {
    let config = SimulationConfig {
        enable_io_queue: true,
        io_request_probability: 1.0,
        ..SimulationConfig::scheduling_only(1, 1)
    };
    let mut sim = Simulation::new(&config).unwrap();
    let events = EventQueue::new(4);

    sim.tick(0, &events);
    sim.tick(16, &events);
    let pid_state = |sim: &Simulation| sim.process_manager().process(1).unwrap().state();
    assert_eq!(pid_state(&sim), ProcessState::Blocked(BlockReason::Io));

    for frame in 2..10 {
        sim.tick(frame * 16, &events);
        assert_eq!(pid_state(&sim), ProcessState::Blocked(BlockReason::Io));
    }

    events.push(UserEvent::IoQueueClick).unwrap();
    sim.tick(160, &events);
    // Serviced, then granted again in the same frame's round
    assert!(sim.process_manager().process(1).unwrap().is_running());
    assert!(sim.process_manager().io_queue().unwrap().is_servicing());
}

#[test]
fn page_fault_resolved_by_click() {
    let config = SimulationConfig {
        enable_paging: true,
        ..SimulationConfig::scheduling_only(1, 1)
    };
    let mut sim = Simulation::new(&config).unwrap();
    let events = EventQueue::new(4);

    // Swap the idle page out, then let the process run into it
    sim.dispatch(UserEvent::PageClick(1)).unwrap();
    sim.tick(0, &events);
    sim.tick(16, &events);
    let process = sim.process_manager().process(1).unwrap();
    assert_eq!(process.state(), ProcessState::Blocked(BlockReason::PageFault));
    let page = sim.page_manager().unwrap().get(1).unwrap();
    assert!(page.in_use() && page.in_swap());

    events.push(UserEvent::PageClick(1)).unwrap();
    sim.tick(32, &events);
    assert!(sim.process_manager().process(1).unwrap().is_running());
    assert_eq!(
        sim.page_manager().unwrap().get(1).unwrap().state(),
        PageState::Resident
    );
}

#[test]
fn autoplay_keeps_the_default_machine_moving() {
    let config = SimulationConfig {
        seed: Some(11),
        process_lifespan_ms: None,
        ..SimulationConfig::default()
    };
    let mut sim = Simulation::new(&config).unwrap();
    let events = EventQueue::new(4);
    for frame in 0..6_000u64 {
        sim.tick(frame * 16, &events);
    }
    let manager = sim.process_manager();
    assert!(manager.processes().iter().all(|p| p.cpu_time_ms() > 0));
    assert!(manager.scheduler_stats().grants >= 10);
}
