use std::time::Duration;

use hex_outbreak_core::{
    Command, DetectionMode, DetectionProfile, Event, MaskPolicy, Mitigations, PopulationTargets,
    RingCount,
};
use hex_outbreak_system_cadence::{Cadence, Config};
use hex_outbreak_world::{self as world, query, World};

fn calm_profile() -> DetectionProfile {
    DetectionProfile::new(0.0, DetectionMode::Standard, Mitigations::default())
}

fn sync_command(targets: [f64; 5]) -> Command {
    Command::SyncPopulation {
        targets: PopulationTargets::from_raw(targets),
        masks: MaskPolicy::none(),
    }
}

#[test]
fn emits_one_step_per_elapsed_interval() {
    let mut world = World::new(RingCount::new(2));
    let mut events = Vec::new();
    world::apply(&mut world, sync_command([4.0, 0.0, 0.0, 0.0, 0.0]), &mut events);

    let mut cadence = Cadence::new(Config::new(Duration::from_millis(100)));
    events.clear();
    world::apply(
        &mut world,
        Command::Tick {
            dt: Duration::from_secs(1),
        },
        &mut events,
    );

    let mut commands = Vec::new();
    cadence.handle(&events, calm_profile(), &mut commands);
    assert_eq!(commands.len(), 10, "expected one step per interval");

    for command in commands {
        let mut step_events = Vec::new();
        world::apply(&mut world, command, &mut step_events);
    }
    assert_eq!(query::generation(&world), 10);
}

#[test]
fn sub_interval_time_accumulates_across_batches() {
    let mut cadence = Cadence::new(Config::new(Duration::from_millis(100)));

    let mut commands = Vec::new();
    cadence.handle(
        &[Event::TimeAdvanced {
            dt: Duration::from_millis(60),
        }],
        calm_profile(),
        &mut commands,
    );
    assert!(commands.is_empty(), "no step before a full interval");

    cadence.handle(
        &[Event::TimeAdvanced {
            dt: Duration::from_millis(60),
        }],
        calm_profile(),
        &mut commands,
    );
    assert_eq!(commands.len(), 1, "expected a step once the interval elapsed");
}

#[test]
fn non_time_events_do_not_schedule() {
    let mut cadence = Cadence::new(Config::new(Duration::from_millis(100)));

    let mut commands = Vec::new();
    cadence.handle(&[], calm_profile(), &mut commands);
    cadence.handle(
        &[Event::GridResized {
            rings: RingCount::new(3),
            cells: RingCount::new(3).cell_capacity(),
        }],
        calm_profile(),
        &mut commands,
    );

    assert!(commands.is_empty());
}

#[test]
fn catch_up_cap_bounds_a_stalled_batch() {
    let config = Config::new(Duration::from_millis(100)).with_max_steps_per_batch(30);
    let mut cadence = Cadence::new(config);

    let mut commands = Vec::new();
    cadence.handle(
        &[Event::TimeAdvanced {
            dt: Duration::from_secs(10),
        }],
        calm_profile(),
        &mut commands,
    );
    assert_eq!(commands.len(), 30, "backlog beyond the cap is shed");

    commands.clear();
    cadence.handle(
        &[Event::TimeAdvanced {
            dt: Duration::from_millis(100),
        }],
        calm_profile(),
        &mut commands,
    );
    assert_eq!(commands.len(), 1, "shed backlog must not replay later");
}

#[test]
fn zero_interval_never_schedules() {
    let mut cadence = Cadence::new(Config::new(Duration::ZERO));

    let mut commands = Vec::new();
    cadence.handle(
        &[Event::TimeAdvanced {
            dt: Duration::from_secs(5),
        }],
        calm_profile(),
        &mut commands,
    );

    assert!(commands.is_empty());
}

#[test]
fn quiet_grid_survives_a_thousand_scheduled_generations() {
    let mut world = World::new(RingCount::new(1));
    let mut events = Vec::new();
    world::apply(&mut world, sync_command([1.0, 0.0, 0.0, 0.0, 0.0]), &mut events);
    assert_eq!(query::population(&world).total(), 1);

    let mut cadence = Cadence::new(Config::new(Duration::from_millis(100)));
    for _ in 0..100 {
        events.clear();
        world::apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );
        let mut commands = Vec::new();
        cadence.handle(&events, calm_profile(), &mut commands);
        assert_eq!(commands.len(), 10);
        for command in commands {
            let mut step_events = Vec::new();
            world::apply(&mut world, command, &mut step_events);
        }
    }

    assert_eq!(query::generation(&world), 1_000);
    assert_eq!(query::population(&world).total(), 1);
    assert_eq!(query::infected_count(&world), 0);
    assert!(world.drain_pending_deaths().is_zero());
    assert!(world.drain_pending_replacements().is_zero());
}

#[test]
fn sustained_outbreak_reports_every_death() {
    let mut world = World::with_seed(RingCount::new(1), 23);
    let mut events = Vec::new();
    world::apply(&mut world, sync_command([7.0, 0.0, 0.0, 0.0, 0.0]), &mut events);
    assert_eq!(query::occupied_count(&world), 7);

    let profile = DetectionProfile::new(150.0, DetectionMode::Standard, Mitigations::default());
    let mut cadence = Cadence::new(Config::new(Duration::from_millis(100)));
    let mut deaths = 0u64;
    for _ in 0..30_000 {
        events.clear();
        world::apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(100),
            },
            &mut events,
        );
        let mut commands = Vec::new();
        cadence.handle(&events, profile, &mut commands);
        for command in commands {
            let mut step_events = Vec::new();
            world::apply(&mut world, command, &mut step_events);
        }
        deaths += world.drain_pending_deaths().total();
        if query::empty_count(&world) == 7 {
            break;
        }
    }

    assert_eq!(deaths, 7, "every death must be reported exactly once");
    assert_eq!(query::occupied_count(&world), 0);
}
