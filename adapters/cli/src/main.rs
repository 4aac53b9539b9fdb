#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives the Hex Outbreak simulation.
//!
//! The binary plays the role of the incremental game's economy layer: it owns
//! the population ledger, feeds the world sync targets once per second, and
//! debits its own counters from the death and replacement drains. Run it with
//! a window for the hex-grid visual, or `--headless` for a text status feed.

mod scenario;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use hex_outbreak_core::{
    Command, DetectionMode, DetectionProfile, Event, MaskPolicy, Mitigations, PopulationTargets,
    RingCount, TierCounts, STEPS_PER_SECOND, STEP_INTERVAL, TIER_COUNT,
};
use hex_outbreak_rendering::{
    cell_color, CellPresentation, HemisphereExtent, HexGridPresentation, Presentation,
    ProjectionMode, RenderingBackend, Scene, BACKGROUND_COLOR, CELL_OUTLINE_COLOR,
};
use hex_outbreak_rendering_macroquad::MacroquadBackend;
use hex_outbreak_system_cadence::{Cadence, Config as CadenceConfig};
use hex_outbreak_world::{self as world, query, World};
use serde::Deserialize;

use crate::scenario::Scenario;

/// Simulated time between ledger drains and population re-syncs.
const RESYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Command-line options accepted by the Hex Outbreak driver.
#[derive(Debug, Parser)]
#[command(name = "hex-outbreak", about = "Hex-grid infection simulation driver")]
struct Options {
    /// Per-tier bot populations in ascending tier order.
    #[arg(long, value_delimiter = ',', default_value = "32,8,2,0,0")]
    bots: Vec<f64>,

    /// Per-tier population growth per second in ascending tier order.
    #[arg(long, value_delimiter = ',', default_value = "1.5,0.4,0.1,0,0")]
    growth: Vec<f64>,

    /// Mask budget afforded by the economy.
    #[arg(long, default_value_t = 4.0)]
    masks: f64,

    /// Purchased mask upgrades; each doubles mask and immunity durations.
    #[arg(long, default_value_t = 0)]
    mask_upgrades: u32,

    /// Posts per second produced by the bot network.
    #[arg(long, default_value_t = 150.0)]
    throughput: f64,

    /// Halves the spontaneous detection rate.
    #[arg(long)]
    encrypted_links: bool,

    /// Quarters the spontaneous detection rate.
    #[arg(long)]
    relay_shield: bool,

    /// Runs the late-game uncapped regime where masks stop mattering.
    #[arg(long)]
    uncapped: bool,

    /// Seed for the world's random decisions.
    #[arg(long, default_value_t = 0x5eed_cafe)]
    seed: u64,

    /// Simulated seconds to run without opening a window.
    #[arg(long, value_name = "SECONDS")]
    headless: Option<u64>,

    /// Encoded scenario string overriding the individual flags.
    #[arg(long)]
    scenario: Option<String>,

    /// Prints the encoded scenario for the current flags and exits.
    #[arg(long)]
    print_scenario: bool,

    /// Path to a TOML tuning file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Synchronises presentation with the display refresh rate.
    #[arg(long)]
    vsync: bool,

    /// Prints frame timing metrics once per second.
    #[arg(long)]
    show_fps: bool,
}

/// Presentation tuning loaded from an optional TOML file.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Tuning {
    /// Simulated milliseconds between infection generations.
    step_interval_ms: u64,
    /// Fraction of the hemisphere covered by the dome projection.
    hemisphere_extent: f32,
    /// Projection active when the window opens.
    projection: ProjectionSetting,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            step_interval_ms: STEP_INTERVAL.as_millis() as u64,
            hemisphere_extent: HemisphereExtent::DEFAULT.get(),
            projection: ProjectionSetting::Flat,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ProjectionSetting {
    Flat,
    Hemisphere,
}

impl From<ProjectionSetting> for ProjectionMode {
    fn from(setting: ProjectionSetting) -> Self {
        match setting {
            ProjectionSetting::Flat => ProjectionMode::Flat,
            ProjectionSetting::Hemisphere => ProjectionMode::Hemisphere,
        }
    }
}

/// Population and mask counters owned by the economy stand-in.
///
/// The grid is only ever an approximation of these numbers; deaths and
/// replacements reported by the world flow back into them, never the
/// other way around.
#[derive(Clone, Copy, Debug)]
struct Ledger {
    bots: [f64; TIER_COUNT],
    growth: [f64; TIER_COUNT],
    masks: f64,
}

impl Ledger {
    fn targets(&self) -> PopulationTargets {
        PopulationTargets::from_raw(self.bots)
    }

    fn accrue(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f64();
        for (count, rate) in self.bots.iter_mut().zip(self.growth.iter()) {
            *count += rate * seconds;
        }
    }

    fn debit(&mut self, losses: TierCounts) {
        for (tier, count) in losses.iter() {
            let slot = &mut self.bots[tier.index()];
            *slot = (*slot - count as f64).max(0.0);
        }
    }

    fn consume_masks(&mut self, count: u32) {
        self.masks = (self.masks - f64::from(count)).max(0.0);
    }
}

/// Stand-in for the external game layer that owns the world.
#[derive(Debug)]
struct Driver {
    world: World,
    cadence: Cadence,
    ledger: Ledger,
    profile: DetectionProfile,
    mask_multiplier: f64,
    resync_accumulator: Duration,
    total_deaths: u64,
}

impl Driver {
    fn new(scenario: &Scenario, tuning: &Tuning) -> Self {
        let mode = if scenario.uncapped {
            DetectionMode::Uncapped
        } else {
            DetectionMode::Standard
        };
        let mitigations = Mitigations::new(scenario.encrypted_links, scenario.relay_shield);
        let mut driver = Self {
            world: World::with_seed(RingCount::new(2), scenario.seed),
            cadence: Cadence::new(CadenceConfig::new(Duration::from_millis(
                tuning.step_interval_ms,
            ))),
            ledger: Ledger {
                bots: scenario.bots,
                growth: scenario.growth,
                masks: scenario.masks,
            },
            profile: DetectionProfile::new(scenario.throughput, mode, mitigations),
            mask_multiplier: scenario.mask_duration_multiplier,
            resync_accumulator: Duration::ZERO,
            total_deaths: 0,
        };
        driver.resync();
        driver
    }

    fn world(&self) -> &World {
        &self.world
    }

    /// Advances simulated time, scheduling generations through the cadence
    /// system and re-syncing the ledger once per [`RESYNC_INTERVAL`].
    fn advance(&mut self, dt: Duration) {
        self.ledger.accrue(dt);

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt }, &mut events);

        let mut commands = Vec::new();
        self.cadence.handle(&events, self.profile, &mut commands);
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        self.handle_events(&events);

        self.resync_accumulator += dt;
        if self.resync_accumulator >= RESYNC_INTERVAL {
            self.resync_accumulator -= RESYNC_INTERVAL;
            self.resync();
        }
    }

    /// Drains the death and replacement ledgers into the economy's counters,
    /// then hands the world fresh targets.
    fn resync(&mut self) {
        let deaths = self.world.drain_pending_deaths();
        self.total_deaths += deaths.total();
        self.ledger.debit(deaths);
        self.ledger.debit(self.world.drain_pending_replacements());

        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::SyncPopulation {
                targets: self.ledger.targets(),
                masks: MaskPolicy::new(self.ledger.masks, self.mask_multiplier),
            },
            &mut events,
        );
        self.handle_events(&events);
    }

    fn handle_events(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::MasksConsumed { count } => self.ledger.consume_masks(*count),
                Event::GridResized { rings, cells } => {
                    println!("grid grew to {} rings ({cells} cells)", rings.get());
                }
                _ => {}
            }
        }
    }

    /// Rebuilds the scene's cell list from the authoritative grid snapshot.
    fn populate_scene(&self, scene: &mut Scene) {
        let view = query::grid_view(&self.world);
        scene.grid.rings = view.rings();
        scene.cells.clear();
        scene.cells.extend(view.iter().map(|snapshot| {
            CellPresentation::new(snapshot.coord, cell_color(snapshot.state, snapshot.masked))
        }));
    }

    fn status_line(&self) -> String {
        let census = query::population(&self.world);
        format!(
            "t={:>4}s gen={:>5} bots={:>5} infected={:>3} masked={:>3} deaths={:>4}",
            query::clock(&self.world).as_secs(),
            query::generation(&self.world),
            census.total(),
            query::infected_count(&self.world),
            query::masked_count(&self.world),
            self.total_deaths,
        )
    }
}

fn tier_values(values: &[f64]) -> [f64; TIER_COUNT] {
    let mut tiers = [0.0; TIER_COUNT];
    for (slot, value) in tiers.iter_mut().zip(values.iter()) {
        *slot = *value;
    }
    tiers
}

fn scenario_from_options(options: &Options) -> Result<Scenario> {
    if let Some(encoded) = &options.scenario {
        return Scenario::decode(encoded).context("invalid --scenario string");
    }

    Ok(Scenario {
        bots: tier_values(&options.bots),
        growth: tier_values(&options.growth),
        masks: options.masks,
        mask_duration_multiplier: 2f64.powi(options.mask_upgrades as i32),
        throughput: options.throughput,
        encrypted_links: options.encrypted_links,
        relay_shield: options.relay_shield,
        uncapped: options.uncapped,
        seed: options.seed,
    })
}

fn load_tuning(path: Option<&Path>) -> Result<Tuning> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("could not read tuning file {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("could not parse tuning file {}", path.display()))
        }
        None => Ok(Tuning::default()),
    }
}

fn run_headless(mut driver: Driver, seconds: u64) {
    for _ in 0..seconds {
        for _ in 0..STEPS_PER_SECOND {
            driver.advance(STEP_INTERVAL);
        }
        println!("{}", driver.status_line());
    }
}

fn run_windowed(mut driver: Driver, tuning: &Tuning, options: &Options) -> Result<()> {
    let extent = HemisphereExtent::new(tuning.hemisphere_extent)?;
    let grid = HexGridPresentation::new(query::rings(driver.world()), extent, CELL_OUTLINE_COLOR);
    let mut scene = Scene::new(grid, Vec::new(), tuning.projection.into());
    driver.populate_scene(&mut scene);

    let presentation = Presentation::new("Hex Outbreak", BACKGROUND_COLOR, scene);
    let backend = MacroquadBackend::new()
        .with_vsync(options.vsync)
        .with_show_fps(options.show_fps);

    backend.run(presentation, move |frame_dt, input, scene| {
        if input.projection_toggle {
            scene.projection = scene.projection.toggled();
        }
        driver.advance(frame_dt);
        driver.populate_scene(scene);
    })
}

/// Entry point for the Hex Outbreak command-line interface.
fn main() -> Result<()> {
    let options = Options::parse();
    let tuning = load_tuning(options.config.as_deref())?;
    let scenario = scenario_from_options(&options)?;

    if options.print_scenario {
        println!("{}", scenario.encode());
        return Ok(());
    }

    let driver = Driver::new(&scenario, &tuning);
    println!("{}", query::welcome_banner(driver.world()));

    match options.headless {
        Some(seconds) => {
            run_headless(driver, seconds);
            Ok(())
        }
        None => run_windowed(driver, &tuning, &options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_outbreak_core::BotTier;

    fn quiet_scenario() -> Scenario {
        Scenario {
            bots: [5.0, 2.0, 0.0, 0.0, 0.0],
            growth: [0.0; TIER_COUNT],
            masks: 0.0,
            mask_duration_multiplier: 1.0,
            throughput: 0.0,
            encrypted_links: false,
            relay_shield: false,
            uncapped: false,
            seed: 3,
        }
    }

    #[test]
    fn tier_values_pad_and_truncate() {
        assert_eq!(tier_values(&[1.0, 2.0]), [1.0, 2.0, 0.0, 0.0, 0.0]);
        assert_eq!(
            tier_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            [1.0, 2.0, 3.0, 4.0, 5.0]
        );
    }

    #[test]
    fn ledger_debits_saturate_at_zero() {
        let mut ledger = Ledger {
            bots: [1.5, 0.0, 0.0, 0.0, 0.0],
            growth: [0.0; TIER_COUNT],
            masks: 1.0,
        };
        let [first, ..] = BotTier::ALL;
        let mut losses = TierCounts::new();
        losses.record(first);
        losses.record(first);

        ledger.debit(losses);
        assert_eq!(ledger.bots[0], 0.0);

        ledger.consume_masks(3);
        assert_eq!(ledger.masks, 0.0);
    }

    #[test]
    fn ledger_accrues_growth_per_second() {
        let mut ledger = Ledger {
            bots: [0.0; TIER_COUNT],
            growth: [2.0, 0.5, 0.0, 0.0, 0.0],
            masks: 0.0,
        };

        ledger.accrue(Duration::from_millis(500));

        assert!((ledger.bots[0] - 1.0).abs() < 1e-9);
        assert!((ledger.bots[1] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn tuning_defaults_match_the_simulation_cadence() {
        let tuning = Tuning::default();
        assert_eq!(tuning.step_interval_ms, 100);
        assert_eq!(tuning.projection, ProjectionSetting::Flat);
    }

    #[test]
    fn tuning_parses_partial_toml() {
        let tuning: Tuning =
            toml::from_str("projection = \"hemisphere\"\nhemisphere_extent = 0.5\n")
                .expect("tuning parses");

        assert_eq!(tuning.projection, ProjectionSetting::Hemisphere);
        assert!((tuning.hemisphere_extent - 0.5).abs() < 1e-6);
        assert_eq!(tuning.step_interval_ms, 100);
    }

    #[test]
    fn tuning_rejects_unknown_fields() {
        assert!(toml::from_str::<Tuning>("steps = 12\n").is_err());
    }

    #[test]
    fn driver_seeds_the_grid_from_the_ledger() {
        let driver = Driver::new(&quiet_scenario(), &Tuning::default());

        assert_eq!(query::population(driver.world()).total(), 7);
    }

    #[test]
    fn quiet_driver_holds_population_steady() {
        let mut driver = Driver::new(&quiet_scenario(), &Tuning::default());

        for _ in 0..30 {
            for _ in 0..STEPS_PER_SECOND {
                driver.advance(STEP_INTERVAL);
            }
        }

        assert_eq!(query::population(driver.world()).total(), 7);
        assert_eq!(driver.total_deaths, 0);
        assert_eq!(query::generation(driver.world()), 300);
    }

    #[test]
    fn growing_ledger_expands_the_grid_population() {
        let mut scenario = quiet_scenario();
        scenario.growth = [2.0, 0.0, 0.0, 0.0, 0.0];
        let mut driver = Driver::new(&scenario, &Tuning::default());

        for _ in 0..10 {
            for _ in 0..STEPS_PER_SECOND {
                driver.advance(STEP_INTERVAL);
            }
        }

        let census = query::population(driver.world());
        assert!(
            census.total() >= 25,
            "population should track accrued growth, got {}",
            census.total()
        );
    }

    #[test]
    fn scene_population_mirrors_the_grid() {
        let driver = Driver::new(&quiet_scenario(), &Tuning::default());
        let grid = HexGridPresentation::new(
            query::rings(driver.world()),
            HemisphereExtent::DEFAULT,
            CELL_OUTLINE_COLOR,
        );
        let mut scene = Scene::new(grid, Vec::new(), ProjectionMode::Flat);

        driver.populate_scene(&mut scene);

        assert_eq!(
            scene.cells.len() as u32,
            query::rings(driver.world()).cell_capacity()
        );
    }
}
