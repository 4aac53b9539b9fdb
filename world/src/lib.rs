#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Hex Outbreak.
//!
//! The world owns the hexagonal lattice, the simulation clock, and the
//! infection automaton. Adapters mutate it exclusively through [`apply`];
//! the per-tier death and replacement ledgers are drained through the
//! dedicated get-and-clear methods because their read *is* a mutation.

mod grid;

use std::time::Duration;

use hex_outbreak_core::{
    AxialCoord, BotTier, CellState, Command, DetectionMode, DetectionProfile, Event, MaskPolicy,
    PopulationTargets, RingCount, TierCounts, STEPS_PER_SECOND, WELCOME_BANNER,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::grid::{Cell, HexGrid};

const OUTBREAK_SEED: u64 = 0x517c_c1b7_2722_0a95;

/// Probability per second that detection claims an unmasked bot at full
/// throughput in standard mode.
const BASE_DETECTION_RATE: f64 = 0.01;

/// Throughput below which standard-mode detection never fires spontaneously.
const DETECTION_THROUGHPUT_FLOOR: f64 = 100.0;

/// Probability per second of a spontaneous infection in uncapped mode.
const UNCAPPED_DETECTION_RATE: f64 = 1.0 / 20_000.0;

/// Base lifetime of a mask before it expires into an immunity window.
const MASK_DURATION: Duration = Duration::from_secs(10);

/// Base length of the immunity window granted when a mask expires.
const IMMUNITY_DURATION: Duration = Duration::from_secs(5);

/// Represents the authoritative Hex Outbreak world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    grid: HexGrid,
    clock: Duration,
    generation: u64,
    rng: ChaCha8Rng,
    pending_deaths: TierCounts,
    pending_replacements: TierCounts,
    next_states: Vec<CellState>,
}

impl World {
    /// Creates a new world spanning the provided ring count.
    #[must_use]
    pub fn new(rings: RingCount) -> Self {
        Self::with_seed(rings, OUTBREAK_SEED)
    }

    /// Creates a new world whose random decisions replay for a given seed.
    #[must_use]
    pub fn with_seed(rings: RingCount, seed: u64) -> Self {
        Self {
            banner: WELCOME_BANNER,
            grid: HexGrid::new(rings),
            clock: Duration::ZERO,
            generation: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            pending_deaths: TierCounts::new(),
            pending_replacements: TierCounts::new(),
            next_states: Vec::new(),
        }
    }

    /// Returns the deaths accumulated since the last drain and resets the
    /// counters to zero atomically.
    #[must_use]
    pub fn drain_pending_deaths(&mut self) -> TierCounts {
        std::mem::take(&mut self.pending_deaths)
    }

    /// Returns the tier-replacement evictions accumulated since the last
    /// drain and resets the counters to zero atomically.
    #[must_use]
    pub fn drain_pending_replacements(&mut self) -> TierCounts {
        std::mem::take(&mut self.pending_replacements)
    }

    fn grow_grid(&mut self, rings: RingCount, out_events: &mut Vec<Event>) {
        if self.grid.grow(rings) {
            out_events.push(Event::GridResized {
                rings,
                cells: rings.cell_capacity(),
            });
        }
    }

    fn sync_population(
        &mut self,
        targets: PopulationTargets,
        masks: MaskPolicy,
        out_events: &mut Vec<Event>,
    ) {
        let required = RingCount::required_for(targets.total_floored());
        self.grow_grid(required, out_events);

        let census = occupied_census(&self.grid);
        let mut placed = TierCounts::new();
        let mut dropped = 0u64;
        for tier in BotTier::ALL {
            let missing = targets.floored(tier).saturating_sub(census.of(tier));
            for _ in 0..missing {
                match self.place_bot(tier) {
                    Placement::Fresh => placed.record(tier),
                    Placement::Evicted(evicted) => {
                        placed.record(tier);
                        self.pending_replacements.record(evicted);
                    }
                    Placement::Dropped => dropped = dropped.saturating_add(1),
                }
            }
        }

        self.reconcile_masks(masks, out_events);
        out_events.push(Event::PopulationSynced { placed, dropped });
    }

    /// Places one bot, preferring a random empty cell and falling back to
    /// evicting a random strictly lower-tier occupant.
    fn place_bot(&mut self, tier: BotTier) -> Placement {
        let empties: Vec<usize> = self
            .grid
            .cells()
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.state == CellState::Empty)
            .map(|(slot, _)| slot)
            .collect();
        if let Some(&slot) = empties.choose(&mut self.rng) {
            self.grid.cells_mut()[slot].state = CellState::Occupied(tier);
            return Placement::Fresh;
        }

        let lower: Vec<(usize, BotTier)> = self
            .grid
            .cells()
            .iter()
            .enumerate()
            .filter_map(|(slot, cell)| {
                cell.state
                    .occupant()
                    .filter(|occupant| tier.outranks(*occupant))
                    .map(|occupant| (slot, occupant))
            })
            .collect();
        if let Some(&(slot, evicted)) = lower.choose(&mut self.rng) {
            self.grid.cells_mut()[slot].state = CellState::Occupied(tier);
            return Placement::Evicted(evicted);
        }

        Placement::Dropped
    }

    fn reconcile_masks(&mut self, policy: MaskPolicy, out_events: &mut Vec<Event>) {
        let clock = self.clock;
        let mask_duration = scale_duration(MASK_DURATION, policy.duration_multiplier());
        let immunity_duration = scale_duration(IMMUNITY_DURATION, policy.duration_multiplier());

        let mut consumed = 0u32;
        for cell in self.grid.cells_mut() {
            if let Some(since) = cell.masked_since {
                if clock.saturating_sub(since) > mask_duration {
                    cell.masked_since = None;
                    cell.immune_until = Some(clock.saturating_add(immunity_duration));
                    consumed = consumed.saturating_add(1);
                }
            }
            if let Some(until) = cell.immune_until {
                if clock >= until {
                    cell.immune_until = None;
                }
            }
        }

        let budget = (policy.budget() - f64::from(consumed)).max(0.0);
        let target_masked = budget.floor() as u64;
        let currently_masked = u64::from(masked_cell_count(&self.grid));
        let needed = target_masked.saturating_sub(currently_masked);
        if needed > 0 {
            let mut candidates: Vec<usize> = self
                .grid
                .cells()
                .iter()
                .enumerate()
                .filter(|(_, cell)| cell.state.occupant().is_some() && !cell.is_masked())
                .map(|(slot, _)| slot)
                .collect();
            let take = usize::try_from(needed)
                .unwrap_or(usize::MAX)
                .min(candidates.len());
            let (chosen, _) = candidates.partial_shuffle(&mut self.rng, take);
            for slot in chosen.iter().copied() {
                self.grid.cells_mut()[slot].masked_since = Some(clock);
            }
        }

        if consumed > 0 {
            out_events.push(Event::MasksConsumed { count: consumed });
        }
    }

    /// Advances the automaton one generation with a synchronous two-phase
    /// update: next states are decided from the current generation only,
    /// then committed in a separate pass.
    fn advance_generation(&mut self, profile: DetectionProfile, out_events: &mut Vec<Event>) {
        let clock = self.clock;
        let cell_count = self.grid.cells().len();

        self.next_states.clear();
        self.next_states
            .extend(self.grid.cells().iter().map(|cell| cell.state));

        for slot in 0..cell_count {
            let coord = self.grid.coords()[slot];
            let cell = self.grid.cells()[slot];
            let next = match cell.state {
                CellState::Occupied(_) => {
                    if self.succumbs_to_infection(coord, cell, profile, clock) {
                        CellState::Infected
                    } else {
                        continue;
                    }
                }
                CellState::Infected => CellState::Decaying,
                CellState::Decaying => CellState::Empty,
                CellState::Empty => continue,
            };
            self.next_states[slot] = next;
        }

        let mut perished = TierCounts::new();
        let mut infected = 0u32;
        for slot in 0..cell_count {
            let next = self.next_states[slot];
            let cell = &mut self.grid.cells_mut()[slot];
            match (cell.state, next) {
                (CellState::Occupied(tier), CellState::Infected) => {
                    cell.fallen_tier = Some(tier);
                    infected = infected.saturating_add(1);
                }
                (CellState::Decaying, CellState::Empty) => {
                    cell.masked_since = None;
                    cell.immune_until = None;
                    if let Some(tier) = cell.fallen_tier.take() {
                        perished.record(tier);
                        self.pending_deaths.record(tier);
                    }
                }
                _ => {}
            }
            cell.state = next;
        }

        self.generation = self.generation.saturating_add(1);
        out_events.push(Event::GenerationAdvanced {
            generation: self.generation,
            infected,
            perished,
        });
    }

    fn succumbs_to_infection(
        &mut self,
        coord: AxialCoord,
        cell: Cell,
        profile: DetectionProfile,
        clock: Duration,
    ) -> bool {
        let infected_neighbors = infected_neighbor_count(&self.grid, coord);
        match profile.mode() {
            DetectionMode::Uncapped => {
                infected_neighbors >= 1
                    || spontaneous_roll(
                        &mut self.rng,
                        UNCAPPED_DETECTION_RATE,
                        profile.mitigations().multiplier(),
                    )
            }
            DetectionMode::Standard => {
                if cell.is_immune(clock) {
                    false
                } else if cell.is_masked() {
                    infected_neighbors >= 2
                } else if infected_neighbors >= 1 {
                    true
                } else if profile.throughput() < DETECTION_THROUGHPUT_FLOOR {
                    false
                } else {
                    spontaneous_roll(
                        &mut self.rng,
                        BASE_DETECTION_RATE,
                        profile.mitigations().multiplier(),
                    )
                }
            }
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SyncPopulation { targets, masks } => {
            world.sync_population(targets, masks, out_events);
        }
        Command::Tick { dt } => {
            world.clock = world.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::Step { profile } => {
            world.advance_generation(profile, out_events);
        }
        Command::ResizeGrid { rings } => {
            world.grow_grid(rings, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{infected_cell_count, masked_cell_count, occupied_census, World};
    use hex_outbreak_core::{AxialCoord, CellSnapshot, CellState, GridView, RingCount, TierCounts};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Number of rings currently spanned by the grid.
    #[must_use]
    pub fn rings(world: &World) -> RingCount {
        world.grid.rings()
    }

    /// Simulated time elapsed since the world was created.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Number of infection generations completed so far.
    #[must_use]
    pub fn generation(world: &World) -> u64 {
        world.generation
    }

    /// Counts the healthy occupants currently on the grid, grouped by tier.
    #[must_use]
    pub fn population(world: &World) -> TierCounts {
        occupied_census(&world.grid)
    }

    /// Number of cells currently wearing a mask.
    #[must_use]
    pub fn masked_count(world: &World) -> u32 {
        masked_cell_count(&world.grid)
    }

    /// Number of cells currently in the actively infected state.
    #[must_use]
    pub fn infected_count(world: &World) -> u32 {
        infected_cell_count(&world.grid)
    }

    /// Number of cells holding a healthy occupant.
    #[must_use]
    pub fn occupied_count(world: &World) -> u32 {
        occupied_census(&world.grid).total() as u32
    }

    /// Number of cells with no resident bot.
    #[must_use]
    pub fn empty_count(world: &World) -> u32 {
        world
            .grid
            .cells()
            .iter()
            .filter(|cell| cell.state == CellState::Empty)
            .count() as u32
    }

    /// Captures the state of a single cell, or `None` outside the grid.
    #[must_use]
    pub fn cell(world: &World, coord: AxialCoord) -> Option<CellSnapshot> {
        let slot = world.grid.index(coord)?;
        let cell = world.grid.cells()[slot];
        Some(CellSnapshot {
            coord,
            state: cell.state,
            masked: cell.is_masked(),
            immune: cell.is_immune(world.clock),
        })
    }

    /// Captures a read-only view of every cell for rendering and tests.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView {
        let snapshots: Vec<CellSnapshot> = world
            .grid
            .coords()
            .iter()
            .zip(world.grid.cells().iter())
            .map(|(coord, cell)| CellSnapshot {
                coord: *coord,
                state: cell.state,
                masked: cell.is_masked(),
                immune: cell.is_immune(world.clock),
            })
            .collect();
        GridView::from_parts(world.grid.rings(), snapshots)
    }
}

/// Outcome of a single placement attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placement {
    Fresh,
    Evicted(BotTier),
    Dropped,
}

fn occupied_census(grid: &HexGrid) -> TierCounts {
    let mut counts = TierCounts::new();
    for cell in grid.cells() {
        if let Some(tier) = cell.state.occupant() {
            counts.record(tier);
        }
    }
    counts
}

fn masked_cell_count(grid: &HexGrid) -> u32 {
    grid.cells().iter().filter(|cell| cell.is_masked()).count() as u32
}

fn infected_cell_count(grid: &HexGrid) -> u32 {
    grid.cells()
        .iter()
        .filter(|cell| cell.state == CellState::Infected)
        .count() as u32
}

fn infected_neighbor_count(grid: &HexGrid, coord: AxialCoord) -> u32 {
    coord
        .neighbors()
        .into_iter()
        .filter(|neighbor| grid.state(*neighbor) == Some(CellState::Infected))
        .count() as u32
}

fn spontaneous_roll(rng: &mut ChaCha8Rng, rate_per_second: f64, multiplier: f64) -> bool {
    let chance = rate_per_second / f64::from(STEPS_PER_SECOND) * multiplier;
    rng.gen_bool(chance.clamp(0.0, 1.0))
}

fn scale_duration(base: Duration, multiplier: f64) -> Duration {
    Duration::try_from_secs_f64(base.as_secs_f64() * multiplier.max(0.0))
        .unwrap_or(Duration::MAX)
}
