#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Hex Outbreak engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Hex Outbreak.";

/// Number of distinct bot tiers tracked by the simulation.
pub const TIER_COUNT: usize = 5;

/// Simulated time covered by a single infection generation.
pub const STEP_INTERVAL: Duration = Duration::from_millis(100);

/// Number of infection generations advanced per simulated second.
pub const STEPS_PER_SECOND: u32 = 10;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Reconciles grid occupancy and masks with the caller's ledger.
    SyncPopulation {
        /// Fractional population targets for each bot tier.
        targets: PopulationTargets,
        /// Mask budget and duration scaling currently afforded by the caller.
        masks: MaskPolicy,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Advances the infection automaton by exactly one generation.
    Step {
        /// Detection parameters in effect for this generation.
        profile: DetectionProfile,
    },
    /// Grows the grid to the provided ring count, preserving existing cells.
    ///
    /// Requests at or below the current ring count are ignored; the grid
    /// never shrinks.
    ResizeGrid {
        /// Number of rings the grown grid should span.
        rings: RingCount,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that the grid was rebuilt at a new ring count.
    GridResized {
        /// Number of rings spanned by the rebuilt grid.
        rings: RingCount,
        /// Total number of cells contained in the rebuilt grid.
        cells: u32,
    },
    /// Reports the outcome of a population reconciliation pass.
    PopulationSynced {
        /// Bots placed onto the grid during the pass, grouped by tier.
        placed: TierCounts,
        /// Bots that could not be placed because no candidate cell existed.
        dropped: u64,
    },
    /// Reports that expired masks consumed units of the caller's mask budget.
    MasksConsumed {
        /// Number of budget units consumed while processing expirations.
        count: u32,
    },
    /// Confirms that the infection automaton advanced one generation.
    GenerationAdvanced {
        /// Total number of generations completed since world creation.
        generation: u64,
        /// Cells that became infected during this generation.
        infected: u32,
        /// Bots that completed decay during this generation, grouped by tier.
        perished: TierCounts,
    },
}

/// Location of a single hex cell expressed in axial coordinates.
///
/// The grid uses flat-top orientation, so `q` advances one column to the
/// right and `r` advances one cell down-right along the column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AxialCoord {
    q: i32,
    r: i32,
}

/// Axial offsets shared by the six neighbors of every flat-top hex cell.
const NEIGHBOR_OFFSETS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

impl AxialCoord {
    /// Cell at the center of the grid.
    pub const ORIGIN: Self = Self { q: 0, r: 0 };

    /// Creates a new axial coordinate.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Column component of the coordinate.
    #[must_use]
    pub const fn q(&self) -> i32 {
        self.q
    }

    /// Diagonal row component of the coordinate.
    #[must_use]
    pub const fn r(&self) -> i32 {
        self.r
    }

    /// Returns the six cells adjacent to this one.
    #[must_use]
    pub fn neighbors(self) -> [AxialCoord; 6] {
        NEIGHBOR_OFFSETS.map(|(dq, dr)| AxialCoord::new(self.q + dq, self.r + dr))
    }

    /// Number of rings separating this cell from the grid center.
    ///
    /// Equals the hex-walk distance to the origin, which for axial
    /// coordinates is the largest of the three cube-coordinate magnitudes.
    #[must_use]
    pub fn ring_distance(self) -> u32 {
        let s = self.q.saturating_add(self.r);
        self.q
            .unsigned_abs()
            .max(self.r.unsigned_abs())
            .max(s.unsigned_abs())
    }
}

/// Number of concentric rings spanned by the hex grid.
///
/// Construction saturates at [`RingCount::MAX`], so a ring count can never
/// exceed the supported maximum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RingCount(u8);

impl RingCount {
    /// Largest ring count the simulation supports.
    pub const MAX: Self = Self(64);

    /// Creates a new ring count, saturating at [`RingCount::MAX`].
    #[must_use]
    pub const fn new(value: u8) -> Self {
        if value > Self::MAX.0 {
            Self::MAX
        } else {
            Self(value)
        }
    }

    /// Retrieves the underlying ring count.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Total number of cells contained in a grid spanning this many rings.
    ///
    /// A grid with `n` rings holds the center cell plus `3 * n * (n + 1)`
    /// surrounding cells.
    #[must_use]
    pub const fn cell_capacity(&self) -> u32 {
        let n = self.0 as u32;
        1 + 3 * n * (n + 1)
    }

    /// Smallest ring count whose capacity comfortably hosts a population.
    ///
    /// Mirrors the sizing rule used by population reconciliation: the grid
    /// grows with the square root of the total bot count, saturating at
    /// [`RingCount::MAX`].
    #[must_use]
    pub fn required_for(total_bots: u64) -> Self {
        let required = (total_bots as f64).sqrt().floor() as u64;
        if required >= u64::from(Self::MAX.0) {
            Self::MAX
        } else {
            Self(required as u8)
        }
    }
}

/// Quality tier of a bot, ranked from `1` (weakest) to [`TIER_COUNT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BotTier(u8);

impl BotTier {
    /// All bot tiers in ascending rank order.
    pub const ALL: [Self; TIER_COUNT] = [Self(1), Self(2), Self(3), Self(4), Self(5)];

    /// Creates a tier from its zero-based rank index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < TIER_COUNT {
            Some(Self(index as u8 + 1))
        } else {
            None
        }
    }

    /// Zero-based rank index of the tier.
    #[must_use]
    pub const fn index(&self) -> usize {
        (self.0 - 1) as usize
    }

    /// One-based rank label of the tier.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Reports whether this tier strictly outranks the other.
    #[must_use]
    pub const fn outranks(&self, other: BotTier) -> bool {
        self.0 > other.0
    }
}

/// Lifecycle state of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellState {
    /// No bot resides in the cell.
    Empty,
    /// A healthy bot of the given tier resides in the cell.
    Occupied(BotTier),
    /// The resident bot is infected and spreading.
    Infected,
    /// The resident bot is decaying and will perish next generation.
    Decaying,
}

impl CellState {
    /// Returns the tier of the healthy occupant, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<BotTier> {
        match self {
            Self::Occupied(tier) => Some(*tier),
            _ => None,
        }
    }
}

/// Per-tier bot counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TierCounts([u64; TIER_COUNT]);

impl TierCounts {
    /// Creates a counter set with every tier at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self([0; TIER_COUNT])
    }

    /// Number of bots recorded for the provided tier.
    #[must_use]
    pub const fn of(&self, tier: BotTier) -> u64 {
        self.0[tier.index()]
    }

    /// Records one additional bot of the provided tier.
    pub fn record(&mut self, tier: BotTier) {
        self.0[tier.index()] = self.0[tier.index()].saturating_add(1);
    }

    /// Total number of bots recorded across all tiers.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Reports whether every tier counter is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|count| *count == 0)
    }

    /// Iterator over `(tier, count)` pairs in ascending tier order.
    pub fn iter(&self) -> impl Iterator<Item = (BotTier, u64)> + '_ {
        BotTier::ALL.into_iter().zip(self.0.iter().copied())
    }
}

/// Fractional per-tier population targets supplied by the caller's ledger.
///
/// Targets are fractional because the upstream economy accrues bots
/// continuously; the grid only ever materializes whole bots.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationTargets([f64; TIER_COUNT]);

impl PopulationTargets {
    /// Creates targets from raw per-tier values in ascending tier order.
    #[must_use]
    pub const fn from_raw(targets: [f64; TIER_COUNT]) -> Self {
        Self(targets)
    }

    /// Raw fractional target for the provided tier.
    #[must_use]
    pub const fn raw(&self, tier: BotTier) -> f64 {
        self.0[tier.index()]
    }

    /// Whole-bot target for the provided tier. Negative targets count as zero.
    #[must_use]
    pub fn floored(&self, tier: BotTier) -> u64 {
        self.0[tier.index()].max(0.0).floor() as u64
    }

    /// Whole-bot total across all tiers, flooring the sum rather than
    /// the individual tiers so that fractional remainders accumulate.
    #[must_use]
    pub fn total_floored(&self) -> u64 {
        self.0.iter().sum::<f64>().max(0.0).floor() as u64
    }
}

/// Mask budget and duration scaling supplied by the caller's ledger.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskPolicy {
    budget: f64,
    duration_multiplier: f64,
}

impl MaskPolicy {
    /// Creates a policy from a fractional mask budget and duration scale.
    #[must_use]
    pub const fn new(budget: f64, duration_multiplier: f64) -> Self {
        Self {
            budget,
            duration_multiplier,
        }
    }

    /// Policy that masks nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Fractional number of masks the caller can afford to maintain.
    #[must_use]
    pub const fn budget(&self) -> f64 {
        self.budget
    }

    /// Scale applied to mask and immunity durations.
    #[must_use]
    pub const fn duration_multiplier(&self) -> f64 {
        self.duration_multiplier
    }
}

/// Infection pressure regime applied while stepping the automaton.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMode {
    /// Masks protect, immunity holds, and spread requires sustained
    /// throughput before spontaneous infections appear.
    Standard,
    /// Uncapped spread: masks and immunity are ignored by both the
    /// neighbor rule and the spontaneous rule.
    Uncapped,
}

/// Caller-owned upgrades that slow infection spread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mitigations {
    encrypted_links: bool,
    relay_shield: bool,
}

impl Mitigations {
    /// Creates a mitigation set from individual upgrade flags.
    #[must_use]
    pub const fn new(encrypted_links: bool, relay_shield: bool) -> Self {
        Self {
            encrypted_links,
            relay_shield,
        }
    }

    /// Reports whether encrypted links are active.
    #[must_use]
    pub const fn encrypted_links(&self) -> bool {
        self.encrypted_links
    }

    /// Reports whether the relay shield is active.
    #[must_use]
    pub const fn relay_shield(&self) -> bool {
        self.relay_shield
    }

    /// Combined multiplier applied to spontaneous infection chances.
    ///
    /// Encrypted links halve the chance and the relay shield quarters it;
    /// the reductions stack multiplicatively.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        let mut multiplier = 1.0;
        if self.encrypted_links {
            multiplier *= 0.5;
        }
        if self.relay_shield {
            multiplier *= 0.25;
        }
        multiplier
    }
}

/// Detection parameters in effect for a single infection generation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionProfile {
    throughput: f64,
    mode: DetectionMode,
    mitigations: Mitigations,
}

impl DetectionProfile {
    /// Creates a profile from the caller's current economy readings.
    #[must_use]
    pub const fn new(throughput: f64, mode: DetectionMode, mitigations: Mitigations) -> Self {
        Self {
            throughput,
            mode,
            mitigations,
        }
    }

    /// Caller throughput measured in posts per second.
    #[must_use]
    pub const fn throughput(&self) -> f64 {
        self.throughput
    }

    /// Active infection pressure regime.
    #[must_use]
    pub const fn mode(&self) -> DetectionMode {
        self.mode
    }

    /// Active spread mitigations.
    #[must_use]
    pub const fn mitigations(&self) -> Mitigations {
        self.mitigations
    }
}

/// Immutable representation of a single cell's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellSnapshot {
    /// Axial coordinate of the cell.
    pub coord: AxialCoord,
    /// Lifecycle state of the cell.
    pub state: CellState,
    /// Indicates whether the cell currently wears a mask.
    pub masked: bool,
    /// Indicates whether the cell sits inside an immunity window.
    pub immune: bool,
}

/// Read-only snapshot describing every cell in the grid.
#[derive(Clone, Debug, Default)]
pub struct GridView {
    rings: RingCount,
    snapshots: Vec<CellSnapshot>,
}

impl GridView {
    /// Creates a new grid view from the provided snapshots.
    #[must_use]
    pub fn from_parts(rings: RingCount, mut snapshots: Vec<CellSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.coord);
        Self { rings, snapshots }
    }

    /// Number of rings spanned by the captured grid.
    #[must_use]
    pub const fn rings(&self) -> RingCount {
        self.rings
    }

    /// Iterator over the captured cell snapshots in deterministic order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &CellSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<CellSnapshot> {
        self.snapshots
    }
}
