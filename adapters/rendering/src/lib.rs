#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Hex Outbreak adapters.
//!
//! Backends consume a [`Presentation`] describing the grid and its cells,
//! while [`HexLayout`] carries the projection math that turns axial
//! coordinates into screen positions. Projection only affects drawing;
//! simulation adjacency always stays axial.

use anyhow::Result as AnyResult;
use glam::Vec2;
use hex_outbreak_core::{AxialCoord, CellState, RingCount, TIER_COUNT};
use std::{error::Error, fmt, time::Duration};

const SQRT_3: f32 = 1.732_050_8;

/// Corner directions of a flat-top hexagon, starting at the rightmost vertex.
const CORNER_ANGLES: [f32; 6] = [
    0.0,
    std::f32::consts::FRAC_PI_3,
    2.0 * std::f32::consts::FRAC_PI_3,
    std::f32::consts::PI,
    4.0 * std::f32::consts::FRAC_PI_3,
    5.0 * std::f32::consts::FRAC_PI_3,
];

/// Background color cleared behind the grid each frame.
pub const BACKGROUND_COLOR: Color = Color::from_rgb_u8(0x1a, 0x1a, 0x2e);

/// Outline color traced around every cell for contrast.
pub const CELL_OUTLINE_COLOR: Color = Color::new(0.0, 0.0, 0.0, 0.3);

const EMPTY_COLOR: Color = Color::from_rgb_u8(0x2a, 0x2a, 0x3e);
const INFECTED_COLOR: Color = Color::from_rgb_u8(0xff, 0x45, 0x00);
const DECAYING_COLOR: Color = Color::from_rgb_u8(0xff, 0xa5, 0x00);
const MASKED_DESATURATION: f32 = 0.4;

/// Fill colors for healthy occupants in ascending tier order.
const TIER_COLORS: [Color; TIER_COUNT] = [
    Color::from_rgb_u8(0x00, 0xff, 0x41),
    Color::from_rgb_u8(0xff, 0x00, 0x6e),
    Color::from_rgb_u8(0xff, 0xff, 0x00),
    Color::from_rgb_u8(0xb8, 0x00, 0xe6),
    Color::from_rgb_u8(0x00, 0xbf, 0xff),
];

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color blended towards its Rec. 601 gray by the provided
    /// amount.
    #[must_use]
    pub fn desaturate(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let gray = 0.299 * self.red + 0.587 * self.green + 0.114 * self.blue;

        Self {
            red: desaturate_channel(self.red, gray, amount),
            green: desaturate_channel(self.green, gray, amount),
            blue: desaturate_channel(self.blue, gray, amount),
            alpha: self.alpha,
        }
    }
}

fn desaturate_channel(channel: f32, gray: f32, amount: f32) -> f32 {
    channel + (gray - channel) * amount
}

/// Selects the fill color for a cell.
///
/// Masking only dims healthy occupants; infected, decaying and empty cells
/// keep their full-saturation colors.
#[must_use]
pub fn cell_color(state: CellState, masked: bool) -> Color {
    match state {
        CellState::Empty => EMPTY_COLOR,
        CellState::Infected => INFECTED_COLOR,
        CellState::Decaying => DECAYING_COLOR,
        CellState::Occupied(tier) => {
            let base = TIER_COLORS[tier.index()];
            if masked {
                base.desaturate(MASKED_DESATURATION)
            } else {
                base
            }
        }
    }
}

/// Projection applied when placing cells on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProjectionMode {
    /// Cells drawn on the flat axial plane.
    #[default]
    Flat,
    /// Cells wrapped onto a partial hemisphere dome.
    Hemisphere,
}

impl ProjectionMode {
    /// Returns the other projection mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Flat => Self::Hemisphere,
            Self::Hemisphere => Self::Flat,
        }
    }
}

/// Fraction of the hemisphere covered by the dome projection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HemisphereExtent(f32);

impl HemisphereExtent {
    /// Extent used by the original dome view, three quarters of a hemisphere.
    pub const DEFAULT: Self = Self(0.75);

    /// Creates an extent, rejecting values outside `(0, 1]`.
    pub fn new(extent: f32) -> Result<Self, RenderingError> {
        if extent > 0.0 && extent <= 1.0 {
            Ok(Self(extent))
        } else {
            Err(RenderingError::InvalidHemisphereExtent { extent })
        }
    }

    /// Retrieves the raw extent fraction.
    #[must_use]
    pub const fn get(&self) -> f32 {
        self.0
    }

    /// Polar angle reached by the projection at the grid rim.
    #[must_use]
    pub fn max_theta(&self) -> f32 {
        std::f32::consts::FRAC_PI_2 * self.0
    }
}

impl Default for HemisphereExtent {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Pixel-space layout that fits a hex grid to a viewport.
///
/// Recompute the layout whenever the viewport or the ring count changes; it
/// is cheap enough to derive every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HexLayout {
    hex_size: f32,
    center: Vec2,
    flat_radius: f32,
    dome_radius: f32,
    max_theta: f32,
}

impl HexLayout {
    /// Padding in pixels kept between the grid and the viewport edges.
    pub const PADDING: f32 = 30.0;

    /// Fits a grid of the given ring count to the viewport dimensions.
    #[must_use]
    pub fn fit(rings: RingCount, extent: HemisphereExtent, viewport: Vec2) -> Self {
        let rings = f32::from(rings.get());
        let available = (viewport - Vec2::splat(2.0 * Self::PADDING)).max(Vec2::ONE);
        let size_from_width = available.x / (3.0 * rings + 1.0);
        let size_from_height = available.y / ((2.0 * rings + 1.0) * SQRT_3);
        let hex_size = size_from_width.min(size_from_height);

        Self {
            hex_size,
            center: viewport * 0.5,
            flat_radius: hex_size * (1.5 * rings + 0.5),
            dome_radius: available.x.min(available.y) * 0.5,
            max_theta: extent.max_theta(),
        }
    }

    /// Edge length of a single hexagon in pixels.
    #[must_use]
    pub const fn hex_size(&self) -> f32 {
        self.hex_size
    }

    /// Screen position of the grid center.
    #[must_use]
    pub const fn center(&self) -> Vec2 {
        self.center
    }

    /// Flat-space distance from the grid center to the outermost cell.
    #[must_use]
    pub const fn flat_radius(&self) -> f32 {
        self.flat_radius
    }

    /// Screen-space radius of the projected dome.
    #[must_use]
    pub const fn dome_radius(&self) -> f32 {
        self.dome_radius
    }

    /// Screen position of a cell center under the given projection.
    #[must_use]
    pub fn cell_center(&self, coord: AxialCoord, projection: ProjectionMode) -> Vec2 {
        self.project(self.flat_position(coord), projection)
    }

    /// Screen positions of a cell's six corners under the given projection.
    ///
    /// Corners are projected individually, so hexagons near the dome rim
    /// come out perspective-warped rather than merely translated.
    #[must_use]
    pub fn cell_corners(&self, coord: AxialCoord, projection: ProjectionMode) -> [Vec2; 6] {
        let center = self.flat_position(coord);
        CORNER_ANGLES.map(|angle| {
            let corner = center + self.hex_size * Vec2::new(angle.cos(), angle.sin());
            self.project(corner, projection)
        })
    }

    /// Projects a flat grid-centered position onto the screen.
    #[must_use]
    pub fn project(&self, flat: Vec2, projection: ProjectionMode) -> Vec2 {
        match projection {
            ProjectionMode::Flat => self.center + flat,
            ProjectionMode::Hemisphere => self.center + self.to_hemisphere(flat),
        }
    }

    fn flat_position(&self, coord: AxialCoord) -> Vec2 {
        let q = coord.q() as f32;
        let r = coord.r() as f32;

        Vec2::new(
            self.hex_size * 1.5 * q,
            self.hex_size * (SQRT_3 * 0.5 * q + SQRT_3 * r),
        )
    }

    /// Equidistant azimuthal mapping of the flat disk onto a partial dome.
    /// Direction is preserved; only the radial distance changes.
    fn to_hemisphere(&self, flat: Vec2) -> Vec2 {
        let flat_dist = flat.length();
        if flat_dist == 0.0 {
            return Vec2::ZERO;
        }

        let normalized = (flat_dist / self.flat_radius).min(1.0);
        let theta = normalized * self.max_theta;
        let projected_dist = theta.sin() * self.dome_radius / self.max_theta.sin();

        flat * (projected_dist / flat_dist)
    }
}

/// Describes the hex lattice that frames every cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HexGridPresentation {
    /// Number of rings spanned by the grid.
    pub rings: RingCount,
    /// Fraction of the hemisphere used while the dome projection is active.
    pub extent: HemisphereExtent,
    /// Color used when outlining cells.
    pub line_color: Color,
}

impl HexGridPresentation {
    /// Creates a new hex grid descriptor.
    #[must_use]
    pub const fn new(rings: RingCount, extent: HemisphereExtent, line_color: Color) -> Self {
        Self {
            rings,
            extent,
            line_color,
        }
    }

    /// Fits a pixel-space layout for this grid to the given viewport.
    #[must_use]
    pub fn layout(&self, viewport: Vec2) -> HexLayout {
        HexLayout::fit(self.rings, self.extent, viewport)
    }
}

/// Single cell rendered as a filled hexagon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellPresentation {
    /// Axial coordinate of the cell.
    pub coord: AxialCoord,
    /// Fill color of the cell's hexagon.
    pub color: Color,
}

impl CellPresentation {
    /// Creates a new cell presentation descriptor.
    #[must_use]
    pub const fn new(coord: AxialCoord, color: Color) -> Self {
        Self { coord, color }
    }
}

/// Scene description combining the hex lattice and its cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Hex lattice descriptor shared by every cell.
    pub grid: HexGridPresentation,
    /// Cells currently visible, one filled hexagon each.
    pub cells: Vec<CellPresentation>,
    /// Projection applied when placing cells on screen.
    pub projection: ProjectionMode,
}

impl Scene {
    /// Creates a new scene descriptor.
    #[must_use]
    pub fn new(
        grid: HexGridPresentation,
        cells: Vec<CellPresentation>,
        projection: ProjectionMode,
    ) -> Self {
        Self {
            grid,
            cells,
            projection,
        }
    }
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// Whether the adapter detected a projection toggle press on this frame.
    pub projection_toggle: bool,
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting Hex Outbreak scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the simulated frame delta,
    /// per-frame input captured by the adapter, and may mutate the scene before
    /// it is rendered, allowing adapters to animate world snapshots
    /// deterministically.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Hemisphere extent must stay within `(0, 1]` to keep the rim mapping
    /// finite.
    InvalidHemisphereExtent {
        /// Provided extent that failed validation.
        extent: f32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHemisphereExtent { extent } => {
                write!(f, "hemisphere extent must lie in (0, 1] (received {extent})")
            }
        }
    }
}

impl Error for RenderingError {}
