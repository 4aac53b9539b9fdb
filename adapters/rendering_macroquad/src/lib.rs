#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Hex Outbreak.
//!
//! The dependency disables macroquad's default `audio` feature: the audio
//! stack wants native ALSA development libraries that containerised CI does
//! not have, and the simulation has no sound anyway. Consumers that want
//! playback can re-enable `macroquad/audio` in their own manifest.

use anyhow::Result;
use glam::Vec2;
use hex_outbreak_rendering::{FrameInput, HexLayout, Presentation, RenderingBackend, Scene};
use macroquad::input::{is_key_pressed, KeyCode};
use macroquad::math::Vec2 as MacroquadVec2;
use std::time::{Duration, Instant};

/// Snapshot of edge-triggered keyboard shortcuts observed during a single frame.
#[derive(Clone, Copy, Debug, Default)]
struct KeyboardShortcuts {
    /// `Q` or `Escape` to quit the render loop.
    quit_requested: bool,
    /// `P` toggles between the flat and hemisphere projections.
    toggle_projection: bool,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        let quit_requested = is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q);
        let toggle_projection = is_key_pressed(KeyCode::P);

        Self {
            quit_requested,
            toggle_projection,
        }
    }
}

/// Rendering backend implemented on top of macroquad.
#[derive(Clone, Copy, Debug, Default)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display
    /// refresh rate or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend prints frame timing metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }
}

/// Accumulates frame timings and yields averages once per second of frame time.
#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    render_accum: Duration,
}

#[derive(Clone, Copy, Debug)]
struct FpsMetrics {
    per_second: f32,
    avg_render: Duration,
}

impl FpsCounter {
    fn record_frame(&mut self, frame: Duration, render: Duration) -> Option<FpsMetrics> {
        self.elapsed += frame;
        self.frames = self.frames.saturating_add(1);
        self.render_accum += render;

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let metrics = FpsMetrics {
            per_second: self.frames as f32 / self.elapsed.as_secs_f32(),
            avg_render: self.render_accum / self.frames,
        };
        *self = Self::default();
        Some(metrics)
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
        } = self;

        let Presentation {
            window_title,
            clear_color,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: 960,
            window_height: 960,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let background = to_macroquad_color(clear_color);
            let mut fps_counter = FpsCounter::default();

            loop {
                let keyboard = KeyboardShortcuts::poll();
                if keyboard.quit_requested {
                    break;
                }

                macroquad::window::clear_background(background);

                let screen_width = macroquad::window::screen_width();
                let screen_height = macroquad::window::screen_height();

                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));
                let frame_input = FrameInput {
                    projection_toggle: keyboard.toggle_projection,
                };

                update_scene(frame_dt, frame_input, &mut scene);

                // Layout is derived from the live screen size every frame, so
                // window resizes and ring growth rescale without touching any
                // retained state.
                let layout = scene.grid.layout(Vec2::new(screen_width, screen_height));

                let render_start = Instant::now();
                draw_cells(&scene, &layout);
                let render_duration = render_start.elapsed();

                if show_fps {
                    if let Some(FpsMetrics {
                        per_second,
                        avg_render,
                    }) = fps_counter.record_frame(frame_dt, render_duration)
                    {
                        println!(
                            "FPS: {:.2} | render: {:>6.2}ms",
                            per_second,
                            avg_render.as_secs_f64() * 1_000.0,
                        );
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

fn draw_cells(scene: &Scene, layout: &HexLayout) {
    let outline = to_macroquad_color(scene.grid.line_color);
    let outline_thickness = (layout.hex_size() * 0.08).max(1.0);

    for cell in &scene.cells {
        let corners = layout.cell_corners(cell.coord, scene.projection);
        let fill = to_macroquad_color(cell.color);
        for triangle in fan_triangles(&corners) {
            macroquad::shapes::draw_triangle(
                MacroquadVec2::new(triangle[0].x, triangle[0].y),
                MacroquadVec2::new(triangle[1].x, triangle[1].y),
                MacroquadVec2::new(triangle[2].x, triangle[2].y),
                fill,
            );
        }
        for index in 0..corners.len() {
            let start = corners[index];
            let end = corners[(index + 1) % corners.len()];
            macroquad::shapes::draw_line(
                start.x,
                start.y,
                end.x,
                end.y,
                outline_thickness,
                outline,
            );
        }
    }
}

/// Splits a projected hexagon outline into the four triangles of its fan.
///
/// Corners arrive individually projected, so the fan fills the warped
/// polygon exactly rather than approximating it with a regular hexagon.
fn fan_triangles(corners: &[Vec2; 6]) -> [[Vec2; 3]; 4] {
    [
        [corners[0], corners[1], corners[2]],
        [corners[0], corners[2], corners[3]],
        [corners[0], corners[3], corners[4]],
        [corners[0], corners[4], corners[5]],
    ]
}

fn to_macroquad_color(color: hex_outbreak_rendering::Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_outbreak_core::{AxialCoord, RingCount};
    use hex_outbreak_rendering::{HemisphereExtent, ProjectionMode};

    #[test]
    fn fan_covers_every_corner_around_a_shared_pivot() {
        let corners = [
            Vec2::new(1.0, 0.0),
            Vec2::new(0.5, 0.9),
            Vec2::new(-0.5, 0.9),
            Vec2::new(-1.0, 0.0),
            Vec2::new(-0.5, -0.9),
            Vec2::new(0.5, -0.9),
        ];

        let triangles = fan_triangles(&corners);

        for triangle in triangles {
            assert_eq!(triangle[0], corners[0]);
        }
        for corner in corners.iter().skip(1) {
            assert!(triangles
                .iter()
                .any(|triangle| triangle.contains(corner)));
        }
    }

    #[test]
    fn fan_preserves_projected_corner_positions() {
        let layout = HexLayout::fit(
            RingCount::new(4),
            HemisphereExtent::DEFAULT,
            Vec2::new(640.0, 640.0),
        );
        let corners = layout.cell_corners(AxialCoord::new(3, -1), ProjectionMode::Hemisphere);

        let triangles = fan_triangles(&corners);

        assert_eq!(triangles[0][1], corners[1]);
        assert_eq!(triangles[3][2], corners[5]);
    }

    #[test]
    fn fps_counter_reports_once_per_second() {
        let mut counter = FpsCounter::default();
        let frame = Duration::from_millis(100);
        let render = Duration::from_millis(2);

        for _ in 0..9 {
            assert!(counter.record_frame(frame, render).is_none());
        }
        let metrics = counter
            .record_frame(frame, render)
            .expect("metrics after one second");

        assert!((metrics.per_second - 10.0).abs() < 0.1);
        assert_eq!(metrics.avg_render, render);
    }

    #[test]
    fn fps_counter_starts_a_fresh_window_after_reporting() {
        let mut counter = FpsCounter::default();
        let _ = counter.record_frame(Duration::from_secs(1), Duration::from_millis(4));

        assert_eq!(counter.frames, 0);
        assert_eq!(counter.elapsed, Duration::ZERO);
        assert_eq!(counter.render_accum, Duration::ZERO);
    }
}
