//! Canopy Breaker - a deterministic brick-breaker simulation core.
//!
//! Module structure:
//! - `sim`: Pure simulation logic (deterministic, fixed timestep)
//! - `level`: Level descriptors and the built-in campaign generator
//!
//! The crate is headless: rendering, audio and input devices live in the
//! embedding. The embedding feeds wall-clock delta time and sampled input
//! intents into [`sim::tick`] and drains typed events back out.

pub mod level;
pub mod sim;

/// Shared constants used across modules
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Max substeps per frame to avoid spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest dt a single tick will integrate; anything above is clamped
    pub const MAX_TICK_DT: f32 = 0.1;
    /// Design frames per second. Balance tables are authored in px per
    /// design frame; multiply by this to get px/s.
    pub const STEP_RATE: f32 = 60.0;

    /// Default canvas width in px
    pub const CANVAS_W: f32 = 900.0;
    /// Default canvas height in px
    pub const CANVAS_H: f32 = 900.0;
    /// Side wall thickness as a fraction of canvas width
    pub const WALL_FRAC: f32 = 0.011;
    /// Top boundary as a fraction of canvas height
    pub const TOP_FRAC: f32 = 0.033;

    /// Ball radius in px
    pub const BALL_RADIUS: f32 = 8.0;
    /// Paddle height in px
    pub const PADDLE_HEIGHT: f32 = 15.0;
    /// Paddle top speed in px/s (8 design units)
    pub const PADDLE_MAX_SPEED: f32 = 480.0;
    /// Paddle acceleration in px/s^2 (0.8 design units per frame)
    pub const PADDLE_ACCEL: f32 = 2880.0;
    /// Velocity retained per fixed tick while coasting
    pub const PADDLE_FRICTION: f32 = 0.85;
    /// Below this speed the paddle counts as stationary (px/s)
    pub const MOVE_EPSILON: f32 = 6.0;

    /// Power-up token hit box edge in px
    pub const TOKEN_SIZE: f32 = 30.0;
    /// Power-up token fall speed in px/s (2.5 design units)
    pub const TOKEN_FALL_SPEED: f32 = 150.0;

    /// Shield plane rests this far above the bottom boundary
    pub const SHIELD_OFFSET: f32 = 15.0;
    /// Shield plane thickness in px
    pub const SHIELD_HEIGHT: f32 = 10.0;
}

/// Convert a design-unit speed (px per 1/60 s frame) to px/s.
#[inline]
pub fn design_speed(units: f32) -> f32 {
    units * consts::STEP_RATE
}
