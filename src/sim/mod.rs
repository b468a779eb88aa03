//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod brick;
pub mod collision;
pub mod effects;
pub mod energy;
pub mod events;
pub mod state;
pub mod tick;

pub use brick::{Brick, BrickGrid, BrickKind, ExplosionEvent};
pub use collision::{
    CollisionResult, circle_rect_collision, paddle_bounce, rects_overlap, resolve_circle_bounds,
    resolve_circle_rect,
};
pub use effects::{ActiveEffects, EffectKind, Token};
pub use energy::{EnergyLevel, EnergyMeter};
pub use events::GameEvent;
pub use state::{Ball, BallState, GamePhase, GameState, Paddle, SessionStats};
pub use tick::{TickInput, tick};
