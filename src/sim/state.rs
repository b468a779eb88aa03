//! Game state and core simulation types
//!
//! Everything a session needs to resume or replay deterministically lives
//! here, including the RNG. Serializing a `GameState` mid-game and loading
//! it back continues the exact same run.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::design_speed;
use crate::level::LevelDescriptor;

use super::brick::{BrickGrid, ExplosionEvent};
use super::effects::{self, ActiveEffects, Token};
use super::energy::EnergyMeter;
use super::events::GameEvent;

/// Seconds between clearing a level and the next one loading
pub const TRANSITION_DELAY: f32 = 2.0;

/// Paddle top edge sits this far above the bottom of the playfield
pub const PADDLE_BOTTOM_OFFSET: f32 = 50.0;

/// Lives granted at session start
pub const STARTING_LIVES: u8 = 3;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Balls attached to the paddle, waiting for launch input
    Serve,
    /// Active gameplay
    Playing,
    /// Level cleared, countdown until the next one loads
    Transition,
    /// Game is paused
    Paused,
    /// Out of lives
    GameOver,
    /// Final level cleared
    Completed,
}

/// Ball state - attached to the paddle or free-moving
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BallState {
    /// Riding the paddle at a fraction across its width (0.5 = center)
    Attached { frac: f32 },
    /// Free-moving
    Free,
}

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub state: BallState,
    /// Next brick contact demolishes it outright instead of bouncing
    #[serde(default)]
    pub power_shot: bool,
}

impl Ball {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius: BALL_RADIUS,
            state: BallState::Attached { frac: 0.5 },
            power_shot: false,
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, BallState::Attached { .. })
    }

    /// Keep an attached ball riding the paddle.
    pub fn update_attached(&mut self, paddle: &Paddle) {
        if let BallState::Attached { frac } = self.state {
            self.pos = Vec2::new(paddle.pos.x + paddle.width * frac, paddle.pos.y - self.radius);
        }
    }

    /// Release the ball with the given velocity.
    pub fn launch(&mut self, vel: Vec2) {
        self.vel = vel;
        self.state = BallState::Free;
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}

/// The player's paddle. `pos` is the top-left corner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    pub pos: Vec2,
    pub width: f32,
    pub height: f32,
    /// Horizontal velocity in px/s, driven by keyboard control
    pub vel: f32,
    /// Pushed against a side wall this tick
    #[serde(default)]
    pub wall_contact: bool,
}

impl Paddle {
    pub fn new(canvas: Vec2, width: f32) -> Self {
        Self {
            pos: Vec2::new((canvas.x - width) * 0.5, canvas.y - PADDLE_BOTTOM_OFFSET),
            width,
            height: PADDLE_HEIGHT,
            vel: 0.0,
            wall_contact: false,
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center_x(&self) -> f32 {
        self.pos.x + self.width * 0.5
    }

    /// Legal range for `pos.x` between the side walls.
    fn x_range(&self, canvas_w: f32) -> (f32, f32) {
        let wall = canvas_w * WALL_FRAC;
        (wall, canvas_w - wall - self.width)
    }

    /// Keyboard control step: accelerate while a direction is held, bleed
    /// speed with friction otherwise, then integrate and clamp to the
    /// walls. The energy multiplier throttles both top speed and
    /// acceleration.
    pub fn drive(&mut self, dir: f32, speed_multiplier: f32, dt: f32, canvas_w: f32) {
        let max_speed = PADDLE_MAX_SPEED * speed_multiplier;
        if dir != 0.0 {
            let accel = PADDLE_ACCEL * speed_multiplier;
            self.vel = (self.vel + dir * accel * dt).clamp(-max_speed, max_speed);
        } else {
            self.vel *= PADDLE_FRICTION;
            if self.vel.abs() < MOVE_EPSILON {
                self.vel = 0.0;
            }
        }
        self.pos.x += self.vel * dt;

        let (min_x, max_x) = self.x_range(canvas_w);
        let clamped = self.pos.x.clamp(min_x, max_x);
        self.wall_contact = clamped != self.pos.x;
        if self.wall_contact {
            self.pos.x = clamped;
            self.vel = 0.0;
        }
    }

    /// Pointer control step: the paddle centers on the pointer directly.
    /// Returns true when the pointer is pushing past a wall, which blocks
    /// the move and forces energy recovery.
    pub fn track_pointer(&mut self, pointer_x: f32, canvas_w: f32) -> bool {
        let desired = pointer_x - self.width * 0.5;
        let (min_x, max_x) = self.x_range(canvas_w);
        let clamped = desired.clamp(min_x, max_x);
        let blocked = (desired - clamped).abs() > f32::EPSILON;
        self.pos.x = clamped;
        self.vel = 0.0;
        self.wall_contact = false;
        blocked
    }

    /// Change width in place keeping the paddle centered, clamped back
    /// between the walls afterward.
    pub fn set_width(&mut self, width: f32, canvas_w: f32) {
        let center = self.center_x();
        self.width = width;
        self.pos.x = center - width * 0.5;
        let (min_x, max_x) = self.x_range(canvas_w);
        self.pos.x = self.pos.x.clamp(min_x, max_x);
    }
}

/// Running totals kept across levels for end-of-game bonuses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub levels_completed: u32,
    pub bricks_destroyed: u32,
    pub perfect_levels: u32,
    pub tokens_spawned: u32,
    pub tokens_caught: u32,
    pub token_points: u64,
    /// Sim-time seconds accumulated over completed levels
    pub time_played: f32,
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Session seed for reproducibility
    pub seed: u64,
    /// RNG carried in-state so saves resume the same stream
    pub rng: Pcg32,
    /// Playfield size in px
    pub canvas: Vec2,
    /// Current phase
    pub phase: GamePhase,
    /// Current level number (1-based)
    pub level: u32,
    /// Configuration for the current level
    pub descriptor: LevelDescriptor,
    /// Campaign sessions advance through `LevelDescriptor::campaign`;
    /// custom-descriptor sessions end after their single level
    pub campaign: bool,
    /// Player lives
    pub lives: u8,
    /// Lives when the current level started, for the perfect bonus
    pub lives_at_level_start: u8,
    /// Score
    pub score: u64,
    /// Player paddle
    pub paddle: Paddle,
    /// Active balls (sorted by id for determinism)
    pub balls: Vec<Ball>,
    /// Brick grid for the current level
    pub grid: BrickGrid,
    /// Falling tokens
    pub tokens: Vec<Token>,
    /// Timed effect countdowns
    pub effects: ActiveEffects,
    /// Paddle energy meter
    pub energy: EnergyMeter,
    /// Blasts queued for the next tick's chain pass
    pub explosions: Vec<ExplosionEvent>,
    /// Session statistics
    pub stats: SessionStats,
    /// Sim-time seconds since the session started
    pub time: f32,
    /// Sim-time seconds in the current level; drives row drift
    pub level_time: f32,
    /// Countdown while in the transition phase
    pub transition_timer: f32,
    /// Sim time of the last token spawn, None before the first
    pub last_token_spawn: Option<f32>,
    /// Drained by the embedder each tick, not part of saved state
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Fresh campaign session starting at level 1.
    pub fn new(seed: u64) -> Self {
        Self::session(seed, true, LevelDescriptor::campaign(1))
    }

    /// One-off session on a custom descriptor. The game ends when its
    /// single level is cleared.
    pub fn with_descriptor(seed: u64, descriptor: LevelDescriptor) -> Self {
        Self::session(seed, false, descriptor)
    }

    fn session(seed: u64, campaign: bool, mut descriptor: LevelDescriptor) -> Self {
        descriptor.validate();
        let canvas = Vec2::new(CANVAS_W, CANVAS_H);
        let paddle = Paddle::new(canvas, descriptor.paddle.base_width);
        let energy = EnergyMeter::new(&descriptor.energy);

        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            canvas,
            phase: GamePhase::Serve,
            level: 1,
            descriptor: LevelDescriptor::default(),
            campaign,
            lives: STARTING_LIVES,
            lives_at_level_start: STARTING_LIVES,
            score: 0,
            paddle,
            balls: Vec::new(),
            grid: BrickGrid { columns: Vec::new() },
            tokens: Vec::new(),
            effects: ActiveEffects::default(),
            energy,
            explosions: Vec::new(),
            stats: SessionStats::default(),
            time: 0.0,
            level_time: 0.0,
            transition_timer: 0.0,
            last_token_spawn: None,
            events: Vec::new(),
            next_id: 1,
        };
        state.load_level(1, descriptor);
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Spawn a ball riding the paddle at the given fraction across its
    /// width.
    pub fn spawn_ball_attached(&mut self, frac: f32) {
        let id = self.next_entity_id();
        let mut ball = Ball::new(id);
        ball.state = BallState::Attached { frac };
        ball.update_attached(&self.paddle);
        self.balls.push(ball);
    }

    /// Swap in a new level: fresh grid, reset level timers, announce the
    /// intro. Score, lives, energy, running effects and balls in flight all
    /// carry over; ball speeds are retargeted to the new descriptor.
    pub fn load_level(&mut self, level: u32, mut descriptor: LevelDescriptor) {
        descriptor.validate();
        self.level = level;
        self.descriptor = descriptor;
        self.grid = BrickGrid::build(&self.descriptor, self.canvas, &mut self.rng);
        self.level_time = 0.0;
        self.transition_timer = 0.0;
        self.lives_at_level_start = self.lives;
        self.last_token_spawn = None;
        self.explosions.clear();

        self.rescale_ball_speeds();
        if self.balls.is_empty() {
            self.spawn_ball_attached(0.5);
        }
        self.phase = if self.balls.iter().all(|b| b.is_attached()) {
            GamePhase::Serve
        } else {
            GamePhase::Playing
        };

        let intro = if self.descriptor.description.is_empty() {
            format!("Level {}", level)
        } else {
            format!("Level {}: {}", level, self.descriptor.description)
        };
        self.events.push(GameEvent::note(intro, "#FFD700"));
        log::info!(
            "level {} loaded: {}x{} bricks, ball speed {}",
            level,
            self.descriptor.columns,
            self.descriptor.rows,
            self.descriptor.ball_speed
        );
    }

    /// Retarget every moving ball to the descriptor speed, keeping its
    /// direction. Slowed balls keep their discount: the tracked original
    /// velocity is retargeted and the live one re-derived from it.
    fn rescale_ball_speeds(&mut self) {
        let target = design_speed(self.descriptor.ball_speed);
        for ball in &mut self.balls {
            let speed = ball.vel.length();
            if speed <= 0.0 || ball.is_attached() {
                continue;
            }
            let dir = ball.vel / speed;
            if let Some(original) = self.effects.slow_originals.get_mut(&ball.id) {
                *original = dir * target;
                ball.vel = dir * target * effects::SLOW_FACTOR;
            } else {
                ball.vel = dir * target;
            }
        }
    }

    /// Award points through the level's score multiplier. Returns the
    /// amount actually added.
    pub fn add_points(&mut self, base: u32) -> u64 {
        let scaled = (base as f32 * self.descriptor.score_multiplier).round() as u64;
        self.score += scaled;
        scaled
    }

    /// Shield plane geometry: a thin strip spanning the playfield just
    /// above the bottom edge.
    pub fn shield_rect(&self) -> (Vec2, Vec2) {
        let wall = self.canvas.x * WALL_FRAC;
        (
            Vec2::new(wall, self.canvas.y - SHIELD_OFFSET),
            Vec2::new(self.canvas.x - 2.0 * wall, SHIELD_HEIGHT),
        )
    }

    /// Drain the events accumulated since the last tick.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Ensure balls are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
    }
}
