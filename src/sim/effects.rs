//! Power-up tokens and the timed effects they grant.
//!
//! This module owns the data side: the effect kind table (rarity, color,
//! duration), the falling token, spawn gating math, and the countdown state
//! machine. Applying a catch to balls/paddle/energy happens in the tick,
//! which owns those entities.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts;
use crate::level::LevelDescriptor;

/// Velocity factor while the slow-ball effect runs
pub const SLOW_FACTOR: f32 = 0.7;
/// Fraction of max energy refilled instantly by an energy boost
pub const BOOST_REFILL_FRAC: f32 = 0.5;
/// Instant score for a bonus-points token
pub const BONUS_POINTS: u32 = 500;

/// Everything a token can grant. Closed set: unknown kinds cannot exist
/// past descriptor deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    MultiBall,
    ExpandPaddle,
    SlowBall,
    PowerShot,
    Shield,
    BonusPoints,
    EnergyBoost,
    EnergyFree,
}

impl EffectKind {
    pub const ALL: [EffectKind; 8] = [
        EffectKind::MultiBall,
        EffectKind::ExpandPaddle,
        EffectKind::SlowBall,
        EffectKind::PowerShot,
        EffectKind::Shield,
        EffectKind::BonusPoints,
        EffectKind::EnergyBoost,
        EffectKind::EnergyFree,
    ];

    /// Base selection weight before per-level modifiers.
    pub fn base_rarity(self) -> f32 {
        match self {
            EffectKind::MultiBall => 0.15,
            EffectKind::ExpandPaddle => 0.20,
            EffectKind::SlowBall => 0.15,
            EffectKind::PowerShot => 0.10,
            EffectKind::Shield => 0.20,
            EffectKind::BonusPoints => 0.20,
            EffectKind::EnergyBoost => 0.15,
            EffectKind::EnergyFree => 0.10,
        }
    }

    /// Display color, also used for the catch notification.
    pub fn color(self) -> &'static str {
        match self {
            EffectKind::MultiBall => "#4A90E2",
            EffectKind::ExpandPaddle => "#7ED321",
            EffectKind::SlowBall => "#9013FE",
            EffectKind::PowerShot => "#F5A623",
            EffectKind::Shield => "#50E3C2",
            EffectKind::BonusPoints => "#FF6B6B",
            EffectKind::EnergyBoost => "#4A90E2",
            EffectKind::EnergyFree => "#00FF00",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            EffectKind::MultiBall => "Spawns 2 additional balls",
            EffectKind::ExpandPaddle => "Increases paddle width by 40%",
            EffectKind::SlowBall => "Reduces ball velocity by 30%",
            EffectKind::PowerShot => "Ball destroys bricks without bouncing",
            EffectKind::Shield => "Prevents ball loss for 1 collision",
            EffectKind::BonusPoints => "Instant 500 points",
            EffectKind::EnergyBoost => "Reduces energy consumption by 40%",
            EffectKind::EnergyFree => "No energy consumption for movement",
        }
    }

    /// Instant effects have no countdown.
    pub fn is_timed(self) -> bool {
        !matches!(
            self,
            EffectKind::MultiBall | EffectKind::PowerShot | EffectKind::BonusPoints
        )
    }
}

/// A falling collectible. Position is the top-left of its hit box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub pos: Vec2,
    pub kind: EffectKind,
}

impl Token {
    pub fn new(pos: Vec2, kind: EffectKind) -> Self {
        Self { pos, kind }
    }

    pub fn size() -> Vec2 {
        Vec2::splat(consts::TOKEN_SIZE)
    }

    pub fn update(&mut self, dt: f32) {
        self.pos.y += consts::TOKEN_FALL_SPEED * dt;
    }

    pub fn past_bottom(&self, canvas_h: f32) -> bool {
        self.pos.y > canvas_h + consts::TOKEN_SIZE
    }
}

/// Spawn probability for the next destroyed brick, discounted as the screen
/// fills up and floored at the descriptor minimum.
pub fn spawn_probability(desc: &LevelDescriptor, tokens_on_screen: usize) -> f32 {
    let modifier = 1.0 - tokens_on_screen as f32 * desc.token_count_modifier;
    (desc.spawn_probability * modifier).max(desc.min_spawn_chance)
}

/// On-screen token cap: descriptor override or the level growth formula.
pub fn max_tokens(desc: &LevelDescriptor, level: u32) -> u32 {
    desc.max_tokens
        .unwrap_or(3 + 2 * level.saturating_sub(1))
}

/// Weighted pick over all kinds: base rarity times the level's modifier,
/// one uniform draw against the cumulative weights.
pub fn pick_kind(desc: &LevelDescriptor, rng: &mut Pcg32) -> EffectKind {
    let weights: Vec<f32> = EffectKind::ALL
        .iter()
        .map(|k| k.base_rarity() * desc.rarity_modifiers.get(k).copied().unwrap_or(1.0).max(0.0))
        .collect();
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return EffectKind::BonusPoints;
    }
    let mut draw = rng.random::<f32>() * total;
    for (kind, weight) in EffectKind::ALL.iter().zip(&weights) {
        draw -= weight;
        if draw <= 0.0 {
            return *kind;
        }
    }
    EffectKind::ALL[0]
}

/// Countdown state for every timed effect, plus the slow-ball restore table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveEffects {
    /// 0..=2 expansion stacks on the paddle
    pub expand_level: u8,
    pub expand_timer: f32,
    pub slow_active: bool,
    pub slow_timer: f32,
    /// Ball id -> velocity before the slow discount, for exact restoration
    pub slow_originals: BTreeMap<u32, Vec2>,
    pub shield_active: bool,
    pub shield_timer: f32,
    pub energy_boost_active: bool,
    pub energy_boost_timer: f32,
    pub energy_free_active: bool,
    pub energy_free_timer: f32,
}

impl ActiveEffects {
    /// Record a ball's pre-slow velocity. Returns false when the ball is
    /// already tracked, meaning it is already slowed and must not be
    /// discounted again.
    pub fn track_slow(&mut self, ball_id: u32, original_vel: Vec2) -> bool {
        if self.slow_originals.contains_key(&ball_id) {
            return false;
        }
        self.slow_originals.insert(ball_id, original_vel);
        true
    }

    /// Drop tracking for a ball leaving play.
    pub fn purge_ball(&mut self, ball_id: u32) {
        self.slow_originals.remove(&ball_id);
    }

    /// Tick every running countdown. Flags and stack levels reset here;
    /// reverting external state (paddle width, ball velocities) is the
    /// caller's job, driven by the returned expirations. Each expiry is
    /// reported exactly once.
    pub fn update_timers(&mut self, dt: f32) -> Vec<EffectKind> {
        let mut expired = Vec::new();

        if self.expand_level > 0 {
            self.expand_timer -= dt;
            if self.expand_timer <= 0.0 {
                self.expand_level = 0;
                self.expand_timer = 0.0;
                expired.push(EffectKind::ExpandPaddle);
            }
        }
        if self.slow_active {
            self.slow_timer -= dt;
            if self.slow_timer <= 0.0 {
                self.slow_active = false;
                self.slow_timer = 0.0;
                expired.push(EffectKind::SlowBall);
            }
        }
        if self.shield_active {
            self.shield_timer -= dt;
            if self.shield_timer <= 0.0 {
                self.shield_active = false;
                self.shield_timer = 0.0;
                expired.push(EffectKind::Shield);
            }
        }
        if self.energy_boost_active {
            self.energy_boost_timer -= dt;
            if self.energy_boost_timer <= 0.0 {
                self.energy_boost_active = false;
                self.energy_boost_timer = 0.0;
                expired.push(EffectKind::EnergyBoost);
            }
        }
        if self.energy_free_active {
            self.energy_free_timer -= dt;
            if self.energy_free_timer <= 0.0 {
                self.energy_free_active = false;
                self.energy_free_timer = 0.0;
                expired.push(EffectKind::EnergyFree);
            }
        }
        expired
    }

    /// One ball bounce consumes the shield. Returns whether it was up.
    pub fn consume_shield(&mut self) -> bool {
        if self.shield_active {
            self.shield_active = false;
            self.shield_timer = 0.0;
            true
        } else {
            false
        }
    }
}
