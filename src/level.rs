//! Level descriptors and the built-in campaign.
//!
//! A descriptor is an immutable configuration value: the simulation reads
//! it, never writes it. Every field deserializes with a fallback so a
//! hand-written JSON descriptor can stay minimal. The campaign generator is
//! a pure function of the level number, so level N always yields the same
//! descriptor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sim::brick::BrickKind;
use crate::sim::effects::EffectKind;

/// Highest campaign level; completing it wins the game.
pub const MAX_LEVEL: u32 = 50;

/// Brick placement patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrickPattern {
    #[default]
    Solid,
    Checkerboard,
    Fortress,
    MovingRows,
    BossFortress,
    Procedural,
    UltimateFortress,
    /// Uniform random draw from the palette
    Random,
}

/// Countdown lengths in seconds for the timed effects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectDurations {
    pub expand_paddle: f32,
    pub slow_ball: f32,
    pub shield: f32,
    pub energy_boost: f32,
    pub energy_free: f32,
}

impl Default for EffectDurations {
    fn default() -> Self {
        Self {
            expand_paddle: 15.0,
            slow_ball: 30.0,
            shield: 10.0,
            energy_boost: 15.0,
            energy_free: 15.0,
        }
    }
}

impl EffectDurations {
    /// Zero for instant kinds.
    pub fn duration_for(&self, kind: EffectKind) -> f32 {
        match kind {
            EffectKind::ExpandPaddle => self.expand_paddle,
            EffectKind::SlowBall => self.slow_ball,
            EffectKind::Shield => self.shield,
            EffectKind::EnergyBoost => self.energy_boost,
            EffectKind::EnergyFree => self.energy_free,
            EffectKind::MultiBall | EffectKind::PowerShot | EffectKind::BonusPoints => 0.0,
        }
    }
}

/// Brick construction tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrickTuning {
    /// Chance a brick rolls +1 or +2 extra durability
    pub durability_bonus_chance: f32,
    pub max_durability_bonus: u8,
    /// Hard cap on total durability, if set
    pub max_durability: Option<u8>,
}

impl Default for BrickTuning {
    fn default() -> Self {
        Self {
            durability_bonus_chance: 0.3,
            max_durability_bonus: 2,
            max_durability: None,
        }
    }
}

/// Paddle geometry and expansion limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddleTuning {
    pub base_width: f32,
    pub max_width: f32,
    /// Width multiplier per expansion stack
    pub expansion_factor: f32,
    pub max_expansions: u8,
}

impl Default for PaddleTuning {
    fn default() -> Self {
        Self {
            base_width: 120.0,
            max_width: 240.0,
            expansion_factor: 1.4,
            max_expansions: 2,
        }
    }
}

/// Energy controller tuning. Rates are per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyTuning {
    pub max_energy: f32,
    pub base_consumption_rate: f32,
    pub max_recovery_rate: f32,
    /// Exponent on (1 - ratio) in the recovery curve
    pub recovery_curve_steepness: f32,
    /// At or below this ratio the speed multiplier is hard-set
    pub speed_penalty_threshold: f32,
    pub speed_penalty_amount: f32,
    /// At or above this ratio consumption gets the efficiency discount
    pub consumption_reduction_threshold: f32,
    pub tired_consumption_penalty: f32,
    pub high_energy_efficiency: f32,
}

impl Default for EnergyTuning {
    fn default() -> Self {
        Self {
            max_energy: 100.0,
            base_consumption_rate: 80.0,
            max_recovery_rate: 120.0,
            recovery_curve_steepness: 4.0,
            speed_penalty_threshold: 0.30,
            speed_penalty_amount: 0.50,
            consumption_reduction_threshold: 0.70,
            tired_consumption_penalty: 0.15,
            high_energy_efficiency: 0.35,
        }
    }
}

/// Immutable configuration for one level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelDescriptor {
    /// Flavor line for the intro banner
    pub description: String,

    // === Grid ===
    pub rows: u32,
    pub columns: u32,
    pub pattern: BrickPattern,
    /// Palette the tiered patterns draw from
    pub brick_types: Vec<BrickKind>,
    /// Bricks drift sideways while the level runs
    pub row_movement: bool,

    // === Ball ===
    /// Ball speed in design units (px per 1/60 s frame)
    pub ball_speed: f32,

    // === Tokens ===
    /// Chance a destroyed brick drops a token
    pub spawn_probability: f32,
    /// On-screen cap; None uses 3 + 2 * (level - 1)
    pub max_tokens: Option<u32>,
    /// Seconds between spawns
    pub spawn_cooldown: f32,
    /// Probability discount per token already on screen
    pub token_count_modifier: f32,
    pub min_spawn_chance: f32,
    /// Effect kind -> rarity weight multiplier
    pub rarity_modifiers: BTreeMap<EffectKind, f32>,
    pub effect_durations: EffectDurations,

    // === Scoring / tuning ===
    pub score_multiplier: f32,
    pub bricks: BrickTuning,
    pub paddle: PaddleTuning,
    pub energy: EnergyTuning,
}

impl Default for LevelDescriptor {
    fn default() -> Self {
        Self {
            description: String::new(),
            rows: 6,
            columns: 10,
            pattern: BrickPattern::Solid,
            brick_types: vec![BrickKind::Standard],
            row_movement: false,
            ball_speed: 4.0,
            spawn_probability: 0.20,
            max_tokens: None,
            spawn_cooldown: 0.8,
            token_count_modifier: 0.05,
            min_spawn_chance: 0.05,
            rarity_modifiers: BTreeMap::new(),
            effect_durations: EffectDurations::default(),
            score_multiplier: 1.0,
            bricks: BrickTuning::default(),
            paddle: PaddleTuning::default(),
            energy: EnergyTuning::default(),
        }
    }
}

impl LevelDescriptor {
    /// Clamp out-of-range fields instead of failing, logging each fix.
    pub fn validate(&mut self) {
        if self.rows == 0 || self.rows > 40 {
            log::warn!("descriptor rows {} out of range, clamping", self.rows);
            self.rows = self.rows.clamp(1, 40);
        }
        if self.columns == 0 || self.columns > 40 {
            log::warn!("descriptor columns {} out of range, clamping", self.columns);
            self.columns = self.columns.clamp(1, 40);
        }
        if self.brick_types.is_empty() {
            log::warn!("descriptor has an empty brick palette, using standard");
            self.brick_types.push(BrickKind::Standard);
        }
        if !(0.5..=15.0).contains(&self.ball_speed) {
            log::warn!("descriptor ball_speed {} out of range, clamping", self.ball_speed);
            self.ball_speed = self.ball_speed.clamp(0.5, 15.0);
        }
        self.spawn_probability = self.spawn_probability.clamp(0.0, 1.0);
        self.min_spawn_chance = self.min_spawn_chance.clamp(0.0, 1.0);
        self.token_count_modifier = self.token_count_modifier.clamp(0.0, 1.0);
        self.spawn_cooldown = self.spawn_cooldown.max(0.0);
        self.score_multiplier = self.score_multiplier.max(0.0);
        if self.paddle.base_width <= 0.0 {
            log::warn!("descriptor paddle base width invalid, using default");
            self.paddle.base_width = PaddleTuning::default().base_width;
        }
        if self.paddle.max_width < self.paddle.base_width {
            self.paddle.max_width = self.paddle.base_width;
        }
        if self.paddle.expansion_factor < 1.0 {
            self.paddle.expansion_factor = 1.0;
        }
        if self.energy.max_energy <= 0.0 {
            log::warn!("descriptor max_energy invalid, using default");
            self.energy.max_energy = EnergyTuning::default().max_energy;
        }
    }

    /// Descriptor for a campaign level. Levels 1-10 are handcrafted, the
    /// rest continue the endless progression formulas.
    pub fn campaign(level: u32) -> Self {
        let level = level.clamp(1, MAX_LEVEL);
        let mut desc = match level {
            1 => Self {
                description: "Learn the basics with simple bricks and helpful presents".into(),
                rows: 6,
                columns: 10,
                pattern: BrickPattern::Solid,
                brick_types: vec![BrickKind::Standard],
                max_tokens: Some(3),
                spawn_probability: 0.30,
                ball_speed: 3.0,
                rarity_modifiers: rarity_for_level(1),
                ..Self::default()
            },
            2 => Self {
                description: "Mixed brick types introduce strategy".into(),
                rows: 7,
                columns: 10,
                pattern: BrickPattern::Checkerboard,
                brick_types: vec![BrickKind::Standard, BrickKind::Metal],
                max_tokens: Some(5),
                spawn_probability: 0.25,
                ball_speed: 4.0,
                rarity_modifiers: rarity_for_level(2),
                ..Self::default()
            },
            3 => Self {
                description: "Moving rows and regenerating bricks challenge your skills".into(),
                rows: 8,
                columns: 10,
                pattern: BrickPattern::MovingRows,
                brick_types: vec![
                    BrickKind::Standard,
                    BrickKind::Metal,
                    BrickKind::Gold,
                    BrickKind::Regenerating,
                ],
                row_movement: true,
                max_tokens: Some(7),
                spawn_probability: 0.20,
                ball_speed: 5.0,
                rarity_modifiers: rarity_for_level(3),
                ..Self::default()
            },
            4 => Self {
                description: "Fortress layout with explosive chain reactions".into(),
                rows: 9,
                columns: 10,
                pattern: BrickPattern::Fortress,
                brick_types: vec![BrickKind::Metal, BrickKind::Gold, BrickKind::Explosive],
                max_tokens: Some(9),
                spawn_probability: 0.15,
                ball_speed: 6.0,
                rarity_modifiers: rarity_for_level(4),
                ..Self::default()
            },
            5 => Self {
                description: "Boss level with diamond core and multiple phases".into(),
                rows: 10,
                columns: 12,
                pattern: BrickPattern::BossFortress,
                brick_types: vec![
                    BrickKind::Gold,
                    BrickKind::Explosive,
                    BrickKind::Regenerating,
                    BrickKind::Diamond,
                ],
                max_tokens: Some(11),
                spawn_probability: 0.20,
                ball_speed: 7.0,
                rarity_modifiers: rarity_for_level(5),
                ..Self::default()
            },
            6..=9 => {
                let base = level - 5;
                Self {
                    description: format!("Procedural challenge {}", base),
                    rows: (10 + base).min(15),
                    columns: (12 + base / 2).min(16),
                    pattern: BrickPattern::Procedural,
                    brick_types: vec![
                        BrickKind::Gold,
                        BrickKind::Explosive,
                        BrickKind::Regenerating,
                        BrickKind::Diamond,
                    ],
                    max_tokens: Some(3 + 2 * (level - 1)),
                    spawn_probability: (0.20 - base as f32 * 0.02).max(0.10),
                    ball_speed: (7.0 + base as f32 * 0.5).min(12.0),
                    ..Self::default()
                }
            }
            10 => Self {
                description: "The ultimate challenge with all mechanics combined".into(),
                rows: 15,
                columns: 16,
                pattern: BrickPattern::UltimateFortress,
                brick_types: vec![
                    BrickKind::Gold,
                    BrickKind::Explosive,
                    BrickKind::Regenerating,
                    BrickKind::Diamond,
                ],
                max_tokens: Some(21),
                spawn_probability: 0.12,
                ball_speed: 12.0,
                ..Self::default()
            },
            _ => {
                let base = level - 5;
                Self {
                    description: format!("Endless challenge level {}", level),
                    rows: (15 + base / 2).min(20),
                    columns: (16 + base / 3).min(20),
                    pattern: BrickPattern::Procedural,
                    brick_types: vec![
                        BrickKind::Gold,
                        BrickKind::Explosive,
                        BrickKind::Regenerating,
                        BrickKind::Diamond,
                    ],
                    max_tokens: Some(3 + 2 * (level - 1)),
                    spawn_probability: (0.15 - base as f32 * 0.01).max(0.05),
                    ball_speed: (12.0 + base as f32 * 0.3).min(15.0),
                    ..Self::default()
                }
            }
        };
        desc.validate();
        desc
    }
}

/// Handcrafted rarity leans for the early campaign: helpful pickups while
/// learning, offense later, high value on the boss level.
fn rarity_for_level(level: u32) -> BTreeMap<EffectKind, f32> {
    let entries: &[(EffectKind, f32)] = match level {
        1 => &[
            (EffectKind::MultiBall, 1.2),
            (EffectKind::ExpandPaddle, 1.5),
            (EffectKind::SlowBall, 1.3),
            (EffectKind::Shield, 1.1),
            (EffectKind::EnergyBoost, 1.2),
            (EffectKind::EnergyFree, 1.1),
        ],
        2 => &[
            (EffectKind::MultiBall, 1.1),
            (EffectKind::ExpandPaddle, 1.2),
            (EffectKind::SlowBall, 1.1),
            (EffectKind::Shield, 1.0),
            (EffectKind::EnergyBoost, 1.1),
            (EffectKind::EnergyFree, 1.0),
        ],
        3 => &[
            (EffectKind::PowerShot, 1.3),
            (EffectKind::Shield, 1.2),
            (EffectKind::EnergyBoost, 1.0),
            (EffectKind::EnergyFree, 1.1),
        ],
        4 => &[
            (EffectKind::PowerShot, 1.5),
            (EffectKind::BonusPoints, 1.3),
            (EffectKind::EnergyBoost, 1.1),
            (EffectKind::EnergyFree, 1.2),
        ],
        5 => &[
            (EffectKind::BonusPoints, 1.5),
            (EffectKind::MultiBall, 1.4),
            (EffectKind::EnergyBoost, 1.3),
            (EffectKind::EnergyFree, 1.4),
        ],
        _ => &[],
    };
    entries.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_playable() {
        let desc = LevelDescriptor::default();
        assert_eq!(desc.rows, 6);
        assert_eq!(desc.columns, 10);
        assert_eq!(desc.brick_types, vec![BrickKind::Standard]);
        assert_eq!(desc.paddle.base_width, 120.0);
        assert_eq!(desc.energy.max_energy, 100.0);
    }

    #[test]
    fn test_campaign_handcrafted_levels() {
        let l1 = LevelDescriptor::campaign(1);
        assert_eq!((l1.rows, l1.columns), (6, 10));
        assert_eq!(l1.pattern, BrickPattern::Solid);
        assert_eq!(l1.max_tokens, Some(3));
        assert_eq!(l1.ball_speed, 3.0);
        assert!(!l1.row_movement);

        let l3 = LevelDescriptor::campaign(3);
        assert_eq!(l3.pattern, BrickPattern::MovingRows);
        assert!(l3.row_movement);

        let l5 = LevelDescriptor::campaign(5);
        assert_eq!((l5.rows, l5.columns), (10, 12));
        assert_eq!(l5.pattern, BrickPattern::BossFortress);
        assert!(l5.brick_types.contains(&BrickKind::Diamond));

        let l10 = LevelDescriptor::campaign(10);
        assert_eq!((l10.rows, l10.columns), (15, 16));
        assert_eq!(l10.pattern, BrickPattern::UltimateFortress);
        assert_eq!(l10.max_tokens, Some(21));
        assert_eq!(l10.ball_speed, 12.0);
    }

    #[test]
    fn test_campaign_procedural_formulas() {
        let l7 = LevelDescriptor::campaign(7);
        assert_eq!((l7.rows, l7.columns), (12, 13));
        assert!((l7.spawn_probability - 0.16).abs() < 1e-6);
        assert_eq!(l7.ball_speed, 8.0);
        assert_eq!(l7.max_tokens, Some(15));

        let l23 = LevelDescriptor::campaign(23);
        assert_eq!((l23.rows, l23.columns), (20, 20));
        assert!((l23.spawn_probability - 0.05).abs() < 1e-6);
        assert_eq!(l23.ball_speed, 15.0);

        // Speed never exceeds the cap even deep into endless levels
        let l50 = LevelDescriptor::campaign(50);
        assert_eq!(l50.ball_speed, 15.0);
        assert_eq!((l50.rows, l50.columns), (20, 20));
    }

    #[test]
    fn test_campaign_is_pure() {
        let a = LevelDescriptor::campaign(8);
        let b = LevelDescriptor::campaign(8);
        assert_eq!(a.rows, b.rows);
        assert_eq!(a.spawn_probability, b.spawn_probability);
        assert_eq!(a.rarity_modifiers, b.rarity_modifiers);
    }

    #[test]
    fn test_validate_clamps_bad_fields() {
        let mut desc = LevelDescriptor::default();
        desc.rows = 0;
        desc.columns = 500;
        desc.brick_types.clear();
        desc.ball_speed = -3.0;
        desc.spawn_probability = 2.0;
        desc.energy.max_energy = 0.0;
        desc.validate();

        assert_eq!(desc.rows, 1);
        assert_eq!(desc.columns, 40);
        assert_eq!(desc.brick_types, vec![BrickKind::Standard]);
        assert_eq!(desc.ball_speed, 0.5);
        assert_eq!(desc.spawn_probability, 1.0);
        assert_eq!(desc.energy.max_energy, 100.0);
    }

    #[test]
    fn test_minimal_json_fills_defaults() {
        let desc: LevelDescriptor =
            serde_json::from_str(r#"{"rows": 4, "pattern": "checkerboard"}"#).unwrap();
        assert_eq!(desc.rows, 4);
        assert_eq!(desc.columns, 10);
        assert_eq!(desc.pattern, BrickPattern::Checkerboard);
        assert_eq!(desc.effect_durations.slow_ball, 30.0);
        assert_eq!(desc.spawn_cooldown, 0.8);
    }

    #[test]
    fn test_effect_duration_lookup() {
        let durations = EffectDurations::default();
        assert_eq!(durations.duration_for(EffectKind::ExpandPaddle), 15.0);
        assert_eq!(durations.duration_for(EffectKind::SlowBall), 30.0);
        assert_eq!(durations.duration_for(EffectKind::Shield), 10.0);
        assert_eq!(durations.duration_for(EffectKind::MultiBall), 0.0);
    }
}
