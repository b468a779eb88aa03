//! Energy budget governing paddle responsiveness.
//!
//! Moving the paddle drains a meter; resting refills it along a curve that
//! recovers fastest when the meter is nearly empty. Low energy throttles
//! paddle speed and acceleration, so play settles into bursts of movement
//! with deliberate rests.

use serde::{Deserialize, Serialize};

use crate::consts;
use crate::level::EnergyTuning;

/// Ratio bands for the display state, lowest first.
const STRUGGLING_RATIO: f32 = 0.15;
const TIRED_RATIO: f32 = 0.30;
const NORMAL_RATIO: f32 = 0.60;
const ENERGIZED_RATIO: f32 = 0.70;

/// Per-tick easing applied to the speed multiplier while above the penalty
/// threshold.
const SPEED_SMOOTHING: f32 = 0.05;

/// Consumption factor while the energy-boost effect runs.
const BOOST_CONSUMPTION_FACTOR: f32 = 0.6;

/// Display/behavior band derived from the energy ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnergyLevel {
    Struggling,
    Tired,
    Normal,
    Energized,
    Peak,
}

/// The paddle's energy meter and the throttle derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyMeter {
    pub current: f32,
    pub level: EnergyLevel,
    /// Applied to paddle max speed and acceleration, eased toward 1.0
    pub speed_multiplier: f32,
}

impl EnergyMeter {
    pub fn new(tuning: &EnergyTuning) -> Self {
        Self {
            current: tuning.max_energy,
            level: EnergyLevel::Peak,
            speed_multiplier: 1.0,
        }
    }

    pub fn ratio(&self, tuning: &EnergyTuning) -> f32 {
        if tuning.max_energy <= 0.0 {
            return 0.0;
        }
        self.current / tuning.max_energy
    }

    /// Instant refill (energy-boost pickup), clamped to the meter range.
    pub fn add(&mut self, tuning: &EnergyTuning, amount: f32) {
        self.current = (self.current + amount).clamp(0.0, tuning.max_energy);
    }

    /// One control-loop step.
    ///
    /// `keyboard_vel` is the paddle's own velocity in px/s, `pointer_influence`
    /// the pointer-drag speed in px/s. Wall contact and pointer-block both
    /// force pure recovery: pushing against a wall costs nothing.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        tuning: &EnergyTuning,
        dt: f32,
        keyboard_vel: f32,
        pointer_influence: f32,
        wall_contact: bool,
        pointer_blocked: bool,
        boost_active: bool,
        free_active: bool,
    ) {
        if wall_contact || pointer_blocked {
            self.recover(tuning, dt);
            self.refresh_level(tuning);
            self.ease_speed_multiplier(tuning);
            return;
        }

        let total = keyboard_vel.abs().max(pointer_influence.abs() * 0.5);
        let intensity = (total / consts::PADDLE_MAX_SPEED).min(1.0);
        let moving = total > consts::MOVE_EPSILON;

        if moving {
            self.consume(tuning, dt, intensity, boost_active, free_active);
        } else {
            self.recover(tuning, dt);
        }
        self.refresh_level(tuning);
        self.ease_speed_multiplier(tuning);
    }

    fn consume(&mut self, tuning: &EnergyTuning, dt: f32, intensity: f32, boost: bool, free: bool) {
        if free {
            return;
        }
        let mut base = tuning.base_consumption_rate;
        if boost {
            base *= BOOST_CONSUMPTION_FACTOR;
        }
        let ratio = self.ratio(tuning);
        let mut efficiency = 1.0;
        if ratio >= tuning.consumption_reduction_threshold {
            efficiency *= 1.0 - tuning.high_energy_efficiency;
        }
        if ratio <= tuning.speed_penalty_threshold {
            efficiency *= 1.0 - tuning.tired_consumption_penalty;
        }
        let drain = (base * intensity * dt * efficiency).max(0.0);
        self.current = (self.current - drain).max(0.0);
    }

    fn recover(&mut self, tuning: &EnergyTuning, dt: f32) {
        let ratio = self.ratio(tuning);
        let rate = tuning.max_recovery_rate * (1.0 - ratio).powf(tuning.recovery_curve_steepness);
        self.current = (self.current + rate * dt).min(tuning.max_energy);
    }

    fn refresh_level(&mut self, tuning: &EnergyTuning) {
        let ratio = self.ratio(tuning);
        let next = if ratio <= STRUGGLING_RATIO {
            EnergyLevel::Struggling
        } else if ratio <= TIRED_RATIO {
            EnergyLevel::Tired
        } else if ratio <= NORMAL_RATIO {
            EnergyLevel::Normal
        } else if ratio <= ENERGIZED_RATIO {
            EnergyLevel::Energized
        } else {
            EnergyLevel::Peak
        };
        if next != self.level {
            log::debug!("energy level {:?} -> {:?} ({:.1})", self.level, next, self.current);
            self.level = next;
        }
    }

    fn ease_speed_multiplier(&mut self, tuning: &EnergyTuning) {
        if self.ratio(tuning) <= tuning.speed_penalty_threshold {
            self.speed_multiplier = tuning.speed_penalty_amount;
        } else {
            self.speed_multiplier += (1.0 - self.speed_multiplier) * SPEED_SMOOTHING;
        }
    }
}
