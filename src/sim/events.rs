//! Typed events the simulation emits for the presentation layer.
//!
//! Events accumulate on the state during a tick and are drained by the
//! embedding via `GameState::take_events`. The sim never calls out.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::brick::BrickKind;
use super::effects::EffectKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Centered banner text with a display color
    Notification { text: String, color: String },
    BrickDestroyed { kind: BrickKind, points: u32, center: Vec2 },
    Explosion { center: Vec2, radius: f32 },
    TokenSpawned { kind: EffectKind, pos: Vec2 },
    TokenCaught { kind: EffectKind },
    EffectExpired { kind: EffectKind },
    ShieldBlocked { x: f32 },
    BallLost { ball_id: u32 },
    LifeLost { remaining: u8 },
    LevelCompleted { level: u32, bonus: u64 },
    GameOver { score: u64 },
    GameCompleted { score: u64 },
}

impl GameEvent {
    /// Banner helper, used everywhere a notification is raised.
    pub fn note(text: impl Into<String>, color: &str) -> Self {
        GameEvent::Notification {
            text: text.into(),
            color: color.to_string(),
        }
    }
}
