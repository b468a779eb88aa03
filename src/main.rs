//! Headless demo driver.
//!
//! Plays a scripted session against the simulation core and logs the event
//! stream, exercising the same accumulator loop a rendering embedding would
//! run. Usage:
//!
//! ```text
//! canopy-breaker [descriptor.json] [seed]
//! ```
//!
//! With a descriptor path the session plays that single level; without one
//! it runs the built-in campaign. The seed makes a run reproducible.

use std::env;
use std::error::Error;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use canopy_breaker::consts::*;
use canopy_breaker::level::LevelDescriptor;
use canopy_breaker::sim::{GameEvent, GamePhase, GameState, TickInput, tick};

/// Safety cap on demo length: 30 minutes of simulated time.
const MAX_FRAMES: u32 = 60 * 60 * 30;

/// Fixed-substep frame pump plus the input intents for the next frame.
struct Driver {
    state: GameState,
    accumulator: f32,
    input: TickInput,
}

impl Driver {
    fn new(state: GameState) -> Self {
        Self {
            state,
            accumulator: 0.0,
            input: TickInput::default(),
        }
    }

    /// Advance one frame's worth of wall-clock time through the fixed-step
    /// accumulator, then drain and report the events it produced.
    fn advance(&mut self, frame_dt: f32) {
        self.accumulator += frame_dt.min(MAX_TICK_DT);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.input.clone();
            tick(&mut self.state, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.launch = false;
            self.input.pause = false;
        }

        for event in self.state.take_events() {
            report(&event);
        }
    }

    /// Keyboard autopilot: serve whenever balls are waiting, then chase the
    /// lowest descending ball, or the lowest token when nothing is falling
    /// toward the paddle.
    fn steer(&mut self) {
        if self.state.phase == GamePhase::Serve {
            self.input.launch = true;
        }

        let lowest_ball = self
            .state
            .balls
            .iter()
            .filter(|b| !b.is_attached() && b.vel.y > 0.0)
            .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
            .map(|b| b.pos.x);
        let lowest_token = self
            .state
            .tokens
            .iter()
            .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
            .map(|t| t.pos.x + TOKEN_SIZE * 0.5);

        match lowest_ball.or(lowest_token) {
            Some(target) => {
                let center = self.state.paddle.center_x();
                self.input.left = target < center - 10.0;
                self.input.right = target > center + 10.0;
            }
            None => {
                self.input.left = false;
                self.input.right = false;
            }
        }
    }
}

fn report(event: &GameEvent) {
    match event {
        GameEvent::Notification { text, color } => log::info!("[{}] {}", color, text),
        GameEvent::BrickDestroyed { kind, points, .. } => {
            log::debug!("destroyed {:?} brick for {} points", kind, points)
        }
        GameEvent::Explosion { center, radius } => {
            log::debug!("explosion at ({:.0}, {:.0}) radius {}", center.x, center.y, radius)
        }
        GameEvent::TokenSpawned { kind, .. } => log::debug!("token dropped: {:?}", kind),
        GameEvent::TokenCaught { kind } => log::info!("caught {:?}", kind),
        GameEvent::EffectExpired { kind } => log::info!("{:?} wore off", kind),
        GameEvent::ShieldBlocked { x } => log::info!("shield save at x={:.0}", x),
        GameEvent::BallLost { ball_id } => log::debug!("ball {} lost", ball_id),
        GameEvent::LifeLost { remaining } => log::info!("life lost, {} remaining", remaining),
        GameEvent::LevelCompleted { level, bonus } => {
            log::info!("level {} cleared, bonus {}", level, bonus)
        }
        GameEvent::GameOver { score } => log::info!("game over, final score {}", score),
        GameEvent::GameCompleted { score } => log::info!("campaign won, final score {}", score),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let descriptor_path = args.next();
    let seed = match args.next() {
        Some(raw) => raw.parse::<u64>()?,
        None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64,
    };

    let state = match &descriptor_path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            let descriptor: LevelDescriptor = serde_json::from_str(&json)?;
            log::info!("custom level from {}, seed {}", path, seed);
            GameState::with_descriptor(seed, descriptor)
        }
        None => {
            log::info!("campaign session, seed {}", seed);
            GameState::new(seed)
        }
    };

    let mut driver = Driver::new(state);
    for _ in 0..MAX_FRAMES {
        driver.steer();
        driver.advance(SIM_DT);
        if matches!(driver.state.phase, GamePhase::GameOver | GamePhase::Completed) {
            break;
        }
    }

    let state = &driver.state;
    log::info!(
        "finished after {:.1}s sim time at level {} with score {}",
        state.time,
        state.level,
        state.score
    );
    println!("{}", serde_json::to_string_pretty(&state.stats)?);
    Ok(())
}
