//! Fixed timestep simulation tick
//!
//! Core game loop that advances the simulation deterministically. One call
//! moves the whole world by `dt`: paddle and energy, balls and collisions,
//! explosion chains, falling tokens, effect countdowns and the level
//! orchestration on top.

use glam::Vec2;
use rand::Rng;

use super::brick::BrickKind;
use super::collision::{
    circle_rect_collision, paddle_bounce, rects_overlap, resolve_circle_bounds,
    resolve_circle_rect,
};
use super::effects::{self, EffectKind, Token};
use super::events::GameEvent;
use super::state::{Ball, BallState, GamePhase, GameState, TRANSITION_DELAY};
use crate::consts::*;
use crate::design_speed;
use crate::level::{LevelDescriptor, MAX_LEVEL};

/// Hard bound on explosion chain generations. A fully explosive grid raises
/// one generation per tick, so the cap only exists to stop pathological
/// self-feeding queues.
pub const MAX_CHAIN_DEPTH: u32 = 32;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Keyboard left held
    pub left: bool,
    /// Keyboard right held
    pub right: bool,
    /// Pointer x in canvas coordinates; overrides keyboard while present
    pub pointer_x: Option<f32>,
    /// Launch attached balls (click/tap/space)
    pub launch: bool,
    /// Pause toggle
    pub pause: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    let dt = dt.clamp(0.0, MAX_TICK_DT);

    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing | GamePhase::Serve => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => {
                state.phase = if state.balls.iter().any(|b| !b.is_attached()) {
                    GamePhase::Playing
                } else {
                    GamePhase::Serve
                };
            }
            _ => {}
        }
    }

    // Don't tick if paused or the session is over
    match state.phase {
        GamePhase::Paused | GamePhase::GameOver | GamePhase::Completed => return,
        _ => {}
    }

    state.time += dt;
    state.level_time += dt;

    // --- PADDLE CONTROL AND ENERGY ---
    // Pointer control wins while a pointer position is reported; its drag
    // speed feeds the energy model at half weight.
    let mut pointer_influence = 0.0;
    let mut pointer_blocked = false;
    if let Some(pointer_x) = input.pointer_x {
        let before = state.paddle.pos.x;
        pointer_blocked = state.paddle.track_pointer(pointer_x, state.canvas.x);
        if dt > 0.0 {
            pointer_influence = (state.paddle.pos.x - before) / dt;
        }
    } else {
        let dir = (input.right as i32 - input.left as i32) as f32;
        state
            .paddle
            .drive(dir, state.energy.speed_multiplier, dt, state.canvas.x);
    }
    state.energy.update(
        &state.descriptor.energy,
        dt,
        state.paddle.vel,
        pointer_influence,
        state.paddle.wall_contact,
        pointer_blocked,
        state.effects.energy_boost_active,
        state.effects.energy_free_active,
    );

    // Attached balls ride the paddle
    for ball in state.balls.iter_mut() {
        ball.update_attached(&state.paddle);
    }

    // --- LAUNCH ---
    // Every attached ball releases at once. Side-docked balls mirror the
    // horizontal direction of their dock side.
    if input.launch && state.balls.iter().any(|b| b.is_attached()) {
        let speed = design_speed(state.descriptor.ball_speed);
        let slow = state.effects.slow_active;
        for ball in state.balls.iter_mut() {
            if let BallState::Attached { frac } = ball.state {
                let dir_x = if frac < 0.5 { -1.0 } else { 1.0 };
                let vel = Vec2::new(dir_x * speed, -speed);
                ball.launch(vel);
                if slow && state.effects.track_slow(ball.id, vel) {
                    ball.vel *= effects::SLOW_FACTOR;
                }
            }
        }
        if state.phase == GamePhase::Serve {
            state.phase = GamePhase::Playing;
        }
    }

    // --- BALL MOTION AND COLLISION ---
    let wall = state.canvas.x * WALL_FRAC;
    let top = state.canvas.y * TOP_FRAC;
    let (shield_pos, shield_size) = state.shield_rect();
    let mut destroyed: Vec<(BrickKind, Vec2)> = Vec::new();
    let mut lost: Vec<u32> = Vec::new();

    for ball in state.balls.iter_mut() {
        if ball.is_attached() {
            continue;
        }
        ball.pos += ball.vel * dt;

        resolve_circle_bounds(
            &mut ball.pos,
            &mut ball.vel,
            ball.radius,
            wall,
            state.canvas.x - wall,
            top,
        );

        // Paddle catches only balls on the way down
        if ball.vel.y > 0.0
            && circle_rect_collision(ball.pos, ball.radius, state.paddle.pos, state.paddle.size())
                .hit
        {
            let speed = ball.speed();
            ball.vel = paddle_bounce(ball.pos.x, state.paddle.pos.x, state.paddle.width, speed);
            ball.pos.y = state.paddle.pos.y - ball.radius;
            // A power shot not spent on a brick is spent here
            ball.power_shot = false;
        }

        // At most one brick reacts per ball per tick, scanned column by
        // column so simultaneous overlaps resolve the same way every run.
        'grid: for column in state.grid.columns.iter_mut() {
            for brick in column.iter_mut() {
                if brick.destroyed {
                    continue;
                }
                if ball.power_shot {
                    if circle_rect_collision(ball.pos, ball.radius, brick.pos, brick.size).hit {
                        ball.power_shot = false;
                        brick.demolish();
                        destroyed.push((brick.kind, brick.center()));
                        if let Some(event) = brick.explosion(0) {
                            state.explosions.push(event);
                        }
                        break 'grid;
                    }
                } else if resolve_circle_rect(
                    &mut ball.pos,
                    &mut ball.vel,
                    ball.radius,
                    brick.pos,
                    brick.size,
                ) {
                    if brick.hit() {
                        destroyed.push((brick.kind, brick.center()));
                        if let Some(event) = brick.explosion(0) {
                            state.explosions.push(event);
                        }
                    }
                    break 'grid;
                }
            }
        }

        // Shield plane saves one ball, then it is spent
        if state.effects.shield_active
            && ball.vel.y > 0.0
            && resolve_circle_rect(
                &mut ball.pos,
                &mut ball.vel,
                ball.radius,
                shield_pos,
                shield_size,
            )
        {
            state.effects.consume_shield();
            state.events.push(GameEvent::ShieldBlocked { x: ball.pos.x });
            state
                .events
                .push(GameEvent::note("Shield Protected!", "#50E3C2"));
        }

        if ball.pos.y - ball.radius > state.canvas.y {
            lost.push(ball.id);
        }
    }

    for &id in &lost {
        state.effects.purge_ball(id);
        state.events.push(GameEvent::BallLost { ball_id: id });
    }
    state.balls.retain(|b| !lost.contains(&b.id));

    // Score the bricks the balls took out and roll their token drops
    for (kind, center) in destroyed {
        score_destroyed_brick(state, kind, center);
    }

    // --- EXPLOSION CHAIN PASS ---
    // Drain this tick's queue once; blasts found mid-drain go to the next
    // tick, so a chain advances one generation per tick.
    let pending = std::mem::take(&mut state.explosions);
    for event in pending {
        state.events.push(GameEvent::Explosion {
            center: event.center,
            radius: event.radius,
        });
        if event.depth >= MAX_CHAIN_DEPTH {
            log::warn!("explosion chain truncated at depth {}", event.depth);
            continue;
        }
        let mut chained: Vec<(BrickKind, Vec2)> = Vec::new();
        for brick in state.grid.bricks_mut() {
            if brick.destroyed {
                continue;
            }
            if brick.center().distance(event.center) <= event.radius {
                brick.demolish();
                chained.push((brick.kind, brick.center()));
                if let Some(next) = brick.explosion(event.depth + 1) {
                    state.explosions.push(next);
                }
            }
        }
        for (kind, center) in chained {
            score_destroyed_brick(state, kind, center);
        }
    }

    // --- BRICK TIMERS AND MOVEMENT ---
    for brick in state.grid.bricks_mut() {
        brick.update(dt);
    }
    if state.descriptor.row_movement {
        state.grid.update_moving_rows(state.level_time, dt, state.canvas.x);
    }

    // --- TOKENS ---
    let paddle_pos = state.paddle.pos;
    let paddle_size = state.paddle.size();
    let canvas_h = state.canvas.y;
    let mut caught: Vec<EffectKind> = Vec::new();
    state.tokens.retain_mut(|token| {
        token.update(dt);
        if rects_overlap(token.pos, Token::size(), paddle_pos, paddle_size) {
            caught.push(token.kind);
            return false;
        }
        !token.past_bottom(canvas_h)
    });
    for kind in caught {
        state.stats.tokens_caught += 1;
        state.events.push(GameEvent::TokenCaught { kind });
        state
            .events
            .push(GameEvent::note(kind.description(), kind.color()));
        apply_catch(state, kind);
    }

    // --- EFFECT COUNTDOWNS ---
    // The countdown machine flips its own flags; reverting the paddle and
    // the ball velocities is done here where those entities live.
    for kind in state.effects.update_timers(dt) {
        state.events.push(GameEvent::EffectExpired { kind });
        match kind {
            EffectKind::ExpandPaddle => {
                let base = state.descriptor.paddle.base_width;
                state.paddle.set_width(base, state.canvas.x);
            }
            EffectKind::SlowBall => {
                let originals = std::mem::take(&mut state.effects.slow_originals);
                for ball in state.balls.iter_mut() {
                    if let Some(original) = originals.get(&ball.id) {
                        ball.vel = *original;
                    }
                }
            }
            _ => {}
        }
    }

    // --- LIVES ---
    if state.balls.is_empty()
        && matches!(state.phase, GamePhase::Playing | GamePhase::Transition)
    {
        state.lives = state.lives.saturating_sub(1);
        state.events.push(GameEvent::LifeLost {
            remaining: state.lives,
        });
        if state.lives == 0 {
            state.phase = GamePhase::GameOver;
            state.events.push(GameEvent::GameOver { score: state.score });
            log::info!("game over: score {}", state.score);
        } else {
            state.spawn_ball_attached(0.5);
            if state.phase == GamePhase::Playing {
                state.phase = GamePhase::Serve;
            }
        }
    }

    // --- LEVEL ORCHESTRATION ---
    if state.phase == GamePhase::Playing && state.grid.all_cleared() {
        complete_level(state);
    }
    if state.phase == GamePhase::Transition {
        state.transition_timer -= dt;
        if state.transition_timer <= 0.0 {
            advance_level(state);
        }
    }

    // Ensure deterministic ordering
    state.normalize_order();
}

/// Points, stats, events and the drop roll for one destroyed brick.
fn score_destroyed_brick(state: &mut GameState, kind: BrickKind, center: Vec2) {
    let points = kind.points(state.level);
    state.add_points(points);
    state.stats.bricks_destroyed += 1;
    state.events.push(GameEvent::BrickDestroyed {
        kind,
        points,
        center,
    });
    try_spawn_token(state, center);
}

/// Roll a token drop for a destroyed brick: the cooldown gate first, then
/// the on-screen cap, then the crowding-discounted probability.
fn try_spawn_token(state: &mut GameState, center: Vec2) {
    let desc = &state.descriptor;
    let on_cooldown = state
        .last_token_spawn
        .map_or(false, |t| state.time - t < desc.spawn_cooldown);
    if on_cooldown {
        return;
    }
    if (state.tokens.len() as u32) >= effects::max_tokens(desc, state.level) {
        return;
    }
    let chance = effects::spawn_probability(desc, state.tokens.len());
    if state.rng.random::<f32>() >= chance {
        return;
    }
    let kind = effects::pick_kind(&state.descriptor, &mut state.rng);
    let pos = center - Token::size() * 0.5;
    state.tokens.push(Token::new(pos, kind));
    state.last_token_spawn = Some(state.time);
    state.stats.tokens_spawned += 1;
    state.events.push(GameEvent::TokenSpawned { kind, pos });
}

/// Apply one caught token. Timed kinds arm or refresh their countdown;
/// instant kinds act immediately.
fn apply_catch(state: &mut GameState, kind: EffectKind) {
    let durations = state.descriptor.effect_durations;
    match kind {
        EffectKind::MultiBall => spawn_multiball(state),

        EffectKind::ExpandPaddle => {
            let tuning = state.descriptor.paddle;
            let was_expanded = state.effects.expand_level > 0;
            if state.effects.expand_level < tuning.max_expansions {
                state.effects.expand_level += 1;
                let factor = tuning.expansion_factor.powi(state.effects.expand_level as i32);
                let width = (tuning.base_width * factor).min(tuning.max_width);
                state.paddle.set_width(width, state.canvas.x);
            }
            state.effects.expand_timer = durations.expand_paddle;
            if was_expanded {
                state
                    .events
                    .push(GameEvent::note("Paddle Extended! Timer Reset!", "#7ED321"));
            }
        }

        EffectKind::SlowBall => {
            let was_active = state.effects.slow_active;
            state.effects.slow_active = true;
            state.effects.slow_timer = durations.slow_ball;
            for ball in state.balls.iter_mut() {
                if ball.is_attached() {
                    continue;
                }
                if state.effects.track_slow(ball.id, ball.vel) {
                    ball.vel *= effects::SLOW_FACTOR;
                }
            }
            if was_active {
                state
                    .events
                    .push(GameEvent::note("Slow Ball Refreshed! Timer Reset!", "#9013FE"));
            }
        }

        EffectKind::PowerShot => {
            for ball in state.balls.iter_mut() {
                ball.power_shot = true;
            }
        }

        EffectKind::Shield => {
            let was_active = state.effects.shield_active;
            state.effects.shield_active = true;
            state.effects.shield_timer = durations.shield;
            if was_active {
                state
                    .events
                    .push(GameEvent::note("Shield Refreshed! Timer Reset!", "#50E3C2"));
            }
        }

        EffectKind::BonusPoints => {
            let awarded = state.add_points(effects::BONUS_POINTS);
            state.stats.token_points += awarded;
        }

        EffectKind::EnergyBoost => {
            state.effects.energy_boost_active = true;
            state.effects.energy_boost_timer = durations.energy_boost;
            let refill = state.descriptor.energy.max_energy * effects::BOOST_REFILL_FRAC;
            state.energy.add(&state.descriptor.energy, refill);
        }

        EffectKind::EnergyFree => {
            state.effects.energy_free_active = true;
            state.effects.energy_free_timer = durations.energy_free;
        }
    }
}

/// Two sibling balls off the primary ball. A flying primary spawns them at
/// its position launched 45 degrees down-right and up-right at its pre-slow
/// speed; an unlaunched primary docks them on the paddle instead.
fn spawn_multiball(state: &mut GameState) {
    let Some(main) = state.balls.first().cloned() else {
        return;
    };
    if !main.is_attached() && main.vel != Vec2::ZERO {
        let mut speed = main.speed();
        if state.effects.slow_active {
            if let Some(original) = state.effects.slow_originals.get(&main.id) {
                speed = original.length();
            }
        }
        for angle in [std::f32::consts::FRAC_PI_4, -std::f32::consts::FRAC_PI_4] {
            let vel = Vec2::new(angle.cos(), angle.sin()) * speed;
            let id = state.next_entity_id();
            let mut ball = Ball::new(id);
            ball.pos = main.pos;
            ball.state = BallState::Free;
            ball.vel = vel;
            if state.effects.slow_active && state.effects.track_slow(id, vel) {
                ball.vel *= effects::SLOW_FACTOR;
            }
            state.balls.push(ball);
        }
    } else {
        state.spawn_ball_attached(0.25);
        state.spawn_ball_attached(0.75);
    }
}

/// Clearing the grid: bank stats and bonuses, start the transition.
fn complete_level(state: &mut GameState) {
    state.stats.levels_completed += 1;
    state.stats.time_played += state.level_time;

    if state.lives == state.lives_at_level_start {
        state.stats.perfect_levels += 1;
        state.add_points(1000 * state.level);
    }
    let completion = 500 * state.level;
    let bonus = state.add_points(completion);

    state.phase = GamePhase::Transition;
    state.transition_timer = TRANSITION_DELAY;
    state.events.push(GameEvent::LevelCompleted {
        level: state.level,
        bonus,
    });
    state.events.push(GameEvent::note(
        format!("Level {} Complete!", state.level),
        "#32CD32",
    ));
    state
        .events
        .push(GameEvent::note(format!("+{} bonus points", completion), "#FFD700"));
    log::info!("level {} complete, score {}", state.level, state.score);
}

/// Load the next campaign level, or finish the game when there is none.
fn advance_level(state: &mut GameState) {
    if state.campaign && state.level < MAX_LEVEL {
        let next = state.level + 1;
        state.load_level(next, LevelDescriptor::campaign(next));
    } else {
        complete_game(state);
    }
}

/// End-of-game bonuses go straight to the score: they are session-level,
/// outside any level's multiplier.
fn complete_game(state: &mut GameState) {
    state.phase = GamePhase::Completed;
    let time_ms = (state.stats.time_played * 1000.0) as u64;
    let time_bonus = 10000u64.saturating_sub(time_ms);
    let perfect_bonus = 2000 * state.stats.perfect_levels as u64;
    state.score += time_bonus + perfect_bonus;

    state.events.push(GameEvent::GameCompleted { score: state.score });
    state.events.push(GameEvent::note(
        "Congratulations! All Levels Complete!",
        "#FFD700",
    ));
    state
        .events
        .push(GameEvent::note(format!("Final Score: {}", state.score), "#32CD32"));
    log::info!("campaign complete: final score {}", state.score);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::brick::ExplosionEvent;
    use crate::sim::energy::EnergyLevel;

    fn launch_input() -> TickInput {
        TickInput {
            launch: true,
            ..Default::default()
        }
    }

    /// Single-brick-row descriptor so scenarios control exactly what the
    /// ball can hit. Token drops and random durability bonuses are disabled
    /// so score assertions are exact.
    fn sparse_descriptor(columns: u32, kinds: Vec<BrickKind>) -> LevelDescriptor {
        let mut desc = LevelDescriptor {
            rows: 1,
            columns,
            brick_types: kinds,
            spawn_probability: 0.0,
            min_spawn_chance: 0.0,
            ..Default::default()
        };
        desc.bricks.durability_bonus_chance = 0.0;
        desc
    }

    #[test]
    fn test_tick_serve_to_playing() {
        let mut state = GameState::new(12345);
        assert_eq!(state.phase, GamePhase::Serve);
        assert_eq!(state.balls.len(), 1);

        // Tick without launch - should stay in Serve
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.phase, GamePhase::Serve);

        tick(&mut state, &launch_input(), SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(matches!(state.balls[0].state, BallState::Free));
        // Campaign level 1 launches at 3.0 design units diagonally up-right
        let expected = design_speed(3.0);
        assert!(state.balls[0].vel.x > 0.0);
        assert!((state.balls[0].vel.y + expected).abs() < 1.0);
    }

    #[test]
    fn test_tick_pause() {
        let mut state = GameState::new(12345);
        tick(&mut state, &launch_input(), SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);

        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, SIM_DT);
        assert_eq!(state.phase, GamePhase::Paused);

        // Paused world does not advance
        let frozen = state.balls[0].pos;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.balls[0].pos, frozen);

        tick(&mut state, &pause, SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_determinism() {
        // Two states with the same seed must stay identical under the same
        // input sequence
        let mut state1 = GameState::new(99999);
        let mut state2 = GameState::new(99999);

        let script = |t: u32| -> TickInput {
            TickInput {
                left: t % 97 < 30,
                right: t % 97 >= 60,
                pointer_x: if t % 13 == 0 { Some(300.0 + t as f32) } else { None },
                launch: t == 5,
                pause: false,
            }
        };

        for t in 0..600 {
            let input = script(t);
            tick(&mut state1, &input, SIM_DT);
            tick(&mut state2, &input, SIM_DT);
        }

        assert_eq!(state1.score, state2.score);
        assert_eq!(state1.balls.len(), state2.balls.len());
        for (a, b) in state1.balls.iter().zip(&state2.balls) {
            assert_eq!(a.pos, b.pos);
            assert_eq!(a.vel, b.vel);
        }
        assert_eq!(state1.grid.active_count(), state2.grid.active_count());
        assert_eq!(state1.energy.current, state2.energy.current);
        assert_eq!(state1.tokens.len(), state2.tokens.len());
    }

    #[test]
    fn test_first_brick_hit_scores_its_point_value() {
        let mut state = GameState::with_descriptor(
            7,
            sparse_descriptor(2, vec![BrickKind::Standard]),
        );
        tick(&mut state, &launch_input(), SIM_DT);

        // Aim the ball straight up under the left brick
        let target_x = state.grid.columns[0][0].center().x;
        state.balls[0].pos = Vec2::new(target_x, 400.0);
        state.balls[0].vel = Vec2::new(0.0, -design_speed(4.0));

        let before = state.score;
        for _ in 0..200 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            if state.score != before {
                break;
            }
        }

        assert_eq!(state.score, 50);
        assert!(state.grid.columns[0][0].destroyed);
        assert!(!state.grid.columns[1][0].destroyed);
        // Bounced back down
        assert!(state.balls[0].vel.y > 0.0);
    }

    #[test]
    fn test_paddle_confined_under_conflicting_input() {
        let mut state = GameState::new(11);
        let input = TickInput {
            left: true,
            pointer_x: Some(-500.0),
            ..Default::default()
        };
        for _ in 0..120 {
            tick(&mut state, &input, SIM_DT);
        }
        let wall = state.canvas.x * WALL_FRAC;
        assert_eq!(state.paddle.pos.x, wall);
        // Pointer-blocked movement costs nothing
        assert!(state.energy.current > state.descriptor.energy.max_energy * 0.95);
    }

    #[test]
    fn test_sustained_movement_drains_to_tired() {
        let mut state = GameState::new(21);
        // Alternate directions so the paddle keeps moving without parking
        // against a wall
        for t in 0..300 {
            let input = TickInput {
                left: (t / 30) % 2 == 0,
                right: (t / 30) % 2 == 1,
                ..Default::default()
            };
            tick(&mut state, &input, SIM_DT);
        }
        let tuning = state.descriptor.energy;
        assert!(state.energy.current < tuning.max_energy * 0.30);
        assert!(state.energy.level <= EnergyLevel::Tired);
        assert_eq!(state.energy.speed_multiplier, tuning.speed_penalty_amount);
    }

    #[test]
    fn test_expand_stacks_twice_then_only_refreshes() {
        let mut state = GameState::new(1);
        let base = state.descriptor.paddle.base_width;

        apply_catch(&mut state, EffectKind::ExpandPaddle);
        assert_eq!(state.effects.expand_level, 1);
        assert!((state.paddle.width - base * 1.4).abs() < 1e-3);

        apply_catch(&mut state, EffectKind::ExpandPaddle);
        assert_eq!(state.effects.expand_level, 2);
        assert!((state.paddle.width - (base * 1.96).min(240.0)).abs() < 1e-3);

        // Third catch keeps the width but rearms the timer
        state.effects.expand_timer = 3.0;
        let width = state.paddle.width;
        apply_catch(&mut state, EffectKind::ExpandPaddle);
        assert_eq!(state.effects.expand_level, 2);
        assert_eq!(state.paddle.width, width);
        assert_eq!(
            state.effects.expand_timer,
            state.descriptor.effect_durations.expand_paddle
        );
    }

    #[test]
    fn test_expand_expiry_restores_base_width() {
        let mut state = GameState::new(2);
        apply_catch(&mut state, EffectKind::ExpandPaddle);
        apply_catch(&mut state, EffectKind::ExpandPaddle);
        state.effects.expand_timer = 0.01;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.effects.expand_level, 0);
        assert_eq!(state.paddle.width, state.descriptor.paddle.base_width);
    }

    #[test]
    fn test_slow_round_trip_restores_velocities() {
        let mut state = GameState::new(31);
        tick(&mut state, &launch_input(), SIM_DT);
        let before = state.balls[0].vel;

        apply_catch(&mut state, EffectKind::SlowBall);
        assert!((state.balls[0].vel - before * effects::SLOW_FACTOR).length() < 1e-3);

        // Siblings spawned mid-effect are slowed and tracked too
        apply_catch(&mut state, EffectKind::MultiBall);
        assert_eq!(state.balls.len(), 3);
        for ball in &state.balls {
            let full = before.length();
            assert!((ball.speed() - full * effects::SLOW_FACTOR).abs() < 1e-2);
        }

        state.effects.slow_timer = 0.001;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!(!state.effects.slow_active);
        assert!(state.effects.slow_originals.is_empty());
        for ball in &state.balls {
            assert!((ball.speed() - before.length()).abs() < 1e-2);
        }
    }

    #[test]
    fn test_explosion_chain_consumes_whole_grid() {
        let mut desc = sparse_descriptor(4, vec![BrickKind::Explosive]);
        desc.rows = 4;
        let mut state = GameState::with_descriptor(17, desc);
        assert_eq!(state.grid.active_count(), 16);

        let first = state.grid.columns[0][0].center();
        state.grid.columns[0][0].demolish();
        state.explosions.push(ExplosionEvent {
            center: first,
            radius: crate::sim::brick::EXPLOSION_RADIUS,
            depth: 0,
        });

        for _ in 0..100 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            if state.grid.active_count() == 0 && state.explosions.is_empty() {
                break;
            }
        }

        assert_eq!(state.grid.active_count(), 0);
        assert!(state.explosions.is_empty());
        // 15 bricks scored (the seed brick was demolished by hand):
        // explosive is special, 150 + 50 * level each
        assert_eq!(state.score, 15 * 200);
    }

    #[test]
    fn test_shield_saves_exactly_one_ball() {
        let mut state = GameState::new(41);
        tick(&mut state, &launch_input(), SIM_DT);
        apply_catch(&mut state, EffectKind::Shield);

        // Drop the ball well away from the paddle so only the shield can
        // catch it
        let (shield_pos, _) = state.shield_rect();
        state.balls[0].pos = Vec2::new(100.0, shield_pos.y - 20.0);
        state.balls[0].vel = Vec2::new(0.0, 300.0);

        let mut blocked = false;
        for _ in 0..20 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            if state
                .take_events()
                .iter()
                .any(|e| matches!(e, GameEvent::ShieldBlocked { .. }))
            {
                blocked = true;
                break;
            }
        }
        assert!(blocked);
        assert!(!state.effects.shield_active);
        assert!(state.balls[0].vel.y < 0.0);
        assert_eq!(state.lives, 3);
    }

    #[test]
    fn test_ball_loss_costs_life_then_game_over() {
        let mut state = GameState::new(51);
        tick(&mut state, &launch_input(), SIM_DT);

        state.balls[0].pos = Vec2::new(450.0, state.canvas.y + 50.0);
        state.balls[0].vel = Vec2::new(0.0, 300.0);
        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.lives, 2);
        assert_eq!(state.phase, GamePhase::Serve);
        assert_eq!(state.balls.len(), 1);
        assert!(state.balls[0].is_attached());

        // Down to the last life, the same loss ends the game
        state.lives = 1;
        tick(&mut state, &launch_input(), SIM_DT);
        state.balls[0].pos = Vec2::new(450.0, state.canvas.y + 50.0);
        state.balls[0].vel = Vec2::new(0.0, 300.0);
        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.lives, 0);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state
            .take_events()
            .iter()
            .any(|e| matches!(e, GameEvent::GameOver { .. })));
    }

    #[test]
    fn test_level_completion_advances_campaign() {
        let mut state = GameState::new(61);
        tick(&mut state, &launch_input(), SIM_DT);
        // Park the ball far from the bottom so nothing is lost mid-check
        state.balls[0].pos = Vec2::new(450.0, 500.0);
        state.balls[0].vel = Vec2::new(0.0, -design_speed(3.0));

        for brick in state.grid.bricks_mut() {
            brick.demolish();
        }
        state.take_events();
        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.phase, GamePhase::Transition);
        // Perfect level 1: 1000 + 500 completion
        assert_eq!(state.score, 1500);
        assert_eq!(state.stats.perfect_levels, 1);
        let events = state.take_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::LevelCompleted { level: 1, .. })));

        // Ride out the transition; keep the ball heading up meanwhile
        let ticks = (TRANSITION_DELAY / SIM_DT) as u32 + 2;
        for _ in 0..ticks {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }

        assert_eq!(state.level, 2);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.grid.active_count() > 0);
        // Ball speed retargeted to the level 2 descriptor
        assert!((state.balls[0].speed() - design_speed(4.0)).abs() < 1.0);
    }

    #[test]
    fn test_custom_session_completes_after_its_level() {
        let mut state =
            GameState::with_descriptor(71, sparse_descriptor(1, vec![BrickKind::Standard]));
        tick(&mut state, &launch_input(), SIM_DT);
        state.balls[0].pos = Vec2::new(450.0, 500.0);
        state.balls[0].vel = Vec2::new(0.0, -design_speed(4.0));

        for brick in state.grid.bricks_mut() {
            brick.demolish();
        }
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.phase, GamePhase::Transition);

        let ticks = (TRANSITION_DELAY / SIM_DT) as u32 + 2;
        for _ in 0..ticks {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }

        assert_eq!(state.phase, GamePhase::Completed);
        // Perfect + completion + time bonus + perfect-level bonus
        assert!(state.score >= 3500);
        // Completed sessions stop ticking
        let frozen = state.score;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.score, frozen);
    }

    #[test]
    fn test_token_catch_scores_bonus_points() {
        let mut state = GameState::new(81);
        tick(&mut state, &launch_input(), SIM_DT);
        state.take_events();

        // Drop a bonus token straight onto the paddle
        let pos = Vec2::new(
            state.paddle.center_x() - TOKEN_SIZE * 0.5,
            state.paddle.pos.y - TOKEN_SIZE + 2.0,
        );
        state.tokens.push(Token::new(pos, EffectKind::BonusPoints));

        let before = state.score;
        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.score, before + effects::BONUS_POINTS as u64);
        assert_eq!(state.stats.tokens_caught, 1);
        assert!(state.tokens.is_empty());
        assert!(state
            .take_events()
            .iter()
            .any(|e| matches!(e, GameEvent::TokenCaught { kind: EffectKind::BonusPoints })));
    }

    #[test]
    fn test_power_shot_demolishes_without_bounce() {
        let mut state = GameState::with_descriptor(
            91,
            sparse_descriptor(2, vec![BrickKind::Diamond]),
        );
        tick(&mut state, &launch_input(), SIM_DT);
        apply_catch(&mut state, EffectKind::PowerShot);

        let target_x = state.grid.columns[0][0].center().x;
        state.balls[0].pos = Vec2::new(target_x, 400.0);
        state.balls[0].vel = Vec2::new(0.0, -design_speed(4.0));

        for _ in 0..200 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            if state.grid.columns[0][0].destroyed {
                break;
            }
        }

        // Diamond takes 4 hits normally; the power shot needed one and the
        // ball kept flying upward
        assert!(state.grid.columns[0][0].destroyed);
        assert!(!state.balls[0].power_shot);
        assert!(state.balls[0].vel.y < 0.0);
    }
}
