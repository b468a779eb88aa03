//! Brick entities and the grid that arranges them.
//!
//! Grid layout is derived from canvas size so levels scale with resolution.
//! Placement patterns are pure functions of (column, row, descriptor); the
//! only randomness comes from the caller's seeded RNG, so a grid rebuilds
//! bit-for-bit from the same seed.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts;
use crate::level::{BrickPattern, LevelDescriptor};

/// Blast radius of an explosive brick in px
pub const EXPLOSION_RADIUS: f32 = 80.0;
/// Seconds a regenerating brick stays down before restoring
pub const REGEN_DELAY: f32 = 10.0;
/// Bonus points per level for special brick kinds
pub const SPECIAL_LEVEL_BONUS: u32 = 50;

/// Horizontal drift speed on row-movement levels (0.5 design units)
pub const ROW_DRIFT_SPEED: f32 = 30.0;
/// Drifting bricks stop this far from the side walls
pub const ROW_DRIFT_MARGIN: f32 = 10.0;

/// Widest a brick may get, as a fraction of canvas width
const MAX_BRICK_WIDTH_FRAC: f32 = 0.083;
/// Brick height as a fraction of canvas height
const BRICK_HEIGHT_FRAC: f32 = 0.028;
/// Gap between bricks as a fraction of canvas width
const BRICK_PADDING_FRAC: f32 = 0.004;
/// Grid top offset as a fraction of canvas height
const GRID_TOP_FRAC: f32 = 0.111;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrickKind {
    #[default]
    Standard,
    Metal,
    Gold,
    Explosive,
    Regenerating,
    Diamond,
}

impl BrickKind {
    pub fn base_durability(self) -> u8 {
        match self {
            BrickKind::Standard => 1,
            BrickKind::Metal => 2,
            BrickKind::Gold => 3,
            BrickKind::Explosive => 1,
            BrickKind::Regenerating => 2,
            BrickKind::Diamond => 4,
        }
    }

    pub fn base_points(self) -> u32 {
        match self {
            BrickKind::Standard => 50,
            BrickKind::Metal => 100,
            BrickKind::Gold => 200,
            BrickKind::Explosive => 150,
            BrickKind::Regenerating => 125,
            BrickKind::Diamond => 500,
        }
    }

    /// Special kinds carry behavior beyond durability and score extra
    /// points per level.
    pub fn is_special(self) -> bool {
        matches!(
            self,
            BrickKind::Explosive | BrickKind::Regenerating | BrickKind::Diamond
        )
    }

    pub fn points(self, level: u32) -> u32 {
        let bonus = if self.is_special() {
            SPECIAL_LEVEL_BONUS * level
        } else {
            0
        };
        self.base_points() + bonus
    }
}

/// Queued blast from a destroyed explosive brick. Depth counts chain
/// generations so a cascade is always bounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplosionEvent {
    pub center: Vec2,
    pub radius: f32,
    pub depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brick {
    pub pos: Vec2,
    pub size: Vec2,
    pub kind: BrickKind,
    pub max_durability: u8,
    pub durability: u8,
    pub destroyed: bool,
    /// 0..=3, purely visual
    pub crack_level: u8,
    #[serde(default)]
    pub regen_timer: f32,
}

impl Brick {
    pub fn new(pos: Vec2, size: Vec2, kind: BrickKind, desc: &LevelDescriptor, rng: &mut Pcg32) -> Self {
        let mut durability = kind.base_durability();
        if rng.random::<f32>() < desc.bricks.durability_bonus_chance {
            let extra: u8 = if rng.random::<f32>() < 0.5 { 1 } else { 2 };
            durability = durability.saturating_add(extra.min(desc.bricks.max_durability_bonus));
        }
        if let Some(cap) = desc.bricks.max_durability {
            durability = durability.min(cap.max(1));
        }
        Self {
            pos,
            size,
            kind,
            max_durability: durability,
            durability,
            destroyed: false,
            crack_level: 0,
            regen_timer: 0.0,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Apply one hit. Returns true when this hit destroyed the brick.
    pub fn hit(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.durability = self.durability.saturating_sub(1);
        if self.durability == 0 {
            self.destroyed = true;
            true
        } else {
            let damage = 1.0 - self.durability as f32 / self.max_durability as f32;
            self.crack_level = (damage * 3.0).floor() as u8;
            false
        }
    }

    /// Force destruction regardless of remaining durability (power shot).
    pub fn demolish(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.durability = 0;
        self.destroyed = true;
        true
    }

    /// Blast event this brick emits when destroyed, if any.
    pub fn explosion(&self, depth: u32) -> Option<ExplosionEvent> {
        (self.kind == BrickKind::Explosive).then(|| ExplosionEvent {
            center: self.center(),
            radius: EXPLOSION_RADIUS,
            depth,
        })
    }

    /// Advance the regeneration timer. Returns true when the brick came back.
    pub fn update(&mut self, dt: f32) -> bool {
        if self.kind == BrickKind::Regenerating && self.destroyed {
            self.regen_timer += dt;
            if self.regen_timer >= REGEN_DELAY {
                self.durability = self.max_durability;
                self.destroyed = false;
                self.crack_level = 0;
                self.regen_timer = 0.0;
                return true;
            }
        }
        false
    }
}

/// Column-major brick grid: `columns[c][r]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrickGrid {
    pub columns: Vec<Vec<Brick>>,
}

impl BrickGrid {
    /// Lay out and populate a grid for one level.
    pub fn build(desc: &LevelDescriptor, canvas: Vec2, rng: &mut Pcg32) -> Self {
        let cols = desc.columns.max(1) as usize;
        let rows = desc.rows.max(1) as usize;

        let wall = canvas.x * consts::WALL_FRAC;
        let max_width = canvas.x * MAX_BRICK_WIDTH_FRAC;
        let height = canvas.y * BRICK_HEIGHT_FRAC;
        let padding = canvas.x * BRICK_PADDING_FRAC;
        let offset_top = canvas.y * GRID_TOP_FRAC;

        let available = canvas.x - 2.0 * wall - (cols as f32 + 1.0) * padding;
        let width = (available / cols as f32).min(max_width);
        let offset_left = wall + padding;
        let size = Vec2::new(width, height);

        let mut columns = Vec::with_capacity(cols);
        for c in 0..cols {
            let mut column = Vec::with_capacity(rows);
            for r in 0..rows {
                let kind = kind_for_cell(desc, cols, rows, c, r, rng);
                let pos = Vec2::new(
                    c as f32 * (width + padding) + offset_left,
                    r as f32 * (height + padding) + offset_top,
                );
                column.push(Brick::new(pos, size, kind, desc, rng));
            }
            columns.push(column);
        }
        Self { columns }
    }

    pub fn bricks(&self) -> impl Iterator<Item = &Brick> {
        self.columns.iter().flat_map(|c| c.iter())
    }

    pub fn bricks_mut(&mut self) -> impl Iterator<Item = &mut Brick> {
        self.columns.iter_mut().flat_map(|c| c.iter_mut())
    }

    pub fn active_count(&self) -> usize {
        self.bricks().filter(|b| !b.destroyed).count()
    }

    /// Regenerating bricks waiting on their timer count as cleared.
    pub fn all_cleared(&self) -> bool {
        self.active_count() == 0
    }

    /// Drift surviving bricks sideways on row-movement levels. Direction
    /// flips with the sine of accumulated sim time; bricks clamp a margin
    /// short of the side walls.
    pub fn update_moving_rows(&mut self, elapsed: f32, dt: f32, canvas_w: f32) {
        let dir = if elapsed.sin() > 0.0 { 1.0 } else { -1.0 };
        let step = ROW_DRIFT_SPEED * dir * dt;
        for brick in self.bricks_mut() {
            if brick.destroyed {
                continue;
            }
            brick.pos.x += step;
            let max_x = canvas_w - ROW_DRIFT_MARGIN - brick.size.x;
            brick.pos.x = brick.pos.x.clamp(ROW_DRIFT_MARGIN, max_x);
        }
    }
}

/// Cheap deterministic pseudo-noise in [-1, 1] for the procedural pattern.
/// The exact formula is part of the level-generation contract.
pub fn sine_noise(x: f32, y: f32) -> f32 {
    let n = (x * 12.9898 + y * 78.233).sin() * 43758.5453;
    (n - n.floor()) * 2.0 - 1.0
}

fn tiered(palette: &[BrickKind], row: usize) -> BrickKind {
    if palette.is_empty() {
        return BrickKind::Standard;
    }
    palette[(row / 2).min(palette.len() - 1)]
}

fn kind_for_cell(
    desc: &LevelDescriptor,
    cols: usize,
    rows: usize,
    c: usize,
    r: usize,
    rng: &mut Pcg32,
) -> BrickKind {
    let palette = desc.brick_types.as_slice();
    let first = palette.first().copied().unwrap_or_default();
    let corner = (c == 0 || c == cols - 1) && (r == 0 || r == rows - 1);
    let edge = c == 0 || c == cols - 1 || r == 0 || r == rows - 1;

    match desc.pattern {
        BrickPattern::Solid => tiered(palette, r),
        BrickPattern::Checkerboard => {
            if (c + r) % 2 == 0 {
                tiered(palette, r)
            } else {
                BrickKind::Standard
            }
        }
        BrickPattern::Fortress => {
            if corner {
                BrickKind::Gold
            } else if edge {
                BrickKind::Metal
            } else if c % 3 == 1 && r % 2 == 1 {
                BrickKind::Explosive
            } else {
                BrickKind::Standard
            }
        }
        BrickPattern::MovingRows => {
            if r % 3 == 0 {
                BrickKind::Regenerating
            } else if r % 3 == 1 {
                BrickKind::Metal
            } else {
                tiered(palette, r)
            }
        }
        BrickPattern::BossFortress => {
            let dist = c.abs_diff(cols / 2) + r.abs_diff(rows / 2);
            if c == cols / 2 && r == rows / 2 {
                BrickKind::Diamond
            } else if dist <= 2 {
                BrickKind::Gold
            } else if dist == 3 {
                BrickKind::Explosive
            } else if edge {
                BrickKind::Metal
            } else {
                BrickKind::Standard
            }
        }
        BrickPattern::Procedural => {
            let noise = sine_noise(c as f32 * 0.1, r as f32 * 0.1);
            if noise > 0.7 {
                palette.last().copied().unwrap_or_default()
            } else if noise > 0.4 {
                palette.get(1).copied().unwrap_or(first)
            } else if noise < -0.5 && rng.random::<f32>() < 0.3 {
                BrickKind::Explosive
            } else {
                first
            }
        }
        BrickPattern::UltimateFortress => {
            let dist = c.abs_diff(cols / 2) + r.abs_diff(rows / 2);
            if c == cols / 2 && r == rows / 2 {
                BrickKind::Diamond
            } else if dist <= 1 {
                BrickKind::Gold
            } else if dist == 2 {
                BrickKind::Explosive
            } else if dist == 3 {
                if rng.random::<f32>() < 0.7 {
                    BrickKind::Gold
                } else {
                    BrickKind::Metal
                }
            } else if corner {
                BrickKind::Gold
            } else if edge {
                if rng.random::<f32>() < 0.8 {
                    BrickKind::Metal
                } else {
                    BrickKind::Explosive
                }
            } else if (c % 4 == 2 && r % 3 == 1) || (c % 4 == 1 && r % 3 == 2) {
                BrickKind::Explosive
            } else if r < rows / 3 && rng.random::<f32>() < 0.3 {
                BrickKind::Diamond
            } else {
                BrickKind::Standard
            }
        }
        BrickPattern::Random => {
            if palette.is_empty() {
                BrickKind::Standard
            } else {
                palette[rng.random_range(0..palette.len())]
            }
        }
    }
}
