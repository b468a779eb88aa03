//! Geometric collision kernel: circle vs axis-aligned rectangles and the
//! handful of bounce rules built on top of it.
//!
//! Everything here is a pure function of its arguments so the resolution
//! order (walls, shield, paddle, bricks) stays readable in the tick.

use glam::Vec2;

/// Result of a collision query
#[derive(Debug, Clone, Copy)]
pub struct CollisionResult {
    pub hit: bool,
    /// Closest point on the rectangle to the circle center
    pub point: Vec2,
    /// Contact normal pointing away from the rectangle
    pub normal: Vec2,
    /// Overlap depth along the normal
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Circle vs axis-aligned rectangle via signed overlaps on both axes
/// (Minkowski sum of the rect and the circle's bounding box).
///
/// Both overlaps positive means contact. The axis with the smaller overlap
/// carries the contact normal; an exact tie resolves vertically, which keeps
/// corner grazes from side-flipping a ball that is clearly above or below.
pub fn circle_rect_collision(
    center: Vec2,
    radius: f32,
    rect_pos: Vec2,
    rect_size: Vec2,
) -> CollisionResult {
    let half = rect_size * 0.5;
    let rect_center = rect_pos + half;
    let delta = center - rect_center;

    let overlap_x = half.x + radius - delta.x.abs();
    let overlap_y = half.y + radius - delta.y.abs();
    if overlap_x <= 0.0 || overlap_y <= 0.0 {
        return CollisionResult::miss();
    }

    let (normal, penetration) = if overlap_x < overlap_y {
        (Vec2::new(delta.x.signum(), 0.0), overlap_x)
    } else {
        (Vec2::new(0.0, delta.y.signum()), overlap_y)
    };

    let point = Vec2::new(
        center.x.clamp(rect_pos.x, rect_pos.x + rect_size.x),
        center.y.clamp(rect_pos.y, rect_pos.y + rect_size.y),
    );

    CollisionResult {
        hit: true,
        point,
        normal,
        penetration,
    }
}

/// Eject the circle fully out of the rectangle along the contact normal and
/// negate the velocity component driving it inward. Returns whether there
/// was anything to resolve; a second call right after a resolution finds
/// zero overlap and is a no-op.
pub fn resolve_circle_rect(
    pos: &mut Vec2,
    vel: &mut Vec2,
    radius: f32,
    rect_pos: Vec2,
    rect_size: Vec2,
) -> bool {
    let result = circle_rect_collision(*pos, radius, rect_pos, rect_size);
    if !result.hit {
        return false;
    }
    *pos += result.normal * result.penetration;
    if result.normal.x != 0.0 {
        if vel.x * result.normal.x < 0.0 {
            vel.x = -vel.x;
        }
    } else if vel.y * result.normal.y < 0.0 {
        vel.y = -vel.y;
    }
    true
}

/// Keep a circle inside the side walls and below the top boundary,
/// reflecting velocity on contact. Position is clamped so the circle never
/// rests inside a wall. Returns true when any boundary was touched.
pub fn resolve_circle_bounds(
    pos: &mut Vec2,
    vel: &mut Vec2,
    radius: f32,
    left: f32,
    right: f32,
    top: f32,
) -> bool {
    let mut hit = false;
    if pos.x - radius < left {
        pos.x = left + radius;
        vel.x = vel.x.abs();
        hit = true;
    } else if pos.x + radius > right {
        pos.x = right - radius;
        vel.x = -vel.x.abs();
        hit = true;
    }
    if pos.y - radius < top {
        pos.y = top + radius;
        vel.y = vel.y.abs();
        hit = true;
    }
    hit
}

/// Axis-aligned rectangle overlap, used for token-vs-paddle catches.
#[inline]
pub fn rects_overlap(a_pos: Vec2, a_size: Vec2, b_pos: Vec2, b_size: Vec2) -> bool {
    a_pos.x < b_pos.x + b_size.x
        && a_pos.x + a_size.x > b_pos.x
        && a_pos.y < b_pos.y + b_size.y
        && a_pos.y + a_size.y > b_pos.y
}

/// Outgoing velocity for a ball bouncing off the paddle. The hit offset in
/// [-1, 1] relative to paddle center steers the ball: center hits leave
/// near-vertical, edge hits leave shallow and fast sideways. The vertical
/// component is always upward.
pub fn paddle_bounce(ball_x: f32, paddle_x: f32, paddle_width: f32, speed: f32) -> Vec2 {
    let half = paddle_width * 0.5;
    let hit = ((ball_x - paddle_x - half) / half).clamp(-1.0, 1.0);
    let vx = hit * speed * 0.8;
    let vy = -(speed * (hit * std::f32::consts::FRAC_PI_4).cos()).abs();
    Vec2::new(vx, vy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_rect_miss() {
        // Circle well to the left of the rect
        let result = circle_rect_collision(
            Vec2::new(0.0, 40.0),
            8.0,
            Vec2::new(100.0, 30.0),
            Vec2::new(80.0, 20.0),
        );
        assert!(!result.hit);
    }

    #[test]
    fn test_circle_rect_side_hit() {
        // Circle overlapping the left edge, centered vertically
        let result = circle_rect_collision(
            Vec2::new(95.0, 40.0),
            8.0,
            Vec2::new(100.0, 30.0),
            Vec2::new(80.0, 20.0),
        );
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::new(-1.0, 0.0));
        assert!(result.penetration > 0.0);
    }

    #[test]
    fn test_circle_rect_top_hit() {
        // Circle overlapping the top edge, centered horizontally
        let result = circle_rect_collision(
            Vec2::new(140.0, 25.0),
            8.0,
            Vec2::new(100.0, 30.0),
            Vec2::new(80.0, 20.0),
        );
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_exact_tie_prefers_vertical() {
        // Square rect, circle placed on the diagonal so both overlaps match
        let result = circle_rect_collision(
            Vec2::new(120.0, 120.0),
            8.0,
            Vec2::new(40.0, 40.0),
            Vec2::new(80.0, 80.0),
        );
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_resolution_ejects_and_reflects() {
        let mut pos = Vec2::new(140.0, 26.0);
        let mut vel = Vec2::new(50.0, 200.0);
        let rect_pos = Vec2::new(100.0, 30.0);
        let rect_size = Vec2::new(80.0, 20.0);

        assert!(resolve_circle_rect(&mut pos, &mut vel, 8.0, rect_pos, rect_size));
        // Vertical axis resolved: moving down became moving up
        assert!(vel.y < 0.0);
        assert_eq!(vel.x, 50.0);
        // Fully ejected
        assert!(!circle_rect_collision(pos, 8.0, rect_pos, rect_size).hit);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut pos = Vec2::new(95.0, 40.0);
        let mut vel = Vec2::new(120.0, 10.0);
        let rect_pos = Vec2::new(100.0, 30.0);
        let rect_size = Vec2::new(80.0, 20.0);

        assert!(resolve_circle_rect(&mut pos, &mut vel, 8.0, rect_pos, rect_size));
        let pos_after = pos;
        let vel_after = vel;
        assert!(!resolve_circle_rect(&mut pos, &mut vel, 8.0, rect_pos, rect_size));
        assert_eq!(pos, pos_after);
        assert_eq!(vel, vel_after);
    }

    #[test]
    fn test_wall_bounds_clamp_and_reflect() {
        let mut pos = Vec2::new(5.0, 400.0);
        let mut vel = Vec2::new(-240.0, -60.0);
        assert!(resolve_circle_bounds(&mut pos, &mut vel, 8.0, 10.0, 890.0, 30.0));
        assert_eq!(pos.x, 18.0);
        assert!(vel.x > 0.0);

        // Already inside: untouched
        let mut pos2 = Vec2::new(450.0, 400.0);
        let mut vel2 = Vec2::new(240.0, -60.0);
        assert!(!resolve_circle_bounds(&mut pos2, &mut vel2, 8.0, 10.0, 890.0, 30.0));
        assert_eq!(vel2, Vec2::new(240.0, -60.0));
    }

    #[test]
    fn test_paddle_bounce_center_and_edge() {
        // Paddle from x=390 to x=510, center 450
        let center = paddle_bounce(450.0, 390.0, 120.0, 300.0);
        assert!(center.x.abs() < 1e-4);
        assert!((center.y + 300.0).abs() < 1e-4);

        let edge = paddle_bounce(510.0, 390.0, 120.0, 300.0);
        assert!((edge.x - 240.0).abs() < 1e-4);
        assert!(edge.y < 0.0);
        // Edge exit is shallower than center exit
        assert!(edge.y > center.y);
    }

    #[test]
    fn test_rects_overlap() {
        let paddle_pos = Vec2::new(390.0, 870.0);
        let paddle_size = Vec2::new(120.0, 15.0);
        assert!(rects_overlap(
            Vec2::new(400.0, 860.0),
            Vec2::new(30.0, 30.0),
            paddle_pos,
            paddle_size
        ));
        assert!(!rects_overlap(
            Vec2::new(200.0, 860.0),
            Vec2::new(30.0, 30.0),
            paddle_pos,
            paddle_size
        ));
    }
}
