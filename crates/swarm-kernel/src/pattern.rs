//! Procedural pattern library.
//!
//! Every generator maps geometric parameters to an ordered sequence of
//! points. Geometry primitives are pure; the few stochastic generators take
//! the random source as an explicit argument so a recorded seed replays the
//! exact same motif.
//!
//! Generators never filter: points may fall outside the canvas and are
//! dropped later by [`visible`] or by the agent's queue.

use std::f64::consts::TAU;

use rand::Rng;

use crate::canvas::Point;

/// Angular increment for spiral sampling, in radians.
pub const SPIRAL_ANGLE_STEP: f64 = 0.3;

/// Distance travelled per step along a flow-field trajectory.
pub const FLOW_STRIDE: f64 = 2.0;

/// Minimum number of samples on a circle, however small.
const MIN_CIRCLE_POINTS: usize = 12;

fn rounded(x: f64, y: f64) -> Point {
    Point::new(x.round() as i32, y.round() as i32)
}

/// Integer Bresenham walk from `(x0, y0)` to `(x1, y1)`, both endpoints included.
pub fn line(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point> {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let mut points = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    let (mut x, mut y) = (x0, y0);
    let mut err = dx + dy;

    loop {
        points.push(Point::new(x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }

    points
}

/// Connected line segments through `vertices`; shared vertices appear once.
pub fn polyline(vertices: &[Point]) -> Vec<Point> {
    let mut points: Vec<Point> = Vec::new();
    for pair in vertices.windows(2) {
        let segment = line(pair[0].x, pair[0].y, pair[1].x, pair[1].y);
        let skip = usize::from(!points.is_empty());
        points.extend(segment.into_iter().skip(skip));
    }
    if points.is_empty() {
        points.extend(vertices.first().copied());
    }
    points
}

/// `max(12, floor(2πr))` equally spaced samples around a circle.
///
/// The last sample sits one step short of the first, so the outline closes
/// approximately rather than repeating its start.
pub fn circle(cx: i32, cy: i32, r: i32) -> Vec<Point> {
    let radius = f64::from(r.max(0));
    let count = ((TAU * radius).floor() as usize).max(MIN_CIRCLE_POINTS);

    (0..count)
        .map(|i| {
            let angle = TAU * i as f64 / count as f64;
            rounded(
                f64::from(cx) + radius * angle.cos(),
                f64::from(cy) + radius * angle.sin(),
            )
        })
        .collect()
}

/// Archimedean spiral sampled every [`SPIRAL_ANGLE_STEP`] radians.
///
/// `step` is the radial gap between successive turns.
pub fn spiral(cx: i32, cy: i32, turns: f64, step: f64) -> Vec<Point> {
    let max_theta = turns.max(0.0) * TAU;
    let mut points = Vec::new();
    let mut theta = 0.0_f64;

    while theta <= max_theta {
        let r = step * theta / TAU;
        points.push(rounded(
            f64::from(cx) + r * theta.cos(),
            f64::from(cy) + r * theta.sin(),
        ));
        theta += SPIRAL_ANGLE_STEP;
    }

    points
}

/// Lattice over the half-open rectangle `[x, x + w) × [y, y + h)`, row-major.
pub fn grid(x: i32, y: i32, w: i32, h: i32, spacing: i32) -> Vec<Point> {
    let spacing = spacing.max(1) as usize;
    (0..h.max(0))
        .step_by(spacing)
        .flat_map(|dy| {
            (0..w.max(0))
                .step_by(spacing)
                .map(move |dx| Point::new(x + dx, y + dy))
        })
        .collect()
}

/// One point per integer x offset in `[0, length]`.
///
/// `frequency` is in radians per pixel.
pub fn sine_wave(x0: i32, y_center: i32, length: i32, amplitude: f64, frequency: f64) -> Vec<Point> {
    sine_wave_phased(x0, y_center, length, amplitude, frequency, 0.0)
}

/// [`sine_wave`] with a phase offset, for interleaved traces.
pub fn sine_wave_phased(
    x0: i32,
    y_center: i32,
    length: i32,
    amplitude: f64,
    frequency: f64,
    phase: f64,
) -> Vec<Point> {
    (0..=length.max(0))
        .map(|i| {
            let offset = amplitude * (f64::from(i) * frequency + phase).sin();
            Point::new(x0 + i, y_center + offset.round() as i32)
        })
        .collect()
}

/// Wandering trajectory: the heading starts uniformly random and is nudged by
/// `uniform(-angle_step/2, angle_step/2)` each step, advancing [`FLOW_STRIDE`].
///
/// The starting point is included, so the result holds `steps + 1` points.
pub fn flow_field<R: Rng + ?Sized>(
    x0: i32,
    y0: i32,
    steps: usize,
    angle_step: f64,
    rng: &mut R,
) -> Vec<Point> {
    let mut heading = rng.random_range(0.0..TAU);
    let half = angle_step.abs() / 2.0;
    let (mut x, mut y) = (f64::from(x0), f64::from(y0));

    let mut points = Vec::with_capacity(steps + 1);
    points.push(Point::new(x0, y0));

    for _ in 0..steps {
        if half > 0.0 {
            heading += rng.random_range(-half..half);
        }
        x += FLOW_STRIDE * heading.cos();
        y += FLOW_STRIDE * heading.sin();
        points.push(rounded(x, y));
    }

    points
}

/// Four-directional lattice walk of `steps` moves, each `step_size` long.
pub fn random_walk<R: Rng + ?Sized>(
    x: i32,
    y: i32,
    steps: usize,
    step_size: i32,
    rng: &mut R,
) -> Vec<Point> {
    let mut current = Point::new(x, y);
    let mut points = Vec::with_capacity(steps + 1);
    points.push(current);

    for _ in 0..steps {
        current = match rng.random_range(0..4) {
            0 => current.offset(step_size, 0),
            1 => current.offset(-step_size, 0),
            2 => current.offset(0, step_size),
            _ => current.offset(0, -step_size),
        };
        points.push(current);
    }

    points
}

/// Stochastic disk: the offset `(dx, dy)` is kept with probability
/// `1 - distance / size` when `distance <= size`. Row-major.
pub fn cellular_blob<R: Rng + ?Sized>(x0: i32, y0: i32, size: i32, rng: &mut R) -> Vec<Point> {
    if size <= 0 {
        return vec![Point::new(x0, y0)];
    }

    let radius = f64::from(size);
    let mut points = Vec::new();
    for dy in -size..=size {
        for dx in -size..=size {
            let distance = f64::from(dx).hypot(f64::from(dy));
            if distance > radius {
                continue;
            }
            let keep = 1.0 - distance / radius;
            if rng.random::<f64>() < keep {
                points.push(Point::new(x0 + dx, y0 + dy));
            }
        }
    }
    points
}

const HEART: &[&str] = &[
    ".##.##.",
    "#######",
    "#######",
    ".#####.",
    "..###..",
    "...#...",
];

const STAR: &[&str] = &[
    "...#...",
    "...#...",
    "#######",
    ".#####.",
    "..###..",
    ".##.##.",
    "##...##",
];

const SMILEY: &[&str] = &[
    "..####..",
    ".#....#.",
    "#.#..#.#",
    "#......#",
    "#.#..#.#",
    "#..##..#",
    ".#....#.",
    "..####..",
];

const INVADER: &[&str] = &[
    "..#.....#..",
    "...#...#...",
    "..#######..",
    ".##.###.##.",
    "###########",
    "#.#######.#",
    "#.#.....#.#",
    "...##.##...",
];

const GHOST: &[&str] = &[
    "..###..",
    ".#####.",
    "##.#.##",
    "#######",
    "#######",
    "#.#.#.#",
];

/// Names of the built-in sprites. The first one is the fallback.
pub const SPRITE_NAMES: &[&str] = &["heart", "star", "smiley", "invader", "ghost"];

/// Bitmap rows for a named sprite; `#` marks a set bit. Unknown names get the heart.
pub fn sprite_bitmap(name: &str) -> &'static [&'static str] {
    match name {
        "star" => STAR,
        "smiley" => SMILEY,
        "invader" => INVADER,
        "ghost" => GHOST,
        _ => HEART,
    }
}

/// One point per set bit of the named sprite, row-major, translated by `(x0, y0)`.
pub fn sprite(name: &str, x0: i32, y0: i32) -> Vec<Point> {
    sprite_bitmap(name)
        .iter()
        .enumerate()
        .flat_map(|(row, bits)| {
            bits.bytes()
                .enumerate()
                .filter(|(_, bit)| *bit == b'#')
                .map(move |(col, _)| Point::new(x0 + col as i32, y0 + row as i32))
        })
        .collect()
}

/// Keep only the points that lie on the canvas, preserving order.
pub fn visible(points: impl IntoIterator<Item = Point>) -> Vec<Point> {
    points.into_iter().filter(Point::in_bounds).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pts(raw: &[(i32, i32)]) -> Vec<Point> {
        raw.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn test_line_axis_aligned_inclusive() {
        assert_eq!(
            line(0, 0, 4, 0),
            pts(&[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)])
        );
    }

    #[test]
    fn test_line_reverse_and_diagonal() {
        assert_eq!(line(3, 0, 0, 0), pts(&[(3, 0), (2, 0), (1, 0), (0, 0)]));
        assert_eq!(line(0, 0, 3, 3), pts(&[(0, 0), (1, 1), (2, 2), (3, 3)]));
        assert_eq!(line(7, 7, 7, 7), pts(&[(7, 7)]));
    }

    #[test]
    fn test_line_steep_is_contiguous() {
        let points = line(0, 0, 2, 9);
        assert_eq!(points.first(), Some(&Point::new(0, 0)));
        assert_eq!(points.last(), Some(&Point::new(2, 9)));
        assert_eq!(points.len(), 10);
        for pair in points.windows(2) {
            assert!((pair[1].x - pair[0].x).abs() <= 1);
            assert_eq!(pair[1].y - pair[0].y, 1);
        }
    }

    #[test]
    fn test_polyline_shares_vertices() {
        let corner = polyline(&[Point::new(0, 0), Point::new(2, 0), Point::new(2, 2)]);
        assert_eq!(corner, pts(&[(0, 0), (1, 0), (2, 0), (2, 1), (2, 2)]));
        assert_eq!(polyline(&[Point::new(4, 4)]), pts(&[(4, 4)]));
        assert!(polyline(&[]).is_empty());
    }

    #[test]
    fn test_circle_point_count() {
        assert_eq!(circle(50, 50, 1).len(), 12);
        assert_eq!(circle(50, 50, 10).len(), 62);
        // First sample sits on the positive x axis
        assert_eq!(circle(50, 50, 10)[0], Point::new(60, 50));
    }

    #[test]
    fn test_spiral_starts_at_center_and_grows() {
        let points = spiral(100, 100, 2.0, 4.0);
        assert_eq!(points[0], Point::new(100, 100));
        let first = points[1];
        let last = *points.last().unwrap();
        let dist = |p: Point| f64::from(p.x - 100).hypot(f64::from(p.y - 100));
        assert!(dist(last) > dist(first));
        // 2 turns at 0.3 rad: floor(4π / 0.3) + 1 samples
        assert_eq!(points.len(), 42);
    }

    #[test]
    fn test_grid_row_major() {
        assert_eq!(
            grid(10, 20, 5, 3, 2),
            pts(&[(10, 20), (12, 20), (14, 20), (10, 22), (12, 22), (14, 22)])
        );
        assert_eq!(grid(0, 0, 2, 2, 0).len(), 4);
    }

    #[test]
    fn test_sine_wave_one_point_per_offset() {
        let points = sine_wave(10, 50, 20, 5.0, 0.3);
        assert_eq!(points.len(), 21);
        assert_eq!(points[0], Point::new(10, 50));
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.x, 10 + i as i32);
            assert!((p.y - 50).abs() <= 5);
        }
    }

    #[test]
    fn test_phase_shift_mirrors_trace() {
        let a = sine_wave_phased(0, 100, 30, 6.0, 0.2, 0.0);
        let b = sine_wave_phased(0, 100, 30, 6.0, 0.2, std::f64::consts::PI);
        for (p, q) in a.iter().zip(&b) {
            assert_eq!(p.x, q.x);
            assert!((p.y - 100 + (q.y - 100)).abs() <= 1);
        }
    }

    #[test]
    fn test_flow_field_replays_with_seed() {
        let a = flow_field(250, 250, 40, 0.6, &mut ChaCha8Rng::seed_from_u64(9));
        let b = flow_field(250, 250, 40, 0.6, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
        assert_eq!(a.len(), 41);
        assert_eq!(a[0], Point::new(250, 250));
        for pair in a.windows(2) {
            // stride plus rounding slack
            assert!((pair[1].x - pair[0].x).abs() <= 3);
            assert!((pair[1].y - pair[0].y).abs() <= 3);
        }
    }

    #[test]
    fn test_random_walk_moves_on_lattice() {
        let walk = random_walk(0, 0, 25, 3, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(walk.len(), 26);
        for pair in walk.windows(2) {
            let dx = (pair[1].x - pair[0].x).abs();
            let dy = (pair[1].y - pair[0].y).abs();
            assert!((dx == 3 && dy == 0) || (dx == 0 && dy == 3));
        }
    }

    #[test]
    fn test_cellular_blob_within_radius() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let blob = cellular_blob(40, 40, 6, &mut rng);
        assert!(!blob.is_empty());
        for p in &blob {
            let d = f64::from(p.x - 40).hypot(f64::from(p.y - 40));
            assert!(d < 6.0);
        }
        assert_eq!(cellular_blob(3, 3, 0, &mut rng), pts(&[(3, 3)]));
    }

    #[test]
    fn test_sprite_heart_offsets() {
        let expected: Vec<Point> = HEART
            .iter()
            .enumerate()
            .flat_map(|(row, bits)| {
                bits.chars()
                    .enumerate()
                    .filter(|(_, c)| *c == '#')
                    .map(move |(col, _)| Point::new(10 + col as i32, 10 + row as i32))
            })
            .collect();
        assert_eq!(sprite("heart", 10, 10), expected);
        assert_eq!(sprite("heart", 10, 10)[0], Point::new(11, 10));
    }

    #[test]
    fn test_unknown_sprite_falls_back_to_heart() {
        assert_eq!(sprite("bogus", 10, 10), sprite("heart", 10, 10));
        assert_ne!(sprite("invader", 10, 10), sprite("heart", 10, 10));
    }

    #[test]
    fn test_visible_drops_out_of_range() {
        let kept = visible(line(-2, 5, 2, 5));
        assert_eq!(kept, pts(&[(0, 5), (1, 5), (2, 5)]));

        let edge = visible(line(497, 10, 502, 10));
        assert_eq!(edge.len(), 3);
        assert!(edge.iter().all(Point::in_bounds));
    }
}
