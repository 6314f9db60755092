use imageproc::point::Point;

/// The receipt outline as four corners in canonical order:
/// top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    pub corners: [(f32, f32); 4],
}

impl Quadrilateral {
    /// Put four arbitrary corners into canonical order.
    ///
    /// Top-left has the smallest `x + y`, bottom-right the largest; top-right
    /// has the smallest `y - x`, bottom-left the largest.
    pub fn order(points: [(f32, f32); 4]) -> Self {
        let sum = |p: &(f32, f32)| p.0 + p.1;
        let diff = |p: &(f32, f32)| p.1 - p.0;
        Self {
            corners: [
                extreme(&points, sum, false),
                extreme(&points, diff, false),
                extreme(&points, sum, true),
                extreme(&points, diff, true),
            ],
        }
    }

    /// Corners of an axis-aligned rectangle at `(x, y)` with the given size.
    pub fn from_rect(x: i32, y: i32, width: i32, height: i32) -> Self {
        let (x0, y0) = (x as f32, y as f32);
        let (x1, y1) = ((x + width) as f32, (y + height) as f32);
        Self { corners: [(x0, y0), (x1, y0), (x1, y1), (x0, y1)] }
    }

    pub fn top_left(&self) -> (f32, f32) {
        self.corners[0]
    }

    pub fn top_right(&self) -> (f32, f32) {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> (f32, f32) {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> (f32, f32) {
        self.corners[3]
    }

    /// Output size of the rectified image: the longer of each pair of
    /// opposing sides, truncated to whole pixels (at least 1).
    pub fn target_size(&self) -> (u32, u32) {
        let [tl, tr, br, bl] = self.corners;
        let width = distance(br, bl).max(distance(tr, tl));
        let height = distance(tr, br).max(distance(tl, bl));
        ((width as u32).max(1), (height as u32).max(1))
    }
}

/// First point with the smallest (or largest) key.
fn extreme(points: &[(f32, f32); 4], key: impl Fn(&(f32, f32)) -> f32, largest: bool) -> (f32, f32) {
    let mut best = points[0];
    for p in &points[1..] {
        let better = if largest { key(p) > key(&best) } else { key(p) < key(&best) };
        if better {
            best = *p;
        }
    }
    best
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Axis-aligned bounds as `(x, y, width, height)`, counting pixels inclusively.
pub fn bounding_rect(points: &[Point<i32>]) -> Option<(i32, i32, i32, i32)> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Douglas–Peucker simplification of a closed contour.
///
/// The curve is split at two mutually distant points so the result does not
/// depend on where contour tracing happened to start. Vertices are returned in
/// contour order.
pub fn approximate_polygon(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if a == b {
        return vec![points[a]];
    }
    let (start, end) = (a.min(b), a.max(b));

    let first_arc: Vec<Point<i32>> = points[start..=end].to_vec();
    let second_arc: Vec<Point<i32>> =
        points[end..].iter().chain(points[..=start].iter()).copied().collect();

    let mut out = simplify_open(&first_arc, epsilon);
    out.pop();
    let mut tail = simplify_open(&second_arc, epsilon);
    tail.pop();
    out.extend(tail);
    out
}

fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
    let mut best = (0, -1.0);
    for (i, p) in points.iter().enumerate() {
        let d = point_distance(*p, origin);
        if d > best.1 {
            best = (i, d);
        }
    }
    best.0
}

/// Open-curve Douglas–Peucker; keeps both endpoints.
fn simplify_open(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0usize, last)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let mut split = (lo, 0.0);
        for i in lo + 1..hi {
            let d = segment_distance(points[i], points[lo], points[hi]);
            if d > split.1 {
                split = (i, d);
            }
        }
        if split.1 > epsilon {
            keep[split.0] = true;
            stack.push((lo, split.0));
            stack.push((split.0, hi));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Perpendicular distance from `p` to the line through `a` and `b`; plain
/// distance to `a` when the two coincide.
fn segment_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let (dx, dy) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return point_distance(p, a);
    }
    ((p.x - a.x) as f64 * dy - (p.y - a.y) as f64 * dx).abs() / len
}

fn point_distance(a: Point<i32>, b: Point<i32>) -> f64 {
    let (dx, dy) = ((a.x - b.x) as f64, (a.y - b.y) as f64);
    (dx * dx + dy * dy).sqrt()
}
