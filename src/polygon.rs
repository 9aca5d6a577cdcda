// 2-D ray, segment and convex-polygon primitives used for footprint
// containment tests. Independent of the 3-D detector geometry.

use nalgebra::Vector2;

/// Parallel-direction cutoff for the 2x2 intersection solve.
const PARALLEL_EPS: f64 = 1e-12;

/// Solve p1 + d1*t1 = p2 + d2*t2 for the two line parameters.
/// Returns None when the directions are (near-)parallel; the determinant
/// guard covers the axis-aligned degenerate directions without a special
/// case per axis.
fn line_parameters(
    p1: &Vector2<f64>,
    d1: &Vector2<f64>,
    p2: &Vector2<f64>,
    d2: &Vector2<f64>,
) -> Option<(f64, f64)> {
    let det = d1.x * d2.y - d1.y * d2.x;
    if det.abs() < PARALLEL_EPS {
        return None;
    }
    let v = p2 - p1;
    let t1 = (v.x * d2.y - v.y * d2.x) / det;
    let t2 = (v.x * d1.y - v.y * d1.x) / det;
    Some((t1, t2))
}

/// A ray: unbounded in the positive parameter direction.
#[derive(Clone, Copy, Debug)]
pub struct Ray2 {
    pub pos: Vector2<f64>,
    pub dir: Vector2<f64>,
}

impl Ray2 {
    pub fn new(pos: Vector2<f64>, dir: Vector2<f64>) -> Self {
        Self { pos, dir }
    }

    /// Ray from a starting point through a second point.
    pub fn through(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let pos = Vector2::new(x1, y1);
        Self {
            pos,
            dir: Vector2::new(x2, y2) - pos,
        }
    }

    /// Intersection point with another ray, if any.
    pub fn intersect_ray(&self, other: &Ray2) -> Option<Vector2<f64>> {
        let (t1, t2) = line_parameters(&self.pos, &self.dir, &other.pos, &other.dir)?;
        (t1 >= 0.0 && t2 >= 0.0).then(|| self.pos + self.dir * t1)
    }

    /// Intersection point with a bounded segment, if any.
    pub fn intersect_segment(&self, seg: &Segment2) -> Option<Vector2<f64>> {
        let (t1, t2) = line_parameters(&self.pos, &self.dir, &seg.p1, &seg.dir)?;
        (t1 >= 0.0 && (0.0..=1.0).contains(&t2)).then(|| self.pos + self.dir * t1)
    }
}

/// A line segment bounded by two endpoints.
#[derive(Clone, Copy, Debug)]
pub struct Segment2 {
    pub p1: Vector2<f64>,
    pub p2: Vector2<f64>,
    dir: Vector2<f64>,
}

impl Segment2 {
    pub fn new(p1: Vector2<f64>, p2: Vector2<f64>) -> Self {
        Self { p1, p2, dir: p2 - p1 }
    }

    pub fn length(&self) -> f64 {
        self.dir.norm()
    }

    /// Intersection point with another segment, if any.
    pub fn intersect_segment(&self, other: &Segment2) -> Option<Vector2<f64>> {
        let (t1, t2) = line_parameters(&self.p1, &self.dir, &other.p1, &other.dir)?;
        ((0.0..=1.0).contains(&t1) && (0.0..=1.0).contains(&t2)).then(|| self.p1 + self.dir * t1)
    }
}

/// A regular N-sided convex polygon centered on the origin, built so that a
/// circle of the given radius is completely inscribed within it.
#[derive(Clone, Debug)]
pub struct RegularPolygon {
    sides: Vec<Segment2>,
    circumradius: f64,
    chord_length: f64,
}

impl RegularPolygon {
    pub fn new(inradius: f64, n_sides: u32) -> Result<Self, String> {
        if n_sides < 3 {
            return Err(format!("polygon needs at least 3 sides, got {}", n_sides));
        }
        if inradius <= 0.0 {
            return Err(format!("polygon radius must be positive, got {}", inradius));
        }

        let sector = 2.0 * std::f64::consts::PI / n_sides as f64;
        let circumradius = inradius / (sector / 2.0).cos();
        let chord_length = 2.0 * circumradius * (sector / 2.0).sin();

        let mut sides = Vec::with_capacity(n_sides as usize);
        let mut theta = -sector / 2.0;
        for _ in 0..n_sides {
            let p1 = Vector2::new(circumradius * theta.cos(), circumradius * theta.sin());
            theta += sector;
            let p2 = Vector2::new(circumradius * theta.cos(), circumradius * theta.sin());
            sides.push(Segment2::new(p1, p2));
        }

        Ok(Self {
            sides,
            circumradius,
            chord_length,
        })
    }

    pub fn n_sides(&self) -> usize {
        self.sides.len()
    }

    pub fn circumradius(&self) -> f64 {
        self.circumradius
    }

    pub fn chord_length(&self) -> f64 {
        self.chord_length
    }

    /// Parity point-in-polygon test: cast a ray along +x and count edge
    /// crossings; an odd count means the point is inside.
    pub fn is_inside(&self, x: f64, y: f64) -> bool {
        let trace = Ray2::through(x, y, x + 1.0, y);
        let crossings = self
            .sides
            .iter()
            .filter(|side| trace.intersect_segment(side).is_some())
            .count();
        crossings % 2 != 0
    }
}
