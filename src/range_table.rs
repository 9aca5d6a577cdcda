// Monotonic energy <-> range lookup for a (particle, material) pair, built by
// numerically integrating the inverse stopping power.

use crate::material::Material;

/// Outcome of advancing a particle a requested distance through matter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Slowdown {
    /// The particle emerges with the given energy after the full distance.
    Emerged { energy: f64, distance: f64 },
    /// The particle ran out of range after `distance` (< the requested one).
    Stopped { distance: f64 },
}

/// Precomputed (energy, range) samples, strictly increasing in both columns.
/// Built once per particle species and material, read-only afterwards.
#[derive(Clone, Debug)]
pub struct RangeTable {
    energy: Vec<f64>,
    range: Vec<f64>,
}

impl RangeTable {
    /// Build a table of `n` log-spaced energy samples over [e_min, e_max]
    /// for an ion of charge `z` and rest mass `mass` (MeV/c^2). Log spacing
    /// concentrates samples at low energy where dE/dx varies steeply.
    pub fn new(
        n: usize,
        e_min: f64,
        e_max: f64,
        z: f64,
        mass: f64,
        material: &Material,
    ) -> Result<Self, String> {
        if n < 2 {
            return Err(format!("range table needs at least 2 entries, got {}", n));
        }
        if e_min <= 0.0 || e_max <= e_min {
            return Err(format!(
                "invalid range-table energy window [{}, {}]",
                e_min, e_max
            ));
        }

        let log_step = (e_max / e_min).ln() / (n - 1) as f64;
        let mut energy = Vec::with_capacity(n);
        let mut range = Vec::with_capacity(n);

        // Residual range below the first sample, approximated with the
        // stopping power at e_min.
        let mut e_prev = e_min;
        let mut r = e_min / material.stop_power(e_min, z, mass);
        energy.push(e_prev);
        range.push(r);

        for i in 1..n {
            let e = e_min * ((i as f64) * log_step).exp();
            // Trapezoidal step of dR/dE = 1/S(E)
            let inv_prev = 1.0 / material.stop_power(e_prev, z, mass);
            let inv_here = 1.0 / material.stop_power(e, z, mass);
            r += 0.5 * (e - e_prev) * (inv_prev + inv_here);
            energy.push(e);
            range.push(r);
            e_prev = e;
        }

        for w in range.windows(2) {
            if w[1] <= w[0] {
                return Err("range table is not strictly increasing".to_string());
            }
        }

        Ok(Self { energy, range })
    }

    pub fn len(&self) -> usize {
        self.energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }

    pub fn entry(&self, i: usize) -> Option<(f64, f64)> {
        Some((*self.energy.get(i)?, *self.range.get(i)?))
    }

    /// Binary-search linear interpolation; queries outside the table clamp to
    /// the first/last sample.
    fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
        if x <= xs[0] {
            return ys[0];
        }
        let last = xs.len() - 1;
        if x >= xs[last] {
            return ys[last];
        }
        let mut low = 0usize;
        let mut high = last;
        while high - low > 1 {
            let mid = (low + high) >> 1;
            if xs[mid] <= x {
                low = mid;
            } else {
                high = mid;
            }
        }
        let (x1, x2) = (xs[low], xs[low + 1]);
        let (y1, y2) = (ys[low], ys[low + 1]);
        y1 + (x - x1) * (y2 - y1) / (x2 - x1)
    }

    /// Range (m) of a particle with the given kinetic energy (MeV).
    pub fn range(&self, energy: f64) -> f64 {
        Self::interpolate(&self.energy, &self.range, energy)
    }

    /// Kinetic energy (MeV) of a particle with the given residual range (m).
    pub fn energy(&self, range: f64) -> f64 {
        Self::interpolate(&self.range, &self.energy, range)
    }

    /// Advance a particle of the given energy by `distance` through the
    /// material: subtract the distance from its range and convert back.
    pub fn new_energy(&self, energy: f64, distance: f64) -> Slowdown {
        let r = self.range(energy);
        if r - distance <= 0.0 {
            Slowdown::Stopped { distance: r }
        } else {
            Slowdown::Emerged {
                energy: self.energy(r - distance),
                distance,
            }
        }
    }
}
