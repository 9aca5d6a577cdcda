// Center-of-mass angular distributions for reaction sampling.

use rand::Rng;

use crate::constants::MB_TO_CM2;

const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Angular distribution of a populated state: either isotropic with a known
/// total cross-section, or tabulated differential cross-section samples with
/// a precomputed cumulative integral for inverse-CDF sampling.
#[derive(Debug, Clone)]
pub enum AngularDistribution {
    Isotropic {
        /// Total reaction cross-section (mb)
        xsection: f64,
    },
    Tabulated {
        /// Center-of-mass angles (rad), strictly increasing
        com_theta: Vec<f64>,
        /// Differential cross-section at each angle (mb/sr)
        dsigma_domega: Vec<f64>,
        /// Cumulative integral of 2*pi*sin(theta)*dsigma, non-decreasing
        cumulative: Vec<f64>,
        /// Total cross-section (mb), equal to the last cumulative entry
        total: f64,
    },
}

impl AngularDistribution {
    pub fn isotropic(xsection: f64) -> Self {
        AngularDistribution::Isotropic { xsection }
    }

    /// Build a tabulated distribution from (angle in degrees, dsigma/dOmega
    /// in mb/sr) pairs. The total cross-section comes from trapezoidal
    /// integration of 2*pi*sin(theta)*dsigma over the tabulated range.
    pub fn from_table(points: &[(f64, f64)]) -> Result<Self, String> {
        if points.len() < 2 {
            return Err(format!(
                "angular distribution needs at least 2 points, got {}",
                points.len()
            ));
        }

        let com_theta: Vec<f64> = points.iter().map(|p| p.0 * DEG2RAD).collect();
        let dsigma_domega: Vec<f64> = points.iter().map(|p| p.1).collect();

        for w in com_theta.windows(2) {
            if w[1] <= w[0] {
                return Err("angular distribution angles not strictly increasing".to_string());
            }
        }

        let mut cumulative = Vec::with_capacity(points.len());
        cumulative.push(0.0);
        let mut total = 0.0;
        for i in 0..points.len() - 1 {
            let x1 = com_theta[i];
            let x2 = com_theta[i + 1];
            let y1 = dsigma_domega[i] * x1.sin();
            let y2 = dsigma_domega[i + 1] * x2.sin();
            total += 0.5 * (x2 - x1) * (y1 + y2) * 2.0 * std::f64::consts::PI;
            cumulative.push(total);
        }

        Ok(AngularDistribution::Tabulated {
            com_theta,
            dsigma_domega,
            cumulative,
            total,
        })
    }

    /// Total reaction cross-section (mb).
    pub fn total_cross_section(&self) -> f64 {
        match self {
            AngularDistribution::Isotropic { xsection } => *xsection,
            AngularDistribution::Tabulated { total, .. } => *total,
        }
    }

    /// Expected reaction rate (1/s) for a beam intensity (particles/s) on a
    /// target with the given areal number density (molecules/cm^2).
    pub fn rate(&self, beam_intensity: f64, number_density: f64) -> f64 {
        self.total_cross_section() * MB_TO_CM2 * beam_intensity * number_density
    }

    /// Sample a center-of-mass angle (rad). Tabulated distributions invert
    /// the cumulative integral; the isotropic case draws uniformly in
    /// [0, pi].
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            AngularDistribution::Isotropic { .. } => rng.gen::<f64>() * std::f64::consts::PI,
            AngularDistribution::Tabulated {
                com_theta,
                cumulative,
                total,
                ..
            } => {
                let u = rng.gen::<f64>() * total;
                // Locate the bracketing bin
                let mut low = 0usize;
                let mut high = cumulative.len() - 1;
                while high - low > 1 {
                    let mid = (low + high) >> 1;
                    if cumulative[mid] <= u {
                        low = mid;
                    } else {
                        high = mid;
                    }
                }
                let span = cumulative[high] - cumulative[low];
                if span <= 0.0 {
                    return com_theta[low];
                }
                com_theta[low]
                    + (u - cumulative[low]) * (com_theta[high] - com_theta[low]) / span
            }
        }
    }

    /// Tabulated angular window (rad), or [0, pi] for the isotropic case.
    pub fn angle_window(&self) -> (f64, f64) {
        match self {
            AngularDistribution::Isotropic { .. } => (0.0, std::f64::consts::PI),
            AngularDistribution::Tabulated { com_theta, .. } => {
                (com_theta[0], *com_theta.last().expect("non-empty table"))
            }
        }
    }
}
