// Beam-particle sampling: beamspot profile, energy spread and divergence.

use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math;

/// Transverse intensity profile of the beamspot on the target surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeamProfile {
    /// Uniform disc of the configured spot diameter
    Disc,
    /// Gaussian with the spot diameter as FWHM
    Gaussian,
    /// Annular ring at half the spot diameter
    Halo,
}

/// One sampled beam particle, upstream of the target.
#[derive(Clone, Debug)]
pub struct BeamShot {
    /// Originating point (m, global)
    pub start: Vector3<f64>,
    /// Unit direction of flight
    pub trajectory: Vector3<f64>,
    /// Kinetic energy (MeV)
    pub energy: f64,
}

/// Beam description. A divergent beam (angular divergence below pi/2)
/// originates from a focus point upstream of the target; a parallel beam
/// travels along +z from z = -1 m.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BeamSource {
    pub profile: BeamProfile,
    /// Beamspot diameter on the target surface (m)
    pub spot_diameter: f64,
    /// Mean kinetic energy (MeV)
    pub energy: f64,
    /// Energy spread, FWHM (MeV)
    pub energy_spread: f64,
    /// Angular divergence (rad)
    pub angular_divergence: f64,
}

impl BeamSource {
    pub fn new(energy: f64) -> Self {
        Self {
            profile: BeamProfile::Disc,
            spot_diameter: 0.0,
            energy,
            energy_spread: 0.0,
            angular_divergence: std::f64::consts::FRAC_PI_2,
        }
    }

    /// Highest energy the spread can reasonably produce; used to size range
    /// tables.
    pub fn max_energy(&self) -> f64 {
        self.energy + 2.0 * self.energy_spread
    }

    /// Focus point of a divergent beam, given the half-thickness of the
    /// target along z (m). None for a parallel beam.
    pub fn focus_point(&self, target_half_z: f64) -> Option<Vector3<f64>> {
        if self.angular_divergence < std::f64::consts::FRAC_PI_2 {
            let z = -(self.spot_diameter / 2.0 * self.angular_divergence.tan() + target_half_z);
            Some(Vector3::new(0.0, 0.0, z))
        } else {
            None
        }
    }

    /// Point in the z = 0 beamspot plane drawn from the configured profile.
    fn sample_spot<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        let half = self.spot_diameter / 2.0;
        match self.profile {
            BeamProfile::Disc => {
                // sqrt draw keeps the disc uniform in area
                let r = rng.gen::<f64>().sqrt() * half;
                let t = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
                (r * t.cos(), r * t.sin())
            }
            BeamProfile::Gaussian => (
                math::gauss_fwhm(rng, self.spot_diameter),
                math::gauss_fwhm(rng, self.spot_diameter),
            ),
            BeamProfile::Halo => {
                let t = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
                (half * t.cos(), half * t.sin())
            }
        }
    }

    /// Sample one beam particle. With a focus the particle originates there
    /// and flies toward its beamspot point; otherwise it starts 1 m upstream
    /// and flies along +z.
    pub fn sample<R: Rng + ?Sized>(&self, focus: Option<Vector3<f64>>, rng: &mut R) -> BeamShot {
        let (x, y) = self.sample_spot(rng);
        let energy = self.energy + math::gauss_fwhm(rng, self.energy_spread);

        match focus {
            Some(focus) => {
                let spot = Vector3::new(x, y, 0.0);
                BeamShot {
                    start: focus,
                    trajectory: (spot - focus).normalize(),
                    energy,
                }
            }
            None => BeamShot {
                start: Vector3::new(x, y, -1.0),
                trajectory: Vector3::new(0.0, 0.0, 1.0),
                energy,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parallel_beam_defaults() {
        let beam = BeamSource::new(10.0);
        assert!(beam.focus_point(0.001).is_none());
        let mut rng = StdRng::seed_from_u64(31);
        let shot = beam.sample(None, &mut rng);
        assert_eq!(shot.trajectory, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(shot.start, Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(shot.energy, 10.0);
    }

    #[test]
    fn test_disc_profile_within_spot() {
        let mut beam = BeamSource::new(10.0);
        beam.spot_diameter = 0.004;
        let mut rng = StdRng::seed_from_u64(32);
        for _ in 0..1000 {
            let shot = beam.sample(None, &mut rng);
            let r = (shot.start.x.powi(2) + shot.start.y.powi(2)).sqrt();
            assert!(r <= 0.002 + 1e-15, "r = {}", r);
        }
    }

    #[test]
    fn test_halo_profile_on_ring() {
        let mut beam = BeamSource::new(10.0);
        beam.profile = BeamProfile::Halo;
        beam.spot_diameter = 0.004;
        let mut rng = StdRng::seed_from_u64(33);
        for _ in 0..100 {
            let shot = beam.sample(None, &mut rng);
            let r = (shot.start.x.powi(2) + shot.start.y.powi(2)).sqrt();
            assert!((r - 0.002).abs() < 1e-15, "r = {}", r);
        }
    }

    #[test]
    fn test_energy_spread() {
        let mut beam = BeamSource::new(10.0);
        beam.energy_spread = 0.5;
        let mut rng = StdRng::seed_from_u64(34);
        let energies: Vec<f64> = (0..2000).map(|_| beam.sample(None, &mut rng).energy).collect();
        let mean = energies.iter().sum::<f64>() / energies.len() as f64;
        assert!((mean - 10.0).abs() < 0.05, "mean = {}", mean);
        assert!(energies.iter().any(|&e| e != 10.0));
        assert!((beam.max_energy() - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_focused_beam_originates_at_focus() {
        let mut beam = BeamSource::new(10.0);
        beam.spot_diameter = 0.004;
        beam.angular_divergence = 0.01;
        let focus = beam.focus_point(0.0005).expect("divergent beam");
        assert!(focus.z < 0.0);

        let mut rng = StdRng::seed_from_u64(35);
        for _ in 0..100 {
            let shot = beam.sample(Some(focus), &mut rng);
            assert_eq!(shot.start, focus);
            assert!((shot.trajectory.norm() - 1.0).abs() < 1e-12);
            assert!(shot.trajectory.z > 0.0);
        }
    }
}
