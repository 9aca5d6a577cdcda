// Relativistic two-body reaction kinematics: beam + target -> ejectile + recoil.

use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{AMU_TO_MEV, NEUTRON_RME, PROTON_RME};
use crate::distribution::AngularDistribution;
use crate::math;

/// A particle species, identified by charge and mass number with a rest-mass
/// energy in MeV/c^2.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub z: f64,
    pub a: f64,
    pub mass: f64,
}

impl Species {
    /// Species with rest mass estimated from nucleon rest masses minus the
    /// binding energy per nucleon (MeV).
    pub fn new(z: f64, a: f64, binding_per_nucleon: f64) -> Self {
        Self {
            z,
            a,
            mass: z * PROTON_RME + (a - z) * NEUTRON_RME - binding_per_nucleon * a,
        }
    }

    /// Species with an explicit rest mass in amu.
    pub fn from_amu(z: f64, a: f64, mass_amu: f64) -> Self {
        Self {
            z,
            a,
            mass: mass_amu * AMU_TO_MEV,
        }
    }
}

/// Kinematic output of one sampled reaction, in the beam frame: product
/// kinetic energies (MeV) and unit emission directions. `com_theta` is the
/// sampled center-of-mass angle and `state` the excited-state index.
#[derive(Clone, Debug)]
pub struct ReactionProducts {
    pub eject_energy: f64,
    pub eject_dir: Vector3<f64>,
    pub recoil_energy: f64,
    pub recoil_dir: Vector3<f64>,
    pub com_theta: f64,
    pub state: usize,
}

/// A two-body reaction with a populated excited-state table. The recoil
/// ground-state mass is fixed by the Q-value; each excitation adds to it.
#[derive(Clone, Debug)]
pub struct Reaction {
    beam: Species,
    target: Species,
    eject: Species,
    recoil_z: f64,
    recoil_a: f64,
    recoil_gs_mass: f64,
    q_ground: f64,
    /// Excitation energies (MeV); entry 0 is the ground state (0.0)
    excitations: Vec<f64>,
    /// One distribution per state
    distributions: Vec<AngularDistribution>,
}

impl Reaction {
    /// Build a reaction from the beam, target and ejectile species plus the
    /// ground-state Q-value (MeV) and the recoil excitation energies. The
    /// recoil species follows from charge/mass-number conservation and its
    /// ground-state mass from energy conservation at the Q-value.
    pub fn new(
        beam: Species,
        target: Species,
        eject: Species,
        q_ground: f64,
        excitations: &[f64],
    ) -> Result<Self, String> {
        let recoil_z = beam.z + target.z - eject.z;
        let recoil_a = beam.a + target.a - eject.a;
        if recoil_z < 0.0 || recoil_a <= 0.0 {
            return Err(format!(
                "reaction has unphysical recoil Z={} A={}",
                recoil_z, recoil_a
            ));
        }
        let recoil_gs_mass = beam.mass + target.mass - eject.mass - q_ground;
        if recoil_gs_mass <= 0.0 {
            return Err(format!(
                "Q-value {} MeV leaves a non-positive recoil mass",
                q_ground
            ));
        }

        let mut states = vec![0.0];
        states.extend_from_slice(excitations);
        let distributions = vec![AngularDistribution::isotropic(0.0); states.len()];

        Ok(Self {
            beam,
            target,
            eject,
            recoil_z,
            recoil_a,
            recoil_gs_mass,
            q_ground,
            excitations: states,
            distributions,
        })
    }

    /// Replace the per-state angular distributions. One distribution per
    /// populated state, ground state first.
    pub fn set_distributions(
        &mut self,
        distributions: Vec<AngularDistribution>,
    ) -> Result<(), String> {
        if distributions.len() != self.excitations.len() {
            return Err(format!(
                "got {} distributions for {} states",
                distributions.len(),
                self.excitations.len()
            ));
        }
        self.distributions = distributions;
        Ok(())
    }

    pub fn beam(&self) -> &Species {
        &self.beam
    }

    pub fn target(&self) -> &Species {
        &self.target
    }

    pub fn eject_mass(&self) -> f64 {
        self.eject.mass
    }

    pub fn recoil_mass(&self) -> f64 {
        self.recoil_gs_mass
    }

    pub fn recoil_species(&self) -> (f64, f64) {
        (self.recoil_z, self.recoil_a)
    }

    pub fn q_value(&self) -> f64 {
        self.q_ground
    }

    pub fn n_states(&self) -> usize {
        self.excitations.len()
    }

    pub fn distributions(&self) -> &[AngularDistribution] {
        &self.distributions
    }

    /// Sum of the per-state total cross-sections (mb).
    pub fn total_cross_section(&self) -> f64 {
        self.distributions
            .iter()
            .map(|d| d.total_cross_section())
            .sum()
    }

    /// Pick a populated state, weighted by each state's total cross-section
    /// when available, uniformly otherwise.
    fn sample_state<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let total = self.total_cross_section();
        if total > 0.0 {
            let mut u = rng.gen::<f64>() * total;
            for (i, dist) in self.distributions.iter().enumerate() {
                u -= dist.total_cross_section();
                if u <= 0.0 {
                    return i;
                }
            }
            self.distributions.len() - 1
        } else {
            (rng.gen::<f64>() * self.excitations.len() as f64) as usize % self.excitations.len()
        }
    }

    /// Sample the reaction at a beam kinetic energy `e_react` (MeV, lab,
    /// target at rest). Returns None when the sampled state is kinematically
    /// forbidden at that energy; the caller discards the event.
    pub fn sample<R: Rng + ?Sized>(&self, e_react: f64, rng: &mut R) -> Option<ReactionProducts> {
        let state = self.sample_state(rng);
        let com_theta = self.distributions[state].sample(rng);
        let phi = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
        self.solve(e_react, state, com_theta, phi)
    }

    /// Two-body solution for a fixed state and center-of-mass angle.
    pub fn solve(
        &self,
        e_react: f64,
        state: usize,
        com_theta: f64,
        phi: f64,
    ) -> Option<ReactionProducts> {
        let m1 = self.beam.mass;
        let m2 = self.target.mass;
        let m3 = self.eject.mass;
        let m4 = self.recoil_gs_mass + self.excitations[state];

        // Mandelstam s with the target at rest
        let e1 = e_react + m1;
        let s = m1 * m1 + m2 * m2 + 2.0 * m2 * e1;
        let sqrt_s = s.sqrt();
        if sqrt_s < m3 + m4 {
            return None; // below threshold for this state
        }

        let p1 = (e1 * e1 - m1 * m1).sqrt();
        let pcm = ((s - (m3 + m4).powi(2)) * (s - (m3 - m4).powi(2))).sqrt() / (2.0 * sqrt_s);
        let e3_cm = (s + m3 * m3 - m4 * m4) / (2.0 * sqrt_s);
        let e4_cm = sqrt_s - e3_cm;

        // Boost from the CM frame back to the lab
        let beta = p1 / (e1 + m2);
        let gamma = (e1 + m2) / sqrt_s;
        let (cos_t, sin_t) = (com_theta.cos(), com_theta.sin());

        let pz3 = gamma * (pcm * cos_t + beta * e3_cm);
        let pt3 = pcm * sin_t;
        let e3 = gamma * (e3_cm + beta * pcm * cos_t);
        let theta3 = pt3.atan2(pz3);

        let pz4 = gamma * (-pcm * cos_t + beta * e4_cm);
        let pt4 = pcm * sin_t;
        let e4 = gamma * (e4_cm - beta * pcm * cos_t);
        let theta4 = pt4.atan2(pz4);

        Some(ReactionProducts {
            eject_energy: (e3 - m3).max(0.0),
            eject_dir: math::sphere_to_cart(1.0, theta3, phi),
            recoil_energy: (e4 - m4).max(0.0),
            recoil_dir: math::sphere_to_cart(1.0, theta4, phi + std::f64::consts::PI),
            com_theta,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// d(t,n)a with literature masses (amu) and Q = +17.59 MeV
    fn dt_reaction() -> Reaction {
        let d = Species::from_amu(1.0, 2.0, 2.014102);
        let t = Species::from_amu(1.0, 3.0, 3.016049);
        let n = Species::from_amu(0.0, 1.0, 1.008665);
        Reaction::new(t, d, n, 17.59, &[]).unwrap()
    }

    /// A (d,p) style pickup with a negative Q-value and two excited states
    fn endothermic_reaction() -> Reaction {
        let beam = Species::new(1.0, 2.0, 1.112);
        let target = Species::new(6.0, 12.0, 7.680);
        let eject = Species::new(1.0, 1.0, 0.0);
        Reaction::new(beam, target, eject, -2.0, &[1.5, 3.0]).unwrap()
    }

    #[test]
    fn test_recoil_species_conserved() {
        let r = endothermic_reaction();
        let (z, a) = r.recoil_species();
        assert_eq!(z, 6.0);
        assert_eq!(a, 13.0);
        assert_eq!(r.n_states(), 3);
    }

    #[test]
    fn test_energy_conservation() {
        let r = dt_reaction();
        let e_react = 0.1;
        let products = r.solve(e_react, 0, 1.0, 0.3).expect("above threshold");
        // Kinetic energy out = kinetic energy in + Q
        let sum = products.eject_energy + products.recoil_energy;
        assert!(
            (sum - (e_react + 17.59)).abs() < 1e-6,
            "T3 + T4 = {}",
            sum
        );
    }

    #[test]
    fn test_dt_neutron_energy() {
        // The d(t,n)a neutron near threshold carries ~14.1 MeV at 0 degrees
        let r = dt_reaction();
        let products = r.solve(0.05, 0, 0.0, 0.0).expect("above threshold");
        assert!(
            (products.eject_energy - 14.1).abs() < 0.3,
            "En = {}",
            products.eject_energy
        );
    }

    #[test]
    fn test_momentum_conservation_transverse() {
        let r = dt_reaction();
        let products = r.solve(2.0, 0, 1.2, 0.7).expect("above threshold");
        let m3 = r.eject_mass();
        let m4 = r.recoil_mass();
        let p3 = ((products.eject_energy + m3).powi(2) - m3 * m3).sqrt();
        let p4 = ((products.recoil_energy + m4).powi(2) - m4 * m4).sqrt();
        let transverse =
            |d: &nalgebra::Vector3<f64>| (d.x * d.x + d.y * d.y).sqrt();
        let pt3 = p3 * transverse(&products.eject_dir);
        let pt4 = p4 * transverse(&products.recoil_dir);
        assert!((pt3 - pt4).abs() / pt3 < 1e-6, "pt3={} pt4={}", pt3, pt4);
        // Opposite azimuth
        let az3 = products.eject_dir.y.atan2(products.eject_dir.x);
        let az4 = products.recoil_dir.y.atan2(products.recoil_dir.x);
        let dphi = (az3 - az4).rem_euclid(2.0 * std::f64::consts::PI);
        assert!((dphi - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_below_threshold_rejected() {
        // Q = -2.0 MeV: far below the threshold no state is open
        let r = endothermic_reaction();
        assert!(r.solve(0.5, 0, 1.0, 0.0).is_none());
        // Higher excitations close before the ground state opens
        assert!(r.solve(2.4, 2, 1.0, 0.0).is_none());
    }

    #[test]
    fn test_sample_discards_below_threshold() {
        let r = endothermic_reaction();
        let mut rng = StdRng::seed_from_u64(10);
        for _ in 0..100 {
            assert!(r.sample(0.5, &mut rng).is_none());
        }
    }

    #[test]
    fn test_sample_above_threshold() {
        let r = dt_reaction();
        let mut rng = StdRng::seed_from_u64(11);
        let products = r.sample(1.0, &mut rng).expect("exothermic");
        assert!(products.eject_energy > 0.0);
        assert!((products.eject_dir.norm() - 1.0).abs() < 1e-12);
        assert!((products.recoil_dir.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_state_weighting() {
        let mut r = endothermic_reaction();
        // Give the first excited state 9x the ground-state cross-section
        r.set_distributions(vec![
            AngularDistribution::isotropic(1.0),
            AngularDistribution::isotropic(9.0),
            AngularDistribution::isotropic(0.0),
        ])
        .unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        let mut counts = [0usize; 3];
        for _ in 0..10000 {
            if let Some(p) = r.sample(30.0, &mut rng) {
                counts[p.state] += 1;
            }
        }
        let total = counts.iter().sum::<usize>() as f64;
        assert!(counts[2] == 0, "unpopulated state sampled");
        let frac1 = counts[1] as f64 / total;
        assert!((frac1 - 0.9).abs() < 0.03, "state-1 fraction = {}", frac1);
    }

    #[test]
    fn test_wrong_distribution_count_rejected() {
        let mut r = endothermic_reaction();
        assert!(r
            .set_distributions(vec![AngularDistribution::isotropic(1.0)])
            .is_err());
    }
}
