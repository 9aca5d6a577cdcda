// Stopping-power model for charged particles in matter.
//
// One reference proton stopping-power calculation (Bethe-Bloch with shell and
// density-effect corrections) serves every ion species through effective-charge
// scaling at equal velocity.

use serde::{Deserialize, Serialize};

use crate::constants::{
    mean_ionization_ev, radiation_length, AVOGADRO, BETHE_COEFF, ELECTRON_RME, PROTON_RME,
};

/// Validity window of the Barkas shell-correction polynomial in eta = beta*gamma.
const SHELL_ETA_MIN: f64 = 0.13;
const SHELL_ETA_MAX: f64 = 100.0;

/// One element of a material's molecular composition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Atomic number
    pub z: f64,
    /// Mass number (u)
    pub a: f64,
    /// Atoms of this element per molecule
    pub atoms_per_molecule: u32,
}

/// A substance the simulation tracks charged particles through. Immutable
/// once constructed; all derived physics constants are computed up front.
#[derive(Clone, Debug)]
pub struct Material {
    name: String,
    elements: Vec<Element>,
    avg_z: f64,
    avg_a: f64,
    /// g/cm^3
    density: f64,
    /// g/mol
    molar_mass: f64,
    /// electrons/cm^3
    electron_density: f64,
    /// mg/cm^2
    rad_length: f64,
    /// ln of the mean ionization potential (MeV)
    ln_ibar: f64,
}

/// beta^2 for a particle of kinetic `energy` and rest mass `mass` (both MeV).
pub fn beta2(energy: f64, mass: f64) -> f64 {
    1.0 - (mass / (energy + mass)).powi(2)
}

/// Kinetic energy (MeV) of a particle with the given beta^2 and rest mass.
pub fn energy_from_beta2(b2: f64, mass: f64) -> f64 {
    mass * (1.0 / (1.0 - b2).sqrt() - 1.0)
}

/// Effective charge of an ion of atomic number `z` at velocity `beta`.
fn effective_charge(beta: f64, z: f64) -> f64 {
    z * (1.0 - (-125.0 * beta / z.powf(2.0 / 3.0)).exp())
}

impl Material {
    pub fn new(name: &str, elements: Vec<Element>, density: f64) -> Result<Self, String> {
        if elements.is_empty() {
            return Err(format!("material '{}' has no elements", name));
        }
        if density <= 0.0 {
            return Err(format!(
                "material '{}' has non-positive density {}",
                name, density
            ));
        }

        let total_atoms: f64 = elements.iter().map(|e| e.atoms_per_molecule as f64).sum();
        let total_z: f64 = elements
            .iter()
            .map(|e| e.atoms_per_molecule as f64 * e.z)
            .sum();
        let molar_mass: f64 = elements
            .iter()
            .map(|e| e.atoms_per_molecule as f64 * e.a)
            .sum();

        let avg_z = total_z / total_atoms;
        let avg_a = molar_mass / total_atoms;
        let electron_density = density * AVOGADRO * total_z / molar_mass;

        // Electron-weighted Bragg additivity for the mean ionization potential
        let ln_ibar_ev = elements
            .iter()
            .map(|e| e.atoms_per_molecule as f64 * e.z * mean_ionization_ev(e.z).ln())
            .sum::<f64>()
            / total_z;
        let ln_ibar = ln_ibar_ev + (1.0e-6_f64).ln();

        Ok(Self {
            name: name.to_string(),
            elements,
            avg_z,
            avg_a,
            density,
            molar_mass,
            electron_density,
            rad_length: radiation_length(avg_a, avg_z),
            ln_ibar,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn average_z(&self) -> f64 {
        self.avg_z
    }

    pub fn average_a(&self) -> f64 {
        self.avg_a
    }

    /// g/cm^3
    pub fn density(&self) -> f64 {
        self.density
    }

    /// g/mol
    pub fn molar_mass(&self) -> f64 {
        self.molar_mass
    }

    /// electrons/cm^3
    pub fn electron_density(&self) -> f64 {
        self.electron_density
    }

    /// mg/cm^2
    pub fn rad_length(&self) -> f64 {
        self.rad_length
    }

    /// ln of the mean ionization potential (MeV)
    pub fn ln_mean_ionization(&self) -> f64 {
        self.ln_ibar
    }

    /// Total atoms per molecule.
    pub fn total_elements(&self) -> u32 {
        self.elements.iter().map(|e| e.atoms_per_molecule).sum()
    }

    /// Unique elements per molecule.
    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    fn mean_ionization_ev_value(&self) -> f64 {
        (self.ln_ibar - (1.0e-6_f64).ln()).exp()
    }

    /// Barkas shell-correction term C for a given eta^2 = (beta*gamma)^2.
    /// eta is clamped to the validity window of the polynomial fit.
    fn shell_correction(&self, eta2: f64) -> f64 {
        use crate::constants::{SHELL_A, SHELL_B};
        let eta = eta2.sqrt().clamp(SHELL_ETA_MIN, SHELL_ETA_MAX);
        let inv2 = 1.0 / (eta * eta);
        let inv4 = inv2 * inv2;
        let inv6 = inv4 * inv2;

        let i_ev = self.mean_ionization_ev_value();
        let quad = SHELL_A[0] * inv2 + SHELL_A[1] * inv4 + SHELL_A[2] * inv6;
        let cubic = SHELL_B[0] * inv2 + SHELL_B[1] * inv4 + SHELL_B[2] * inv6;
        quad * 1.0e-6 * i_ev * i_ev + cubic * 1.0e-9 * i_ev * i_ev * i_ev
    }

    /// Density-effect correction delta, in the asymptotic form, clamped at
    /// zero below the onset.
    fn density_correction(&self, eta2: f64) -> f64 {
        let plasma_ev = 28.816 * (self.density * self.avg_z / self.avg_a).sqrt();
        let delta = eta2.ln() + 2.0 * (plasma_ev / self.mean_ionization_ev_value()).ln() - 1.0;
        delta.max(0.0)
    }

    /// Stopping power (MeV/m) for a proton of the given kinetic energy (MeV).
    pub fn proton_stop_power(&self, energy: f64) -> f64 {
        let b2 = beta2(energy, PROTON_RME);
        let gamma2 = 1.0 / (1.0 - b2);
        let eta2 = b2 * gamma2;

        let ln_arg = (2.0 * ELECTRON_RME * eta2).ln() - self.ln_ibar;
        let mut bracket = ln_arg
            - b2
            - self.shell_correction(eta2) / self.avg_z
            - self.density_correction(eta2) / 2.0;
        // The formula turns over below ~0.3 MeV; keep the bracket positive so
        // range integration stays monotonic.
        if bracket < 0.01 {
            bracket = 0.01;
        }

        let mev_per_cm = BETHE_COEFF * (self.avg_z / self.avg_a) * self.density * bracket / b2;
        mev_per_cm * 100.0
    }

    /// Stopping power (MeV/m) for an ion of charge `z` and rest mass `mass`
    /// (MeV/c^2) at kinetic energy `energy` (MeV): the proton calculation at
    /// equal velocity, rescaled by the squared effective charge.
    pub fn stop_power(&self, energy: f64, z: f64, mass: f64) -> f64 {
        let b2 = beta2(energy, mass);
        let zeff = effective_charge(b2.sqrt(), z);
        let proton_equivalent = energy_from_beta2(b2, PROTON_RME);
        zeff * zeff * self.proton_stop_power(proton_equivalent)
    }

    /// Birks-law light output (in units of L0) for an ion stopped from
    /// `energy`: L = l0 * integral of dE / (1 + kB*S + c*S^2).
    /// kB in m/MeV, c in (m/MeV)^2.
    pub fn birks(&self, energy: f64, z: f64, mass: f64, l0: f64, kb: f64, c: f64) -> f64 {
        const STEPS: usize = 200;
        let de = energy / STEPS as f64;
        let mut light = 0.0;
        let mut prev = 0.0;
        for i in 1..=STEPS {
            let e = i as f64 * de;
            let s = self.stop_power(e, z, mass);
            let current = 1.0 / (1.0 + kb * s + c * s * s);
            light += 0.5 * (current + prev) * de;
            prev = current;
        }
        l0 * light
    }
}
