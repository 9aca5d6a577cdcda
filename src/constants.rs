// Physical constants used throughout the simulation.
// Energies are in MeV, masses in MeV/c^2, lengths in meters unless noted.

/// Speed of light (m/s)
pub const C: f64 = 2.99792458e8;

/// Electron rest-mass energy (MeV)
pub const ELECTRON_RME: f64 = 0.510998928;
/// Proton rest-mass energy (MeV)
pub const PROTON_RME: f64 = 938.272046;
/// Neutron rest-mass energy (MeV)
pub const NEUTRON_RME: f64 = 939.565378;

/// Conversion from atomic mass units to MeV/c^2
pub const AMU_TO_MEV: f64 = 931.494061;

/// Avogadro's number (1/mol)
pub const AVOGADRO: f64 = 6.02214129e23;

/// Bethe-Bloch coefficient K = 4*pi*N_A*r_e^2*m_e*c^2 (MeV cm^2 / mol)
pub const BETHE_COEFF: f64 = 0.307075;

/// Conversion from a gaussian FWHM to its standard deviation, 1/(2*sqrt(2*ln 2))
pub const FWHM_TO_SIGMA: f64 = 0.424660900144;

/// Millibarn to cm^2
pub const MB_TO_CM2: f64 = 1.0e-27;

/// Shell-correction polynomial coefficients (Barkas form). The first triple
/// multiplies I^2 (1e-6 scale), the second I^3 (1e-9 scale), with I in eV.
pub const SHELL_A: [f64; 3] = [0.422377, 0.0304043, -0.00038106];
pub const SHELL_B: [f64; 3] = [3.850190, -0.1667989, 0.00157955];

/// Mean ionization potentials for Z = 1..=13 (eV). Heavier elements use the
/// analytic approximation in `mean_ionization_ev`.
pub const IONIZATION_POTENTIALS: [f64; 13] = [
    19.2, 41.8, 40.0, 63.7, 76.0, 78.0, 82.0, 95.0, 115.0, 137.0, 149.0, 156.0, 166.0,
];

/// Mean ionization potential of an element (eV): tabulated for light elements,
/// 9.76*Z + 58.8*Z^-0.19 above the table.
pub fn mean_ionization_ev(z: f64) -> f64 {
    let zi = z.round() as usize;
    if zi >= 1 && zi <= IONIZATION_POTENTIALS.len() {
        IONIZATION_POTENTIALS[zi - 1]
    } else {
        9.76 * z + 58.8 * z.powf(-0.19)
    }
}

/// Radiation length of a material with mass number `a` and charge `z`,
/// in mg/cm^2. See Barnett et al., Phys. Rev. D 54 (1996) 1.
pub fn radiation_length(a: f64, z: f64) -> f64 {
    7.164e5 * a / (z * (z + 1.0) * (287.0 / z.sqrt()).ln())
}
