// The physical target slab: interaction-depth sampling and beam straggling.

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::constants::AVOGADRO;
use crate::material::Material;
use crate::math;
use crate::polygon::RegularPolygon;
use crate::primitive::{DetectorKind, Primitive};

/// Where a beam particle crossed into the target and where it reacts.
#[derive(Clone, Debug)]
pub struct BeamCrossing {
    /// Entry point on the upstream target surface (m, global)
    pub surface: Vector3<f64>,
    /// Reaction point inside the target (m, global)
    pub interaction: Vector3<f64>,
    /// Path length from the surface to the reaction point (m)
    pub depth: f64,
}

/// The reaction target: a material slab with an areal thickness, a tilt
/// angle with respect to the beam axis and a physical footprint.
#[derive(Clone, Debug)]
pub struct Target {
    material: Material,
    /// Areal thickness (mg/cm^2)
    thickness: f64,
    /// Thickness seen by the beam along z (mg/cm^2)
    z_thickness: f64,
    /// Tilt with respect to the beam axis (rad)
    angle: f64,
    physical: Primitive,
    /// Optional non-rectangular footprint in the slab plane
    footprint: Option<RegularPolygon>,
}

impl Target {
    /// Build a target slab. `width` and `length` are the transverse extents
    /// of the physical slab (m); its depth follows from the areal thickness
    /// and the material density.
    pub fn new(
        material: Material,
        thickness: f64,
        angle: f64,
        width: f64,
        length: f64,
    ) -> Result<Self, String> {
        if thickness <= 0.0 {
            return Err(format!("non-positive target thickness {}", thickness));
        }
        if width <= 0.0 || length <= 0.0 {
            return Err(format!(
                "non-positive target footprint {} x {}",
                width, length
            ));
        }
        let cos_tilt = angle.cos();
        if cos_tilt.abs() < 1e-6 {
            return Err("target tilted edge-on to the beam".to_string());
        }

        let depth = thickness / (material.density() * 1.0e5);
        let mut physical = Primitive::new(DetectorKind::Custom {
            length,
            width,
            depth,
        });
        physical.set_rotation(angle, 0.0, 0.0);
        physical.material = Some(material.name().to_string());
        physical.eject_sensitive = false;
        physical.recoil_sensitive = false;

        Ok(Self {
            material,
            thickness,
            z_thickness: thickness / cos_tilt.abs(),
            angle,
            physical,
            footprint: None,
        })
    }

    /// Restrict the usable slab area to a regular polygon in the slab plane.
    pub fn set_footprint(&mut self, footprint: RegularPolygon) {
        self.footprint = Some(footprint);
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// mg/cm^2
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// mg/cm^2, as seen along the beam axis
    pub fn z_thickness(&self) -> f64 {
        self.z_thickness
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn physical(&self) -> &Primitive {
        &self.physical
    }

    /// Physical slab depth (m)
    pub fn real_thickness(&self) -> f64 {
        self.thickness / (self.material.density() * 1.0e5)
    }

    /// Physical depth seen by the beam (m)
    pub fn real_z_thickness(&self) -> f64 {
        self.z_thickness / (self.material.density() * 1.0e5)
    }

    /// Areal number density (molecules/cm^2)
    pub fn number_density(&self) -> f64 {
        self.thickness * 1.0e-3 * AVOGADRO / self.material.molar_mass()
    }

    /// Trace the beam ray into the slab and draw a uniform reaction depth
    /// along the contained chord. None when the ray misses the slab (or its
    /// footprint), or only grazes a single face.
    pub fn interaction_depth<R: Rng + ?Sized>(
        &self,
        origin: &Vector3<f64>,
        direction: &Vector3<f64>,
        rng: &mut R,
    ) -> Option<BeamCrossing> {
        let hit = self.physical.intersect(origin, direction)?;
        hit.point2?;
        let (entry, exit) = hit.entry_exit(origin);

        if let Some(footprint) = &self.footprint {
            let local = self.physical.local_coords(&entry);
            if !footprint.is_inside(local.x, local.y) {
                return None;
            }
        }

        let chord = exit - entry;
        let depth = rng.gen::<f64>() * chord.norm();
        let dir_unit = direction.normalize();
        Some(BeamCrossing {
            surface: entry,
            interaction: entry + dir_unit * depth,
            depth,
        })
    }

    /// Deflect the beam trajectory by multiple-scattering angular straggling
    /// accumulated over the target thickness. Returns the (unit) straggled
    /// direction; the incident direction is returned unchanged when the
    /// width is not defined.
    pub fn angle_straggling<R: Rng + ?Sized>(
        &self,
        direction: &Vector3<f64>,
        a: f64,
        z: f64,
        energy: f64,
        rng: &mut R,
    ) -> Vector3<f64> {
        let dir = direction.normalize();
        if energy <= 0.0 || a <= 0.0 || z <= 0.0 {
            return dir;
        }

        let t_over_x = self.z_thickness / self.material.rad_length();
        let p_beta_c = (2.0 * energy / a).sqrt() * (2.0 * energy * a).sqrt();
        let width = 13.6 / p_beta_c
            * z
            * t_over_x.sqrt()
            * (1.0 + 0.038 * t_over_x.ln())
            * std::f64::consts::SQRT_2;
        if !(width > 0.0) {
            return dir;
        }

        let polar = Normal::new(0.0, width).expect("finite width").sample(rng);
        let azimuth = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
        math::rotate_direction(&dir, polar.cos(), azimuth)
    }
}
