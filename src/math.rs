// Vector and rotation helpers shared by the geometry and kinematics modules.

use nalgebra::{Matrix3, Vector3};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::constants::FWHM_TO_SIGMA;

/// Convert spherical coordinates (r, theta, phi) to a cartesian vector.
/// theta is the polar angle from +z, phi the azimuthal angle from +x.
pub fn sphere_to_cart(r: f64, theta: f64, phi: f64) -> Vector3<f64> {
    let sin_theta = theta.sin();
    Vector3::new(
        r * sin_theta * phi.cos(),
        r * sin_theta * phi.sin(),
        r * theta.cos(),
    )
}

/// Convert a cartesian vector to spherical coordinates (r, theta, phi).
/// Returns (0, 0, 0) for the zero vector.
pub fn cart_to_sphere(v: &Vector3<f64>) -> (f64, f64, f64) {
    let r = v.norm();
    if r == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let theta = (v.z / r).clamp(-1.0, 1.0).acos();
    let phi = v.y.atan2(v.x);
    (r, theta, phi)
}

/// Build the three orthonormal detector axes from pitch-roll-yaw angles:
/// rotate by theta about y, phi about z, psi about x. Returns (x, y, z)
/// local axes; each is re-normalized to absorb rounding error.
pub fn pitch_roll_yaw_axes(
    theta: f64,
    phi: f64,
    psi: f64,
) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();
    let (sin_s, cos_s) = psi.sin_cos();

    let x = Vector3::new(cos_t * cos_p, cos_t * sin_p, -sin_t);
    let y = Vector3::new(
        sin_s * sin_t * cos_p - cos_s * sin_p,
        sin_s * sin_t * sin_p + cos_s * cos_p,
        cos_t * sin_s,
    );
    let z = Vector3::new(
        cos_s * sin_t * cos_p + sin_s * sin_p,
        cos_s * sin_t * sin_p - sin_s * cos_p,
        cos_t * cos_s,
    );
    (x.normalize(), y.normalize(), z.normalize())
}

/// Rotation matrix that carries the +z axis onto `direction`, used to
/// transform reaction-product vectors from the beam frame into the lab frame.
pub fn beam_frame(direction: &Vector3<f64>) -> Matrix3<f64> {
    let (_, theta, phi) = cart_to_sphere(direction);
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();

    // Columns are the images of the local x, y, z axes.
    let u = Vector3::new(cos_t * cos_p, cos_t * sin_p, -sin_t);
    let v = Vector3::new(-sin_p, cos_p, 0.0);
    let w = Vector3::new(sin_t * cos_p, sin_t * sin_p, cos_t);
    Matrix3::from_columns(&[u, v, w])
}

/// Rotate `direction` to a new unit vector with cosine `mu` relative to the
/// original, at azimuthal angle `phi` about it.
pub fn rotate_direction(direction: &Vector3<f64>, mu: f64, phi: f64) -> Vector3<f64> {
    let sin_theta = (1.0 - mu * mu).max(0.0).sqrt();

    // Find a perpendicular vector to the current direction
    let perp = if direction.x.abs() < 0.99 {
        Vector3::new(1.0, 0.0, 0.0).cross(direction).normalize()
    } else {
        Vector3::new(0.0, 1.0, 0.0).cross(direction).normalize()
    };
    let ortho = direction.cross(&perp);

    mu * direction + sin_theta * phi.cos() * perp + sin_theta * phi.sin() * ortho
}

/// Sample an isotropic unit vector.
pub fn unit_sphere_random<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    let mu = 2.0 * rng.gen::<f64>() - 1.0;
    let phi = 2.0 * std::f64::consts::PI * rng.gen::<f64>();
    let sin_theta = (1.0 - mu * mu).sqrt();
    Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), mu)
}

/// Draw from a gaussian centered at zero specified by its FWHM `w`.
/// Returns 0 for non-positive widths.
pub fn gauss_fwhm<R: Rng + ?Sized>(rng: &mut R, w: f64) -> f64 {
    if w <= 0.0 {
        return 0.0;
    }
    let normal = Normal::new(0.0, FWHM_TO_SIGMA * w).expect("finite width");
    normal.sample(rng)
}
