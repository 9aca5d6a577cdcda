// Oriented rectangular detector volume and its ray-intersection logic.
//
// +X is beam-right, +Y is the vertical axis, +Z is the beam axis.

use nalgebra::{Matrix3, Vector3};
use once_cell::sync::OnceCell;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math;

/// Rays closer than this to parallel with a face plane are treated as
/// missing that face.
const PARALLEL_EPS: f64 = 1e-12;

/// The six faces of a detector volume, in fixed order. Front/back, right/left
/// and top/bottom are opposite pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Face {
    /// +local z
    Front = 0,
    /// +local x
    Right = 1,
    /// -local z
    Back = 2,
    /// -local x
    Left = 3,
    /// +local y
    Top = 4,
    /// -local y
    Bottom = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Front,
        Face::Right,
        Face::Back,
        Face::Left,
        Face::Top,
        Face::Bottom,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Face {
        match self {
            Face::Front => Face::Back,
            Face::Right => Face::Left,
            Face::Back => Face::Front,
            Face::Left => Face::Right,
            Face::Top => Face::Bottom,
            Face::Bottom => Face::Top,
        }
    }
}

/// Detector class. The bar variants carry preset dimensions; anything else is
/// described explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DetectorKind {
    SmallBar,
    MediumBar,
    LargeBar,
    Custom { length: f64, width: f64, depth: f64 },
}

impl DetectorKind {
    /// (length, width, depth) in meters.
    pub fn dimensions(self) -> (f64, f64, f64) {
        match self {
            DetectorKind::SmallBar => (0.6, 0.03, 0.03),
            DetectorKind::MediumBar => (1.2, 0.05, 0.03),
            DetectorKind::LargeBar => (2.0, 0.05, 0.05),
            DetectorKind::Custom {
                length,
                width,
                depth,
            } => (length, width, depth),
        }
    }

    /// Classify explicit dimensions, promoting exact preset matches so that
    /// efficiency tables keyed by bar class still apply.
    pub fn from_dimensions(length: f64, width: f64, depth: f64) -> Self {
        if length == 0.6 && width == 0.03 && depth == 0.03 {
            DetectorKind::SmallBar
        } else if length == 1.2 && width == 0.05 && depth == 0.03 {
            DetectorKind::MediumBar
        } else if length == 2.0 && width == 0.05 && depth == 0.05 {
            DetectorKind::LargeBar
        } else {
            DetectorKind::Custom {
                length,
                width,
                depth,
            }
        }
    }
}

/// Which reaction product(s) a detector element is sensitive to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorRole {
    Eject,
    Recoil,
    Dual,
}

/// One already-parsed detector setup record, as supplied by the external
/// configuration layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectorRecord {
    /// Center position (m)
    pub position: [f64; 3],
    /// Rotation angles theta, phi, psi (rad)
    pub rotation: [f64; 3],
    pub kind: DetectorKind,
    pub role: DetectorRole,
    /// Material tag, resolved by the caller
    pub material: Option<String>,
}

/// Result of a ray/box intersection. A convex box is struck on at most two
/// faces; `point2`/`face2` are present only when the ray passes through.
/// `local` holds the face-local coordinates of whichever struck point lies
/// closer to the ray origin.
#[derive(Clone, Debug)]
pub struct Intersection {
    pub point1: Vector3<f64>,
    pub face1: Face,
    pub point2: Option<Vector3<f64>>,
    pub face2: Option<Face>,
    pub local: Vector3<f64>,
}

impl Intersection {
    /// Entry point, exit point and chord through the volume. Grazing hits
    /// that strike a single face have a zero-length chord.
    pub fn entry_exit(&self, origin: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
        match self.point2 {
            Some(p2) => {
                if (self.point1 - origin).norm() <= (p2 - origin).norm() {
                    (self.point1, p2)
                } else {
                    (p2, self.point1)
                }
            }
            None => (self.point1, self.point1),
        }
    }
}

/// An oriented rectangular box representing one detector element.
///
/// The three local axes are derived from the pitch-roll-yaw rotation angles
/// and are always mutually orthonormal. World-space face centers are cached
/// and recomputed lazily: every mutator of position or rotation clears the
/// cache, the accessor rebuilds it on demand.
#[derive(Clone, Debug)]
pub struct Primitive {
    position: Vector3<f64>,
    theta: f64,
    phi: f64,
    psi: f64,
    det_x: Vector3<f64>,
    det_y: Vector3<f64>,
    det_z: Vector3<f64>,
    rotation: Matrix3<f64>,
    length: f64,
    width: f64,
    depth: f64,
    kind: DetectorKind,
    pub material: Option<String>,
    pub eject_sensitive: bool,
    pub recoil_sensitive: bool,
    faces: OnceCell<[Vector3<f64>; 6]>,
}

impl Primitive {
    pub fn new(kind: DetectorKind) -> Self {
        let (length, width, depth) = kind.dimensions();
        Self {
            position: Vector3::zeros(),
            theta: 0.0,
            phi: 0.0,
            psi: 0.0,
            det_x: Vector3::new(1.0, 0.0, 0.0),
            det_y: Vector3::new(0.0, 1.0, 0.0),
            det_z: Vector3::new(0.0, 0.0, 1.0),
            rotation: Matrix3::identity(),
            length,
            width,
            depth,
            kind,
            material: None,
            eject_sensitive: true,
            recoil_sensitive: false,
            faces: OnceCell::new(),
        }
    }

    pub fn from_record(record: &DetectorRecord) -> Self {
        let mut det = Primitive::new(record.kind);
        det.set_position(Vector3::from(record.position));
        det.set_rotation(record.rotation[0], record.rotation[1], record.rotation[2]);
        det.material = record.material.clone();
        det.eject_sensitive = matches!(record.role, DetectorRole::Eject | DetectorRole::Dual);
        det.recoil_sensitive = matches!(record.role, DetectorRole::Recoil | DetectorRole::Dual);
        det
    }

    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    /// (length, width, depth) in meters.
    pub fn dimensions(&self) -> (f64, f64, f64) {
        (self.length, self.width, self.depth)
    }

    pub fn rotation_angles(&self) -> (f64, f64, f64) {
        (self.theta, self.phi, self.psi)
    }

    /// Local axes (x, y, z) in world coordinates.
    pub fn axes(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        (self.det_x, self.det_y, self.det_z)
    }

    pub fn set_position(&mut self, position: Vector3<f64>) {
        self.position = position;
        self.faces = OnceCell::new();
    }

    /// Position from polar coordinates (m, rad, rad).
    pub fn set_polar_position(&mut self, r: f64, theta: f64, phi: f64) {
        self.set_position(math::sphere_to_cart(r, theta, phi));
    }

    /// Rebuild the local axes from pitch-roll-yaw angles (radians, any range).
    pub fn set_rotation(&mut self, theta: f64, phi: f64, psi: f64) {
        self.theta = theta;
        self.phi = phi;
        self.psi = psi;
        let (x, y, z) = math::pitch_roll_yaw_axes(theta, phi, psi);
        self.det_x = x;
        self.det_y = y;
        self.det_z = z;
        self.rotation = Matrix3::from_columns(&[x, y, z]);
        self.faces = OnceCell::new();
    }

    /// Set the physical size, promoting exact preset bar dimensions.
    pub fn set_size(&mut self, length: f64, width: f64, depth: f64) {
        self.kind = DetectorKind::from_dimensions(length, width, depth);
        let (l, w, d) = self.kind.dimensions();
        self.length = l;
        self.width = w;
        self.depth = d;
        self.faces = OnceCell::new();
    }

    /// World-space centers of the six faces, rebuilt on demand after any
    /// mutation of position, rotation or size. The front face is the
    /// upstream one, offset toward the target by half the depth.
    pub fn face_centers(&self) -> &[Vector3<f64>; 6] {
        self.faces.get_or_init(|| {
            [
                self.position - self.det_z * (self.depth / 2.0),
                self.position + self.det_x * (self.width / 2.0),
                self.position + self.det_z * (self.depth / 2.0),
                self.position - self.det_x * (self.width / 2.0),
                self.position + self.det_y * (self.length / 2.0),
                self.position - self.det_y * (self.length / 2.0),
            ]
        })
    }

    /// Unit normal of the plane containing a face, following the fixed face
    /// ordering: front +z, right +x, back -z, left -x, top +y, bottom -y
    /// (local axes).
    pub fn unit_normal(&self, face: Face) -> Vector3<f64> {
        match face {
            Face::Front => self.det_z,
            Face::Right => self.det_x,
            Face::Back => -self.det_z,
            Face::Left => -self.det_x,
            Face::Top => self.det_y,
            Face::Bottom => -self.det_y,
        }
    }

    /// Transform a world coordinate into the detector-local frame.
    pub fn local_coords(&self, world: &Vector3<f64>) -> Vector3<f64> {
        let rel = world - self.position;
        Vector3::new(
            rel.dot(&self.det_x),
            rel.dot(&self.det_y),
            rel.dot(&self.det_z),
        )
    }

    /// True if a local-frame point lies within the extent of the given face.
    /// Face axes: x spans the width, y the length, z the depth.
    pub fn check_bounds(&self, face: Face, local: &Vector3<f64>) -> bool {
        let half_w = self.width / 2.0;
        let half_l = self.length / 2.0;
        let half_d = self.depth / 2.0;
        match face {
            Face::Front | Face::Back => local.x.abs() <= half_w && local.y.abs() <= half_l,
            Face::Right | Face::Left => local.z.abs() <= half_d && local.y.abs() <= half_l,
            Face::Top | Face::Bottom => local.x.abs() <= half_w && local.z.abs() <= half_d,
        }
    }

    /// Intersection of the ray `origin + t*direction` with the infinite plane
    /// containing one face. Returns None for t < 0 (plane behind the origin)
    /// and for rays parallel to the plane.
    pub fn plane_intersect(
        &self,
        origin: &Vector3<f64>,
        direction: &Vector3<f64>,
        face: Face,
    ) -> Option<Vector3<f64>> {
        let normal = self.unit_normal(face);
        let denom = direction.dot(&normal);
        if denom.abs() < PARALLEL_EPS {
            return None;
        }
        let center = self.face_centers()[face.index()];
        let t = (center - origin).dot(&normal) / denom;
        (t >= 0.0).then(|| origin + direction * t)
    }

    /// Test the ray against all six faces. At most two faces of a convex box
    /// can be struck; the first two accepted hits are reported in face order
    /// and `local` carries the face coordinates of the hit closer to the ray
    /// origin.
    pub fn intersect(
        &self,
        origin: &Vector3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<Intersection> {
        let mut hit: Option<Intersection> = None;
        for face in Face::ALL {
            let Some(point) = self.plane_intersect(origin, direction, face) else {
                continue;
            };
            let local = self.local_coords(&point);
            if !self.check_bounds(face, &local) {
                continue;
            }
            match hit.as_mut() {
                None => {
                    hit = Some(Intersection {
                        point1: point,
                        face1: face,
                        point2: None,
                        face2: None,
                        local,
                    });
                }
                Some(h) => {
                    h.point2 = Some(point);
                    h.face2 = Some(face);
                    if (point - origin).norm() < (h.point1 - origin).norm() {
                        h.local = local;
                    }
                    break;
                }
            }
        }
        hit
    }

    /// Path length a straight ray sees between two named faces, or None if
    /// either face is not struck within its bounds.
    pub fn apparent_thickness(
        &self,
        origin: &Vector3<f64>,
        direction: &Vector3<f64>,
        entry: Face,
        exit: Face,
    ) -> Option<f64> {
        let p1 = self.plane_intersect(origin, direction, entry)?;
        if !self.check_bounds(entry, &self.local_coords(&p1)) {
            return None;
        }
        let p2 = self.plane_intersect(origin, direction, exit)?;
        if !self.check_bounds(exit, &self.local_coords(&p2)) {
            return None;
        }
        Some((p2 - p1).norm())
    }

    /// Uniform random point inside the volume.
    pub fn random_point_inside<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector3<f64> {
        let local = Vector3::new(
            (rng.gen::<f64>() - 0.5) * self.width,
            (rng.gen::<f64>() - 0.5) * self.length,
            (rng.gen::<f64>() - 0.5) * self.depth,
        );
        self.position + self.rotation * local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn unit_box() -> Primitive {
        Primitive::new(DetectorKind::Custom {
            length: 1.0,
            width: 1.0,
            depth: 1.0,
        })
    }

    #[test]
    fn test_face_opposites() {
        for face in Face::ALL {
            assert_eq!(face.opposite().opposite(), face);
            assert_ne!(face.opposite(), face);
        }
        assert_eq!(Face::Front.opposite(), Face::Back);
        assert_eq!(Face::Right.opposite(), Face::Left);
        assert_eq!(Face::Top.opposite(), Face::Bottom);
    }

    #[test]
    fn test_preset_promotion() {
        assert_eq!(
            DetectorKind::from_dimensions(0.6, 0.03, 0.03),
            DetectorKind::SmallBar
        );
        assert_eq!(
            DetectorKind::from_dimensions(2.0, 0.05, 0.05),
            DetectorKind::LargeBar
        );
        assert!(matches!(
            DetectorKind::from_dimensions(0.5, 0.03, 0.03),
            DetectorKind::Custom { .. }
        ));
    }

    #[test]
    fn test_axes_orthonormal_after_rotation() {
        let mut det = unit_box();
        for &(t, p, s) in &[(0.3, 1.1, -0.7), (2.0, -3.0, 0.5), (6.9, 0.0, 1.2)] {
            det.set_rotation(t, p, s);
            let (x, y, z) = det.axes();
            assert!((x.norm() - 1.0).abs() < 1e-12);
            assert!((y.norm() - 1.0).abs() < 1e-12);
            assert!((z.norm() - 1.0).abs() < 1e-12);
            assert!(x.dot(&y).abs() < 1e-12);
            assert!(y.dot(&z).abs() < 1e-12);
            assert!(z.dot(&x).abs() < 1e-12);
        }
    }

    #[test]
    fn test_axis_rays_hit_opposite_faces() {
        // 1x1x1 box at the origin: a ray along +z from z=-10 enters the
        // upstream front face at z=-0.5 and exits the back face at z=+0.5.
        let det = unit_box();
        let origin = Vector3::new(0.0, 0.0, -10.0);
        let dir = Vector3::new(0.0, 0.0, 1.0);
        let hit = det.intersect(&origin, &dir).expect("ray through the box");
        let (entry, exit) = hit.entry_exit(&origin);
        assert!((entry.z - (-0.5)).abs() < 1e-12);
        assert!((exit.z - 0.5).abs() < 1e-12);
        assert_eq!(hit.face1, Face::Front);
        assert_eq!(hit.face2, Some(Face::Back));

        // Same along +x and +y
        for (dir, f1, f2) in [
            (Vector3::new(1.0, 0.0, 0.0), Face::Left, Face::Right),
            (Vector3::new(0.0, 1.0, 0.0), Face::Bottom, Face::Top),
        ] {
            let origin = -10.0 * dir;
            let hit = det.intersect(&origin, &dir).expect("ray through the box");
            let (entry, exit) = hit.entry_exit(&origin);
            assert!((entry.dot(&dir) - (-0.5)).abs() < 1e-12);
            assert!((exit.dot(&dir) - 0.5).abs() < 1e-12);
            let faces = [Some(hit.face1), hit.face2];
            assert!(faces.contains(&Some(f1)), "{:?}", faces);
            assert!(faces.contains(&Some(f2)), "{:?}", faces);
        }
    }

    #[test]
    fn test_miss_returns_none() {
        let det = unit_box();
        let origin = Vector3::new(5.0, 5.0, -10.0);
        let dir = Vector3::new(0.0, 0.0, 1.0);
        assert!(det.intersect(&origin, &dir).is_none());
    }

    #[test]
    fn test_box_behind_ray_not_hit() {
        let det = unit_box();
        let origin = Vector3::new(0.0, 0.0, 10.0);
        let dir = Vector3::new(0.0, 0.0, 1.0);
        assert!(det.intersect(&origin, &dir).is_none());
    }

    #[test]
    fn test_parallel_ray_guard() {
        // Ray exactly parallel to the top face plane, passing above the box:
        // must be a clean miss, not a NaN-driven accept.
        let det = unit_box();
        let origin = Vector3::new(-10.0, 0.6, 0.0);
        let dir = Vector3::new(1.0, 0.0, 0.0);
        let hit = det.intersect(&origin, &dir);
        assert!(hit.is_none());
    }

    #[test]
    fn test_local_hit_coordinates() {
        let det = unit_box();
        let origin = Vector3::new(0.1, -0.2, -10.0);
        let dir = Vector3::new(0.0, 0.0, 1.0);
        let hit = det.intersect(&origin, &dir).expect("hit");
        // The reported local x/y come from the nearer (front) face and
        // match the ray offset
        assert!((hit.local.x - 0.1).abs() < 1e-12);
        assert!((hit.local.y - (-0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_face_cache_invalidation() {
        let mut det = unit_box();
        let front_before = det.face_centers()[Face::Front.index()];
        det.set_position(Vector3::new(0.0, 0.0, 2.0));
        let front_after = det.face_centers()[Face::Front.index()];
        assert!((front_after.z - 1.5).abs() < 1e-12);
        assert!((front_after - front_before).norm() > 1.0);

        det.set_rotation(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let front_rotated = det.face_centers()[Face::Front.index()];
        assert!((front_rotated - front_after).norm() > 1e-6);
    }

    #[test]
    fn test_rotated_detector_hit() {
        // Rotate the box a quarter turn about y: the local z axis now points
        // along world -x, so a ray along +x strikes front/back faces.
        let mut det = unit_box();
        det.set_rotation(std::f64::consts::FRAC_PI_2, 0.0, 0.0);
        let origin = Vector3::new(-10.0, 0.0, 0.0);
        let dir = Vector3::new(1.0, 0.0, 0.0);
        let hit = det.intersect(&origin, &dir).expect("hit rotated box");
        let faces = [Some(hit.face1), hit.face2];
        assert!(faces.contains(&Some(Face::Front)));
        assert!(faces.contains(&Some(Face::Back)));
    }

    #[test]
    fn test_apparent_thickness() {
        let det = unit_box();
        let origin = Vector3::new(0.0, 0.0, -10.0);
        let dir = Vector3::new(0.0, 0.0, 1.0);
        let thick = det
            .apparent_thickness(&origin, &dir, Face::Front, Face::Back)
            .expect("through both faces");
        assert!((thick - 1.0).abs() < 1e-12);

        // A face the ray cannot strike within bounds fails
        assert!(det
            .apparent_thickness(&origin, &dir, Face::Front, Face::Top)
            .is_none());
    }

    #[test]
    fn test_random_point_inside_bounds() {
        let mut det = unit_box();
        det.set_position(Vector3::new(1.0, 2.0, 3.0));
        det.set_rotation(0.4, -0.9, 2.2);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let p = det.random_point_inside(&mut rng);
            let local = det.local_coords(&p);
            assert!(local.x.abs() <= 0.5 + 1e-12);
            assert!(local.y.abs() <= 0.5 + 1e-12);
            assert!(local.z.abs() <= 0.5 + 1e-12);
        }
    }

    #[test]
    fn test_from_record_roles() {
        let record = DetectorRecord {
            position: [0.0, 0.0, 1.0],
            rotation: [0.0, 0.0, 0.0],
            kind: DetectorKind::SmallBar,
            role: DetectorRole::Dual,
            material: Some("plastic".to_string()),
        };
        let det = Primitive::from_record(&record);
        assert!(det.eject_sensitive);
        assert!(det.recoil_sensitive);
        assert_eq!(det.dimensions(), (0.6, 0.03, 0.03));
    }
}
