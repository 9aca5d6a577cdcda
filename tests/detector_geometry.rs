// Integration tests for the detector-array geometry against known setups.

use nalgebra::Vector3;
use reaction_mc::{DetectorKind, DetectorRecord, DetectorRole, Face, Primitive};

fn small_bar_at_one_meter() -> Primitive {
    Primitive::from_record(&DetectorRecord {
        position: [0.0, 0.0, 1.0],
        rotation: [0.0, 0.0, 0.0],
        kind: DetectorKind::SmallBar,
        role: DetectorRole::Eject,
        material: None,
    })
}

#[test]
fn test_forward_bar_front_face_hit() {
    // A 0.6 x 0.03 x 0.03 m bar at (0, 0, 1 m) with zero rotation, ray from
    // the origin along +z: front-face hit at local (0, 0) and global
    // (0, 0, 0.985 m) since the front face sits half a depth upstream.
    let bar = small_bar_at_one_meter();
    let origin = Vector3::zeros();
    let dir = Vector3::new(0.0, 0.0, 1.0);

    let hit = bar.intersect(&origin, &dir).expect("ray down the bar axis");
    assert_eq!(hit.face1, Face::Front);
    assert!(hit.local.x.abs() < 1e-12);
    assert!(hit.local.y.abs() < 1e-12);

    let (entry, exit) = hit.entry_exit(&origin);
    assert!((entry - Vector3::new(0.0, 0.0, 0.985)).norm() < 1e-12);
    assert!((exit - Vector3::new(0.0, 0.0, 1.015)).norm() < 1e-12);
    assert_eq!(hit.face2, Some(Face::Back));
}

#[test]
fn test_bar_edges_resolve() {
    let bar = small_bar_at_one_meter();
    let dir = Vector3::new(0.0, 0.0, 1.0);

    // Just inside the halves of the front face
    for (x, y) in [(0.0149, 0.0), (-0.0149, 0.0), (0.0, 0.299), (0.0, -0.299)] {
        let origin = Vector3::new(x, y, 0.0);
        assert!(
            bar.intersect(&origin, &dir).is_some(),
            "({}, {}) should hit",
            x,
            y
        );
    }
    // Just outside
    for (x, y) in [(0.016, 0.0), (-0.016, 0.0), (0.0, 0.301), (0.0, -0.301)] {
        let origin = Vector3::new(x, y, 0.0);
        assert!(
            bar.intersect(&origin, &dir).is_none(),
            "({}, {}) should miss",
            x,
            y
        );
    }
}

#[test]
fn test_ring_of_bars_each_hit_by_its_own_ray() {
    // Twelve bars on a 1 m ring around the beam axis, each rotated to face
    // the origin. The ray through each bar center hits that bar and no other.
    let mut bars = Vec::new();
    for i in 0..12 {
        let phi = i as f64 * std::f64::consts::PI / 6.0;
        let theta = std::f64::consts::FRAC_PI_2;
        let mut bar = Primitive::new(DetectorKind::SmallBar);
        bar.set_polar_position(1.0, theta, phi);
        // Local z (depth axis) toward the origin
        bar.set_rotation(theta, phi, 0.0);
        bars.push(bar);
    }

    for (i, bar) in bars.iter().enumerate() {
        let dir = bar.position().normalize();
        let origin = Vector3::zeros();
        let struck: Vec<usize> = bars
            .iter()
            .enumerate()
            .filter(|(_, b)| b.intersect(&origin, &dir).is_some())
            .map(|(j, _)| j)
            .collect();
        assert_eq!(struck, vec![i], "ray {} struck {:?}", i, struck);
    }
}

#[test]
fn test_apparent_thickness_grows_off_axis() {
    // A slanted path between front and back sees more material than the
    // perpendicular one.
    let bar = small_bar_at_one_meter();
    let straight = bar
        .apparent_thickness(
            &Vector3::zeros(),
            &Vector3::new(0.0, 0.0, 1.0),
            Face::Front,
            Face::Back,
        )
        .expect("straight through");
    assert!((straight - 0.03).abs() < 1e-12);

    let slanted_dir = Vector3::new(0.0, 0.01, 1.0).normalize();
    let slanted = bar
        .apparent_thickness(&Vector3::zeros(), &slanted_dir, Face::Front, Face::Back)
        .expect("slanted through");
    assert!(slanted > straight);
}

#[test]
fn test_rotated_ring_bar_local_coordinates() {
    // The beam-right bar (phi = 0) rotated to face the origin: a ray at its
    // center lands at local (0, 0) on the face plane.
    let mut bar = Primitive::new(DetectorKind::SmallBar);
    bar.set_polar_position(1.0, std::f64::consts::FRAC_PI_2, 0.0);
    bar.set_rotation(std::f64::consts::FRAC_PI_2, 0.0, 0.0);

    let dir = Vector3::new(1.0, 0.0, 0.0);
    let hit = bar
        .intersect(&Vector3::zeros(), &dir)
        .expect("hit beam-right bar");
    assert!(hit.local.x.abs() < 1e-9);
    assert!(hit.local.y.abs() < 1e-9);
    assert!(hit.point2.is_some());
}
