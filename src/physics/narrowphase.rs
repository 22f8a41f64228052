//! Narrowphase collision detection: specialized closest-point and SAT tests.
//!
//! Every test returns a [`ContactInfo`] whose normal points from shape A to
//! shape B. A zero normal marks a degenerate contact (coincident centres):
//! the bodies overlap but no separating direction exists.

use glam::{Mat3, Vec3};

use super::components::{ColliderShape, Transform};
use super::contact::ContactInfo;

const EPSILON: f32 = 1e-6;

/// Specialized sphere-sphere intersection test.
pub fn sphere_sphere(
    center_a: Vec3,
    radius_a: f32,
    center_b: Vec3,
    radius_b: f32,
) -> Option<ContactInfo> {
    let diff = center_b - center_a;
    let dist_sq = diff.length_squared();
    let min_dist = radius_a + radius_b;

    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > EPSILON { diff / dist } else { Vec3::ZERO };

    let penetration = min_dist - dist;
    let point = center_a + normal * (radius_a - penetration * 0.5);

    Some(ContactInfo {
        normal,
        penetration,
        point,
    })
}

/// Oriented box against a sphere. Normal points from the box to the sphere.
pub fn box_sphere(
    half_extents: Vec3,
    box_transform: &Transform,
    center: Vec3,
    radius: f32,
) -> Option<ContactInfo> {
    let local = box_transform.inverse_transform_point(center);
    let clamped = local.clamp(-half_extents, half_extents);
    let diff = local - clamped;
    let dist_sq = diff.length_squared();

    if dist_sq >= radius * radius {
        return None;
    }

    if dist_sq > EPSILON * EPSILON {
        let dist = dist_sq.sqrt();
        let normal = box_transform.rotation * (diff / dist);
        return Some(ContactInfo {
            normal,
            penetration: radius - dist,
            point: box_transform.transform_point(clamped),
        });
    }

    // Centre inside the box: push out through the nearest face
    let depth = half_extents - local.abs();
    let axis = if depth.x <= depth.y && depth.x <= depth.z {
        0
    } else if depth.y <= depth.z {
        1
    } else {
        2
    };
    let sign = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
    let mut local_normal = Vec3::ZERO;
    local_normal[axis] = sign;
    let mut surface = local;
    surface[axis] = half_extents[axis] * sign;

    Some(ContactInfo {
        normal: box_transform.rotation * local_normal,
        penetration: depth[axis] + radius,
        point: box_transform.transform_point(surface),
    })
}

/// SAT (Separating Axis Theorem) test for oriented box-box collision.
pub fn sat_box_box(
    half_a: Vec3,
    transform_a: &Transform,
    half_b: Vec3,
    transform_b: &Transform,
) -> Option<ContactInfo> {
    let rot_a = Mat3::from_quat(transform_a.rotation);
    let rot_b = Mat3::from_quat(transform_b.rotation);
    let axes_a = [rot_a.x_axis, rot_a.y_axis, rot_a.z_axis];
    let axes_b = [rot_b.x_axis, rot_b.y_axis, rot_b.z_axis];

    let t = transform_b.position - transform_a.position;

    let mut min_overlap = f32::MAX;
    let mut best_axis = Vec3::ZERO;

    let mut candidates: Vec<Vec3> = Vec::with_capacity(15);
    candidates.extend_from_slice(&axes_a);
    candidates.extend_from_slice(&axes_b);
    for a in &axes_a {
        for b in &axes_b {
            let axis = a.cross(*b);
            let len = axis.length();
            if len < EPSILON {
                continue; // Parallel edges
            }
            candidates.push(axis / len);
        }
    }

    for axis in candidates {
        let overlap = sat_test_axis(axis, &axes_a, half_a, &axes_b, half_b, t)?;
        if overlap < min_overlap {
            min_overlap = overlap;
            best_axis = axis;
        }
    }

    // Ensure normal points from A to B
    if best_axis.dot(t) < 0.0 {
        best_axis = -best_axis;
    }

    let reach_a = projected_radius(best_axis, &axes_a, half_a);
    let point = transform_a.position + best_axis * (reach_a - min_overlap * 0.5);

    Some(ContactInfo {
        normal: best_axis,
        penetration: min_overlap,
        point,
    })
}

#[inline]
fn projected_radius(axis: Vec3, axes: &[Vec3; 3], half: Vec3) -> f32 {
    half.x * axes[0].dot(axis).abs() + half.y * axes[1].dot(axis).abs() + half.z * axes[2].dot(axis).abs()
}

/// Test a single SAT axis. Returns Some(overlap) if overlapping, None if separating.
fn sat_test_axis(
    axis: Vec3,
    axes_a: &[Vec3; 3],
    half_a: Vec3,
    axes_b: &[Vec3; 3],
    half_b: Vec3,
    t: Vec3,
) -> Option<f32> {
    let proj_a = projected_radius(axis, axes_a, half_a);
    let proj_b = projected_radius(axis, axes_b, half_b);
    let overlap = proj_a + proj_b - t.dot(axis).abs();

    if overlap > 0.0 {
        Some(overlap)
    } else {
        None
    }
}

/// Closest point to `p` on the segment `a..b`.
#[inline]
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest points between segments `p1..q1` and `p2..q2`.
pub fn closest_points_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a < EPSILON && e < EPSILON {
        return (p1, p2);
    }
    let (s, t) = if a < EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e < EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    (p1 + d1 * s, p2 + d2 * t)
}

/// End points of a capsule's inner segment in world space.
#[inline]
fn capsule_segment(half_height: f32, transform: &Transform) -> (Vec3, Vec3) {
    let axis = transform.rotation * Vec3::Y * half_height;
    (transform.position - axis, transform.position + axis)
}

/// Plane (half-space) against any bounded shape. Normal is the plane normal.
pub fn plane_shape(
    plane_transform: &Transform,
    shape: &ColliderShape,
    transform: &Transform,
) -> Option<ContactInfo> {
    let normal = plane_transform.rotation * Vec3::Y;
    let offset = normal.dot(plane_transform.position);
    let deepest = shape.support(-normal, transform);
    let depth = offset - normal.dot(deepest);

    if depth <= 0.0 {
        return None;
    }

    Some(ContactInfo {
        normal,
        penetration: depth,
        point: deepest + normal * (depth * 0.5),
    })
}

/// Capsule against an oriented box, via the segment point nearest the box.
fn box_capsule(
    half_extents: Vec3,
    box_transform: &Transform,
    radius: f32,
    half_height: f32,
    capsule_transform: &Transform,
) -> Option<ContactInfo> {
    let (a, b) = capsule_segment(half_height, capsule_transform);
    let mut on_segment = closest_point_on_segment(box_transform.position, a, b);
    // Two refinement passes are enough for upright capsules against boxes
    for _ in 0..2 {
        let local = box_transform
            .inverse_transform_point(on_segment)
            .clamp(-half_extents, half_extents);
        let on_box = box_transform.transform_point(local);
        on_segment = closest_point_on_segment(on_box, a, b);
    }
    box_sphere(half_extents, box_transform, on_segment, radius)
}

/// Detect collision between two shapes, dispatching to specialized tests.
pub fn detect_collision(
    shape_a: &ColliderShape,
    transform_a: &Transform,
    shape_b: &ColliderShape,
    transform_b: &Transform,
) -> Option<ContactInfo> {
    use ColliderShape::*;

    match (shape_a, shape_b) {
        (Plane, Plane) => None,
        (Plane, other) => plane_shape(transform_a, other, transform_b),
        (Sphere { radius: ra }, Sphere { radius: rb }) => {
            sphere_sphere(transform_a.position, *ra, transform_b.position, *rb)
        }
        (Box { half_extents }, Sphere { radius }) => {
            box_sphere(*half_extents, transform_a, transform_b.position, *radius)
        }
        (Box { half_extents: ha }, Box { half_extents: hb }) => {
            sat_box_box(*ha, transform_a, *hb, transform_b)
        }
        (
            Box { half_extents },
            Capsule {
                radius,
                half_height,
            },
        ) => box_capsule(*half_extents, transform_a, *radius, *half_height, transform_b),
        (
            Capsule {
                radius: ra,
                half_height: ha,
            },
            Capsule {
                radius: rb,
                half_height: hb,
            },
        ) => {
            let (a0, a1) = capsule_segment(*ha, transform_a);
            let (b0, b1) = capsule_segment(*hb, transform_b);
            let (pa, pb) = closest_points_segments(a0, a1, b0, b1);
            sphere_sphere(pa, *ra, pb, *rb)
        }
        (
            Capsule {
                radius: ra,
                half_height,
            },
            Sphere { radius: rb },
        ) => {
            let (a0, a1) = capsule_segment(*half_height, transform_a);
            let pa = closest_point_on_segment(transform_b.position, a0, a1);
            sphere_sphere(pa, *ra, transform_b.position, *rb)
        }
        // Remaining combinations are mirrors of the ones above
        _ => detect_collision(shape_b, transform_b, shape_a, transform_a).map(flip),
    }
}

#[inline]
fn flip(info: ContactInfo) -> ContactInfo {
    ContactInfo {
        normal: -info.normal,
        ..info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_sphere_sphere_intersection() {
        let info = sphere_sphere(Vec3::ZERO, 1.0, Vec3::new(1.5, 0.0, 0.0), 1.0).unwrap();
        let eps = 1e-4;
        assert!((info.normal - Vec3::X).length() < eps);
        assert!((info.penetration - 0.5).abs() < eps);
    }

    #[test]
    fn test_sphere_sphere_no_intersection() {
        assert!(sphere_sphere(Vec3::ZERO, 1.0, Vec3::new(3.0, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn test_coincident_spheres_are_degenerate() {
        let info = sphere_sphere(Vec3::ONE, 1.0, Vec3::ONE, 1.0).unwrap();
        assert_eq!(info.normal, Vec3::ZERO);
        assert!((info.penetration - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_box_sphere_face_contact() {
        let box_tf = Transform::identity();
        let info = box_sphere(Vec3::splat(1.0), &box_tf, Vec3::new(1.4, 0.0, 0.0), 0.5).unwrap();
        assert!((info.normal - Vec3::X).length() < 1e-4);
        assert!((info.penetration - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_box_sphere_center_inside() {
        let box_tf = Transform::identity();
        let info = box_sphere(Vec3::new(2.0, 1.0, 2.0), &box_tf, Vec3::new(0.0, 0.8, 0.0), 0.5)
            .unwrap();
        // Nearest face is the top one
        assert!((info.normal - Vec3::Y).length() < 1e-4);
        assert!((info.penetration - 0.7).abs() < 1e-4);
    }

    #[test]
    fn test_sat_box_box_intersection() {
        let a = Transform::identity();
        let b = Transform::from_position(Vec3::new(1.5, 0.0, 0.0));
        let info = sat_box_box(Vec3::splat(1.0), &a, Vec3::splat(1.0), &b).unwrap();
        assert!(info.penetration > 0.0);
        assert!(info.normal.dot(Vec3::X) > 0.99);
    }

    #[test]
    fn test_sat_rotated_boxes_separated() {
        let a = Transform::identity();
        let b = Transform {
            position: Vec3::new(3.5, 0.0, 0.0),
            rotation: Quat::from_rotation_y(0.785),
        };
        assert!(sat_box_box(Vec3::splat(1.0), &a, Vec3::splat(1.0), &b).is_none());
    }

    #[test]
    fn test_plane_box_contact() {
        let plane = Transform::identity();
        let shape = ColliderShape::Box {
            half_extents: Vec3::splat(0.5),
        };
        let tf = Transform::from_position(Vec3::new(0.0, 0.4, 0.0));
        let info = plane_shape(&plane, &shape, &tf).unwrap();
        assert!((info.normal - Vec3::Y).length() < 1e-5);
        assert!((info.penetration - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_capsule_box_side_hit() {
        let half = Vec3::new(1.0, 0.5, 2.0);
        let car = Transform::from_position(Vec3::new(0.0, 0.5, 0.0));
        let human = Transform::from_position(Vec3::new(1.2, 0.9, 0.0));
        let info = box_capsule(half, &car, 0.3, 0.6, &human).unwrap();
        assert!(info.normal.dot(Vec3::X) > 0.9);
        assert!((info.penetration - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_detect_collision_mirrors_normal() {
        let sphere = ColliderShape::Sphere { radius: 0.5 };
        let cuboid = ColliderShape::Box {
            half_extents: Vec3::splat(1.0),
        };
        let box_tf = Transform::identity();
        let sphere_tf = Transform::from_position(Vec3::new(0.0, 0.0, 1.3));

        let forward = detect_collision(&cuboid, &box_tf, &sphere, &sphere_tf).unwrap();
        let mirrored = detect_collision(&sphere, &sphere_tf, &cuboid, &box_tf).unwrap();
        assert!((forward.normal + mirrored.normal).length() < 1e-5);
        assert!((forward.penetration - mirrored.penetration).abs() < 1e-5);
    }

    #[test]
    fn test_segments_closest_points() {
        let (a, b) = closest_points_segments(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
        );
        assert!(a.length() < 1e-5);
        assert!((b - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
    }
}
