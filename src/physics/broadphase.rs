//! Broadphase collision detection using a spatial hash grid.

use std::collections::{HashMap, HashSet};

use glam::Vec3;

use super::collider::PhysicsAabb;
use super::components::{Collider, CollisionFilter, RigidBody, RigidBodyType, Transform};
use super::contact::pair_key;
use super::BodyId;

type CellKey = (i32, i32, i32);

#[derive(Debug, Clone, Copy)]
struct Entry {
    body: BodyId,
    aabb: PhysicsAabb,
    body_type: RigidBodyType,
    filter: CollisionFilter,
}

impl Entry {
    #[inline]
    fn may_collide(&self, other: &Entry) -> bool {
        // Skip static-static pairs
        if self.body_type == RigidBodyType::Static && other.body_type == RigidBodyType::Static {
            return false;
        }
        self.filter.allows(&other.filter)
    }
}

/// Spatial hash grid broadphase for O(n) average-case pair detection.
///
/// Unbounded shapes (ground planes) bypass the grid and are paired with
/// every bounded body their filter accepts.
pub struct SpatialHashGrid {
    cell_size: f32,
    cells: HashMap<CellKey, Vec<Entry>>,
}

impl Default for SpatialHashGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialHashGrid {
    pub fn new() -> Self {
        Self {
            cell_size: 2.0,
            cells: HashMap::new(),
        }
    }

    /// Compute cell coordinates for a point.
    #[inline]
    fn cell_coords(&self, point: Vec3) -> CellKey {
        let inv = 1.0 / self.cell_size;
        (
            (point.x * inv).floor() as i32,
            (point.y * inv).floor() as i32,
            (point.z * inv).floor() as i32,
        )
    }

    /// Find all pairs of bodies that may be touching.
    ///
    /// Pairs are returned in canonical order (smaller id first), each once.
    pub fn find_pairs(&mut self, world: &hecs::World) -> Vec<(BodyId, BodyId)> {
        self.cells.clear();

        let mut bounded: Vec<Entry> = Vec::new();
        let mut unbounded: Vec<Entry> = Vec::new();
        let mut max_extent: f32 = 0.0;

        for (entity, (collider, transform, rb)) in world
            .query::<(&Collider, &Transform, &RigidBody)>()
            .iter()
        {
            let body = BodyId(entity);
            match collider.shape.compute_aabb(transform) {
                Some(aabb) => {
                    let extent = (aabb.max - aabb.min).max_element();
                    if extent > max_extent {
                        max_extent = extent;
                    }
                    bounded.push(Entry {
                        body,
                        aabb,
                        body_type: rb.body_type,
                        filter: collider.filter,
                    });
                }
                None => unbounded.push(Entry {
                    body,
                    aabb: PhysicsAabb {
                        min: Vec3::splat(f32::MIN),
                        max: Vec3::splat(f32::MAX),
                    },
                    body_type: rb.body_type,
                    filter: collider.filter,
                }),
            }
        }

        // Set cell size to 2x the max AABB extent (minimum 1.0)
        self.cell_size = (max_extent * 2.0).max(1.0);

        for entry in &bounded {
            let min_cell = self.cell_coords(entry.aabb.min);
            let max_cell = self.cell_coords(entry.aabb.max);

            for cx in min_cell.0..=max_cell.0 {
                for cy in min_cell.1..=max_cell.1 {
                    for cz in min_cell.2..=max_cell.2 {
                        self.cells.entry((cx, cy, cz)).or_default().push(*entry);
                    }
                }
            }
        }

        let mut pairs = Vec::with_capacity(bounded.len() * 2);
        let mut seen = HashSet::new();

        for cell in self.cells.values() {
            for i in 0..cell.len() {
                for j in (i + 1)..cell.len() {
                    let (a, b) = (&cell[i], &cell[j]);
                    if !a.may_collide(b) || !a.aabb.overlaps(&b.aabb) {
                        continue;
                    }
                    let pair = pair_key(a.body, b.body);
                    if seen.insert(pair) {
                        pairs.push(pair);
                    }
                }
            }
        }

        for plane in &unbounded {
            for entry in &bounded {
                if plane.may_collide(entry) {
                    pairs.push(pair_key(plane.body, entry.body));
                }
            }
        }

        // Stable order for the solver
        pairs.sort_unstable();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::components::{groups, ColliderShape};

    fn spawn_sphere(world: &mut hecs::World, position: Vec3, radius: f32, rb: RigidBody) {
        world.spawn((
            Transform::from_position(position),
            rb,
            Collider::new(ColliderShape::Sphere { radius }),
        ));
    }

    #[test]
    fn test_broadphase_overlapping() {
        let mut world = hecs::World::new();
        spawn_sphere(&mut world, Vec3::ZERO, 1.0, RigidBody::new_dynamic(1.0));
        spawn_sphere(&mut world, Vec3::new(1.0, 0.0, 0.0), 1.0, RigidBody::new_dynamic(1.0));

        let mut broadphase = SpatialHashGrid::new();
        assert_eq!(broadphase.find_pairs(&world).len(), 1);
    }

    #[test]
    fn test_broadphase_no_overlap() {
        let mut world = hecs::World::new();
        spawn_sphere(&mut world, Vec3::ZERO, 0.5, RigidBody::new_dynamic(1.0));
        spawn_sphere(&mut world, Vec3::new(10.0, 0.0, 0.0), 0.5, RigidBody::new_dynamic(1.0));

        let mut broadphase = SpatialHashGrid::new();
        assert!(broadphase.find_pairs(&world).is_empty());
    }

    #[test]
    fn test_broadphase_static_static_skipped() {
        let mut world = hecs::World::new();
        spawn_sphere(&mut world, Vec3::ZERO, 1.0, RigidBody::new_static());
        spawn_sphere(&mut world, Vec3::ZERO, 1.0, RigidBody::new_static());

        let mut broadphase = SpatialHashGrid::new();
        assert!(broadphase.find_pairs(&world).is_empty());
    }

    #[test]
    fn test_broadphase_respects_filter() {
        let mut world = hecs::World::new();
        for x in [0.0, 0.5] {
            let mut collider = Collider::new(ColliderShape::Sphere { radius: 1.0 });
            collider.filter = CollisionFilter::new(groups::AGENT, groups::VEHICLE);
            world.spawn((
                Transform::from_position(Vec3::new(x, 0.0, 0.0)),
                RigidBody::new_dynamic(1.0),
                collider,
            ));
        }

        let mut broadphase = SpatialHashGrid::new();
        assert!(broadphase.find_pairs(&world).is_empty());
    }

    #[test]
    fn test_plane_pairs_with_every_bounded_body() {
        let mut world = hecs::World::new();
        world.spawn((
            Transform::identity(),
            RigidBody::new_static(),
            Collider::new(ColliderShape::Plane),
        ));
        spawn_sphere(&mut world, Vec3::new(0.0, 0.4, 0.0), 0.5, RigidBody::new_dynamic(1.0));
        spawn_sphere(&mut world, Vec3::new(50.0, 9.0, 0.0), 0.5, RigidBody::new_dynamic(1.0));

        let mut broadphase = SpatialHashGrid::new();
        assert_eq!(broadphase.find_pairs(&world).len(), 2);
    }
}
