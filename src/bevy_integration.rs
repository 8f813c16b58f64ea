//! [Bevy](https://docs.rs/bevy/) game engine integrations.
//!
//! Adds the [Bevy](https://docs.rs/bevy/) game engine as a dependency.
//!
//! ### Intersections:
//! - [Aabb3d], [BoundingSphere] and [RayCast3d] work as [`queries`](Bvh::intersect)
//! - [ray](RayCast3d) [nearest hit](Bvh::nearest_hit)
//!
//! ```ignore
//! let ray = RayCast3d::new(Vec3A::new(-10.0, 0.0, 0.0), Dir3A::X, 100.0);
//! assert_eq!(tree.intersect(&ray), vec![1]);
//! assert_eq!(tree.nearest_hit(&ray).map(|hit| hit.object), Some(1));
//! ```

use bevy::math::{
    bounding::{Aabb3d, BoundingSphere, IntersectsVolume, RayCast3d},
    Vec3, Vec3A,
};

use crate::{
    bounding::{Aabb, TVec3},
    query::RayHit,
    shapes::{BoundingQuery, Ray},
    tree::Bvh,
    ObjectKey,
};

impl<K: ObjectKey> Bvh<f32, K> {
    /// The object whose bounds the [RayCast3d] enters first.
    pub fn nearest_hit(&self, ray: &RayCast3d) -> Option<RayHit<K, f32>> {
        let direction: Vec3A = *ray.direction;
        let ray_3d = Ray::new(ray.origin.into(), direction.into());
        self.ray_cast_nearest(&ray_3d, ray.max)
    }
}

impl BoundingQuery<f32> for Aabb3d {
    fn overlaps(&self, aabb: &Aabb<f32>) -> bool {
        self.intersects(&Aabb3d::from(*aabb))
    }
}

impl BoundingQuery<f32> for BoundingSphere {
    fn overlaps(&self, aabb: &Aabb<f32>) -> bool {
        self.intersects(&Aabb3d::from(*aabb))
    }
}

impl BoundingQuery<f32> for RayCast3d {
    fn overlaps(&self, aabb: &Aabb<f32>) -> bool {
        self.intersects(&Aabb3d::from(*aabb))
    }
}

impl From<Aabb<f32>> for Aabb3d {
    fn from(value: Aabb<f32>) -> Self {
        Aabb3d {
            min: value.min.into(),
            max: value.max.into(),
        }
    }
}

impl From<Aabb3d> for Aabb<f32> {
    fn from(value: Aabb3d) -> Self {
        Aabb::from_min_max(value.min.into(), value.max.into())
    }
}

impl From<TVec3<f32>> for Vec3A {
    fn from(value: TVec3<f32>) -> Self {
        Vec3A::new(value.x, value.y, value.z)
    }
}

impl From<TVec3<f32>> for Vec3 {
    fn from(value: TVec3<f32>) -> Self {
        Vec3::new(value.x, value.y, value.z)
    }
}

impl From<Vec3A> for TVec3<f32> {
    fn from(value: Vec3A) -> Self {
        TVec3::new(value.x, value.y, value.z)
    }
}

impl From<Vec3> for TVec3<f32> {
    fn from(value: Vec3) -> Self {
        TVec3::new(value.x, value.y, value.z)
    }
}
