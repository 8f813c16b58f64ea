//! Query shapes and their overlap tests against an [`Aabb`].
//!
//! Every shape implements [`BoundingQuery`], which is all the
//! [`Bvh`](crate::tree::Bvh) needs to know about it.

use crate::bounding::{Aabb, Float, TVec3};

/// Overlap predicate driving a tree traversal.
pub trait BoundingQuery<F: Float> {
    /// Does the shape touch `aabb`? Decides whether a leaf is reported.
    fn overlaps(&self, aabb: &Aabb<F>) -> bool;

    /// Should the traversal enter a branch bounded by `aabb`?
    fn descend(&self, aabb: &Aabb<F>) -> bool {
        self.overlaps(aabb)
    }
}

/// Point query.
impl<F: Float> BoundingQuery<F> for TVec3<F> {
    fn overlaps(&self, aabb: &Aabb<F>) -> bool {
        aabb.contains(*self)
    }
}

impl<F: Float> BoundingQuery<F> for Aabb<F> {
    fn overlaps(&self, aabb: &Aabb<F>) -> bool {
        Aabb::overlaps(self, aabb)
    }
}

/// Half line starting at `origin`. `direction` is kept normalized, so
/// distances along the ray are world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray<F: Float> {
    pub origin: TVec3<F>,
    pub direction: TVec3<F>,
}

impl<F: Float> Ray<F> {
    /// `direction` must be non zero.
    pub fn new(origin: TVec3<F>, direction: TVec3<F>) -> Self {
        debug_assert!(
            direction.length() > F::zero(),
            "Ray direction must be non zero"
        );
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Point at `distance` along the ray.
    pub fn at(&self, distance: F) -> TVec3<F> {
        self.origin + self.direction * distance
    }

    /// Slab test. Returns the distance at which the ray enters `aabb`,
    /// `0` when the origin is already inside.
    pub fn intersection_distance(&self, aabb: &Aabb<F>) -> Option<F> {
        let mut near = F::zero();
        let mut far = F::infinity();

        for axis in 0..3 {
            let origin = self.origin.axis(axis);
            let direction = self.direction.axis(axis);
            let min = aabb.min.axis(axis);
            let max = aabb.max.axis(axis);

            // Only an exactly parallel axis skips the slab; tiny components
            // still divide, `recip` giving a huge or infinite inverse.
            if direction == F::zero() {
                if origin < min || origin > max {
                    return None;
                }
                continue;
            }

            let inverse = direction.recip();
            let mut t1 = (min - origin) * inverse;
            let mut t2 = (max - origin) * inverse;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            near = near.max(t1);
            far = far.min(t2);
            if near > far {
                return None;
            }
        }

        Some(near)
    }
}

/// A [`Ray`] limited to `[0, max_distance]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCast<F: Float> {
    pub ray: Ray<F>,
    pub max_distance: F,
}

impl<F: Float> RayCast<F> {
    pub fn new(ray: Ray<F>, max_distance: F) -> Self {
        RayCast { ray, max_distance }
    }

    /// Entry distance into `aabb` if it lies within the cast range.
    pub fn aabb_intersection_at(&self, aabb: &Aabb<F>) -> Option<F> {
        self.ray
            .intersection_distance(aabb)
            .filter(|distance| *distance <= self.max_distance)
    }
}

impl<F: Float> BoundingQuery<F> for RayCast<F> {
    fn overlaps(&self, aabb: &Aabb<F>) -> bool {
        self.aabb_intersection_at(aabb).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere<F: Float> {
    pub center: TVec3<F>,
    pub radius: F,
}

impl<F: Float> Sphere<F> {
    pub fn new(center: TVec3<F>, radius: F) -> Self {
        Sphere {
            center,
            radius: radius.abs(),
        }
    }

    /// Box tightly enclosing the sphere.
    pub fn aabb(&self) -> Aabb<F> {
        Aabb::new(self.center, TVec3::splat(self.radius))
    }
}

impl<F: Float> BoundingQuery<F> for Sphere<F> {
    fn overlaps(&self, aabb: &Aabb<F>) -> bool {
        let closest = self.center.clamp(aabb.min, aabb.max);
        let offset = closest - self.center;
        offset.dot(offset) <= self.radius * self.radius
    }
}

/// Rotation quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat<F: Float> {
    pub x: F,
    pub y: F,
    pub z: F,
    pub w: F,
}

impl<F: Float> Default for Quat<F> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<F: Float> Quat<F> {
    pub fn identity() -> Self {
        Quat {
            x: F::zero(),
            y: F::zero(),
            z: F::zero(),
            w: F::one(),
        }
    }

    pub fn from_axis_angle(axis: TVec3<F>, angle: F) -> Self {
        let half = angle / (F::one() + F::one());
        let (sin, cos) = half.sin_cos();
        let axis = axis.normalize() * sin;
        Quat {
            x: axis.x,
            y: axis.y,
            z: axis.z,
            w: cos,
        }
    }

    pub fn normalize(&self) -> Self {
        let length =
            (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if length > F::zero() {
            let inverse = length.recip();
            Quat {
                x: self.x * inverse,
                y: self.y * inverse,
                z: self.z * inverse,
                w: self.w * inverse,
            }
        } else {
            Self::identity()
        }
    }

    /// Rotates `v` by this (unit) quaternion.
    pub fn rotate(&self, v: TVec3<F>) -> TVec3<F> {
        let two = F::one() + F::one();
        let q = TVec3::new(self.x, self.y, self.z);
        let t = q.cross(v) * two;
        v + t * self.w + q.cross(t)
    }
}

/// Oriented bounding box: a box of half `extents` rotated by `rotation`
/// around `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb<F: Float> {
    pub center: TVec3<F>,
    pub extents: TVec3<F>,
    pub rotation: Quat<F>,
}

impl<F: Float> Obb<F> {
    pub fn new(center: TVec3<F>, extents: TVec3<F>, rotation: Quat<F>) -> Self {
        Obb {
            center,
            extents: extents.abs(),
            rotation: rotation.normalize(),
        }
    }

    /// Local x, y and z axes in world space.
    pub fn axes(&self) -> [TVec3<F>; 3] {
        [
            self.rotation.rotate(TVec3::new(F::one(), F::zero(), F::zero())),
            self.rotation.rotate(TVec3::new(F::zero(), F::one(), F::zero())),
            self.rotation.rotate(TVec3::new(F::zero(), F::zero(), F::one())),
        ]
    }

    /// Box tightly enclosing the rotated box.
    pub fn aabb(&self) -> Aabb<F> {
        let [u, v, w] = self.axes();
        let extents = u.abs() * self.extents.x + v.abs() * self.extents.y + w.abs() * self.extents.z;
        Aabb::new(self.center, extents)
    }
}

impl<F: Float> From<Aabb<F>> for Obb<F> {
    fn from(aabb: Aabb<F>) -> Self {
        Obb::new(aabb.center(), aabb.extents(), Quat::identity())
    }
}

/// Separating axis test over the 3 box axes, the 3 obb axes and their 9 cross products.
impl<F: Float> BoundingQuery<F> for Obb<F> {
    fn overlaps(&self, aabb: &Aabb<F>) -> bool {
        let a = aabb.extents().to_array();
        let b = self.extents.to_array();
        let t = (self.center - aabb.center()).to_array();
        let axes = self.axes();

        // r[i][j]: world axis i projected on obb axis j.
        let mut r = [[F::zero(); 3]; 3];
        let mut abs_r = [[F::zero(); 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                r[i][j] = axes[j].axis(i);
                abs_r[i][j] = r[i][j].abs() + F::epsilon();
            }
        }

        for i in 0..3 {
            let rb = b[0] * abs_r[i][0] + b[1] * abs_r[i][1] + b[2] * abs_r[i][2];
            if t[i].abs() > a[i] + rb {
                return false;
            }
        }

        for j in 0..3 {
            let ra = a[0] * abs_r[0][j] + a[1] * abs_r[1][j] + a[2] * abs_r[2][j];
            let projected = t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j];
            if projected.abs() > ra + b[j] {
                return false;
            }
        }

        for i in 0..3 {
            let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
            for j in 0..3 {
                let (j1, j2) = ((j + 1) % 3, (j + 2) % 3);
                let ra = a[i1] * abs_r[i2][j] + a[i2] * abs_r[i1][j];
                let rb = b[j1] * abs_r[i][j2] + b[j2] * abs_r[i][j1];
                let projected = t[i2] * r[i1][j] - t[i1] * r[i2][j];
                if projected.abs() > ra + rb {
                    return false;
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_4;

    use super::*;

    fn unit_box(center: TVec3<f32>) -> Aabb<f32> {
        Aabb::new(center, TVec3::splat(1.0))
    }

    #[test]
    fn test_point_query() {
        let aabb = unit_box(TVec3::zero());
        assert!(TVec3::new(1.0, 0.0, -1.0).overlaps(&aabb));
        assert!(!TVec3::new(1.1, 0.0, 0.0).overlaps(&aabb));
    }

    #[test]
    fn test_ray_intersection() {
        let aabb = unit_box(TVec3::new(5.0, 0.0, 0.0));

        let ray = Ray::new(TVec3::zero(), TVec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.direction, TVec3::new(1.0, 0.0, 0.0));
        assert_eq!(ray.intersection_distance(&aabb), Some(4.0));
        assert_eq!(ray.at(4.0), TVec3::new(4.0, 0.0, 0.0));

        // Pointing away
        let ray = Ray::new(TVec3::zero(), TVec3::new(-1.0, 0.0, 0.0));
        assert_eq!(ray.intersection_distance(&aabb), None);

        // Parallel to a slab, outside of it
        let ray = Ray::new(TVec3::new(0.0, 2.0, 0.0), TVec3::new(1.0, 0.0, 0.0));
        assert_eq!(ray.intersection_distance(&aabb), None);

        // Starting inside
        let ray = Ray::new(TVec3::new(5.0, 0.0, 0.0), TVec3::new(0.0, 1.0, 0.0));
        assert_eq!(ray.intersection_distance(&aabb), Some(0.0));
    }

    #[test]
    fn test_nearly_parallel_ray() {
        let aabb: Aabb<f32> = Aabb::from_min_max(TVec3::new(-1.0, -1000.0, -1.0), TVec3::new(0.0, 1000.0, 1.0));

        // Starts just outside the x slab and drifts into it after 10 units.
        let ray = Ray::new(TVec3::new(1e-6, 0.0, 0.0), TVec3::new(-1e-7, 1.0, 0.0));
        assert!(aabb.contains(ray.at(20.0)));

        let distance = ray.intersection_distance(&aabb).unwrap();
        assert!((distance - 10.0).abs() < 1e-2);
        assert!(RayCast::new(ray, 100.0).overlaps(&aabb));
        assert!(!RayCast::new(ray, 5.0).overlaps(&aabb));

        // Drifting away never enters.
        let ray = Ray::new(TVec3::new(1e-6, 0.0, 0.0), TVec3::new(1e-7, 1.0, 0.0));
        assert_eq!(ray.intersection_distance(&aabb), None);

        // Exactly on the slab plane with a zero component.
        let ray = Ray::new(TVec3::new(0.0, 0.0, 1.0), TVec3::new(0.0, 1.0, 0.0));
        assert_eq!(ray.intersection_distance(&aabb), Some(0.0));
    }

    #[test]
    fn test_ray_cast_range() {
        let aabb = unit_box(TVec3::new(5.0, 0.0, 0.0));
        let ray = Ray::new(TVec3::zero(), TVec3::new(1.0, 0.0, 0.0));

        assert!(RayCast::new(ray, 4.0).overlaps(&aabb));
        assert!(RayCast::new(ray, 10.0).overlaps(&aabb));
        assert!(!RayCast::new(ray, 3.9).overlaps(&aabb));
    }

    #[test]
    fn test_sphere_query() {
        let aabb = unit_box(TVec3::zero());
        assert!(Sphere::new(TVec3::new(2.0, 0.0, 0.0), 1.0).overlaps(&aabb));
        // Closest corner is at distance sqrt(3) * 1.0
        assert!(!Sphere::new(TVec3::splat(2.0), 1.7).overlaps(&aabb));
        assert!(Sphere::new(TVec3::splat(2.0), 1.75).overlaps(&aabb));
        assert_eq!(
            Sphere::new(TVec3::zero(), 2.0).aabb(),
            Aabb::new(TVec3::zero(), TVec3::splat(2.0))
        );
    }

    #[test]
    fn test_quat_rotation() {
        let q = Quat::from_axis_angle(TVec3::new(0.0, 0.0, 1.0), std::f32::consts::FRAC_PI_2);
        let v = q.rotate(TVec3::new(1.0, 0.0, 0.0));
        assert!((v.x).abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
        assert!((v.z).abs() < 1e-6);

        let identity = Quat::<f32>::identity();
        assert_eq!(identity.rotate(TVec3::new(1.0, 2.0, 3.0)), TVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_obb_query() {
        let aabb = unit_box(TVec3::zero());

        let axis_aligned: Obb<f32> = unit_box(TVec3::new(1.9, 0.0, 0.0)).into();
        assert!(axis_aligned.overlaps(&aabb));

        let far: Obb<f32> = unit_box(TVec3::new(3.0, 0.0, 0.0)).into();
        assert!(!far.overlaps(&aabb));

        // A cube rotated by 45 degrees around z reaches sqrt(2) along x.
        let rotation = Quat::from_axis_angle(TVec3::new(0.0, 0.0, 1.0), FRAC_PI_4);
        let rotated = Obb::new(TVec3::new(2.3, 0.0, 0.0), TVec3::splat(1.0), rotation);
        assert!(rotated.overlaps(&aabb));
        assert!(!Obb::new(TVec3::new(2.3, 0.0, 0.0), TVec3::splat(1.0), Quat::identity())
            .overlaps(&aabb));

        // Diagonal offset, the diamond's tip stops short of the box corner.
        let rotated = Obb::new(TVec3::new(2.5, 2.5, 0.0), TVec3::splat(1.0), rotation);
        assert!(!rotated.overlaps(&aabb));
    }

    #[test]
    fn test_obb_aabb() {
        let rotation = Quat::from_axis_angle(TVec3::new(0.0, 0.0, 1.0), FRAC_PI_4);
        let obb = Obb::new(TVec3::zero(), TVec3::splat(1.0f32), rotation);
        let aabb = obb.aabb();
        let sqrt2 = std::f32::consts::SQRT_2;
        assert!((aabb.max.x - sqrt2).abs() < 1e-5);
        assert!((aabb.max.y - sqrt2).abs() < 1e-5);
        assert!((aabb.max.z - 1.0).abs() < 1e-5);
    }
}
