//! Bounding primitives.
//!
//! [`TVec3`], [`BVec3`], [`Aabb`]

use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use num::Float as NumFloat;

/// Scalar type of every coordinate stored in a [`Bvh`](crate::tree::Bvh).
///
/// Implemented for `f32` and `f64`.
pub trait Float: NumFloat + Copy + Display + Debug + Default + 'static {
    /// Converts an object count into a scalar, used by the surface area heuristic.
    fn from_count(count: usize) -> Self;
}

impl Float for f32 {
    #[inline]
    fn from_count(count: usize) -> Self {
        count as f32
    }
}

impl Float for f64 {
    #[inline]
    fn from_count(count: usize) -> Self {
        count as f64
    }
}

/// Tree Vec3
///
/// Inner type should be any [`Float`]: `f32` or `f64`.
#[derive(Default, Debug, PartialEq, PartialOrd, Clone, Copy)]
pub struct TVec3<F: Float> {
    pub x: F,
    pub y: F,
    pub z: F,
}

impl<F: Float> Add for TVec3<F> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        TVec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl<F: Float> Sub for TVec3<F> {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        TVec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl<F: Float> Mul<F> for TVec3<F> {
    type Output = Self;

    fn mul(self, scale: F) -> Self {
        TVec3 {
            x: self.x * scale,
            y: self.y * scale,
            z: self.z * scale,
        }
    }
}

impl<F: Float> Neg for TVec3<F> {
    type Output = Self;

    fn neg(self) -> Self {
        TVec3 {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl<F: Float> AddAssign for TVec3<F> {
    fn add_assign(&mut self, other: Self) {
        self.x = self.x + other.x;
        self.y = self.y + other.y;
        self.z = self.z + other.z;
    }
}

impl<F: Float> SubAssign for TVec3<F> {
    fn sub_assign(&mut self, other: Self) {
        self.x = self.x - other.x;
        self.y = self.y - other.y;
        self.z = self.z - other.z;
    }
}

impl<F: Float> Display for TVec3<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vec3: x: {}, y: {}, z: {}", self.x, self.y, self.z)
    }
}

impl<F: Float> From<[F; 3]> for TVec3<F> {
    fn from([x, y, z]: [F; 3]) -> Self {
        TVec3 { x, y, z }
    }
}

impl<F: Float> TVec3<F> {
    pub fn new(x: F, y: F, z: F) -> Self {
        TVec3 { x, y, z }
    }

    pub fn splat(value: F) -> Self {
        TVec3 {
            x: value,
            y: value,
            z: value,
        }
    }

    pub fn zero() -> Self {
        Self::splat(F::zero())
    }

    /// Component along `axis` (`0` = x, `1` = y, `2` = z).
    #[inline]
    pub fn axis(&self, axis: usize) -> F {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    #[inline]
    pub fn to_array(&self) -> [F; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn dot(&self, other: Self) -> F {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(&self, other: Self) -> Self {
        TVec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    #[inline]
    pub fn length(&self) -> F {
        self.dot(*self).sqrt()
    }

    /// Returns a unit length copy. Zero vectors stay zero.
    pub fn normalize(&self) -> Self {
        let length = self.length();
        if length > F::zero() {
            *self * length.recip()
        } else {
            *self
        }
    }

    pub fn min(&self, other: Self) -> Self {
        TVec3::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    pub fn max(&self, other: Self) -> Self {
        TVec3::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        )
    }

    pub fn abs(&self) -> Self {
        TVec3::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    pub fn clamp(&self, min: Self, max: Self) -> Self {
        self.max(min).min(max)
    }

    pub fn le(&self, other: Self) -> BVec3 {
        BVec3::new(self.x <= other.x, self.y <= other.y, self.z <= other.z)
    }

    pub fn ge(&self, other: Self) -> BVec3 {
        BVec3::new(self.x >= other.x, self.y >= other.y, self.z >= other.z)
    }
}

/// Boolean Vec3 mask.
#[derive(Default, Clone, Copy, PartialEq, Debug)]
pub struct BVec3 {
    x: bool,
    y: bool,
    z: bool,
}

impl BVec3 {
    fn new(x: bool, y: bool, z: bool) -> Self {
        BVec3 { x, y, z }
    }

    pub fn all(&self) -> bool {
        self.x && self.y && self.z
    }
}

/// Axis Aligned Bounding Box
///
/// Constructed from a center and per-axis half extents, stored as
/// `min`/`max` corners. All comparisons are inclusive, so boxes that
/// only touch on a face overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb<F: Float> {
    pub min: TVec3<F>,
    pub max: TVec3<F>,
}

impl<F: Float> Default for Aabb<F> {
    /// Unit extents around the origin.
    fn default() -> Self {
        Self::new(TVec3::zero(), TVec3::splat(F::one()))
    }
}

impl<F: Float> Display for Aabb<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Aabb(min: {}, max: {})", self.min, self.max)
    }
}

impl<F: Float> Aabb<F> {
    /// Creates a new [`Aabb`] from its center and half extents.
    pub fn new(center: TVec3<F>, extents: TVec3<F>) -> Self {
        let extents = extents.abs();
        Aabb {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Creates a new [`Aabb`] object from a min and max
    pub fn from_min_max(min: TVec3<F>, max: TVec3<F>) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing every point. `None` for an empty input.
    pub fn from_points(points: &[TVec3<F>]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        Some(rest.iter().fold(
            Aabb::from_min_max(*first, *first),
            |aabb, point| Aabb::from_min_max(aabb.min.min(*point), aabb.max.max(*point)),
        ))
    }

    pub fn center(&self) -> TVec3<F> {
        let half = (F::one() + F::one()).recip();
        (self.min + self.max) * half
    }

    pub fn extents(&self) -> TVec3<F> {
        let half = (F::one() + F::one()).recip();
        (self.max - self.min) * half
    }

    pub fn size(&self) -> TVec3<F> {
        self.max - self.min
    }

    /// Surface area, the cost metric of both insertion and bulk building.
    pub fn surface_area(&self) -> F {
        let size = self.size();
        let two = F::one() + F::one();
        two * (size.x * size.y + size.y * size.z + size.z * size.x)
    }

    pub fn volume(&self) -> F {
        let size = self.size();
        size.x * size.y * size.z
    }

    /// Returns the axis with the greatest extent.
    pub fn longest_axis(&self) -> usize {
        let size = self.size();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }

    /// Smallest box enclosing both `self` and `other`.
    #[inline]
    pub fn union(&self, other: &Aabb<F>) -> Aabb<F> {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grows the box by `margin` on every side.
    #[inline]
    pub fn expanded(&self, margin: F) -> Aabb<F> {
        let margin = TVec3::splat(margin);
        Aabb {
            min: self.min - margin,
            max: self.max + margin,
        }
    }

    /// Checks if the aabb contains a [`position`](TVec3).
    pub fn contains(&self, position: TVec3<F>) -> bool {
        self.min.le(position).all() && self.max.ge(position).all()
    }

    /// Checks if `other` lies entirely inside this box.
    pub fn contains_aabb(&self, other: &Aabb<F>) -> bool {
        self.min.le(other.min).all() && self.max.ge(other.max).all()
    }

    /// Checks if this volume overlaps with another [`Aabb`].
    pub fn overlaps(&self, other: &Aabb<F>) -> bool {
        self.min.le(other.max).all() && self.max.ge(other.min).all()
    }
}
