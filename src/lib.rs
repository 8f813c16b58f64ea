//! [![Crates.io](https://img.shields.io/crates/v/dynbvh.svg)](https://crates.io/crates/dynbvh)
//! [![Docs.rs](https://docs.rs/dynbvh/badge.svg)](https://docs.rs/dynbvh)
//!
//! Dynamic [`bounding volume hierarchy`](tree::Bvh) implementation.
//!
//! A height balanced binary tree of axis aligned boxes answering
//! "which objects are near this shape?" while objects keep moving.
//! Meant as the broad phase in front of exact collision, visibility or
//! AI tests.
//!
//! Could be used with the Bevy game engine or as a standalone tree.
//!
//! ## Available methods:
//!
//! - ### Mutation
//!
//!   - [`Insertion`](tree::Bvh::insert)
//!   - [`Moving`](tree::Bvh::move_object)
//!   - [`Removing`](tree::Bvh::remove)
//!   - [`Bulk building`](tree::Bvh::build)
//!
//! - ### Queries
//!
//!   - [`Point`](tree::Bvh::intersect_point)
//!   - [`Bounding box`](tree::Bvh::intersect_aabb)
//!   - [`Sphere`](tree::Bvh::intersect_sphere)
//!   - [`Oriented box`](tree::Bvh::intersect_obb)
//!   - [`Ray casting`](tree::Bvh::ray_cast)
//!   - [`Any shape`](tree::Bvh::intersect) implementing [`BoundingQuery`](shapes::BoundingQuery)
//!   - [`Custom closure`](tree::Bvh::intersect_with)
//!
//! To enable bevy integrations:
//!
//! ```toml
//! [dependencies]
//! dynbvh = { version = "0.1.0", features = ["bevy"] }
//! ```
//!
//! Bevy's `Aabb3d`, `BoundingSphere` and `RayCast3d` then work as queries.
//!
//! ## Optimizations:
//!
//! - Leaves store "fat" bounds grown by a per call margin. Objects moving
//!   inside their margin never touch the tree.
//! - Insertion picks its sibling with a branch and bound search on surface area.
//! - AVL style rotations keep sibling heights within one of each other.
//! - Tree structure is represented by flat, reusable [`Pool`](`pool::Pool`).
//! - Few memory allocations. [`smallvec`] and [`heapless`] structures are used.
//! - No smart pointers ([`Rc`](`std::rc::Rc`), [`RefCell`](std::cell::RefCell) e.t.c)
//!
//! Run benchmark:
//!
//! ```sh
//! cargo bench --all-features
//! ```
//!
//! ## Example
//!
//! The tree is generic over the [`Float`](bounding::Float) type of its
//! coordinates (`f32` or `f64`) and over the caller's object id, any
//! `Copy + Eq + Hash + Debug` type.
//!
//! ```rust
//! use dynbvh::prelude::*;
//!
//! fn main() -> Result<(), TreeError> {
//!     let mut tree: Bvh<f32, u32> = Bvh::new();
//!
//!     tree.insert(1, Aabb::new(TVec3::zero(), TVec3::splat(1.0)), 0.1)?;
//!     tree.insert(2, Aabb::new(TVec3::splat(10.0), TVec3::splat(1.0)), 0.1)?;
//!     assert_eq!(tree.len(), 2);
//!
//!     // Searching by position
//!     assert_eq!(tree.intersect_point(TVec3::zero()), vec![1]);
//!     assert!(tree.intersect_point(TVec3::splat(100.0)).is_empty());
//!
//!     // Aabb intersection
//!     let aabb = Aabb::new(TVec3::splat(10.0), TVec3::splat(2.0));
//!     assert_eq!(tree.intersect_aabb(&aabb), vec![2]);
//!
//!     // Sphere intersection
//!     let sphere = Sphere::new(TVec3::splat(10.0), 1.0);
//!     assert_eq!(tree.intersect_sphere(&sphere), vec![2]);
//!
//!     // Searching for the ray intersection
//!     let ray = Ray::new(TVec3::new(-10.0, 0.0, 0.0), TVec3::new(1.0, 0.0, 0.0));
//!     assert_eq!(tree.ray_cast(&ray, 100.0), vec![1]);
//!     assert_eq!(tree.ray_cast_nearest(&ray, 100.0).map(|hit| hit.object), Some(1));
//!
//!     // Small moves stay inside the fat bounds
//!     let nudged = Aabb::new(TVec3::splat(0.05), TVec3::splat(1.0));
//!     assert!(!tree.move_object(1, nudged, 0.1)?);
//!
//!     let moved = Aabb::new(TVec3::splat(5.0), TVec3::splat(1.0));
//!     assert!(tree.move_object(1, moved, 0.1)?);
//!
//!     tree.remove(2)?;
//!     assert_eq!(tree.remove(2), Err(TreeError::ObjectNotFound("2".into())));
//!
//!     // Bulk building
//!     let ids: Vec<u32> = (0..100).collect();
//!     let aabbs: Vec<_> = ids
//!         .iter()
//!         .map(|&i| Aabb::new(TVec3::new(i as f32 * 3.0, 0.0, 0.0), TVec3::splat(1.0)))
//!         .collect();
//!     let tree = Bvh::from_objects(&ids, &aabbs, BuildStrategy::Accurate)?;
//!     assert_eq!(tree.len(), 100);
//!     assert_eq!(tree.height(), 7);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Check yourself list:
//!
//! Feature and pull requests are welcomed.
//!
//! - tests
//!
//!   ```sh
//!   cargo test --all-targets --all-features --release
//!   ```
//!
//! - clippy
//!
//!   ```sh
//!   cargo clippy --all-targets --all-features
//!   ```
//!
//! - benchmark
//!
//!   ```sh
//!   cargo bench --all-features
//!   ```
//!
//! - docs
//!   ```sh
//!   cargo doc --no-deps --open --all-features
//!   ```

mod balance;
#[cfg(feature = "bevy")]
pub mod bevy_integration;
pub mod bounding;
pub mod build;
pub mod intersect_with;
pub mod node;
pub mod pool;
pub mod prelude;
pub mod query;
pub mod shapes;
pub mod tree;
#[cfg(any(test, feature = "validate"))]
pub mod validate;

use std::{
    fmt::{self, Debug},
    hash::Hash,
};

use thiserror::Error;

/// Caller supplied object identifier.
///
/// Opaque to the tree beyond equality and hashing.
pub trait ObjectKey: Copy + Eq + Hash + Debug {}

impl<T> ObjectKey for T where T: Copy + Eq + Hash + Debug {}

/// Index [`tree.nodes`](pool::Pool) with it.
///
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub u32);

impl From<NodeId> for usize {
    fn from(value: NodeId) -> Self {
        value.0 as usize
    }
}

impl From<usize> for NodeId {
    /// Running out of `u32` node ids is fatal.
    fn from(value: usize) -> Self {
        NodeId(u32::try_from(value).expect("Node arena exhausted"))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId {}", self.0)
    }
}

/// Enum of all possible errors of the tree's operations.
///
/// A failed operation leaves the tree as it was.
#[derive(Error, Debug, PartialEq)]
pub enum TreeError {
    /// Object id is already in the [`tree`](tree::Bvh).
    #[error("Object is already in the tree. {0}")]
    AlreadyOccupied(String),

    /// Object id is not found in the [`tree`](tree::Bvh).
    #[error("Object not found. {0}")]
    ObjectNotFound(String),

    /// Bulk build input is malformed.
    #[error("Bulk build input mismatch. {0}")]
    BuildMismatch(String),
}
