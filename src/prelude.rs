//! Crate's core types reimports.

pub use crate::{
    bounding::{Aabb, BVec3, Float, TVec3},
    build::BuildStrategy,
    node::{Branch, Node, NodeType},
    pool::Pool,
    query::RayHit,
    shapes::{BoundingQuery, Obb, Quat, Ray, RayCast, Sphere},
    tree::Bvh,
    NodeId, ObjectKey, TreeError,
};

#[cfg(any(test, feature = "validate"))]
pub use crate::validate::ValidationError;
