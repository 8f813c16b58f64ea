//! Shape queries.
//!
//! Every query is a thin wrapper over the generic
//! [`traversal`](crate::tree::Bvh::intersect_with_for_each_pruning), with the
//! overlap test supplied by the shape's [`BoundingQuery`] implementation.
//! Results are object ids whose stored (fat) bounds overlap the shape, so
//! callers are expected to run their own exact test afterwards.

use smallvec::SmallVec;
use tracing::trace;

use crate::{
    bounding::{Aabb, Float, TVec3},
    node::NodeType,
    shapes::{BoundingQuery, Obb, Ray, RayCast, Sphere},
    tree::Bvh,
    NodeId, ObjectKey,
};

/// Nearest object hit by a ray, see [`Bvh::ray_cast_nearest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit<K: ObjectKey, F: Float> {
    pub object: K,
    /// Distance along the ray to where it enters the object's fat bounds.
    pub distance: F,
}

impl<F, K> Bvh<F, K>
where
    F: Float,
    K: ObjectKey,
{
    /// Objects whose bounds overlap `query`.
    ///
    /// ```rust
    /// use dynbvh::prelude::*;
    ///
    /// let mut tree = Bvh::new();
    /// tree.insert("crate", Aabb::new(TVec3::zero(), TVec3::splat(1.0f64)), 0.0).unwrap();
    ///
    /// let sphere = Sphere::new(TVec3::splat(1.5), 1.0);
    /// assert_eq!(tree.intersect(&sphere), vec!["crate"]);
    /// ```
    pub fn intersect<Q>(&self, query: &Q) -> Vec<K>
    where
        Q: BoundingQuery<F> + ?Sized,
    {
        self.intersect_with_pruning(|aabb| query.overlaps(aabb), |aabb| query.descend(aabb))
    }

    /// Objects whose bounds contain `point`.
    pub fn intersect_point(&self, point: TVec3<F>) -> Vec<K> {
        self.intersect(&point)
    }

    pub fn intersect_aabb(&self, aabb: &Aabb<F>) -> Vec<K> {
        self.intersect(aabb)
    }

    pub fn intersect_sphere(&self, sphere: &Sphere<F>) -> Vec<K> {
        self.intersect(sphere)
    }

    pub fn intersect_obb(&self, obb: &Obb<F>) -> Vec<K> {
        self.intersect(obb)
    }

    /// Objects whose bounds `ray` enters within `max_distance`.
    pub fn ray_cast(&self, ray: &Ray<F>, max_distance: F) -> Vec<K> {
        self.intersect(&RayCast::new(*ray, max_distance))
    }

    /// The object whose bounds `ray` enters first, within `max_distance`.
    ///
    /// Subtrees entered further away than the best hit so far are skipped.
    /// Ties go to the object found first.
    pub fn ray_cast_nearest(&self, ray: &Ray<F>, max_distance: F) -> Option<RayHit<K, F>> {
        let Some(root) = self.root else {
            trace!("ray cast against an empty tree");
            return None;
        };

        let cast = RayCast::new(*ray, max_distance);
        let mut best: Option<RayHit<K, F>> = None;

        let mut stack: SmallVec<[(NodeId, F); 64]> = SmallVec::new();
        if let Some(distance) = cast.aabb_intersection_at(&self.nodes[root].aabb) {
            stack.push((root, distance));
        }

        while let Some((node, distance)) = stack.pop() {
            if best.is_some_and(|hit| distance >= hit.distance) {
                continue;
            }

            match self.nodes[node].ntype {
                NodeType::Leaf(object) => {
                    best = Some(RayHit { object, distance });
                }
                NodeType::Branch(branch) => {
                    let mut children: SmallVec<[(NodeId, F); 2]> = branch
                        .children()
                        .into_iter()
                        .filter_map(|child| {
                            cast.aabb_intersection_at(&self.nodes[child].aabb)
                                .map(|distance| (child, distance))
                        })
                        .collect();

                    // Nearer child on top of the stack
                    if children.len() == 2 && children[0].1 < children[1].1 {
                        children.swap(0, 1);
                    }
                    stack.extend(children);
                }
            }
        }

        best
    }
}
