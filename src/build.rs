//! Bulk building of a [`Bvh`] from a known set of objects.
//!
//! Every strategy splits the object range recursively. The split count of a
//! range of `n` objects is restricted to the window keeping the subtree at
//! its minimal height `ceil(log2 n)`, so a freshly built tree is as shallow
//! as possible and already balanced. Strategies differ in where inside that
//! window they split.

use std::{cmp::Ordering, collections::HashSet};

use tracing::{debug, warn};

use crate::{
    bounding::{Aabb, Float, TVec3},
    node::{Branch, Node},
    tree::Bvh,
    NodeId, ObjectKey, TreeError,
};

/// Number of bins the [`Balanced`](BuildStrategy::Balanced) strategy
/// buckets centroids into per axis.
pub const BINS: usize = 16;

/// How [`Bvh::build`] partitions objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BuildStrategy {
    /// Median split along the axis of greatest centroid spread.
    Fast,

    /// Binned surface area heuristic.
    #[default]
    Balanced,

    /// Surface area heuristic evaluated at every split position.
    Accurate,
}

#[derive(Clone, Copy)]
struct BuildItem<F: Float, K: ObjectKey> {
    object: K,
    aabb: Aabb<F>,
    centroid: TVec3<F>,
}

impl<F, K> Bvh<F, K>
where
    F: Float,
    K: ObjectKey,
{
    /// Replaces the content of the tree with `objects`, bounded by the
    /// matching entry of `aabbs`.
    ///
    /// The boxes are stored as given, without a margin.
    /// Fails if the slices differ in length or an object repeats, leaving
    /// the tree untouched.
    ///
    /// ```rust
    /// use dynbvh::prelude::*;
    ///
    /// let ids = [1u32, 2, 3];
    /// let aabbs = [
    ///     Aabb::new(TVec3::splat(0.0f32), TVec3::splat(1.0)),
    ///     Aabb::new(TVec3::splat(4.0), TVec3::splat(1.0)),
    ///     Aabb::new(TVec3::splat(8.0), TVec3::splat(1.0)),
    /// ];
    ///
    /// let mut tree = Bvh::new();
    /// tree.build(&ids, &aabbs, BuildStrategy::Fast).unwrap();
    /// assert_eq!(tree.len(), 3);
    /// assert_eq!(tree.height(), 2);
    /// ```
    pub fn build(
        &mut self,
        objects: &[K],
        aabbs: &[Aabb<F>],
        strategy: BuildStrategy,
    ) -> Result<(), TreeError> {
        if objects.len() != aabbs.len() {
            warn!(
                objects = objects.len(),
                aabbs = aabbs.len(),
                "bulk build input lengths differ"
            );
            return Err(TreeError::BuildMismatch(format!(
                "{} objects, {} aabbs",
                objects.len(),
                aabbs.len()
            )));
        }

        let mut seen = HashSet::with_capacity(objects.len());
        if let Some(object) = objects.iter().find(|object| !seen.insert(**object)) {
            warn!(?object, "bulk build input repeats an object");
            return Err(TreeError::AlreadyOccupied(format!("{object:?}")));
        }

        self.clear();
        if objects.is_empty() {
            debug!(?strategy, "built an empty tree");
            return Ok(());
        }

        let mut items: Vec<BuildItem<F, K>> = objects
            .iter()
            .zip(aabbs)
            .map(|(&object, &aabb)| BuildItem {
                object,
                aabb,
                centroid: aabb.center(),
            })
            .collect();

        let root = self.build_range(&mut items, strategy);
        self.root = Some(root);

        debug!(
            objects = objects.len(),
            height = self.height(),
            ?strategy,
            "built"
        );
        Ok(())
    }

    /// Builds the subtree over `items` and returns its root.
    fn build_range(&mut self, items: &mut [BuildItem<F, K>], strategy: BuildStrategy) -> NodeId {
        if let [item] = items {
            let leaf = self.nodes.insert(Node::leaf(item.aabb, item.object));
            self.map.insert(item.object, leaf);
            return leaf;
        }

        let count = match strategy {
            BuildStrategy::Fast => split_median(items),
            BuildStrategy::Balanced => split_binned(items),
            BuildStrategy::Accurate => split_sweep(items),
        };

        let (left_items, right_items) = items.split_at_mut(count);
        let left = self.build_range(left_items, strategy);
        let right = self.build_range(right_items, strategy);

        let left_node = &self.nodes[left];
        let right_node = &self.nodes[right];
        let aabb = left_node.aabb.union(&right_node.aabb);
        let height = 1 + left_node.height.max(right_node.height);

        let node = self
            .nodes
            .insert(Node::branch(aabb, Branch::new(left, right), height));
        self.nodes[left].parent = Some(node);
        self.nodes[right].parent = Some(node);
        node
    }
}

/// Height of the shallowest binary tree over `count` leaves.
pub(crate) fn min_height(count: usize) -> u32 {
    usize::BITS - count.saturating_sub(1).leading_zeros()
}

/// Inclusive range of left side counts that keep a range of `count >= 2`
/// objects at its minimal height.
///
/// Neither side may need more than `min_height(count) - 1` levels, and
/// neither may be shallower than `min_height(count) - 2`.
pub(crate) fn split_window(count: usize) -> (usize, usize) {
    debug_assert!(count >= 2, "Splitting a range of {count} objects");
    let height = min_height(count);
    let half = 1usize << (height - 1);
    let min_side = if height >= 3 {
        (1usize << (height - 3)) + 1
    } else {
        1
    };

    let lo = min_side.max(count - half);
    let hi = half.min(count - min_side);
    (lo, hi)
}

fn compare_on<F: Float>(axis: usize) -> impl Fn(&TVec3<F>, &TVec3<F>) -> Ordering {
    move |a, b| {
        a.axis(axis)
            .partial_cmp(&b.axis(axis))
            .unwrap_or(Ordering::Equal)
    }
}

fn centroid_bounds<F: Float, K: ObjectKey>(items: &[BuildItem<F, K>]) -> Aabb<F> {
    let first = items[0].centroid;
    items.iter().fold(Aabb::from_min_max(first, first), |bounds, item| {
        Aabb::from_min_max(bounds.min.min(item.centroid), bounds.max.max(item.centroid))
    })
}

/// Moves the `count` items with the smallest centroids on `axis` to the front.
fn partition_on<F: Float, K: ObjectKey>(items: &mut [BuildItem<F, K>], axis: usize, count: usize) {
    let compare = compare_on(axis);
    items.select_nth_unstable_by(count, |a, b| compare(&a.centroid, &b.centroid));
}

fn split_median<F: Float, K: ObjectKey>(items: &mut [BuildItem<F, K>]) -> usize {
    let (lo, hi) = split_window(items.len());
    let count = (items.len() / 2).clamp(lo, hi);
    let axis = centroid_bounds(items).longest_axis();
    partition_on(items, axis, count);
    count
}

/// Surface area heuristic cost of a split.
fn split_cost<F: Float>(left_area: F, left_count: usize, right_area: F, right_count: usize) -> F {
    left_area * F::from_count(left_count) + right_area * F::from_count(right_count)
}

fn union_option<F: Float>(aabb: Option<Aabb<F>>, other: &Aabb<F>) -> Option<Aabb<F>> {
    Some(aabb.map_or(*other, |aabb| aabb.union(other)))
}

fn split_binned<F: Float, K: ObjectKey>(items: &mut [BuildItem<F, K>]) -> usize {
    let (lo, hi) = split_window(items.len());
    let bounds = centroid_bounds(items);

    // (cost, axis, left count)
    let mut best: Option<(F, usize, usize)> = None;

    for axis in 0..3 {
        let min = bounds.min.axis(axis);
        let extent = bounds.max.axis(axis) - min;
        if extent <= F::zero() {
            continue;
        }
        let scale = F::from_count(BINS) / extent;

        let mut counts = [0usize; BINS];
        let mut boxes: [Option<Aabb<F>>; BINS] = [None; BINS];
        for item in items.iter() {
            let bin = ((item.centroid.axis(axis) - min) * scale)
                .to_usize()
                .unwrap_or(0)
                .min(BINS - 1);
            counts[bin] += 1;
            boxes[bin] = union_option(boxes[bin], &item.aabb);
        }

        // Right side of every boundary, swept from the last bin.
        let mut right_areas = [F::zero(); BINS];
        let mut right_box = None;
        for bin in (1..BINS).rev() {
            if let Some(aabb) = boxes[bin] {
                right_box = union_option(right_box, &aabb);
            }
            right_areas[bin] = right_box.map_or(F::zero(), |aabb: Aabb<F>| aabb.surface_area());
        }

        let mut left_box = None;
        let mut left_count = 0;
        for bin in 0..BINS - 1 {
            if let Some(aabb) = boxes[bin] {
                left_box = union_option(left_box, &aabb);
            }
            left_count += counts[bin];
            if left_count < lo || left_count > hi {
                continue;
            }

            let left_area = left_box.map_or(F::zero(), |aabb: Aabb<F>| aabb.surface_area());
            let cost = split_cost(
                left_area,
                left_count,
                right_areas[bin + 1],
                items.len() - left_count,
            );
            if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                best = Some((cost, axis, left_count));
            }
        }
    }

    match best {
        Some((_, axis, count)) => {
            partition_on(items, axis, count);
            count
        }
        // No bin boundary falls inside the window
        None => split_median(items),
    }
}

fn split_sweep<F: Float, K: ObjectKey>(items: &mut [BuildItem<F, K>]) -> usize {
    let (lo, hi) = split_window(items.len());
    let len = items.len();

    // (cost, axis, left count)
    let mut best: Option<(F, usize, usize)> = None;
    let mut right_areas = vec![F::zero(); len];

    for axis in 0..3 {
        let compare = compare_on(axis);
        items.sort_by(|a, b| compare(&a.centroid, &b.centroid));

        // right_areas[i]: area of items[i..]
        let mut right_box = items[len - 1].aabb;
        for i in (1..len).rev() {
            right_box = right_box.union(&items[i].aabb);
            right_areas[i] = right_box.surface_area();
        }

        let mut left_box = items[0].aabb;
        for count in 1..=hi {
            left_box = left_box.union(&items[count - 1].aabb);
            if count < lo {
                continue;
            }

            let cost = split_cost(left_box.surface_area(), count, right_areas[count], len - count);
            if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                best = Some((cost, axis, count));
            }
        }
    }

    // The window is never empty
    let (_, axis, count) = best.unwrap_or((F::zero(), 2, lo));
    if axis != 2 {
        let compare = compare_on(axis);
        items.sort_by(|a, b| compare(&a.centroid, &b.centroid));
    }
    count
}
