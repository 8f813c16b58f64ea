//! Helper functions with a custom intersection closure.

use heapless::Vec as HVec;
use tracing::trace;

use crate::{
    bounding::{Aabb, Float},
    node::NodeType,
    tree::Bvh,
    NodeId, ObjectKey,
};

impl<F, K> Bvh<F, K>
where
    F: Float,
    K: ObjectKey,
{
    /// Intersect [`Bvh`] with a custom intersection closure.
    ///
    /// Returns the [`vector`](Vec) of objects whose stored bounds satisfy
    /// `what`. Branches are entered when their bounds satisfy `what` too.
    ///
    /// ```rust
    /// use dynbvh::prelude::*;
    ///
    /// let mut tree = Bvh::new();
    /// tree.insert(1u32, Aabb::new(TVec3::splat(1.0f32), TVec3::splat(1.0)), 0.0).unwrap();
    ///
    /// assert_eq!(tree.intersect_with(|_| true), vec![1]);
    /// ```
    pub fn intersect_with<W>(&self, what: W) -> Vec<K>
    where
        W: Fn(&Aabb<F>) -> bool,
    {
        self.intersect_with_pruning(&what, &what)
    }

    /// Intersect [`Bvh`] with separate leaf and branch closures.
    ///
    /// `what` decides which leaves are reported, `descend` which branches
    /// are entered. `descend` must hold for every branch enclosing a leaf
    /// accepted by `what`, or that leaf is missed.
    pub fn intersect_with_pruning<W, D>(&self, what: W, descend: D) -> Vec<K>
    where
        W: Fn(&Aabb<F>) -> bool,
        D: Fn(&Aabb<F>) -> bool,
    {
        let mut objects = Vec::with_capacity(10);
        self.intersect_with_for_each_pruning(what, descend, |object| objects.push(object));
        objects
    }

    /// Intersect [`Bvh`] with a custom intersection closure reusing a
    /// supplied [`vector`](Vec) rather than allocating a new one.
    ///
    /// ```rust
    /// use dynbvh::prelude::*;
    ///
    /// let mut tree = Bvh::new();
    /// tree.insert(1u32, Aabb::new(TVec3::splat(1.0f32), TVec3::splat(1.0)), 0.0).unwrap();
    ///
    /// let mut objects = Vec::new();
    /// tree.extend_intersect_with(|_| true, &mut objects);
    /// assert_eq!(objects, vec![1]);
    /// ```
    pub fn extend_intersect_with<W>(&self, what: W, objects: &mut Vec<K>)
    where
        W: Fn(&Aabb<F>) -> bool,
    {
        self.intersect_with_for_each_pruning(&what, &what, |object| objects.push(object));
    }

    /// Intersect [`Bvh`] with a custom intersection closure. Each object
    /// that intersects is passed to `actor`.
    pub fn intersect_with_for_each<W, A>(&self, what: W, actor: A)
    where
        W: Fn(&Aabb<F>) -> bool,
        A: FnMut(K),
    {
        self.intersect_with_for_each_pruning(&what, &what, actor);
    }

    /// The traversal every query is built on.
    pub fn intersect_with_for_each_pruning<W, D, A>(&self, what: W, descend: D, mut actor: A)
    where
        W: Fn(&Aabb<F>) -> bool,
        D: Fn(&Aabb<F>) -> bool,
        A: FnMut(K),
    {
        let Some(root) = self.root else {
            trace!("query against an empty tree");
            return;
        };
        self.rintersect_with(root, &what, &descend, &mut actor);
    }

    fn rintersect_with<W, D, A>(&self, node: NodeId, what: &W, descend: &D, actor: &mut A)
    where
        W: Fn(&Aabb<F>) -> bool,
        D: Fn(&Aabb<F>) -> bool,
        A: FnMut(K),
    {
        // We use a heapless stack to loop through the nodes until we complete the intersect however
        // if the stack becomes full then we fall back on recursive calls.
        let mut stack = HVec::<_, 64>::new();
        stack.push(node).unwrap();
        while let Some(node) = stack.pop() {
            let n = &self.nodes[node];
            match n.ntype {
                NodeType::Leaf(object) => {
                    if what(&n.aabb) {
                        actor(object);
                    }
                }

                NodeType::Branch(branch) => {
                    if descend(&n.aabb) {
                        for child in [branch.right, branch.left] {
                            if stack.push(child).is_err() {
                                self.rintersect_with(child, what, descend, actor);
                            }
                        }
                    }
                }
            }
        }
    }
}
