use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::{
    bounding::{Aabb, Float},
    build::BuildStrategy,
    node::{Branch, Node, NodeType},
    pool::Pool,
    NodeId, ObjectKey, TreeError,
};

/// Dynamic bounding volume hierarchy.
///
/// A height balanced binary tree of [`Aabb`]s. Every leaf holds one caller
/// supplied object id and its fat bounds, every branch the union of its
/// children. Objects moving within their margin never touch the tree.
#[derive(Clone, Debug)]
pub struct Bvh<F, K>
where
    F: Float,
    K: ObjectKey,
{
    pub(crate) nodes: Pool<Node<F, K>>,
    pub(crate) map: HashMap<K, NodeId>,
    pub(crate) root: Option<NodeId>,
}

impl<F, K> Default for Bvh<F, K>
where
    F: Float,
    K: ObjectKey,
{
    fn default() -> Self {
        Bvh {
            nodes: Default::default(),
            map: Default::default(),
            root: None,
        }
    }
}

impl<F, K> Bvh<F, K>
where
    F: Float,
    K: ObjectKey,
{
    pub fn new() -> Self {
        Default::default()
    }

    /// Reserves room for `capacity` objects. A tree of `n` objects holds
    /// `2n - 1` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Bvh {
            nodes: Pool::with_capacity(capacity.saturating_mul(2)),
            map: HashMap::with_capacity(capacity),
            root: None,
        }
    }

    /// Bulk loads a tree from `objects` and their `aabbs`.
    ///
    /// See [`Bvh::build`].
    pub fn from_objects(
        objects: &[K],
        aabbs: &[Aabb<F>],
        strategy: BuildStrategy,
    ) -> Result<Self, TreeError> {
        let mut tree = Self::with_capacity(objects.len());
        tree.build(objects, aabbs, strategy)?;
        Ok(tree)
    }

    /// Number of objects in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[inline]
    pub fn contains(&self, object: &K) -> bool {
        self.map.contains_key(object)
    }

    /// Stored (fat) bounds of `object`.
    pub fn fat_aabb(&self, object: &K) -> Option<Aabb<F>> {
        self.map.get(object).map(|&leaf| self.nodes[leaf].aabb)
    }

    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Height of the root, `0` for a single leaf or an empty tree.
    pub fn height(&self) -> u32 {
        self.root.map_or(0, |root| self.nodes[root].height)
    }

    /// Node arena, for inspection.
    #[inline]
    pub fn nodes(&self) -> &Pool<Node<F, K>> {
        &self.nodes
    }

    /// Removes every object.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.map.clear();
        self.root = None;
    }

    /// Every object id in the tree, in no particular order.
    pub fn object_ids(&self) -> Vec<K> {
        self.map.keys().copied().collect()
    }

    /// Inserts `object` with `aabb` grown by `margin` on every side.
    ///
    /// A negative margin counts as zero.
    /// Fails if `object` is already in the tree, leaving the tree untouched.
    pub fn insert(&mut self, object: K, aabb: Aabb<F>, margin: F) -> Result<(), TreeError> {
        if self.map.contains_key(&object) {
            warn!(?object, "insert of an object already in the tree");
            return Err(TreeError::AlreadyOccupied(format!("{object:?}")));
        }

        let fat = aabb.expanded(margin.max(F::zero()));
        let leaf = self.nodes.insert(Node::leaf(fat, object));
        self.map.insert(object, leaf);
        self.insert_leaf(leaf);

        trace!(?object, %leaf, "inserted");
        Ok(())
    }

    /// Updates the bounds of `object`.
    ///
    /// While `aabb` stays inside the stored fat bounds nothing changes and
    /// `Ok(false)` is returned. Otherwise the leaf is reinserted with new fat
    /// bounds and `Ok(true)` is returned.
    pub fn move_object(&mut self, object: K, aabb: Aabb<F>, margin: F) -> Result<bool, TreeError> {
        let Some(&leaf) = self.map.get(&object) else {
            warn!(?object, "move of an unknown object");
            return Err(TreeError::ObjectNotFound(format!("{object:?}")));
        };

        if self.nodes[leaf].aabb.contains_aabb(&aabb) {
            return Ok(false);
        }

        self.remove_leaf(leaf);
        self.nodes[leaf].aabb = aabb.expanded(margin.max(F::zero()));
        self.insert_leaf(leaf);

        trace!(?object, %leaf, "reinserted");
        Ok(true)
    }

    /// Removes `object`. Fails if it is not in the tree.
    pub fn remove(&mut self, object: K) -> Result<(), TreeError> {
        let Some(leaf) = self.map.remove(&object) else {
            warn!(?object, "remove of an unknown object");
            return Err(TreeError::ObjectNotFound(format!("{object:?}")));
        };

        self.remove_leaf(leaf);
        self.nodes.remove(leaf);

        trace!(?object, %leaf, "removed");
        Ok(())
    }

    /// Links a detached leaf into the tree next to its best sibling.
    pub(crate) fn insert_leaf(&mut self, leaf: NodeId) {
        let Some(root) = self.root else {
            self.nodes[leaf].parent = None;
            self.root = Some(leaf);
            return;
        };

        let leaf_aabb = self.nodes[leaf].aabb;
        let sibling = self.best_sibling(root, &leaf_aabb);
        let old_parent = self.nodes[sibling].parent;

        let sibling_node = &self.nodes[sibling];
        let mut branch = Node::branch(
            sibling_node.aabb.union(&leaf_aabb),
            Branch::new(sibling, leaf),
            sibling_node.height + 1,
        );
        branch.parent = old_parent;
        let new_parent = self.nodes.insert(branch);

        self.nodes[sibling].parent = Some(new_parent);
        self.nodes[leaf].parent = Some(new_parent);

        match old_parent {
            Some(parent) => self.replace_child(parent, sibling, new_parent),
            None => self.root = Some(new_parent),
        }

        self.rebalance_from(Some(new_parent));
    }

    /// Unlinks `leaf` from the tree, releasing its parent. The leaf itself
    /// stays allocated and detached.
    pub(crate) fn remove_leaf(&mut self, leaf: NodeId) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }

        let Some(parent) = self.nodes[leaf].parent else {
            unreachable!("{leaf} is neither the root nor linked to a parent")
        };
        let sibling = self.branch(parent).sibling_of(leaf);
        let grandparent = self.nodes[parent].parent;

        match grandparent {
            Some(grandparent) => {
                self.replace_child(grandparent, parent, sibling);
                self.nodes[sibling].parent = Some(grandparent);
            }
            None => {
                self.root = Some(sibling);
                self.nodes[sibling].parent = None;
            }
        }

        self.nodes.remove(parent);
        self.nodes[leaf].parent = None;

        self.rebalance_from(grandparent);
    }

    /// Branch and bound search for the leaf whose pairing with `aabb`
    /// adds the least surface area to the tree.
    ///
    /// Pairing with leaf `s` costs the area of the new parent `s ∪ aabb`
    /// plus the growth of every ancestor of `s`. Growth already paid down
    /// to a branch, plus the area of `aabb` itself, is a lower bound for
    /// every leaf below it.
    ///
    /// Always returns a leaf. The first leaf reached is taken whatever its
    /// cost, so overflowing areas still end in a leaf.
    pub(crate) fn best_sibling(&self, root: NodeId, aabb: &Aabb<F>) -> NodeId {
        let leaf_area = aabb.surface_area();

        let mut best = None;
        let mut best_cost = F::infinity();

        let mut stack: SmallVec<[(NodeId, F); 64]> = SmallVec::new();
        stack.push((root, F::zero()));

        while let Some((node, inherited)) = stack.pop() {
            let n = &self.nodes[node];
            let union_area = n.aabb.union(aabb).surface_area();

            match n.ntype {
                NodeType::Leaf(_) => {
                    let cost = union_area + inherited;
                    if best.is_none() || cost < best_cost {
                        best = Some(node);
                        best_cost = cost;
                    }
                }
                NodeType::Branch(branch) => {
                    let inherited = inherited + union_area - n.aabb.surface_area();
                    if best.is_none() || inherited + leaf_area < best_cost {
                        stack.push((branch.right, inherited));
                        stack.push((branch.left, inherited));
                    }
                }
            }
        }

        best.unwrap_or(root)
    }

    /// Children of a branch. Asking for the children of a leaf is a bug.
    #[inline]
    pub(crate) fn branch(&self, node: NodeId) -> Branch {
        match self.nodes[node].ntype {
            NodeType::Branch(branch) => branch,
            NodeType::Leaf(_) => unreachable!("{node} is a leaf"),
        }
    }

    /// Points `parent` at `new` where it pointed at `old`.
    #[inline]
    pub(crate) fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        match self.nodes[parent].ntype {
            NodeType::Branch(ref mut branch) => branch.replace(old, new),
            NodeType::Leaf(_) => unreachable!("{parent} is a leaf"),
        }
    }
}
