//! Bottom-up refitting and AVL style rotations.

use tracing::debug;

use crate::{bounding::Float, tree::Bvh, NodeId, ObjectKey};

impl<F, K> Bvh<F, K>
where
    F: Float,
    K: ObjectKey,
{
    /// Refits and balances every node from `start` up to the root.
    pub(crate) fn rebalance_from(&mut self, start: Option<NodeId>) {
        let mut current = start;
        while let Some(node) = current {
            self.refit_node(node);
            let subtree = self.balance_node(node);
            current = self.nodes[subtree].parent;
        }
    }

    /// Recomputes the bounds and height of a branch from its children.
    pub(crate) fn refit_node(&mut self, node: NodeId) {
        let branch = self.branch(node);
        let left = &self.nodes[branch.left];
        let right = &self.nodes[branch.right];

        let aabb = left.aabb.union(&right.aabb);
        let height = 1 + left.height.max(right.height);

        let n = &mut self.nodes[node];
        n.aabb = aabb;
        n.height = height;
    }

    /// Rotates `node` if its children heights differ by more than one.
    ///
    /// Returns the root of the subtree that took `node`'s place, which is
    /// `node` itself when no rotation happened.
    pub(crate) fn balance_node(&mut self, node: NodeId) -> NodeId {
        let branch = self.branch(node);
        let left_height = self.nodes[branch.left].height;
        let right_height = self.nodes[branch.right].height;

        if right_height > left_height + 1 {
            self.rotate(node, branch.right, branch.left)
        } else if left_height > right_height + 1 {
            self.rotate(node, branch.left, branch.right)
        } else {
            node
        }
    }

    /// Promotes `heavy`, the taller child of `node`, into `node`'s place.
    ///
    /// The taller grandchild stays under `heavy`, the other one moves down
    /// next to `light`. With equally tall grandchildren both choices keep
    /// the tree balanced, the one pairing `light` with less surface area wins.
    fn rotate(&mut self, node: NodeId, heavy: NodeId, light: NodeId) -> NodeId {
        let grandchildren = self.branch(heavy);
        let (first, second) = (grandchildren.left, grandchildren.right);

        let first_height = self.nodes[first].height;
        let second_height = self.nodes[second].height;

        let (keep, sink) = if first_height > second_height {
            (first, second)
        } else if second_height > first_height {
            (second, first)
        } else {
            let light_aabb = self.nodes[light].aabb;
            let with_first = light_aabb.union(&self.nodes[first].aabb).surface_area();
            let with_second = light_aabb.union(&self.nodes[second].aabb).surface_area();
            if with_second <= with_first {
                (first, second)
            } else {
                (second, first)
            }
        };

        debug!(%node, %heavy, %keep, %sink, "rotating");

        let parent = self.nodes[node].parent;
        self.nodes[heavy].parent = parent;
        match parent {
            Some(parent) => self.replace_child(parent, node, heavy),
            None => self.root = Some(heavy),
        }

        self.replace_child(heavy, sink, node);
        self.nodes[node].parent = Some(heavy);

        self.replace_child(node, heavy, sink);
        self.nodes[sink].parent = Some(node);

        self.refit_node(node);
        self.refit_node(heavy);

        heavy
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        bounding::{Aabb, TVec3},
        node::{Branch, Node},
        tree::Bvh,
        NodeId,
    };

    fn cube(x: f32) -> Aabb<f32> {
        Aabb::new(TVec3::new(x, 0.0, 0.0), TVec3::splat(0.5))
    }

    /// Builds a right leaning chain `root(a, branch(b, branch(c, d)))` by hand.
    fn chain() -> Bvh<f32, u32> {
        let mut tree = Bvh::new();
        let a = tree.nodes.insert(Node::leaf(cube(0.0), 0));
        let b = tree.nodes.insert(Node::leaf(cube(1.0), 1));
        let c = tree.nodes.insert(Node::leaf(cube(2.0), 2));
        let d = tree.nodes.insert(Node::leaf(cube(3.0), 3));

        let cd = tree.nodes.insert(Node::branch(cube(2.0).union(&cube(3.0)), Branch::new(c, d), 1));
        let bcd = tree.nodes.insert(Node::branch(cube(1.0).union(&cube(3.0)), Branch::new(b, cd), 2));
        let root = tree.nodes.insert(Node::branch(cube(0.0).union(&cube(3.0)), Branch::new(a, bcd), 3));

        tree.nodes[c].parent = Some(cd);
        tree.nodes[d].parent = Some(cd);
        tree.nodes[b].parent = Some(bcd);
        tree.nodes[cd].parent = Some(bcd);
        tree.nodes[a].parent = Some(root);
        tree.nodes[bcd].parent = Some(root);

        tree.root = Some(root);
        for (i, id) in [a, b, c, d].into_iter().enumerate() {
            tree.map.insert(i as u32, id);
        }
        tree
    }

    #[test]
    fn test_rotation_on_right_heavy_node() {
        let mut tree = chain();
        let root = tree.root.unwrap();
        let bcd = NodeId(5);
        let cd = NodeId(4);

        let new_root = tree.balance_node(root);
        assert_eq!(new_root, bcd);
        assert_eq!(tree.root, Some(bcd));
        assert_eq!(tree.nodes[bcd].parent, None);

        // The taller grandchild stays, the leaf moves next to `a`.
        assert_eq!(tree.branch(bcd).children(), [root, cd]);
        assert_eq!(tree.branch(root).children(), [NodeId(0), NodeId(1)]);
        assert_eq!(tree.nodes[NodeId(1)].parent, Some(root));
        assert_eq!(tree.nodes[root].parent, Some(bcd));

        assert_eq!(tree.nodes[root].height, 1);
        assert_eq!(tree.nodes[bcd].height, 2);
        assert_eq!(tree.nodes[root].aabb, cube(0.0).union(&cube(1.0)));
        assert_eq!(tree.nodes[bcd].aabb, cube(0.0).union(&cube(3.0)));

        tree.validate().unwrap();
    }

    #[test]
    fn test_balanced_node_is_untouched() {
        let mut tree = chain();
        let cd = NodeId(4);
        assert_eq!(tree.balance_node(cd), cd);
        assert_eq!(tree.branch(cd).children(), [NodeId(2), NodeId(3)]);
    }

    #[test]
    fn test_sorted_inserts_stay_shallow() {
        let mut tree = Bvh::new();
        for i in 0..1024u32 {
            tree.insert(i, cube(i as f32), 0.0).unwrap();
            tree.validate().unwrap();
        }
        // A balanced tree of height 15 needs at least 1597 leaves.
        assert!(tree.height() <= 14, "height: {}", tree.height());
    }
}
