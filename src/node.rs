use core::fmt;

use crate::{
    bounding::{Aabb, Float},
    NodeId, ObjectKey,
};

/// A single [`Bvh`](crate::tree::Bvh) node.
///
/// Leaves hold the caller's object and its fat [`Aabb`].
/// Branches hold the union of their children's boxes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node<F: Float, K: ObjectKey> {
    pub aabb: Aabb<F>,
    pub ntype: NodeType<K>,
    /// `0` for leaves, `1 + max(left, right)` for branches.
    pub height: u32,
    pub parent: Option<NodeId>,
}

impl<F: Float, K: ObjectKey> Node<F, K> {
    pub(crate) fn leaf(aabb: Aabb<F>, object: K) -> Self {
        Node {
            aabb,
            ntype: NodeType::Leaf(object),
            height: 0,
            parent: None,
        }
    }

    pub(crate) fn branch(aabb: Aabb<F>, branch: Branch, height: u32) -> Self {
        Node {
            aabb,
            ntype: NodeType::Branch(branch),
            height,
            parent: None,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.ntype, NodeType::Leaf(_))
    }

    #[inline]
    pub fn object(&self) -> Option<K> {
        match self.ntype {
            NodeType::Leaf(object) => Some(object),
            NodeType::Branch(_) => None,
        }
    }

    #[inline]
    pub fn branch_children(&self) -> Option<Branch> {
        match self.ntype {
            NodeType::Leaf(_) => None,
            NodeType::Branch(branch) => Some(branch),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum NodeType<K: ObjectKey> {
    Leaf(K),
    Branch(Branch),
}

impl<K: ObjectKey> fmt::Display for NodeType<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Leaf(object) => write!(f, "NodeType: Leaf({object:?})"),
            NodeType::Branch(branch) => write!(f, "NodeType: Branch({:?})", branch),
        }
    }
}

/// The two children of a branch node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Branch {
    pub left: NodeId,
    pub right: NodeId,
}

impl Branch {
    pub(crate) fn new(left: NodeId, right: NodeId) -> Self {
        Branch { left, right }
    }

    #[inline]
    pub fn children(&self) -> [NodeId; 2] {
        [self.left, self.right]
    }

    /// The child that is not `child`.
    #[inline]
    pub fn sibling_of(&self, child: NodeId) -> NodeId {
        debug_assert!(
            child == self.left || child == self.right,
            "{child} is not a child of {self:?}"
        );
        if child == self.left {
            self.right
        } else {
            self.left
        }
    }

    /// Swaps `old` for `new`, keeping its side.
    pub(crate) fn replace(&mut self, old: NodeId, new: NodeId) {
        debug_assert!(
            old == self.left || old == self.right,
            "{old} is not a child of {self:?}"
        );
        if self.left == old {
            self.left = new;
        } else {
            self.right = new;
        }
    }
}
