//! Structural checks of a [`Bvh`], for tests and debug assertions.
//!
//! Available under `cfg(test)` or with the `validate` feature.

use smallvec::SmallVec;
use thiserror::Error;

use crate::{bounding::Float, node::NodeType, tree::Bvh, NodeId, ObjectKey};

/// A broken tree invariant, naming the offending node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Root {0} has a parent")]
    RootHasParent(NodeId),

    #[error("Tree without a root still holds {nodes} nodes and {objects} objects")]
    OrphanedContent { nodes: usize, objects: usize },

    #[error("{0} is released but still linked")]
    Released(NodeId),

    #[error("{child} does not point back to its parent {parent}")]
    BrokenParentLink { parent: NodeId, child: NodeId },

    #[error("Leaf {0} has a non zero height")]
    LeafHeight(NodeId),

    #[error("Leaf {leaf} holds {object}, which maps elsewhere")]
    UnmappedObject { leaf: NodeId, object: String },

    #[error("{0} height is not one above its tallest child")]
    WrongHeight(NodeId),

    #[error("{0} children heights differ by more than one")]
    Unbalanced(NodeId),

    #[error("{0} bounds do not contain its children")]
    NotEnclosing(NodeId),

    #[error("{reachable} nodes reachable from the root, {allocated} allocated")]
    Unreachable { reachable: usize, allocated: usize },

    #[error("{leaves} leaves in the tree, {objects} objects mapped")]
    LeafCount { leaves: usize, objects: usize },
}

impl<F, K> Bvh<F, K>
where
    F: Float,
    K: ObjectKey,
{
    /// Walks the whole tree checking its invariants.
    ///
    /// Linear in the number of nodes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let Some(root) = self.root else {
            if self.nodes.is_empty() && self.map.is_empty() {
                return Ok(());
            }
            return Err(ValidationError::OrphanedContent {
                nodes: self.nodes.len(),
                objects: self.map.len(),
            });
        };

        if self.nodes.is_garbage(root) {
            return Err(ValidationError::Released(root));
        }
        if self.nodes[root].parent.is_some() {
            return Err(ValidationError::RootHasParent(root));
        }

        let mut reachable = 0;
        let mut leaves = 0;

        let mut stack: SmallVec<[NodeId; 64]> = SmallVec::new();
        stack.push(root);

        while let Some(node) = stack.pop() {
            reachable += 1;
            let n = &self.nodes[node];

            match n.ntype {
                NodeType::Leaf(object) => {
                    leaves += 1;
                    if n.height != 0 {
                        return Err(ValidationError::LeafHeight(node));
                    }
                    if self.map.get(&object) != Some(&node) {
                        return Err(ValidationError::UnmappedObject {
                            leaf: node,
                            object: format!("{object:?}"),
                        });
                    }
                }

                NodeType::Branch(branch) => {
                    for child in branch.children() {
                        if self.nodes.is_garbage(child) {
                            return Err(ValidationError::Released(child));
                        }
                        if self.nodes[child].parent != Some(node) {
                            return Err(ValidationError::BrokenParentLink {
                                parent: node,
                                child,
                            });
                        }
                    }

                    let left = &self.nodes[branch.left];
                    let right = &self.nodes[branch.right];

                    if n.height != 1 + left.height.max(right.height) {
                        return Err(ValidationError::WrongHeight(node));
                    }
                    if left.height.abs_diff(right.height) > 1 {
                        return Err(ValidationError::Unbalanced(node));
                    }
                    if !n.aabb.contains_aabb(&left.aabb) || !n.aabb.contains_aabb(&right.aabb) {
                        return Err(ValidationError::NotEnclosing(node));
                    }

                    stack.push(branch.right);
                    stack.push(branch.left);
                }
            }
        }

        if reachable != self.nodes.len() {
            return Err(ValidationError::Unreachable {
                reachable,
                allocated: self.nodes.len(),
            });
        }
        if leaves != self.map.len() {
            return Err(ValidationError::LeafCount {
                leaves,
                objects: self.map.len(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bounding::{Aabb, TVec3},
        node::Node,
    };

    fn tree() -> Bvh<f32, u32> {
        let mut tree = Bvh::new();
        for i in 0..8u32 {
            let center = TVec3::new(i as f32 * 3.0, 0.0, 0.0);
            tree.insert(i, Aabb::new(center, TVec3::splat(1.0)), 0.0)
                .unwrap();
        }
        tree
    }

    fn some_branch(tree: &Bvh<f32, u32>) -> NodeId {
        tree.root().unwrap()
    }

    #[test]
    fn test_valid_trees() {
        let empty: Bvh<f32, u32> = Bvh::new();
        assert_eq!(empty.validate(), Ok(()));
        assert_eq!(tree().validate(), Ok(()));
    }

    #[test]
    fn test_orphaned_content() {
        let mut tree = tree();
        tree.root = None;
        assert_eq!(
            tree.validate(),
            Err(ValidationError::OrphanedContent {
                nodes: 15,
                objects: 8
            })
        );
    }

    #[test]
    fn test_root_with_parent() {
        let mut tree = tree();
        let root = some_branch(&tree);
        tree.nodes[root].parent = Some(NodeId(0));
        assert_eq!(tree.validate(), Err(ValidationError::RootHasParent(root)));
    }

    #[test]
    fn test_broken_parent_link() {
        let mut tree = tree();
        let root = some_branch(&tree);
        let left = tree.branch(root).left;
        tree.nodes[left].parent = None;
        assert_eq!(
            tree.validate(),
            Err(ValidationError::BrokenParentLink {
                parent: root,
                child: left
            })
        );
    }

    #[test]
    fn test_heights() {
        let mut tree = tree();
        let root = some_branch(&tree);
        tree.nodes[root].height += 1;
        assert_eq!(tree.validate(), Err(ValidationError::WrongHeight(root)));

        // Parents would notice a taller leaf first
        let mut single = Bvh::new();
        single.insert(3u32, Aabb::default(), 0.0).unwrap();
        let leaf = single.map[&3];
        single.nodes[leaf].height = 1;
        assert_eq!(single.validate(), Err(ValidationError::LeafHeight(leaf)));
    }

    #[test]
    fn test_unbalanced() {
        let mut tree: Bvh<f32, u32> = Bvh::new();
        let a = tree.nodes.insert(Node::leaf(Aabb::default(), 0u32));
        let b = tree.nodes.insert(Node::leaf(Aabb::default(), 1));
        let c = tree.nodes.insert(Node::leaf(Aabb::default(), 2));
        let bc = tree.nodes.insert(Node::branch(Aabb::default(), crate::node::Branch::new(b, c), 1));
        let abc = tree.nodes.insert(Node::branch(Aabb::default(), crate::node::Branch::new(a, bc), 2));
        // Pretend `bc` is deeper than it is
        tree.nodes[bc].height = 2;
        tree.nodes[abc].height = 3;
        tree.nodes[a].parent = Some(abc);
        tree.nodes[bc].parent = Some(abc);
        tree.nodes[b].parent = Some(bc);
        tree.nodes[c].parent = Some(bc);
        tree.root = Some(abc);
        for (object, leaf) in [a, b, c].into_iter().enumerate() {
            tree.map.insert(object as u32, leaf);
        }

        // `bc` is checked only after its parent
        assert_eq!(tree.validate(), Err(ValidationError::Unbalanced(abc)));
    }

    #[test]
    fn test_not_enclosing() {
        let mut tree = tree();
        let leaf = tree.map[&5];
        let parent = tree.nodes[leaf].parent.unwrap();
        tree.nodes[leaf].aabb = Aabb::new(TVec3::splat(100.0), TVec3::splat(1.0));
        assert_eq!(tree.validate(), Err(ValidationError::NotEnclosing(parent)));
    }

    #[test]
    fn test_mapping() {
        let mut tree = tree();
        let leaf = tree.map[&2];
        tree.map.insert(2, NodeId(999));
        assert_eq!(
            tree.validate(),
            Err(ValidationError::UnmappedObject {
                leaf,
                object: "2".into()
            })
        );

        let mut tree = self::tree();
        tree.map.insert(50, NodeId(0));
        assert_eq!(
            tree.validate(),
            Err(ValidationError::LeafCount {
                leaves: 8,
                objects: 9
            })
        );
    }

    #[test]
    fn test_unreachable_node() {
        let mut tree = tree();
        tree.nodes.insert(Node::leaf(Aabb::default(), 100));
        assert_eq!(
            tree.validate(),
            Err(ValidationError::Unreachable {
                reachable: 15,
                allocated: 16
            })
        );
    }
}
