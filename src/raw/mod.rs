mod arena;
mod node;
mod node_id;
mod raw_avl_tree;

pub(crate) use node::Values;
pub(crate) use node_id::NodeId;
pub(crate) use raw_avl_tree::RawAvlTree;
