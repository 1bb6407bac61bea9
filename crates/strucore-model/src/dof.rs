//! Degree-of-freedom numbering.
//!
//! The numbering contract is the single source of truth for all downstream
//! index math: nodes are visited in insertion order, the six DOF slots of
//! each node in the fixed order (ux, uy, uz, rx, ry, rz), and every active
//! slot receives the next consecutive global index. Masked-off slots carry
//! `None` rather than a signed sentinel.

use std::collections::HashMap;

use crate::model::Model;

/// Number of DOF slots per node.
pub const DOFS_PER_NODE: usize = 6;

/// Map from node ids to global DOF indices.
#[derive(Debug, Clone, PartialEq)]
pub struct DofMap {
    slots: HashMap<i64, [Option<usize>; DOFS_PER_NODE]>,
    order: Vec<i64>,
    total: usize,
}

impl DofMap {
    /// Build the DOF map for a model.
    pub fn build(model: &Model) -> Self {
        let mut slots = HashMap::with_capacity(model.nodes().len());
        let mut order = Vec::with_capacity(model.nodes().len());
        let mut next = 0usize;

        for node in model.nodes() {
            let mut node_slots = [None; DOFS_PER_NODE];
            for (slot, active) in node.dofs.iter().enumerate() {
                if *active {
                    node_slots[slot] = Some(next);
                    next += 1;
                }
            }
            slots.insert(node.id, node_slots);
            order.push(node.id);
        }

        Self {
            slots,
            order,
            total: next,
        }
    }

    /// Total number of active DOFs (the size N of the global system).
    pub fn total_dofs(&self) -> usize {
        self.total
    }

    /// The six DOF slots of a node, `None` where masked off.
    pub fn node_slots(&self, node: i64) -> Option<&[Option<usize>; DOFS_PER_NODE]> {
        self.slots.get(&node)
    }

    /// Global index of a single (node, slot) pair, if active.
    pub fn index(&self, node: i64, slot: usize) -> Option<usize> {
        self.slots.get(&node).and_then(|s| s[slot])
    }

    /// Node ids in numbering order.
    pub fn node_order(&self) -> &[i64] {
        &self.order
    }
}
