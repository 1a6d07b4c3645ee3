//! Branching, append-only version history.
//!
//! Nodes live in an arena keyed by id, with parent/children stored as id
//! references. Lookup, branching, and record appends are O(1) map
//! operations; `walk` reproduces depth-first order for display.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::model::{EvaluationRecord, VersionId, VersionParameters};

/// One configuration in the branching history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionNode {
    pub id: VersionId,
    /// `None` for the root.
    pub parent: Option<VersionId>,
    /// When this configuration was created.
    pub date: DateTime<Utc>,
    pub parameters: VersionParameters,
    /// Child ids in insertion order.
    #[serde(default)]
    pub children: Vec<VersionId>,
    /// Evaluation records, append-only.
    #[serde(default)]
    pub evals: Vec<EvaluationRecord>,
}

/// The version history of one function.
///
/// The tree only grows: nodes are never deleted, and a failed operation
/// leaves it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionTree {
    root: VersionId,
    nodes: BTreeMap<VersionId, VersionNode>,
}

impl VersionTree {
    /// Create a tree with a fresh root node holding `parameters`.
    pub fn new(parameters: VersionParameters) -> Self {
        let id = VersionId::generate();
        let root = VersionNode {
            id: id.clone(),
            parent: None,
            date: Utc::now(),
            parameters,
            children: Vec::new(),
            evals: Vec::new(),
        };
        let mut nodes = BTreeMap::new();
        nodes.insert(id.clone(), root);
        Self { root: id, nodes }
    }

    pub fn root(&self) -> &VersionId {
        &self.root
    }

    pub fn get(&self, id: &VersionId) -> Option<&VersionNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &VersionId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of versions in the history.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a new child of `parent` and return its id.
    pub fn branch(
        &mut self,
        parent: &VersionId,
        parameters: VersionParameters,
    ) -> Result<VersionId, EvalError> {
        if !self.nodes.contains_key(parent) {
            return Err(EvalError::VersionNotFound(parent.clone()));
        }
        let id = VersionId::generate();
        let node = VersionNode {
            id: id.clone(),
            parent: Some(parent.clone()),
            date: Utc::now(),
            parameters,
            children: Vec::new(),
            evals: Vec::new(),
        };
        self.nodes.insert(id.clone(), node);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(id.clone());
        }
        Ok(id)
    }

    /// Extend the record list of `id`.
    ///
    /// Fails without mutating anything when `id` does not resolve.
    pub fn append_evaluations(
        &mut self,
        id: &VersionId,
        records: Vec<EvaluationRecord>,
    ) -> Result<(), EvalError> {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.evals.extend(records);
                Ok(())
            }
            None => Err(EvalError::VersionNotFound(id.clone())),
        }
    }

    /// Nodes in depth-first order from the root, children in insertion
    /// order.
    pub fn walk(&self) -> Vec<&VersionNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![&self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push(node);
                // Reverse so the first child is visited first.
                for child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }
}
