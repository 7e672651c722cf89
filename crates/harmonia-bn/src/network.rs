//! Directed acyclic network model.
//!
//! A [`Network`] owns an arena of [`Node`] records addressed by stable
//! [`NodeId`]s, a parent/child adjacency index over those ids, and the
//! auxiliary metadata a structure search needs (prohibited edges, score).
//!
//! Edges are inserted without rejecting cycles; callers decide what to do
//! with a cyclic state. The network tracks acyclicity incrementally so that
//! [`Network::is_acyclic`] is cheap in the add/check/roll-back pattern used
//! during search:
//!
//! - while acyclic, inserting `u -> v` probes whether `v` already reaches `u`;
//! - removing the edge that introduced a cycle restores the acyclic state;
//! - any other mutation of a cyclic network falls back to a full topological
//!   check the next time the state is needed.

use scirs2_core::ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::cpt::Cpt;
use crate::error::{BnError, Result};

/// Stable index of a node inside a [`Network`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Position of the node in insertion order (and dataset column).
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything that can name a node: an id or a label.
pub trait NodeKey {
    /// Resolve to an id, failing with [`BnError::NodeNotFound`].
    fn resolve(&self, network: &Network) -> Result<NodeId>;
}

impl NodeKey for NodeId {
    fn resolve(&self, network: &Network) -> Result<NodeId> {
        if self.0 < network.nodes.len() {
            Ok(*self)
        } else {
            Err(BnError::NodeNotFound(format!("#{}", self.0)))
        }
    }
}

impl NodeKey for &str {
    fn resolve(&self, network: &Network) -> Result<NodeId> {
        network
            .index_of(self)
            .ok_or_else(|| BnError::NodeNotFound((*self).to_string()))
    }
}

impl NodeKey for String {
    fn resolve(&self, network: &Network) -> Result<NodeId> {
        self.as_str().resolve(network)
    }
}

impl NodeKey for &String {
    fn resolve(&self, network: &Network) -> Result<NodeId> {
        self.as_str().resolve(network)
    }
}

/// A discrete random variable in the network.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    label: String,
    ind_states: Vec<String>,
    states_ind: HashMap<String, usize>,
    cpt: Option<Cpt>,
}

impl Node {
    fn new(label: String, states: Vec<String>) -> Self {
        let states_ind = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        Self {
            label,
            ind_states: states,
            states_ind,
            cpt: None,
        }
    }

    /// Node label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of discrete states.
    pub fn nstates(&self) -> usize {
        self.ind_states.len()
    }

    /// State label for a state index.
    pub fn state_label(&self, index: usize) -> Option<&str> {
        self.ind_states.get(index).map(String::as_str)
    }

    /// State index for a state label.
    pub fn state_index(&self, label: &str) -> Option<usize> {
        self.states_ind.get(label).copied()
    }

    /// State labels in index order.
    pub fn states(&self) -> &[String] {
        &self.ind_states
    }

    /// Most recently estimated CPT, if any.
    pub fn cpt(&self) -> Option<&Cpt> {
        self.cpt.as_ref()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Acyclicity {
    Acyclic,
    /// Cyclic since `trigger` was inserted into an acyclic network.
    Cyclic {
        trigger: (NodeId, NodeId),
    },
    Unknown,
}

/// Bayesian network structure with per-node CPT state and a score.
#[derive(Clone, Debug)]
pub struct Network {
    nodes: Vec<Node>,
    lookup: HashMap<String, NodeId>,
    parents: Vec<BTreeSet<NodeId>>,
    children: Vec<BTreeSet<NodeId>>,
    prohibited: BTreeSet<(NodeId, NodeId)>,
    num_edges: usize,
    acyclicity: Acyclicity,
    score: Option<f64>,
}

impl Network {
    /// Create an empty network.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            lookup: HashMap::new(),
            parents: Vec::new(),
            children: Vec::new(),
            prohibited: BTreeSet::new(),
            num_edges: 0,
            acyclicity: Acyclicity::Acyclic,
            score: None,
        }
    }

    /// Create a network from `(label, nstates)` pairs.
    pub fn with_nodes<I, S>(nodes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut net = Self::new();
        net.add_nodes(nodes)?;
        Ok(net)
    }

    /// Create a network from nodes and an initial edge list of labels.
    pub fn from_edges<I, S>(nodes: I, edges: &[(&str, &str)]) -> Result<Self>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut net = Self::with_nodes(nodes)?;
        for &(u, v) in edges {
            net.add_edge(u, v)?;
        }
        Ok(net)
    }

    /// Create a network from nodes and a boolean adjacency matrix where
    /// `adjacency[[i, j]]` means an edge from node `i` to node `j`.
    pub fn from_adjacency<I, S>(nodes: I, adjacency: &Array2<bool>) -> Result<Self>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut net = Self::with_nodes(nodes)?;
        let n = net.num_nodes();
        if adjacency.dim() != (n, n) {
            return Err(BnError::DimensionMismatch {
                expected: vec![n, n],
                got: adjacency.shape().to_vec(),
            });
        }
        for ((i, j), &present) in adjacency.indexed_iter() {
            if present {
                net.add_edge(NodeId(i), NodeId(j))?;
            }
        }
        Ok(net)
    }

    /// Append a node with `nstates` states labelled `"0"`, `"1"`, ...
    pub fn add_node(&mut self, label: impl Into<String>, nstates: usize) -> Result<NodeId> {
        let states = (0..nstates).map(|s| s.to_string()).collect();
        self.add_node_with_states(label, states)
    }

    /// Append a node with explicit state labels.
    pub fn add_node_with_states(
        &mut self,
        label: impl Into<String>,
        states: Vec<String>,
    ) -> Result<NodeId> {
        let label = label.into();
        if self.lookup.contains_key(&label) {
            return Err(BnError::DuplicateNode(label));
        }
        if states.is_empty() {
            return Err(BnError::InvalidGraph(format!(
                "node '{}' must have at least one state",
                label
            )));
        }

        let id = NodeId(self.nodes.len());
        self.lookup.insert(label.clone(), id);
        self.nodes.push(Node::new(label, states));
        self.parents.push(BTreeSet::new());
        self.children.push(BTreeSet::new());
        Ok(id)
    }

    /// Append several `(label, nstates)` nodes in order.
    pub fn add_nodes<I, S>(&mut self, nodes: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        nodes
            .into_iter()
            .map(|(label, nstates)| self.add_node(label, nstates))
            .collect()
    }

    /// Index of a node label.
    pub fn index_of(&self, label: &str) -> Option<NodeId> {
        self.lookup.get(label).copied()
    }

    /// Label of a node index.
    pub fn label_of(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(Node::label)
    }

    /// Node record by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Iterate over `(id, node)` pairs in index order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// All node ids in index order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Number of states of a node.
    pub fn nstates(&self, id: NodeId) -> Option<usize> {
        self.node(id).map(Node::nstates)
    }

    /// Insert the directed edge `u -> v`.
    ///
    /// Fails with [`BnError::NodeNotFound`] if an endpoint is missing. Cycles
    /// are not rejected here; inserting an existing edge is a no-op.
    pub fn add_edge(&mut self, u: impl NodeKey, v: impl NodeKey) -> Result<()> {
        let u = u.resolve(self)?;
        let v = v.resolve(self)?;
        if u == v {
            return Err(BnError::InvalidGraph(format!(
                "self-loop on node '{}'",
                self.nodes[u.0].label
            )));
        }
        self.insert_edge(u, v);
        Ok(())
    }

    /// Add every edge in `edges`.
    pub fn add_edges<K: NodeKey>(&mut self, edges: impl IntoIterator<Item = (K, K)>) -> Result<()> {
        for (u, v) in edges {
            self.add_edge(u, v)?;
        }
        Ok(())
    }

    /// Remove the edge `u -> v`. Returns whether an edge was removed.
    pub fn remove_edge(&mut self, u: impl NodeKey, v: impl NodeKey) -> Result<bool> {
        let u = u.resolve(self)?;
        let v = v.resolve(self)?;
        Ok(self.delete_edge(u, v))
    }

    /// Drop all edges, keeping nodes, prohibited edges and CPT records.
    pub fn clear(&mut self) {
        for set in self.parents.iter_mut().chain(self.children.iter_mut()) {
            set.clear();
        }
        if self.num_edges > 0 {
            self.score = None;
        }
        self.num_edges = 0;
        self.acyclicity = Acyclicity::Acyclic;
    }

    fn insert_edge(&mut self, u: NodeId, v: NodeId) -> bool {
        if self.parents[v.0].contains(&u) {
            return false;
        }
        self.resolve_acyclicity();
        self.acyclicity = match self.acyclicity {
            Acyclicity::Acyclic if self.reaches(v, u) => Acyclicity::Cyclic { trigger: (u, v) },
            Acyclicity::Acyclic => Acyclicity::Acyclic,
            _ => Acyclicity::Unknown,
        };
        self.parents[v.0].insert(u);
        self.children[u.0].insert(v);
        self.num_edges += 1;
        self.score = None;
        true
    }

    fn delete_edge(&mut self, u: NodeId, v: NodeId) -> bool {
        if !self.parents[v.0].remove(&u) {
            return false;
        }
        self.children[u.0].remove(&v);
        self.num_edges -= 1;
        self.score = None;
        self.acyclicity = match self.acyclicity {
            Acyclicity::Acyclic => Acyclicity::Acyclic,
            Acyclicity::Cyclic { trigger } if trigger == (u, v) => Acyclicity::Acyclic,
            _ => Acyclicity::Unknown,
        };
        true
    }

    fn resolve_acyclicity(&mut self) {
        if self.acyclicity == Acyclicity::Unknown && self.topological_sort().is_some() {
            self.acyclicity = Acyclicity::Acyclic;
        }
    }

    /// Whether `to` is reachable from `from` along directed edges.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        visited[from.0] = true;
        while let Some(node) = stack.pop() {
            for &child in &self.children[node.0] {
                if child == to {
                    return true;
                }
                if !visited[child.0] {
                    visited[child.0] = true;
                    stack.push(child);
                }
            }
        }
        false
    }

    /// Whether the current edge relation is a DAG.
    pub fn is_acyclic(&self) -> bool {
        match self.acyclicity {
            Acyclicity::Acyclic => true,
            Acyclicity::Cyclic { .. } => false,
            Acyclicity::Unknown => self.topological_sort().is_some(),
        }
    }

    fn topological_sort(&self) -> Option<Vec<NodeId>> {
        let mut in_degree: Vec<usize> = self.parents.iter().map(BTreeSet::len).collect();
        let mut queue: Vec<NodeId> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(i, _)| NodeId(i))
            .rev()
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(node) = queue.pop() {
            order.push(node);
            for &child in self.children[node.0].iter().rev() {
                in_degree[child.0] -= 1;
                if in_degree[child.0] == 0 {
                    queue.push(child);
                }
            }
        }

        (order.len() == self.nodes.len()).then_some(order)
    }

    /// Ancestors-before-descendants ordering of the nodes.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        self.topological_sort()
            .ok_or_else(|| BnError::InvalidGraph("Network contains cycles".to_string()))
    }

    /// Whether the edge `u -> v` is present.
    pub fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.parents.get(v.0).is_some_and(|p| p.contains(&u))
    }

    /// Parents of a node in index order.
    pub fn parents(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.parents
            .get(id.0)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Children of a node in index order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children
            .get(id.0)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// All edges ordered by source, then target.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.children
            .iter()
            .enumerate()
            .flat_map(|(u, set)| set.iter().map(move |&v| (NodeId(u), v)))
    }

    /// Seeds plus the transitive closure of their parents.
    pub fn ancestors(&self, seeds: &[NodeId]) -> BTreeSet<NodeId> {
        let mut closure = BTreeSet::new();
        let mut stack: Vec<NodeId> = seeds
            .iter()
            .copied()
            .filter(|id| id.0 < self.nodes.len())
            .collect();
        while let Some(node) = stack.pop() {
            if closure.insert(node) {
                stack.extend(self.parents[node.0].iter().copied());
            }
        }
        closure
    }

    /// The axis order a CPT for `id` must have right now: parents, then self.
    pub fn expected_cptdim(&self, id: NodeId) -> Vec<NodeId> {
        let mut dims: Vec<NodeId> = self.parents(id).collect();
        dims.push(id);
        dims
    }

    /// Whether the node's CPT exists and matches its current parent set.
    pub fn cpt_is_current(&self, id: NodeId) -> bool {
        self.node(id)
            .and_then(Node::cpt)
            .is_some_and(|cpt| cpt.cptdim == self.expected_cptdim(id))
    }

    /// Labels of a node's CPT axes, if a CPT exists.
    pub fn cptdim_labels(&self, id: NodeId) -> Option<Vec<&str>> {
        let cpt = self.node(id)?.cpt()?;
        cpt.cptdim.iter().map(|&d| self.label_of(d)).collect()
    }

    pub(crate) fn set_cpt(&mut self, id: NodeId, cpt: Cpt) {
        self.nodes[id.0].cpt = Some(cpt);
    }

    /// Drop every node's CPT.
    pub fn clear_cpts(&mut self) {
        for node in &mut self.nodes {
            node.cpt = None;
        }
    }

    /// Prohibit the directed edge `u -> v` in searches over this network.
    pub fn prohibit_edge(&mut self, u: impl NodeKey, v: impl NodeKey) -> Result<()> {
        let u = u.resolve(self)?;
        let v = v.resolve(self)?;
        self.prohibited.insert((u, v));
        Ok(())
    }

    /// Prohibited directed edges.
    pub fn prohibited_edges(&self) -> &BTreeSet<(NodeId, NodeId)> {
        &self.prohibited
    }

    pub fn is_prohibited(&self, u: NodeId, v: NodeId) -> bool {
        self.prohibited.contains(&(u, v))
    }

    /// Log-likelihood score, if computed since the last structural change.
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub(crate) fn set_score(&mut self, score: f64) {
        self.score = Some(score);
    }

    /// Forget the score.
    pub fn reset_score(&mut self) {
        self.score = None;
    }

    /// Order two networks by score.
    ///
    /// Fails with [`BnError::UnscoredComparison`] if either is unscored.
    pub fn try_cmp_score(&self, other: &Network) -> Result<Ordering> {
        match (self.score, other.score) {
            (Some(a), Some(b)) => Ok(a.total_cmp(&b)),
            _ => Err(BnError::UnscoredComparison),
        }
    }

    /// Edge list as `"u,v;u,v"` using node indices.
    pub fn to_edge_string(&self) -> String {
        self.edges()
            .map(|(u, v)| format!("{},{}", u, v))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Add edges from the `"u,v;u,v"` index form.
    pub fn add_edges_from_str(&mut self, s: &str) -> Result<()> {
        for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (u, v) = pair.split_once(',').ok_or_else(|| {
                BnError::InvalidGraph(format!("Invalid edge '{}', expected u,v", pair))
            })?;
            let parse = |t: &str| {
                t.trim()
                    .parse::<usize>()
                    .map(NodeId)
                    .map_err(|e| BnError::InvalidGraph(format!("Invalid node index '{}': {}", t, e)))
            };
            self.add_edge(parse(u)?, parse(v)?)?;
        }
        Ok(())
    }

    /// Model string such as `[A][B|A][C|A:B]`.
    pub fn to_model_string(&self) -> String {
        self.nodes()
            .map(|(id, node)| {
                let parents: Vec<&str> = self.parents(id).map(|p| self.nodes[p.0].label()).collect();
                if parents.is_empty() {
                    format!("[{}]", node.label)
                } else {
                    format!("[{}|{}]", node.label, parents.join(":"))
                }
            })
            .collect()
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality: same node labels in the same order and the same
/// edge set. Scores and CPTs are ignored.
impl PartialEq for Network {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(a, b)| a.label == b.label)
            && self.parents == other.parents
    }
}

impl Eq for Network {}

impl Hash for Network {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for node in &self.nodes {
            node.label.hash(state);
        }
        for edge in self.edges() {
            edge.hash(state);
        }
    }
}

/// Number of edge insertions and deletions that turn `a`'s edge set into
/// `b`'s, comparing edges by node index.
pub fn distance(a: &Network, b: &Network) -> usize {
    let ea: BTreeSet<(NodeId, NodeId)> = a.edges().collect();
    let eb: BTreeSet<(NodeId, NodeId)> = b.edges().collect();
    ea.symmetric_difference(&eb).count()
}
