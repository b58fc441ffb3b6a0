use crate::foundation::core::NodeId;
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::node::Node;
use crate::graph::property::{InputRef, OutputRef, PropertyKind, Value};
use std::collections::{BTreeMap, HashMap};

/// Graph configuration.
#[derive(Debug, Clone, Copy)]
pub struct GraphOpts {
    /// Longest chain of func outputs evaluated for a single sample.
    pub max_func_depth: usize,
}

impl Default for GraphOpts {
    fn default() -> Self {
        Self { max_func_depth: 64 }
    }
}

/// Nodes, their connections, and the designated outputs.
///
/// Structural edits validate everything before mutating, so a failed edit leaves the graph
/// unchanged. Edits never evaluate anything; they bump versions or mark nodes dirty and the
/// next evaluation picks that up.
#[derive(Debug, Default)]
pub struct NodeGraph {
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
    output: Option<NodeId>,
    named_outputs: BTreeMap<String, NodeId>,
    opts: GraphOpts,
    disposed: bool,
}

impl NodeGraph {
    /// Empty graph with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty graph with `opts`.
    pub fn with_opts(opts: GraphOpts) -> Self {
        Self {
            opts,
            ..Self::default()
        }
    }

    /// Graph configuration.
    pub fn opts(&self) -> GraphOpts {
        self.opts
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Return `true` when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Return `true` when `id` is part of the graph.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable node by id.
    ///
    /// Edits made here that are not property or key-frame edits (kind state, for example)
    /// should be followed by [`NodeGraph::invalidate`] or go through [`Node::kind_as_mut`].
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Node by id, or [`GraphError::UnknownNode`].
    pub fn try_node(&self, id: NodeId) -> GraphResult<&Node> {
        self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))
    }

    pub(crate) fn try_node_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))
    }

    /// Return `true` once [`NodeGraph::dispose`] ran.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn ensure_live(&self) -> GraphResult<()> {
        if self.disposed {
            return Err(GraphError::disposed("node graph"));
        }
        Ok(())
    }

    /// Add a node and return its id.
    pub fn add_node(&mut self, node: Node) -> GraphResult<NodeId> {
        self.ensure_live()?;
        let id = node.id();
        if node.is_disposed() {
            return Err(GraphError::disposed(format!("node {id}")));
        }
        if self.nodes.contains_key(&id) {
            return Err(GraphError::validation(format!("node {id} is already in the graph")));
        }
        self.nodes.insert(id, node);
        self.order.push(id);
        tracing::trace!(node = %id, "node added");
        Ok(id)
    }

    /// Remove and dispose a node, breaking every connection that touches it.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<()> {
        let (n_inputs, n_outputs) = {
            let node = self.try_node(id)?;
            (
                node.properties().inputs().len(),
                node.properties().outputs().len(),
            )
        };
        for index in 0..n_inputs {
            self.disconnect(InputRef { node: id, index })?;
        }
        for index in 0..n_outputs {
            self.disconnect_output(OutputRef { node: id, index })?;
        }
        self.order.retain(|n| *n != id);
        if self.output == Some(id) {
            self.output = None;
        }
        self.named_outputs.retain(|_, n| *n != id);
        if let Some(mut node) = self.nodes.remove(&id) {
            node.dispose();
        }
        tracing::trace!(node = %id, "node removed");
        Ok(())
    }

    /// Designate the node evaluated by [`NodeGraph::execute`].
    pub fn set_output_node(&mut self, id: NodeId) -> GraphResult<()> {
        self.try_node(id)?;
        self.output = Some(id);
        Ok(())
    }

    /// The designated output node.
    pub fn output_node(&self) -> Option<NodeId> {
        self.output
    }

    /// Register an alternate output, such as a brush preview.
    pub fn set_named_output(&mut self, name: impl Into<String>, id: NodeId) -> GraphResult<()> {
        self.try_node(id)?;
        self.named_outputs.insert(name.into(), id);
        Ok(())
    }

    /// Alternate output by name.
    pub fn named_output(&self, name: &str) -> Option<NodeId> {
        self.named_outputs.get(name).copied()
    }

    /// All alternate outputs.
    pub fn named_outputs(&self) -> &BTreeMap<String, NodeId> {
        &self.named_outputs
    }

    /// Connect `from` to `to`, replacing any existing connection of `to`.
    ///
    /// Fails with [`GraphError::TypeMismatch`] when the value types differ; the graph is left
    /// untouched in that case.
    pub fn connect(&mut self, from: OutputRef, to: InputRef) -> GraphResult<()> {
        self.ensure_live()?;
        let (out_value, out_kind) = {
            let out = self.try_node(from.node)?.properties().output(from.index)?;
            let input = self.try_node(to.node)?.properties().input(to.index)?;
            if out.value_type() != input.value_type() {
                return Err(GraphError::TypeMismatch {
                    input: input.name().to_string(),
                    input_type: input.value_type(),
                    output: out.name().to_string(),
                    output_type: out.value_type(),
                });
            }
            if input.connection() == Some(from) {
                return Ok(());
            }
            (out.value().clone(), out.kind())
        };

        let previous = {
            let slot = self.try_node_mut(to.node)?.properties.input_mut(to.index)?;
            let previous = slot.connection.replace(from);
            if out_kind == PropertyKind::Value {
                slot.value = out_value;
            }
            slot.bump();
            previous
        };
        if let Some(old) = previous {
            self.unlink(old, to);
        }
        self.try_node_mut(from.node)?
            .properties
            .output_mut(from.index)?
            .connections
            .push(to);
        tracing::trace!(from = %from.node, to = %to.node, "connected");
        Ok(())
    }

    /// Remove the connection feeding `to`, restoring its non-overridden value.
    ///
    /// Returns `false` when nothing was connected. The owning node and everything downstream
    /// of it are invalidated.
    pub fn disconnect(&mut self, to: InputRef) -> GraphResult<bool> {
        let previous = {
            let slot = self.try_node_mut(to.node)?.properties.input_mut(to.index)?;
            let Some(previous) = slot.connection.take() else {
                return Ok(false);
            };
            slot.value = slot.non_overridden.clone();
            slot.bump();
            previous
        };
        self.unlink(previous, to);
        self.invalidate(to.node)?;
        Ok(true)
    }

    /// Disconnect every input fed by `from`. Returns the number of removed connections.
    pub fn disconnect_output(&mut self, from: OutputRef) -> GraphResult<usize> {
        let targets: Vec<InputRef> = self
            .try_node(from.node)?
            .properties()
            .output(from.index)?
            .connections()
            .to_vec();
        let mut removed = 0;
        for to in targets {
            if self.disconnect(to)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn unlink(&mut self, from: OutputRef, to: InputRef) {
        if let Some(node) = self.nodes.get_mut(&from.node)
            && let Ok(out) = node.properties.output_mut(from.index)
        {
            out.connections.retain(|c| *c != to);
        }
    }

    /// Set the default value of an input.
    pub fn set_input(&mut self, input: InputRef, value: Value) -> GraphResult<()> {
        self.try_node_mut(input.node)?
            .properties
            .set_input_value(input.index, value)
    }

    /// Force `id` and every node downstream of it to recompute. Returns the number of nodes
    /// marked.
    pub fn invalidate(&mut self, id: NodeId) -> GraphResult<usize> {
        let mut ids = vec![id];
        ids.extend(self.downstream_of(id)?);
        for n in &ids {
            if let Some(node) = self.nodes.get_mut(n) {
                node.mark_dirty();
            }
        }
        Ok(ids.len())
    }

    /// Add a copy of `id` with a new identity. Incoming connections are re-created when
    /// `with_connections` is set; outgoing ones never are.
    pub fn duplicate_node(&mut self, id: NodeId, with_connections: bool) -> GraphResult<NodeId> {
        let (copy, incoming) = {
            let node = self.try_node(id)?;
            let incoming: Vec<(usize, OutputRef)> = if with_connections {
                node.properties()
                    .inputs()
                    .iter()
                    .enumerate()
                    .filter_map(|(i, slot)| slot.connection().map(|c| (i, c)))
                    .collect()
            } else {
                Vec::new()
            };
            (node.duplicate()?, incoming)
        };
        let new_id = self.add_node(copy)?;
        for (index, from) in incoming {
            self.connect(from, InputRef {
                node: new_id,
                index,
            })?;
        }
        Ok(new_id)
    }

    /// Dispose every node. Further edits and evaluations fail; calling it again is a no-op.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for id in &self.order {
            if let Some(node) = self.nodes.get_mut(id) {
                node.dispose();
            }
        }
        tracing::trace!(nodes = self.order.len(), "graph disposed");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/node_graph.rs"]
mod tests;
