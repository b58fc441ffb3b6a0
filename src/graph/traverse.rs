use crate::foundation::core::NodeId;
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::NodeGraph;
use crate::graph::node::Node;
use crate::graph::property::{InputRef, OutputRef};
use smallvec::SmallVec;
use std::collections::{HashSet, VecDeque};

/// What a traversal visitor wants next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Traversal {
    /// Keep going through this node's neighbours.
    Continue,
    /// Do not expand this node's neighbours.
    Skip,
    /// End the traversal.
    Stop,
}

#[derive(Clone, Copy)]
enum Direction {
    Backwards,
    Forwards,
}

impl NodeGraph {
    /// Distinct nodes feeding `id`, in input order.
    pub(crate) fn sources_of(&self, id: NodeId) -> GraphResult<SmallVec<[NodeId; 4]>> {
        let mut out = SmallVec::new();
        for slot in self.try_node(id)?.properties().inputs() {
            if let Some(src) = slot.connection()
                && !out.contains(&src.node)
            {
                out.push(src.node);
            }
        }
        Ok(out)
    }

    /// Distinct nodes fed by `id`, in output order.
    pub(crate) fn consumers_of(&self, id: NodeId) -> GraphResult<SmallVec<[NodeId; 4]>> {
        let mut out = SmallVec::new();
        for slot in self.try_node(id)?.properties().outputs() {
            for c in slot.connections() {
                if !out.contains(&c.node) {
                    out.push(c.node);
                }
            }
        }
        Ok(out)
    }

    fn traverse(
        &self,
        start: NodeId,
        direction: Direction,
        mut visit: impl FnMut(&Node) -> Traversal,
    ) -> GraphResult<()> {
        let mut queue = VecDeque::from([start]);
        let mut seen = HashSet::from([start]);
        while let Some(id) = queue.pop_front() {
            match visit(self.try_node(id)?) {
                Traversal::Stop => return Ok(()),
                Traversal::Skip => continue,
                Traversal::Continue => {}
            }
            let next = match direction {
                Direction::Backwards => self.sources_of(id)?,
                Direction::Forwards => self.consumers_of(id)?,
            };
            for n in next {
                if seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        Ok(())
    }

    /// Breadth-first walk from `start` toward sources. Each reachable node is visited once,
    /// `start` first, even when the graph contains cycles.
    pub fn traverse_backwards(
        &self,
        start: NodeId,
        visit: impl FnMut(&Node) -> Traversal,
    ) -> GraphResult<()> {
        self.traverse(start, Direction::Backwards, visit)
    }

    /// Breadth-first walk from `start` toward consumers. Each reachable node is visited once.
    pub fn traverse_forwards(
        &self,
        start: NodeId,
        visit: impl FnMut(&Node) -> Traversal,
    ) -> GraphResult<()> {
        self.traverse(start, Direction::Forwards, visit)
    }

    /// Every node `start` depends on, nearest first.
    pub fn upstream_of(&self, start: NodeId) -> GraphResult<Vec<NodeId>> {
        let mut out = Vec::new();
        self.traverse_backwards(start, |n| {
            if n.id() != start {
                out.push(n.id());
            }
            Traversal::Continue
        })?;
        Ok(out)
    }

    /// Every node depending on `start`, nearest first.
    pub fn downstream_of(&self, start: NodeId) -> GraphResult<Vec<NodeId>> {
        let mut out = Vec::new();
        self.traverse_forwards(start, |n| {
            if n.id() != start {
                out.push(n.id());
            }
            Traversal::Continue
        })?;
        Ok(out)
    }

    /// Nearest upstream node (excluding `start`) matching `pred`.
    pub fn find_upstream(
        &self,
        start: NodeId,
        pred: impl Fn(&Node) -> bool,
    ) -> GraphResult<Option<NodeId>> {
        let mut found = None;
        self.traverse_backwards(start, |n| {
            if n.id() != start && pred(n) {
                found = Some(n.id());
                return Traversal::Stop;
            }
            Traversal::Continue
        })?;
        Ok(found)
    }

    /// Dependency-first order of `start` and everything upstream of it.
    ///
    /// Fails with [`GraphError::Evaluation`] when the upstream graph contains a cycle.
    pub fn execution_order(&self, start: NodeId) -> GraphResult<Vec<NodeId>> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut visiting = HashSet::from([start]);
        let mut stack: Vec<(NodeId, SmallVec<[NodeId; 4]>, usize)> =
            vec![(start, self.sources_of(start)?, 0)];

        while let Some(top) = stack.last_mut() {
            if top.2 < top.1.len() {
                let child = top.1[top.2];
                top.2 += 1;
                if done.contains(&child) {
                    continue;
                }
                if !visiting.insert(child) {
                    return Err(GraphError::evaluation(format!(
                        "cycle detected at node {child}"
                    )));
                }
                let sources = self.sources_of(child)?;
                stack.push((child, sources, 0));
            } else {
                let id = top.0;
                stack.pop();
                visiting.remove(&id);
                done.insert(id);
                order.push(id);
            }
        }
        Ok(order)
    }

    /// Return `true` when connecting `from` to `to` would close a loop.
    pub fn would_create_cycle(&self, from: OutputRef, to: InputRef) -> GraphResult<bool> {
        if from.node == to.node {
            return Ok(true);
        }
        self.try_node(from.node)?;
        Ok(self.downstream_of(to.node)?.contains(&from.node))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/traverse.rs"]
mod tests;
