//! Per-sample evaluation of func connections.
//!
//! A func output is a procedure: asking it for a value means calling its node kind's
//! [`NodeKind::evaluate_func`](crate::graph::node::NodeKind::evaluate_func) with a
//! [`FuncContext`]. Consumers that iterate over pixels pass a [`SamplePoint`]; consumers
//! that need a single value pass none and the procedure answers with its constant form.

use crate::eval::context::RenderContext;
use crate::foundation::core::{NodeId, PixelSize, Point, Vec2};
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::NodeGraph;
use crate::graph::node::Node;
use crate::graph::property::{
    FuncInputHandle, InputHandle, OutputRef, PropertyKind, PropertyType, Value, expect_value,
};
use smallvec::SmallVec;

/// Position of one sample inside the surface being produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    /// Pixel-center position in surface pixels.
    pub position: Point,
    /// Normalized position in `[0, 1]`.
    pub uv: Vec2,
    /// Size of the surface being produced.
    pub size: PixelSize,
}

impl SamplePoint {
    /// Sample at the center of pixel `(x, y)` of a surface of `size`.
    pub fn at_pixel(x: u32, y: u32, size: PixelSize) -> Self {
        let px = f64::from(x) + 0.5;
        let py = f64::from(y) + 0.5;
        Self {
            position: Point::new(px, py),
            uv: Vec2::new(
                px / f64::from(size.width.max(1)),
                py / f64::from(size.height.max(1)),
            ),
            size,
        }
    }
}

/// Context handed to a kind while one of its func outputs is evaluated.
pub struct FuncContext<'a> {
    graph: &'a NodeGraph,
    render: &'a RenderContext,
    node: NodeId,
    sample: Option<SamplePoint>,
    chain: SmallVec<[NodeId; 8]>,
}

impl<'a> FuncContext<'a> {
    /// Return `true` when evaluating for a concrete sample rather than as a constant.
    pub fn has_context(&self) -> bool {
        self.sample.is_some()
    }

    /// The sample being evaluated, if any.
    pub fn sample(&self) -> Option<SamplePoint> {
        self.sample
    }

    /// The request's render context.
    pub fn render(&self) -> &'a RenderContext {
        self.render
    }

    /// The graph being evaluated.
    pub fn graph(&self) -> &'a NodeGraph {
        self.graph
    }

    /// The node whose func output is evaluated.
    pub fn node(&self) -> GraphResult<&'a Node> {
        self.graph.try_node(self.node)
    }

    /// Resolve one of this node's func inputs for the current sample.
    pub fn input<T: PropertyType>(&self, handle: FuncInputHandle<T>) -> GraphResult<T> {
        let value = resolve_input(
            self.graph,
            self.render,
            self.node,
            handle.index(),
            self.sample,
            &self.chain,
        )?;
        let node = self.node()?;
        expect_value(&value, node.properties().input(handle.index())?.name())
    }

    /// Effective value of one of this node's value inputs.
    pub fn value_input<T: PropertyType>(&self, handle: InputHandle<T>) -> GraphResult<T> {
        let slot = self.node()?.properties().input(handle.index())?;
        expect_value(slot.value(), slot.name())
    }
}

/// Value of input `input` of `node`: the connected output evaluated for `sample`, or the
/// input's own value when unconnected.
pub(crate) fn resolve_input(
    graph: &NodeGraph,
    render: &RenderContext,
    node: NodeId,
    input: usize,
    sample: Option<SamplePoint>,
    chain: &[NodeId],
) -> GraphResult<Value> {
    let slot = graph.try_node(node)?.properties().input(input)?;
    match slot.connection() {
        Some(source) => evaluate_output(graph, render, source, sample, chain),
        None => Ok(slot.value().clone()),
    }
}

/// Value of output `output` for `sample`. Value outputs answer with their materialized value.
pub(crate) fn evaluate_output(
    graph: &NodeGraph,
    render: &RenderContext,
    output: OutputRef,
    sample: Option<SamplePoint>,
    chain: &[NodeId],
) -> GraphResult<Value> {
    let node = graph.try_node(output.node)?;
    let slot = node.properties().output(output.index)?;
    if slot.kind() == PropertyKind::Value {
        return Ok(slot.value().clone());
    }
    if chain.contains(&output.node) {
        return Err(GraphError::evaluation(format!(
            "func cycle through node {} ({})",
            output.node,
            node.type_name()
        )));
    }
    if chain.len() >= graph.opts().max_func_depth {
        return Err(GraphError::evaluation(format!(
            "func chain deeper than {} nodes",
            graph.opts().max_func_depth
        )));
    }
    let kind = node.kind().ok_or_else(|| {
        GraphError::evaluation(format!(
            "node {} ({}) is executing and cannot serve func output '{}'",
            output.node,
            node.type_name(),
            slot.name()
        ))
    })?;
    let mut next: SmallVec<[NodeId; 8]> = SmallVec::from_slice(chain);
    next.push(output.node);
    let cx = FuncContext {
        graph,
        render,
        node: output.node,
        sample,
        chain: next,
    };
    let value = kind.evaluate_func(output.index, &cx)?;
    if value.value_type() != slot.value_type() {
        return Err(GraphError::evaluation(format!(
            "func output '{}' produced {:?}, declared {:?}",
            slot.name(),
            value.value_type(),
            slot.value_type()
        )));
    }
    Ok(value)
}

#[cfg(test)]
#[path = "../../tests/unit/eval/func.rs"]
mod tests;
