//! Lazy pull evaluation.
//!
//! Evaluating a node first evaluates every node connected to its inputs, then resolves its
//! input values, then decides whether the cached result is still valid. Each node is
//! visited at most once per request and computes only when something it depends on changed.

use crate::eval::context::RenderContext;
use crate::eval::func;
use crate::foundation::core::NodeId;
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::NodeGraph;
use crate::graph::node::{ExecuteCx, KeyFrameState};
use crate::graph::property::{InputMarker, PropertyKind, Value};
use crate::render::frame::FrameRGBA;
use crate::render::surface::{Paint, Texture};

struct ResolvedInput {
    index: usize,
    value: Option<Value>,
    marker: InputMarker,
}

impl NodeGraph {
    /// Evaluate the designated output node and draw the result onto `ctx.target`, if set.
    ///
    /// The returned texture is a copy owned by the caller. It is unaffected by later
    /// evaluations and by disposal of the producing node.
    #[tracing::instrument(skip(self, ctx), fields(frame = ctx.frame_time.frame))]
    pub fn execute(&mut self, ctx: &RenderContext) -> GraphResult<Option<Texture>> {
        owned(self.pull_output(ctx)?)
    }

    /// Evaluate the alternate output registered as `name`.
    #[tracing::instrument(skip(self, ctx), fields(frame = ctx.frame_time.frame))]
    pub fn execute_output(
        &mut self,
        name: &str,
        ctx: &RenderContext,
    ) -> GraphResult<Option<Texture>> {
        let id = self
            .named_output(name)
            .ok_or_else(|| GraphError::validation(format!("no output named '{name}'")))?;
        owned(self.pull_to_target(id, ctx)?)
    }

    /// Evaluate `id` and everything it depends on. Does not touch `ctx.target`.
    ///
    /// The node keeps its own pooled result, readable through
    /// [`Node::cached_result`](crate::graph::node::Node::cached_result).
    #[tracing::instrument(skip(self, ctx), fields(frame = ctx.frame_time.frame))]
    pub fn execute_node(&mut self, id: NodeId, ctx: &RenderContext) -> GraphResult<Option<Texture>> {
        owned(self.pull(id, ctx)?)
    }

    /// Evaluate the output node and return an independent copy of the result.
    pub fn render_texture(&mut self, ctx: &RenderContext) -> GraphResult<Option<Texture>> {
        self.execute(ctx)
    }

    /// Evaluate the output node and return an sRGB snapshot of the result.
    #[tracing::instrument(skip(self, ctx), fields(frame = ctx.frame_time.frame))]
    pub fn render_snapshot(&mut self, ctx: &RenderContext) -> GraphResult<Option<FrameRGBA>> {
        self.pull_output(ctx)?.map(|t| t.snapshot()).transpose()
    }

    /// Evaluate the output node and return the pooled result it keeps.
    pub(crate) fn pull_output(&mut self, ctx: &RenderContext) -> GraphResult<Option<Texture>> {
        let id = self
            .output_node()
            .ok_or_else(|| GraphError::validation("graph has no output node"))?;
        self.pull_to_target(id, ctx)
    }

    fn pull_to_target(&mut self, id: NodeId, ctx: &RenderContext) -> GraphResult<Option<Texture>> {
        let result = self.pull(id, ctx)?;
        if let Some(target) = &ctx.target {
            present(target, result.as_ref(), ctx)?;
        }
        Ok(result)
    }

    /// Evaluate every node `id` depends on, dependencies first, then `id` itself.
    fn pull(&mut self, id: NodeId, ctx: &RenderContext) -> GraphResult<Option<Texture>> {
        self.ensure_live()?;
        let order = self.execution_order(id)?;
        tracing::trace!(node = %id, nodes = order.len(), "pull");
        let mut result = None;
        for node in order {
            result = self.evaluate_node(node, ctx)?;
        }
        Ok(result)
    }

    fn resolve_inputs(&self, id: NodeId, ctx: &RenderContext) -> GraphResult<Vec<ResolvedInput>> {
        let node = self.try_node(id)?;
        let inputs = node.properties().inputs();
        let mut out = Vec::with_capacity(inputs.len());
        for (index, slot) in inputs.iter().enumerate() {
            let Some(source) = slot.connection() else {
                out.push(ResolvedInput {
                    index,
                    value: None,
                    marker: slot.marker(None),
                });
                continue;
            };
            let out_slot = self.try_node(source.node)?.properties().output(source.index)?;
            let value = match (slot.kind(), out_slot.kind()) {
                (_, PropertyKind::Value) => Some(out_slot.value().clone()),
                (PropertyKind::Value, PropertyKind::Func) => {
                    Some(func::evaluate_output(self, ctx, source, None, &[id])?)
                }
                (PropertyKind::Func, PropertyKind::Func) => None,
            };
            out.push(ResolvedInput {
                index,
                value,
                marker: slot.marker(Some(out_slot.version())),
            });
        }
        Ok(out)
    }

    fn evaluate_node(&mut self, id: NodeId, ctx: &RenderContext) -> GraphResult<Option<Texture>> {
        if self.try_node(id)?.is_disposed() {
            return Err(GraphError::disposed(format!("node {id}")));
        }
        let resolved = self.resolve_inputs(id, ctx)?;

        let node = self.try_node_mut(id)?;
        let triggers = node
            .kind
            .as_ref()
            .ok_or_else(|| GraphError::evaluation(format!("node {id} is already executing")))?
            .cache_triggers();
        let key = ctx.validity_key(triggers);
        let active = node.key_frames.resolve_index(ctx.frame_time.frame);
        let key_frame = KeyFrameState {
            active: active
                .and_then(|i| node.key_frames.get_index(i))
                .map(|k| k.id()),
            version: node.key_frames.version(),
        };
        let inputs_changed = resolved.iter().any(|r| {
            node.properties.inputs()[r.index].read_marker != Some(r.marker)
        });
        let payload_changed = active.is_some_and(|i| node.key_frames.payload_requires_update(i));
        let cache = &node.cache;
        let dirty = !cache.computed
            || triggers.volatile
            || ctx.full_rerender
            || cache.force_dirty
            || inputs_changed
            || payload_changed
            || cache.key != Some(key)
            || cache.key_frame != Some(key_frame)
            || cache.result.as_ref().is_some_and(Texture::is_disposed);
        if !dirty {
            tracing::trace!(node = %id, "cache hit");
            return Ok(cache.result.clone());
        }

        for r in &resolved {
            if let Some(v) = &r.value {
                node.properties.inputs_mut()[r.index].value = v.clone();
            }
        }

        let Some(mut kind) = node.kind.take() else {
            return Err(GraphError::evaluation(format!("node {id} is already executing")));
        };
        let mut pool = std::mem::take(&mut node.pool);
        let outcome = match self.node(id) {
            Some(node_ref) => {
                let active_kf = active.and_then(|i| node_ref.key_frames.get_index(i));
                let mut cx = ExecuteCx::new(self, node_ref, ctx, &mut pool, active_kf);
                let result = kind.execute(&mut cx);
                let writes = cx.into_writes();
                result.map(|t| (t, writes))
            }
            None => Err(GraphError::UnknownNode(id)),
        };

        let node = self.try_node_mut(id)?;
        node.kind = Some(kind);
        node.pool = pool;
        let (result, writes) = outcome?;

        if let Some(t) = &result
            && t.is_disposed()
        {
            return Err(GraphError::disposed(format!(
                "node {id} ({}) produced a disposed texture",
                node.type_name()
            )));
        }
        for (index, value) in writes {
            let slot = node.properties.output_mut(index)?;
            if value.value_type() != slot.value_type() {
                return Err(GraphError::evaluation(format!(
                    "output '{}' expects {:?}, got {:?}",
                    slot.name(),
                    slot.value_type(),
                    value.value_type()
                )));
            }
            slot.value = value;
        }
        for slot in node.properties.outputs_mut() {
            slot.version = slot.version.wrapping_add(1);
        }
        for r in resolved {
            node.properties.inputs_mut()[r.index].read_marker = Some(r.marker);
        }
        if let Some(i) = active {
            node.key_frames.mark_payload_updated(i);
        }

        node.cache.result = result.clone();
        node.cache.computed = true;
        node.cache.key = Some(key);
        node.cache.key_frame = Some(key_frame);
        node.cache.force_dirty = false;
        node.cache.execution_count = node.cache.execution_count.saturating_add(1);
        tracing::debug!(node = %id, kind = node.type_name(), "node computed");
        Ok(result)
    }
}

fn owned(result: Option<Texture>) -> GraphResult<Option<Texture>> {
    result.map(|t| t.copy()).transpose()
}

fn present(target: &Texture, result: Option<&Texture>, ctx: &RenderContext) -> GraphResult<()> {
    if let Some(r) = result
        && r.ptr_eq(target)
    {
        return Ok(());
    }
    let mut dst = target.borrow_mut()?;
    dst.clear()?;
    if let Some(r) = result {
        let src = r.borrow()?;
        dst.draw_surface_stretched(&src, &Paint::default(), ctx.sampling)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/graph/evaluate.rs"]
mod tests;
