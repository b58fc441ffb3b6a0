use crate::animation::keyframe::{KeyFrameData, KeyFrameId, KeyFramePayload, KeyFrameSet};
use crate::eval::context::{RenderContext, ValidityKey};
use crate::eval::func::{self, FuncContext, SamplePoint};
use crate::foundation::core::{NodeId, PixelSize};
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::NodeGraph;
use crate::graph::property::{
    FuncInputHandle, InputHandle, InputRef, OutputHandle, OutputRef, PropertyBuilder,
    PropertyStore, PropertyType, Value, expect_value,
};
use crate::render::color::{ColorSpace, ColorSpaceType};
use crate::render::pool::{TexturePool, TexturePoolStats};
use crate::render::surface::Texture;
use std::any::Any;
use std::fmt;

/// Which parts of the render context a node's result depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheTriggers {
    /// Recompute when the frame changes.
    pub timeline: bool,
    /// Recompute when the resolution tier changes.
    pub resolution: bool,
    /// Recompute when the requested region changes.
    pub region: bool,
    /// Recompute on every request.
    pub volatile: bool,
}

impl CacheTriggers {
    /// React to frame, resolution and region.
    pub const ALL: Self = Self {
        timeline: true,
        resolution: true,
        region: true,
        volatile: false,
    };

    /// Depend on inputs only.
    pub const NONE: Self = Self {
        timeline: false,
        resolution: false,
        region: false,
        volatile: false,
    };

    /// Never reuse a cached result.
    pub const VOLATILE: Self = Self {
        volatile: true,
        ..Self::ALL
    };
}

impl Default for CacheTriggers {
    fn default() -> Self {
        Self::ALL
    }
}

/// Builds a node kind and declares its properties.
pub type NodeFactory = fn(&mut PropertyBuilder<'_>) -> GraphResult<Box<dyn NodeKind>>;

/// Factory for kind `K`, usable as a [`NodeFactory`].
pub fn build_boxed<K: NodeKind>(props: &mut PropertyBuilder<'_>) -> GraphResult<Box<dyn NodeKind>> {
    let kind: Box<dyn NodeKind> = Box::new(K::build(props)?);
    Ok(kind)
}

/// Behaviour of a node type.
///
/// A kind declares its properties once in [`NodeKind::build`] and keeps the typed handles.
/// The engine owns caching, key-frame resolution and texture lifetime; a kind only computes.
pub trait NodeKind: Any + fmt::Debug {
    /// Declare properties and construct the kind.
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self>
    where
        Self: Sized;

    /// Stable type tag used by the registry and documents.
    fn unique_name(&self) -> &'static str;

    /// Context fields that invalidate the cached result.
    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers::ALL
    }

    /// Compute the node's result. `Ok(None)` means "nothing to show".
    fn execute(&mut self, cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>>;

    /// Evaluate func output `output` for the sample in `cx` (or as a constant without one).
    fn evaluate_func(&self, output: usize, cx: &FuncContext<'_>) -> GraphResult<Value> {
        let _ = cx;
        Err(GraphError::evaluation(format!(
            "{} has no func output #{output}",
            self.unique_name()
        )))
    }

    /// Copy used by [`Node::duplicate`].
    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Err(GraphError::validation(format!(
            "{} cannot be duplicated",
            self.unique_name()
        )))
    }

    /// Kind-specific state for documents.
    fn serialize_additional_data(&self) -> GraphResult<Option<serde_json::Value>> {
        Ok(None)
    }

    /// Restore kind-specific state from a document.
    fn deserialize_additional_data(&mut self, data: &serde_json::Value) -> GraphResult<()> {
        let _ = data;
        Ok(())
    }

    /// Rebuild a key-frame payload from its document form.
    fn key_frame_payload_from_json(
        &self,
        data: &serde_json::Value,
    ) -> GraphResult<Box<dyn KeyFramePayload>> {
        let _ = data;
        Err(GraphError::serde(format!(
            "{} has no key frame payloads",
            self.unique_name()
        )))
    }

    /// Release kind-owned resources. Called once when the node is disposed.
    fn dispose(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct KeyFrameState {
    pub(crate) active: Option<KeyFrameId>,
    pub(crate) version: u64,
}

#[derive(Debug, Default)]
pub(crate) struct NodeCache {
    pub(crate) result: Option<Texture>,
    pub(crate) computed: bool,
    pub(crate) key: Option<ValidityKey>,
    pub(crate) key_frame: Option<KeyFrameState>,
    pub(crate) force_dirty: bool,
    pub(crate) execution_count: u64,
}

/// A node: identity, properties, key frames, cache state and its kind.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    display_name: String,
    type_name: &'static str,
    pub(crate) properties: PropertyStore,
    pub(crate) key_frames: KeyFrameSet,
    pub(crate) pool: TexturePool,
    pub(crate) kind: Option<Box<dyn NodeKind>>,
    pub(crate) cache: NodeCache,
    disposed: bool,
}

impl Node {
    /// Create a node of kind `K`.
    pub fn new<K: NodeKind>() -> GraphResult<Self> {
        Self::from_factory(build_boxed::<K>)
    }

    /// Create a node from a registry factory.
    pub fn from_factory(factory: NodeFactory) -> GraphResult<Self> {
        let mut properties = PropertyStore::default();
        let kind = factory(&mut PropertyBuilder::new(&mut properties))?;
        let type_name = kind.unique_name();
        Ok(Self {
            id: NodeId::new(),
            display_name: type_name.to_string(),
            type_name,
            properties,
            key_frames: KeyFrameSet::new(),
            pool: TexturePool::new(),
            kind: Some(kind),
            cache: NodeCache::default(),
            disposed: false,
        })
    }

    /// Replace the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub(crate) fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// Node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Rename.
    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = name.into();
    }

    /// Type tag of the kind.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Inputs and outputs.
    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    /// Address of the input named `name`.
    pub fn input(&self, name: &str) -> GraphResult<InputRef> {
        let index = self
            .properties
            .input_index(name)
            .ok_or_else(|| GraphError::unknown_property(format!("{}.{name}", self.type_name)))?;
        Ok(InputRef {
            node: self.id,
            index,
        })
    }

    /// Address of the output named `name`.
    pub fn output(&self, name: &str) -> GraphResult<OutputRef> {
        let index = self
            .properties
            .output_index(name)
            .ok_or_else(|| GraphError::unknown_property(format!("{}.{name}", self.type_name)))?;
        Ok(OutputRef {
            node: self.id,
            index,
        })
    }

    /// Effective value of the input named `name`.
    pub fn input_value(&self, name: &str) -> GraphResult<&Value> {
        let r = self.input(name)?;
        Ok(self.properties.input(r.index)?.value())
    }

    /// Last value of the output named `name`.
    pub fn output_value(&self, name: &str) -> GraphResult<&Value> {
        let r = self.output(name)?;
        Ok(self.properties.output(r.index)?.value())
    }

    /// Set the default value of the input named `name`.
    pub fn set_input_value<T: PropertyType>(&mut self, name: &str, value: T) -> GraphResult<()> {
        let r = self.input(name)?;
        self.properties.set_input_value(r.index, value.into_value())
    }

    /// The kind as a trait object. `None` while the node is executing.
    pub fn kind(&self) -> Option<&dyn NodeKind> {
        self.kind.as_deref()
    }

    /// Return `true` when the kind is a `K`.
    pub fn kind_is<K: NodeKind>(&self) -> bool {
        self.kind_as::<K>().is_some()
    }

    /// Typed view of the kind.
    pub fn kind_as<K: NodeKind>(&self) -> Option<&K> {
        let any: &(dyn Any + 'static) = self.kind.as_deref()?;
        any.downcast_ref::<K>()
    }

    /// Typed mutable view of the kind. Marks the node dirty.
    pub fn kind_as_mut<K: NodeKind>(&mut self) -> Option<&mut K> {
        if !self.kind_is::<K>() {
            return None;
        }
        self.cache.force_dirty = true;
        let any: &mut (dyn Any + 'static) = self.kind.as_deref_mut()?;
        any.downcast_mut::<K>()
    }

    /// Key frames of this node.
    pub fn key_frames(&self) -> &KeyFrameSet {
        &self.key_frames
    }

    /// Mutable key frames. Edits are picked up by the next evaluation.
    pub fn key_frames_mut(&mut self) -> &mut KeyFrameSet {
        &mut self.key_frames
    }

    /// Result of the last successful compute.
    pub fn cached_result(&self) -> Option<&Texture> {
        self.cache.result.as_ref()
    }

    /// Number of times the kind's compute step ran.
    pub fn execution_count(&self) -> u64 {
        self.cache.execution_count
    }

    /// Counters of the node's texture pool.
    pub fn pool_stats(&self) -> TexturePoolStats {
        self.pool.stats()
    }

    /// Force a recompute on the next evaluation.
    pub fn mark_dirty(&mut self) {
        self.cache.force_dirty = true;
    }

    /// Return `true` once disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release pooled textures, cached results, texture values and key frames.
    ///
    /// Safe to call repeatedly; only the first call does anything.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(kind) = self.kind.as_mut() {
            kind.dispose();
        }
        let released = self.pool.release_all();
        self.cache.result = None;
        self.cache.computed = false;
        self.properties.clear_textures();
        self.key_frames.clear();
        tracing::trace!(node = %self.id, released, "node disposed");
    }

    /// Copy with a new identity and no connections.
    ///
    /// Default input values and key frames are copied; the kind is cloned through
    /// [`NodeKind::clone_kind`].
    pub fn duplicate(&self) -> GraphResult<Self> {
        if self.disposed {
            return Err(GraphError::disposed(format!("node {}", self.id)));
        }
        let kind = self
            .kind
            .as_ref()
            .ok_or_else(|| GraphError::evaluation("cannot duplicate a node while it executes"))?
            .clone_kind()?;
        Ok(Self {
            id: NodeId::new(),
            display_name: self.display_name.clone(),
            type_name: self.type_name,
            properties: self.properties.duplicate_unconnected(),
            key_frames: self.key_frames.try_duplicate()?,
            pool: TexturePool::new(),
            kind: Some(kind),
            cache: NodeCache::default(),
            disposed: false,
        })
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Everything a kind can touch while computing.
///
/// The graph is borrowed immutably; outputs written here are applied after the compute step
/// returns. The node's own kind is absent from the graph for the duration.
pub struct ExecuteCx<'a> {
    graph: &'a NodeGraph,
    node: &'a Node,
    render: &'a RenderContext,
    pool: &'a mut TexturePool,
    active_key_frame: Option<&'a KeyFrameData>,
    writes: Vec<(usize, Value)>,
}

impl<'a> ExecuteCx<'a> {
    pub(crate) fn new(
        graph: &'a NodeGraph,
        node: &'a Node,
        render: &'a RenderContext,
        pool: &'a mut TexturePool,
        active_key_frame: Option<&'a KeyFrameData>,
    ) -> Self {
        Self {
            graph,
            node,
            render,
            pool,
            active_key_frame,
            writes: Vec::new(),
        }
    }

    /// Id of the executing node.
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// The executing node.
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// The graph being evaluated.
    pub fn graph(&self) -> &'a NodeGraph {
        self.graph
    }

    /// The request's render context.
    pub fn render(&self) -> &'a RenderContext {
        self.render
    }

    /// Size results are allocated at: the document size scaled to the resolution tier.
    pub fn output_size(&self) -> PixelSize {
        self.render.scaled_document_size()
    }

    /// Processing color space for a node-level override.
    pub fn color_space(&self, choice: ColorSpaceType) -> ColorSpace {
        choice.resolve(self.render.color_space)
    }

    /// Active key frame for the request's frame.
    pub fn active_key_frame(&self) -> Option<&'a KeyFrameData> {
        self.active_key_frame
    }

    /// Effective value of a value input.
    pub fn input<T: PropertyType>(&self, handle: InputHandle<T>) -> GraphResult<T> {
        let slot = self.node.properties.input(handle.index())?;
        expect_value(slot.value(), slot.name())
    }

    /// Func input evaluated without a sample context.
    pub fn func_constant<T: PropertyType>(&self, handle: FuncInputHandle<T>) -> GraphResult<T> {
        self.func_value(handle, None)
    }

    /// Func input evaluated at `sample`.
    pub fn sample<T: PropertyType>(
        &self,
        handle: FuncInputHandle<T>,
        sample: SamplePoint,
    ) -> GraphResult<T> {
        self.func_value(handle, Some(sample))
    }

    fn func_value<T: PropertyType>(
        &self,
        handle: FuncInputHandle<T>,
        sample: Option<SamplePoint>,
    ) -> GraphResult<T> {
        let id = self.node.id();
        let value =
            func::resolve_input(self.graph, self.render, id, handle.index(), sample, &[id])?;
        let slot = self.node.properties.input(handle.index())?;
        expect_value(&value, slot.name())
    }

    /// Write a value output. Applied when the compute step returns successfully.
    pub fn set_output<T: PropertyType>(&mut self, handle: OutputHandle<T>, value: T) {
        self.writes.push((handle.index(), value.into_value()));
    }

    /// Cleared pooled texture for `slot`.
    pub fn request_texture(
        &mut self,
        slot: u32,
        size: PixelSize,
        color_space: ColorSpace,
    ) -> GraphResult<Texture> {
        self.pool.request_texture(slot, size, color_space, true)
    }

    /// Pooled texture for `slot`, keeping previous content when reused.
    pub fn request_texture_uncleared(
        &mut self,
        slot: u32,
        size: PixelSize,
        color_space: ColorSpace,
    ) -> GraphResult<Texture> {
        self.pool.request_texture(slot, size, color_space, false)
    }

    pub(crate) fn into_writes(self) -> Vec<(usize, Value)> {
        self.writes
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/node.rs"]
mod tests;
