//! Node-graph render engine for layered image documents.
//!
//! A [`NodeGraph`] holds nodes whose typed properties are joined by connections. Asking
//! the graph for its output pulls every node the output depends on, reusing each node's
//! cached result unless its inputs, its active key frame or the relevant parts of the
//! [`RenderContext`] changed.

#![forbid(unsafe_code)]

pub mod animation;
pub mod eval;
pub mod foundation;
pub mod graph;
pub mod nodes;
pub mod render;

pub use animation::ease::Ease;
pub use animation::keyframe::{KeyFrameData, KeyFrameId, KeyFramePayload, KeyFrameSet};
pub use eval::context::{InputSnapshot, KeyModifiers, RenderContext};
pub use eval::func::{FuncContext, SamplePoint};
pub use foundation::core::{
    KeyFrameTime, NodeId, PixelRegion, PixelSize, Point, Rect, ResolutionTier, Rgba8Premul, Vec2,
};
pub use foundation::error::{GraphError, GraphResult};
pub use graph::document::GraphDocument;
pub use graph::node::{CacheTriggers, ExecuteCx, Node, NodeKind};
pub use graph::property::{InputRef, OutputRef, PropertyBuilder, Value, ValueType};
pub use graph::registry::NodeRegistry;
pub use graph::{GraphOpts, NodeGraph, Traversal};
pub use render::color::{Color, ColorSpace, ColorSpaceType};
pub use render::composite::BlendMode;
pub use render::frame::FrameRGBA;
pub use render::surface::{Paint, Sampling, Surface, Texture};
