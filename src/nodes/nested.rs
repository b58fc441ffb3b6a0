use crate::foundation::core::PixelSize;
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::NodeGraph;
use crate::graph::document::GraphDocument;
use crate::graph::node::{ExecuteCx, NodeKind};
use crate::graph::property::{InputHandle, OutputHandle, PropertyBuilder};
use crate::graph::registry::NodeRegistry;
use crate::render::color::ColorSpaceType;
use crate::render::composite::BlendMode;
use crate::render::surface::{Paint, Texture};

const DEFAULT_DOCUMENT_SIZE: PixelSize = PixelSize::new(64, 64);

#[derive(serde::Serialize, serde::Deserialize)]
struct NestedData {
    document_size: PixelSize,
    graph: GraphDocument,
}

/// Evaluates an embedded graph and composites its output at the origin.
///
/// The embedded graph sees the parent's request with its own document size and the frame
/// shifted by `FrameOffset`.
#[derive(Debug)]
pub struct NestedDocument {
    frame_offset: InputHandle<i64>,
    opacity: InputHandle<f64>,
    output: OutputHandle<Option<Texture>>,
    graph: NodeGraph,
    document_size: PixelSize,
}

impl NestedDocument {
    /// The embedded graph.
    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    /// Mutable embedded graph. Reach it through
    /// [`Node::kind_as_mut`](crate::graph::node::Node::kind_as_mut) so the owner recomputes.
    pub fn graph_mut(&mut self) -> &mut NodeGraph {
        &mut self.graph
    }

    /// Document size of the embedded graph.
    pub fn document_size(&self) -> PixelSize {
        self.document_size
    }

    /// Replace the embedded graph. The previous one is disposed.
    pub fn set_graph(&mut self, graph: NodeGraph, document_size: PixelSize) {
        self.graph.dispose();
        self.graph = graph;
        self.document_size = document_size;
    }
}

impl NodeKind for NestedDocument {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            frame_offset: props.create_input("FrameOffset", "Frame offset", 0)?,
            opacity: props.create_input("Opacity", "Opacity", 1.0)?,
            output: props.create_output("Output", "Output", None)?,
            graph: NodeGraph::new(),
            document_size: DEFAULT_DOCUMENT_SIZE,
        })
    }

    fn unique_name(&self) -> &'static str {
        "NestedDocument"
    }

    fn execute(&mut self, cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        if self.graph.output_node().is_none() {
            cx.set_output(self.output, None);
            return Ok(None);
        }
        let offset = i32::try_from(cx.input(self.frame_offset)?)
            .map_err(|_| GraphError::validation("frame offset out of range"))?;
        let frame = cx.render().frame_time.frame.saturating_add(offset);
        let nested = cx
            .render()
            .for_frame(frame)
            .with_document_size(self.document_size)
            .with_region(None)
            .with_target(None);
        let Some(inner) = self.graph.pull_output(&nested)? else {
            cx.set_output(self.output, None);
            return Ok(None);
        };

        let opacity = cx.input(self.opacity)? as f32;
        let space = cx.color_space(ColorSpaceType::Inherit);
        let out = cx.request_texture(0, cx.output_size(), space)?;
        {
            let src = inner.borrow()?;
            out.borrow_mut()?
                .draw_surface(&src, (0, 0), &Paint::new(BlendMode::Normal, opacity))?;
        }
        cx.set_output(self.output, Some(out.clone()));
        Ok(Some(out))
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        let registry = NodeRegistry::builtin()?;
        let graph = NodeGraph::from_document(&self.graph.to_document()?, &registry)?;
        Ok(Box::new(Self {
            graph,
            document_size: self.document_size,
            ..*self
        }))
    }

    fn serialize_additional_data(&self) -> GraphResult<Option<serde_json::Value>> {
        let data = NestedData {
            document_size: self.document_size,
            graph: self.graph.to_document()?,
        };
        serde_json::to_value(data)
            .map(Some)
            .map_err(|e| GraphError::serde(format!("nested document: {e}")))
    }

    fn deserialize_additional_data(&mut self, data: &serde_json::Value) -> GraphResult<()> {
        let data: NestedData = serde_json::from_value(data.clone())
            .map_err(|e| GraphError::serde(format!("nested document: {e}")))?;
        let graph = NodeGraph::from_document(&data.graph, &NodeRegistry::builtin()?)?;
        self.set_graph(graph, data.document_size);
        Ok(())
    }

    fn dispose(&mut self) {
        self.graph.dispose();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/nested.rs"]
mod tests;
