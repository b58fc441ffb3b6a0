//! Serializable snapshot of a graph.
//!
//! A [`GraphDocument`] records node identities, type tags, non-texture input values,
//! connections, key frames and kind-specific data. Textures are never stored; they are
//! recomputed on the next evaluation.

use crate::animation::ease::Ease;
use crate::animation::keyframe::{KeyFrameData, KeyFrameId};
use crate::foundation::core::{NodeId, Vec2};
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::NodeGraph;
use crate::graph::node::Node;
use crate::graph::property::Value;
use crate::graph::registry::NodeRegistry;
use crate::render::color::{Color, ColorSpaceType};
use crate::render::composite::BlendMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format version written by [`NodeGraph::to_document`].
pub const DOCUMENT_VERSION: u32 = 1;

/// Whole-graph snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Format version.
    pub version: u32,
    /// Nodes in graph order.
    pub nodes: Vec<NodeDocument>,
    /// Designated output node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<NodeId>,
    /// Alternate outputs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub named_outputs: BTreeMap<String, NodeId>,
}

/// One node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Node id.
    pub id: NodeId,
    /// Registry type tag.
    pub unique_name: String,
    /// Display name.
    pub display_name: String,
    /// Inputs with a stored value or a connection.
    #[serde(default)]
    pub inputs: Vec<InputDocument>,
    /// Key frames in insertion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_frames: Vec<KeyFrameDocument>,
    /// Whether the first key frame covers frames no key frame contains.
    #[serde(default)]
    pub fallback_to_base: bool,
    /// Data from [`NodeKind::serialize_additional_data`](crate::graph::node::NodeKind::serialize_additional_data).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<serde_json::Value>,
}

/// One input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputDocument {
    /// Input name.
    pub name: String,
    /// Non-overridden value; absent for textures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<StoredValue>,
    /// Incoming connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionDocument>,
}

/// Source of a connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDocument {
    /// Producing node.
    pub node: NodeId,
    /// Output name on the producing node.
    pub output: String,
}

/// One key frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyFrameDocument {
    /// Key frame id.
    pub id: KeyFrameId,
    /// First frame.
    pub start_frame: i32,
    /// Length in frames.
    pub duration: i32,
    /// Visibility flag.
    pub is_visible: bool,
    /// Payload from [`KeyFramePayload::to_json`](crate::animation::keyframe::KeyFramePayload::to_json).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// Property value without textures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum StoredValue {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// 2D vector.
    Vec2(Vec2),
    /// Color.
    Color(Color),
    /// Text.
    String(String),
    /// Blend mode.
    BlendMode(BlendMode),
    /// Easing curve.
    Ease(Ease),
    /// Color space choice.
    ColorSpace(ColorSpaceType),
}

impl StoredValue {
    /// Storable form of `value`; `None` for textures.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Bool(v) => Self::Bool(*v),
            Value::Int(v) => Self::Int(*v),
            Value::Float(v) => Self::Float(*v),
            Value::Vec2(v) => Self::Vec2(*v),
            Value::Color(v) => Self::Color(*v),
            Value::String(v) => Self::String(v.clone()),
            Value::BlendMode(v) => Self::BlendMode(*v),
            Value::Ease(v) => Self::Ease(*v),
            Value::ColorSpace(v) => Self::ColorSpace(*v),
            Value::Texture(_) => return None,
        })
    }

    /// Property value.
    pub fn into_value(self) -> Value {
        match self {
            Self::Bool(v) => Value::Bool(v),
            Self::Int(v) => Value::Int(v),
            Self::Float(v) => Value::Float(v),
            Self::Vec2(v) => Value::Vec2(v),
            Self::Color(v) => Value::Color(v),
            Self::String(v) => Value::String(v),
            Self::BlendMode(v) => Value::BlendMode(v),
            Self::Ease(v) => Value::Ease(v),
            Self::ColorSpace(v) => Value::ColorSpace(v),
        }
    }
}

impl GraphDocument {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> GraphResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GraphError::serde(format!("graph document: {e}")))
    }

    /// Parse JSON produced by [`GraphDocument::to_json`].
    pub fn from_json(json: &str) -> GraphResult<Self> {
        serde_json::from_str(json).map_err(|e| GraphError::serde(format!("graph document: {e}")))
    }
}

fn node_document(graph: &NodeGraph, node: &Node) -> GraphResult<NodeDocument> {
    let kind = node.kind().ok_or_else(|| {
        GraphError::evaluation(format!("node {} is executing", node.id()))
    })?;
    let mut inputs = Vec::new();
    for slot in node.properties().inputs() {
        let connection = match slot.connection() {
            Some(c) => Some(ConnectionDocument {
                node: c.node,
                output: graph
                    .try_node(c.node)?
                    .properties()
                    .output(c.index)?
                    .name()
                    .to_string(),
            }),
            None => None,
        };
        inputs.push(InputDocument {
            name: slot.name().to_string(),
            value: StoredValue::from_value(slot.non_overridden_value()),
            connection,
        });
    }
    let key_frames = node
        .key_frames()
        .iter()
        .map(|k| {
            Ok(KeyFrameDocument {
                id: k.id(),
                start_frame: k.start_frame(),
                duration: k.duration(),
                is_visible: k.is_visible(),
                payload: k.payload().map(|p| p.get().to_json()).transpose()?,
            })
        })
        .collect::<GraphResult<Vec<_>>>()?;
    Ok(NodeDocument {
        id: node.id(),
        unique_name: node.type_name().to_string(),
        display_name: node.display_name().to_string(),
        inputs,
        key_frames,
        fallback_to_base: node.key_frames().fallback_to_base(),
        additional_data: kind.serialize_additional_data()?,
    })
}

fn build_node(doc: &NodeDocument, registry: &NodeRegistry) -> GraphResult<Node> {
    let mut node = registry
        .create(&doc.unique_name)?
        .with_id(doc.id)
        .with_display_name(doc.display_name.clone());
    for input in &doc.inputs {
        if let Some(value) = &input.value {
            let index = node.properties().input_index(&input.name).ok_or_else(|| {
                GraphError::unknown_property(format!("{}.{}", doc.unique_name, input.name))
            })?;
            node.properties
                .set_input_value(index, value.clone().into_value())?;
        }
    }
    let Some(kind) = node.kind.as_mut() else {
        return Err(GraphError::evaluation(format!("node {} is executing", doc.id)));
    };
    if let Some(data) = &doc.additional_data {
        kind.deserialize_additional_data(data)?;
    }
    let mut key_frames = Vec::with_capacity(doc.key_frames.len());
    for k in &doc.key_frames {
        let mut data = KeyFrameData::new(k.start_frame, k.duration)?
            .with_id(k.id)
            .with_visibility(k.is_visible);
        if let Some(payload) = &k.payload {
            data = data.with_boxed_payload(kind.key_frame_payload_from_json(payload)?);
        }
        key_frames.push(data);
    }
    let set = node.key_frames_mut();
    set.set_fallback_to_base(doc.fallback_to_base);
    for k in key_frames {
        set.add(k);
    }
    Ok(node)
}

impl NodeGraph {
    /// Snapshot of the graph.
    pub fn to_document(&self) -> GraphResult<GraphDocument> {
        self.ensure_live()?;
        let nodes = self
            .nodes()
            .map(|n| node_document(self, n))
            .collect::<GraphResult<Vec<_>>>()?;
        Ok(GraphDocument {
            version: DOCUMENT_VERSION,
            nodes,
            output: self.output_node(),
            named_outputs: self.named_outputs().clone(),
        })
    }

    /// Rebuild a graph, creating nodes through `registry`.
    ///
    /// Node and key-frame ids are preserved. Fails with
    /// [`GraphError::UnknownNodeType`] for tags `registry` does not know.
    pub fn from_document(doc: &GraphDocument, registry: &NodeRegistry) -> GraphResult<Self> {
        if doc.version > DOCUMENT_VERSION {
            return Err(GraphError::serde(format!(
                "document version {} is newer than supported version {DOCUMENT_VERSION}",
                doc.version
            )));
        }
        let mut graph = NodeGraph::new();
        for n in &doc.nodes {
            graph.add_node(build_node(n, registry)?)?;
        }
        for n in &doc.nodes {
            for input in &n.inputs {
                if let Some(c) = &input.connection {
                    let from = graph.try_node(c.node)?.output(&c.output)?;
                    let to = graph.try_node(n.id)?.input(&input.name)?;
                    graph.connect(from, to)?;
                }
            }
        }
        if let Some(id) = doc.output {
            graph.set_output_node(id)?;
        }
        for (name, id) in &doc.named_outputs {
            graph.set_named_output(name.clone(), *id)?;
        }
        tracing::debug!(nodes = graph.len(), "graph loaded from document");
        Ok(graph)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/document.rs"]
mod tests;
