//! Static table of node types, used to create nodes by type tag.

use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::node::{Node, NodeFactory, NodeKind, build_boxed};
use crate::nodes;
use std::collections::BTreeMap;

/// One registered node type.
#[derive(Clone, Copy, Debug)]
pub struct NodeTypeInfo {
    /// Type tag, equal to [`NodeKind::unique_name`].
    pub unique_name: &'static str,
    /// Name shown in menus.
    pub display_name: &'static str,
    /// Menu category.
    pub category: &'static str,
    /// Constructor.
    pub factory: NodeFactory,
}

/// Node types by tag.
#[derive(Clone, Debug, Default)]
pub struct NodeRegistry {
    types: BTreeMap<&'static str, NodeTypeInfo>,
}

impl NodeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in kind.
    pub fn builtin() -> GraphResult<Self> {
        let mut r = Self::new();
        r.register::<nodes::Output>("Output", "Output")?;
        r.register::<nodes::FlatColor>("Flat color", "Image")?;
        r.register::<nodes::Tint>("Tint", "Color")?;
        r.register::<nodes::Merge>("Merge", "Image")?;
        r.register::<nodes::ImageLayer>("Image layer", "Layers")?;
        r.register::<nodes::Rectangle>("Rectangle", "Shapes")?;
        r.register::<nodes::Coordinate>("Coordinate", "Input")?;
        r.register::<nodes::SeparateVec2>("Separate vector", "Numbers")?;
        r.register::<nodes::CombineColor>("Combine color", "Color")?;
        r.register::<nodes::Easing>("Easing", "Numbers")?;
        r.register::<nodes::ModifyImageLeft>("Modify image start", "Image")?;
        r.register::<nodes::ModifyImageRight>("Modify image end", "Image")?;
        r.register::<nodes::NestedDocument>("Nested document", "Layers")?;
        Ok(r)
    }

    /// Register kind `K` under its own [`NodeKind::unique_name`].
    ///
    /// The tag is read from a freshly built instance, so registration fails when `K` cannot
    /// be built or its tag is already taken.
    pub fn register<K: NodeKind>(
        &mut self,
        display_name: &'static str,
        category: &'static str,
    ) -> GraphResult<&'static str> {
        let factory: NodeFactory = build_boxed::<K>;
        let unique_name = Node::from_factory(factory)?.type_name();
        if self.types.contains_key(unique_name) {
            return Err(GraphError::validation(format!(
                "node type '{unique_name}' is already registered"
            )));
        }
        self.types.insert(
            unique_name,
            NodeTypeInfo {
                unique_name,
                display_name,
                category,
                factory,
            },
        );
        Ok(unique_name)
    }

    /// Build a node of type `unique_name`.
    pub fn create(&self, unique_name: &str) -> GraphResult<Node> {
        let info = self.get(unique_name)?;
        Ok(Node::from_factory(info.factory)?.with_display_name(info.display_name))
    }

    /// Registration of `unique_name`.
    pub fn get(&self, unique_name: &str) -> GraphResult<&NodeTypeInfo> {
        self.types
            .get(unique_name)
            .ok_or_else(|| GraphError::UnknownNodeType(unique_name.to_string()))
    }

    /// Every registration, sorted by tag.
    pub fn types(&self) -> impl Iterator<Item = &NodeTypeInfo> {
        self.types.values()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Return `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/registry.rs"]
mod tests;
