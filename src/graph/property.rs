//! Typed node properties.
//!
//! Every node owns a [`PropertyStore`] with ordered inputs and outputs. Node kinds declare
//! their properties through a [`PropertyBuilder`] and keep the returned typed handles, which
//! are plain indices into the store and therefore stay valid for duplicated nodes.
//!
//! Two flavours exist for both directions:
//!
//! - value properties carry a materialized [`Value`];
//! - func properties carry a procedure evaluated per sample through a
//!   [`FuncContext`](crate::eval::func::FuncContext).

use crate::animation::ease::Ease;
use crate::foundation::core::{NodeId, Vec2};
use crate::foundation::error::{GraphError, GraphResult};
use crate::render::color::{Color, ColorSpaceType};
use crate::render::composite::BlendMode;
use crate::render::surface::Texture;
use smallvec::SmallVec;
use std::fmt;
use std::marker::PhantomData;

/// Value type tag used for connection type checks.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum ValueType {
    /// `bool`.
    Bool,
    /// `i64`.
    Int,
    /// `f64`.
    Float,
    /// [`Vec2`].
    Vec2,
    /// [`Color`].
    Color,
    /// `String`.
    String,
    /// [`BlendMode`].
    BlendMode,
    /// [`Ease`].
    Ease,
    /// [`ColorSpaceType`].
    ColorSpace,
    /// `Option<Texture>`.
    Texture,
}

/// Dynamically typed property value.
#[derive(Clone, Debug)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// 2D vector.
    Vec2(Vec2),
    /// Straight-alpha color.
    Color(Color),
    /// Text.
    String(String),
    /// Blend mode.
    BlendMode(BlendMode),
    /// Easing curve.
    Ease(Ease),
    /// Color space choice.
    ColorSpace(ColorSpaceType),
    /// Texture handle, `None` when empty.
    Texture(Option<Texture>),
}

impl Value {
    /// Type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Vec2(_) => ValueType::Vec2,
            Self::Color(_) => ValueType::Color,
            Self::String(_) => ValueType::String,
            Self::BlendMode(_) => ValueType::BlendMode,
            Self::Ease(_) => ValueType::Ease,
            Self::ColorSpace(_) => ValueType::ColorSpace,
            Self::Texture(_) => ValueType::Texture,
        }
    }

    /// Zero value of a type.
    pub fn default_for(ty: ValueType) -> Self {
        match ty {
            ValueType::Bool => Self::Bool(false),
            ValueType::Int => Self::Int(0),
            ValueType::Float => Self::Float(0.0),
            ValueType::Vec2 => Self::Vec2(Vec2::ZERO),
            ValueType::Color => Self::Color(Color::TRANSPARENT),
            ValueType::String => Self::String(String::new()),
            ValueType::BlendMode => Self::BlendMode(BlendMode::default()),
            ValueType::Ease => Self::Ease(Ease::default()),
            ValueType::ColorSpace => Self::ColorSpace(ColorSpaceType::default()),
            ValueType::Texture => Self::Texture(None),
        }
    }

    /// Texture carried by this value, if any.
    pub fn as_texture(&self) -> Option<&Texture> {
        match self {
            Self::Texture(t) => t.as_ref(),
            _ => None,
        }
    }
}

/// Rust types that can be stored in a property.
pub trait PropertyType: Clone + 'static {
    /// Type tag used for connection checks.
    const VALUE_TYPE: ValueType;

    /// Wrap into a [`Value`].
    fn into_value(self) -> Value;

    /// Unwrap from a [`Value`] of the matching type.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! property_type {
    ($ty:ty, $variant:ident) => {
        impl PropertyType for $ty {
            const VALUE_TYPE: ValueType = ValueType::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

property_type!(bool, Bool);
property_type!(i64, Int);
property_type!(f64, Float);
property_type!(Vec2, Vec2);
property_type!(Color, Color);
property_type!(String, String);
property_type!(BlendMode, BlendMode);
property_type!(Ease, Ease);
property_type!(ColorSpaceType, ColorSpace);
property_type!(Option<Texture>, Texture);

pub(crate) fn expect_value<T: PropertyType>(value: &Value, name: &str) -> GraphResult<T> {
    T::from_value(value).ok_or_else(|| {
        GraphError::evaluation(format!(
            "property '{name}' holds {:?}, expected {:?}",
            value.value_type(),
            T::VALUE_TYPE
        ))
    })
}

/// Whether a property carries a value or a per-sample procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PropertyKind {
    /// Materialized value.
    Value,
    /// Procedure evaluated per sample.
    Func,
}

/// Address of an input property inside a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputRef {
    /// Owning node.
    pub node: NodeId,
    /// Index in the node's inputs.
    pub index: usize,
}

/// Address of an output property inside a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputRef {
    /// Owning node.
    pub node: NodeId,
    /// Index in the node's outputs.
    pub index: usize,
}

macro_rules! property_handle {
    ($(#[$doc:meta])* $name:ident => $target:ident) => {
        $(#[$doc])*
        pub struct $name<T> {
            index: usize,
            _marker: PhantomData<fn() -> T>,
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.index).finish()
            }
        }

        impl<T> $name<T> {
            fn new(index: usize) -> Self {
                Self {
                    index,
                    _marker: PhantomData,
                }
            }

            /// Position in the node's property list.
            pub fn index(self) -> usize {
                self.index
            }

            /// Address of this property on `node`.
            pub fn of(self, node: NodeId) -> $target {
                $target {
                    node,
                    index: self.index,
                }
            }
        }
    };
}

property_handle!(
    /// Typed handle to a value input.
    InputHandle => InputRef
);
property_handle!(
    /// Typed handle to a value output.
    OutputHandle => OutputRef
);
property_handle!(
    /// Typed handle to a func input.
    FuncInputHandle => InputRef
);
property_handle!(
    /// Typed handle to a func output.
    FuncOutputHandle => OutputRef
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct InputMarker {
    pub(crate) version: u64,
    pub(crate) source: Option<(OutputRef, u64)>,
}

/// An input property: default value, effective value and at most one incoming connection.
#[derive(Clone, Debug)]
pub struct InputSlot {
    name: String,
    label: String,
    value_type: ValueType,
    kind: PropertyKind,
    pub(crate) non_overridden: Value,
    pub(crate) value: Value,
    pub(crate) connection: Option<OutputRef>,
    pub(crate) version: u64,
    pub(crate) read_marker: Option<InputMarker>,
}

impl InputSlot {
    /// Unique name within the node's inputs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Accepted value type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Value or func input.
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Value seen by the node: the upstream value when connected, the default otherwise.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Default/user value restored when the connection is removed.
    pub fn non_overridden_value(&self) -> &Value {
        &self.non_overridden
    }

    /// Incoming connection.
    pub fn connection(&self) -> Option<OutputRef> {
        self.connection
    }

    /// Return `true` when an output feeds this input.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub(crate) fn marker(&self, source_version: Option<u64>) -> InputMarker {
        InputMarker {
            version: self.version,
            source: self.connection.zip(source_version),
        }
    }

    pub(crate) fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

/// An output property: produced value plus the inputs it feeds.
#[derive(Clone, Debug)]
pub struct OutputSlot {
    name: String,
    label: String,
    value_type: ValueType,
    kind: PropertyKind,
    pub(crate) value: Value,
    pub(crate) version: u64,
    pub(crate) connections: SmallVec<[InputRef; 4]>,
}

impl OutputSlot {
    /// Unique name within the node's outputs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Produced value type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Value or func output.
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Last materialized value. Func outputs keep their type's zero value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Bumped every time the owning node recomputes.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Inputs fed by this output.
    pub fn connections(&self) -> &[InputRef] {
        &self.connections
    }
}

/// Ordered inputs and outputs of one node.
#[derive(Clone, Debug, Default)]
pub struct PropertyStore {
    inputs: Vec<InputSlot>,
    outputs: Vec<OutputSlot>,
}

impl PropertyStore {
    /// All inputs in declaration order.
    pub fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    /// All outputs in declaration order.
    pub fn outputs(&self) -> &[OutputSlot] {
        &self.outputs
    }

    /// Input by index.
    pub fn input(&self, index: usize) -> GraphResult<&InputSlot> {
        self.inputs
            .get(index)
            .ok_or_else(|| GraphError::unknown_property(format!("input #{index}")))
    }

    /// Output by index.
    pub fn output(&self, index: usize) -> GraphResult<&OutputSlot> {
        self.outputs
            .get(index)
            .ok_or_else(|| GraphError::unknown_property(format!("output #{index}")))
    }

    pub(crate) fn input_mut(&mut self, index: usize) -> GraphResult<&mut InputSlot> {
        self.inputs
            .get_mut(index)
            .ok_or_else(|| GraphError::unknown_property(format!("input #{index}")))
    }

    pub(crate) fn output_mut(&mut self, index: usize) -> GraphResult<&mut OutputSlot> {
        self.outputs
            .get_mut(index)
            .ok_or_else(|| GraphError::unknown_property(format!("output #{index}")))
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut [InputSlot] {
        &mut self.inputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut [OutputSlot] {
        &mut self.outputs
    }

    /// Index of the input named `name`.
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p.name == name)
    }

    /// Index of the output named `name`.
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|p| p.name == name)
    }

    /// Set the default value of an input. The effective value follows unless connected.
    pub(crate) fn set_input_value(&mut self, index: usize, value: Value) -> GraphResult<()> {
        let slot = self.input_mut(index)?;
        if value.value_type() != slot.value_type {
            return Err(GraphError::validation(format!(
                "input '{}' expects {:?}, got {:?}",
                slot.name,
                slot.value_type,
                value.value_type()
            )));
        }
        if slot.connection.is_none() {
            slot.value = value.clone();
        }
        slot.non_overridden = value;
        slot.bump();
        Ok(())
    }

    /// Copy for a duplicated node: defaults kept, connections and bookkeeping dropped.
    pub(crate) fn duplicate_unconnected(&self) -> Self {
        let inputs = self
            .inputs
            .iter()
            .map(|slot| InputSlot {
                value: slot.non_overridden.clone(),
                connection: None,
                version: 0,
                read_marker: None,
                ..slot.clone()
            })
            .collect();
        let outputs = self
            .outputs
            .iter()
            .map(|slot| OutputSlot {
                value: Value::default_for(slot.value_type),
                version: 0,
                connections: SmallVec::new(),
                ..slot.clone()
            })
            .collect();
        Self { inputs, outputs }
    }

    /// Drop every texture reference held by the store.
    pub(crate) fn clear_textures(&mut self) {
        for slot in &mut self.inputs {
            if slot.value_type == ValueType::Texture {
                slot.value = Value::Texture(None);
                slot.non_overridden = Value::Texture(None);
            }
        }
        for slot in &mut self.outputs {
            if slot.value_type == ValueType::Texture {
                slot.value = Value::Texture(None);
            }
        }
    }
}

/// Declares the properties of a node while its kind is being built.
pub struct PropertyBuilder<'a> {
    store: &'a mut PropertyStore,
}

impl<'a> PropertyBuilder<'a> {
    pub(crate) fn new(store: &'a mut PropertyStore) -> Self {
        Self { store }
    }

    fn push_input<T: PropertyType>(
        &mut self,
        name: &str,
        label: &str,
        default: T,
        kind: PropertyKind,
    ) -> GraphResult<usize> {
        if self.store.input_index(name).is_some() {
            return Err(GraphError::DuplicateProperty(format!("input '{name}'")));
        }
        let value = default.into_value();
        self.store.inputs.push(InputSlot {
            name: name.to_string(),
            label: label.to_string(),
            value_type: T::VALUE_TYPE,
            kind,
            non_overridden: value.clone(),
            value,
            connection: None,
            version: 0,
            read_marker: None,
        });
        Ok(self.store.inputs.len() - 1)
    }

    fn push_output(
        &mut self,
        name: &str,
        label: &str,
        value: Value,
        kind: PropertyKind,
    ) -> GraphResult<usize> {
        if self.store.output_index(name).is_some() {
            return Err(GraphError::DuplicateProperty(format!("output '{name}'")));
        }
        self.store.outputs.push(OutputSlot {
            name: name.to_string(),
            label: label.to_string(),
            value_type: value.value_type(),
            kind,
            value,
            version: 0,
            connections: SmallVec::new(),
        });
        Ok(self.store.outputs.len() - 1)
    }

    /// Declare a value input with a default.
    pub fn create_input<T: PropertyType>(
        &mut self,
        name: &str,
        label: &str,
        default: T,
    ) -> GraphResult<InputHandle<T>> {
        self.push_input(name, label, default, PropertyKind::Value)
            .map(InputHandle::new)
    }

    /// Declare a func input whose constant is used when nothing is connected.
    pub fn create_func_input<T: PropertyType>(
        &mut self,
        name: &str,
        label: &str,
        default: T,
    ) -> GraphResult<FuncInputHandle<T>> {
        self.push_input(name, label, default, PropertyKind::Func)
            .map(FuncInputHandle::new)
    }

    /// Declare a value output with an initial value.
    pub fn create_output<T: PropertyType>(
        &mut self,
        name: &str,
        label: &str,
        initial: T,
    ) -> GraphResult<OutputHandle<T>> {
        self.push_output(name, label, initial.into_value(), PropertyKind::Value)
            .map(OutputHandle::new)
    }

    /// Declare a func output.
    pub fn create_func_output<T: PropertyType>(
        &mut self,
        name: &str,
        label: &str,
    ) -> GraphResult<FuncOutputHandle<T>> {
        self.push_output(
            name,
            label,
            Value::default_for(T::VALUE_TYPE),
            PropertyKind::Func,
        )
        .map(FuncOutputHandle::new)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/property.rs"]
mod tests;
