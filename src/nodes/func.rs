//! Procedural func nodes. They produce no texture; consumers call their func outputs per
//! sample.

use crate::animation::ease::Ease;
use crate::eval::func::FuncContext;
use crate::foundation::core::Vec2;
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::node::{CacheTriggers, ExecuteCx, NodeKind};
use crate::graph::property::{
    FuncInputHandle, FuncOutputHandle, InputHandle, PropertyBuilder, PropertyType, Value,
};
use crate::render::surface::Texture;

fn no_output(kind: &str, output: usize) -> GraphError {
    GraphError::evaluation(format!("{kind} has no func output #{output}"))
}

/// Position of the current sample: `Position` in pixels, `Uv` normalized.
///
/// Both are zero when evaluated without a sample.
#[derive(Debug, Clone)]
pub struct Coordinate {
    position: FuncOutputHandle<Vec2>,
    uv: FuncOutputHandle<Vec2>,
}

impl NodeKind for Coordinate {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            position: props.create_func_output("Position", "Position")?,
            uv: props.create_func_output("Uv", "UV")?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "Coordinate"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers::NONE
    }

    fn execute(&mut self, _cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        Ok(None)
    }

    fn evaluate_func(&self, output: usize, cx: &FuncContext<'_>) -> GraphResult<Value> {
        let sample = cx.sample();
        let v = if output == self.position.index() {
            sample.map(|s| s.position.to_vec2())
        } else if output == self.uv.index() {
            sample.map(|s| s.uv)
        } else {
            return Err(no_output("Coordinate", output));
        };
        Ok(v.unwrap_or(Vec2::ZERO).into_value())
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }
}

/// Splits `Vector` into its `X` and `Y` components.
#[derive(Debug, Clone)]
pub struct SeparateVec2 {
    vector: FuncInputHandle<Vec2>,
    x: FuncOutputHandle<f64>,
    y: FuncOutputHandle<f64>,
}

impl NodeKind for SeparateVec2 {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            vector: props.create_func_input("Vector", "Vector", Vec2::ZERO)?,
            x: props.create_func_output("X", "X")?,
            y: props.create_func_output("Y", "Y")?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "SeparateVec2"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers::NONE
    }

    fn execute(&mut self, _cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        Ok(None)
    }

    fn evaluate_func(&self, output: usize, cx: &FuncContext<'_>) -> GraphResult<Value> {
        let v = cx.input(self.vector)?;
        if output == self.x.index() {
            Ok(v.x.into_value())
        } else if output == self.y.index() {
            Ok(v.y.into_value())
        } else {
            Err(no_output("SeparateVec2", output))
        }
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }
}

/// Applies an easing curve to `Value`, clamped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Easing {
    value: FuncInputHandle<f64>,
    ease: InputHandle<Ease>,
    result: FuncOutputHandle<f64>,
}

impl NodeKind for Easing {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            value: props.create_func_input("Value", "Value", 0.0)?,
            ease: props.create_input("Ease", "Ease", Ease::Linear)?,
            result: props.create_func_output("Result", "Result")?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "Easing"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers::NONE
    }

    fn execute(&mut self, _cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        Ok(None)
    }

    fn evaluate_func(&self, output: usize, cx: &FuncContext<'_>) -> GraphResult<Value> {
        if output != self.result.index() {
            return Err(no_output("Easing", output));
        }
        let t = cx.input(self.value)?.clamp(0.0, 1.0);
        let ease = cx.value_input(self.ease)?;
        Ok(ease.apply(t).into_value())
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/func.rs"]
mod tests;
