//! Flat fills, tinting and color construction.

use crate::eval::func::FuncContext;
use crate::foundation::core::{PixelSize, Vec2};
use crate::foundation::error::{GraphError, GraphResult};
use crate::foundation::math::mul_div255_u8;
use crate::graph::node::{CacheTriggers, ExecuteCx, NodeKind};
use crate::graph::property::{
    FuncInputHandle, FuncOutputHandle, InputHandle, OutputHandle, PropertyBuilder, PropertyType,
    Value,
};
use crate::render::color::{Color, ColorSpaceType};
use crate::render::surface::Texture;

/// Fills a rectangle anchored at the origin with a solid color.
///
/// `Size` is in document pixels and scaled to the resolution tier; a zero size fills the
/// whole document.
#[derive(Debug, Clone)]
pub struct FlatColor {
    color: InputHandle<Color>,
    size: InputHandle<Vec2>,
    output: OutputHandle<Option<Texture>>,
}

impl NodeKind for FlatColor {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            color: props.create_input("Color", "Color", Color::WHITE)?,
            size: props.create_input("Size", "Size", Vec2::ZERO)?,
            output: props.create_output("Output", "Output", None)?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "FlatColor"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers {
            resolution: true,
            ..CacheTriggers::NONE
        }
    }

    fn execute(&mut self, cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        let color = cx.input(self.color)?;
        let requested = cx.input(self.size)?;
        let size = if requested.x <= 0.0 || requested.y <= 0.0 {
            cx.output_size()
        } else {
            let doc = PixelSize::new(requested.x.ceil() as u32, requested.y.ceil() as u32);
            cx.render().resolution.scale_size(doc)
        };
        if size.is_empty() {
            cx.set_output(self.output, None);
            return Ok(None);
        }
        let space = cx.color_space(ColorSpaceType::Inherit);
        let texture = cx.request_texture_uncleared(0, size, space)?;
        texture.borrow_mut()?.fill(color)?;
        cx.set_output(self.output, Some(texture.clone()));
        Ok(Some(texture))
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }
}

/// Multiplies every pixel of `Image` by `Tint`. An empty image yields an empty result.
#[derive(Debug, Clone)]
pub struct Tint {
    image: InputHandle<Option<Texture>>,
    tint: InputHandle<Color>,
    output: OutputHandle<Option<Texture>>,
}

impl NodeKind for Tint {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            image: props.create_input("Image", "Image", None)?,
            tint: props.create_input("Tint", "Tint", Color::WHITE)?,
            output: props.create_output("Output", "Output", None)?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "Tint"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers::NONE
    }

    fn execute(&mut self, cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        let Some(image) = cx.input(self.image)? else {
            cx.set_output(self.output, None);
            return Ok(None);
        };
        let tint = cx.input(self.tint)?;
        let (size, space) = (image.size()?, image.color_space()?);
        let out = cx.request_texture_uncleared(0, size, space)?;
        {
            let src = image.borrow()?;
            let mut dst = out.borrow_mut()?;
            let t = tint.to_premul_in(space).to_array();
            for (d, s) in dst.data_mut()?.chunks_exact_mut(4).zip(src.data()?.chunks_exact(4)) {
                for i in 0..4 {
                    d[i] = mul_div255_u8(u16::from(s[i]), u16::from(t[i]));
                }
            }
        }
        cx.set_output(self.output, Some(out.clone()));
        Ok(Some(out))
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }
}

/// Builds a color from per-channel func inputs in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct CombineColor {
    r: FuncInputHandle<f64>,
    g: FuncInputHandle<f64>,
    b: FuncInputHandle<f64>,
    a: FuncInputHandle<f64>,
    color: FuncOutputHandle<Color>,
}

impl NodeKind for CombineColor {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            r: props.create_func_input("R", "Red", 0.0)?,
            g: props.create_func_input("G", "Green", 0.0)?,
            b: props.create_func_input("B", "Blue", 0.0)?,
            a: props.create_func_input("A", "Alpha", 1.0)?,
            color: props.create_func_output("Color", "Color")?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "CombineColor"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers::NONE
    }

    fn execute(&mut self, _cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        Ok(None)
    }

    fn evaluate_func(&self, output: usize, cx: &FuncContext<'_>) -> GraphResult<Value> {
        if output != self.color.index() {
            return Err(GraphError::evaluation(format!("CombineColor has no func output #{output}")));
        }
        let channel = |h: FuncInputHandle<f64>| cx.input(h).map(|v| v.clamp(0.0, 1.0));
        let color = Color::rgba(
            channel(self.r)?,
            channel(self.g)?,
            channel(self.b)?,
            channel(self.a)?,
        );
        Ok(color.into_value())
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/color.rs"]
mod tests;
