//! Paired per-pixel image modification.
//!
//! [`ModifyImageLeft`] opens the zone: it takes an image and exposes per-sample `Color` and
//! `Coordinate` func outputs. Func nodes between the two transform those values, and
//! [`ModifyImageRight`] closes the zone by sampling its `Color` func input once per pixel of
//! the left node's image. The right node finds its partner by walking upstream.

use crate::eval::func::{FuncContext, SamplePoint};
use crate::foundation::core::{Rgba8Premul, Vec2};
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::node::{CacheTriggers, ExecuteCx, NodeKind};
use crate::graph::property::{
    FuncInputHandle, FuncOutputHandle, InputHandle, OutputHandle, PropertyBuilder, PropertyType,
    Value,
};
use crate::render::color::{Color, ColorSpace, convert_premul};
use crate::render::surface::{Sampling, Texture};

/// Start of a modify-image zone.
#[derive(Debug, Clone)]
pub struct ModifyImageLeft {
    image: InputHandle<Option<Texture>>,
    color: FuncOutputHandle<Color>,
    coordinate: FuncOutputHandle<Vec2>,
}

impl ModifyImageLeft {
    fn sample_color(&self, cx: &FuncContext<'_>) -> GraphResult<Color> {
        let (Some(sample), Some(image)) = (cx.sample(), cx.value_input(self.image)?) else {
            return Ok(Color::TRANSPARENT);
        };
        let surface = image.borrow()?;
        let px = surface.sample(sample.uv, Sampling::Nearest)?.to_array();
        let px = convert_premul(px, surface.color_space(), ColorSpace::Srgb);
        Ok(Color::from_premul(Rgba8Premul::from_array(px)))
    }
}

impl NodeKind for ModifyImageLeft {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            image: props.create_input("Image", "Image", None)?,
            color: props.create_func_output("Color", "Color")?,
            coordinate: props.create_func_output("Coordinate", "Coordinate")?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "ModifyImageLeft"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers::NONE
    }

    fn execute(&mut self, _cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        Ok(None)
    }

    fn evaluate_func(&self, output: usize, cx: &FuncContext<'_>) -> GraphResult<Value> {
        if output == self.color.index() {
            Ok(self.sample_color(cx)?.into_value())
        } else if output == self.coordinate.index() {
            Ok(cx.sample().map_or(Vec2::ZERO, |s| s.uv).into_value())
        } else {
            Err(GraphError::evaluation(format!(
                "ModifyImageLeft has no func output #{output}"
            )))
        }
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }
}

/// End of a modify-image zone. Empty when no left partner is found upstream.
#[derive(Debug, Clone)]
pub struct ModifyImageRight {
    color: FuncInputHandle<Color>,
    output: OutputHandle<Option<Texture>>,
}

impl NodeKind for ModifyImageRight {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            color: props.create_func_input("Color", "Color", Color::TRANSPARENT)?,
            output: props.create_output("Output", "Output", None)?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "ModifyImageRight"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers::NONE
    }

    fn execute(&mut self, cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        let graph = cx.graph();
        let image = match graph.find_upstream(cx.id(), |n| n.kind_is::<ModifyImageLeft>())? {
            Some(left) => graph.try_node(left)?.input_value("Image")?.as_texture().cloned(),
            None => None,
        };
        let Some(image) = image else {
            tracing::trace!(node = %cx.id(), "modify-image zone has no source image");
            cx.set_output(self.output, None);
            return Ok(None);
        };

        let size = image.size()?;
        let out = cx.request_texture_uncleared(0, size, ColorSpace::Srgb)?;
        let mut pixels = Vec::with_capacity(size.area() * 4);
        for y in 0..size.height {
            for x in 0..size.width {
                let color = cx.sample(self.color, SamplePoint::at_pixel(x, y, size))?;
                pixels.extend_from_slice(&color.to_premul_in(ColorSpace::Srgb).to_array());
            }
        }
        out.borrow_mut()?.data_mut()?.copy_from_slice(&pixels);
        cx.set_output(self.output, Some(out.clone()));
        Ok(Some(out))
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/modify_image.rs"]
mod tests;
