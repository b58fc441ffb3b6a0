use crate::foundation::error::GraphResult;
use crate::graph::node::{CacheTriggers, ExecuteCx, NodeKind};
use crate::graph::property::{InputHandle, OutputHandle, PropertyBuilder};
use crate::render::color::ColorSpaceType;
use crate::render::composite::BlendMode;
use crate::render::surface::{Paint, Texture};

/// Composites `Top` over `Bottom` into a document-sized texture.
///
/// The work happens in `ColorSpace` (inherited from the request by default). With both
/// inputs empty the result is empty.
#[derive(Debug, Clone)]
pub struct Merge {
    top: InputHandle<Option<Texture>>,
    bottom: InputHandle<Option<Texture>>,
    blend: InputHandle<BlendMode>,
    opacity: InputHandle<f64>,
    color_space: InputHandle<ColorSpaceType>,
    output: OutputHandle<Option<Texture>>,
}

impl NodeKind for Merge {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self {
            top: props.create_input("Top", "Top", None)?,
            bottom: props.create_input("Bottom", "Bottom", None)?,
            blend: props.create_input("BlendMode", "Blend mode", BlendMode::Normal)?,
            opacity: props.create_input("Opacity", "Opacity", 1.0)?,
            color_space: props.create_input("ColorSpace", "Color space", ColorSpaceType::Inherit)?,
            output: props.create_output("Output", "Output", None)?,
        })
    }

    fn unique_name(&self) -> &'static str {
        "Merge"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers {
            resolution: true,
            ..CacheTriggers::NONE
        }
    }

    fn execute(&mut self, cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        let top = cx.input(self.top)?;
        let bottom = cx.input(self.bottom)?;
        if top.is_none() && bottom.is_none() {
            cx.set_output(self.output, None);
            return Ok(None);
        }
        let paint = Paint::new(cx.input(self.blend)?, cx.input(self.opacity)? as f32);
        let space = cx.color_space(cx.input(self.color_space)?);
        let out = cx.request_texture(0, cx.output_size(), space)?;
        {
            let mut dst = out.borrow_mut()?;
            if let Some(bottom) = &bottom {
                let src = bottom.borrow()?;
                dst.draw_surface(&src, (0, 0), &Paint::default())?;
            }
            if let Some(top) = &top {
                let src = top.borrow()?;
                dst.draw_surface(&src, (0, 0), &paint)?;
            }
        }
        cx.set_output(self.output, Some(out.clone()));
        Ok(Some(out))
    }

    fn clone_kind(&self) -> GraphResult<Box<dyn NodeKind>> {
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/merge.rs"]
mod tests;
