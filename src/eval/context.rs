use crate::foundation::core::{KeyFrameTime, PixelRegion, PixelSize, Point, ResolutionTier};
use crate::graph::node::CacheTriggers;
use crate::render::color::ColorSpace;
use crate::render::surface::{Sampling, Texture};

/// Modifier keys held while the frame was requested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyModifiers {
    /// Shift key.
    pub shift: bool,
    /// Control/command key.
    pub ctrl: bool,
    /// Alt/option key.
    pub alt: bool,
}

/// Pointer and keyboard state for interactive previews (brush outlines and the like).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    /// Pointer position in document pixels, if the pointer is over the canvas.
    pub pointer: Option<Point>,
    /// Stylus pressure in `[0, 1]`; `1.0` for mice.
    pub pressure: f64,
    /// Primary button held.
    pub primary_down: bool,
    /// Modifier keys.
    pub modifiers: KeyModifiers,
}

/// The part of a [`RenderContext`] a node's cached result depends on.
///
/// Fields a node does not react to (see [`CacheTriggers`]) are left out so changing them
/// never invalidates that node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidityKey {
    frame: Option<i32>,
    resolution: Option<ResolutionTier>,
    region: Option<Option<PixelRegion>>,
    document_size: PixelSize,
    render_output_size: PixelSize,
    color_space: ColorSpace,
}

/// Parameters of one evaluation request.
///
/// Created once per top-level request and borrowed by every node evaluation. Nested
/// evaluations derive a modified copy through the `with_*`/`for_*` methods; the parent is
/// never changed.
#[derive(Clone, Debug)]
pub struct RenderContext {
    /// Timeline position.
    pub frame_time: KeyFrameTime,
    /// Preview quality tier.
    pub resolution: ResolutionTier,
    /// Document-space region that needs updating; `None` means everything.
    pub region: Option<PixelRegion>,
    /// Full document size in pixels.
    pub document_size: PixelSize,
    /// Size of the final render target in pixels.
    pub render_output_size: PixelSize,
    /// Processing color space for newly created surfaces.
    pub color_space: ColorSpace,
    /// Sampling used when nodes resample images.
    pub sampling: Sampling,
    /// Destination the driver draws the final result onto.
    pub target: Option<Texture>,
    /// Input device state.
    pub input: InputSnapshot,
    /// Ignore every cache for this request.
    pub full_rerender: bool,
}

impl RenderContext {
    /// Context for frame 0 at full resolution over a document of `document_size`.
    pub fn new(document_size: PixelSize) -> Self {
        Self {
            frame_time: KeyFrameTime::default(),
            resolution: ResolutionTier::Full,
            region: None,
            document_size,
            render_output_size: document_size,
            color_space: ColorSpace::Srgb,
            sampling: Sampling::default(),
            target: None,
            input: InputSnapshot::default(),
            full_rerender: false,
        }
    }

    /// Copy at another timeline position.
    pub fn with_frame_time(mut self, frame_time: KeyFrameTime) -> Self {
        self.frame_time = frame_time;
        self
    }

    /// Copy at another frame, keeping the normalized time.
    pub fn for_frame(&self, frame: i32) -> Self {
        let mut ctx = self.clone();
        ctx.frame_time.frame = frame;
        ctx
    }

    /// Copy at another resolution tier.
    pub fn with_resolution(mut self, resolution: ResolutionTier) -> Self {
        self.resolution = resolution;
        self
    }

    /// Copy restricted to `region`.
    pub fn with_region(mut self, region: Option<PixelRegion>) -> Self {
        self.region = region;
        self
    }

    /// Copy drawing into `target`.
    pub fn with_target(mut self, target: Option<Texture>) -> Self {
        self.target = target;
        self
    }

    /// Copy with another processing color space.
    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    /// Copy with another sampling mode.
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Copy over a document of another size; the output size follows.
    pub fn with_document_size(mut self, document_size: PixelSize) -> Self {
        self.document_size = document_size;
        self.render_output_size = document_size;
        self
    }

    /// Copy with another input snapshot.
    pub fn with_input(mut self, input: InputSnapshot) -> Self {
        self.input = input;
        self
    }

    /// Copy that bypasses every cache.
    pub fn with_full_rerender(mut self, full_rerender: bool) -> Self {
        self.full_rerender = full_rerender;
        self
    }

    /// Copy for rendering into an offscreen texture of `size` in `color_space`.
    ///
    /// Frame time, resolution tier and input state are inherited; the region is dropped
    /// because it refers to the parent's document.
    pub fn for_offscreen(&self, target: Texture, size: PixelSize, color_space: ColorSpace) -> Self {
        let mut ctx = self.clone();
        ctx.target = Some(target);
        ctx.render_output_size = size;
        ctx.color_space = color_space;
        ctx.region = None;
        ctx
    }

    /// Document size scaled to the resolution tier; the size nodes allocate their results at.
    pub fn scaled_document_size(&self) -> PixelSize {
        self.resolution.scale_size(self.document_size)
    }

    /// Region scaled to the resolution tier.
    pub fn scaled_region(&self) -> Option<PixelRegion> {
        self.region.map(|r| self.resolution.scale_region(r))
    }

    /// Validity key for a node reacting to `triggers`.
    pub fn validity_key(&self, triggers: CacheTriggers) -> ValidityKey {
        ValidityKey {
            frame: triggers.timeline.then_some(self.frame_time.frame),
            resolution: triggers.resolution.then_some(self.resolution),
            region: triggers.region.then_some(self.region),
            document_size: self.document_size,
            render_output_size: self.render_output_size,
            color_space: self.color_space,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/eval/context.rs"]
mod tests;
