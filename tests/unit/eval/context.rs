use super::*;

fn base() -> RenderContext {
    RenderContext::new(PixelSize::new(64, 32))
}

#[test]
fn derived_contexts_do_not_touch_the_parent() {
    let parent = base().with_frame_time(KeyFrameTime::new(4));
    let target = Texture::new(PixelSize::new(8, 8), ColorSpace::Srgb).unwrap();
    let child = parent.for_offscreen(target.clone(), PixelSize::new(8, 8), ColorSpace::LinearSrgb);

    assert!(parent.target.is_none());
    assert_eq!(parent.color_space, ColorSpace::Srgb);
    assert_eq!(child.frame_time, parent.frame_time);
    assert_eq!(child.render_output_size, PixelSize::new(8, 8));
    assert!(child.target.as_ref().is_some_and(|t| t.ptr_eq(&target)));

    let later = parent.for_frame(9);
    assert_eq!(later.frame_time.frame, 9);
    assert_eq!(parent.frame_time.frame, 4);
}

#[test]
fn scaled_sizes_follow_the_tier() {
    let ctx = base()
        .with_resolution(ResolutionTier::Quarter)
        .with_region(Some(PixelRegion::new(4, 4, 8, 8)));
    assert_eq!(ctx.scaled_document_size(), PixelSize::new(16, 8));
    assert_eq!(ctx.scaled_region(), Some(PixelRegion::new(1, 1, 2, 2)));
}

#[test]
fn validity_key_ignores_untracked_fields() {
    let a = base();
    let b = base()
        .with_frame_time(KeyFrameTime::new(7))
        .with_resolution(ResolutionTier::Half);

    assert_eq!(
        a.validity_key(CacheTriggers::NONE),
        b.validity_key(CacheTriggers::NONE)
    );
    assert_ne!(
        a.validity_key(CacheTriggers::ALL),
        b.validity_key(CacheTriggers::ALL)
    );

    let timeline_only = CacheTriggers {
        timeline: true,
        ..CacheTriggers::NONE
    };
    let c = base().with_resolution(ResolutionTier::Eighth);
    assert_eq!(a.validity_key(timeline_only), c.validity_key(timeline_only));
}

#[test]
fn document_size_always_participates() {
    let a = base();
    let b = base().with_document_size(PixelSize::new(10, 10));
    assert_ne!(
        a.validity_key(CacheTriggers::NONE),
        b.validity_key(CacheTriggers::NONE)
    );
}
