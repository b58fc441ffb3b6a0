use super::*;

fn size(w: u32, h: u32) -> PixelSize {
    PixelSize::new(w, h)
}

#[test]
fn new_surface_is_transparent_and_unique() {
    let a = Surface::new(size(4, 4), ColorSpace::Srgb).unwrap();
    let b = Surface::new(size(4, 4), ColorSpace::Srgb).unwrap();
    assert_ne!(a.id(), b.id());
    assert!(a.data().unwrap().iter().all(|&v| v == 0));
    assert!(Surface::new(size(0, 4), ColorSpace::Srgb).is_err());
}

#[test]
fn fill_and_pixel_access() {
    let mut s = Surface::new(size(3, 2), ColorSpace::Srgb).unwrap();
    s.fill(Color::rgba8(255, 0, 0, 255)).unwrap();
    assert_eq!(s.pixel(2, 1).unwrap().to_array(), [255, 0, 0, 255]);
    assert_eq!(s.pixel(3, 0).unwrap(), Rgba8Premul::TRANSPARENT);
    s.set_pixel(0, 0, Rgba8Premul::from_array([1, 2, 3, 4])).unwrap();
    assert_eq!(s.pixel(0, 0).unwrap().to_array(), [1, 2, 3, 4]);
    assert!(s.set_pixel(5, 5, Rgba8Premul::TRANSPARENT).is_err());
}

#[test]
fn draw_clips_to_destination_and_offset() {
    let mut dst = Surface::new(size(4, 4), ColorSpace::Srgb).unwrap();
    let mut src = Surface::new(size(2, 2), ColorSpace::Srgb).unwrap();
    src.fill(Color::WHITE).unwrap();
    dst.draw_surface(&src, (3, 3), &Paint::default()).unwrap();
    assert_eq!(dst.pixel(3, 3).unwrap().a, 255);
    assert_eq!(dst.pixel(2, 2).unwrap().a, 0);

    dst.clear().unwrap();
    dst.draw_surface_clipped(
        &src,
        (0, 0),
        &Paint::default(),
        Some(PixelRegion::new(1, 1, 3, 3)),
    )
    .unwrap();
    assert_eq!(dst.pixel(0, 0).unwrap().a, 0);
    assert_eq!(dst.pixel(1, 1).unwrap().a, 255);

    dst.draw_surface(&src, (10, 10), &Paint::default()).unwrap();
}

#[test]
fn draw_converts_between_color_spaces() {
    let mut src = Surface::new(size(1, 1), ColorSpace::Srgb).unwrap();
    src.fill(Color::rgba8(128, 128, 128, 255)).unwrap();
    let mut dst = Surface::new(size(1, 1), ColorSpace::LinearSrgb).unwrap();
    dst.draw_surface(&src, (0, 0), &Paint::default()).unwrap();
    let lin = dst.pixel(0, 0).unwrap();
    assert!(lin.r < 64);

    let snap = dst.snapshot().unwrap();
    assert!((i32::from(snap.data[0]) - 128).abs() <= 2);
}

#[test]
fn sampling_modes() {
    let mut s = Surface::new(size(2, 1), ColorSpace::Srgb).unwrap();
    s.set_pixel(1, 0, Rgba8Premul::from_array([200, 200, 200, 200]))
        .unwrap();
    let near = s.sample(Vec2::new(0.2, 0.5), Sampling::Nearest).unwrap();
    assert_eq!(near, Rgba8Premul::TRANSPARENT);
    let mid = s.sample(Vec2::new(0.5, 0.5), Sampling::Bilinear).unwrap();
    assert_eq!(mid.to_array(), [100, 100, 100, 100]);
    let edge = s.sample(Vec2::new(1.0, 0.5), Sampling::Bilinear).unwrap();
    assert_eq!(edge.a, 200);
}

#[test]
fn disposal_is_idempotent_and_blocks_access() {
    let mut s = Surface::new(size(2, 2), ColorSpace::Srgb).unwrap();
    assert!(s.dispose());
    assert!(!s.dispose());
    assert!(s.is_disposed());
    assert!(matches!(s.clear(), Err(GraphError::Disposed(_))));
    assert!(matches!(s.pixel(0, 0), Err(GraphError::Disposed(_))));
}

#[test]
fn texture_copy_is_distinct_and_equal() {
    let t = Texture::new(size(2, 2), ColorSpace::Srgb).unwrap();
    t.borrow_mut().unwrap().fill(Color::WHITE).unwrap();
    let c = t.copy().unwrap();
    assert!(!c.ptr_eq(&t));
    assert!(t.ptr_eq(&t.clone()));
    assert_eq!(c.snapshot().unwrap().data, t.snapshot().unwrap().data);
    assert_eq!(c.color_space().unwrap(), t.color_space().unwrap());
    t.dispose().unwrap();
    assert!(t.is_disposed());
    assert!(!c.is_disposed());
}

#[test]
fn overlapping_borrows_are_errors() {
    let t = Texture::new(size(1, 1), ColorSpace::Srgb).unwrap();
    let _w = t.borrow_mut().unwrap();
    assert!(matches!(t.borrow(), Err(GraphError::Evaluation(_))));
    assert!(!t.is_disposed());
}
