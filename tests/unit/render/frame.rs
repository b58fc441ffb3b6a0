use super::*;

fn frame(data: Vec<u8>) -> FrameRGBA {
    FrameRGBA {
        width: 2,
        height: 1,
        data,
        premultiplied: true,
    }
}

#[test]
fn pixel_lookup_is_bounds_checked() {
    let f = frame(vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(f.pixel(1, 0), Some([5, 6, 7, 8]));
    assert_eq!(f.pixel(2, 0), None);
    assert_eq!(f.pixel(0, 1), None);
}

#[test]
fn image_conversion_unpremultiplies() {
    let f = frame(vec![128, 0, 0, 128, 9, 9, 9, 0]);
    let img = f.to_rgba_image().unwrap();
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 128]);
    assert_eq!(img.get_pixel(1, 0).0, [0, 0, 0, 0]);
}

#[test]
fn image_conversion_rejects_short_buffers() {
    assert!(frame(vec![0; 4]).to_rgba_image().is_err());
}
