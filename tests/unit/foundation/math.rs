use super::*;

#[test]
fn mul_div255_variants_align() {
    for x in [0u16, 1, 127, 255] {
        for y in [0u16, 1, 127, 255] {
            assert_eq!(u16::from(mul_div255_u8(x, y)), mul_div255_u16(x, y));
        }
    }
}

#[test]
fn srgb_transfer_round_trips_every_code_value() {
    for v in 0u8..=255 {
        let c = f64::from(v) / 255.0;
        let back = unit_to_u8(linear_to_srgb(srgb_to_linear(c)));
        assert_eq!(back, v);
    }
}

#[test]
fn srgb_transfer_endpoints_are_fixed() {
    assert_eq!(srgb_to_linear(0.0), 0.0);
    assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-12);
    assert!((linear_to_srgb(1.0) - 1.0).abs() < 1e-12);
    assert!(srgb_to_linear(0.5) < 0.5);
}
