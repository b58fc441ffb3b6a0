use super::*;

#[test]
fn every_curve_hits_its_endpoints() {
    for ease in Ease::ALL {
        assert!(ease.apply(0.0).abs() < 1e-9, "{ease:?} at 0");
        assert!((ease.apply(1.0) - 1.0).abs() < 1e-9, "{ease:?} at 1");
    }
}

#[test]
fn input_is_clamped() {
    assert_eq!(Ease::Linear.apply(-2.0), 0.0);
    assert_eq!(Ease::InQuad.apply(3.0), 1.0);
}

#[test]
fn in_and_out_curves_bend_opposite_ways() {
    assert!(Ease::InCubic.apply(0.5) < 0.5);
    assert!(Ease::OutCubic.apply(0.5) > 0.5);
    assert!((Ease::InOutSine.apply(0.5) - 0.5).abs() < 1e-9);
    assert!(Ease::InBack.apply(0.2) < 0.0);
}
