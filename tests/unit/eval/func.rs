use super::*;
use crate::graph::GraphOpts;
use crate::graph::node::NodeKind;
use crate::nodes::{CombineColor, Coordinate, Easing, FlatColor, SeparateVec2};
use crate::render::color::Color;

fn add<K: NodeKind>(g: &mut NodeGraph) -> NodeId {
    g.add_node(Node::new::<K>().unwrap()).unwrap()
}

fn link(g: &mut NodeGraph, from: (NodeId, &str), to: (NodeId, &str)) {
    let out = g.node(from.0).unwrap().output(from.1).unwrap();
    let inp = g.node(to.0).unwrap().input(to.1).unwrap();
    g.connect(out, inp).unwrap();
}

fn out(g: &NodeGraph, id: NodeId, name: &str) -> OutputRef {
    g.node(id).unwrap().output(name).unwrap()
}

fn ctx() -> RenderContext {
    RenderContext::new(PixelSize::new(4, 4))
}

#[test]
fn sample_point_uses_pixel_centers() {
    let s = SamplePoint::at_pixel(1, 3, PixelSize::new(4, 4));
    assert_eq!(s.position, Point::new(1.5, 3.5));
    assert_eq!(s.uv, Vec2::new(0.375, 0.875));
}

#[test]
fn func_outputs_answer_per_sample_or_as_constant() {
    let mut g = NodeGraph::new();
    let coord = add::<Coordinate>(&mut g);
    let render = ctx();
    let uv = out(&g, coord, "Uv");

    let sample = SamplePoint::at_pixel(2, 0, PixelSize::new(4, 4));
    let v = evaluate_output(&g, &render, uv, Some(sample), &[]).unwrap();
    assert!(matches!(v, Value::Vec2(v) if v == Vec2::new(0.625, 0.125)));

    let v = evaluate_output(&g, &render, uv, None, &[]).unwrap();
    assert!(matches!(v, Value::Vec2(v) if v == Vec2::ZERO));
}

#[test]
fn value_outputs_return_their_materialized_value() {
    let mut g = NodeGraph::new();
    let flat = add::<FlatColor>(&mut g);
    let v = evaluate_output(&g, &ctx(), out(&g, flat, "Output"), None, &[]).unwrap();
    assert!(matches!(v, Value::Texture(None)));
}

#[test]
fn chains_evaluate_for_each_sample() {
    let mut g = NodeGraph::new();
    let coord = add::<Coordinate>(&mut g);
    let split = add::<SeparateVec2>(&mut g);
    let ease = add::<Easing>(&mut g);
    let combine = add::<CombineColor>(&mut g);
    link(&mut g, (coord, "Uv"), (split, "Vector"));
    link(&mut g, (split, "X"), (ease, "Value"));
    link(&mut g, (ease, "Result"), (combine, "R"));
    link(&mut g, (split, "Y"), (combine, "G"));

    let render = ctx();
    let color_out = out(&g, combine, "Color");
    let size = PixelSize::new(4, 4);
    for (x, y) in [(0, 0), (3, 1)] {
        let s = SamplePoint::at_pixel(x, y, size);
        let v = evaluate_output(&g, &render, color_out, Some(s), &[]).unwrap();
        let Value::Color(c) = v else {
            panic!("expected a color, got {v:?}");
        };
        assert!((c.r - s.uv.x).abs() < 1e-9);
        assert!((c.g - s.uv.y).abs() < 1e-9);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.a, 1.0);
    }
}

#[test]
fn unconnected_func_inputs_use_their_constant() {
    let mut g = NodeGraph::new();
    let combine = add::<CombineColor>(&mut g);
    g.node_mut(combine).unwrap().set_input_value("B", 0.5).unwrap();
    let v = resolve_input(&g, &ctx(), combine, 2, None, &[]).unwrap();
    assert!(matches!(v, Value::Float(b) if b == 0.5));
    let c = evaluate_output(&g, &ctx(), out(&g, combine, "Color"), None, &[]).unwrap();
    assert!(matches!(c, Value::Color(c) if c == Color::rgba(0.0, 0.0, 0.5, 1.0)));
}

#[test]
fn func_cycles_are_reported() {
    let mut g = NodeGraph::new();
    let a = add::<Easing>(&mut g);
    let b = add::<Easing>(&mut g);
    link(&mut g, (a, "Result"), (b, "Value"));
    link(&mut g, (b, "Result"), (a, "Value"));
    let err = evaluate_output(&g, &ctx(), out(&g, a, "Result"), None, &[]).unwrap_err();
    assert!(matches!(err, GraphError::Evaluation(m) if m.contains("cycle")));
}

#[test]
fn chain_depth_is_bounded() {
    let mut g = NodeGraph::with_opts(GraphOpts { max_func_depth: 2 });
    let ids: Vec<NodeId> = (0..3).map(|_| add::<Easing>(&mut g)).collect();
    link(&mut g, (ids[0], "Result"), (ids[1], "Value"));
    link(&mut g, (ids[1], "Result"), (ids[2], "Value"));

    assert!(evaluate_output(&g, &ctx(), out(&g, ids[1], "Result"), None, &[]).is_ok());
    let err = evaluate_output(&g, &ctx(), out(&g, ids[2], "Result"), None, &[]).unwrap_err();
    assert!(matches!(err, GraphError::Evaluation(m) if m.contains("deeper")));
}
