use super::*;
use crate::eval::context::RenderContext;
use crate::foundation::core::{PixelSize, ResolutionTier};
use crate::graph::NodeGraph;
use crate::graph::node::Node;

fn ctx() -> RenderContext {
    RenderContext::new(PixelSize::new(32, 32))
}

#[test]
fn rectangle_fills_its_extent_only() {
    let mut g = NodeGraph::new();
    let mut node = Node::new::<Rectangle>().unwrap();
    node.set_input_value("Fill", Color::rgba8(0, 255, 0, 255)).unwrap();
    let id = g.add_node(node).unwrap();

    let t = g.execute_node(id, &ctx()).unwrap().unwrap();
    let s = t.borrow().unwrap();
    assert_eq!(s.size(), PixelSize::new(32, 32));
    assert_eq!(s.color_space(), ColorSpace::Srgb);
    assert_eq!(s.pixel(16, 16).unwrap().to_array(), [0, 255, 0, 255]);
    assert_eq!(s.pixel(2, 2).unwrap().to_array(), [0, 0, 0, 0]);
    assert_eq!(s.pixel(30, 16).unwrap().to_array(), [0, 0, 0, 0]);
}

#[test]
fn rectangle_scales_with_resolution() {
    let mut g = NodeGraph::new();
    let id = g.add_node(Node::new::<Rectangle>().unwrap()).unwrap();
    let t = g
        .execute_node(id, &ctx().with_resolution(ResolutionTier::Half))
        .unwrap()
        .unwrap();
    let s = t.borrow().unwrap();
    assert_eq!(s.size(), PixelSize::new(16, 16));
    assert_eq!(s.pixel(8, 8).unwrap().to_array(), [255, 255, 255, 255]);
    assert_eq!(s.pixel(1, 1).unwrap().to_array(), [0, 0, 0, 0]);
}

#[test]
fn moving_the_rectangle_recomputes() {
    let mut g = NodeGraph::new();
    let id = g.add_node(Node::new::<Rectangle>().unwrap()).unwrap();
    g.execute_node(id, &ctx()).unwrap();
    g.node_mut(id)
        .unwrap()
        .set_input_value("Center", Vec2::new(4.0, 4.0))
        .unwrap();
    let t = g.execute_node(id, &ctx()).unwrap().unwrap();
    assert_eq!(g.node(id).unwrap().execution_count(), 2);
    let s = t.borrow().unwrap();
    assert_eq!(s.pixel(2, 2).unwrap().to_array(), [255, 255, 255, 255]);
    assert_eq!(s.pixel(16, 16).unwrap().to_array(), [0, 0, 0, 0]);
}
