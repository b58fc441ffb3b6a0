use super::*;
use crate::animation::keyframe::KeyFrameData;
use crate::foundation::core::{KeyFrameTime, PixelSize, ResolutionTier};
use crate::graph::node::{CacheTriggers, Node, NodeKind};
use crate::graph::property::PropertyBuilder;
use crate::nodes::{FlatColor, ImageLayer, Output, RasterFrame, Tint};
use crate::render::color::{Color, ColorSpace};

#[derive(Debug)]
struct Leaky;

impl NodeKind for Leaky {
    fn build(_props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self)
    }

    fn unique_name(&self) -> &'static str {
        "Leaky"
    }

    fn execute(&mut self, cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        let t = cx.request_texture(0, PixelSize::new(2, 2), ColorSpace::Srgb)?;
        t.dispose()?;
        Ok(Some(t))
    }
}

#[derive(Debug)]
struct Ticker;

impl NodeKind for Ticker {
    fn build(_props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self)
    }

    fn unique_name(&self) -> &'static str {
        "Ticker"
    }

    fn cache_triggers(&self) -> CacheTriggers {
        CacheTriggers::VOLATILE
    }

    fn execute(&mut self, _cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        Ok(None)
    }
}

fn add(g: &mut NodeGraph, node: Node) -> NodeId {
    g.add_node(node).unwrap()
}

fn link(g: &mut NodeGraph, from: NodeId, to: NodeId, input: &str) {
    let out = g.node(from).unwrap().output("Output").unwrap();
    let inp = g.node(to).unwrap().input(input).unwrap();
    g.connect(out, inp).unwrap();
}

fn count(g: &NodeGraph, id: NodeId) -> u64 {
    g.node(id).unwrap().execution_count()
}

/// flat (red) -> tint (white) -> output
fn chain() -> (NodeGraph, NodeId, NodeId, NodeId) {
    let mut g = NodeGraph::new();
    let mut flat = Node::new::<FlatColor>().unwrap();
    flat.set_input_value("Color", Color::rgba8(255, 0, 0, 255)).unwrap();
    let flat = add(&mut g, flat);
    let tint = add(&mut g, Node::new::<Tint>().unwrap());
    let out = add(&mut g, Node::new::<Output>().unwrap());
    link(&mut g, flat, tint, "Image");
    link(&mut g, tint, out, "Background");
    g.set_output_node(out).unwrap();
    (g, flat, tint, out)
}

fn ctx() -> RenderContext {
    RenderContext::new(PixelSize::new(8, 8))
}

#[test]
fn second_request_is_a_cache_hit() {
    let (mut g, flat, tint, out) = chain();
    g.execute(&ctx()).unwrap();
    let first = g.node(out).unwrap().cached_result().unwrap().clone();
    g.execute(&ctx()).unwrap();
    assert!(first.ptr_eq(g.node(out).unwrap().cached_result().unwrap()));
    for id in [flat, tint, out] {
        assert_eq!(count(&g, id), 1);
    }
}

#[test]
fn input_edit_recomputes_only_downstream() {
    let (mut g, flat, tint, out) = chain();
    g.execute(&ctx()).unwrap();
    g.node_mut(tint)
        .unwrap()
        .set_input_value("Tint", Color::rgba8(0, 0, 0, 255))
        .unwrap();
    let result = g.execute(&ctx()).unwrap().unwrap();
    assert_eq!(count(&g, flat), 1);
    assert_eq!(count(&g, tint), 2);
    assert_eq!(count(&g, out), 2);
    assert_eq!(result.borrow().unwrap().pixel(0, 0).unwrap().to_array(), [0, 0, 0, 255]);
}

#[test]
fn frame_change_does_not_recompute_time_independent_nodes() {
    let (mut g, flat, tint, _) = chain();
    g.execute(&ctx()).unwrap();
    g.execute(&ctx().with_frame_time(KeyFrameTime::new(12))).unwrap();
    assert_eq!(count(&g, flat), 1);
    assert_eq!(count(&g, tint), 1);
}

#[test]
fn resolution_change_reallocates_at_the_new_size() {
    let (mut g, flat, _, _) = chain();
    g.execute(&ctx()).unwrap();
    let full = g.node(flat).unwrap().cached_result().unwrap().clone();
    let half = g
        .execute(&ctx().with_resolution(ResolutionTier::Half))
        .unwrap()
        .unwrap();
    assert_eq!(half.size().unwrap(), PixelSize::new(4, 4));
    assert!(full.is_disposed());
    assert_eq!(count(&g, flat), 2);
}

#[test]
fn full_rerender_and_forced_dirty_bypass_the_cache() {
    let (mut g, flat, _, _) = chain();
    g.execute(&ctx()).unwrap();
    g.execute(&ctx().with_full_rerender(true)).unwrap();
    assert_eq!(count(&g, flat), 2);
    g.invalidate(flat).unwrap();
    g.execute(&ctx()).unwrap();
    assert_eq!(count(&g, flat), 3);
}

#[test]
fn volatile_kinds_always_recompute() {
    let mut g = NodeGraph::new();
    let id = add(&mut g, Node::new::<Ticker>().unwrap());
    g.execute_node(id, &ctx()).unwrap();
    g.execute_node(id, &ctx()).unwrap();
    assert_eq!(count(&g, id), 2);
}

#[test]
fn key_frame_switch_and_payload_edits_recompute() {
    let mut g = NodeGraph::new();
    let mut layer = Node::new::<ImageLayer>().unwrap();
    let size = PixelSize::new(8, 8);
    let red = RasterFrame::filled(size, Color::rgba8(255, 0, 0, 255)).unwrap();
    let blue = RasterFrame::filled(size, Color::rgba8(0, 0, 255, 255)).unwrap();
    layer
        .key_frames_mut()
        .add(KeyFrameData::new(0, 10).unwrap().with_payload(red));
    let second = layer
        .key_frames_mut()
        .add(KeyFrameData::new(10, 10).unwrap().with_payload(blue));
    let id = add(&mut g, layer);

    let at = |frame| ctx().with_frame_time(KeyFrameTime::new(frame));
    let px = |t: Option<Texture>| t.and_then(|t| t.snapshot().unwrap().pixel(1, 1));

    assert_eq!(px(g.execute_node(id, &at(0)).unwrap()), Some([255, 0, 0, 255]));
    g.execute_node(id, &at(9)).unwrap();
    assert_eq!(count(&g, id), 1);
    assert_eq!(px(g.execute_node(id, &at(10)).unwrap()), Some([0, 0, 255, 255]));
    assert_eq!(count(&g, id), 2);
    assert_eq!(g.execute_node(id, &at(25)).unwrap().map(|_| ()), None);

    g.node_mut(id)
        .unwrap()
        .key_frames_mut()
        .get_mut(second)
        .unwrap()
        .payload_as_mut::<RasterFrame>()
        .unwrap()
        .set_pixel(1, 1, Color::WHITE.to_premul_in(ColorSpace::Srgb))
        .unwrap();
    assert_eq!(px(g.execute_node(id, &at(11)).unwrap()), Some([255, 255, 255, 255]));
}

#[test]
fn data_cycles_fail_evaluation() {
    let mut g = NodeGraph::new();
    let a = add(&mut g, Node::new::<Tint>().unwrap());
    let b = add(&mut g, Node::new::<Tint>().unwrap());
    link(&mut g, a, b, "Image");
    link(&mut g, b, a, "Image");
    assert!(matches!(
        g.execute_node(a, &ctx()),
        Err(GraphError::Evaluation(_))
    ));
}

#[test]
fn disposed_results_are_fatal() {
    let mut g = NodeGraph::new();
    let id = add(&mut g, Node::new::<Leaky>().unwrap());
    assert!(matches!(
        g.execute_node(id, &ctx()),
        Err(GraphError::Disposed(_))
    ));
    // The kind is restored after the failure.
    assert!(g.node(id).unwrap().kind().is_some());
}

#[test]
fn missing_output_and_disposed_graph_are_errors() {
    let mut g = NodeGraph::new();
    assert!(matches!(g.execute(&ctx()), Err(GraphError::Validation(_))));
    assert!(g.execute_output("BrushOutput", &ctx()).is_err());
    let (mut g, _, _, out) = chain();
    g.dispose();
    assert!(matches!(
        g.execute_node(out, &ctx()),
        Err(GraphError::Disposed(_))
    ));
}

#[test]
fn result_is_presented_onto_the_target() {
    let (mut g, ..) = chain();
    let same = Texture::new(PixelSize::new(8, 8), ColorSpace::Srgb).unwrap();
    g.execute(&ctx().with_target(Some(same.clone()))).unwrap();
    assert_eq!(same.borrow().unwrap().pixel(7, 7).unwrap().to_array(), [255, 0, 0, 255]);

    let small = Texture::new(PixelSize::new(2, 2), ColorSpace::LinearSrgb).unwrap();
    g.execute(&ctx().with_target(Some(small.clone()))).unwrap();
    assert_eq!(small.borrow().unwrap().pixel(1, 0).unwrap().to_array(), [255, 0, 0, 255]);
}

#[test]
fn render_texture_returns_an_independent_copy() {
    let (mut g, _, _, out) = chain();
    let copy = g.render_texture(&ctx()).unwrap().unwrap();
    let cached = g.node(out).unwrap().cached_result().unwrap();
    assert!(!copy.ptr_eq(cached));
    let snap = g.render_snapshot(&ctx()).unwrap().unwrap();
    assert_eq!((snap.width, snap.height), (8, 8));
    assert_eq!(snap.pixel(3, 3), Some([255, 0, 0, 255]));
}

#[test]
fn execute_node_hands_out_a_copy_and_keeps_the_pooled_result() {
    let (mut g, flat, tint, _) = chain();
    let kept = g.execute_node(tint, &ctx()).unwrap().unwrap();
    assert!(!kept.ptr_eq(g.node(tint).unwrap().cached_result().unwrap()));
    g.node_mut(flat)
        .unwrap()
        .set_input_value("Color", Color::rgba8(0, 0, 255, 255))
        .unwrap();
    g.execute_node(tint, &ctx()).unwrap();
    assert_eq!(kept.borrow().unwrap().pixel(0, 0).unwrap().to_array(), [255, 0, 0, 255]);
    let pooled = g.node(tint).unwrap().cached_result().unwrap();
    assert_eq!(pooled.borrow().unwrap().pixel(0, 0).unwrap().to_array(), [0, 0, 255, 255]);
}

#[test]
fn cycle_is_reported_before_anything_computes() {
    let (mut g, flat, tint, _) = chain();
    let back = g.add_node(Node::new::<Tint>().unwrap()).unwrap();
    link(&mut g, tint, back, "Image");
    link(&mut g, back, tint, "Image");
    assert!(matches!(g.execute(&ctx()), Err(GraphError::Evaluation(_))));
    for id in [flat, tint, back] {
        assert_eq!(count(&g, id), 0);
    }
}
