use super::*;
use crate::graph::node::NodeKind;
use crate::graph::property::ValueType;
use crate::nodes::{FlatColor, Merge, Tint};
use crate::render::color::Color;

fn add<K: NodeKind>(g: &mut NodeGraph) -> NodeId {
    g.add_node(Node::new::<K>().unwrap()).unwrap()
}

fn output(g: &NodeGraph, id: NodeId, name: &str) -> OutputRef {
    g.node(id).unwrap().output(name).unwrap()
}

fn input(g: &NodeGraph, id: NodeId, name: &str) -> InputRef {
    g.node(id).unwrap().input(name).unwrap()
}

fn slot(g: &NodeGraph, to: InputRef) -> &crate::graph::property::InputSlot {
    g.node(to.node).unwrap().properties().input(to.index).unwrap()
}

#[test]
fn add_node_rejects_duplicates_and_keeps_order() {
    let mut g = NodeGraph::new();
    let a = add::<FlatColor>(&mut g);
    let b = add::<Tint>(&mut g);
    assert_eq!(g.node_ids(), &[a, b]);
    assert_eq!(g.len(), 2);

    let dup = Node::new::<Tint>().unwrap().with_id(a);
    assert!(matches!(g.add_node(dup), Err(GraphError::Validation(_))));
    assert_eq!(g.len(), 2);
}

#[test]
fn type_mismatch_leaves_graph_untouched() {
    let mut g = NodeGraph::new();
    let a = add::<FlatColor>(&mut g);
    let b = add::<Tint>(&mut g);
    let to = input(&g, b, "Tint");
    let version = slot(&g, to).version;

    let err = g.connect(output(&g, a, "Output"), to).unwrap_err();
    match err {
        GraphError::TypeMismatch {
            input_type,
            output_type,
            ..
        } => {
            assert_eq!(input_type, ValueType::Color);
            assert_eq!(output_type, ValueType::Texture);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!slot(&g, to).is_connected());
    assert_eq!(slot(&g, to).version, version);
    assert!(
        g.node(a)
            .unwrap()
            .properties()
            .output(0)
            .unwrap()
            .connections()
            .is_empty()
    );
}

#[test]
fn connect_replaces_previous_source_and_tracks_consumers() {
    let mut g = NodeGraph::new();
    let a = add::<FlatColor>(&mut g);
    let b = add::<FlatColor>(&mut g);
    let t = add::<Tint>(&mut g);
    let to = input(&g, t, "Image");

    g.connect(output(&g, a, "Output"), to).unwrap();
    g.connect(output(&g, a, "Output"), to).unwrap();
    assert_eq!(
        g.node(a).unwrap().properties().output(0).unwrap().connections(),
        &[to]
    );

    g.connect(output(&g, b, "Output"), to).unwrap();
    assert_eq!(slot(&g, to).connection(), Some(output(&g, b, "Output")));
    assert!(
        g.node(a)
            .unwrap()
            .properties()
            .output(0)
            .unwrap()
            .connections()
            .is_empty()
    );
    assert_eq!(
        g.node(b).unwrap().properties().output(0).unwrap().connections(),
        &[to]
    );
}

#[test]
fn disconnect_restores_default_and_is_idempotent() {
    let mut g = NodeGraph::new();
    let a = add::<Tint>(&mut g);
    let m = add::<Merge>(&mut g);
    g.node_mut(m)
        .unwrap()
        .set_input_value("Opacity", 0.25)
        .unwrap();

    let to = input(&g, m, "Top");
    g.connect(output(&g, a, "Output"), to).unwrap();
    assert!(g.disconnect(to).unwrap());
    assert!(!g.disconnect(to).unwrap());
    assert!(slot(&g, to).value().as_texture().is_none());
    assert!(g.node(m).unwrap().cache.force_dirty);
    assert!(matches!(
        g.node(m).unwrap().input_value("Opacity").unwrap(),
        Value::Float(v) if *v == 0.25
    ));
}

#[test]
fn remove_node_disconnects_both_directions() {
    let mut g = NodeGraph::new();
    let a = add::<FlatColor>(&mut g);
    let b = add::<Tint>(&mut g);
    let c = add::<Tint>(&mut g);
    g.connect(output(&g, a, "Output"), input(&g, b, "Image")).unwrap();
    g.connect(output(&g, b, "Output"), input(&g, c, "Image")).unwrap();
    g.set_output_node(b).unwrap();
    g.set_named_output("Preview", b).unwrap();

    g.remove_node(b).unwrap();
    assert!(!g.contains(b));
    assert_eq!(g.output_node(), None);
    assert_eq!(g.named_output("Preview"), None);
    assert!(!slot(&g, input(&g, c, "Image")).is_connected());
    assert!(
        g.node(a)
            .unwrap()
            .properties()
            .output(0)
            .unwrap()
            .connections()
            .is_empty()
    );
    assert!(matches!(g.remove_node(b), Err(GraphError::UnknownNode(_))));
}

#[test]
fn disconnect_output_counts_removed_connections() {
    let mut g = NodeGraph::new();
    let a = add::<FlatColor>(&mut g);
    let b = add::<Tint>(&mut g);
    let m = add::<Merge>(&mut g);
    let from = output(&g, a, "Output");
    g.connect(from, input(&g, b, "Image")).unwrap();
    g.connect(from, input(&g, m, "Top")).unwrap();
    g.connect(from, input(&g, m, "Bottom")).unwrap();
    assert_eq!(g.disconnect_output(from).unwrap(), 3);
    assert_eq!(g.disconnect_output(from).unwrap(), 0);
}

#[test]
fn set_input_goes_through_type_check() {
    let mut g = NodeGraph::new();
    let a = add::<FlatColor>(&mut g);
    let to = input(&g, a, "Color");
    g.set_input(to, Value::Color(Color::BLACK)).unwrap();
    assert!(g.set_input(to, Value::Int(1)).is_err());
}

#[test]
fn invalidate_marks_forward_reachable_nodes() {
    let mut g = NodeGraph::new();
    let a = add::<FlatColor>(&mut g);
    let b = add::<Tint>(&mut g);
    let side = add::<FlatColor>(&mut g);
    g.connect(output(&g, a, "Output"), input(&g, b, "Image")).unwrap();

    assert_eq!(g.invalidate(a).unwrap(), 2);
    assert!(g.node(a).unwrap().cache.force_dirty);
    assert!(g.node(b).unwrap().cache.force_dirty);
    assert!(!g.node(side).unwrap().cache.force_dirty);
}

#[test]
fn duplicate_node_optionally_keeps_incoming_connections() {
    let mut g = NodeGraph::new();
    let a = add::<FlatColor>(&mut g);
    let b = add::<Tint>(&mut g);
    let c = add::<Tint>(&mut g);
    g.connect(output(&g, a, "Output"), input(&g, b, "Image")).unwrap();
    g.connect(output(&g, b, "Output"), input(&g, c, "Image")).unwrap();

    let wired = g.duplicate_node(b, true).unwrap();
    let bare = g.duplicate_node(b, false).unwrap();
    assert_eq!(
        slot(&g, input(&g, wired, "Image")).connection(),
        Some(output(&g, a, "Output"))
    );
    assert!(!slot(&g, input(&g, bare, "Image")).is_connected());
    // Outgoing connections stay with the original.
    assert!(
        g.node(wired)
            .unwrap()
            .properties()
            .output(0)
            .unwrap()
            .connections()
            .is_empty()
    );
    assert_eq!(g.len(), 5);
}

#[test]
fn dispose_is_idempotent_and_blocks_edits() {
    let mut g = NodeGraph::new();
    let a = add::<FlatColor>(&mut g);
    g.dispose();
    g.dispose();
    assert!(g.is_disposed());
    assert!(g.node(a).unwrap().is_disposed());
    assert!(matches!(
        g.add_node(Node::new::<Tint>().unwrap()),
        Err(GraphError::Disposed(_))
    ));
}

#[test]
fn outputs_must_name_existing_nodes() {
    let mut g = NodeGraph::new();
    assert!(g.set_output_node(NodeId::new()).is_err());
    assert!(g.set_named_output("BrushOutput", NodeId::new()).is_err());
    let a = add::<FlatColor>(&mut g);
    g.set_named_output("BrushOutput", a).unwrap();
    assert_eq!(g.named_output("BrushOutput"), Some(a));
    assert_eq!(g.named_outputs().len(), 1);
}
