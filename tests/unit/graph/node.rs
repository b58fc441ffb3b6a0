use super::*;
use crate::nodes::{FlatColor, ImageLayer, RasterFrame, Tint};
use crate::render::color::Color;

#[derive(Debug)]
struct Clashing;

impl NodeKind for Clashing {
    fn build(props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        props.create_input("Amount", "Amount", 1.0)?;
        props.create_input("Amount", "Amount", 2.0)?;
        Ok(Self)
    }

    fn unique_name(&self) -> &'static str {
        "Clashing"
    }

    fn execute(&mut self, _cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        Ok(None)
    }
}

#[derive(Debug)]
struct Unique;

impl NodeKind for Unique {
    fn build(_props: &mut PropertyBuilder<'_>) -> GraphResult<Self> {
        Ok(Self)
    }

    fn unique_name(&self) -> &'static str {
        "Unique"
    }

    fn execute(&mut self, _cx: &mut ExecuteCx<'_>) -> GraphResult<Option<Texture>> {
        Ok(None)
    }
}

#[test]
fn new_node_declares_properties_and_takes_kind_name() {
    let node = Node::new::<Tint>().unwrap();
    assert_eq!(node.type_name(), "Tint");
    assert_eq!(node.display_name(), "Tint");
    assert_eq!(node.input("Image").unwrap().index, 0);
    assert_eq!(node.input("Tint").unwrap().node, node.id());
    assert_eq!(node.output("Output").unwrap().index, 0);
    assert!(matches!(
        node.input("Nope").unwrap_err(),
        GraphError::UnknownProperty(_)
    ));
    assert_eq!(node.execution_count(), 0);
    assert!(node.cached_result().is_none());
}

#[test]
fn duplicate_property_fails_node_creation() {
    let err = Node::new::<Clashing>().unwrap_err();
    assert!(matches!(err, GraphError::DuplicateProperty(_)));
}

#[test]
fn set_input_value_is_type_checked() {
    let mut node = Node::new::<FlatColor>().unwrap();
    node.set_input_value("Color", Color::BLACK).unwrap();
    assert!(matches!(node.input_value("Color").unwrap(), Value::Color(c) if *c == Color::BLACK));
    assert!(node.set_input_value("Color", 1.0).is_err());
}

#[test]
fn kind_views_downcast_and_mutable_access_marks_dirty() {
    let mut node = Node::new::<FlatColor>().unwrap();
    assert!(node.kind_is::<FlatColor>());
    assert!(!node.kind_is::<Tint>());
    assert!(node.kind_as::<Tint>().is_none());
    assert!(node.kind_as_mut::<Tint>().is_none());
    assert!(!node.cache.force_dirty);
    assert!(node.kind_as_mut::<FlatColor>().is_some());
    assert!(node.cache.force_dirty);
}

#[test]
fn duplicate_gets_new_identity_and_copies_defaults_and_key_frames() {
    let mut node = Node::new::<ImageLayer>().unwrap().with_display_name("Sketch");
    node.set_input_value("Opacity", 0.5).unwrap();
    let frame = RasterFrame::filled(PixelSize::new(2, 2), Color::WHITE).unwrap();
    let kf = node
        .key_frames_mut()
        .add(KeyFrameData::new(0, 5).unwrap().with_payload(frame));

    let copy = node.duplicate().unwrap();
    assert_ne!(copy.id(), node.id());
    assert_eq!(copy.display_name(), "Sketch");
    assert!(matches!(copy.input_value("Opacity").unwrap(), Value::Float(v) if *v == 0.5));
    assert_eq!(copy.key_frames().len(), 1);
    let copied = copy.key_frames().iter().next().unwrap();
    assert_ne!(copied.id(), kf);
    assert_eq!(
        copied.payload_as::<RasterFrame>().map(|f| f.size()),
        Some(PixelSize::new(2, 2))
    );
}

#[test]
fn duplicate_requires_a_cloneable_kind() {
    let node = Node::new::<Unique>().unwrap();
    assert!(matches!(
        node.duplicate().unwrap_err(),
        GraphError::Validation(_)
    ));
}

#[test]
fn dispose_is_idempotent_and_releases_everything() {
    let mut node = Node::new::<FlatColor>().unwrap();
    let texture = node
        .pool
        .request_texture(0, PixelSize::new(4, 4), ColorSpace::Srgb, true)
        .unwrap();
    node.cache.result = Some(texture.clone());
    node.cache.computed = true;
    node.key_frames_mut().add(KeyFrameData::new(0, 1).unwrap());

    node.dispose();
    assert!(node.is_disposed());
    assert!(texture.is_disposed());
    assert!(node.cached_result().is_none());
    assert!(node.key_frames().is_empty());
    assert_eq!(node.pool_stats().released, 1);

    node.dispose();
    assert_eq!(node.pool_stats().released, 1);
    assert!(node.duplicate().is_err());
}

#[test]
fn cache_triggers_presets() {
    assert_eq!(CacheTriggers::default(), CacheTriggers::ALL);
    assert!(CacheTriggers::VOLATILE.volatile);
    assert!(CacheTriggers::VOLATILE.timeline);
    assert!(!CacheTriggers::NONE.resolution);
    let flat = Node::new::<FlatColor>().unwrap();
    let triggers = flat.kind().unwrap().cache_triggers();
    assert!(triggers.resolution && !triggers.timeline && !triggers.region);
}
