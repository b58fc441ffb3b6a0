use super::*;

#[derive(Debug, Clone, PartialEq)]
struct Label {
    text: String,
    dirty: bool,
}

impl KeyFramePayload for Label {
    fn clone_payload(&self) -> Option<Box<dyn KeyFramePayload>> {
        Some(Box::new(self.clone()))
    }

    fn requires_update(&self) -> bool {
        self.dirty
    }

    fn mark_updated(&mut self) {
        self.dirty = false;
    }
}

#[derive(Debug)]
struct Opaque;

impl KeyFramePayload for Opaque {}

fn label(text: &str) -> Label {
    Label {
        text: text.to_string(),
        dirty: false,
    }
}

fn two_ranges() -> (KeyFrameSet, KeyFrameId, KeyFrameId) {
    let mut set = KeyFrameSet::new();
    let a = set.add(KeyFrameData::new(0, 10).unwrap().with_payload(label("a")));
    let b = set.add(KeyFrameData::new(10, 10).unwrap().with_payload(label("b")));
    (set, a, b)
}

#[test]
fn selects_by_half_open_range() {
    let (mut set, a, b) = two_ranges();
    assert_eq!(set.resolve(9).map(KeyFrameData::id), Some(a));
    assert_eq!(set.resolve(10).map(KeyFrameData::id), Some(b));
    assert!(set.resolve(25).is_none());
    assert!(set.resolve(-1).is_none());
}

#[test]
fn base_fallback_uses_first_key_frame() {
    let (mut set, a, _) = two_ranges();
    set.set_fallback_to_base(true);
    assert_eq!(set.resolve(25).map(KeyFrameData::id), Some(a));
    assert_eq!(KeyFrameSet::with_fallback_to_base().select(3), None);
}

#[test]
fn overlapping_ranges_prefer_latest_start_then_latest_added() {
    let mut set = KeyFrameSet::new();
    set.add(KeyFrameData::new(0, 20).unwrap());
    let late = set.add(KeyFrameData::new(5, 10).unwrap());
    assert_eq!(set.resolve(7).map(KeyFrameData::id), Some(late));
    assert_eq!(set.select(17), Some(0));

    let tie = set.add(KeyFrameData::new(5, 3).unwrap());
    assert_eq!(set.resolve(6).map(KeyFrameData::id), Some(tie));
}

#[test]
fn selection_is_cached_until_frame_or_set_changes() {
    let (mut set, a, _) = two_ranges();
    assert!(set.requires_update(3));
    set.resolve_index(3);
    assert!(!set.requires_update(3));
    assert!(set.requires_update(4));

    set.retime(a, 2, 5).unwrap();
    assert!(set.requires_update(3));
    assert_eq!(set.resolve_index(1), None);
}

#[test]
fn invalid_timing_is_rejected() {
    assert!(KeyFrameData::new(0, 0).is_err());
    assert!(KeyFrameData::new(i32::MAX, 2).is_err());
    let (mut set, a, _) = two_ranges();
    assert!(set.retime(a, 0, -3).is_err());
    assert!(set.retime(KeyFrameId::new(), 0, 3).is_err());
}

#[test]
fn payload_update_flag_is_acknowledged() {
    let (mut set, a, _) = two_ranges();
    set.get_mut(a)
        .and_then(|k| k.payload_as_mut::<Label>())
        .unwrap()
        .dirty = true;
    assert!(set.payload_requires_update(0));
    set.mark_payload_updated(0);
    assert!(!set.payload_requires_update(0));
}

#[test]
fn duplicate_copies_owned_and_shares_shared_payloads() {
    let shared: Rc<dyn KeyFramePayload> = Rc::new(label("shared"));
    let mut set = KeyFrameSet::new();
    let owned = set.add(KeyFrameData::new(0, 5).unwrap().with_payload(label("own")));
    set.add(
        KeyFrameData::new(5, 5)
            .unwrap()
            .with_shared_payload(Rc::clone(&shared)),
    );

    let copy = set.try_duplicate().unwrap();
    assert_eq!(copy.len(), 2);
    assert!(copy.get(owned).is_none());
    let first = copy.get_index(0).unwrap();
    assert_eq!(first.payload_as::<Label>().unwrap().text, "own");
    match copy.get_index(1).and_then(KeyFrameData::payload) {
        Some(PayloadSlot::Shared(p)) => assert!(Rc::ptr_eq(p, &shared)),
        other => panic!("expected shared payload, got {other:?}"),
    }
}

#[test]
fn duplicate_fails_for_uncloneable_payload() {
    let mut set = KeyFrameSet::new();
    set.add(KeyFrameData::new(0, 5).unwrap().with_payload(Opaque));
    assert!(matches!(
        set.try_duplicate(),
        Err(GraphError::Validation(_))
    ));
}

#[test]
fn invisible_key_frames_stay_selectable() {
    let (mut set, a, _) = two_ranges();
    set.set_visible(a, false).unwrap();
    let active = set.resolve(0).unwrap();
    assert_eq!(active.id(), a);
    assert!(!active.is_visible());
}
