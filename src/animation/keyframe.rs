//! Key frames bind per-node payloads (raster frames, nested document references) to frame
//! ranges on the timeline.
//!
//! A [`KeyFrameSet`] owns the key frames of one node and decides which one is active for a
//! given frame. The selection is cached and recomputed only after the frame or the set
//! itself changed.

use crate::foundation::error::{GraphError, GraphResult};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Stable identity of a key frame.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct KeyFrameId(pub uuid::Uuid);

impl KeyFrameId {
    /// Allocate a fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for KeyFrameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for KeyFrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Data attached to a key frame.
pub trait KeyFramePayload: Any + fmt::Debug {
    /// Deep copy used when a node is duplicated. `None` means the payload cannot be copied.
    fn clone_payload(&self) -> Option<Box<dyn KeyFramePayload>> {
        None
    }

    /// Return `true` when the payload changed since the owning node last consumed it.
    fn requires_update(&self) -> bool {
        false
    }

    /// Acknowledge that the owning node consumed the current content.
    fn mark_updated(&mut self) {}

    /// Serialized form used by graph documents.
    fn to_json(&self) -> GraphResult<serde_json::Value> {
        Err(GraphError::serde("key frame payload is not serializable"))
    }
}

/// Payload storage: owned by the key frame, or shared by reference with other key frames.
#[derive(Debug)]
pub enum PayloadSlot {
    /// Exclusively owned payload; duplicated through [`KeyFramePayload::clone_payload`].
    Owned(Box<dyn KeyFramePayload>),
    /// Shared payload; duplicated by reference and never mutated through the key frame.
    Shared(Rc<dyn KeyFramePayload>),
}

impl PayloadSlot {
    /// Borrow the payload.
    pub fn get(&self) -> &(dyn KeyFramePayload + 'static) {
        match self {
            Self::Owned(p) => p.as_ref(),
            Self::Shared(p) => p.as_ref(),
        }
    }

    /// Borrow an owned payload mutably.
    pub fn get_mut(&mut self) -> Option<&mut (dyn KeyFramePayload + 'static)> {
        match self {
            Self::Owned(p) => Some(p.as_mut()),
            Self::Shared(_) => None,
        }
    }

    /// Typed view of the payload.
    pub fn downcast_ref<T: KeyFramePayload>(&self) -> Option<&T> {
        let any: &(dyn Any + 'static) = self.get();
        any.downcast_ref::<T>()
    }

    /// Typed mutable view of an owned payload.
    pub fn downcast_mut<T: KeyFramePayload>(&mut self) -> Option<&mut T> {
        let any: &mut (dyn Any + 'static) = self.get_mut()?;
        any.downcast_mut::<T>()
    }

    fn try_clone(&self) -> GraphResult<Self> {
        match self {
            Self::Owned(p) => p.clone_payload().map(Self::Owned).ok_or_else(|| {
                GraphError::validation(format!("key frame payload {p:?} cannot be duplicated"))
            }),
            Self::Shared(p) => Ok(Self::Shared(Rc::clone(p))),
        }
    }
}

/// One key frame: an optional payload active over `[start_frame, start_frame + duration)`.
#[derive(Debug)]
pub struct KeyFrameData {
    id: KeyFrameId,
    start_frame: i32,
    duration: i32,
    is_visible: bool,
    payload: Option<PayloadSlot>,
}

impl KeyFrameData {
    /// Create a visible key frame without payload. `duration` must be at least one frame.
    pub fn new(start_frame: i32, duration: i32) -> GraphResult<Self> {
        validate_timing(start_frame, duration)?;
        Ok(Self {
            id: KeyFrameId::new(),
            start_frame,
            duration,
            is_visible: true,
            payload: None,
        })
    }

    /// Attach an owned payload.
    pub fn with_payload(mut self, payload: impl KeyFramePayload) -> Self {
        self.payload = Some(PayloadSlot::Owned(Box::new(payload)));
        self
    }

    /// Attach an already boxed owned payload.
    pub fn with_boxed_payload(mut self, payload: Box<dyn KeyFramePayload>) -> Self {
        self.payload = Some(PayloadSlot::Owned(payload));
        self
    }

    /// Attach a payload shared with other key frames.
    pub fn with_shared_payload(mut self, payload: Rc<dyn KeyFramePayload>) -> Self {
        self.payload = Some(PayloadSlot::Shared(payload));
        self
    }

    /// Override the generated id.
    pub fn with_id(mut self, id: KeyFrameId) -> Self {
        self.id = id;
        self
    }

    /// Set visibility.
    pub fn with_visibility(mut self, is_visible: bool) -> Self {
        self.is_visible = is_visible;
        self
    }

    /// Key frame id.
    pub fn id(&self) -> KeyFrameId {
        self.id
    }

    /// First frame covered.
    pub fn start_frame(&self) -> i32 {
        self.start_frame
    }

    /// Number of frames covered.
    pub fn duration(&self) -> i32 {
        self.duration
    }

    /// First frame past the end.
    pub fn end_frame(&self) -> i32 {
        self.start_frame.saturating_add(self.duration)
    }

    /// Visibility flag. Nodes treat an invisible active key frame as empty output.
    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    /// Return `true` when `frame` lies inside `[start_frame, end_frame)`.
    pub fn contains(&self, frame: i32) -> bool {
        frame >= self.start_frame && frame < self.end_frame()
    }

    /// Payload slot, if any.
    pub fn payload(&self) -> Option<&PayloadSlot> {
        self.payload.as_ref()
    }

    /// Typed payload view.
    pub fn payload_as<T: KeyFramePayload>(&self) -> Option<&T> {
        self.payload.as_ref()?.downcast_ref::<T>()
    }

    /// Typed mutable payload view (owned payloads only).
    pub fn payload_as_mut<T: KeyFramePayload>(&mut self) -> Option<&mut T> {
        self.payload.as_mut()?.downcast_mut::<T>()
    }

    fn payload_requires_update(&self) -> bool {
        self.payload
            .as_ref()
            .is_some_and(|p| p.get().requires_update())
    }

    /// Copy with a fresh id. Owned payloads are deep-copied, shared ones by reference.
    pub fn try_duplicate(&self) -> GraphResult<Self> {
        let payload = self.payload.as_ref().map(PayloadSlot::try_clone).transpose()?;
        Ok(Self {
            id: KeyFrameId::new(),
            start_frame: self.start_frame,
            duration: self.duration,
            is_visible: self.is_visible,
            payload,
        })
    }
}

fn validate_timing(start_frame: i32, duration: i32) -> GraphResult<()> {
    if duration < 1 {
        return Err(GraphError::validation(format!(
            "key frame duration must be >= 1, got {duration}"
        )));
    }
    if start_frame.checked_add(duration).is_none() {
        return Err(GraphError::validation("key frame end overflows the timeline"));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Selection {
    frame: i32,
    version: u64,
    index: Option<usize>,
}

/// The key frames of one node plus the cached active selection.
#[derive(Debug, Default)]
pub struct KeyFrameSet {
    frames: Vec<KeyFrameData>,
    fallback_to_base: bool,
    version: u64,
    selection: Option<Selection>,
}

impl KeyFrameSet {
    /// Empty set without base fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set that falls back to the first key frame when no range matches.
    pub fn with_fallback_to_base() -> Self {
        Self {
            fallback_to_base: true,
            ..Self::default()
        }
    }

    /// Number of key frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Return `true` when there are no key frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Key frames in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyFrameData> {
        self.frames.iter()
    }

    /// Key frame by id.
    pub fn get(&self, id: KeyFrameId) -> Option<&KeyFrameData> {
        self.frames.iter().find(|k| k.id == id)
    }

    /// Mutable key frame by id. Counts as an edit of the set.
    pub fn get_mut(&mut self, id: KeyFrameId) -> Option<&mut KeyFrameData> {
        let kf = self.frames.iter_mut().find(|k| k.id == id)?;
        self.version = self.version.wrapping_add(1);
        Some(kf)
    }

    /// Key frame by position.
    pub fn get_index(&self, index: usize) -> Option<&KeyFrameData> {
        self.frames.get(index)
    }

    /// Append a key frame and return its id.
    pub fn add(&mut self, key_frame: KeyFrameData) -> KeyFrameId {
        let id = key_frame.id;
        self.frames.push(key_frame);
        self.touch();
        id
    }

    /// Remove a key frame by id.
    pub fn remove(&mut self, id: KeyFrameId) -> Option<KeyFrameData> {
        let idx = self.frames.iter().position(|k| k.id == id)?;
        self.touch();
        Some(self.frames.remove(idx))
    }

    /// Move or resize a key frame.
    pub fn retime(&mut self, id: KeyFrameId, start_frame: i32, duration: i32) -> GraphResult<()> {
        validate_timing(start_frame, duration)?;
        let kf = self
            .frames
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| GraphError::validation(format!("unknown key frame {id}")))?;
        kf.start_frame = start_frame;
        kf.duration = duration;
        self.touch();
        Ok(())
    }

    /// Show or hide a key frame.
    pub fn set_visible(&mut self, id: KeyFrameId, is_visible: bool) -> GraphResult<()> {
        let kf = self
            .frames
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| GraphError::validation(format!("unknown key frame {id}")))?;
        kf.is_visible = is_visible;
        self.touch();
        Ok(())
    }

    /// Whether the first key frame is used when no range matches.
    pub fn fallback_to_base(&self) -> bool {
        self.fallback_to_base
    }

    /// Toggle base fallback.
    pub fn set_fallback_to_base(&mut self, fallback: bool) {
        if self.fallback_to_base != fallback {
            self.fallback_to_base = fallback;
            self.touch();
        }
    }

    /// Monotonic edit counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Return `true` when [`KeyFrameSet::resolve`] would have to redo the selection for `frame`.
    pub fn requires_update(&self, frame: i32) -> bool {
        self.selection
            .is_none_or(|s| s.frame != frame || s.version != self.version)
    }

    /// Pure selection rule.
    ///
    /// Among key frames containing `frame`, the one with the largest start wins; ties go to
    /// the one added last. With no match, base fallback yields the first key frame.
    pub fn select(&self, frame: i32) -> Option<usize> {
        let hit = self
            .frames
            .iter()
            .enumerate()
            .filter(|(_, k)| k.contains(frame))
            .max_by_key(|(i, k)| (k.start_frame, *i))
            .map(|(i, _)| i);
        match hit {
            Some(i) => Some(i),
            None if self.fallback_to_base && !self.frames.is_empty() => Some(0),
            None => None,
        }
    }

    /// Active key frame index for `frame`, reusing the cached selection when possible.
    pub fn resolve_index(&mut self, frame: i32) -> Option<usize> {
        if let Some(sel) = self.selection
            && sel.frame == frame
            && sel.version == self.version
        {
            return sel.index;
        }
        let index = self.select(frame);
        self.selection = Some(Selection {
            frame,
            version: self.version,
            index,
        });
        index
    }

    /// Active key frame for `frame`.
    pub fn resolve(&mut self, frame: i32) -> Option<&KeyFrameData> {
        let idx = self.resolve_index(frame)?;
        self.frames.get(idx)
    }

    /// Return `true` when the key frame at `index` has unconsumed payload changes.
    pub fn payload_requires_update(&self, index: usize) -> bool {
        self.frames
            .get(index)
            .is_some_and(KeyFrameData::payload_requires_update)
    }

    /// Acknowledge the payload of the key frame at `index`.
    pub fn mark_payload_updated(&mut self, index: usize) {
        if let Some(p) = self
            .frames
            .get_mut(index)
            .and_then(|k| k.payload.as_mut())
            .and_then(PayloadSlot::get_mut)
        {
            p.mark_updated();
        }
    }

    /// Deep copy with fresh key frame ids.
    pub fn try_duplicate(&self) -> GraphResult<Self> {
        let frames = self
            .frames
            .iter()
            .map(KeyFrameData::try_duplicate)
            .collect::<GraphResult<Vec<_>>>()?;
        Ok(Self {
            frames,
            fallback_to_base: self.fallback_to_base,
            version: 0,
            selection: None,
        })
    }

    /// Drop every key frame and its payload.
    pub fn clear(&mut self) {
        if !self.frames.is_empty() {
            self.frames.clear();
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/keyframe.rs"]
mod tests;
