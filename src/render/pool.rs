use crate::foundation::core::PixelSize;
use crate::foundation::error::GraphResult;
use crate::render::color::ColorSpace;
use crate::render::surface::Texture;
use std::collections::BTreeMap;

/// Counters describing pool activity over its lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TexturePoolStats {
    /// Surfaces allocated because no compatible one existed.
    pub allocated: u64,
    /// Requests answered with the slot's existing surface.
    pub reused: u64,
    /// Surfaces disposed by reallocation or release.
    pub released: u64,
}

/// Per-node scratch and result textures, keyed by slot id.
///
/// A slot keeps its texture while size and color space stay the same; any change disposes the
/// old surface and allocates a new one. Slots never alias each other.
#[derive(Debug, Default)]
pub struct TexturePool {
    slots: BTreeMap<u32, Texture>,
    stats: TexturePoolStats,
}

impl TexturePool {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifetime counters.
    pub fn stats(&self) -> TexturePoolStats {
        self.stats
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Return `true` when no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current texture of `slot`, if any.
    pub fn get(&self, slot: u32) -> Option<&Texture> {
        self.slots.get(&slot)
    }

    /// Texture for `slot` with the given size and color space.
    ///
    /// Reused textures are cleared to transparent when `clear` is set; fresh ones always
    /// start transparent.
    pub fn request_texture(
        &mut self,
        slot: u32,
        size: PixelSize,
        color_space: ColorSpace,
        clear: bool,
    ) -> GraphResult<Texture> {
        if let Some(existing) = self.slots.get(&slot)
            && !existing.is_disposed()
        {
            let compatible = {
                let s = existing.borrow()?;
                s.size() == size && s.color_space() == color_space
            };
            if compatible {
                if clear {
                    existing.borrow_mut()?.clear()?;
                }
                self.stats.reused = self.stats.reused.saturating_add(1);
                return Ok(existing.clone());
            }
        }

        let fresh = Texture::new(size, color_space)?;
        if let Some(old) = self.slots.insert(slot, fresh.clone()) {
            self.dispose_texture(&old);
        }
        self.stats.allocated = self.stats.allocated.saturating_add(1);
        tracing::debug!(slot, %size, ?color_space, "allocated pooled texture");
        Ok(fresh)
    }

    /// Dispose and forget the texture of `slot`. Returns `false` for an empty slot.
    pub fn release(&mut self, slot: u32) -> bool {
        match self.slots.remove(&slot) {
            Some(old) => {
                self.dispose_texture(&old);
                true
            }
            None => false,
        }
    }

    /// Dispose every slot. Calling it again is a no-op.
    pub fn release_all(&mut self) -> usize {
        let slots = std::mem::take(&mut self.slots);
        let n = slots.len();
        for tex in slots.values() {
            self.dispose_texture(tex);
        }
        n
    }

    fn dispose_texture(&mut self, tex: &Texture) {
        match tex.dispose() {
            Ok(true) => self.stats.released = self.stats.released.saturating_add(1),
            Ok(false) => {}
            // The surface is borrowed elsewhere; dropping our handle is all we can do.
            Err(_) => tracing::trace!("pooled texture busy during release"),
        }
    }
}

impl Drop for TexturePool {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pool.rs"]
mod tests;
