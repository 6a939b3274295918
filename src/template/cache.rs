//! Layout memoization keyed by template content.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use sha2::{Digest, Sha256};

use super::load_layout_from_bytes;
use crate::error::Result;
use crate::layout::Layout;

type Slot = Arc<Mutex<Option<Arc<Layout>>>>;

/// Caches resolved layouts by the SHA-256 of the template bytes.
///
/// Each key has its own slot lock, so two callers asking for the same template
/// load it once while loads of different templates proceed in parallel.
#[derive(Debug, Default)]
pub struct LayoutCache {
    slots: Mutex<HashMap<[u8; 32], Slot>>,
}

impl LayoutCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached layout for `data`, loading it on first use.
    ///
    /// A failed load is not cached; the next call retries the parse.
    pub fn get_or_load(&self, data: &[u8]) -> Result<Arc<Layout>> {
        let key: [u8; 32] = Sha256::digest(data).into();

        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key).or_default())
        };

        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(layout) = guard.as_ref() {
            log::trace!("layout cache hit");
            return Ok(Arc::clone(layout));
        }

        let layout = match load_layout_from_bytes(data) {
            Ok(layout) => Arc::new(layout),
            Err(e) => {
                drop(guard);
                self.evict_empty(&key, &slot);
                return Err(e);
            }
        };
        *guard = Some(Arc::clone(&layout));
        Ok(layout)
    }

    /// Drop the slot for `key` if it is still `slot`, nobody else is loading
    /// into it and it never got a layout.
    fn evict_empty(&self, key: &[u8; 32], slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let unfilled = slots.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, slot)
                && match current.try_lock() {
                    Ok(guard) => guard.is_none(),
                    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_none(),
                    Err(TryLockError::WouldBlock) => false,
                }
        });
        if unfilled {
            slots.remove(key);
        }
    }

    /// Number of templates with a resolved layout.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
