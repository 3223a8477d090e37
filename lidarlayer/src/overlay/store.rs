//! Registry of overlays currently on the map.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::descriptor::OverlayDescriptor;
use super::surface::LayerId;

/// A descriptor together with the surface layer showing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveOverlay {
    pub descriptor: OverlayDescriptor,
    pub layer: LayerId,
}

/// Active overlays keyed by overlay key.
///
/// One store exists per map session and is shared with the rendering
/// engine, its only mutator. Every mutation is a single locked replacement,
/// so readers never observe a half-installed overlay.
#[derive(Debug, Default)]
pub struct OverlayStore {
    overlays: Mutex<HashMap<String, ActiveOverlay>>,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an overlay, returning the one it superseded.
    pub fn insert(&self, overlay: ActiveOverlay) -> Option<ActiveOverlay> {
        self.overlays
            .lock()
            .insert(overlay.descriptor.key.clone(), overlay)
    }

    pub fn remove(&self, key: &str) -> Option<ActiveOverlay> {
        self.overlays.lock().remove(key)
    }

    pub fn get(&self, key: &str) -> Option<ActiveOverlay> {
        self.overlays.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.overlays.lock().contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.overlays.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.overlays.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.lock().is_empty()
    }

    /// Applies `f` to a stored descriptor, returning its layer if present.
    pub fn update<F>(&self, key: &str, f: F) -> Option<LayerId>
    where
        F: FnOnce(&mut OverlayDescriptor),
    {
        let mut overlays = self.overlays.lock();
        let active = overlays.get_mut(key)?;
        f(&mut active.descriptor);
        Some(active.layer)
    }

    /// Removes and returns every overlay.
    pub fn drain(&self) -> Vec<ActiveOverlay> {
        self.overlays.lock().drain().map(|(_, v)| v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoBounds;
    use crate::overlay::ImageSource;

    fn overlay(key: &str, layer: u64) -> ActiveOverlay {
        ActiveOverlay {
            descriptor: OverlayDescriptor {
                key: key.to_string(),
                bounds: GeoBounds::new(0.0, 0.0, 1.0, 1.0),
                image: ImageSource::Url("http://x/a.png".to_string()),
                opacity: 0.7,
                visible: true,
            },
            layer: LayerId(layer),
        }
    }

    #[test]
    fn test_insert_replaces_same_key() {
        let store = OverlayStore::new();
        assert!(store.insert(overlay("dtm_a", 1)).is_none());
        let previous = store.insert(overlay("dtm_a", 2)).unwrap();
        assert_eq!(previous.layer, LayerId(1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("dtm_a").unwrap().layer, LayerId(2));
    }

    #[test]
    fn test_remove_and_contains() {
        let store = OverlayStore::new();
        store.insert(overlay("dtm_a", 1));
        assert!(store.contains("dtm_a"));
        assert!(store.remove("dtm_a").is_some());
        assert!(store.remove("dtm_a").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_and_keys() {
        let store = OverlayStore::new();
        store.insert(overlay("slope_a", 1));
        store.insert(overlay("aspect_a", 2));
        assert_eq!(store.keys(), vec!["aspect_a", "slope_a"]);

        let layer = store.update("slope_a", |d| d.opacity = 0.2);
        assert_eq!(layer, Some(LayerId(1)));
        assert_eq!(store.get("slope_a").unwrap().descriptor.opacity, 0.2);
        assert!(store.update("missing", |d| d.visible = false).is_none());
    }

    #[test]
    fn test_drain() {
        let store = OverlayStore::new();
        store.insert(overlay("a", 1));
        store.insert(overlay("b", 2));
        assert_eq!(store.drain().len(), 2);
        assert!(store.is_empty());
    }
}
