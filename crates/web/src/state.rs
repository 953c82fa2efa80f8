//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::WebConfig;
use crate::db::{CommentStore, PlaceStore, Stores, UserStore};
use crate::services::upload::PictureStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the record stores, the picture store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    stores: Stores,
    pictures: Arc<dyn PictureStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: WebConfig, stores: Stores, pictures: Arc<dyn PictureStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                pictures,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Place store.
    #[must_use]
    pub fn places(&self) -> &dyn PlaceStore {
        self.inner.stores.places.as_ref()
    }

    /// User store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.stores.users.as_ref()
    }

    /// Comment store.
    #[must_use]
    pub fn comments(&self) -> &dyn CommentStore {
        self.inner.stores.comments.as_ref()
    }

    /// Picture store selected by configuration.
    #[must_use]
    pub fn pictures(&self) -> &dyn PictureStore {
        self.inner.pictures.as_ref()
    }
}
