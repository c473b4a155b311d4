//! InMemoryAppStore - テスト・デモ用の App ストア

use crate::domain::App;
use crate::ports::{AppStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// name をキーにするので、同名の insert は上書きになる（一意性の保証）
#[derive(Default)]
pub struct InMemoryAppStore {
    apps: RwLock<HashMap<String, App>>,
}

impl InMemoryAppStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, app: App) {
        self.apps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(app.name.clone(), app);
    }

    pub fn remove(&self, name: &str) -> Option<App> {
        self.apps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }
}

impl FromIterator<App> for InMemoryAppStore {
    fn from_iter<I: IntoIterator<Item = App>>(iter: I) -> Self {
        let store = Self::new();
        for app in iter {
            store.insert(app);
        }
        store
    }
}

#[async_trait]
impl AppStore for InMemoryAppStore {
    async fn get_app(&self, name: &str) -> Result<App, StoreError> {
        self.apps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}
