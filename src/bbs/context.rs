use std::sync::Arc;

use crate::config::Config;
use crate::storage::{CredentialHasher, CredentialStore, MessageBaseDirectory, Storage};
use crate::terminal::AssetLibrary;

/// Shared, read-only services handed to every session
#[derive(Clone)]
pub struct BbsContext {
    pub config: Arc<Config>,
    pub credentials: CredentialStore,
    pub directory: MessageBaseDirectory,
    pub assets: AssetLibrary,
}

impl BbsContext {
    pub fn new(config: Config, storage: Arc<Storage>, hasher: Arc<dyn CredentialHasher>) -> Self {
        let assets = AssetLibrary::new(&config.assets);
        BbsContext {
            credentials: CredentialStore::new(storage.clone(), hasher),
            directory: MessageBaseDirectory::new(storage),
            assets,
            config: Arc::new(config),
        }
    }
}
