use std::sync::Arc;

use crate::config::Config;
use crate::realtime::ConversationHub;
use crate::services::{
    AccessController, ConversationService, KeyVault, MessageService, Notifier, SelfDestructEngine,
    Transcriber, VoiceService,
};
use crate::store::MemoryStore;

/// Shared handler state. Every service is wired against the same store so
/// the transactional invariants hold across modules.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<ConversationHub>,
    pub conversations: Arc<ConversationService>,
    pub messages: Arc<MessageService>,
    pub vault: Arc<KeyVault>,
    pub destruct: Arc<SelfDestructEngine>,
    pub access: Arc<AccessController>,
    pub voice: Arc<VoiceService>,
}

impl AppState {
    pub fn build(
        config: Config,
        store: MemoryStore,
        notifier: Arc<dyn Notifier>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        let store = Arc::new(store);
        let hub = ConversationHub::new();
        let vault = Arc::new(KeyVault::new(store.clone(), config.key_ttl_days));
        let destruct = Arc::new(SelfDestructEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            hub.clone(),
            notifier.clone(),
        ));
        let conversations = Arc::new(ConversationService::new(store.clone(), hub.clone()));
        let messages = Arc::new(MessageService::new(
            store.clone(),
            store.clone(),
            vault.clone(),
            destruct.clone(),
            hub.clone(),
            notifier,
        ));
        let access = Arc::new(AccessController::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            config.risk.clone(),
        ));
        let voice = Arc::new(VoiceService::new(store.clone(), store, transcriber));
        Self {
            config: Arc::new(config),
            hub,
            conversations,
            messages,
            vault,
            destruct,
            access,
            voice,
        }
    }
}
