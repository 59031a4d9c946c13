pub mod access_control;
pub mod conversation_service;
pub mod encryption;
pub mod message_service;
pub mod notifier;
pub mod self_destruct;
pub mod voice_service;

pub use access_control::{calculate_access_risk_score, AccessController, SecurityRequest};
pub use conversation_service::ConversationService;
pub use encryption::{KeyValidation, KeyVault, SealedContent};
pub use message_service::{MessageService, SendMessageRequest};
pub use notifier::{NullNotifier, Notifier, PushNotifier};
pub use self_destruct::{DestructRequest, SelfDestructEngine};
pub use voice_service::{Transcriber, UnconfiguredTranscriber, VoiceService};
