pub mod conversation;
pub mod key;
pub mod message;
pub mod security;
pub mod self_destruct;
pub mod voice;

pub use conversation::{Conversation, ConversationParticipant, ConversationType, MemberRole};
pub use key::{EncryptionKey, EncryptionKeyDto, KeyStatus};
pub use message::{Message, MessageAttachment, MessageDto, MessageType, ReadReceipt};
pub use security::{
    AccessDecision, AccessType, ClientInfo, IncidentSeverity, IncidentStatus, IncidentType,
    MessageAccessLog, MessageSecurity, SecurityIncident, SecurityLevel, UserSecurityAnalysis,
};
pub use self_destruct::{DestructMode, MessageViewRecord, SelfDestructPolicy};
pub use voice::{VoiceMessage, VoiceStatus, VoiceTranscription};
