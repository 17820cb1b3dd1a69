pub mod conversation;
pub mod ids;
pub mod message;
pub mod wire;

pub use conversation::Conversation;
pub use ids::{is_provisional, MessageId, PROVISIONAL_PREFIX};
pub use message::{Citation, Message, Role};
