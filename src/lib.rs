//! Client-side conversation cache for a knowledge-base chat service.
//!
//! [`services::ChatEngine`] keeps conversations and the loaded message sequence
//! consistent with the remote service while applying sends optimistically.

pub mod config;
pub mod gateway;
pub mod models;
pub mod services;

pub use config::ClientConfig;
pub use gateway::{ChatGateway, GatewayError, HttpGateway};
pub use models::{Citation, Conversation, Message, MessageId, Role};
pub use services::{ChatEngine, ChatState, Credentials, EngineConfig, EngineError};
