pub mod conversation;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod ordering;
mod send;
pub mod state;

pub use credentials::Credentials;
pub use engine::{ChatEngine, EngineConfig};
pub use error::EngineError;
pub use state::{ChatState, StateChange};
