#[cfg(test)]
pub mod fake;
pub mod http;
pub mod models;
pub mod traits;
pub mod types;

pub use http::HttpGateway;
pub use traits::ChatGateway;
pub use types::{ChatAnswer, FeedbackRequest, GatewayError, SendOutcome, SendRequest};
