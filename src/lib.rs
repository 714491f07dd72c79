pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod prompt;
pub mod providers;
pub mod request;
pub mod response;
pub mod stream;

pub use config::{Config, PollConfig};
pub use dispatch::registry::Registry;
pub use error::GenerationError;
pub use request::{Capability, GenerationRequest, ProviderId};
pub use response::{GenerationResult, MediaResult};
