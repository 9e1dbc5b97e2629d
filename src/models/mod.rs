pub mod provider;
pub mod session;
pub mod user;

pub use provider::{Provider, ProviderCode};
pub use session::Session;
pub use user::{User, UserProfile};
