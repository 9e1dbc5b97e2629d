pub mod auth;

pub use auth::{LoginRequest, SignupRequest, SignupResponse, TokenResponse};
