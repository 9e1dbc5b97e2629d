pub mod basic;
pub mod oauth;
pub mod user;
