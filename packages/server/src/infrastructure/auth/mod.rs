//! TokenVerifier 実装

mod jwt;

pub use jwt::{Claims, JwtTokenVerifier, issue_token};
