//! Infrastructure 層
//!
//! ドメイン層が定義する trait（Repository と外部サービス）の具体的な実装と、
//! 外部とやり取りする DTO を提供します。

pub mod auth;
pub mod dto;
pub mod notifier;
pub mod queue;
pub mod repository;
pub mod translator;
