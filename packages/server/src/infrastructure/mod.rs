//! Infrastructure 層
//!
//! ドメイン層の trait の具体的な実装と DTO 変換を提供します。

pub mod dto;
pub mod notifier;
pub mod repository;
