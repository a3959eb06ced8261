//! Infrastructure 層
//!
//! ドメイン層の trait（RemoteStore / PreferenceStore / Notifier）の具体的な実装を提供します。

pub mod notifier;
pub mod preference;
pub mod store;
