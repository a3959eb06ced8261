//! 値オブジェクト
//!
//! 不変条件をコンストラクタで検証し、生成後は常に有効な値であることを保証します。

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Maximum length of a document key in bytes
pub const MAX_DOCUMENT_KEY_LEN: usize = 256;

/// Key of a shared session document (the pairing key chosen by clients)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// 新しい DocumentKey を作成
    ///
    /// 空文字列（空白のみを含む）と長すぎるキーは拒否します。
    pub fn new(value: String) -> Result<Self, DomainError> {
        if value.trim().is_empty() {
            return Err(DomainError::InvalidDocumentKey(
                "key must not be empty".to_string(),
            ));
        }
        if value.len() > MAX_DOCUMENT_KEY_LEN {
            return Err(DomainError::InvalidDocumentKey(format!(
                "key must be at most {} bytes",
                MAX_DOCUMENT_KEY_LEN
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for DocumentKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Store-assigned timestamp (Unix milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Store-assigned identifier of a segment record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// UUID v4 で新しい RecordId を生成
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Identifier of one WebSocket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Subscription identifier, unique per connection (chosen by the client)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_key_accepts_pairing_key() {
        // テスト項目: 通常のペアリングキーは DocumentKey として受け入れられる
        // given (前提条件):
        let raw = "ALICE_BOB".to_string();

        // when (操作):
        let result = DocumentKey::new(raw);

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), "ALICE_BOB");
    }

    #[test]
    fn test_document_key_rejects_blank() {
        // テスト項目: 空白のみのキーは拒否される
        // given (前提条件):
        let raw = "   ".to_string();

        // when (操作):
        let result = DocumentKey::new(raw);

        // then (期待する結果):
        assert!(matches!(result, Err(DomainError::InvalidDocumentKey(_))));
    }

    #[test]
    fn test_document_key_rejects_too_long() {
        // テスト項目: 上限を超える長さのキーは拒否される
        // given (前提条件):
        let raw = "A".repeat(MAX_DOCUMENT_KEY_LEN + 1);

        // when (操作):
        let result = DocumentKey::try_from(raw);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_record_id_generate_is_unique() {
        // テスト項目: 生成される RecordId は毎回異なる
        // given (前提条件):

        // when (操作):
        let first = RecordId::generate();
        let second = RecordId::generate();

        // then (期待する結果):
        assert_ne!(first, second);
    }
}
