//! Participant identifiers and the pairing key derived from two of them.

use std::fmt;

use super::ValidationError;

/// Separator between the two identifiers of a pairing key
pub const PAIRING_KEY_SEPARATOR: char = '_';

/// Case-normalized participant token (trimmed, uppercased)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptyIdentifier);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order-independent key of a two-party session
///
/// `ALICE` + `BOB` and `BOB` + `ALICE` both yield `ALICE_BOB`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairingKey(String);

impl PairingKey {
    pub fn derive(a: &ParticipantId, b: &ParticipantId) -> Result<Self, ValidationError> {
        if a == b {
            return Err(ValidationError::SelfPairing);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self(format!(
            "{}{}{}",
            first.as_str(),
            PAIRING_KEY_SEPARATOR,
            second.as_str()
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pairing key of two raw identifiers, if both are present, non-empty and distinct
pub fn pairing_key(a: Option<&str>, b: Option<&str>) -> Option<PairingKey> {
    let a = ParticipantId::new(a?).ok()?;
    let b = ParticipantId::new(b?).ok()?;
    PairingKey::derive(&a, &b).ok()
}
