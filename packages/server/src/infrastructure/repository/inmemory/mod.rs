//! InMemory Repository 実装

mod segment_record;
mod session_document;

pub use segment_record::InMemorySegmentRecordRepository;
pub use session_document::InMemorySessionDocumentRepository;
