/// Identifier of a persisted record. Assigned by SQLite's rowid allocator
/// (`AUTOINCREMENT`), so ids are positive, monotonically increasing, and
/// never reused after deletion.
pub type RecordId = i64;
