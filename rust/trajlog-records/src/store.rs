/// A stateful read handle over a file of framed records.
///
/// A `RecordStore` keeps a single read-head position. `seek` moves the head to
/// an absolute byte offset (as recorded in an index), and `read_record` decodes
/// the frame at the head and advances past it. Because the head is shared
/// mutable state, a store must not be used from more than one reader at a time;
/// all positioning goes through explicit `seek` calls and no caller may rely on
/// the head position left behind by another caller.
///
/// Failures are reported as `false` rather than as structured errors: the index
/// layer collapses them into absence. `status` exists only for diagnostics
/// after a failed `seek` or `read_record`.
pub trait RecordStore: Send {
    /// Repositions the read head to an absolute byte offset.
    ///
    /// Returns `false` if the offset is invalid (past the end of the data) or
    /// the store is closed.
    fn seek(&mut self, offset: u64) -> bool;

    /// Reads the record at the current head position into `buf`, replacing its
    /// contents, and advances the head past the record.
    ///
    /// Returns `false` at end of data, on a corrupt frame, or if the store is
    /// closed. `buf` contents are unspecified on failure.
    fn read_record(&mut self, buf: &mut Vec<u8>) -> bool;

    /// Describes the most recent failure, if any. Diagnostics only.
    fn status(&self) -> Option<&str>;

    /// Releases the underlying resources. Idempotent; every subsequent `seek`
    /// or `read_record` returns `false`.
    fn close(&mut self);
}
