use crate::{FRAME_OVERHEAD, checksum, store::RecordStore};

/// A `RecordStore` over an in-memory byte buffer of framed records.
///
/// Primarily a test double; behaves exactly like `FileRecordStore` with the
/// file contents held in memory.
pub struct MemoryRecordStore {
    data: Option<Vec<u8>>,
    pos: u64,
    last_error: Option<String>,
}

impl MemoryRecordStore {
    /// Creates a store over already-framed bytes.
    pub fn new(data: Vec<u8>) -> MemoryRecordStore {
        MemoryRecordStore {
            data: Some(data),
            pos: 0,
            last_error: None,
        }
    }

    /// Creates a store by framing each of the given payloads, returning the
    /// store together with the frame offset of each payload.
    pub fn from_payloads<I, P>(payloads: I) -> (MemoryRecordStore, Vec<u64>)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut data = Vec::new();
        let mut offsets = Vec::new();
        for payload in payloads {
            offsets.push(data.len() as u64);
            checksum::write_record(payload.as_ref(), &mut data).expect("write_record");
        }
        (MemoryRecordStore::new(data), offsets)
    }
}

impl RecordStore for MemoryRecordStore {
    fn seek(&mut self, offset: u64) -> bool {
        let Some(data) = self.data.as_ref() else {
            self.last_error = Some("store is closed".to_string());
            return false;
        };
        if offset > data.len() as u64 {
            self.last_error = Some(format!(
                "seek offset {offset} past end of data ({})",
                data.len()
            ));
            return false;
        }
        self.pos = offset;
        true
    }

    fn read_record(&mut self, buf: &mut Vec<u8>) -> bool {
        let Some(data) = self.data.as_ref() else {
            self.last_error = Some("store is closed".to_string());
            return false;
        };
        let pos = self.pos as usize;
        if pos == data.len() {
            return false;
        }
        match checksum::validate_record(&data[pos..]) {
            Ok(payload) => {
                buf.clear();
                buf.extend_from_slice(payload);
                self.pos += (FRAME_OVERHEAD + payload.len()) as u64;
                true
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    fn status(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn close(&mut self) {
        self.data = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_payloads_roundtrip() {
        let (mut store, offsets) = MemoryRecordStore::from_payloads([b"aa".as_ref(), b"bbb"]);
        assert_eq!(offsets[0], 0);

        let mut buf = Vec::new();
        assert!(store.seek(offsets[1]));
        assert!(store.read_record(&mut buf));
        assert_eq!(buf, b"bbb");
        assert!(!store.read_record(&mut buf));
    }

    #[test]
    fn test_corrupt_frame_reports_status() {
        let (store, _) = MemoryRecordStore::from_payloads([b"payload".as_ref()]);
        let mut data = match store.data {
            Some(data) => data,
            None => unreachable!(),
        };
        let last = data.len() - 1;
        data[last] ^= 0xff; // flip a checksum byte
        let mut store = MemoryRecordStore::new(data);

        let mut buf = Vec::new();
        assert!(!store.read_record(&mut buf));
        assert!(store.status().unwrap().contains("checksum"));
    }

    #[test]
    fn test_closed_store() {
        let (mut store, _) = MemoryRecordStore::from_payloads([b"x".as_ref()]);
        store.close();
        assert!(!store.seek(0));
        let mut buf = Vec::new();
        assert!(!store.read_record(&mut buf));
    }
}
