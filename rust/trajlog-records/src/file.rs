use std::{fs::File, io::Write, path::Path};

use trajlog_common::error::Error;

use crate::{FRAME_OVERHEAD, RECORD_LEN_SIZE, checksum, store::RecordStore};

/// A `RecordStore` over a file of framed records.
///
/// Reads are positional (`pread`-style), so the operating-system file cursor is
/// never used; the store's own read head is the only positioning state, and it
/// moves only through `seek` and successful `read_record` calls.
pub struct FileRecordStore {
    file: Option<File>,
    size: u64,
    pos: u64,
    last_error: Option<String>,
}

impl FileRecordStore {
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<FileRecordStore> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(FileRecordStore {
            file: Some(file),
            size,
            pos: 0,
            last_error: None,
        })
    }

    fn read_frame(&mut self) -> Option<(Vec<u8>, u64)> {
        let file = self.file.as_ref()?;
        let mut len_bytes = [0u8; RECORD_LEN_SIZE];
        if self.pos + RECORD_LEN_SIZE as u64 > self.size {
            self.last_error = Some(format!("truncated frame header at offset {}", self.pos));
            return None;
        }
        if let Err(e) = file_read_at_exact(file, self.pos, &mut len_bytes) {
            self.last_error = Some(format!("read at offset {}: {e}", self.pos));
            return None;
        }
        let len = u32::from_le_bytes(len_bytes) as usize;
        let frame_len = (FRAME_OVERHEAD + len) as u64;
        if self.pos + frame_len > self.size {
            self.last_error = Some(format!("truncated frame at offset {}", self.pos));
            return None;
        }
        let mut frame = vec![0u8; frame_len as usize];
        if let Err(e) = file_read_at_exact(file, self.pos, &mut frame) {
            self.last_error = Some(format!("read at offset {}: {e}", self.pos));
            return None;
        }
        Some((frame, frame_len))
    }
}

impl RecordStore for FileRecordStore {
    fn seek(&mut self, offset: u64) -> bool {
        if self.file.is_none() {
            self.last_error = Some("store is closed".to_string());
            return false;
        }
        if offset > self.size {
            self.last_error = Some(format!(
                "seek offset {offset} past end of data ({})",
                self.size
            ));
            return false;
        }
        self.pos = offset;
        true
    }

    fn read_record(&mut self, buf: &mut Vec<u8>) -> bool {
        if self.file.is_none() {
            self.last_error = Some("store is closed".to_string());
            return false;
        }
        if self.pos == self.size {
            // Clean end of data.
            return false;
        }
        let Some((frame, frame_len)) = self.read_frame() else {
            return false;
        };
        match checksum::validate_record(&frame) {
            Ok(payload) => {
                buf.clear();
                buf.extend_from_slice(payload);
                self.pos += frame_len;
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
        self.file = None;
    }
}

/// Sequential writer of framed records.
///
/// `write_record` returns the byte offset at which the record's frame begins,
/// which is what index files store for later seeking.
pub struct FramedWriter {
    file: Option<File>,
    offset: u64,
}

impl FramedWriter {
    pub fn new(file: File) -> FramedWriter {
        FramedWriter {
            file: Some(file),
            offset: 0,
        }
    }

    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<FramedWriter> {
        Ok(FramedWriter::new(File::create_new(path)?))
    }

    /// Appends one framed record and returns the offset of its frame.
    pub fn write_record(&mut self, payload: &[u8]) -> std::io::Result<u64> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        let offset = self.offset;
        checksum::write_record(payload, file)?;
        self.offset += (FRAME_OVERHEAD + payload.len()) as u64;
        Ok(offset)
    }

    /// The offset at which the next record will be written.
    pub fn next_offset(&self) -> u64 {
        self.offset
    }

    /// Flushes and durably commits the written records.
    pub fn seal(&mut self) -> std::io::Result<()> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

/// Reads an entire framed-record file into a list of record payloads.
///
/// Used by the index layer to load offset arrays, where every record is needed
/// and a malformed file is an initialization failure rather than an absent
/// query result.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a frame is truncated, or a
/// checksum does not match.
pub fn read_framed_file<P: AsRef<Path>>(path: P) -> trajlog_common::Result<Vec<Vec<u8>>> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| Error::io(path.display().to_string(), e))?;
    let mut records = Vec::new();
    let mut pos = 0usize;
    while pos < data.len() {
        let payload = checksum::validate_record(&data[pos..])?;
        records.push(payload.to_vec());
        pos += FRAME_OVERHEAD + payload.len();
    }
    Ok(records)
}

#[cfg(unix)]
pub fn file_read_at_exact(file: &File, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;

    file.read_exact_at(buf, pos)?;
    Ok(())
}

#[cfg(windows)]
pub fn file_read_at_exact(file: &File, mut pos: u64, mut buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, pos) {
            Ok(0) => break,
            Ok(n) => {
                buf = &mut buf[n..];
                pos += n as u64;
            }
            Err(e) => return Err(e),
        }
    }
    if !buf.is_empty() {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_store(path: &Path, payloads: &[&[u8]]) -> Vec<u64> {
        let mut writer = FramedWriter::create(path).expect("create");
        let offsets = payloads
            .iter()
            .map(|p| writer.write_record(p).expect("write_record"))
            .collect();
        writer.seal().expect("seal");
        offsets
    }

    #[test]
    fn test_write_then_read_sequential() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("records.rec");
        write_store(&path, &[b"first", b"second", b"third"]);

        let mut store = FileRecordStore::open(&path).expect("open");
        let mut buf = Vec::new();
        assert!(store.read_record(&mut buf));
        assert_eq!(buf, b"first");
        assert!(store.read_record(&mut buf));
        assert_eq!(buf, b"second");
        assert!(store.read_record(&mut buf));
        assert_eq!(buf, b"third");
        assert!(!store.read_record(&mut buf));
        assert!(store.status().is_none());
    }

    #[test]
    fn test_seek_to_recorded_offsets() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("records.rec");
        let offsets = write_store(&path, &[b"a", b"bb", b"ccc"]);

        let mut store = FileRecordStore::open(&path).expect("open");
        let mut buf = Vec::new();
        assert!(store.seek(offsets[2]));
        assert!(store.read_record(&mut buf));
        assert_eq!(buf, b"ccc");
        assert!(store.seek(offsets[0]));
        assert!(store.read_record(&mut buf));
        assert_eq!(buf, b"a");
    }

    #[test]
    fn test_next_offset_tracks_frames() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("records.rec");

        let mut writer = FramedWriter::create(&path).expect("create");
        assert_eq!(writer.next_offset(), 0);
        writer.write_record(b"abc").expect("write_record");
        assert_eq!(writer.next_offset(), (FRAME_OVERHEAD + 3) as u64);
        let second = writer.write_record(b"").expect("write_record");
        assert_eq!(second, (FRAME_OVERHEAD + 3) as u64);
        writer.seal().expect("seal");

        let len = std::fs::metadata(&path).expect("metadata").len();
        assert_eq!(len, (2 * FRAME_OVERHEAD + 3) as u64);
    }

    #[test]
    fn test_seek_past_end_fails() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("records.rec");
        write_store(&path, &[b"only"]);

        let mut store = FileRecordStore::open(&path).expect("open");
        assert!(!store.seek(1_000_000));
        assert!(store.status().is_some());
    }

    #[test]
    fn test_read_at_misaligned_offset_fails() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("records.rec");
        write_store(&path, &[b"abcdefgh"]);

        let mut store = FileRecordStore::open(&path).expect("open");
        let mut buf = Vec::new();
        // Offset 2 lands inside the frame; the bytes there do not validate.
        assert!(store.seek(2));
        assert!(!store.read_record(&mut buf));
        assert!(store.status().is_some());
    }

    #[test]
    fn test_closed_store_fails_safely() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("records.rec");
        write_store(&path, &[b"x"]);

        let mut store = FileRecordStore::open(&path).expect("open");
        store.close();
        store.close(); // idempotent
        let mut buf = Vec::new();
        assert!(!store.seek(0));
        assert!(!store.read_record(&mut buf));
    }

    #[test]
    fn test_read_framed_file() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("records.rec");
        write_store(&path, &[b"one", b"", b"three"]);

        let records = read_framed_file(&path).expect("read_framed_file");
        assert_eq!(records, vec![b"one".to_vec(), b"".to_vec(), b"three".to_vec()]);
    }

    #[test]
    fn test_read_framed_file_truncated() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("records.rec");
        write_store(&path, &[b"one", b"two"]);
        let mut data = std::fs::read(&path).expect("read");
        data.truncate(data.len() - 3);
        std::fs::write(&path, &data).expect("write");

        assert!(read_framed_file(&path).is_err());
    }
}
