use std::io::Write;

use trajlog_common::verify_data;

use crate::{CHECKSUM_SIZE, RECORD_LEN_SIZE};

/// Validates a framed record by checking its size and checksum.
///
/// The frame is expected to contain a 4-byte length prefix, followed by the
/// payload and a 4-byte checksum of the payload.
///
/// # Arguments
///
/// * `frame` - A byte slice covering at least one full frame. Trailing bytes
///   beyond the frame are ignored.
///
/// # Returns
///
/// The payload slice if the frame is valid.
///
/// # Errors
///
/// Returns an error if the frame is too short, if the length prefix exceeds
/// the available bytes, or if the checksum does not match.
pub fn validate_record(frame: &[u8]) -> trajlog_common::Result<&[u8]> {
    verify_data!(frame, frame.len() >= RECORD_LEN_SIZE + CHECKSUM_SIZE);
    let size = u32::from_le_bytes(frame[0..4].try_into().expect("size bytes")) as usize;
    verify_data!(size, size + RECORD_LEN_SIZE + CHECKSUM_SIZE <= frame.len());
    let frame = &frame[RECORD_LEN_SIZE..];
    let payload = &frame[..size];
    let checksum = u32::from_le_bytes(
        frame[size..size + CHECKSUM_SIZE]
            .try_into()
            .expect("checksum bytes"),
    );
    validate_buffer(payload, checksum, Some("record"))?;
    Ok(payload)
}

/// Validates a buffer by comparing its computed checksum with the provided one.
///
/// # Arguments
///
/// * `buf` - The buffer to validate.
/// * `checksum` - The expected checksum.
/// * `name` - An optional name of the element being validated, used for error
///   reporting.
pub fn validate_buffer(
    buf: &[u8],
    checksum: u32,
    name: Option<&str>,
) -> trajlog_common::Result<()> {
    use trajlog_common::error::ErrorKind;

    let actual = compute(buf);
    if actual == checksum {
        Ok(())
    } else {
        Err(ErrorKind::ChecksumMismatch {
            element: name.unwrap_or_default().to_string(),
        }
        .into())
    }
}

/// Computes a checksum for a given buffer using the xxHash algorithm.
pub fn compute(buf: &[u8]) -> u32 {
    let h = xxhash_rust::xxh3::xxh3_64(buf);
    (h as u32) ^ ((h >> 32) as u32)
}

/// Constructs a valid frame from a given payload and returns it as a `Vec<u8>`.
pub fn record_vec(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(RECORD_LEN_SIZE + payload.len() + CHECKSUM_SIZE);
    write_record(payload, &mut frame).expect("write_record");
    frame
}

/// Frames a payload (length prefix, payload, checksum) into a generic `Write`.
pub fn write_record<W: Write>(payload: &[u8], writer: &mut W) -> std::io::Result<()> {
    let size = payload.len() as u32;
    let checksum = compute(payload);

    writer.write_all(&size.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.write_all(&checksum.to_le_bytes())?;

    Ok(())
}
