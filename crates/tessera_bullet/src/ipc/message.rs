//! Encapsulated message framing.
//!
//! A message is `[continuation marker][i32 header length][header][body]`,
//! with the header padded so the body starts on an 8 byte boundary.
use std::io::{Read, Write};

use tessera_arrow_ipc::message::{root_as_message, Message};
use tessera_arrow_ipc::schema::MetadataVersion;
use tessera_error::{not_implemented, ErrorKind, Result, TesseraError};

use super::{IpcConfig, CONTINUATION_MARKER};

const WRITE_PAD: &[u8; 8] = &[0; 8];

/// Number of padding bytes needed to reach a multiple of 8.
pub(crate) const fn padding_len(len: usize) -> usize {
    (8 - (len % 8)) % 8
}

pub(crate) fn write_padding(writer: &mut impl Write, len: usize) -> Result<()> {
    writer.write_all(&WRITE_PAD[..padding_len(len)])?;
    Ok(())
}

/// Write a message with its header and an already padded body.
///
/// Returns the number of bytes written for the prefix and padded header.
pub(crate) fn write_encapsulated(
    writer: &mut impl Write,
    header: &[u8],
    body: &[u8],
) -> Result<usize> {
    let padded_header_len = header.len() + padding_len(8 + header.len());
    let header_len = i32::try_from(padded_header_len).map_err(|_| {
        TesseraError::of_kind(
            ErrorKind::Encoding,
            format!("Message header too large: {padded_header_len}"),
        )
    })?;

    writer.write_all(&CONTINUATION_MARKER.to_le_bytes())?;
    writer.write_all(&header_len.to_le_bytes())?;
    writer.write_all(header)?;
    write_padding(writer, 8 + header.len())?;
    writer.write_all(body)?;

    Ok(8 + padded_header_len)
}

pub(crate) fn write_end_of_stream(writer: &mut impl Write) -> Result<()> {
    writer.write_all(&CONTINUATION_MARKER.to_le_bytes())?;
    writer.write_all(&0i32.to_le_bytes())?;
    Ok(())
}

/// Outcome of reading a message prefix and header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderRead {
    /// A header was read into the buffer.
    Message,
    /// Explicit end-of-stream marker.
    EndOfStream,
    /// Reader was exhausted at a message boundary.
    Eof,
}

/// Reads an encapsulated message header into `buf`.
///
/// Streams written before the continuation marker was introduced (a bare
/// length prefix) are accepted.
pub(crate) fn read_encapsulated_header(
    reader: &mut impl Read,
    buf: &mut Vec<u8>,
    conf: &IpcConfig,
) -> Result<HeaderRead> {
    buf.clear();

    let mut prefix = [0; 4];
    match read_fully(reader, &mut prefix)? {
        0 => return Ok(HeaderRead::Eof),
        4 => (),
        n => {
            return Err(TesseraError::of_kind(
                ErrorKind::CorruptStream,
                format!("Truncated message prefix, read {n} of 4 bytes"),
            ))
        }
    }

    if u32::from_le_bytes(prefix) == CONTINUATION_MARKER {
        reader.read_exact(&mut prefix)?;
    }
    let header_len = i32::from_le_bytes(prefix);

    if header_len == 0 {
        return Ok(HeaderRead::EndOfStream);
    }

    let header_len = usize::try_from(header_len).map_err(|_| {
        TesseraError::of_kind(
            ErrorKind::CorruptStream,
            format!("Negative message header length: {header_len}"),
        )
    })?;
    if header_len > conf.max_header_size {
        return Err(TesseraError::of_kind(
            ErrorKind::CorruptStream,
            format!(
                "Message header length {header_len} exceeds maximum of {}",
                conf.max_header_size
            ),
        ));
    }

    buf.resize(header_len, 0);
    reader.read_exact(buf)?;

    Ok(HeaderRead::Message)
}

/// Split an encapsulated message at the start of a byte slice into its
/// header bytes and the total length of prefix plus header.
pub(crate) fn split_encapsulated_header(data: &[u8]) -> Result<(&[u8], usize)> {
    let read_i32 = |start: usize| -> Result<i32> {
        let bytes = data
            .get(start..start + 4)
            .ok_or_else(|| corrupt("Truncated message prefix"))?;
        let mut raw = [0; 4];
        raw.copy_from_slice(bytes);
        Ok(i32::from_le_bytes(raw))
    };

    let (prefix_len, header_len) = if read_i32(0)? as u32 == CONTINUATION_MARKER {
        (8, read_i32(4)?)
    } else {
        (4, read_i32(0)?)
    };

    let header_len =
        usize::try_from(header_len).map_err(|_| corrupt("Negative message header length"))?;
    let header = data
        .get(prefix_len..prefix_len + header_len)
        .ok_or_else(|| corrupt("Message header extends past block"))?;

    Ok((header, prefix_len + header_len))
}

/// Verify and decode a message header.
pub(crate) fn decode_message(buf: &[u8]) -> Result<Message> {
    let message = root_as_message(buf).map_err(|e| {
        TesseraError::with_source("Invalid message flatbuffer", Box::new(e))
            .with_kind(ErrorKind::CorruptStream)
    })?;

    match message.version() {
        MetadataVersion::V4 | MetadataVersion::V5 => (),
        other => not_implemented!("ipc metadata version {other:?}"),
    }

    Ok(message)
}

/// Read the body of a message.
///
/// Reads through `take` so a bogus length can't force a huge allocation up
/// front.
pub(crate) fn read_body(reader: &mut impl Read, len: i64) -> Result<Vec<u8>> {
    let len = u64::try_from(len).map_err(|_| corrupt("Negative message body length"))?;

    let mut body = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut body)?;
    if body.len() as u64 != len {
        return Err(TesseraError::of_kind(
            ErrorKind::CorruptStream,
            format!("Truncated message body, read {} of {len} bytes", body.len()),
        ));
    }

    Ok(body)
}

pub(crate) fn corrupt(msg: &str) -> TesseraError {
    TesseraError::of_kind(ErrorKind::CorruptStream, msg)
}

/// Read until `buf` is full or the reader is exhausted, returning the number
/// of bytes read.
fn read_fully(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match reader.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(read)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding() {
        assert_eq!(0, padding_len(0));
        assert_eq!(7, padding_len(1));
        assert_eq!(0, padding_len(16));
        assert_eq!(3, padding_len(13));
    }

    #[test]
    fn encapsulated_header_padded() {
        let mut out = Vec::new();
        let meta_len = write_encapsulated(&mut out, &[1, 2, 3], &[]).unwrap();

        assert_eq!(16, meta_len);
        assert_eq!(16, out.len());
        assert_eq!(&[0xff, 0xff, 0xff, 0xff, 8, 0, 0, 0, 1, 2, 3], &out[..11]);

        let mut buf = Vec::new();
        let res = read_encapsulated_header(&mut out.as_slice(), &mut buf, &IpcConfig::default())
            .unwrap();
        assert_eq!(HeaderRead::Message, res);
        assert_eq!(&[1, 2, 3, 0, 0, 0, 0, 0], buf.as_slice());
    }

    #[test]
    fn end_of_stream_and_eof() {
        let conf = IpcConfig::default();
        let mut buf = Vec::new();

        let mut out = Vec::new();
        write_end_of_stream(&mut out).unwrap();
        let res = read_encapsulated_header(&mut out.as_slice(), &mut buf, &conf).unwrap();
        assert_eq!(HeaderRead::EndOfStream, res);

        let empty: &[u8] = &[];
        let res = read_encapsulated_header(&mut &empty[..], &mut buf, &conf).unwrap();
        assert_eq!(HeaderRead::Eof, res);

        let partial: [u8; 2] = [0xff, 0xff];
        let err = read_encapsulated_header(&mut partial.as_slice(), &mut buf, &conf)
            .unwrap_err();
        assert_eq!(ErrorKind::CorruptStream, err.kind());
    }

    #[test]
    fn legacy_prefix() {
        let data: [u8; 8] = [4, 0, 0, 0, 9, 9, 9, 9];
        let mut buf = Vec::new();
        let res =
            read_encapsulated_header(&mut data.as_slice(), &mut buf, &IpcConfig::default())
                .unwrap();
        assert_eq!(HeaderRead::Message, res);
        assert_eq!(&[9, 9, 9, 9], buf.as_slice());

        let (header, len) = split_encapsulated_header(&data).unwrap();
        assert_eq!(&[9, 9, 9, 9], header);
        assert_eq!(8, len);
    }

    #[test]
    fn header_too_large() {
        let conf = IpcConfig {
            max_header_size: 16,
            ..Default::default()
        };
        let data: [u8; 8] = [0xff, 0xff, 0xff, 0xff, 32, 0, 0, 0];
        let err = read_encapsulated_header(&mut data.as_slice(), &mut Vec::new(), &conf)
            .unwrap_err();
        assert_eq!(ErrorKind::CorruptStream, err.kind());
    }

    #[test]
    fn truncated_body() {
        let data: [u8; 3] = [1, 2, 3];
        let err = read_body(&mut data.as_slice(), 8).unwrap_err();
        assert_eq!(ErrorKind::CorruptStream, err.kind());
        assert_eq!(vec![1, 2], read_body(&mut data.as_slice(), 2).unwrap());
    }

    #[test]
    fn garbage_header_is_corrupt() {
        let err = decode_message(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap_err();
        assert_eq!(ErrorKind::CorruptStream, err.kind());
    }
}
