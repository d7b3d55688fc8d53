// https://redis.io/docs/reference/protocol-spec

use std::fmt;
use std::io::Cursor;
use std::str;

use bytes::{Buf, Bytes};
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

/// Upper bound on the number of elements preallocated for an array, so a bogus header can't make
/// us reserve gigabytes before any element arrives.
const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("protocol error; invalid frame data type byte {0:#04x}")]
    InvalidDataType(u8),
    #[error("protocol error; invalid length {0:?}")]
    InvalidLength(String),
    #[error("protocol error; bulk string length does not match its data")]
    InvalidFraming,
}

/// A single RESP value.
///
/// Clients only ever send arrays of bulk strings, so that is all `parse` accepts. The remaining
/// variants exist for replies.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

impl Frame {
    /// Parses one command from the start of `src`, leaving the cursor right after it.
    ///
    /// Returns `Error::Incomplete` when `src` holds a valid prefix of a command; the caller is
    /// expected to read more data and try again.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let first_byte = get_byte(src)?;

        match DataType::try_from(first_byte)? {
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => {
                let length = get_length(src)?;

                let mut frames = Vec::with_capacity(length.min(MAX_PREALLOCATED_ELEMENTS));
                for _ in 0..length {
                    frames.push(parse_bulk(src)?);
                }

                Ok(Frame::Array(frames))
            }
            _ => Err(Error::InvalidDataType(first_byte)),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes);
        bytes
    }

    fn write_to(&self, dst: &mut Vec<u8>) {
        match self {
            Frame::Simple(s) => write_line(dst, DataType::SimpleString, s.as_bytes()),
            Frame::Error(s) => write_line(dst, DataType::SimpleError, s.as_bytes()),
            // $<length>\r\n<data>\r\n
            Frame::Bulk(data) => {
                write_line(dst, DataType::BulkString, data.len().to_string().as_bytes());
                dst.extend_from_slice(data);
                dst.extend_from_slice(CRLF);
            }
            // RESP2 null bulk string, which every client version understands.
            Frame::Null => write_line(dst, DataType::BulkString, b"-1"),
            Frame::Array(frames) => {
                write_line(dst, DataType::Array, frames.len().to_string().as_bytes());
                for frame in frames {
                    frame.write_to(dst);
                }
            }
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::Null => write!(f, "$-1"),
            Frame::Array(arr) => {
                write!(f, "*{}", arr.len())?;
                for frame in arr {
                    write!(f, " {}", frame)?;
                }
                Ok(())
            }
        }
    }
}

// $<length>\r\n<data>\r\n
fn parse_bulk(src: &mut Cursor<&[u8]>) -> Result<Frame, Error> {
    let first_byte = get_byte(src)?;
    if !matches!(DataType::try_from(first_byte)?, DataType::BulkString) {
        return Err(Error::InvalidDataType(first_byte));
    }

    let length = get_length(src)?;

    // The declared length is trusted over the CRLF position, so data may itself contain CRLF.
    let start = src.position() as usize;
    let end = start
        .checked_add(length)
        .ok_or_else(|| Error::InvalidLength(length.to_string()))?;
    let buf = *src.get_ref();

    if buf.len() < end.saturating_add(CRLF.len()) {
        return Err(Error::Incomplete);
    }
    if &buf[end..end + CRLF.len()] != CRLF {
        return Err(Error::InvalidFraming);
    }

    src.set_position((end + CRLF.len()) as u64);

    Ok(Frame::Bulk(Bytes::copy_from_slice(&buf[start..end])))
}

/// Reads a length header. Null arrays and null bulk strings (`-1`) are rejected: they never
/// appear in a client command.
fn get_length(src: &mut Cursor<&[u8]>) -> Result<usize, Error> {
    let line = get_line(src)?;
    let line = str::from_utf8(line).map_err(|_| Error::InvalidLength(format!("{:?}", line)))?;

    // `parse` would also take a leading `+`, which RESP lengths never carry.
    if !line.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Error::InvalidLength(line.to_string()));
    }

    line.parse::<usize>()
        .map_err(|_| Error::InvalidLength(line.to_string()))
}

fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf = *src.get_ref();

    let end = buf[start..]
        .windows(CRLF.len())
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

fn write_line(dst: &mut Vec<u8>, data_type: DataType, line: &[u8]) {
    dst.push(u8::from(data_type));
    dst.extend_from_slice(line);
    dst.extend_from_slice(CRLF);
}

#[derive(Debug)]
enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            _ => Err(Error::InvalidDataType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> Result<Frame, Error> {
        let mut cursor = Cursor::new(data);
        Frame::parse(&mut cursor)
    }

    #[test]
    fn parse_array_frame() {
        let frame = parse(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n");

        assert_eq!(
            frame,
            Ok(Frame::Array(vec![
                Frame::Bulk(Bytes::from("SET")),
                Frame::Bulk(Bytes::from("foo")),
                Frame::Bulk(Bytes::from("bar")),
            ]))
        );
    }

    #[test]
    fn parse_array_frame_empty() {
        assert_eq!(parse(b"*0\r\n"), Ok(Frame::Array(vec![])));
    }

    #[test]
    fn parse_bulk_string_empty() {
        assert_eq!(
            parse(b"*1\r\n$0\r\n\r\n"),
            Ok(Frame::Array(vec![Frame::Bulk(Bytes::new())]))
        );
    }

    #[test]
    fn parse_bulk_string_containing_crlf() {
        let frame = parse(b"*2\r\n$4\r\nECHO\r\n$7\r\nfoo\r\nba\r\n");

        assert_eq!(
            frame,
            Ok(Frame::Array(vec![
                Frame::Bulk(Bytes::from("ECHO")),
                Frame::Bulk(Bytes::from("foo\r\nba")),
            ]))
        );
    }

    #[test]
    fn parse_stops_after_first_command() {
        let data = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let frame = Frame::parse(&mut cursor).unwrap();

        assert_eq!(frame, Frame::Array(vec![Frame::Bulk(Bytes::from("PING"))]));
        assert_eq!(cursor.position(), 14);
    }

    #[test]
    fn parse_incomplete_at_every_split_point() {
        let data = b"*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n";

        for end in 0..data.len() {
            assert_eq!(
                parse(&data[..end]),
                Err(Error::Incomplete),
                "prefix of length {end}"
            );
        }

        assert!(parse(data).is_ok());
    }

    #[test]
    fn parse_rejects_missing_array_prefix() {
        assert_eq!(parse(b"PING\r\n"), Err(Error::InvalidDataType(b'P')));
        assert_eq!(parse(b"$4\r\nPING\r\n"), Err(Error::InvalidDataType(b'$')));
    }

    #[test]
    fn parse_rejects_non_bulk_elements() {
        assert_eq!(
            parse(b"*1\r\n+PING\r\n"),
            Err(Error::InvalidDataType(b'+'))
        );
        assert_eq!(
            parse(b"*1\r\n*0\r\n"),
            Err(Error::InvalidDataType(b'*'))
        );
    }

    #[test]
    fn parse_rejects_bad_lengths() {
        assert_eq!(
            parse(b"*x\r\n"),
            Err(Error::InvalidLength("x".to_string()))
        );
        assert_eq!(
            parse(b"*-1\r\n"),
            Err(Error::InvalidLength("-1".to_string()))
        );
        assert_eq!(
            parse(b"*1\r\n$-1\r\n"),
            Err(Error::InvalidLength("-1".to_string()))
        );
        assert_eq!(
            parse(b"*1\r\n$+3\r\nfoo\r\n"),
            Err(Error::InvalidLength("+3".to_string()))
        );
        assert_eq!(
            parse(b"*+1\r\n$3\r\nfoo\r\n"),
            Err(Error::InvalidLength("+1".to_string()))
        );
        assert_eq!(
            parse(b"*1\r\n$\r\n\r\n"),
            Err(Error::InvalidLength("".to_string()))
        );
    }

    #[test]
    fn parse_rejects_length_mismatch() {
        assert_eq!(
            parse(b"*1\r\n$2\r\nPING\r\n"),
            Err(Error::InvalidFraming)
        );
    }

    #[test]
    fn serialize_simple_string() {
        assert_eq!(Frame::Simple("PONG".to_string()).serialize(), b"+PONG\r\n");
    }

    #[test]
    fn serialize_error() {
        assert_eq!(
            Frame::Error("ERR unknown command".to_string()).serialize(),
            b"-ERR unknown command\r\n"
        );
    }

    #[test]
    fn serialize_bulk_string() {
        assert_eq!(
            Frame::Bulk(Bytes::from("hello")).serialize(),
            b"$5\r\nhello\r\n"
        );
        assert_eq!(Frame::Bulk(Bytes::new()).serialize(), b"$0\r\n\r\n");
    }

    #[test]
    fn serialize_bulk_string_uses_byte_length() {
        assert_eq!(
            Frame::Bulk(Bytes::from("héllo")).serialize(),
            "$6\r\nhéllo\r\n".as_bytes()
        );
    }

    #[test]
    fn serialize_null() {
        assert_eq!(Frame::Null.serialize(), b"$-1\r\n");
    }

    #[test]
    fn serialize_array() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("dir")),
            Frame::Bulk(Bytes::from("/tmp/data")),
        ]);

        assert_eq!(
            frame.serialize(),
            b"*2\r\n$3\r\ndir\r\n$9\r\n/tmp/data\r\n"
        );
        assert_eq!(Frame::Array(vec![]).serialize(), b"*0\r\n");
    }
}
