// https://redis.io/docs/reference/protocol-spec

use std::fmt;

use bytes::Buf;
use bytes::Bytes;
use std::io::Cursor;
use thiserror::Error as ThisError;

pub(crate) static CRLF: &[u8; 2] = b"\r\n";

// Upper bound for the up-front allocation of an array, the declared length is untrusted input.
const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("ERR Protocol error: invalid frame data type '{}'", as_char(.0))]
    InvalidDataType(u8),
    #[error("ERR Protocol error: invalid bulk length")]
    InvalidBulkLength,
    #[error("ERR Protocol error: invalid multibulk length")]
    InvalidMultibulkLength,
    #[error("ERR Protocol error: invalid integer")]
    InvalidInteger,
    #[error("ERR Protocol error: expected '\\r\\n' after bulk data")]
    MissingTerminator,
    #[error("ERR Protocol error: invalid UTF-8 string")]
    InvalidUtf8,
    #[error("ERR Protocol error: empty command")]
    EmptyCommand,
    #[error("ERR Protocol error: expected '$', got '{0}'")]
    ExpectedBulk(char),
}

/// A RESP value. Requests are arrays of bulk strings, replies use every variant.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    /// The absent value, written as a RESP2 null bulk string (`$-1`).
    Null,
    Array(Vec<Frame>),
}

// Protocol specification: https://redis.io/docs/reference/protocol-spec/
impl Frame {
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        // The first byte in an RESP-serialized payload always identifies its type.
        // Subsequent bytes constitute the type's contents.
        let first_byte = get_byte(src)?;
        let data_type = DataType::try_from(first_byte)?;

        match data_type {
            DataType::SimpleString => {
                let string = get_frame_string(src)?;
                Ok(Frame::Simple(string))
            }
            DataType::SimpleError => {
                let string = get_frame_string(src)?;
                Ok(Frame::Error(string))
            }
            DataType::Integer => {
                let integer = get_frame_integer(src)?;
                Ok(Frame::Integer(integer))
            }
            // $<length>\r\n<data>\r\n
            DataType::BulkString => match get_length(src, Error::InvalidBulkLength)? {
                None => Ok(Frame::Null),
                Some(length) => Ok(Frame::Bulk(get_exact_bytes(src, length)?)),
            },
            // !<length>\r\n<error>\r\n
            DataType::BulkError => match get_length(src, Error::InvalidBulkLength)? {
                // NOTE: the protocol does not specify a way to represent a null bulk error
                None => Ok(Frame::Null),
                Some(length) => {
                    let msg = get_exact_bytes(src, length)?;
                    let msg = String::from_utf8(msg.to_vec()).map_err(|_| Error::InvalidUtf8)?;
                    Ok(Frame::Error(msg))
                }
            },
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => match get_length(src, Error::InvalidMultibulkLength)? {
                None => Ok(Frame::Null),
                Some(length) => {
                    let mut frames = Vec::with_capacity(length.min(MAX_PREALLOCATED_ELEMENTS));
                    for _ in 0..length {
                        let frame = Self::parse(src)?;
                        frames.push(frame);
                    }

                    Ok(Frame::Array(frames))
                }
            },
            DataType::Null => {
                // Advance the cursor to the end of the frame.
                let _ = get_frame_bytes(src)?;

                Ok(Frame::Null)
            }
            _ => Err(Error::InvalidDataType(first_byte)),
        }
    }

    /// Parses an inline command: a single line of whitespace separated tokens, as typed into a
    /// telnet session. The tokens are returned the same way an array request would be.
    pub fn parse_inline(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let line = get_frame_bytes(src)?;
        let parts = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| Frame::Bulk(Bytes::copy_from_slice(part)))
            .collect();

        Ok(Frame::Array(parts))
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Frame::Simple(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleString));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Error(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleError));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Integer(i) => {
                let digits = i.to_string();
                let mut bytes = Vec::with_capacity(1 + digits.len() + CRLF.len());
                bytes.push(u8::from(DataType::Integer));
                bytes.extend_from_slice(digits.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Bulk(bytes) => {
                let length_str = bytes.len().to_string();
                let mut result = Vec::with_capacity(
                    1 + length_str.len() + CRLF.len() + bytes.len() + CRLF.len(),
                );
                result.push(u8::from(DataType::BulkString));
                result.extend_from_slice(length_str.as_bytes());
                result.extend_from_slice(CRLF);
                result.extend_from_slice(bytes);
                result.extend_from_slice(CRLF);
                result
            }
            // Due to historical reasons, RESP2 clients only understand the null bulk string, so
            // it's preferred over the RESP3 null type.
            Frame::Null => b"$-1\r\n".to_vec(),
            Frame::Array(arr) => {
                let length_str = arr.len().to_string();
                let mut bytes = Vec::with_capacity(1 + length_str.len() + CRLF.len());
                bytes.push(u8::from(DataType::Array));
                bytes.extend_from_slice(length_str.as_bytes());
                bytes.extend_from_slice(CRLF);
                for frame in arr {
                    bytes.extend(frame.serialize());
                }
                bytes
            }
        }
    }

    /// The type marker the frame is serialized with.
    pub fn marker(&self) -> char {
        let data_type = match self {
            Frame::Simple(_) => DataType::SimpleString,
            Frame::Error(_) => DataType::SimpleError,
            Frame::Integer(_) => DataType::Integer,
            Frame::Bulk(_) => DataType::BulkString,
            Frame::Null => DataType::Null,
            Frame::Array(_) => DataType::Array,
        };
        char::from(u8::from(data_type))
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
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

fn as_char(byte: &u8) -> char {
    char::from(*byte)
}

fn get_frame_bytes<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let buf: &'a [u8] = *src.get_ref();
    let start = src.position() as usize;

    let frame_end_position = buf[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .ok_or(Error::Incomplete)
        .map(|index| start + index)?;

    src.set_position((frame_end_position + CRLF.len()) as u64);

    Ok(&buf[start..frame_end_position])
}

fn get_frame_string(src: &mut Cursor<&[u8]>) -> Result<String, Error> {
    let bytes = get_frame_bytes(src)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidUtf8)
}

fn get_frame_integer(src: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    get_frame_string(src)?
        .parse::<i64>()
        .map_err(|_| Error::InvalidInteger)
}

/// Reads a length header. `-1` is the null marker and yields `None`, any other negative or
/// non-numeric value is reported with `invalid`.
fn get_length(src: &mut Cursor<&[u8]>, invalid: Error) -> Result<Option<usize>, Error> {
    let length = match get_frame_integer(src) {
        Err(Error::Incomplete) => return Err(Error::Incomplete),
        Err(_) => return Err(invalid),
        Ok(length) => length,
    };

    match length {
        -1 => Ok(None),
        length => usize::try_from(length).map(Some).map_err(|_| invalid),
    }
}

/// Reads exactly `length` bytes followed by CRLF, so bulk data may itself contain CRLF.
fn get_exact_bytes(src: &mut Cursor<&[u8]>, length: usize) -> Result<Bytes, Error> {
    let start = src.position() as usize;
    let end = start.checked_add(length).ok_or(Error::InvalidBulkLength)?;
    let buf: &[u8] = *src.get_ref();

    if buf.len() < end + CRLF.len() {
        return Err(Error::Incomplete);
    }
    if &buf[end..end + CRLF.len()] != CRLF {
        return Err(Error::MissingTerminator);
    }

    src.set_position((end + CRLF.len()) as u64);

    Ok(Bytes::copy_from_slice(&buf[start..end]))
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

#[derive(Debug)]
enum DataType {
    SimpleString,   // '+'
    BulkString,     // '$'
    VerbatimString, // '='
    SimpleError,    // '-'
    BulkError,      // '!'
    Boolean,        // '#'
    Integer,        // ':'
    Double,         // ','
    BigNumber,      // '('
    Array,          // '*'
    Map,            // '%'
    Set,            // '~'
    Push,           // '>'
    Null,           // '_'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'!' => Ok(Self::BulkError),
            b'*' => Ok(Self::Array),
            b'_' => Ok(Self::Null),
            b'#' => Ok(Self::Boolean),
            b',' => Ok(Self::Double),
            b'(' => Ok(Self::BigNumber),
            b'=' => Ok(Self::VerbatimString),
            b'%' => Ok(Self::Map),
            b'~' => Ok(Self::Set),
            b'>' => Ok(Self::Push),
            _ => Err(Error::InvalidDataType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::BulkError => b'!',
            DataType::Array => b'*',
            DataType::Null => b'_',
            DataType::Boolean => b'#',
            DataType::Double => b',',
            DataType::BigNumber => b'(',
            DataType::VerbatimString => b'=',
            DataType::Map => b'%',
            DataType::Set => b'~',
            DataType::Push => b'>',
        }
    }
}
