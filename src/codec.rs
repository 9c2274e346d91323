//! Length-prefixed string encoding used on the wire
//!
//! A string is a 2-byte big-endian length followed by its raw bytes. Strings
//! longer than [`MAX_STRING_LEN`] are rejected, never truncated.

use arcstr::ArcStr;
use bytes::{Buf, BufMut};
use thiserror::Error;

use crate::topic::limits::MAX_TOPIC_LENGTH;

/// Longest string the 2-byte prefix can describe
pub const MAX_STRING_LEN: usize = MAX_TOPIC_LENGTH;

/// Errors raised while encoding or decoding wire strings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
	/// String does not fit the 2-byte length prefix
	#[error("string of {len} bytes exceeds the {max} byte limit")]
	StringTooLong {
		/// Length of the rejected string
		len: usize,
		/// Largest accepted length
		max: usize,
	},

	/// Not enough bytes to read or write the value
	#[error("buffer too short: need {needed} bytes, {available} available")]
	ShortBuffer {
		/// Bytes required
		needed: usize,
		/// Bytes available
		available: usize,
	},

	/// Decoded string is not UTF-8
	#[error("string is not valid UTF-8: {0}")]
	InvalidUtf8(#[from] std::str::Utf8Error),
}

impl CodecError {
	fn string_too_long(len: usize) -> Self {
		Self::StringTooLong {
			len,
			max: MAX_STRING_LEN,
		}
	}

	fn short_buffer(needed: usize, available: usize) -> Self {
		Self::ShortBuffer { needed, available }
	}
}

/// Convenient Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Number of bytes `s` occupies once encoded.
pub fn encoded_len(s: &[u8]) -> usize {
	2 + s.len()
}

fn checked_len(s: &[u8]) -> CodecResult<u16> {
	u16::try_from(s.len()).map_err(|_| CodecError::string_too_long(s.len()))
}

/// Appends the length-prefixed encoding of `s` to `buf`.
pub fn encode_str<B: BufMut>(buf: &mut B, s: &[u8]) -> CodecResult<()> {
	let len = checked_len(s)?;
	if buf.remaining_mut() < encoded_len(s) {
		return Err(CodecError::short_buffer(
			encoded_len(s),
			buf.remaining_mut(),
		));
	}
	buf.put_u16(len);
	buf.put_slice(s);
	Ok(())
}

/// Reads one length-prefixed UTF-8 string from `buf`.
///
/// On error the read position of `buf` is unspecified.
pub fn decode_str<B: Buf>(buf: &mut B) -> CodecResult<ArcStr> {
	if buf.remaining() < 2 {
		return Err(CodecError::short_buffer(2, buf.remaining()));
	}
	let len = usize::from(buf.get_u16());
	if buf.remaining() < len {
		return Err(CodecError::short_buffer(len, buf.remaining()));
	}
	let raw = buf.copy_to_bytes(len);
	let s = std::str::from_utf8(&raw)?;
	Ok(ArcStr::from(s))
}

/// Encodes a topic into an exactly sized buffer.
pub fn encode_topic(topic: &str) -> CodecResult<Vec<u8>> {
	let mut buf = vec![0; encoded_len(topic.as_bytes())];
	let mut writer = FixedWriter::new(&mut buf);
	writer.write_str(topic.as_bytes())?;
	debug_assert_eq!(writer.remaining(), 0);
	Ok(buf)
}

/// Writer over a buffer sized up front.
///
/// Callers compute the exact size before writing, so running past the end is
/// a bug in the caller and panics instead of truncating.
#[derive(Debug)]
pub struct FixedWriter<'a> {
	buf: &'a mut [u8],
	written: usize,
}

impl<'a> FixedWriter<'a> {
	/// Wraps `buf`; writing starts at its first byte.
	pub fn new(buf: &'a mut [u8]) -> Self {
		Self { buf, written: 0 }
	}

	/// Bytes written so far
	pub fn bytes_written(&self) -> usize {
		self.written
	}

	/// Bytes left before the end of the buffer
	pub fn remaining(&self) -> usize {
		self.buf.len() - self.written
	}

	/// # Panics
	///
	/// Panics if the buffer is full.
	pub fn write_u8(&mut self, byte: u8) {
		self.write(&[byte]);
	}

	/// # Panics
	///
	/// Panics if `bytes` does not fit in the remaining space.
	pub fn write(&mut self, bytes: &[u8]) {
		assert!(
			bytes.len() <= self.remaining(),
			"fixed buffer overflow: writing {} bytes with {} left",
			bytes.len(),
			self.remaining()
		);
		let end = self.written + bytes.len();
		self.buf[self.written .. end].copy_from_slice(bytes);
		self.written = end;
	}

	/// Writes the length-prefixed encoding of `s`.
	///
	/// # Panics
	///
	/// Panics if the encoding does not fit in the remaining space.
	pub fn write_str(&mut self, s: &[u8]) -> CodecResult<()> {
		let len = checked_len(s)?;
		self.write(&len.to_be_bytes());
		self.write(s);
		Ok(())
	}
}
