// Copyright 2023 Strixpyrr
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::Buffer;
use crate::byte_str::ByteString;
use crate::error::{Error, Result};
use crate::segment::SEGMENT_SIZE;
use crate::streams::{RawSink, RawSource};

/// Wraps a [`RawSource`] with an internal [`Buffer`], providing framed
/// primitive reads, `request`/`require`, `index_of`, and restartable
/// look-ahead via [`BufferedSource::peek`].
pub struct BufferedSource<S: RawSource> {
	inner: S,
	buf: Buffer,
	closed: bool,
}

impl<S: RawSource> BufferedSource<S> {
	pub fn new(inner: S) -> Self {
		Self { inner, buf: Buffer::new(), closed: false }
	}

	/// Direct access to the internal buffer, e.g. for a [`crate::transform::Transformation`].
	pub fn buffer(&mut self) -> &mut Buffer { &mut self.buf }

	fn pull(&mut self) -> Result<bool> {
		let n = self.inner.read_at_most_to(&mut self.buf, SEGMENT_SIZE)?;
		Ok(n != -1)
	}

	/// Pulls from upstream until the buffer holds at least `byte_count`
	/// bytes, or upstream is exhausted. Returns whether the count was met.
	pub fn request(&mut self, byte_count: usize) -> Result<bool> {
		while self.buf.size() < byte_count {
			if !self.pull()? {
				return Ok(self.buf.size() >= byte_count);
			}
		}
		Ok(true)
	}

	/// Like [`Self::request`], but fails with an end-of-input error on
	/// shortfall.
	pub fn require(&mut self, byte_count: usize) -> Result {
		if self.request(byte_count)? {
			Ok(())
		} else {
			Err(Error::end_of_input(format!("required {byte_count} bytes from upstream")))
		}
	}

	/// A nested, non-consuming view for look-ahead parsing. Reading from the
	/// peek source advances only its own cursor; this source's own reads are
	/// unaffected and later see the same bytes again.
	pub fn peek(&mut self) -> PeekSource<'_, S> {
		PeekSource { outer: self, offset: 0 }
	}

	/// Pulls upstream until `byte` is found within `[from, to)`, upstream is
	/// exhausted, or `to` is exceeded.
	pub fn index_of(&mut self, byte: u8, from: usize, to: usize) -> Result<Option<usize>> {
		let mut scanned_to = from;
		loop {
			if let Some(idx) = self.buf.index_of(byte, from, to.min(self.buf.size())) {
				return Ok(Some(idx));
			}
			scanned_to = scanned_to.max(self.buf.size());
			if scanned_to >= to || !self.pull()? {
				return Ok(None);
			}
		}
	}

	/// Drains everything upstream has left into `sink`, returning the total
	/// byte count.
	pub fn read_all(&mut self, sink: &mut impl RawSink) -> Result<u64> {
		let mut total = 0u64;
		loop {
			if self.buf.is_empty() && !self.pull()? {
				break;
			}
			let n = self.buf.size();
			sink.write_from(&mut self.buf, n)?;
			total += n as u64;
		}
		Ok(total)
	}

	/// Reads up to `byte_count` bytes into a [`ByteString`].
	pub fn read_byte_string(&mut self, byte_count: usize) -> Result<ByteString> {
		self.request(byte_count)?;
		self.buf.read_byte_string(byte_count)
	}

	/// Reads exactly `dst.len()` bytes.
	pub fn read_into_slice_exact(&mut self, dst: &mut [u8]) -> Result {
		self.require(dst.len())?;
		self.buf.read_into_slice_exact(dst)
	}

	pub fn read_u8(&mut self) -> Result<u8> { self.require(1)?; self.buf.read_u8() }
	pub fn read_i8(&mut self) -> Result<i8> { self.require(1)?; self.buf.read_i8() }
	pub fn read_u16(&mut self) -> Result<u16> { self.require(2)?; self.buf.read_u16() }
	pub fn read_u16_le(&mut self) -> Result<u16> { self.require(2)?; self.buf.read_u16_le() }
	pub fn read_u32(&mut self) -> Result<u32> { self.require(4)?; self.buf.read_u32() }
	pub fn read_u32_le(&mut self) -> Result<u32> { self.require(4)?; self.buf.read_u32_le() }
	pub fn read_u64(&mut self) -> Result<u64> { self.require(8)?; self.buf.read_u64() }
	pub fn read_u64_le(&mut self) -> Result<u64> { self.require(8)?; self.buf.read_u64_le() }

	/// Idempotently closes this source and the one it wraps.
	pub fn close(&mut self) -> Result {
		if self.closed { return Ok(()) }
		self.closed = true;
		self.inner.close()
	}
}

impl<S: RawSource> Drop for BufferedSource<S> {
	fn drop(&mut self) { let _ = self.close(); }
}

/// A restartable look-ahead view produced by [`BufferedSource::peek`]. See
/// that method for the consuming/non-consuming contract.
pub struct PeekSource<'a, S: RawSource> {
	outer: &'a mut BufferedSource<S>,
	offset: usize,
}

impl<S: RawSource> PeekSource<'_, S> {
	/// Pulls upstream (into the shared outer buffer) until at least
	/// `byte_count` bytes are available from this cursor's position.
	pub fn request(&mut self, byte_count: usize) -> Result<bool> {
		self.outer.request(self.offset + byte_count)
	}

	pub fn require(&mut self, byte_count: usize) -> Result {
		if self.request(byte_count)? {
			Ok(())
		} else {
			Err(Error::end_of_input("peek required more bytes than upstream had"))
		}
	}

	pub fn read_into_slice_exact(&mut self, dst: &mut [u8]) -> Result {
		self.require(dst.len())?;
		let n = self.outer.buf.peek_into_slice(self.offset, dst);
		debug_assert_eq!(n, dst.len());
		self.offset += n;
		Ok(())
	}

	pub fn read_u8(&mut self) -> Result<u8> {
		let mut b = [0u8; 1];
		self.read_into_slice_exact(&mut b)?;
		Ok(b[0])
	}

	pub fn read_u32(&mut self) -> Result<u32> {
		let mut b = [0u8; 4];
		self.read_into_slice_exact(&mut b)?;
		Ok(u32::from_be_bytes(b))
	}

	pub fn read_u64(&mut self) -> Result<u64> {
		let mut b = [0u8; 8];
		self.read_into_slice_exact(&mut b)?;
		Ok(u64::from_be_bytes(b))
	}
}

/// Wraps a [`RawSink`] with an internal [`Buffer`], providing framed
/// primitive writes plus `emit`/`flush`/`close`.
pub struct BufferedSink<S: RawSink> {
	inner: S,
	buf: Buffer,
	closed: bool,
}

impl<S: RawSink> BufferedSink<S> {
	pub fn new(inner: S) -> Self {
		Self { inner, buf: Buffer::new(), closed: false }
	}

	/// Direct access to the internal buffer, e.g. for a [`crate::transform::Transformation`].
	pub fn buffer(&mut self) -> &mut Buffer { &mut self.buf }

	pub fn write_u8(&mut self, value: u8) { self.buf.write_u8(value) }
	pub fn write_i8(&mut self, value: i8) { self.buf.write_i8(value) }
	pub fn write_u16(&mut self, value: u16) { self.buf.write_u16(value) }
	pub fn write_u16_le(&mut self, value: u16) { self.buf.write_u16_le(value) }
	pub fn write_u32(&mut self, value: u32) { self.buf.write_u32(value) }
	pub fn write_u32_le(&mut self, value: u32) { self.buf.write_u32_le(value) }
	pub fn write_u64(&mut self, value: u64) { self.buf.write_u64(value) }
	pub fn write_u64_le(&mut self, value: u64) { self.buf.write_u64_le(value) }
	pub fn write_from_slice(&mut self, value: &[u8]) { self.buf.write_from_slice(value) }
	pub fn write_utf8(&mut self, value: &str) { self.buf.write_utf8(value) }
	pub fn write_byte_string(&mut self, value: &ByteString) { self.buf.write_byte_string(value) }

	/// Drains `source` into this sink's buffer until exhausted, returning the
	/// total byte count pulled.
	pub fn write_all(&mut self, source: &mut impl RawSource) -> Result<u64> {
		let mut total = 0u64;
		loop {
			let n = source.read_at_most_to(&mut self.buf, SEGMENT_SIZE)?;
			if n == -1 { break }
			total += n as u64;
		}
		Ok(total)
	}

	/// Flushes only the bytes that form whole, filled segments -- a latency
	/// hint, not a full drain. See [`Self::flush`] to drain everything.
	pub fn emit(&mut self) -> Result {
		let n = self.buf.complete_byte_count();
		if n > 0 {
			self.inner.write_from(&mut self.buf, n)?;
		}
		Ok(())
	}

	/// Drains the internal buffer completely to downstream and flushes it.
	pub fn flush(&mut self) -> Result {
		let n = self.buf.size();
		if n > 0 {
			self.inner.write_from(&mut self.buf, n)?;
		}
		self.inner.flush()
	}

	/// Flushes then closes downstream. Idempotent.
	pub fn close(&mut self) -> Result {
		if self.closed { return Ok(()) }
		self.closed = true;
		let flushed = self.flush();
		let closed = self.inner.close();
		flushed?;
		closed
	}
}

impl<S: RawSink> Drop for BufferedSink<S> {
	fn drop(&mut self) { let _ = self.close(); }
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn s3_peek_restart() {
		let data: &[u8] = &[0x00, 0x01, 0x02, 0x03];
		let mut source = BufferedSource::new(data);
		let peeked = source.peek().read_u32().unwrap();
		assert_eq!(peeked, 0x00010203);
		assert_eq!(source.read_u32().unwrap(), 0x00010203);
	}

	#[test]
	fn request_reports_shortfall_without_erroring() {
		let data: &[u8] = &[1, 2, 3];
		let mut source = BufferedSource::new(data);
		assert!(!source.request(10).unwrap());
		assert!(source.request(3).unwrap());
	}
}
