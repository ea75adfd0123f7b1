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

//! Direct segment access for codec and bridge implementors who would
//! otherwise have to copy through an intermediate `Vec<u8>` on every call.
//!
//! [`UnsafeCursor`] is "unsafe" in the buffer-invariant sense, not the
//! memory-safety sense: it has no `unsafe` blocks of its own, but it lets a
//! caller read or write a segment's backing array directly and is the only
//! place in this crate where a closure can under- or over-report how many
//! bytes it consumed or produced. [`crate::transform`] is built entirely on
//! top of this.

use crate::Buffer;

/// A short-lived handle onto a buffer's head and tail segments.
pub struct UnsafeCursor<'b> {
	buf: &'b mut Buffer,
}

impl<'b> UnsafeCursor<'b> {
	pub fn new(buf: &'b mut Buffer) -> Self {
		Self { buf }
	}

	/// Calls `f` with the readable window of the buffer's head segment, or an
	/// empty slice if the buffer has nothing buffered. `f` must return how
	/// many of the leading bytes it actually consumed; that many bytes are
	/// then dropped from the head of the buffer. Returns the consumed count.
	pub fn read_head(&mut self, f: impl FnOnce(&[u8]) -> usize) -> usize {
		let Some(seg) = self.buf.head() else {
			return 0;
		};
		let consumed = seg.borrow().read(|data| f(data).min(data.len()));
		self.buf.consume_from_head(consumed);
		consumed
	}

	/// Calls `f` with at least `min_capacity` bytes of writable space in the
	/// buffer's tail segment. `f` must return how many of the leading bytes
	/// it actually wrote; that many bytes are then appended to the buffer.
	/// `min_capacity` must not exceed [`crate::SEGMENT_SIZE`].
	pub fn write_tail(&mut self, min_capacity: usize, f: impl FnOnce(&mut [u8]) -> usize) -> usize {
		let tail = self.buf.writable_tail(min_capacity);
		let produced = {
			let mut seg = tail.borrow_mut();
			seg.write_tail(|slice| f(slice).min(slice.len()))
		};
		tail.borrow_mut().grow(produced);
		self.buf.add_size(produced);
		produced
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn read_head_consumes_only_reported_count() {
		let mut buf = Buffer::new();
		buf.write_from_slice(b"hello world");
		let mut cursor = UnsafeCursor::new(&mut buf);
		let n = cursor.read_head(|data| {
			assert_eq!(data, b"hello world");
			5
		});
		assert_eq!(n, 5);
		assert_eq!(buf.size(), 6);
	}

	#[test]
	fn write_tail_grows_by_reported_count() {
		let mut buf = Buffer::new();
		let mut cursor = UnsafeCursor::new(&mut buf);
		let n = cursor.write_tail(4, |slice| {
			slice[..4].copy_from_slice(b"ABCD");
			4
		});
		assert_eq!(n, 4);
		assert_eq!(buf.size(), 4);
		assert_eq!(buf.snapshot().as_slice(), b"ABCD");
	}
}
