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

//! Bridges from [`std::io::Read`]/[`std::io::Write`] to [`RawSource`]/
//! [`RawSink`], since every real caller drives this crate from a file or
//! socket through those traits rather than a hand-rolled one.

use std::io::{Read, Write};
use crate::Buffer;
use crate::error::Result;
use crate::segment::SEGMENT_SIZE;
use crate::streams::{RawSink, RawSource};

/// Wraps a [`Read`] as a [`RawSource`].
pub struct ReaderSource<R> {
	inner: R,
}

impl<R: Read> ReaderSource<R> {
	pub fn new(inner: R) -> Self { Self { inner } }

	pub fn into_inner(self) -> R { self.inner }
}

impl<R: Read> RawSource for ReaderSource<R> {
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<i64> {
		let mut chunk = vec![0u8; byte_count.min(SEGMENT_SIZE)];
		let n = self.inner.read(&mut chunk)?;
		if n == 0 {
			return Ok(-1);
		}
		sink.write_from_slice(&chunk[..n]);
		Ok(n as i64)
	}
}

/// Wraps a [`Write`] as a [`RawSink`].
pub struct WriterSink<W> {
	inner: W,
}

impl<W: Write> WriterSink<W> {
	pub fn new(inner: W) -> Self { Self { inner } }

	pub fn into_inner(self) -> W { self.inner }
}

impl<W: Write> RawSink for WriterSink<W> {
	fn write_from(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		let mut remaining = byte_count;
		while remaining > 0 {
			let chunk = source.read_byte_string(remaining)?;
			if chunk.is_empty() { break }
			self.inner.write_all(chunk.as_slice())?;
			remaining -= chunk.len();
		}
		Ok(())
	}

	fn flush(&mut self) -> Result {
		self.inner.flush()?;
		Ok(())
	}
}
