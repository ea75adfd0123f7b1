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

//! Raw and buffered stream halves.
//!
//! A [`RawSource`]/[`RawSink`] is the unbuffered boundary this crate is
//! driven through: a file, a socket, an in-memory slice. [`BufferedSource`]
//! and [`BufferedSink`] wrap a raw half with an internal [`Buffer`],
//! providing framed primitive reads/writes, `request`/`require`, `peek`, and
//! `index_of`.

mod buffered;
mod io;

pub use buffered::{BufferedSink, BufferedSource};
pub use io::{ReaderSource, WriterSink};

use crate::Buffer;
use crate::error::Result;

/// An unbuffered data source.
pub trait RawSource {
	/// Fills `sink`'s tail with between `0` and `byte_count` bytes, returning
	/// the number read, or `-1` for end of stream. Only returns `0` without
	/// signalling end of stream if the source is known never to block
	/// indefinitely on no data (this crate's sources never do).
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<i64>;

	/// Closes the source. Idempotent.
	fn close(&mut self) -> Result { Ok(()) }
}

/// An unbuffered data sink.
pub trait RawSink {
	/// Consumes exactly `byte_count` bytes from the head of `source`.
	fn write_from(&mut self, source: &mut Buffer, byte_count: usize) -> Result;

	/// Flushes any buffered bytes to their final destination. Idempotent.
	fn flush(&mut self) -> Result { Ok(()) }

	/// Flushes and closes the sink. Idempotent; implies [`RawSink::flush`].
	fn close(&mut self) -> Result { self.flush() }
}

impl RawSource for &[u8] {
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<i64> {
		if self.is_empty() {
			return Ok(-1);
		}
		let n = self.len().min(byte_count);
		sink.write_from_slice(&self[..n]);
		*self = &self[n..];
		Ok(n as i64)
	}
}
