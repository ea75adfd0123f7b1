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

//! Streaming transformation pipeline: the adapter that lets a codec written
//! against plain `&[u8]` windows (see [`crate::codec`]) sit between a
//! [`crate::Buffer`] and a [`crate::streams::RawSource`]/
//! [`crate::streams::RawSink`] without ever buffering a whole payload.

use crate::error::Result;
use crate::segment::SEGMENT_SIZE;
use crate::streams::{BufferedSink, BufferedSource, RawSink, RawSource};
use crate::Buffer;

/// The outcome of one transformation step.
#[derive(Debug)]
pub enum TransformResult {
	/// `consumed` bytes of input were consumed and `produced` bytes of output
	/// were written; more input may still be needed.
	Ok { consumed: usize, produced: usize },
	/// The transformation has produced its final output; no more input will
	/// be accepted.
	Done { consumed: usize, produced: usize },
	/// The output window was too small to make progress; call again with at
	/// least this many free bytes.
	OutputRequired(usize),
}

/// A streaming, byte-array-level transformation, e.g. a DEFLATE encoder.
///
/// Implementors never see a [`Buffer`] directly; [`TransformingSource`] and
/// [`TransformingSink`] are the only callers, and they always pass windows
/// sized to a single segment or smaller.
pub trait Transformation {
	/// Transforms as much of `input` as fits in `output`. Must not read past
	/// the end of `input`, or write past the end of `output`.
	fn transform(&mut self, input: &[u8], output: &mut [u8]) -> Result<TransformResult>;

	/// Called once all input has been consumed; flushes any output the
	/// transformation was holding internally (e.g. a trailer). May be called
	/// more than once if `output` was too small to finish in one call.
	fn finish(&mut self, output: &mut [u8]) -> Result<TransformResult>;
}

/// Applies a [`Transformation`] to bytes pulled from an upstream
/// [`RawSource`], exposing the transformed bytes as a [`RawSource`] in turn.
pub struct TransformingSource<S: RawSource, T: Transformation> {
	inner: BufferedSource<S>,
	transform: T,
	finished: bool,
}

impl<S: RawSource, T: Transformation> TransformingSource<S, T> {
	pub fn new(inner: S, transform: T) -> Self {
		Self { inner: BufferedSource::new(inner), transform, finished: false }
	}
}

impl<S: RawSource, T: Transformation> RawSource for TransformingSource<S, T> {
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<i64> {
		if self.finished {
			return Ok(-1);
		}

		let mut output = vec![0u8; byte_count.min(SEGMENT_SIZE).max(1)];
		let have_input = self.inner.request(1)?;

		let outcome = if have_input {
			let mut input = vec![0u8; self.inner.buffer().size().min(SEGMENT_SIZE)];
			let n = self.inner.buffer().read_into_slice(&mut input)?;
			let result = self.transform.transform(&input[..n], &mut output)?;
			if let TransformResult::OutputRequired(_) = result {
				self.inner.buffer().write_from_slice(&input[..n]);
			}
			result
		} else {
			self.transform.finish(&mut output)?
		};

		match outcome {
			TransformResult::Ok { produced, .. } => {
				if produced == 0 {
					return self.read_at_most_to(sink, byte_count);
				}
				sink.write_from_slice(&output[..produced]);
				Ok(produced as i64)
			}
			TransformResult::Done { produced, .. } => {
				self.finished = true;
				if produced == 0 {
					return Ok(-1);
				}
				sink.write_from_slice(&output[..produced]);
				Ok(produced as i64)
			}
			TransformResult::OutputRequired(needed) => {
				let mut bigger = vec![0u8; needed];
				let result = self.transform.finish(&mut bigger)?;
				match result {
					TransformResult::Ok { produced, .. } | TransformResult::Done { produced, .. } => {
						if matches!(result, TransformResult::Done { .. }) {
							self.finished = true;
						}
						if produced == 0 {
							return Ok(-1);
						}
						sink.write_from_slice(&bigger[..produced]);
						Ok(produced as i64)
					}
					TransformResult::OutputRequired(_) => Ok(0),
				}
			}
		}
	}
}

/// Applies a [`Transformation`] to bytes written by a caller, forwarding the
/// transformed bytes to a downstream [`RawSink`].
pub struct TransformingSink<S: RawSink, T: Transformation> {
	inner: BufferedSink<S>,
	transform: T,
	closed: bool,
}

impl<S: RawSink, T: Transformation> TransformingSink<S, T> {
	pub fn new(inner: S, transform: T) -> Self {
		Self { inner: BufferedSink::new(inner), transform, closed: false }
	}

	/// Finishes the transformation (flushing any trailer) and closes the
	/// sink it wraps. Idempotent.
	pub fn close(&mut self) -> Result {
		if self.closed {
			return Ok(());
		}
		self.closed = true;
		loop {
			let mut output = vec![0u8; SEGMENT_SIZE];
			match self.transform.finish(&mut output)? {
				TransformResult::Done { produced, .. } => {
					if produced > 0 {
						self.inner.write_from_slice(&output[..produced]);
					}
					break;
				}
				TransformResult::Ok { produced, .. } => {
					if produced > 0 {
						self.inner.write_from_slice(&output[..produced]);
					}
				}
				TransformResult::OutputRequired(needed) => {
					let mut bigger = vec![0u8; needed];
					if let TransformResult::Done { produced, .. } | TransformResult::Ok { produced, .. } =
						self.transform.finish(&mut bigger)?
					{
						if produced > 0 {
							self.inner.write_from_slice(&bigger[..produced]);
						}
					}
					break;
				}
			}
		}
		self.inner.close()
	}
}

impl<S: RawSink, T: Transformation> RawSink for TransformingSink<S, T> {
	fn write_from(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		let mut remaining = byte_count;
		while remaining > 0 {
			let chunk_len = remaining.min(SEGMENT_SIZE);
			let mut input = vec![0u8; chunk_len];
			let n = source.read_into_slice_exact(&mut input).map(|_| chunk_len)?;
			remaining -= n;

			let mut offset = 0;
			while offset < n {
				let mut output = vec![0u8; SEGMENT_SIZE];
				match self.transform.transform(&input[offset..n], &mut output)? {
					TransformResult::Ok { consumed, produced } | TransformResult::Done { consumed, produced } => {
						if produced > 0 {
							self.inner.write_from_slice(&output[..produced]);
						}
						offset += consumed.max(1).min(n - offset);
						if consumed == 0 && produced == 0 {
							break;
						}
					}
					TransformResult::OutputRequired(needed) => {
						let mut bigger = vec![0u8; needed];
						if let TransformResult::Ok { consumed, produced }
						| TransformResult::Done { consumed, produced } =
							self.transform.transform(&input[offset..n], &mut bigger)?
						{
							if produced > 0 {
								self.inner.write_from_slice(&bigger[..produced]);
							}
							offset += consumed.max(1).min(n - offset);
						}
					}
				}
			}
		}
		Ok(())
	}

	fn flush(&mut self) -> Result {
		self.inner.flush()
	}

	fn close(&mut self) -> Result {
		TransformingSink::close(self)
	}
}

impl<S: RawSink, T: Transformation> Drop for TransformingSink<S, T> {
	fn drop(&mut self) {
		let _ = self.close();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	/// A transformation that uppercases ASCII letters, passing everything
	/// else through unchanged. Used only to exercise the adapter plumbing.
	struct Uppercase;

	impl Transformation for Uppercase {
		fn transform(&mut self, input: &[u8], output: &mut [u8]) -> Result<TransformResult> {
			let n = input.len().min(output.len());
			for i in 0..n {
				output[i] = input[i].to_ascii_uppercase();
			}
			Ok(TransformResult::Ok { consumed: n, produced: n })
		}

		fn finish(&mut self, _output: &mut [u8]) -> Result<TransformResult> {
			Ok(TransformResult::Done { consumed: 0, produced: 0 })
		}
	}

	#[test]
	fn transforming_source_applies_transform() {
		let data: &[u8] = b"hello";
		let mut source = TransformingSource::new(data, Uppercase);
		let mut out = Buffer::new();
		loop {
			let n = source.read_at_most_to(&mut out, 64).unwrap();
			if n == -1 {
				break;
			}
		}
		assert_eq!(out.snapshot().as_slice(), b"HELLO");
	}

	#[test]
	fn transforming_sink_applies_transform() {
		let mut written = Vec::new();
		{
			let sink = crate::streams::WriterSink::new(&mut written);
			let mut sink = TransformingSink::new(sink, Uppercase);
			let mut input = Buffer::new();
			input.write_from_slice(b"world");
			let n = input.size();
			sink.write_from(&mut input, n).unwrap();
			sink.close().unwrap();
		}
		assert_eq!(written, b"WORLD");
	}
}
