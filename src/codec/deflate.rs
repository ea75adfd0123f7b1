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

//! Raw (nowrap) DEFLATE, the inner codec [`crate::codec::gzip`] wraps with a
//! header and trailer.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::{Error, Result};
use crate::transform::{Transformation, TransformResult};

/// The valid range for a DEFLATE compression level, matching zlib's.
pub const MIN_LEVEL: i32 = 0;
pub const MAX_LEVEL: i32 = 9;

/// A [`Transformation`] that DEFLATE-compresses its input.
pub struct DeflateEncoder {
	compress: Compress,
	total_in: u64,
	total_out: u64,
}

impl DeflateEncoder {
	/// Builds an encoder at `level`. `level` must be between [`MIN_LEVEL`] and
	/// [`MAX_LEVEL`]; out-of-range values are rejected rather than clamped, so
	/// a caller's typo doesn't silently produce the wrong compression ratio.
	pub fn new(level: i32) -> Result<Self> {
		if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
			return Err(Error::invalid_argument(format!(
				"deflate level {level} outside {MIN_LEVEL}..={MAX_LEVEL}"
			)));
		}
		Ok(Self {
			compress: Compress::new(Compression::new(level as u32), false),
			total_in: 0,
			total_out: 0,
		})
	}
}

impl Transformation for DeflateEncoder {
	fn transform(&mut self, input: &[u8], output: &mut [u8]) -> Result<TransformResult> {
		self.compress
			.compress(input, output, FlushCompress::None)
			.map_err(|e| Error::malformed(e.to_string()))?;
		let consumed = (self.compress.total_in() - self.total_in) as usize;
		let produced = (self.compress.total_out() - self.total_out) as usize;
		self.total_in = self.compress.total_in();
		self.total_out = self.compress.total_out();
		Ok(TransformResult::Ok { consumed, produced })
	}

	fn finish(&mut self, output: &mut [u8]) -> Result<TransformResult> {
		let status = self
			.compress
			.compress(&[], output, FlushCompress::Finish)
			.map_err(|e| Error::malformed(e.to_string()))?;
		let produced = (self.compress.total_out() - self.total_out) as usize;
		self.total_out = self.compress.total_out();
		if status == Status::StreamEnd {
			Ok(TransformResult::Done { consumed: 0, produced })
		} else if produced == 0 {
			Ok(TransformResult::OutputRequired(output.len() * 2))
		} else {
			Ok(TransformResult::Ok { consumed: 0, produced })
		}
	}
}

/// A [`Transformation`] that DEFLATE-decompresses its input.
pub struct DeflateDecoder {
	decompress: Decompress,
	total_in: u64,
	total_out: u64,
}

impl DeflateDecoder {
	pub fn new() -> Self {
		Self { decompress: Decompress::new(false), total_in: 0, total_out: 0 }
	}

	/// The total bytes this decoder has produced so far, e.g. for a GZIP
	/// trailer's size check.
	pub fn total_out(&self) -> u64 {
		self.decompress.total_out()
	}
}

impl Default for DeflateDecoder {
	fn default() -> Self {
		Self::new()
	}
}

impl Transformation for DeflateDecoder {
	fn transform(&mut self, input: &[u8], output: &mut [u8]) -> Result<TransformResult> {
		let status = self
			.decompress
			.decompress(input, output, FlushDecompress::None)
			.map_err(|e| Error::malformed(e.to_string()))?;
		let consumed = (self.decompress.total_in() - self.total_in) as usize;
		let produced = (self.decompress.total_out() - self.total_out) as usize;
		self.total_in = self.decompress.total_in();
		self.total_out = self.decompress.total_out();
		if status == Status::StreamEnd {
			Ok(TransformResult::Done { consumed, produced })
		} else if consumed == 0 && produced == 0 && !input.is_empty() {
			Ok(TransformResult::OutputRequired(output.len() * 2))
		} else {
			Ok(TransformResult::Ok { consumed, produced })
		}
	}

	fn finish(&mut self, _output: &mut [u8]) -> Result<TransformResult> {
		Err(Error::malformed("deflate stream ended before its final block"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn round_trips_through_a_single_buffer() {
		let input = b"the quick brown fox jumps over the lazy dog".repeat(8);
		let mut encoder = DeflateEncoder::new(6).unwrap();
		let mut compressed = vec![0u8; input.len() * 2 + 64];
		let r = encoder.transform(&input, &mut compressed).unwrap();
		let TransformResult::Ok { consumed, produced } = r else { panic!("{r:?}") };
		assert_eq!(consumed, input.len());
		let mut tail = vec![0u8; 64];
		let TransformResult::Done { produced: tail_produced, .. } =
			encoder.finish(&mut tail).unwrap()
		else {
			panic!("expected finish to reach stream end in one call")
		};

		let mut decoder = DeflateDecoder::new();
		let mut decompressed = vec![0u8; input.len() + 64];
		let mut total = 0;
		let r = decoder
			.transform(&compressed[..produced], &mut decompressed[total..])
			.unwrap();
		if let TransformResult::Ok { produced: p, .. } = r {
			total += p;
		}
		let r = decoder
			.transform(&tail[..tail_produced], &mut decompressed[total..])
			.unwrap();
		let TransformResult::Done { produced: p, .. } = r else { panic!("{r:?}") };
		total += p;
		assert_eq!(&decompressed[..total], &input[..]);
	}

	#[test]
	fn rejects_out_of_range_level() {
		assert!(DeflateEncoder::new(10).is_err());
		assert!(DeflateEncoder::new(-1).is_err());
	}
}
