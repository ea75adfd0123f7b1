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

//! Big- and little-endian primitive reads, and UTF-8 text reads.

use crate::Buffer;
use crate::byte_str::ByteString;
use crate::error::{Error, Result};

macro_rules! gen_int_reads {
	($($name:ident $name_le:ident -> $ty:ident),+ $(,)?) => {
		$(
		#[doc = concat!(" Reads one big-endian `", stringify!($ty), "`.")]
		pub fn $name(&mut self) -> Result<$ty> {
			let mut bytes = [0u8; std::mem::size_of::<$ty>()];
			self.read_into_slice_exact(&mut bytes)?;
			Ok($ty::from_be_bytes(bytes))
		}

		#[doc = concat!(" Reads one little-endian `", stringify!($ty), "`.")]
		pub fn $name_le(&mut self) -> Result<$ty> {
			let mut bytes = [0u8; std::mem::size_of::<$ty>()];
			self.read_into_slice_exact(&mut bytes)?;
			Ok($ty::from_le_bytes(bytes))
		}
		)+
	};
}

impl Buffer {
	/// Reads a single byte.
	pub fn read_u8(&mut self) -> Result<u8> {
		let mut byte = [0u8; 1];
		self.read_into_slice_exact(&mut byte)?;
		Ok(byte[0])
	}

	/// Reads a single signed byte.
	pub fn read_i8(&mut self) -> Result<i8> {
		Ok(self.read_u8()? as i8)
	}

	gen_int_reads! {
		read_u16 read_u16_le -> u16,
		read_i16 read_i16_le -> i16,
		read_u32 read_u32_le -> u32,
		read_i32 read_i32_le -> i32,
		read_u64 read_u64_le -> u64,
		read_i64 read_i64_le -> i64,
	}

	/// Reads up to `dst.len()` bytes, returning the number actually read
	/// (less than `dst.len()` only on underflow).
	pub fn read_into_slice(&mut self, dst: &mut [u8]) -> Result<usize> {
		let mut n = 0;
		while n < dst.len() {
			let Some(head) = self.head() else { break };
			let read = head.borrow_mut().pop_into_slice(&mut dst[n..]);
			self.size -= read;
			n += read;
			if read == 0 { break }
		}
		Ok(n)
	}

	/// Reads exactly `dst.len()` bytes, failing with an end-of-input error on
	/// underflow. Nothing is consumed if the read fails.
	pub fn read_into_slice_exact(&mut self, dst: &mut [u8]) -> Result {
		if dst.len() > self.size {
			return Err(Error::end_of_input(format!(
				"requested {} bytes, buffer has {}", dst.len(), self.size
			)));
		}
		let n = self.read_into_slice(dst)?;
		debug_assert_eq!(n, dst.len());
		Ok(())
	}

	/// Reads up to `byte_count` bytes into a new [`ByteString`].
	pub fn read_byte_string(&mut self, byte_count: usize) -> Result<ByteString> {
		let n = byte_count.min(self.size);
		let mut buf = vec![0u8; n];
		self.read_into_slice_exact(&mut buf)?;
		Ok(ByteString::from(buf))
	}

	/// Reads up to `byte_count` bytes of UTF-8 text, appending to `out` and
	/// returning the number of bytes consumed.
	pub fn read_utf8(&mut self, out: &mut String, byte_count: usize) -> Result<usize> {
		let n = byte_count.min(self.size);
		let mut buf = vec![0u8; n];
		self.read_into_slice_exact(&mut buf)?;
		match simdutf8::compat::from_utf8(&buf) {
			Ok(s) => {
				out.push_str(s);
				Ok(n)
			}
			Err(e) => {
				let valid = e.valid_up_to();
				out.push_str(std::str::from_utf8(&buf[..valid]).unwrap());
				Err(Error::malformed(format!("invalid utf-8 at byte {valid}")))
			}
		}
	}
}
