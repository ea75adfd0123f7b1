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

//! Big- and little-endian primitive writes, and UTF-8 text writes.

use crate::Buffer;
use crate::byte_str::ByteString;

macro_rules! gen_int_writes {
	($($name:ident $name_le:ident -> $ty:ident),+ $(,)?) => {
		$(
		#[doc = concat!(" Writes one big-endian `", stringify!($ty), "`.")]
		pub fn $name(&mut self, value: $ty) {
			self.write_from_slice(&value.to_be_bytes());
		}

		#[doc = concat!(" Writes one little-endian `", stringify!($ty), "`.")]
		pub fn $name_le(&mut self, value: $ty) {
			self.write_from_slice(&value.to_le_bytes());
		}
		)+
	};
}

impl Buffer {
	/// Writes a single byte.
	pub fn write_u8(&mut self, value: u8) {
		self.write_from_slice(&[value]);
	}

	/// Writes a single signed byte.
	pub fn write_i8(&mut self, value: i8) {
		self.write_u8(value as u8);
	}

	gen_int_writes! {
		write_u16 write_u16_le -> u16,
		write_i16 write_i16_le -> i16,
		write_u32 write_u32_le -> u32,
		write_i32 write_i32_le -> i32,
		write_u64 write_u64_le -> u64,
		write_i64 write_i64_le -> i64,
	}

	/// Writes UTF-8 encoded text.
	pub fn write_utf8(&mut self, value: &str) {
		self.write_from_slice(value.as_bytes());
	}

	/// Writes the contents of a [`ByteString`].
	pub fn write_byte_string(&mut self, value: &ByteString) {
		self.write_from_slice(value.as_slice());
	}
}
