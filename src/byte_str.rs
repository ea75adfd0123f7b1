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

//! [`ByteString`]: an immutable, comparable, hashable sequence of bytes.

use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use crate::error::{Error, Result};

/// An immutable byte sequence. Cheap to clone (backed by an [`Arc`]); content
/// equality and ordering are unsigned-byte lexicographic.
#[derive(Clone, Eq)]
pub struct ByteString {
	bytes: Arc<[u8]>,
	hash: Cell<u64>,
}

const HASH_UNSET: u64 = 0;

impl ByteString {
	/// The empty byte string.
	pub fn empty() -> Self { Self::from(Vec::new()) }

	/// Copies `bytes` into a new byte string.
	pub fn copy_from(bytes: &[u8]) -> Self { Self::from(bytes.to_vec()) }

	/// Encodes `text` as UTF-8.
	pub fn encode_utf8(text: &str) -> Self { Self::from(text.as_bytes().to_vec()) }

	/// Decodes the content as UTF-8.
	pub fn decode_to_string(&self) -> Result<String> {
		simdutf8::compat::from_utf8(&self.bytes)
			.map(str::to_owned)
			.map_err(|e| Error::malformed(format!("invalid utf-8 at byte {}", e.valid_up_to())))
	}

	/// The number of bytes.
	pub fn len(&self) -> usize { self.bytes.len() }

	/// `true` if there are no bytes.
	pub fn is_empty(&self) -> bool { self.bytes.is_empty() }

	/// The byte at `index`, or `None` if out of bounds.
	pub fn get(&self, index: usize) -> Option<u8> { self.bytes.get(index).copied() }

	/// Borrows the full content.
	pub fn as_slice(&self) -> &[u8] { &self.bytes }

	/// A new byte string covering `[from, to)`.
	pub fn substring(&self, from: usize, to: usize) -> ByteString {
		Self::copy_from(&self.bytes[from..to])
	}

	/// Copies `[from, to)` into a new, owned `Vec<u8>`.
	pub fn to_byte_array(&self, from: usize, to: usize) -> Vec<u8> {
		self.bytes[from..to].to_vec()
	}

	/// Copies `[from, to)` into `dest` starting at `dest_off`.
	pub fn copy_into(&self, dest: &mut [u8], dest_off: usize, from: usize, to: usize) {
		dest[dest_off..dest_off + (to - from)].copy_from_slice(&self.bytes[from..to]);
	}

	/// The first index of `byte` at or after `from`, if any.
	pub fn index_of_byte(&self, byte: u8, from: usize) -> Option<usize> {
		if from >= self.len() { return None }
		self.bytes[from..].iter().position(|&b| b == byte).map(|i| i + from)
	}

	/// The first index of `needle` at or after `from`, if any. An empty
	/// needle matches at `from`.
	pub fn index_of(&self, needle: &ByteString, from: usize) -> Option<usize> {
		if needle.is_empty() { return Some(from.min(self.len())) }
		if from >= self.len() || needle.len() > self.len() - from { return None }
		self.bytes[from..].windows(needle.len()).position(|w| w == needle.as_slice()).map(|i| i + from)
	}

	/// The last index of `needle` at or before `from_end` (exclusive upper
	/// bound), if any.
	pub fn last_index_of(&self, needle: &ByteString, from_end: usize) -> Option<usize> {
		if needle.is_empty() { return Some(from_end.min(self.len())) }
		let limit = from_end.min(self.len());
		if needle.len() > limit { return None }
		self.bytes[..limit].windows(needle.len()).rposition(|w| w == needle.as_slice())
	}

	/// Whether this byte string begins with `prefix`.
	pub fn starts_with(&self, prefix: &ByteString) -> bool {
		self.bytes.starts_with(prefix.as_slice())
	}

	/// Whether this byte string ends with `suffix`.
	pub fn ends_with(&self, suffix: &ByteString) -> bool {
		self.bytes.ends_with(suffix.as_slice())
	}

	/// Content equality with a plain byte slice.
	pub fn content_equals(&self, other: &[u8]) -> bool {
		self.bytes.as_ref() == other
	}

	fn compute_hash(&self) -> u64 {
		let mut hasher = std::collections::hash_map::DefaultHasher::new();
		self.bytes.hash(&mut hasher);
		let h = hasher.finish();
		if h == HASH_UNSET { 1 } else { h }
	}

	/// The content hash, computed once and cached.
	pub fn content_hash(&self) -> u64 {
		let cached = self.hash.get();
		if cached != HASH_UNSET { return cached }
		let h = self.compute_hash();
		self.hash.set(h);
		h
	}
}

impl From<Vec<u8>> for ByteString {
	fn from(bytes: Vec<u8>) -> Self {
		Self { bytes: Arc::from(bytes), hash: Cell::new(HASH_UNSET) }
	}
}

impl From<&[u8]> for ByteString {
	fn from(bytes: &[u8]) -> Self { Self::copy_from(bytes) }
}

impl PartialEq for ByteString {
	fn eq(&self, other: &Self) -> bool { self.bytes == other.bytes }
}

impl Hash for ByteString {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_u64(self.content_hash());
	}
}

impl Ord for ByteString {
	fn cmp(&self, other: &Self) -> Ordering { self.bytes.as_ref().cmp(other.bytes.as_ref()) }
}

impl PartialOrd for ByteString {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Debug for ByteString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ByteString(size={} hex={})", self.len(), hex_upper(&self.bytes))
	}
}

impl fmt::Display for ByteString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

fn hex_upper(bytes: &[u8]) -> String {
	let mut out = vec![0u8; bytes.len() * 2];
	base16ct::upper::encode(bytes, &mut out).expect("buffer sized exactly for hex output");
	// SAFETY: base16ct only ever writes ASCII hex digits.
	unsafe { String::from_utf8_unchecked(out) }
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn constructing_copies_the_array() {
		let mut source = vec![1, 2, 3];
		let bs = ByteString::copy_from(&source);
		source[0] = 0xFF;
		assert_eq!(bs.as_slice(), &[1, 2, 3]);
	}

	#[test]
	fn s1_byte_string_contract() {
		let bs = ByteString::from(vec![0x01, 0x02, 0x03, 0x04, 0x05]);
		assert_eq!(bs.substring(1, 4), ByteString::from(vec![0x02, 0x03, 0x04]));
		assert_eq!(bs.index_of(&ByteString::from(vec![0x03, 0x04]), 0), Some(2));
		assert_eq!(format!("{bs:?}"), "ByteString(size=5 hex=0102030405)");
		let same = ByteString::from(vec![0x01, 0x02, 0x03, 0x04, 0x05]);
		assert_eq!(bs.content_hash(), same.content_hash());
	}
}
