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

//! The segmented [`Buffer`]: the in-memory byte sequence every other part of
//! the crate reads from and writes to. A buffer is simultaneously a
//! [`crate::streams::RawSource`] and a [`crate::streams::RawSink`].

mod read;
mod write;

use std::rc::Rc;
use crate::byte_str::ByteString;
use crate::error::{Error, Result};
use crate::segment::{self, Segment, SegmentRef, SEGMENT_SIZE};

/// An ordered cycle of segments behaving as both a source and a sink.
pub struct Buffer {
	head: Option<SegmentRef>,
	tail: Option<SegmentRef>,
	size: usize,
}

impl Default for Buffer {
	fn default() -> Self { Self::new() }
}

impl Buffer {
	/// Creates a new, empty buffer.
	pub fn new() -> Self {
		Self { head: None, tail: None, size: 0 }
	}

	/// The number of bytes currently held.
	pub fn size(&self) -> usize { self.size }

	/// `true` if the buffer holds no bytes.
	pub fn is_empty(&self) -> bool { self.size == 0 }

	/// Recycles every segment, leaving the buffer empty. Never fails; kept
	/// fallible in the signature to match the rest of the buffer/stream API,
	/// which treats `clear` as a normal, reportable buffer operation.
	pub fn clear(&mut self) -> Result {
		while self.pop_front_segment().is_some() {}
		Ok(())
	}

	/// Discards `byte_count` bytes from the front, without copying them
	/// anywhere. Returns the number of bytes actually skipped (less than
	/// requested only if the buffer underflows).
	pub fn skip(&mut self, mut byte_count: usize) -> usize {
		let mut skipped = 0;
		while byte_count > 0 {
			let Some(head) = self.head.clone() else { break };
			let avail = head.borrow().len();
			let n = avail.min(byte_count);
			head.borrow_mut().skip(n);
			self.size -= n;
			skipped += n;
			byte_count -= n;
			if head.borrow().is_empty() {
				self.pop_front_segment();
			}
		}
		skipped
	}

	/// An immutable snapshot of the buffer's current contents.
	pub fn snapshot(&self) -> ByteString {
		let mut out = Vec::with_capacity(self.size);
		self.for_each_segment(|seg| seg.read(|d| out.extend_from_slice(d)));
		ByteString::from(out)
	}

	/// Non-consuming copy of `count` bytes starting at `offset` into `sink`.
	/// Does not mutate `self`.
	pub fn copy_to(&self, sink: &mut Buffer, offset: usize, count: usize) -> Result<usize> {
		if offset + count > self.size {
			return Err(Error::end_of_input("copy_to: range exceeds buffer size"));
		}

		let mut remaining_skip = offset;
		let mut remaining = count;
		let mut copied = 0;
		self.for_each_segment(|seg| {
			if remaining == 0 { return }
			seg.read(|data| {
				let mut data = data;
				if remaining_skip > 0 {
					let skip = remaining_skip.min(data.len());
					data = &data[skip..];
					remaining_skip -= skip;
				}
				if data.is_empty() { return }
				let n = data.len().min(remaining);
				sink.write_from_slice(&data[..n]);
				remaining -= n;
				copied += n;
			});
		});

		Ok(copied)
	}

	/// Linear scan for `byte` within `[from, to)`, returning its absolute
	/// index, or `None` if not found.
	pub fn index_of(&self, byte: u8, from: usize, to: usize) -> Option<usize> {
		let to = to.min(self.size);
		if from >= to { return None }

		let mut base = 0usize;
		let mut result = None;
		self.for_each_segment(|seg| {
			if result.is_some() { return }
			let seg_len = seg.len();
			let seg_start = base;
			let seg_end = base + seg_len;
			base = seg_end;

			if seg_end <= from || seg_start >= to { return }

			seg.read(|data| {
				let lo = from.saturating_sub(seg_start);
				let hi = (to - seg_start).min(data.len());
				if let Some(pos) = data[lo..hi].iter().position(|&b| b == byte) {
					result = Some(seg_start + lo + pos);
				}
			});
		});
		result
	}

	/// Searches for the literal byte string `needle` within `[from, to)`. An
	/// empty needle returns `from`, clamped to the buffer's size.
	pub fn index_of_bytes(&self, needle: &ByteString, from: usize, to: usize) -> Option<usize> {
		if needle.is_empty() {
			return Some(from.min(self.size));
		}

		let hay = self.snapshot();
		let hay = hay.as_slice();
		let to = to.min(self.size);
		if from >= to || needle.len() > to - from { return None }

		hay[from..to].windows(needle.len()).position(|w| w == needle.as_slice()).map(|p| p + from)
	}

	pub(crate) fn push_back_segment(&mut self, node: SegmentRef) {
		self.size += node.borrow().len();
		match self.tail.take() {
			None => self.head = Some(Rc::clone(&node)),
			Some(tail) => segment::push_after(&tail, Rc::clone(&node)),
		}
		self.tail = Some(node);
	}

	pub(crate) fn pop_front_segment(&mut self) -> Option<SegmentRef> {
		let head = self.head.take()?;
		self.size -= head.borrow().len();
		let next = segment::next_in_cycle(&head);
		match next {
			Some(next) => {
				segment::detach(&head);
				self.head = Some(next);
			}
			None => self.tail = None,
		}
		segment::recycle(head);
		self.head.clone()
	}

	/// Returns (and recycles, if now empty) the head segment, or leaves it in
	/// place if it still has readable bytes. Used by readers that consume a
	/// few bytes at a time.
	pub(crate) fn head(&mut self) -> Option<SegmentRef> {
		let head = self.head.clone()?;
		if head.borrow().is_empty() {
			self.pop_front_segment();
			self.head.clone()
		} else {
			Some(head)
		}
	}

	/// Consumes `n` already-read bytes from the head segment fetched via
	/// [`Self::head`], updating the buffer's accounting. Used by
	/// [`crate::unsafe_cursor::UnsafeCursor`] after a zero-copy read.
	pub(crate) fn consume_from_head(&mut self, n: usize) {
		if let Some(head) = self.head() {
			head.borrow_mut().skip(n);
			self.size -= n;
		}
	}

	/// Accounts for `n` bytes written directly into the tail segment fetched
	/// via [`Self::writable_tail`]. Used by
	/// [`crate::unsafe_cursor::UnsafeCursor`] after a zero-copy write.
	pub(crate) fn add_size(&mut self, n: usize) {
		self.size += n;
	}

	/// Appends `byte_count` bytes of writable space to the tail, claiming new
	/// segments from the pool as needed, and returns the (possibly new) tail
	/// segment ready to be written into.
	pub(crate) fn writable_tail(&mut self, byte_count: usize) -> SegmentRef {
		if let Some(tail) = self.tail.clone() {
			if tail.borrow().is_owner() && !tail.borrow().is_shared() && tail.borrow().free_space() > 0 {
				return tail;
			}
		}
		let _ = byte_count;
		let fresh = Segment::take();
		self.push_back_segment(Rc::clone(&fresh));
		fresh
	}

	fn for_each_segment(&self, mut f: impl FnMut(&Segment)) {
		let mut cur = self.head.clone();
		let mut first = true;
		while let Some(node) = cur {
			if !first && self.head.as_ref().is_some_and(|h| Rc::ptr_eq(h, &node)) {
				break;
			}
			first = false;
			f(&node.borrow());
			cur = segment::next_in_cycle(&node);
		}
	}

	/// Transfers exactly `count` bytes from `source` into `self`, consuming
	/// them from `source`. Whole, unshared segments are spliced in directly
	/// when possible instead of byte-copied.
	pub fn write(&mut self, source: &mut Buffer, count: usize) -> Result<usize> {
		if count > source.size {
			return Err(Error::end_of_input("write: source buffer underflowed"));
		}

		let mut remaining = count;
		while remaining > 0 {
			let Some(head) = source.head.clone() else { break };
			let seg_len = head.borrow().len();
			let can_move = seg_len <= remaining && !head.borrow().is_shared();

			if can_move {
				source.size -= seg_len;
				let next = segment::next_in_cycle(&head);
				match next {
					Some(next) => {
						segment::detach(&head);
						source.head = Some(next);
					}
					None => {
						source.head = None;
						source.tail = None;
					}
				}
				self.push_back_segment(head);
				remaining -= seg_len;
			} else {
				let n = remaining.min(seg_len);
				let tail_has_room = self.tail.as_ref().is_some_and(|tail| {
					let t = tail.borrow();
					t.is_owner() && !t.is_shared() && t.free_space() > 0
				});

				if !tail_has_room {
					let prefix = segment::split(&head, n);
					source.size -= n;
					self.push_back_segment(prefix);
					remaining -= n;
					if head.borrow().is_empty() {
						source.pop_front_segment();
					}
				} else {
					let tail = self.writable_tail(n);
					let moved = {
						let mut h = head.borrow_mut();
						let mut t = tail.borrow_mut();
						h.copy_into(&mut t, n)
					};
					self.size += moved;
					source.size -= moved;
					remaining -= moved;
					if head.borrow().is_empty() {
						source.pop_front_segment();
					}
				}
			}
		}

		Ok(count)
	}

	/// Transfers every byte currently in `source` into `self`.
	pub fn write_all(&mut self, source: &mut Buffer) -> Result<usize> {
		self.write(source, source.size)
	}

	/// Copies up to `dst.len()` bytes starting at absolute index `from` into
	/// `dst`, without consuming anything. Returns the number of bytes copied.
	pub(crate) fn peek_into_slice(&self, from: usize, dst: &mut [u8]) -> usize {
		let mut remaining_skip = from;
		let mut idx = 0;
		self.for_each_segment(|seg| {
			if idx >= dst.len() { return }
			seg.read(|data| {
				let mut data = data;
				if remaining_skip > 0 {
					let skip = remaining_skip.min(data.len());
					data = &data[skip..];
					remaining_skip -= skip;
				}
				if data.is_empty() { return }
				let n = data.len().min(dst.len() - idx);
				dst[idx..idx + n].copy_from_slice(&data[..n]);
				idx += n;
			});
		});
		idx
	}

	/// The number of bytes that form whole, filled segments -- the portion
	/// [`crate::streams::BufferedSink::emit`] is willing to flush early.
	pub(crate) fn complete_byte_count(&self) -> usize {
		match &self.tail {
			Some(tail) if !tail.borrow().is_full() => self.size - tail.borrow().len(),
			_ => self.size,
		}
	}

	pub fn write_from_slice(&mut self, mut value: &[u8]) {
		while !value.is_empty() {
			let tail = self.writable_tail(value.len());
			let n = tail.borrow_mut().push_slice(value);
			self.size += n;
			value = &value[n..];
		}
	}
}

impl Drop for Buffer {
	fn drop(&mut self) {
		let _ = self.clear();
	}
}

impl crate::streams::RawSource for Buffer {
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<i64> {
		if self.is_empty() {
			return Ok(-1);
		}
		let n = self.size.min(byte_count);
		sink.write(self, n)?;
		Ok(n as i64)
	}
}

impl crate::streams::RawSink for Buffer {
	fn write_from(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		self.write(source, byte_count)?;
		Ok(())
	}
}

pub(crate) const _: () = assert!(SEGMENT_SIZE > 0);

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ByteString;
	use pretty_assertions::assert_eq;

	#[test]
	fn size_identity_holds_after_writes() {
		let mut b = Buffer::new();
		b.write_from_slice(&vec![0u8; 20000]);
		assert_eq!(b.size(), 20000);
	}

	#[test]
	fn write_read_round_trip() {
		let mut b = Buffer::new();
		let data: Vec<u8> = (0..=255).cycle().take(9000).collect();
		b.write_from_slice(&data);
		let mut out = vec![0u8; data.len()];
		b.read_into_slice_exact(&mut out).unwrap();
		assert_eq!(out, data);
	}

	#[test]
	fn transfer_conservation() {
		let mut a = Buffer::new();
		a.write_from_slice(&vec![0u8; 8200]);
		let mut b = Buffer::new();
		b.write_from_slice(&[0xAA; 5]);
		a.write(&mut b, 5).unwrap();
		assert_eq!(a.size(), 8205);
		assert_eq!(b.size(), 0);
		let snap = a.snapshot();
		assert_eq!(&snap.as_slice()[8200..], &[0xAA; 5]);
	}

	#[test]
	fn index_of_across_segments() {
		let mut b = Buffer::new();
		b.write_from_slice(&vec![0x41u8; 8200]);
		b.write_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
		let needle = ByteString::from(vec![0xDE, 0xAD, 0xBE, 0xEF]);
		assert_eq!(b.index_of_bytes(&needle, 0, b.size()), Some(8200));
	}
}
