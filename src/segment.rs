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

//! Fixed-size byte segments, the storage and transfer unit of [`crate::Buffer`].
//!
//! Segments form a circular doubly linked list per buffer. A segment's backing
//! array may be shared copy-on-write between two segments (produced by
//! [`Segment::split`]); a shared segment cannot be written to, only its unique
//! owner can grow its `limit`.

use std::cell::RefCell;
use std::cmp::min;
use std::rc::{Rc, Weak};
use crate::pool;

/// The canonical segment capacity.
pub const SEGMENT_SIZE: usize = 8192;

/// A segment's backing storage.
pub(crate) struct SegmentData(pub [u8; SEGMENT_SIZE]);

impl SegmentData {
	pub(crate) fn zeroed() -> Self { Self([0; SEGMENT_SIZE]) }
}

type DataRef = Rc<RefCell<SegmentData>>;

/// A node in a buffer's segment cycle. Not exposed directly; see
/// [`crate::unsafe_cursor::UnsafeCursor`] for controlled external access.
pub(crate) struct Segment {
	data: DataRef,
	pos: usize,
	limit: usize,
	shared: bool,
	owner: bool,
	prev: Option<Weak<RefCell<Segment>>>,
	next: Option<SegmentRef>,
}

pub(crate) type SegmentRef = Rc<RefCell<Segment>>;

impl Segment {
	fn from_data(data: DataRef) -> Self {
		Self { data, pos: 0, limit: 0, shared: false, owner: true, prev: None, next: None }
	}

	/// Claims a fresh, empty, owned segment from the pool.
	pub(crate) fn take() -> SegmentRef {
		let data = Rc::new(RefCell::new(*pool::take()));
		Rc::new(RefCell::new(Self::from_data(data)))
	}

	pub(crate) fn pos(&self) -> usize { self.pos }
	pub(crate) fn limit(&self) -> usize { self.limit }
	pub(crate) fn len(&self) -> usize { self.limit - self.pos }
	pub(crate) fn is_empty(&self) -> bool { self.pos == self.limit }
	pub(crate) fn is_full(&self) -> bool { self.limit == SEGMENT_SIZE }
	pub(crate) fn is_shared(&self) -> bool { self.shared }
	pub(crate) fn is_owner(&self) -> bool { self.owner }
	pub(crate) fn free_space(&self) -> usize {
		if self.owner { SEGMENT_SIZE - self.limit } else { 0 }
	}

	/// Reads the readable window `[pos, limit)`.
	pub(crate) fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
		let data = self.data.borrow();
		f(&data.0[self.pos..self.limit])
	}

	/// Mutates the writable window `[limit, SEGMENT_SIZE)` without advancing
	/// `limit`; callers that write through this must follow up with
	/// [`Segment::grow`]. Panics if the segment is shared; callers must check
	/// [`Segment::is_owner`] first. Used directly by [`crate::unsafe_cursor`]
	/// for zero-copy codec writes; [`Segment::push_slice`] is the safe,
	/// limit-advancing wrapper for ordinary writes.
	pub(crate) fn write_tail<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> R {
		assert!(self.owner, "attempted to write a shared, non-owned segment");
		let mut data = self.data.borrow_mut();
		f(&mut data.0[self.limit..])
	}

	/// Advances `limit` by `n` after bytes were written directly via
	/// [`Segment::write_tail`].
	pub(crate) fn grow(&mut self, n: usize) {
		debug_assert!(self.limit + n <= SEGMENT_SIZE);
		self.limit += n;
	}

	/// Appends as many bytes of `bytes` as fit, advancing `limit`. Returns the
	/// number of bytes written.
	pub(crate) fn push_slice(&mut self, bytes: &[u8]) -> usize {
		let n = self.write_tail(|tail| {
			let n = min(tail.len(), bytes.len());
			tail[..n].copy_from_slice(&bytes[..n]);
			n
		});
		self.limit += n;
		n
	}

	/// Consumes up to `dst.len()` bytes into `dst`, advancing `pos`. Returns
	/// the number of bytes read.
	pub(crate) fn pop_into_slice(&mut self, dst: &mut [u8]) -> usize {
		let n = self.read(|data| {
			let n = min(data.len(), dst.len());
			dst[..n].copy_from_slice(&data[..n]);
			n
		});
		self.pos += n;
		n
	}

	/// Discards `n` bytes from the front without copying them anywhere.
	pub(crate) fn skip(&mut self, n: usize) {
		debug_assert!(self.pos + n <= self.limit);
		self.pos += n;
	}

	/// Resets to an empty, unshared, owned state. Called right before the
	/// segment is unlinked and handed back to the pool.
	fn reset(&mut self) {
		self.pos = 0;
		self.limit = 0;
		self.shared = false;
		self.owner = true;
		self.prev = None;
		self.next = None;
	}

	/// Copies `byte_count` bytes from the head of `self` into the tail of
	/// `other`, advancing `self.pos`. Returns the number of bytes copied.
	pub(crate) fn copy_into(&mut self, other: &mut Segment, byte_count: usize) -> usize {
		let n = self.read(|data| {
			let n = min(byte_count, data.len());
			other.push_slice(&data[..n])
		});
		self.pos += n;
		n
	}
}

/// Creates a new segment sharing `src`'s backing array, limited to
/// `[pos, pos + offset)`. `src`'s `pos` advances by `offset`. Both segments
/// are marked shared; neither is the owner of the shared range.
pub(crate) fn split(src: &SegmentRef, offset: usize) -> SegmentRef {
	let mut s = src.borrow_mut();
	debug_assert!(offset <= s.len());
	let prefix = Segment {
		data: Rc::clone(&s.data),
		pos: s.pos,
		limit: s.pos + offset,
		shared: true,
		owner: false,
		prev: None,
		next: None,
	};
	s.pos += offset;
	s.shared = true;
	Rc::new(RefCell::new(prefix))
}

/// Merges `this` into `prev` if the combined size fits in one segment and
/// neither is shared. Returns `true` if the merge happened, in which case
/// `this` is now empty and should be unlinked.
pub(crate) fn compact_into(this: &SegmentRef, prev: &SegmentRef) -> bool {
	let fits = {
		let a = prev.borrow();
		let b = this.borrow();
		!a.is_shared() && !b.is_shared() && a.is_owner() && a.limit() + b.len() <= SEGMENT_SIZE
	};
	if !fits { return false }

	let moved = this.borrow().read(|data| prev.borrow_mut().push_slice(data));
	this.borrow_mut().pos += moved;
	true
}

/// Splices `node` into the cycle immediately after `after`.
pub(crate) fn push_after(after: &SegmentRef, node: SegmentRef) {
	let next = after.borrow().next.clone();
	{
		let mut node_mut = node.borrow_mut();
		node_mut.prev = Some(Rc::downgrade(after));
		node_mut.next = next.clone();
	}
	if let Some(ref next) = next {
		next.borrow_mut().prev = Some(Rc::downgrade(&node));
	}
	after.borrow_mut().next = Some(node);
}

/// Unlinks `node` from its cycle, stitching its neighbors together, and
/// returns it with dangling `prev`/`next`. If `node` was the only segment in
/// the cycle, its neighbors are itself and the result has no prev/next.
pub(crate) fn detach(node: &SegmentRef) -> SegmentRef {
	let (prev, next) = {
		let n = node.borrow();
		(n.prev.as_ref().and_then(Weak::upgrade), n.next.clone())
	};

	match (prev, next) {
		(Some(prev), Some(next)) if !Rc::ptr_eq(&prev, node) => {
			prev.borrow_mut().next = Some(Rc::clone(&next));
			next.borrow_mut().prev = Some(Rc::downgrade(&prev));
		}
		_ => {}
	}

	let mut n = node.borrow_mut();
	n.prev = None;
	n.next = None;
	drop(n);
	Rc::clone(node)
}

/// Returns the segment immediately after `node`, or `None` if `node` was the
/// sole segment in its cycle (its own successor).
pub(crate) fn next_in_cycle(node: &SegmentRef) -> Option<SegmentRef> {
	let next = node.borrow().next.clone()?;
	if Rc::ptr_eq(&next, node) { None } else { Some(next) }
}

/// Recycles a detached, empty segment: returns its backing array to the pool
/// if this was the last live share of it.
pub(crate) fn recycle(node: SegmentRef) {
	let data = {
		let mut seg = node.borrow_mut();
		seg.reset();
		Rc::clone(&seg.data)
	};
	drop(node);

	if let Ok(cell) = Rc::try_unwrap(data) {
		pool::recycle(Box::new(cell.into_inner()));
	}
	// Otherwise another segment still shares this array; nothing to recycle
	// yet. The array returns to the pool when that last sharer is recycled.
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn push_and_pop_round_trip() {
		let seg = Segment::take();
		assert_eq!(seg.borrow_mut().push_slice(b"hello"), 5);
		let mut buf = [0u8; 5];
		assert_eq!(seg.borrow_mut().pop_into_slice(&mut buf), 5);
		assert_eq!(&buf, b"hello");
		assert!(seg.borrow().is_empty());
	}

	#[test]
	fn split_shares_backing_array() {
		let seg = Segment::take();
		seg.borrow_mut().push_slice(b"0123456789");
		let prefix = split(&seg, 4);
		assert_eq!(prefix.borrow().len(), 4);
		assert_eq!(seg.borrow().len(), 6);
		assert!(prefix.borrow().is_shared());
		assert!(seg.borrow().is_shared());
		prefix.borrow().read(|d| assert_eq!(d, b"0123"));
		seg.borrow().read(|d| assert_eq!(d, b"456789"));
	}

	#[test]
	fn cycle_links_and_detach() {
		let a = Segment::take();
		let b = Segment::take();
		push_after(&a, Rc::clone(&b));
		assert!(Rc::ptr_eq(&next_in_cycle(&a).unwrap(), &b));
		let detached = detach(&b);
		assert!(Rc::ptr_eq(&detached, &b));
		assert!(next_in_cycle(&a).is_none());
	}
}
