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

//! A segmented, memory-recycling byte buffer with buffered streams,
//! transformation pipelines, and DEFLATE/GZIP codecs.
//!
//! The storage unit is a fixed-size [`segment::SEGMENT_SIZE`] segment drawn
//! from a two-tier [`pool`]; a [`Buffer`] is a cycle of segments that moves
//! whole segments between buffers instead of copying bytes whenever it can.
//! [`streams::BufferedSource`]/[`streams::BufferedSink`] frame primitive I/O
//! on top of a [`streams::RawSource`]/[`streams::RawSink`], and
//! [`transform::Transformation`] lets a streaming codec like [`codec::gzip`]
//! sit between a buffered stream and its caller without buffering the whole
//! payload in memory.

pub mod byte_str;
pub mod codec;
pub mod error;
pub mod pool;
pub mod streams;
pub mod transform;
pub mod unsafe_cursor;

mod buffer;
mod segment;

pub use buffer::Buffer;
pub use byte_str::ByteString;
pub use error::{Error, Result};
pub use segment::SEGMENT_SIZE;
pub use streams::{BufferedSink, BufferedSource, RawSink, RawSource, ReaderSource, WriterSink};
pub use transform::{Transformation, TransformingSink, TransformingSource};
