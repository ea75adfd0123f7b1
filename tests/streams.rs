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

use pretty_assertions::assert_eq;
use std::io::Cursor;
use sluice_io::{BufferedSink, BufferedSource, ReaderSource, WriterSink};

#[test]
fn peek_does_not_advance_the_outer_source() {
	let data: &[u8] = &[0x00, 0x01, 0x02, 0x03];
	let mut source = BufferedSource::new(data);

	let peeked = source.peek().read_u32().unwrap();
	assert_eq!(peeked, 0x0001_0203);
	assert_eq!(source.read_u32().unwrap(), 0x0001_0203);
}

#[test]
fn require_errors_on_shortfall() {
	let data: &[u8] = &[1, 2, 3];
	let mut source = BufferedSource::new(data);
	assert!(source.require(4).is_err());
}

#[test]
fn round_trips_through_std_io() {
	let payload = b"the quick brown fox".repeat(500);
	let mut out = Vec::new();

	{
		let sink = WriterSink::new(&mut out);
		let mut sink = BufferedSink::new(sink);
		sink.write_from_slice(&payload);
		sink.flush().unwrap();
	}

	let reader = ReaderSource::new(Cursor::new(out));
	let mut source = BufferedSource::new(reader);
	let mut read_back = Vec::new();
	let mut sink = WriterSink::new(&mut read_back);
	source.read_all(&mut sink).unwrap();
	assert_eq!(read_back, payload);
}

#[test]
fn index_of_scans_across_upstream_pulls() {
	let mut data = vec![0x41u8; 8200];
	data.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
	let mut source = BufferedSource::new(data.as_slice());
	let idx = source.index_of(0xDE, 0, data.len()).unwrap();
	assert_eq!(idx, Some(8200));
}
