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
use quickcheck_macros::quickcheck;
use sluice_io::Buffer;

#[quickcheck]
fn byte(b: u8) -> bool { read_write_u8(b) }

fn read_write_u8(b: u8) -> bool {
	let mut buf = Buffer::new();
	buf.write_u8(b);
	buf.read_u8().unwrap() == b
}

#[quickcheck]
fn short(b: u16) -> bool {
	let mut buf = Buffer::new();
	buf.write_u16(b);
	buf.read_u16().unwrap() == b
}

#[quickcheck]
fn short_le(b: u16) -> bool {
	let mut buf = Buffer::new();
	buf.write_u16_le(b);
	buf.read_u16().unwrap() == b.swap_bytes()
}

#[quickcheck]
fn int(b: u32) -> bool {
	let mut buf = Buffer::new();
	buf.write_u32(b);
	buf.read_u32().unwrap() == b
}

#[quickcheck]
fn long(b: u64) -> bool {
	let mut buf = Buffer::new();
	buf.write_u64(b);
	buf.read_u64().unwrap() == b
}

#[quickcheck]
fn long_le(b: u64) -> bool {
	let mut buf = Buffer::new();
	buf.write_u64_le(b);
	buf.read_u64().unwrap() == b.swap_bytes()
}

#[quickcheck]
fn arbitrary_slice_round_trips(bytes: Vec<u8>) -> bool {
	let mut buf = Buffer::new();
	buf.write_from_slice(&bytes);
	let mut out = vec![0u8; bytes.len()];
	buf.read_into_slice_exact(&mut out).unwrap();
	out == bytes
}

#[test]
fn size_tracks_segment_boundaries_exactly() {
	let mut buf = Buffer::new();
	for chunk_len in [1, 4095, 1, 8192, 8193, 3] {
		buf.write_from_slice(&vec![0x5a; chunk_len]);
	}
	assert_eq!(buf.size(), 1 + 4095 + 1 + 8192 + 8193 + 3);
}

#[test]
fn segment_transfer_splices_whole_segments() {
	let mut a = Buffer::new();
	a.write_from_slice(&vec![0u8; 8200]);
	let mut b = Buffer::new();
	b.write_from_slice(&[0xAA; 5]);

	a.write(&mut b, 5).unwrap();

	assert_eq!(a.size(), 8205);
	assert_eq!(b.size(), 0);
	let tail = a.snapshot();
	assert_eq!(&tail.as_slice()[8200..], &[0xAA; 5]);
}
