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
use sluice_io::ByteString;

#[test]
fn s1_byte_string_contract() {
	let bs = ByteString::copy_from(&[0x01, 0x02, 0x03, 0x04, 0x05]);
	assert_eq!(bs.substring(1, 4), ByteString::copy_from(&[0x02, 0x03, 0x04]));
	assert_eq!(bs.index_of(&ByteString::copy_from(&[0x03, 0x04]), 0), Some(2));
	assert_eq!(format!("{bs}"), "ByteString(size=5 hex=0102030405)");
	assert_eq!(bs.content_hash(), ByteString::copy_from(&[0x01, 0x02, 0x03, 0x04, 0x05]).content_hash());
}

#[test]
fn constructing_from_a_mutated_array_does_not_observe_the_mutation() {
	let mut source = vec![1u8, 2, 3];
	let bs = ByteString::copy_from(&source);
	source[0] = 0xff;
	assert_eq!(bs.as_slice(), &[1, 2, 3]);
}

#[quickcheck]
fn equal_content_hashes_equal(bytes: Vec<u8>) -> bool {
	let a = ByteString::copy_from(&bytes);
	let b = ByteString::copy_from(&bytes);
	a == b && a.content_hash() == b.content_hash()
}

#[quickcheck]
fn substring_then_whole_equals_original(bytes: Vec<u8>) -> bool {
	let bs = ByteString::copy_from(&bytes);
	bs.substring(0, bytes.len()) == bs
}
