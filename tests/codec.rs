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
use sluice_io::codec::{GzipDecoder, GzipEncoder};
use sluice_io::transform::{Transformation, TransformResult};
use sluice_io::RawSink;

fn gzip(input: &[u8], level: i32) -> Vec<u8> {
	let mut encoder = GzipEncoder::new(level).unwrap();
	let mut out = vec![0u8; input.len() * 2 + 256];
	let mut produced = 0;
	if let TransformResult::Ok { produced: p, .. } =
		encoder.transform(input, &mut out[produced..]).unwrap()
	{
		produced += p;
	}
	loop {
		match encoder.finish(&mut out[produced..]).unwrap() {
			TransformResult::Done { produced: p, .. } => {
				produced += p;
				break;
			}
			TransformResult::Ok { produced: p, .. } => produced += p,
			TransformResult::OutputRequired(_) => panic!("test buffer too small"),
		}
	}
	out.truncate(produced);
	out
}

fn gunzip(compressed: &[u8], expected_len: usize) -> Vec<u8> {
	let mut decoder = GzipDecoder::new();
	let mut out = vec![0u8; expected_len + 256];
	let mut in_off = 0;
	let mut out_off = 0;
	loop {
		match decoder.transform(&compressed[in_off..], &mut out[out_off..]).unwrap() {
			TransformResult::Ok { consumed, produced } => {
				in_off += consumed;
				out_off += produced;
			}
			TransformResult::Done { consumed, produced } => {
				in_off += consumed;
				out_off += produced;
				break;
			}
			TransformResult::OutputRequired(_) => panic!("test buffer too small"),
		}
	}
	out.truncate(out_off);
	out
}

#[test]
fn s4_gzip_round_trip_and_format_identity() {
	let input = b"Hello, World!";
	let compressed = gzip(input, 6);

	assert_eq!(&compressed[..3], &[0x1F, 0x8B, 0x08]);
	let size_field = u32::from_le_bytes(compressed[compressed.len() - 4..].try_into().unwrap());
	assert_eq!(size_field, input.len() as u32);

	let decompressed = gunzip(&compressed, input.len());
	assert_eq!(decompressed, input);
}

#[test]
fn s5_deflate_level_bounds() {
	use sluice_io::codec::DeflateEncoder;
	assert!(DeflateEncoder::new(-1).is_err());
	assert!(DeflateEncoder::new(10).is_err());

	let input = b"some reasonably compressible text ".repeat(4);
	let mut encoder = DeflateEncoder::new(0).unwrap();
	let mut out = vec![0u8; input.len() * 2 + 64];
	let mut produced = 0;
	if let TransformResult::Ok { produced: p, .. } = encoder.transform(&input, &mut out).unwrap() {
		produced = p;
	}
	if let TransformResult::Done { produced: p, .. } =
		encoder.finish(&mut out[produced..]).unwrap()
	{
		produced += p;
	}
	assert!(produced >= input.len());
}

#[test]
fn s6_truncated_gzip_is_malformed() {
	let input = b"some plaintext worth compressing ".repeat(8);
	let compressed = gzip(&input, 6);
	let truncated = &compressed[..20.min(compressed.len())];

	let mut decoder = GzipDecoder::new();
	let mut out = vec![0u8; input.len() + 64];
	let mut in_off = 0;
	let err = loop {
		match decoder.transform(&truncated[in_off..], &mut out) {
			Ok(TransformResult::Ok { consumed, .. }) => {
				in_off += consumed;
				if consumed == 0 {
					break decoder.finish(&mut []).unwrap_err();
				}
			}
			Ok(TransformResult::Done { .. }) => panic!("truncated stream should not finish cleanly"),
			Ok(TransformResult::OutputRequired(_)) => panic!("test buffer too small"),
			Err(e) => break e,
		}
	};
	assert_eq!(err.kind(), sluice_io::error::Kind::MalformedInput);
}

#[test]
fn deflate_and_gzip_agree_on_raw_source_sink_plumbing() {
	use sluice_io::transform::{TransformingSink, TransformingSource};
	use sluice_io::BufferedSource;
	use sluice_io::Buffer;

	let payload = b"round trip through the raw source/sink adapters".repeat(50);

	let mut compressed_store = Vec::new();
	{
		let sink = sluice_io::WriterSink::new(&mut compressed_store);
		let mut sink = TransformingSink::new(sink, GzipEncoder::new(6).unwrap());
		let mut input = Buffer::new();
		input.write_from_slice(&payload);
		let n = input.size();
		sink.write_from(&mut input, n).unwrap();
		sink.close().unwrap();
	}

	let source = TransformingSource::new(compressed_store.as_slice(), GzipDecoder::new());
	let mut source = BufferedSource::new(source);
	let mut decompressed = Vec::new();
	let mut sink = sluice_io::WriterSink::new(&mut decompressed);
	source.read_all(&mut sink).unwrap();

	assert_eq!(decompressed, payload);
}
