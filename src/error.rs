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

use std::io;
use thiserror::Error;

/// The kind of failure a buffer or stream operation raised.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Kind {
	/// A read asked for more bytes than the upstream could ever supply.
	EndOfInput,
	/// A negative count, bad offset, or otherwise nonsensical argument.
	InvalidArgument,
	/// The stream was used after it was closed, or used twice when only a
	/// single use is allowed.
	InvalidState,
	/// The bytes read did not form a valid instance of the expected format
	/// (bad GZIP magic, CRC/size mismatch, truncated DEFLATE stream, ...).
	MalformedInput,
	/// The underlying raw stream failed.
	IoFailure,
}

/// An error from a buffer, stream, or transformation operation.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct Error {
	kind: Kind,
	message: String,
	#[source]
	source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

pub type Result<T = ()> = std::result::Result<T, Error>;

impl Error {
	pub fn new(kind: Kind, message: impl Into<String>) -> Self {
		Self { kind, message: message.into(), source: None }
	}

	pub fn with_source(
		kind: Kind,
		message: impl Into<String>,
		source: impl std::error::Error + Send + Sync + 'static,
	) -> Self {
		Self { kind, message: message.into(), source: Some(Box::new(source)) }
	}

	pub fn end_of_input(message: impl Into<String>) -> Self {
		Self::new(Kind::EndOfInput, message)
	}

	pub fn invalid_argument(message: impl Into<String>) -> Self {
		Self::new(Kind::InvalidArgument, message)
	}

	pub fn invalid_state(message: impl Into<String>) -> Self {
		Self::new(Kind::InvalidState, message)
	}

	pub fn malformed(message: impl Into<String>) -> Self {
		Self::new(Kind::MalformedInput, message)
	}

	pub fn io(error: io::Error) -> Self {
		Self::with_source(Kind::IoFailure, error.to_string(), error)
	}

	pub fn kind(&self) -> Kind { self.kind }
}

impl From<io::Error> for Error {
	fn from(value: io::Error) -> Self {
		if value.kind() == io::ErrorKind::UnexpectedEof {
			Self::end_of_input(value.to_string())
		} else {
			Self::io(value)
		}
	}
}

impl From<Error> for io::Error {
	fn from(value: Error) -> Self {
		match value.kind {
			Kind::EndOfInput => io::Error::new(io::ErrorKind::UnexpectedEof, value),
			Kind::IoFailure => io::Error::other(value),
			_ => io::Error::other(value),
		}
	}
}
