// Copyright 2025 eraflo
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

//! Errors surfaced while recording and decoding frames.

use kiln_core::{AllocError, CodecError, ResourceError};
use std::fmt;

/// An error while recording commands into a frame.
///
/// Per-frame buffers are fixed-size, so every variant indicates a usage
/// bug on the recording side rather than an environmental failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The command stream ran out of space.
    Codec(CodecError),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Codec(err) => write!(f, "frame recording failed: {err}"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Codec(err) => Some(err),
        }
    }
}

impl From<CodecError> for EncodeError {
    fn from(err: CodecError) -> Self {
        EncodeError::Codec(err)
    }
}

/// An error while decoding a frame against a backend.
///
/// Any of these leaves the backend desynchronized from the recorded
/// intent, so the decode loop treats them as fatal instead of skipping the
/// offending command.
#[derive(Debug)]
pub enum DecodeError {
    /// The stream was malformed: truncated, an unknown opcode, or an
    /// out-of-range field value.
    Codec(CodecError),
    /// The decoder's staging arena ran out of space.
    Alloc(AllocError),
    /// A command referenced a client handle with no resolved server
    /// handle — the resource was never created, or already destroyed.
    UnresolvedHandle {
        /// The resource class of the handle.
        kind: &'static str,
        /// The raw client index.
        index: u32,
    },
    /// A draw referenced a pass index that was never declared this frame.
    UnknownPassIndex(u32),
    /// The backend rejected an operation.
    Resource(ResourceError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Codec(err) => write!(f, "malformed frame stream: {err}"),
            DecodeError::Alloc(err) => write!(f, "frame staging arena exhausted: {err}"),
            DecodeError::UnresolvedHandle { kind, index } => {
                write!(f, "unresolved {kind} handle #{index}")
            }
            DecodeError::UnknownPassIndex(index) => {
                write!(f, "draw references undeclared render pass {index}")
            }
            DecodeError::Resource(err) => write!(f, "backend rejected command: {err}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Codec(err) => Some(err),
            DecodeError::Alloc(err) => Some(err),
            DecodeError::Resource(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodecError> for DecodeError {
    fn from(err: CodecError) -> Self {
        DecodeError::Codec(err)
    }
}

impl From<AllocError> for DecodeError {
    fn from(err: AllocError) -> Self {
        DecodeError::Alloc(err)
    }
}

impl From<ResourceError> for DecodeError {
    fn from(err: ResourceError) -> Self {
        DecodeError::Resource(err)
    }
}
