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

//! Defines the hierarchy of error types for the core pipeline building blocks.

use std::fmt;

/// An error produced by one of the frame allocators.
///
/// Allocator *misuse* (zero size, non-power-of-two alignment, out-of-order
/// stack frees) is a programming defect and asserts instead; this type only
/// covers conditions a correct caller can still run into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The backing region cannot satisfy the request.
    CapacityExceeded {
        /// The number of bytes requested.
        requested: usize,
        /// The requested alignment.
        align: usize,
        /// Total capacity of the backing region.
        capacity: usize,
        /// Bytes already in use at the time of the request.
        used: usize,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::CapacityExceeded {
                requested,
                align,
                capacity,
                used,
            } => {
                write!(
                    f,
                    "allocation of {requested} bytes (align {align}) exceeds capacity: {used}/{capacity} bytes in use"
                )
            }
        }
    }
}

impl std::error::Error for AllocError {}

/// An error produced by the bounded binary cursor while writing or reading
/// a command stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A write would advance past the end of the stream buffer.
    /// No bytes are written when this is returned.
    CapacityExceeded {
        /// Offset the write would have reached.
        needed: usize,
        /// Total capacity of the stream buffer.
        capacity: usize,
    },
    /// A read would advance past the end of the recorded stream.
    Truncated {
        /// Number of bytes the read required.
        needed: usize,
        /// Number of bytes left in the stream.
        remaining: usize,
    },
    /// An opcode byte that does not map to any known command.
    UnknownOpcode(u8),
    /// A field decoded to a value outside its legal range.
    InvalidValue {
        /// Which field was being decoded.
        what: &'static str,
        /// The offending raw value.
        value: u32,
    },
    /// A string field did not contain valid UTF-8.
    InvalidString,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::CapacityExceeded { needed, capacity } => {
                write!(
                    f,
                    "stream write past capacity: needed {needed} bytes, capacity is {capacity}"
                )
            }
            CodecError::Truncated { needed, remaining } => {
                write!(
                    f,
                    "stream truncated: needed {needed} bytes, {remaining} remaining"
                )
            }
            CodecError::UnknownOpcode(byte) => {
                write!(f, "unknown opcode byte {byte:#04x}")
            }
            CodecError::InvalidValue { what, value } => {
                write!(f, "invalid {what} value: {value}")
            }
            CodecError::InvalidString => {
                write!(f, "string field is not valid UTF-8")
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// An error reported by a [`GraphicsBackend`](crate::GraphicsBackend)
/// while creating or using a server-side resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader failed to compile into a backend module.
    ShaderCompilation {
        /// A descriptive label for the shader, if available.
        label: String,
        /// Detailed error messages from the shader compiler.
        details: String,
    },
    /// A server handle does not name a live resource on the backend.
    InvalidHandle {
        /// The resource class of the handle.
        kind: &'static str,
        /// The raw handle index.
        index: u32,
    },
    /// An update touched a range outside the resource's extent.
    OutOfBounds {
        /// The resource class of the handle.
        kind: &'static str,
        /// First byte of the attempted access.
        offset: u32,
        /// Length of the attempted access.
        len: usize,
        /// Actual size of the resource.
        size: usize,
    },
    /// An error originating from the specific backend implementation.
    Backend(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::ShaderCompilation { label, details } => {
                write!(f, "shader compilation failed for '{label}': {details}")
            }
            ResourceError::InvalidHandle { kind, index } => {
                write!(f, "invalid {kind} handle #{index}")
            }
            ResourceError::OutOfBounds {
                kind,
                offset,
                len,
                size,
            } => {
                write!(
                    f,
                    "{kind} access out of bounds: {len} bytes at offset {offset}, resource is {size} bytes"
                )
            }
            ResourceError::Backend(msg) => {
                write!(f, "backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}
