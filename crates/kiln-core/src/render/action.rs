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

//! Deferred data commands attached to draws.
//!
//! A pre-draw action is a small tagged update command, not a captured
//! closure: the decoder can queue, inspect and replay it, and it is
//! guaranteed to run immediately before the draw that depends on it.

use crate::codec::StreamWriter;
use crate::error::CodecError;
use crate::handle::{ClientHandle, StorageBufferKind, UniformBufferKind};

const ACTION_TAG_UNIFORM: u8 = 0;
const ACTION_TAG_STORAGE: u8 = 1;

/// A deferred buffer update that must be visible to the draw it is
/// recorded with.
#[derive(Debug, Clone, PartialEq)]
pub enum PreDrawAction<'a> {
    /// Overwrite a byte range of a uniform buffer.
    UpdateUniformBuffer {
        /// The buffer to update.
        buffer: ClientHandle<UniformBufferKind>,
        /// First byte to overwrite.
        offset: u32,
        /// The new contents.
        data: &'a [u8],
    },
    /// Overwrite a byte range of a storage buffer.
    UpdateStorageBuffer {
        /// The buffer to update.
        buffer: ClientHandle<StorageBufferKind>,
        /// First byte to overwrite.
        offset: u32,
        /// The new contents.
        data: &'a [u8],
    },
}

impl PreDrawAction<'_> {
    /// Wire tag of the uniform buffer update.
    pub const UNIFORM_TAG: u8 = ACTION_TAG_UNIFORM;
    /// Wire tag of the storage buffer update.
    pub const STORAGE_TAG: u8 = ACTION_TAG_STORAGE;

    /// Serializes the action into the command stream.
    pub fn encode(&self, writer: &mut StreamWriter<'_>) -> Result<(), CodecError> {
        match self {
            PreDrawAction::UpdateUniformBuffer {
                buffer,
                offset,
                data,
            } => {
                writer.write_u8(ACTION_TAG_UNIFORM)?;
                writer.write_pod(buffer)?;
                writer.write_u32(*offset)?;
                writer.write_blob(data)
            }
            PreDrawAction::UpdateStorageBuffer {
                buffer,
                offset,
                data,
            } => {
                writer.write_u8(ACTION_TAG_STORAGE)?;
                writer.write_pod(buffer)?;
                writer.write_u32(*offset)?;
                writer.write_blob(data)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_tag_handle_offset_and_payload() {
        let action = PreDrawAction::UpdateUniformBuffer {
            buffer: ClientHandle::from_raw(7),
            offset: 16,
            data: &[1, 2, 3, 4],
        };

        let mut buf = [0u8; 32];
        let mut writer = StreamWriter::new(&mut buf);
        action.encode(&mut writer).unwrap();
        // tag + handle + offset + length prefix + payload
        assert_eq!(writer.offset(), 1 + 4 + 4 + 4 + 4);
        assert_eq!(buf[0], PreDrawAction::UNIFORM_TAG);
    }
}
