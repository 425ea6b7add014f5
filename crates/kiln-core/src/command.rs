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

//! The command opcode set.
//!
//! Every command in a frame stream starts with a one-byte opcode that fixes
//! the binary shape of its payload. A frame's command sequence always
//! terminates with [`Opcode::End`].

use crate::error::CodecError;

macro_rules! opcodes {
    ($($(#[$doc:meta])* $variant:ident = $value:literal,)*) => {
        /// One-byte command tag at the head of every recorded command.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $variant = $value,
            )*
        }

        impl Opcode {
            /// The wire byte of this opcode.
            pub const fn as_u8(self) -> u8 {
                self as u8
            }

            /// Every opcode, in wire-byte order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];
        }

        impl TryFrom<u8> for Opcode {
            type Error = CodecError;

            fn try_from(byte: u8) -> Result<Self, Self::Error> {
                match byte {
                    $($value => Ok(Opcode::$variant),)*
                    other => Err(CodecError::UnknownOpcode(other)),
                }
            }
        }
    };
}

opcodes! {
    /// Create a vertex buffer from a data blob.
    CreateVertexBuffer = 1,
    /// Overwrite a byte range of a vertex buffer.
    UpdateVertexBuffer = 2,
    /// Destroy a vertex buffer.
    DestroyVertexBuffer = 3,
    /// Create an index buffer from a data blob.
    CreateIndexBuffer = 4,
    /// Overwrite a byte range of an index buffer.
    UpdateIndexBuffer = 5,
    /// Destroy an index buffer.
    DestroyIndexBuffer = 6,
    /// Create a uniform buffer from a data blob.
    CreateUniformBuffer = 7,
    /// Overwrite a byte range of a uniform buffer.
    UpdateUniformBuffer = 8,
    /// Destroy a uniform buffer.
    DestroyUniformBuffer = 9,
    /// Create a storage buffer from a data blob.
    CreateStorageBuffer = 10,
    /// Overwrite a byte range of a storage buffer.
    UpdateStorageBuffer = 11,
    /// Destroy a storage buffer.
    DestroyStorageBuffer = 12,
    /// Create a shader program from source text.
    CreateShader = 13,
    /// Create a 2D texture from a descriptor and pixel blob.
    CreateTexture2D = 14,
    /// Create a 3D texture from a descriptor and pixel blob.
    CreateTexture3D = 15,
    /// Create a cubemap texture from a descriptor and six face blobs.
    CreateTextureCubemap = 16,
    /// Destroy a texture of any class.
    DestroyTexture = 17,
    /// Create a framebuffer referencing texture attachments.
    CreateFramebuffer = 18,
    /// Destroy a framebuffer.
    DestroyFramebuffer = 19,
    /// Create a mesh referencing vertex/index buffers.
    CreateMesh = 20,
    /// Submit one draw of a mesh with full render state.
    DrawMesh = 21,
    /// Submit an instanced draw of a mesh with full render state.
    DrawMeshInstanced = 22,
    /// Dispatch a compute shader with full binding state.
    DispatchCompute = 23,
    /// Declare a render pass for subsequent draws to order against.
    AddRenderPass = 24,
    /// Terminates the frame's command sequence.
    End = 25,
}
