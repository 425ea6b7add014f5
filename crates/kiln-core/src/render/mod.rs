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

//! Render state, resource descriptors and deferred data commands.
//!
//! Types referencing resources come in pairs: the client-space form the
//! simulation thread records with (holding [`ClientHandle`]s), and a
//! `Resolved*` server-space form the decoder rebuilds after remapping every
//! embedded handle. Client-space types know how to serialize themselves
//! through the [`StreamWriter`](crate::codec::StreamWriter); the decoder
//! owns the mirror-image reads because it fuses reading with handle
//! remapping.
//!
//! [`ClientHandle`]: crate::ClientHandle

pub mod action;
pub mod descriptor;
pub mod state;

pub use action::PreDrawAction;
pub use descriptor::{
    ClearFlags, FilterMode, FramebufferDescriptor, IndexFormat, MeshDescriptor,
    PrimitiveTopology, RenderPassDescriptor, ResolvedFramebufferDescriptor,
    ResolvedMeshDescriptor, ResolvedRenderPassDescriptor, ResolvedVertexLayout,
    ShaderDescriptor, TextureDescriptor, TextureFormat, VertexAttribute, VertexFormat,
    VertexLayout, WrapMode, MAX_COLOR_ATTACHMENTS, MAX_VERTEX_ATTRIBUTES,
};
pub use state::{
    Binding, BlendMode, CullMode, DepthFunc, ImageAccess, ImageBinding, PassIndex,
    RenderFlags, RenderState, ResolvedRenderState, Viewport, MAX_IMAGE_SLOTS,
    MAX_STORAGE_SLOTS, MAX_TEXTURE_SLOTS, MAX_UNIFORM_SLOTS,
};

/// Defines a `#[repr(u8)]` enum that travels through the command stream as
/// a single byte, with a checked conversion back from the wire.
macro_rules! wire_enum {
    (
        $(#[$attr:meta])*
        $vis:vis enum $name:ident: $label:literal {
            $(
                $(#[$variant_attr:meta])*
                $variant:ident = $value:literal,
            )*
        }
    ) => {
        $(#[$attr])*
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$variant_attr])*
                $variant = $value,
            )*
        }

        impl $name {
            /// The wire byte of this value.
            pub const fn as_u8(self) -> u8 {
                self as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = $crate::error::CodecError;

            fn try_from(byte: u8) -> Result<Self, Self::Error> {
                match byte {
                    $($value => Ok($name::$variant),)*
                    other => Err($crate::error::CodecError::InvalidValue {
                        what: $label,
                        value: other as u32,
                    }),
                }
            }
        }
    };
}

pub(crate) use wire_enum;
