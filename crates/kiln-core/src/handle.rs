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

//! Typed resource handles for the two handle spaces of the pipeline.
//!
//! Every resource lives in two spaces at once: the *client* space, where the
//! simulation thread receives a handle the instant it requests a resource,
//! and the *server* space, where the backend assigns its own identifier once
//! the creation command actually decodes. [`ClientHandle`] and
//! [`ServerHandle`] are distinct types parameterized by a resource-kind
//! marker, so mixing spaces or resource classes is a compile error rather
//! than a runtime surprise.
//!
//! Index 0 is the reserved null handle in both spaces.

use bytemuck::{Pod, Zeroable};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait for the resource classes a handle can name.
pub trait ResourceKind: Copy + Eq + std::hash::Hash + Send + Sync + 'static {
    /// Human-readable class name used in diagnostics.
    const NAME: &'static str;
}

macro_rules! resource_kinds {
    ($($(#[$doc:meta])* $kind:ident => $name:literal,)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum $kind {}

            impl ResourceKind for $kind {
                const NAME: &'static str = $name;
            }
        )*
    };
}

resource_kinds! {
    /// Vertex buffer resources.
    VertexBufferKind => "vertex buffer",
    /// Index buffer resources.
    IndexBufferKind => "index buffer",
    /// Uniform buffer resources.
    UniformBufferKind => "uniform buffer",
    /// Storage buffer resources.
    StorageBufferKind => "storage buffer",
    /// Shader program resources.
    ShaderKind => "shader",
    /// Texture resources (2D, 3D and cubemap share one class).
    TextureKind => "texture",
    /// Framebuffer resources.
    FramebufferKind => "framebuffer",
    /// Mesh resources.
    MeshKind => "mesh",
}

/// An opaque client-space handle, valid from the moment it is minted by the
/// client resource table — before the backend object exists.
///
/// Client indices are monotonically increasing per resource class and are
/// never recycled within a session.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientHandle<K: ResourceKind> {
    raw: u32,
    _kind: PhantomData<K>,
}

/// An opaque server-space handle: the backend's concrete identifier for a
/// created resource. Server indices may be recycled by the backend.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerHandle<K: ResourceKind> {
    raw: u32,
    _kind: PhantomData<K>,
}

macro_rules! handle_impl {
    ($handle:ident, $space:literal) => {
        impl<K: ResourceKind> $handle<K> {
            /// The reserved null handle of this class.
            pub const NULL: Self = Self {
                raw: 0,
                _kind: PhantomData,
            };

            /// Builds a handle from its raw index. Index 0 is the null handle.
            pub const fn from_raw(raw: u32) -> Self {
                Self {
                    raw,
                    _kind: PhantomData,
                }
            }

            /// The raw index of this handle.
            pub const fn raw(self) -> u32 {
                self.raw
            }

            /// Returns `true` for the reserved null handle.
            pub const fn is_null(self) -> bool {
                self.raw == 0
            }
        }

        impl<K: ResourceKind> Default for $handle<K> {
            fn default() -> Self {
                Self::NULL
            }
        }

        impl<K: ResourceKind> fmt::Display for $handle<K> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($space, ":{}#{}"), K::NAME, self.raw)
            }
        }

        // SAFETY: `#[repr(transparent)]` over a `u32` (`PhantomData` is a
        // zero-sized field), so the layout is exactly a `u32` with no padding
        // and every bit pattern is a valid handle.
        unsafe impl<K: ResourceKind> Zeroable for $handle<K> {}
        unsafe impl<K: ResourceKind> Pod for $handle<K> {}
    };
}

handle_impl!(ClientHandle, "client");
handle_impl!(ServerHandle, "server");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_is_index_zero() {
        let null = ClientHandle::<MeshKind>::NULL;
        assert!(null.is_null());
        assert_eq!(null.raw(), 0);
        assert_eq!(ClientHandle::<MeshKind>::from_raw(0), null);
        assert!(!ClientHandle::<MeshKind>::from_raw(1).is_null());
    }

    #[test]
    fn raw_round_trip() {
        let h = ServerHandle::<TextureKind>::from_raw(42);
        assert_eq!(h.raw(), 42);
        assert_eq!(ServerHandle::<TextureKind>::from_raw(h.raw()), h);
    }

    #[test]
    fn display_names_space_and_class() {
        let client = ClientHandle::<VertexBufferKind>::from_raw(3);
        let server = ServerHandle::<ShaderKind>::from_raw(7);
        assert_eq!(format!("{client}"), "client:vertex buffer#3");
        assert_eq!(format!("{server}"), "server:shader#7");
    }

    #[test]
    fn handles_serialize_as_plain_u32() {
        let h = ClientHandle::<IndexBufferKind>::from_raw(0x01020304);
        assert_eq!(bytemuck::bytes_of(&h), &0x01020304u32.to_ne_bytes());
    }
}
