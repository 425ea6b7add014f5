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

use crate::error::DecodeError;
use kiln_core::handle::{
    ClientHandle, FramebufferKind, IndexBufferKind, MeshKind, ResourceKind, ServerHandle,
    ShaderKind, StorageBufferKind, TextureKind, UniformBufferKind, VertexBufferKind,
};

/// One resource class's client-to-server handle mapping.
///
/// Client indices are dense and monotonic, so the map is a plain vector
/// indexed by client index. An entry is populated when the class's create
/// command decodes and cleared again by the matching destroy.
#[derive(Debug)]
pub struct HandleMap<K: ResourceKind> {
    entries: Vec<Option<ServerHandle<K>>>,
}

impl<K: ResourceKind> HandleMap<K> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Binds `client` to the backend's `server` handle.
    pub fn insert(&mut self, client: ClientHandle<K>, server: ServerHandle<K>) {
        let index = client.raw() as usize;
        debug_assert!(index != 0, "cannot bind the null {} handle", K::NAME);
        if index >= self.entries.len() {
            self.entries.resize(index + 1, None);
        }
        debug_assert!(
            self.entries[index].is_none(),
            "duplicate create for {client}"
        );
        self.entries[index] = Some(server);
    }

    /// Resolves a client handle that must name a live resource.
    ///
    /// ## Errors
    /// [`DecodeError::UnresolvedHandle`] when no create for this handle
    /// has decoded (or a destroy already cleared it). The null handle is
    /// never resolvable.
    pub fn resolve(&self, client: ClientHandle<K>) -> Result<ServerHandle<K>, DecodeError> {
        self.entries
            .get(client.raw() as usize)
            .copied()
            .flatten()
            .ok_or(DecodeError::UnresolvedHandle {
                kind: K::NAME,
                index: client.raw(),
            })
    }

    /// Resolves a client handle embedded in render state: the null handle
    /// passes through unchanged, anything else must be live.
    pub fn remap(&self, client: ClientHandle<K>) -> Result<ServerHandle<K>, DecodeError> {
        if client.is_null() {
            return Ok(ServerHandle::NULL);
        }
        self.resolve(client)
    }

    /// Resolves and unbinds a client handle, for destroy commands.
    pub fn remove(&mut self, client: ClientHandle<K>) -> Result<ServerHandle<K>, DecodeError> {
        self.entries
            .get_mut(client.raw() as usize)
            .and_then(Option::take)
            .ok_or(DecodeError::UnresolvedHandle {
                kind: K::NAME,
                index: client.raw(),
            })
    }

    /// Number of live entries.
    pub fn live(&self) -> usize {
        self.entries.iter().flatten().count()
    }
}

impl<K: ResourceKind> Default for HandleMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// The render thread's dictionary from client handles to backend handles,
/// one map per resource class.
///
/// Populated lazily as creation commands decode; owned exclusively by the
/// render thread.
#[derive(Debug, Default)]
pub struct ServerResourceTable {
    /// Vertex buffer mappings.
    pub vertex_buffers: HandleMap<VertexBufferKind>,
    /// Index buffer mappings.
    pub index_buffers: HandleMap<IndexBufferKind>,
    /// Uniform buffer mappings.
    pub uniform_buffers: HandleMap<UniformBufferKind>,
    /// Storage buffer mappings.
    pub storage_buffers: HandleMap<StorageBufferKind>,
    /// Shader mappings.
    pub shaders: HandleMap<ShaderKind>,
    /// Texture mappings (all texture classes).
    pub textures: HandleMap<TextureKind>,
    /// Framebuffer mappings.
    pub framebuffers: HandleMap<FramebufferKind>,
    /// Mesh mappings.
    pub meshes: HandleMap<MeshKind>,
}

impl ServerResourceTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }
}
