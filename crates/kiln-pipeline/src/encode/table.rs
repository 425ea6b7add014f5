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

use kiln_core::handle::{
    ClientHandle, FramebufferKind, IndexBufferKind, MeshKind, ResourceKind, ShaderKind,
    StorageBufferKind, TextureKind, UniformBufferKind, VertexBufferKind,
};
use std::marker::PhantomData;

/// One resource class's monotonic handle counter. Starts at 1 (0 is the
/// null handle) and never recycles an index, so a client handle is
/// unambiguous for the whole session.
#[derive(Debug)]
struct HandleCounter<K: ResourceKind> {
    next: u32,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> HandleCounter<K> {
    fn new() -> Self {
        Self {
            next: 1,
            _kind: PhantomData,
        }
    }

    fn mint(&mut self) -> ClientHandle<K> {
        assert!(self.next < u32::MAX, "{} handle space exhausted", K::NAME);
        let handle = ClientHandle::from_raw(self.next);
        self.next += 1;
        handle
    }
}

/// Mints client handles the instant the simulation thread requests a
/// resource, before the backend object exists.
///
/// Owned exclusively by the simulation thread; the decoder learns about
/// new handles only through the creation commands in the stream.
#[derive(Debug)]
pub struct ClientResourceTable {
    vertex_buffers: HandleCounter<VertexBufferKind>,
    index_buffers: HandleCounter<IndexBufferKind>,
    uniform_buffers: HandleCounter<UniformBufferKind>,
    storage_buffers: HandleCounter<StorageBufferKind>,
    shaders: HandleCounter<ShaderKind>,
    textures: HandleCounter<TextureKind>,
    framebuffers: HandleCounter<FramebufferKind>,
    meshes: HandleCounter<MeshKind>,
}

impl ClientResourceTable {
    /// Creates a table with every class counter at its first handle.
    pub fn new() -> Self {
        Self {
            vertex_buffers: HandleCounter::new(),
            index_buffers: HandleCounter::new(),
            uniform_buffers: HandleCounter::new(),
            storage_buffers: HandleCounter::new(),
            shaders: HandleCounter::new(),
            textures: HandleCounter::new(),
            framebuffers: HandleCounter::new(),
            meshes: HandleCounter::new(),
        }
    }

    /// Mints the next vertex buffer handle.
    pub fn mint_vertex_buffer(&mut self) -> ClientHandle<VertexBufferKind> {
        self.vertex_buffers.mint()
    }

    /// Mints the next index buffer handle.
    pub fn mint_index_buffer(&mut self) -> ClientHandle<IndexBufferKind> {
        self.index_buffers.mint()
    }

    /// Mints the next uniform buffer handle.
    pub fn mint_uniform_buffer(&mut self) -> ClientHandle<UniformBufferKind> {
        self.uniform_buffers.mint()
    }

    /// Mints the next storage buffer handle.
    pub fn mint_storage_buffer(&mut self) -> ClientHandle<StorageBufferKind> {
        self.storage_buffers.mint()
    }

    /// Mints the next shader handle.
    pub fn mint_shader(&mut self) -> ClientHandle<ShaderKind> {
        self.shaders.mint()
    }

    /// Mints the next texture handle.
    pub fn mint_texture(&mut self) -> ClientHandle<TextureKind> {
        self.textures.mint()
    }

    /// Mints the next framebuffer handle.
    pub fn mint_framebuffer(&mut self) -> ClientHandle<FramebufferKind> {
        self.framebuffers.mint()
    }

    /// Mints the next mesh handle.
    pub fn mint_mesh(&mut self) -> ClientHandle<MeshKind> {
        self.meshes.mint()
    }
}

impl Default for ClientResourceTable {
    fn default() -> Self {
        Self::new()
    }
}
