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

//! The contract a concrete graphics backend implements.

use crate::error::ResourceError;
use crate::handle::{
    FramebufferKind, IndexBufferKind, MeshKind, ServerHandle, ShaderKind, StorageBufferKind,
    TextureKind, UniformBufferKind, VertexBufferKind,
};
use crate::render::descriptor::{
    ResolvedFramebufferDescriptor, ResolvedMeshDescriptor, ResolvedRenderPassDescriptor,
    ShaderDescriptor, TextureDescriptor,
};
use crate::render::state::{PassIndex, ResolvedRenderState};

/// The primitive operations the frame decoder issues against a graphics
/// backend.
///
/// The backend is owned exclusively by the render thread, so methods take
/// `&mut self` and the trait only requires `Send`, not `Sync`. All handles
/// crossing this boundary are server-space: the decoder has already
/// remapped every client handle before calling in.
///
/// Creation returns the backend's own handle for the new resource.
/// Failures surface as [`ResourceError`]; the decoder treats them as fatal
/// for the frame rather than continuing with a desynchronized stream.
pub trait GraphicsBackend: Send {
    /// Called once before the first command of a frame decodes.
    fn begin_frame(&mut self);

    /// Called once after the last command of a frame decodes.
    fn end_frame(&mut self);

    /// Creates a vertex buffer initialized with `data`.
    fn create_vertex_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<VertexBufferKind>, ResourceError>;

    /// Overwrites `data.len()` bytes of a vertex buffer starting at
    /// `offset`.
    fn update_vertex_buffer(
        &mut self,
        buffer: ServerHandle<VertexBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError>;

    /// Destroys a vertex buffer.
    fn destroy_vertex_buffer(
        &mut self,
        buffer: ServerHandle<VertexBufferKind>,
    ) -> Result<(), ResourceError>;

    /// Creates an index buffer initialized with `data`.
    fn create_index_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<IndexBufferKind>, ResourceError>;

    /// Overwrites `data.len()` bytes of an index buffer starting at
    /// `offset`.
    fn update_index_buffer(
        &mut self,
        buffer: ServerHandle<IndexBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError>;

    /// Destroys an index buffer.
    fn destroy_index_buffer(
        &mut self,
        buffer: ServerHandle<IndexBufferKind>,
    ) -> Result<(), ResourceError>;

    /// Creates a uniform buffer initialized with `data`.
    fn create_uniform_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<UniformBufferKind>, ResourceError>;

    /// Overwrites `data.len()` bytes of a uniform buffer starting at
    /// `offset`.
    fn update_uniform_buffer(
        &mut self,
        buffer: ServerHandle<UniformBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError>;

    /// Destroys a uniform buffer.
    fn destroy_uniform_buffer(
        &mut self,
        buffer: ServerHandle<UniformBufferKind>,
    ) -> Result<(), ResourceError>;

    /// Creates a storage buffer initialized with `data`.
    fn create_storage_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<StorageBufferKind>, ResourceError>;

    /// Overwrites `data.len()` bytes of a storage buffer starting at
    /// `offset`.
    fn update_storage_buffer(
        &mut self,
        buffer: ServerHandle<StorageBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError>;

    /// Destroys a storage buffer.
    fn destroy_storage_buffer(
        &mut self,
        buffer: ServerHandle<StorageBufferKind>,
    ) -> Result<(), ResourceError>;

    /// Compiles a shader program from its stage sources.
    ///
    /// ## Errors
    /// [`ResourceError::ShaderCompilation`] with the compiler's diagnostics
    /// when any stage fails to compile.
    fn create_shader(
        &mut self,
        descriptor: &ShaderDescriptor<'_>,
    ) -> Result<ServerHandle<ShaderKind>, ResourceError>;

    /// Creates a 2D texture initialized with `pixels`.
    fn create_texture_2d(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
        pixels: &[u8],
    ) -> Result<ServerHandle<TextureKind>, ResourceError>;

    /// Creates a 3D texture initialized with `pixels`.
    fn create_texture_3d(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
        pixels: &[u8],
    ) -> Result<ServerHandle<TextureKind>, ResourceError>;

    /// Creates a cubemap texture. `face_pixels` holds the six faces
    /// concatenated in +X, -X, +Y, -Y, +Z, -Z order.
    fn create_texture_cubemap(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
        face_pixels: &[u8],
    ) -> Result<ServerHandle<TextureKind>, ResourceError>;

    /// Destroys a texture of any class.
    fn destroy_texture(&mut self, texture: ServerHandle<TextureKind>)
        -> Result<(), ResourceError>;

    /// Creates a framebuffer from already-resolved attachment handles.
    fn create_framebuffer(
        &mut self,
        descriptor: &ResolvedFramebufferDescriptor,
    ) -> Result<ServerHandle<FramebufferKind>, ResourceError>;

    /// Destroys a framebuffer.
    fn destroy_framebuffer(
        &mut self,
        framebuffer: ServerHandle<FramebufferKind>,
    ) -> Result<(), ResourceError>;

    /// Creates a mesh from an already-resolved descriptor.
    fn create_mesh(
        &mut self,
        descriptor: &ResolvedMeshDescriptor,
    ) -> Result<ServerHandle<MeshKind>, ResourceError>;

    /// Declares a render pass for this frame.
    ///
    /// ## Returns
    /// The backend's own index for the pass, which the decoder substitutes
    /// into the render state of every draw recorded against it.
    fn add_render_pass(
        &mut self,
        descriptor: &ResolvedRenderPassDescriptor,
    ) -> Result<PassIndex, ResourceError>;

    /// Submits one draw of a mesh.
    fn draw_mesh(
        &mut self,
        mesh: ServerHandle<MeshKind>,
        state: &ResolvedRenderState,
    ) -> Result<(), ResourceError>;

    /// Submits one instanced draw of a mesh.
    fn draw_mesh_instanced(
        &mut self,
        mesh: ServerHandle<MeshKind>,
        state: &ResolvedRenderState,
        instances: u32,
    ) -> Result<(), ResourceError>;

    /// Dispatches a compute shader over `groups` workgroups.
    fn dispatch_compute(
        &mut self,
        groups: [u32; 3],
        state: &ResolvedRenderState,
    ) -> Result<(), ResourceError>;
}
