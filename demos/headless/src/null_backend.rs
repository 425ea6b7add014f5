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

//! A backend that performs no GPU work: it keeps CPU-side copies of buffer
//! resources and logs everything else.
//!
//! Buffer contents live in a [`GeneralAllocator`] so creates, updates and
//! destroys exercise a real allocate/write/free lifecycle; cubemap uploads
//! stage their six faces through a [`StackAllocator`] scope.

use kiln_core::error::ResourceError;
use kiln_core::handle::{
    FramebufferKind, IndexBufferKind, MeshKind, ResourceKind, ServerHandle, ShaderKind,
    StorageBufferKind, TextureKind, UniformBufferKind, VertexBufferKind,
};
use kiln_core::memory::{Block, GeneralAllocator, StackAllocator};
use kiln_core::render::{
    PassIndex, ResolvedFramebufferDescriptor, ResolvedMeshDescriptor,
    ResolvedRenderPassDescriptor, ResolvedRenderState, ShaderDescriptor, TextureDescriptor,
};
use kiln_core::{AllocError, GraphicsBackend};
use std::collections::HashMap;

fn out_of_memory(err: AllocError) -> ResourceError {
    ResourceError::Backend(format!("resource heap exhausted: {err}"))
}

/// CPU-side stand-in for a graphics device.
pub struct NullBackend {
    /// Long-lived buffer contents.
    heap: GeneralAllocator,
    /// Transient staging for multi-part uploads.
    scratch: StackAllocator,
    /// Server buffer handle to its heap block, all buffer classes.
    buffers: HashMap<u32, Block>,
    next_handle: u32,
    next_pass: u32,
    frame: u64,
}

impl NullBackend {
    /// Creates a backend with the given heap and staging capacities.
    pub fn new(heap_bytes: usize, scratch_bytes: usize) -> Self {
        Self {
            heap: GeneralAllocator::with_capacity(heap_bytes),
            scratch: StackAllocator::with_capacity(scratch_bytes),
            buffers: HashMap::new(),
            next_handle: 1,
            next_pass: 0,
            frame: 0,
        }
    }

    fn mint<K: ResourceKind>(&mut self) -> ServerHandle<K> {
        let handle = ServerHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn create_buffer<K: ResourceKind>(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<K>, ResourceError> {
        let handle = self.mint::<K>();
        let block = self
            .heap
            .allocate(data.len().max(1), 16)
            .map_err(out_of_memory)?;
        self.heap.bytes_mut(&block)[..data.len()].copy_from_slice(data);
        self.buffers.insert(handle.raw(), block);
        log::debug!("created {handle} ({} bytes)", data.len());
        Ok(handle)
    }

    fn update_buffer<K: ResourceKind>(
        &mut self,
        handle: ServerHandle<K>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError> {
        let block = *self
            .buffers
            .get(&handle.raw())
            .ok_or(ResourceError::InvalidHandle {
                kind: K::NAME,
                index: handle.raw(),
            })?;
        let start = offset as usize;
        let end = start + data.len();
        if end > block.size() {
            return Err(ResourceError::OutOfBounds {
                kind: K::NAME,
                offset,
                len: data.len(),
                size: block.size(),
            });
        }
        self.heap.bytes_mut(&block)[start..end].copy_from_slice(data);
        log::trace!("updated {handle} ({} bytes at {offset})", data.len());
        Ok(())
    }

    fn destroy_buffer<K: ResourceKind>(
        &mut self,
        handle: ServerHandle<K>,
    ) -> Result<(), ResourceError> {
        let block = self
            .buffers
            .remove(&handle.raw())
            .ok_or(ResourceError::InvalidHandle {
                kind: K::NAME,
                index: handle.raw(),
            })?;
        self.heap.deallocate(&block);
        log::debug!("destroyed {handle}");
        Ok(())
    }
}

impl GraphicsBackend for NullBackend {
    fn begin_frame(&mut self) {
        self.next_pass = 0;
        log::debug!("frame {} begins", self.frame);
    }

    fn end_frame(&mut self) {
        log::debug!(
            "frame {} ends, heap {}/{} bytes",
            self.frame,
            self.heap.stats().used,
            self.heap.stats().capacity,
        );
        self.frame += 1;
    }

    fn create_vertex_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<VertexBufferKind>, ResourceError> {
        self.create_buffer(data)
    }

    fn update_vertex_buffer(
        &mut self,
        buffer: ServerHandle<VertexBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError> {
        self.update_buffer(buffer, data, offset)
    }

    fn destroy_vertex_buffer(
        &mut self,
        buffer: ServerHandle<VertexBufferKind>,
    ) -> Result<(), ResourceError> {
        self.destroy_buffer(buffer)
    }

    fn create_index_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<IndexBufferKind>, ResourceError> {
        self.create_buffer(data)
    }

    fn update_index_buffer(
        &mut self,
        buffer: ServerHandle<IndexBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError> {
        self.update_buffer(buffer, data, offset)
    }

    fn destroy_index_buffer(
        &mut self,
        buffer: ServerHandle<IndexBufferKind>,
    ) -> Result<(), ResourceError> {
        self.destroy_buffer(buffer)
    }

    fn create_uniform_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<UniformBufferKind>, ResourceError> {
        self.create_buffer(data)
    }

    fn update_uniform_buffer(
        &mut self,
        buffer: ServerHandle<UniformBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError> {
        self.update_buffer(buffer, data, offset)
    }

    fn destroy_uniform_buffer(
        &mut self,
        buffer: ServerHandle<UniformBufferKind>,
    ) -> Result<(), ResourceError> {
        self.destroy_buffer(buffer)
    }

    fn create_storage_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<StorageBufferKind>, ResourceError> {
        self.create_buffer(data)
    }

    fn update_storage_buffer(
        &mut self,
        buffer: ServerHandle<StorageBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError> {
        self.update_buffer(buffer, data, offset)
    }

    fn destroy_storage_buffer(
        &mut self,
        buffer: ServerHandle<StorageBufferKind>,
    ) -> Result<(), ResourceError> {
        self.destroy_buffer(buffer)
    }

    fn create_shader(
        &mut self,
        descriptor: &ShaderDescriptor<'_>,
    ) -> Result<ServerHandle<ShaderKind>, ResourceError> {
        let handle = self.mint();
        log::debug!("compiled shader '{}' as {handle}", descriptor.label);
        Ok(handle)
    }

    fn create_texture_2d(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
        pixels: &[u8],
    ) -> Result<ServerHandle<TextureKind>, ResourceError> {
        let handle = self.mint();
        log::debug!(
            "created 2D texture {handle} ({}x{}, {} bytes)",
            descriptor.width,
            descriptor.height,
            pixels.len(),
        );
        Ok(handle)
    }

    fn create_texture_3d(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
        pixels: &[u8],
    ) -> Result<ServerHandle<TextureKind>, ResourceError> {
        let handle = self.mint();
        log::debug!(
            "created 3D texture {handle} ({}x{}x{}, {} bytes)",
            descriptor.width,
            descriptor.height,
            descriptor.depth,
            pixels.len(),
        );
        Ok(handle)
    }

    fn create_texture_cubemap(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
        face_pixels: &[u8],
    ) -> Result<ServerHandle<TextureKind>, ResourceError> {
        let handle = self.mint();
        let face_size = (face_pixels.len() / 6).max(1);

        // Stage the six faces as one nested scope, freed in reverse.
        let mut staged = Vec::with_capacity(6);
        for face in face_pixels.chunks(face_size).take(6) {
            let block = self
                .scratch
                .allocate(face_size, 4)
                .map_err(out_of_memory)?;
            self.scratch.bytes_mut(&block)[..face.len()].copy_from_slice(face);
            staged.push(block);
        }
        log::debug!(
            "created cubemap {handle} ({}x{}, staged {} bytes)",
            descriptor.width,
            descriptor.height,
            self.scratch.used(),
        );
        for block in staged.iter().rev() {
            self.scratch.deallocate(block);
        }
        Ok(handle)
    }

    fn destroy_texture(
        &mut self,
        texture: ServerHandle<TextureKind>,
    ) -> Result<(), ResourceError> {
        log::debug!("destroyed {texture}");
        Ok(())
    }

    fn create_framebuffer(
        &mut self,
        descriptor: &ResolvedFramebufferDescriptor,
    ) -> Result<ServerHandle<FramebufferKind>, ResourceError> {
        let handle = self.mint();
        let colors = descriptor
            .color_attachments
            .iter()
            .filter(|attachment| !attachment.is_null())
            .count();
        log::debug!("created framebuffer {handle} ({colors} color attachments)");
        Ok(handle)
    }

    fn destroy_framebuffer(
        &mut self,
        framebuffer: ServerHandle<FramebufferKind>,
    ) -> Result<(), ResourceError> {
        log::debug!("destroyed {framebuffer}");
        Ok(())
    }

    fn create_mesh(
        &mut self,
        descriptor: &ResolvedMeshDescriptor,
    ) -> Result<ServerHandle<MeshKind>, ResourceError> {
        let handle = self.mint();
        log::debug!(
            "created mesh {handle} ({} vertices, {} indices)",
            descriptor.vertex_count,
            descriptor.index_count,
        );
        Ok(handle)
    }

    fn add_render_pass(
        &mut self,
        descriptor: &ResolvedRenderPassDescriptor,
    ) -> Result<PassIndex, ResourceError> {
        let index = PassIndex(self.next_pass);
        self.next_pass += 1;
        log::debug!("pass {} declared as '{}'", index.0, descriptor.name);
        Ok(index)
    }

    fn draw_mesh(
        &mut self,
        mesh: ServerHandle<MeshKind>,
        state: &ResolvedRenderState,
    ) -> Result<(), ResourceError> {
        log::info!(
            "draw {mesh} with {} in pass {}",
            state.shader,
            state.pass.0,
        );
        Ok(())
    }

    fn draw_mesh_instanced(
        &mut self,
        mesh: ServerHandle<MeshKind>,
        state: &ResolvedRenderState,
        instances: u32,
    ) -> Result<(), ResourceError> {
        log::info!(
            "draw {mesh} x{instances} with {} in pass {}",
            state.shader,
            state.pass.0,
        );
        Ok(())
    }

    fn dispatch_compute(
        &mut self,
        groups: [u32; 3],
        state: &ResolvedRenderState,
    ) -> Result<(), ResourceError> {
        log::info!(
            "dispatch {} over {}x{}x{} groups",
            state.shader,
            groups[0],
            groups[1],
            groups[2],
        );
        Ok(())
    }
}
