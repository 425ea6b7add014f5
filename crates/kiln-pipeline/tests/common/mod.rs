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

//! A backend double that records every call for inspection.

#![allow(dead_code)]

use kiln_core::error::ResourceError;
use kiln_core::handle::{
    FramebufferKind, IndexBufferKind, MeshKind, ServerHandle, ShaderKind, StorageBufferKind,
    TextureKind, UniformBufferKind, VertexBufferKind,
};
use kiln_core::render::{
    PassIndex, ResolvedFramebufferDescriptor, ResolvedMeshDescriptor,
    ResolvedRenderPassDescriptor, ResolvedRenderState, ShaderDescriptor, TextureDescriptor,
};
use kiln_core::GraphicsBackend;
use std::sync::{Arc, Mutex};

/// First server handle the mock hands out. Far from the client space's
/// small indices, so a handle that was never remapped is obvious in
/// assertions.
pub const FIRST_SERVER_HANDLE: u32 = 101;

/// First pass index the mock hands out, likewise far from the recorded
/// frame-local indices.
pub const FIRST_BACKEND_PASS: u32 = 1000;

/// Everything the decoder asked the backend to do, with owned payload
/// copies so tests can assert byte-identical round trips.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    BeginFrame,
    EndFrame,
    CreateVertexBuffer { server: u32, data: Vec<u8> },
    UpdateVertexBuffer { server: u32, data: Vec<u8>, offset: u32 },
    DestroyVertexBuffer { server: u32 },
    CreateIndexBuffer { server: u32, data: Vec<u8> },
    UpdateIndexBuffer { server: u32, data: Vec<u8>, offset: u32 },
    DestroyIndexBuffer { server: u32 },
    CreateUniformBuffer { server: u32, data: Vec<u8> },
    UpdateUniformBuffer { server: u32, data: Vec<u8>, offset: u32 },
    DestroyUniformBuffer { server: u32 },
    CreateStorageBuffer { server: u32, data: Vec<u8> },
    UpdateStorageBuffer { server: u32, data: Vec<u8>, offset: u32 },
    DestroyStorageBuffer { server: u32 },
    CreateShader { server: u32, label: String },
    CreateTexture2D { server: u32, pixels: Vec<u8> },
    CreateTexture3D { server: u32, pixels: Vec<u8> },
    CreateTextureCubemap { server: u32, pixels: Vec<u8> },
    DestroyTexture { server: u32 },
    CreateFramebuffer { server: u32, descriptor: ResolvedFramebufferDescriptor },
    DestroyFramebuffer { server: u32 },
    CreateMesh { server: u32, descriptor: ResolvedMeshDescriptor },
    AddRenderPass { index: u32, descriptor: ResolvedRenderPassDescriptor },
    DrawMesh { mesh: u32, state: Box<ResolvedRenderState> },
    DrawMeshInstanced { mesh: u32, state: Box<ResolvedRenderState>, instances: u32 },
    DispatchCompute { groups: [u32; 3], state: Box<ResolvedRenderState> },
}

/// Shared call log, inspectable after the backend moved onto the render
/// thread.
pub type CallLog = Arc<Mutex<Vec<BackendCall>>>;

/// A [`GraphicsBackend`] that performs no graphics work: it allocates
/// server handles from its own counter and records every call.
#[derive(Debug)]
pub struct RecordingBackend {
    calls: CallLog,
    next_handle: u32,
    next_pass: u32,
}

impl RecordingBackend {
    pub fn new() -> (Self, CallLog) {
        let calls: CallLog = Arc::default();
        (
            Self {
                calls: Arc::clone(&calls),
                next_handle: FIRST_SERVER_HANDLE,
                next_pass: FIRST_BACKEND_PASS,
            },
            calls,
        )
    }

    fn push(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn mint<K: kiln_core::handle::ResourceKind>(&mut self) -> ServerHandle<K> {
        let handle = ServerHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        handle
    }
}

/// Drains a call log into a plain vector.
pub fn drain(calls: &CallLog) -> Vec<BackendCall> {
    calls.lock().unwrap().clone()
}

/// Index of the first call matching `predicate`, panicking with `what`
/// when absent.
pub fn position(calls: &[BackendCall], what: &str, predicate: impl Fn(&BackendCall) -> bool) -> usize {
    calls
        .iter()
        .position(predicate)
        .unwrap_or_else(|| panic!("no {what} in {calls:#?}"))
}

impl GraphicsBackend for RecordingBackend {
    fn begin_frame(&mut self) {
        self.push(BackendCall::BeginFrame);
    }

    fn end_frame(&mut self) {
        self.push(BackendCall::EndFrame);
    }

    fn create_vertex_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<VertexBufferKind>, ResourceError> {
        let server = self.mint();
        self.push(BackendCall::CreateVertexBuffer {
            server: server.raw(),
            data: data.to_vec(),
        });
        Ok(server)
    }

    fn update_vertex_buffer(
        &mut self,
        buffer: ServerHandle<VertexBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::UpdateVertexBuffer {
            server: buffer.raw(),
            data: data.to_vec(),
            offset,
        });
        Ok(())
    }

    fn destroy_vertex_buffer(
        &mut self,
        buffer: ServerHandle<VertexBufferKind>,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::DestroyVertexBuffer {
            server: buffer.raw(),
        });
        Ok(())
    }

    fn create_index_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<IndexBufferKind>, ResourceError> {
        let server = self.mint();
        self.push(BackendCall::CreateIndexBuffer {
            server: server.raw(),
            data: data.to_vec(),
        });
        Ok(server)
    }

    fn update_index_buffer(
        &mut self,
        buffer: ServerHandle<IndexBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::UpdateIndexBuffer {
            server: buffer.raw(),
            data: data.to_vec(),
            offset,
        });
        Ok(())
    }

    fn destroy_index_buffer(
        &mut self,
        buffer: ServerHandle<IndexBufferKind>,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::DestroyIndexBuffer {
            server: buffer.raw(),
        });
        Ok(())
    }

    fn create_uniform_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<UniformBufferKind>, ResourceError> {
        let server = self.mint();
        self.push(BackendCall::CreateUniformBuffer {
            server: server.raw(),
            data: data.to_vec(),
        });
        Ok(server)
    }

    fn update_uniform_buffer(
        &mut self,
        buffer: ServerHandle<UniformBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::UpdateUniformBuffer {
            server: buffer.raw(),
            data: data.to_vec(),
            offset,
        });
        Ok(())
    }

    fn destroy_uniform_buffer(
        &mut self,
        buffer: ServerHandle<UniformBufferKind>,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::DestroyUniformBuffer {
            server: buffer.raw(),
        });
        Ok(())
    }

    fn create_storage_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ServerHandle<StorageBufferKind>, ResourceError> {
        let server = self.mint();
        self.push(BackendCall::CreateStorageBuffer {
            server: server.raw(),
            data: data.to_vec(),
        });
        Ok(server)
    }

    fn update_storage_buffer(
        &mut self,
        buffer: ServerHandle<StorageBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::UpdateStorageBuffer {
            server: buffer.raw(),
            data: data.to_vec(),
            offset,
        });
        Ok(())
    }

    fn destroy_storage_buffer(
        &mut self,
        buffer: ServerHandle<StorageBufferKind>,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::DestroyStorageBuffer {
            server: buffer.raw(),
        });
        Ok(())
    }

    fn create_shader(
        &mut self,
        descriptor: &ShaderDescriptor<'_>,
    ) -> Result<ServerHandle<ShaderKind>, ResourceError> {
        let server = self.mint();
        self.push(BackendCall::CreateShader {
            server: server.raw(),
            label: descriptor.label.clone().into_owned(),
        });
        Ok(server)
    }

    fn create_texture_2d(
        &mut self,
        _descriptor: &TextureDescriptor<'_>,
        pixels: &[u8],
    ) -> Result<ServerHandle<TextureKind>, ResourceError> {
        let server = self.mint();
        self.push(BackendCall::CreateTexture2D {
            server: server.raw(),
            pixels: pixels.to_vec(),
        });
        Ok(server)
    }

    fn create_texture_3d(
        &mut self,
        _descriptor: &TextureDescriptor<'_>,
        pixels: &[u8],
    ) -> Result<ServerHandle<TextureKind>, ResourceError> {
        let server = self.mint();
        self.push(BackendCall::CreateTexture3D {
            server: server.raw(),
            pixels: pixels.to_vec(),
        });
        Ok(server)
    }

    fn create_texture_cubemap(
        &mut self,
        _descriptor: &TextureDescriptor<'_>,
        face_pixels: &[u8],
    ) -> Result<ServerHandle<TextureKind>, ResourceError> {
        let server = self.mint();
        self.push(BackendCall::CreateTextureCubemap {
            server: server.raw(),
            pixels: face_pixels.to_vec(),
        });
        Ok(server)
    }

    fn destroy_texture(
        &mut self,
        texture: ServerHandle<TextureKind>,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::DestroyTexture {
            server: texture.raw(),
        });
        Ok(())
    }

    fn create_framebuffer(
        &mut self,
        descriptor: &ResolvedFramebufferDescriptor,
    ) -> Result<ServerHandle<FramebufferKind>, ResourceError> {
        let server = self.mint();
        self.push(BackendCall::CreateFramebuffer {
            server: server.raw(),
            descriptor: descriptor.clone(),
        });
        Ok(server)
    }

    fn destroy_framebuffer(
        &mut self,
        framebuffer: ServerHandle<FramebufferKind>,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::DestroyFramebuffer {
            server: framebuffer.raw(),
        });
        Ok(())
    }

    fn create_mesh(
        &mut self,
        descriptor: &ResolvedMeshDescriptor,
    ) -> Result<ServerHandle<MeshKind>, ResourceError> {
        let server = self.mint();
        self.push(BackendCall::CreateMesh {
            server: server.raw(),
            descriptor: descriptor.clone(),
        });
        Ok(server)
    }

    fn add_render_pass(
        &mut self,
        descriptor: &ResolvedRenderPassDescriptor,
    ) -> Result<PassIndex, ResourceError> {
        let index = PassIndex(self.next_pass);
        self.next_pass += 1;
        self.push(BackendCall::AddRenderPass {
            index: index.0,
            descriptor: descriptor.clone(),
        });
        Ok(index)
    }

    fn draw_mesh(
        &mut self,
        mesh: ServerHandle<MeshKind>,
        state: &ResolvedRenderState,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::DrawMesh {
            mesh: mesh.raw(),
            state: Box::new(state.clone()),
        });
        Ok(())
    }

    fn draw_mesh_instanced(
        &mut self,
        mesh: ServerHandle<MeshKind>,
        state: &ResolvedRenderState,
        instances: u32,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::DrawMeshInstanced {
            mesh: mesh.raw(),
            state: Box::new(state.clone()),
            instances,
        });
        Ok(())
    }

    fn dispatch_compute(
        &mut self,
        groups: [u32; 3],
        state: &ResolvedRenderState,
    ) -> Result<(), ResourceError> {
        self.push(BackendCall::DispatchCompute {
            groups,
            state: Box::new(state.clone()),
        });
        Ok(())
    }
}
