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

use super::ServerResourceTable;
use crate::config::PipelineConfig;
use crate::error::DecodeError;
use kiln_core::codec::StreamReader;
use kiln_core::error::CodecError;
use kiln_core::handle::{
    ClientHandle, FramebufferKind, MeshKind, ServerHandle, StorageBufferKind, TextureKind,
    UniformBufferKind,
};
use kiln_core::memory::{Block, LinearAllocator};
use kiln_core::render::{
    BlendMode, ClearFlags, CullMode, DepthFunc, FilterMode, ImageAccess, IndexFormat,
    MeshDescriptor, PassIndex, PreDrawAction, PrimitiveTopology, RenderFlags,
    ResolvedFramebufferDescriptor, ResolvedMeshDescriptor, ResolvedRenderPassDescriptor,
    ResolvedRenderState, ResolvedVertexLayout, ShaderDescriptor, TextureDescriptor, TextureFormat,
    VertexAttribute, VertexFormat, WrapMode, MAX_COLOR_ATTACHMENTS, MAX_VERTEX_ATTRIBUTES,
};
use kiln_core::{GraphicsBackend, Opcode};
use std::borrow::Cow;

/// Counters reported after decoding one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Commands decoded, terminator included.
    pub commands: u32,
    /// Resource creations forwarded to the backend.
    pub creates: u32,
    /// Draws submitted.
    pub draws: u32,
    /// Compute dispatches submitted.
    pub dispatches: u32,
    /// Render passes declared.
    pub passes: u32,
    /// Buffer updates that were deferred to a pre-draw flush.
    pub deferred_updates: u32,
    /// Encoded size of the frame in bytes.
    pub stream_bytes: usize,
}

/// Which buffer a deferred update targets.
#[derive(Debug, Clone, Copy)]
enum PendingTarget {
    Uniform(ServerHandle<UniformBufferKind>),
    Storage(ServerHandle<StorageBufferKind>),
}

/// A decoded-but-not-applied buffer update. The payload lives in the
/// decoder's staging arena until the dependent draw submits.
#[derive(Debug)]
struct PendingUpdate {
    target: PendingTarget,
    offset: u32,
    payload: Block,
}

/// One draw held back for end-of-frame pass sorting.
#[derive(Debug)]
struct QueuedDraw {
    mesh: ServerHandle<MeshKind>,
    state: ResolvedRenderState,
    /// `None` submits a plain draw, `Some(n)` an instanced one.
    instances: Option<u32>,
    /// Updates that must apply immediately before this draw.
    actions: Vec<PendingUpdate>,
}

/// Walks a sealed frame once and replays it against a backend.
///
/// Owns the [`ServerResourceTable`] and a staging arena that is reset once
/// per decoded frame. Draws are queued, stable-sorted by pass index and
/// flushed at the frame terminator; each draw's deferred updates apply
/// immediately before it. Everything else executes in exactly recorded
/// order.
///
/// Any error leaves the backend desynchronized from the recorded intent,
/// so decoding stops instead of skipping the offending command.
#[derive(Debug)]
pub struct FrameDecoder {
    table: ServerResourceTable,
    arena: LinearAllocator,
    pending: Vec<PendingUpdate>,
    draws: Vec<QueuedDraw>,
    /// Recorded pass index (position) to backend pass index.
    pass_map: Vec<PassIndex>,
}

impl FrameDecoder {
    /// Creates a decoder with a staging arena sized by `config`.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            table: ServerResourceTable::new(),
            arena: LinearAllocator::with_capacity(config.decode_arena_bytes),
            pending: Vec::new(),
            draws: Vec::new(),
            pass_map: Vec::new(),
        }
    }

    /// The live client-to-server handle mappings.
    pub fn table(&self) -> &ServerResourceTable {
        &self.table
    }

    /// Decodes one sealed frame against `backend`.
    ///
    /// The frame is atomic to the backend: it is bracketed by
    /// [`begin_frame`](GraphicsBackend::begin_frame) /
    /// [`end_frame`](GraphicsBackend::end_frame) and nothing of frame N+1
    /// is visible before frame N fully applied.
    pub fn decode(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        frame: &[u8],
    ) -> Result<FrameStats, DecodeError> {
        self.arena.reset();
        self.pending.clear();
        self.draws.clear();
        self.pass_map.clear();

        let mut stats = FrameStats {
            stream_bytes: frame.len(),
            ..FrameStats::default()
        };
        let mut reader = StreamReader::new(frame);

        backend.begin_frame();
        loop {
            // Terminating on exhaustion is defensive; a well-formed frame
            // always reaches the End opcode first.
            if !reader.has_remaining() {
                log::warn!("frame stream exhausted without End terminator");
                break;
            }
            let opcode = Opcode::try_from(reader.read_u8()?)?;
            stats.commands += 1;

            match opcode {
                Opcode::CreateVertexBuffer => {
                    let client = reader.read_pod()?;
                    let data = reader.read_blob()?;
                    let server = backend.create_vertex_buffer(data)?;
                    self.table.vertex_buffers.insert(client, server);
                    stats.creates += 1;
                }
                Opcode::UpdateVertexBuffer => {
                    let client = reader.read_pod()?;
                    let offset = reader.read_u32()?;
                    let data = reader.read_blob()?;
                    let server = self.table.vertex_buffers.resolve(client)?;
                    backend.update_vertex_buffer(server, data, offset)?;
                }
                Opcode::DestroyVertexBuffer => {
                    let client = reader.read_pod()?;
                    let server = self.table.vertex_buffers.remove(client)?;
                    backend.destroy_vertex_buffer(server)?;
                }
                Opcode::CreateIndexBuffer => {
                    let client = reader.read_pod()?;
                    let data = reader.read_blob()?;
                    let server = backend.create_index_buffer(data)?;
                    self.table.index_buffers.insert(client, server);
                    stats.creates += 1;
                }
                Opcode::UpdateIndexBuffer => {
                    let client = reader.read_pod()?;
                    let offset = reader.read_u32()?;
                    let data = reader.read_blob()?;
                    let server = self.table.index_buffers.resolve(client)?;
                    backend.update_index_buffer(server, data, offset)?;
                }
                Opcode::DestroyIndexBuffer => {
                    let client = reader.read_pod()?;
                    let server = self.table.index_buffers.remove(client)?;
                    backend.destroy_index_buffer(server)?;
                }
                Opcode::CreateUniformBuffer => {
                    let client = reader.read_pod()?;
                    let data = reader.read_blob()?;
                    let server = backend.create_uniform_buffer(data)?;
                    self.table.uniform_buffers.insert(client, server);
                    stats.creates += 1;
                }
                Opcode::UpdateUniformBuffer => {
                    // Deferred: applied immediately before the next draw,
                    // so the update is visible to it without constraining
                    // scan order.
                    let client = reader.read_pod()?;
                    let offset = reader.read_u32()?;
                    let data = reader.read_blob()?;
                    let server = self.table.uniform_buffers.resolve(client)?;
                    let payload = self.arena.store(data)?;
                    self.pending.push(PendingUpdate {
                        target: PendingTarget::Uniform(server),
                        offset,
                        payload,
                    });
                    stats.deferred_updates += 1;
                }
                Opcode::DestroyUniformBuffer => {
                    let client = reader.read_pod()?;
                    let server = self.table.uniform_buffers.remove(client)?;
                    backend.destroy_uniform_buffer(server)?;
                }
                Opcode::CreateStorageBuffer => {
                    let client = reader.read_pod()?;
                    let data = reader.read_blob()?;
                    let server = backend.create_storage_buffer(data)?;
                    self.table.storage_buffers.insert(client, server);
                    stats.creates += 1;
                }
                Opcode::UpdateStorageBuffer => {
                    let client = reader.read_pod()?;
                    let offset = reader.read_u32()?;
                    let data = reader.read_blob()?;
                    let server = self.table.storage_buffers.resolve(client)?;
                    let payload = self.arena.store(data)?;
                    self.pending.push(PendingUpdate {
                        target: PendingTarget::Storage(server),
                        offset,
                        payload,
                    });
                    stats.deferred_updates += 1;
                }
                Opcode::DestroyStorageBuffer => {
                    let client = reader.read_pod()?;
                    let server = self.table.storage_buffers.remove(client)?;
                    backend.destroy_storage_buffer(server)?;
                }
                Opcode::CreateShader => {
                    let client = reader.read_pod()?;
                    let descriptor = read_shader_descriptor(&mut reader)?;
                    let server = backend.create_shader(&descriptor)?;
                    self.table.shaders.insert(client, server);
                    stats.creates += 1;
                }
                Opcode::CreateTexture2D => {
                    let client = reader.read_pod()?;
                    let descriptor = read_texture_descriptor(&mut reader)?;
                    let pixels = reader.read_blob()?;
                    let server = backend.create_texture_2d(&descriptor, pixels)?;
                    self.table.textures.insert(client, server);
                    stats.creates += 1;
                }
                Opcode::CreateTexture3D => {
                    let client = reader.read_pod()?;
                    let descriptor = read_texture_descriptor(&mut reader)?;
                    let pixels = reader.read_blob()?;
                    let server = backend.create_texture_3d(&descriptor, pixels)?;
                    self.table.textures.insert(client, server);
                    stats.creates += 1;
                }
                Opcode::CreateTextureCubemap => {
                    let client = reader.read_pod()?;
                    let descriptor = read_texture_descriptor(&mut reader)?;
                    let face_pixels = reader.read_blob()?;
                    let server = backend.create_texture_cubemap(&descriptor, face_pixels)?;
                    self.table.textures.insert(client, server);
                    stats.creates += 1;
                }
                Opcode::DestroyTexture => {
                    let client = reader.read_pod()?;
                    let server = self.table.textures.remove(client)?;
                    backend.destroy_texture(server)?;
                }
                Opcode::CreateFramebuffer => {
                    let client: ClientHandle<FramebufferKind> = reader.read_pod()?;
                    let descriptor = self.read_framebuffer_descriptor(&mut reader)?;
                    let server = backend.create_framebuffer(&descriptor)?;
                    self.table.framebuffers.insert(client, server);
                    stats.creates += 1;
                }
                Opcode::DestroyFramebuffer => {
                    let client = reader.read_pod()?;
                    let server = self.table.framebuffers.remove(client)?;
                    backend.destroy_framebuffer(server)?;
                }
                Opcode::CreateMesh => {
                    let client: ClientHandle<MeshKind> = reader.read_pod()?;
                    let descriptor = self.read_mesh_descriptor(&mut reader)?;
                    let server = backend.create_mesh(&descriptor)?;
                    self.table.meshes.insert(client, server);
                    stats.creates += 1;
                }
                Opcode::AddRenderPass => {
                    let descriptor = self.read_render_pass_descriptor(&mut reader)?;
                    let backend_index = backend.add_render_pass(&descriptor)?;
                    self.pass_map.push(backend_index);
                    stats.passes += 1;
                }
                Opcode::DrawMesh => {
                    let mesh = self.table.meshes.resolve(reader.read_pod()?)?;
                    let mut state = self.read_render_state(&mut reader)?;
                    state.pass = self.backend_pass(state.pass)?;
                    let inline = self.read_pre_action(&mut reader)?;
                    self.queue_draw(mesh, state, None, inline);
                    stats.draws += 1;
                }
                Opcode::DrawMeshInstanced => {
                    let mesh = self.table.meshes.resolve(reader.read_pod()?)?;
                    let instances = reader.read_u32()?;
                    let mut state = self.read_render_state(&mut reader)?;
                    state.pass = self.backend_pass(state.pass)?;
                    let inline = self.read_pre_action(&mut reader)?;
                    self.queue_draw(mesh, state, Some(instances), inline);
                    stats.draws += 1;
                }
                Opcode::DispatchCompute => {
                    let groups = [reader.read_u32()?, reader.read_u32()?, reader.read_u32()?];
                    let state = self.read_render_state(&mut reader)?;
                    // Dispatches do not join the pass-sorted draw queue;
                    // they flush pending updates and submit in stream
                    // order.
                    for update in std::mem::take(&mut self.pending) {
                        apply_update(backend, &self.arena, &update)?;
                    }
                    backend.dispatch_compute(groups, &state)?;
                    stats.dispatches += 1;
                }
                Opcode::End => break,
            }
        }

        self.flush_draws(backend)?;
        backend.end_frame();
        log::debug!(
            "frame decoded: {} commands, {} creates, {} draws, {} dispatches over {} passes ({} bytes)",
            stats.commands,
            stats.creates,
            stats.draws,
            stats.dispatches,
            stats.passes,
            stats.stream_bytes,
        );
        Ok(stats)
    }

    /// Queues a draw, claiming every pending update recorded since the
    /// last draw plus the draw's own inline action.
    fn queue_draw(
        &mut self,
        mesh: ServerHandle<MeshKind>,
        state: ResolvedRenderState,
        instances: Option<u32>,
        inline: Option<PendingUpdate>,
    ) {
        let mut actions = std::mem::take(&mut self.pending);
        actions.extend(inline);
        self.draws.push(QueuedDraw {
            mesh,
            state,
            instances,
            actions,
        });
    }

    /// Stable-sorts the queued draws by pass and submits them, running
    /// each draw's deferred updates immediately before it. Updates no draw
    /// claimed still apply at the end of the frame.
    fn flush_draws(&mut self, backend: &mut dyn GraphicsBackend) -> Result<(), DecodeError> {
        let mut draws = std::mem::take(&mut self.draws);
        draws.sort_by_key(|draw| draw.state.pass);

        for draw in &draws {
            for update in &draw.actions {
                apply_update(backend, &self.arena, update)?;
            }
            match draw.instances {
                None => backend.draw_mesh(draw.mesh, &draw.state)?,
                Some(instances) => {
                    backend.draw_mesh_instanced(draw.mesh, &draw.state, instances)?
                }
            }
        }

        for update in std::mem::take(&mut self.pending) {
            apply_update(backend, &self.arena, &update)?;
        }

        draws.clear();
        self.draws = draws;
        Ok(())
    }

    fn backend_pass(&self, recorded: PassIndex) -> Result<PassIndex, DecodeError> {
        self.pass_map
            .get(recorded.0 as usize)
            .copied()
            .ok_or(DecodeError::UnknownPassIndex(recorded.0))
    }

    /// Mirror of [`RenderState::encode`], fused with client-to-server
    /// remapping. The null handle passes through every remap unchanged.
    ///
    /// [`RenderState::encode`]: kiln_core::render::RenderState::encode
    fn read_render_state(
        &self,
        reader: &mut StreamReader<'_>,
    ) -> Result<ResolvedRenderState, DecodeError> {
        let mut state = ResolvedRenderState {
            pass: PassIndex(reader.read_u32()?),
            shader: self.table.shaders.remap(reader.read_pod()?)?,
            ..ResolvedRenderState::default()
        };
        for slot in state.uniform_buffers.iter_mut() {
            slot.name_hash = reader.read_u32()?;
            slot.handle = self.table.uniform_buffers.remap(reader.read_pod()?)?;
        }
        for slot in state.storage_buffers.iter_mut() {
            slot.name_hash = reader.read_u32()?;
            slot.handle = self.table.storage_buffers.remap(reader.read_pod()?)?;
        }
        for slot in state.textures.iter_mut() {
            slot.name_hash = reader.read_u32()?;
            slot.handle = self.table.textures.remap(reader.read_pod()?)?;
        }
        for slot in state.images.iter_mut() {
            slot.name_hash = reader.read_u32()?;
            slot.texture = self.table.textures.remap(reader.read_pod()?)?;
            slot.access = ImageAccess::from_bits(reader.read_u8()?);
        }
        state.viewport = reader.read_pod()?;
        state.depth_func = DepthFunc::try_from(reader.read_u8()?)?;
        state.blend_mode = BlendMode::try_from(reader.read_u8()?)?;
        state.cull_mode = CullMode::try_from(reader.read_u8()?)?;
        state.flags = RenderFlags::from_bits(reader.read_u8()?);
        Ok(state)
    }

    fn read_pre_action(
        &mut self,
        reader: &mut StreamReader<'_>,
    ) -> Result<Option<PendingUpdate>, DecodeError> {
        if reader.read_u8()? == 0 {
            return Ok(None);
        }
        let tag = reader.read_u8()?;
        let update = match tag {
            tag if tag == PreDrawAction::UNIFORM_TAG => {
                let client = reader.read_pod()?;
                let offset = reader.read_u32()?;
                let data = reader.read_blob()?;
                PendingUpdate {
                    target: PendingTarget::Uniform(self.table.uniform_buffers.resolve(client)?),
                    offset,
                    payload: self.arena.store(data)?,
                }
            }
            tag if tag == PreDrawAction::STORAGE_TAG => {
                let client = reader.read_pod()?;
                let offset = reader.read_u32()?;
                let data = reader.read_blob()?;
                PendingUpdate {
                    target: PendingTarget::Storage(self.table.storage_buffers.resolve(client)?),
                    offset,
                    payload: self.arena.store(data)?,
                }
            }
            other => {
                return Err(CodecError::InvalidValue {
                    what: "pre-draw action tag",
                    value: other as u32,
                }
                .into())
            }
        };
        Ok(Some(update))
    }

    fn read_framebuffer_descriptor(
        &self,
        reader: &mut StreamReader<'_>,
    ) -> Result<ResolvedFramebufferDescriptor, DecodeError> {
        let label = read_opt_string(reader)?;
        let mut color_attachments = [ServerHandle::<TextureKind>::NULL; MAX_COLOR_ATTACHMENTS];
        for attachment in color_attachments.iter_mut() {
            *attachment = self.table.textures.remap(reader.read_pod()?)?;
        }
        let depth_attachment = self.table.textures.remap(reader.read_pod()?)?;
        Ok(ResolvedFramebufferDescriptor {
            label,
            color_attachments,
            depth_attachment,
        })
    }

    fn read_render_pass_descriptor(
        &self,
        reader: &mut StreamReader<'_>,
    ) -> Result<ResolvedRenderPassDescriptor, DecodeError> {
        let name = reader.read_str()?.to_owned();
        let target = self.table.framebuffers.remap(reader.read_pod()?)?;
        let clear = ClearFlags::from_bits(reader.read_u8()?);
        let mut clear_color = [0.0f32; 4];
        for channel in &mut clear_color {
            *channel = reader.read_f32()?;
        }
        let clear_depth = reader.read_f32()?;
        let clear_stencil = reader.read_u32()?;
        Ok(ResolvedRenderPassDescriptor {
            name,
            target,
            clear,
            clear_color,
            clear_depth,
            clear_stencil,
        })
    }

    /// Mirror of [`MeshDescriptor::encode`], fused with remapping. The
    /// layout is a tagged choice, so an unknown tag is a stream error, not
    /// a guess.
    fn read_mesh_descriptor(
        &self,
        reader: &mut StreamReader<'_>,
    ) -> Result<ResolvedMeshDescriptor, DecodeError> {
        let label = read_opt_string(reader)?;
        let tag = reader.read_u8()?;
        let layout = match tag {
            tag if tag == MeshDescriptor::INTERLACED_TAG => {
                let buffer = self.table.vertex_buffers.remap(reader.read_pod()?)?;
                let stride = reader.read_u32()?;
                let count = reader.read_u32()? as usize;
                if count > MAX_VERTEX_ATTRIBUTES {
                    return Err(CodecError::InvalidValue {
                        what: "vertex attribute count",
                        value: count as u32,
                    }
                    .into());
                }
                let mut attributes = Vec::with_capacity(count);
                for _ in 0..count {
                    attributes.push(VertexAttribute {
                        location: reader.read_u32()?,
                        format: VertexFormat::try_from(reader.read_u8()?)?,
                        offset: reader.read_u32()?,
                    });
                }
                ResolvedVertexLayout::Interlaced {
                    buffer,
                    stride,
                    attributes,
                }
            }
            tag if tag == MeshDescriptor::SEPARATE_TAG => ResolvedVertexLayout::Separate {
                positions: self.table.vertex_buffers.remap(reader.read_pod()?)?,
                normals: self.table.vertex_buffers.remap(reader.read_pod()?)?,
                tangents: self.table.vertex_buffers.remap(reader.read_pod()?)?,
                uvs: self.table.vertex_buffers.remap(reader.read_pod()?)?,
                colors: self.table.vertex_buffers.remap(reader.read_pod()?)?,
            },
            other => {
                return Err(CodecError::InvalidValue {
                    what: "vertex layout tag",
                    value: other as u32,
                }
                .into())
            }
        };
        Ok(ResolvedMeshDescriptor {
            label,
            layout,
            vertex_count: reader.read_u32()?,
            index_buffer: self.table.index_buffers.remap(reader.read_pod()?)?,
            index_format: IndexFormat::try_from(reader.read_u8()?)?,
            index_count: reader.read_u32()?,
            topology: PrimitiveTopology::try_from(reader.read_u8()?)?,
        })
    }
}

fn apply_update(
    backend: &mut dyn GraphicsBackend,
    arena: &LinearAllocator,
    update: &PendingUpdate,
) -> Result<(), DecodeError> {
    let data = arena.bytes(&update.payload);
    match update.target {
        PendingTarget::Uniform(handle) => backend.update_uniform_buffer(handle, data, update.offset)?,
        PendingTarget::Storage(handle) => backend.update_storage_buffer(handle, data, update.offset)?,
    }
    Ok(())
}

fn read_opt_string(reader: &mut StreamReader<'_>) -> Result<Option<String>, DecodeError> {
    if reader.read_u8()? == 0 {
        return Ok(None);
    }
    Ok(Some(reader.read_str()?.to_owned()))
}

fn read_opt_source(reader: &mut StreamReader<'_>) -> Result<Option<Cow<'static, str>>, DecodeError> {
    Ok(read_opt_string(reader)?.map(Cow::Owned))
}

fn read_shader_descriptor(
    reader: &mut StreamReader<'_>,
) -> Result<ShaderDescriptor<'static>, DecodeError> {
    Ok(ShaderDescriptor {
        label: Cow::Owned(reader.read_str()?.to_owned()),
        vertex_source: read_opt_source(reader)?,
        fragment_source: read_opt_source(reader)?,
        compute_source: read_opt_source(reader)?,
    })
}

fn read_texture_descriptor(
    reader: &mut StreamReader<'_>,
) -> Result<TextureDescriptor<'static>, DecodeError> {
    Ok(TextureDescriptor {
        label: read_opt_string(reader)?.map(Cow::Owned),
        width: reader.read_u32()?,
        height: reader.read_u32()?,
        depth: reader.read_u32()?,
        format: TextureFormat::try_from(reader.read_u8()?)?,
        min_filter: FilterMode::try_from(reader.read_u8()?)?,
        mag_filter: FilterMode::try_from(reader.read_u8()?)?,
        wrap: WrapMode::try_from(reader.read_u8()?)?,
    })
}
