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

use super::ClientResourceTable;
use crate::error::EncodeError;
use crate::frame::{FrameProducer, FrameSlot};
use kiln_core::codec::StreamWriter;
use kiln_core::error::CodecError;
use kiln_core::handle::{
    ClientHandle, FramebufferKind, IndexBufferKind, MeshKind, ShaderKind, StorageBufferKind,
    TextureKind, UniformBufferKind, VertexBufferKind,
};
use kiln_core::render::{
    FramebufferDescriptor, MeshDescriptor, PassIndex, PreDrawAction, RenderPassDescriptor,
    RenderState, ShaderDescriptor, TextureDescriptor,
};
use kiln_core::Opcode;

/// The simulation thread's entry point into the pipeline.
///
/// Owns the client resource table and the producer endpoint of the frame
/// channel. Each tick, [`begin_frame`](FramePipeline::begin_frame) opens a
/// [`FrameEncoder`] over a fresh slot; the encoder's
/// [`finish`](FrameEncoder::finish) seals the frame and publishes it to
/// the render thread.
#[derive(Debug)]
pub struct FramePipeline {
    producer: FrameProducer,
    table: ClientResourceTable,
}

impl FramePipeline {
    /// Creates the simulation-side pipeline over a frame channel producer.
    pub fn new(producer: FrameProducer) -> Self {
        Self {
            producer,
            table: ClientResourceTable::new(),
        }
    }

    /// Opens the next frame for recording. Never blocks beyond the
    /// slot-swap lock; an unconsumed previous frame is overwritten.
    pub fn begin_frame(&mut self) -> FrameEncoder<'_> {
        let mut slot = self.producer.acquire();
        slot.begin();
        log::trace!("frame recording started");
        FrameEncoder {
            producer: &self.producer,
            table: &mut self.table,
            slot: Some(slot),
            offset: 0,
            next_pass: 0,
        }
    }

    /// Signals the render thread to stop after draining any ready frame.
    pub fn shutdown(&self) {
        self.producer.shutdown();
    }

    /// Frames sealed but overwritten before the render thread consumed
    /// them.
    pub fn dropped_frames(&self) -> u64 {
        self.producer.dropped_frames()
    }
}

/// Records one frame's commands, bracketed by
/// [`FramePipeline::begin_frame`] and [`finish`](FrameEncoder::finish).
///
/// The encoder's existence *is* the recording bracket: commands cannot be
/// recorded outside one. `create_*` operations mint the client handle and
/// return it synchronously; payload bytes are copied into the frame's
/// stream immediately, so the caller's buffer is reusable as soon as the
/// call returns.
///
/// A failed operation leaves the stream exactly as it was before the call.
/// Dropping the encoder without calling `finish` discards the frame.
#[derive(Debug)]
pub struct FrameEncoder<'a> {
    producer: &'a FrameProducer,
    table: &'a mut ClientResourceTable,
    slot: Option<FrameSlot>,
    offset: usize,
    next_pass: u32,
}

impl FrameEncoder<'_> {
    /// Runs one command-sized write against the slot. The running offset
    /// only advances when the whole command encoded, so a failed command
    /// leaves no partial bytes in the sealed stream.
    fn record<R>(
        &mut self,
        write: impl FnOnce(&mut StreamWriter<'_>) -> Result<R, CodecError>,
    ) -> Result<R, EncodeError> {
        let slot = match self.slot.as_mut() {
            Some(slot) => slot,
            // The slot only leaves in `finish`, which consumes `self`.
            None => unreachable!("encoder slot taken before finish"),
        };
        let mut writer = StreamWriter::resume(slot.buffer_mut(), self.offset);
        let value = write(&mut writer)?;
        self.offset = writer.offset();
        Ok(value)
    }

    /// Creates a vertex buffer from `data`, returning its client handle
    /// immediately.
    pub fn create_vertex_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ClientHandle<VertexBufferKind>, EncodeError> {
        let handle = self.table.mint_vertex_buffer();
        self.record(|w| {
            w.write_u8(Opcode::CreateVertexBuffer.as_u8())?;
            w.write_pod(&handle)?;
            w.write_blob(data)
        })?;
        log::trace!("recorded create of {handle}");
        Ok(handle)
    }

    /// Overwrites `data.len()` bytes of a vertex buffer at `offset`.
    pub fn update_vertex_buffer(
        &mut self,
        buffer: ClientHandle<VertexBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::UpdateVertexBuffer.as_u8())?;
            w.write_pod(&buffer)?;
            w.write_u32(offset)?;
            w.write_blob(data)
        })
    }

    /// Destroys a vertex buffer.
    pub fn destroy_vertex_buffer(
        &mut self,
        buffer: ClientHandle<VertexBufferKind>,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::DestroyVertexBuffer.as_u8())?;
            w.write_pod(&buffer)
        })
    }

    /// Creates an index buffer from `data`, returning its client handle
    /// immediately.
    pub fn create_index_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ClientHandle<IndexBufferKind>, EncodeError> {
        let handle = self.table.mint_index_buffer();
        self.record(|w| {
            w.write_u8(Opcode::CreateIndexBuffer.as_u8())?;
            w.write_pod(&handle)?;
            w.write_blob(data)
        })?;
        log::trace!("recorded create of {handle}");
        Ok(handle)
    }

    /// Overwrites `data.len()` bytes of an index buffer at `offset`.
    pub fn update_index_buffer(
        &mut self,
        buffer: ClientHandle<IndexBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::UpdateIndexBuffer.as_u8())?;
            w.write_pod(&buffer)?;
            w.write_u32(offset)?;
            w.write_blob(data)
        })
    }

    /// Destroys an index buffer.
    pub fn destroy_index_buffer(
        &mut self,
        buffer: ClientHandle<IndexBufferKind>,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::DestroyIndexBuffer.as_u8())?;
            w.write_pod(&buffer)
        })
    }

    /// Creates a uniform buffer from `data`, returning its client handle
    /// immediately.
    pub fn create_uniform_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ClientHandle<UniformBufferKind>, EncodeError> {
        let handle = self.table.mint_uniform_buffer();
        self.record(|w| {
            w.write_u8(Opcode::CreateUniformBuffer.as_u8())?;
            w.write_pod(&handle)?;
            w.write_blob(data)
        })?;
        log::trace!("recorded create of {handle}");
        Ok(handle)
    }

    /// Overwrites `data.len()` bytes of a uniform buffer at `offset`.
    ///
    /// On decode this update is deferred and guaranteed to apply before
    /// the next draw that follows it in the stream.
    pub fn update_uniform_buffer(
        &mut self,
        buffer: ClientHandle<UniformBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::UpdateUniformBuffer.as_u8())?;
            w.write_pod(&buffer)?;
            w.write_u32(offset)?;
            w.write_blob(data)
        })
    }

    /// Destroys a uniform buffer.
    pub fn destroy_uniform_buffer(
        &mut self,
        buffer: ClientHandle<UniformBufferKind>,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::DestroyUniformBuffer.as_u8())?;
            w.write_pod(&buffer)
        })
    }

    /// Creates a storage buffer from `data`, returning its client handle
    /// immediately.
    pub fn create_storage_buffer(
        &mut self,
        data: &[u8],
    ) -> Result<ClientHandle<StorageBufferKind>, EncodeError> {
        let handle = self.table.mint_storage_buffer();
        self.record(|w| {
            w.write_u8(Opcode::CreateStorageBuffer.as_u8())?;
            w.write_pod(&handle)?;
            w.write_blob(data)
        })?;
        log::trace!("recorded create of {handle}");
        Ok(handle)
    }

    /// Overwrites `data.len()` bytes of a storage buffer at `offset`.
    ///
    /// Deferred on decode the same way as uniform buffer updates.
    pub fn update_storage_buffer(
        &mut self,
        buffer: ClientHandle<StorageBufferKind>,
        data: &[u8],
        offset: u32,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::UpdateStorageBuffer.as_u8())?;
            w.write_pod(&buffer)?;
            w.write_u32(offset)?;
            w.write_blob(data)
        })
    }

    /// Destroys a storage buffer.
    pub fn destroy_storage_buffer(
        &mut self,
        buffer: ClientHandle<StorageBufferKind>,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::DestroyStorageBuffer.as_u8())?;
            w.write_pod(&buffer)
        })
    }

    /// Creates a shader program from its stage sources.
    pub fn create_shader(
        &mut self,
        descriptor: &ShaderDescriptor<'_>,
    ) -> Result<ClientHandle<ShaderKind>, EncodeError> {
        let handle = self.table.mint_shader();
        self.record(|w| {
            w.write_u8(Opcode::CreateShader.as_u8())?;
            w.write_pod(&handle)?;
            descriptor.encode(w)
        })?;
        log::trace!("recorded create of {handle}");
        Ok(handle)
    }

    /// Creates a 2D texture from a descriptor and its pixel data.
    pub fn create_texture_2d(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
        pixels: &[u8],
    ) -> Result<ClientHandle<TextureKind>, EncodeError> {
        self.create_texture(Opcode::CreateTexture2D, descriptor, pixels)
    }

    /// Creates a 3D texture from a descriptor and its pixel data.
    pub fn create_texture_3d(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
        pixels: &[u8],
    ) -> Result<ClientHandle<TextureKind>, EncodeError> {
        self.create_texture(Opcode::CreateTexture3D, descriptor, pixels)
    }

    /// Creates a cubemap texture from a descriptor and six concatenated
    /// face images.
    pub fn create_texture_cubemap(
        &mut self,
        descriptor: &TextureDescriptor<'_>,
        face_pixels: &[u8],
    ) -> Result<ClientHandle<TextureKind>, EncodeError> {
        self.create_texture(Opcode::CreateTextureCubemap, descriptor, face_pixels)
    }

    fn create_texture(
        &mut self,
        opcode: Opcode,
        descriptor: &TextureDescriptor<'_>,
        pixels: &[u8],
    ) -> Result<ClientHandle<TextureKind>, EncodeError> {
        let handle = self.table.mint_texture();
        self.record(|w| {
            w.write_u8(opcode.as_u8())?;
            w.write_pod(&handle)?;
            descriptor.encode(w)?;
            w.write_blob(pixels)
        })?;
        log::trace!("recorded create of {handle}");
        Ok(handle)
    }

    /// Destroys a texture of any class.
    pub fn destroy_texture(
        &mut self,
        texture: ClientHandle<TextureKind>,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::DestroyTexture.as_u8())?;
            w.write_pod(&texture)
        })
    }

    /// Creates a framebuffer from attachment textures.
    pub fn create_framebuffer(
        &mut self,
        descriptor: &FramebufferDescriptor<'_>,
    ) -> Result<ClientHandle<FramebufferKind>, EncodeError> {
        let handle = self.table.mint_framebuffer();
        self.record(|w| {
            w.write_u8(Opcode::CreateFramebuffer.as_u8())?;
            w.write_pod(&handle)?;
            descriptor.encode(w)
        })?;
        log::trace!("recorded create of {handle}");
        Ok(handle)
    }

    /// Destroys a framebuffer.
    pub fn destroy_framebuffer(
        &mut self,
        framebuffer: ClientHandle<FramebufferKind>,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::DestroyFramebuffer.as_u8())?;
            w.write_pod(&framebuffer)
        })
    }

    /// Creates a mesh from its descriptor.
    pub fn create_mesh(
        &mut self,
        descriptor: &MeshDescriptor<'_>,
    ) -> Result<ClientHandle<MeshKind>, EncodeError> {
        let handle = self.table.mint_mesh();
        self.record(|w| {
            w.write_u8(Opcode::CreateMesh.as_u8())?;
            w.write_pod(&handle)?;
            descriptor.encode(w)
        })?;
        log::trace!("recorded create of {handle}");
        Ok(handle)
    }

    /// Declares a render pass and returns its frame-local index for
    /// subsequent draws to order against.
    pub fn add_render_pass(
        &mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Result<PassIndex, EncodeError> {
        let index = PassIndex(self.next_pass);
        self.record(|w| {
            w.write_u8(Opcode::AddRenderPass.as_u8())?;
            descriptor.encode(w)
        })?;
        self.next_pass += 1;
        Ok(index)
    }

    /// Records one draw of `mesh` under `state`, with an optional
    /// deferred update that must be visible to this draw.
    pub fn draw_mesh(
        &mut self,
        mesh: ClientHandle<MeshKind>,
        state: &RenderState,
        pre_action: Option<&PreDrawAction<'_>>,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::DrawMesh.as_u8())?;
            w.write_pod(&mesh)?;
            state.encode(w)?;
            write_action(w, pre_action)
        })
    }

    /// Records an instanced draw of `mesh` under `state`.
    pub fn draw_mesh_instanced(
        &mut self,
        mesh: ClientHandle<MeshKind>,
        state: &RenderState,
        instances: u32,
        pre_action: Option<&PreDrawAction<'_>>,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::DrawMeshInstanced.as_u8())?;
            w.write_pod(&mesh)?;
            w.write_u32(instances)?;
            state.encode(w)?;
            write_action(w, pre_action)
        })
    }

    /// Records a compute dispatch over `groups` workgroups with the
    /// bindings of `state`.
    pub fn dispatch_compute(
        &mut self,
        groups: [u32; 3],
        state: &RenderState,
    ) -> Result<(), EncodeError> {
        self.record(|w| {
            w.write_u8(Opcode::DispatchCompute.as_u8())?;
            for count in groups {
                w.write_u32(count)?;
            }
            state.encode(w)
        })
    }

    /// Appends the frame terminator, seals the frame, and publishes it to
    /// the render thread.
    pub fn finish(mut self) -> Result<(), EncodeError> {
        let result = self.record(|w| w.write_u8(Opcode::End.as_u8()));
        let offset = self.offset;
        let mut slot = match self.slot.take() {
            Some(slot) => slot,
            None => unreachable!("encoder slot taken before finish"),
        };
        match result {
            Ok(()) => {
                slot.seal(offset);
                log::trace!("frame sealed at {offset} bytes");
                self.producer.submit(slot);
                Ok(())
            }
            Err(err) => {
                self.producer.release(slot);
                Err(err)
            }
        }
    }
}

impl Drop for FrameEncoder<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            log::debug!("frame encoder dropped without finish; frame discarded");
            self.producer.release(slot);
        }
    }
}

fn write_action(
    writer: &mut StreamWriter<'_>,
    action: Option<&PreDrawAction<'_>>,
) -> Result<(), CodecError> {
    match action {
        Some(action) => {
            writer.write_u8(1)?;
            action.encode(writer)
        }
        None => writer.write_u8(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::frame_channel;

    #[test]
    fn handles_stay_monotonic_across_frames() {
        let (producer, consumer) = frame_channel(4096);
        let mut pipeline = FramePipeline::new(producer);

        let mut frame = pipeline.begin_frame();
        let first = frame.create_vertex_buffer(&[0; 12]).unwrap();
        frame.finish().unwrap();
        consumer.release(consumer.acquire().unwrap());

        let mut frame = pipeline.begin_frame();
        let second = frame.create_vertex_buffer(&[0; 12]).unwrap();
        frame.finish().unwrap();

        assert_eq!(first.raw(), 1);
        assert_eq!(second.raw(), 2);
    }

    #[test]
    fn finished_frames_end_with_the_terminator() {
        let (producer, consumer) = frame_channel(4096);
        let mut pipeline = FramePipeline::new(producer);

        let mut frame = pipeline.begin_frame();
        frame.create_uniform_buffer(&[1, 2, 3, 4]).unwrap();
        frame.finish().unwrap();

        let slot = consumer.acquire().unwrap();
        assert_eq!(*slot.bytes().last().unwrap(), Opcode::End.as_u8());
        consumer.release(slot);
    }

    #[test]
    fn overflowing_command_fails_and_frame_stays_consistent() {
        let (producer, consumer) = frame_channel(64);
        let mut pipeline = FramePipeline::new(producer);

        let mut frame = pipeline.begin_frame();
        let err = frame.create_vertex_buffer(&[0; 128]).unwrap_err();
        assert!(matches!(err, EncodeError::Codec(_)));

        // The failed command left nothing behind; the frame still seals.
        frame.create_vertex_buffer(&[0; 16]).unwrap();
        frame.finish().unwrap();
        let slot = consumer.acquire().unwrap();
        assert_eq!(slot.bytes()[0], Opcode::CreateVertexBuffer.as_u8());
        consumer.release(slot);
    }

    #[test]
    fn dropping_an_encoder_discards_the_frame() {
        let (producer, consumer) = frame_channel(4096);
        let mut pipeline = FramePipeline::new(producer);

        drop(pipeline.begin_frame());
        pipeline.shutdown();
        assert!(consumer.acquire().is_none());
    }

    #[test]
    fn pass_indices_are_frame_local() {
        let (producer, consumer) = frame_channel(4096);
        let mut pipeline = FramePipeline::new(producer);

        let mut frame = pipeline.begin_frame();
        let desc = RenderPassDescriptor::clearing("main", [0.0; 4]);
        assert_eq!(frame.add_render_pass(&desc).unwrap(), PassIndex(0));
        assert_eq!(frame.add_render_pass(&desc).unwrap(), PassIndex(1));
        frame.finish().unwrap();
        consumer.release(consumer.acquire().unwrap());

        let mut frame = pipeline.begin_frame();
        assert_eq!(frame.add_render_pass(&desc).unwrap(), PassIndex(0));
        frame.finish().unwrap();
    }
}
