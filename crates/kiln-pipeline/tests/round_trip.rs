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

//! Record-then-decode round trips against a recording backend.

mod common;

use anyhow::Result;
use common::{drain, position, BackendCall, RecordingBackend, FIRST_BACKEND_PASS};
use kiln_core::error::CodecError;
use kiln_core::handle::ClientHandle;
use kiln_core::render::{
    FramebufferDescriptor, IndexFormat, MeshDescriptor, PreDrawAction, PrimitiveTopology,
    RenderPassDescriptor, RenderState, ResolvedVertexLayout, ShaderDescriptor, TextureDescriptor,
    TextureFormat, VertexAttribute, VertexFormat, VertexLayout,
};
use kiln_pipeline::{frame_channel, DecodeError, FrameDecoder, FramePipeline, PipelineConfig};

const STREAM_BYTES: usize = 1 << 16;

fn harness() -> (
    FramePipeline,
    kiln_pipeline::FrameConsumer,
    FrameDecoder,
    RecordingBackend,
    common::CallLog,
) {
    let (producer, consumer) = frame_channel(STREAM_BYTES);
    let pipeline = FramePipeline::new(producer);
    let decoder = FrameDecoder::new(&PipelineConfig::default());
    let (backend, calls) = RecordingBackend::new();
    (pipeline, consumer, decoder, backend, calls)
}

/// Seals the pipeline's pending frame and decodes it.
fn decode_pending(
    consumer: &kiln_pipeline::FrameConsumer,
    decoder: &mut FrameDecoder,
    backend: &mut RecordingBackend,
) -> Result<kiln_pipeline::FrameStats, DecodeError> {
    let slot = consumer.acquire().expect("a sealed frame is ready");
    let stats = decoder.decode(backend, slot.bytes());
    consumer.release(slot);
    stats
}

/// A mesh that references no buffers; enough for draw-ordering tests.
fn placeholder_mesh() -> MeshDescriptor<'static> {
    MeshDescriptor {
        label: None,
        layout: VertexLayout::Separate {
            positions: ClientHandle::NULL,
            normals: ClientHandle::NULL,
            tangents: ClientHandle::NULL,
            uvs: ClientHandle::NULL,
            colors: ClientHandle::NULL,
        },
        vertex_count: 3,
        index_buffer: ClientHandle::NULL,
        index_format: IndexFormat::U32,
        index_count: 0,
        topology: PrimitiveTopology::Triangles,
    }
}

#[test]
fn triangle_round_trip() -> Result<()> {
    let (mut pipeline, consumer, mut decoder, mut backend, calls) = harness();

    let vertices: [f32; 9] = [0.0, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0];
    let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
    let indices: [u32; 3] = [0, 1, 2];
    let index_bytes: &[u8] = bytemuck::cast_slice(&indices);

    let mut frame = pipeline.begin_frame();
    let vb = frame.create_vertex_buffer(vertex_bytes)?;
    let ib = frame.create_index_buffer(index_bytes)?;
    let shader = frame.create_shader(&ShaderDescriptor {
        label: "triangle".into(),
        vertex_source: Some("void main() {}".into()),
        fragment_source: Some("void main() {}".into()),
        compute_source: None,
    })?;
    let mesh = frame.create_mesh(&MeshDescriptor {
        label: Some("triangle".into()),
        layout: VertexLayout::Interlaced {
            buffer: vb,
            stride: 12,
            attributes: &[VertexAttribute {
                location: 0,
                format: VertexFormat::Float32x3,
                offset: 0,
            }],
        },
        vertex_count: 3,
        index_buffer: ib,
        index_format: IndexFormat::U32,
        index_count: 3,
        topology: PrimitiveTopology::Triangles,
    })?;
    let pass = frame.add_render_pass(&RenderPassDescriptor::clearing(
        "main",
        [0.0, 0.0, 0.0, 1.0],
    ))?;
    frame.draw_mesh(mesh, &RenderState::for_pass(pass, shader), None)?;
    frame.finish()?;

    let stats = decode_pending(&consumer, &mut decoder, &mut backend)?;
    assert_eq!(stats.creates, 4);
    assert_eq!(stats.draws, 1);
    assert_eq!(stats.passes, 1);
    assert_eq!(stats.commands, 7); // 6 recorded + End

    let calls = drain(&calls);
    assert_eq!(calls.len(), 8); // BeginFrame + 6 + EndFrame
    assert_eq!(calls[0], BackendCall::BeginFrame);
    assert_eq!(*calls.last().unwrap(), BackendCall::EndFrame);

    // Creations arrive in recorded order with byte-identical payloads.
    assert_eq!(
        calls[1],
        BackendCall::CreateVertexBuffer {
            server: 101,
            data: vertex_bytes.to_vec(),
        }
    );
    assert_eq!(
        calls[2],
        BackendCall::CreateIndexBuffer {
            server: 102,
            data: index_bytes.to_vec(),
        }
    );
    assert_eq!(
        calls[3],
        BackendCall::CreateShader {
            server: 103,
            label: "triangle".to_string(),
        }
    );

    // The mesh decoded with both embedded handles remapped.
    match &calls[4] {
        BackendCall::CreateMesh { server, descriptor } => {
            assert_eq!(*server, 104);
            assert_eq!(descriptor.label.as_deref(), Some("triangle"));
            assert_eq!(descriptor.index_buffer.raw(), 102);
            match &descriptor.layout {
                ResolvedVertexLayout::Interlaced {
                    buffer,
                    stride,
                    attributes,
                } => {
                    assert_eq!(buffer.raw(), 101);
                    assert_eq!(*stride, 12);
                    assert_eq!(attributes.len(), 1);
                    assert_eq!(attributes[0].format, VertexFormat::Float32x3);
                }
                other => panic!("expected interlaced layout, got {other:?}"),
            }
        }
        other => panic!("expected CreateMesh, got {other:?}"),
    }

    match &calls[5] {
        BackendCall::AddRenderPass { index, descriptor } => {
            assert_eq!(*index, FIRST_BACKEND_PASS);
            assert_eq!(descriptor.name, "main");
            assert!(descriptor.target.is_null());
        }
        other => panic!("expected AddRenderPass, got {other:?}"),
    }

    // The draw resolved its mesh, shader and pass index.
    match &calls[6] {
        BackendCall::DrawMesh { mesh, state } => {
            assert_eq!(*mesh, 104);
            assert_eq!(state.shader.raw(), 103);
            assert_eq!(state.pass.0, FIRST_BACKEND_PASS);
        }
        other => panic!("expected DrawMesh, got {other:?}"),
    }
    Ok(())
}

#[test]
fn update_recorded_before_draw_applies_before_it() -> Result<()> {
    let (mut pipeline, consumer, mut decoder, mut backend, calls) = harness();

    let v0 = [0u8; 16];
    let v1 = [1u8; 16];

    let mut frame = pipeline.begin_frame();
    let uniform = frame.create_uniform_buffer(&v0)?;
    let mesh = frame.create_mesh(&placeholder_mesh())?;
    let pass = frame.add_render_pass(&RenderPassDescriptor::clearing("main", [0.0; 4]))?;
    frame.update_uniform_buffer(uniform, &v1, 0)?;
    let mut state = RenderState::for_pass(pass, ClientHandle::NULL);
    state.bind_uniform_buffer("u_camera", uniform);
    frame.draw_mesh(mesh, &state, None)?;
    frame.finish()?;

    let stats = decode_pending(&consumer, &mut decoder, &mut backend)?;
    assert_eq!(stats.deferred_updates, 1);

    let calls = drain(&calls);
    let update = position(&calls, "uniform update", |call| {
        matches!(call, BackendCall::UpdateUniformBuffer { .. })
    });
    let draw = position(&calls, "draw", |call| {
        matches!(call, BackendCall::DrawMesh { .. })
    });

    // Deferred, but flushed immediately before the dependent draw.
    assert_eq!(update + 1, draw);
    assert_eq!(
        calls[update],
        BackendCall::UpdateUniformBuffer {
            server: 101,
            data: v1.to_vec(),
            offset: 0,
        }
    );
    Ok(())
}

#[test]
fn inline_pre_draw_action_applies_before_its_draw() -> Result<()> {
    let (mut pipeline, consumer, mut decoder, mut backend, calls) = harness();

    let payload = [7u8; 8];
    let mut frame = pipeline.begin_frame();
    let uniform = frame.create_uniform_buffer(&[0u8; 16])?;
    let mesh = frame.create_mesh(&placeholder_mesh())?;
    let pass = frame.add_render_pass(&RenderPassDescriptor::clearing("main", [0.0; 4]))?;
    frame.draw_mesh(
        mesh,
        &RenderState::for_pass(pass, ClientHandle::NULL),
        Some(&PreDrawAction::UpdateUniformBuffer {
            buffer: uniform,
            offset: 4,
            data: &payload,
        }),
    )?;
    frame.finish()?;

    decode_pending(&consumer, &mut decoder, &mut backend)?;

    let calls = drain(&calls);
    let update = position(&calls, "uniform update", |call| {
        matches!(call, BackendCall::UpdateUniformBuffer { .. })
    });
    assert_eq!(
        calls[update],
        BackendCall::UpdateUniformBuffer {
            server: 101,
            data: payload.to_vec(),
            offset: 4,
        }
    );
    assert!(matches!(calls[update + 1], BackendCall::DrawMesh { .. }));
    Ok(())
}

#[test]
fn null_handles_pass_through_remapping() -> Result<()> {
    let (mut pipeline, consumer, mut decoder, mut backend, calls) = harness();

    let mut frame = pipeline.begin_frame();
    let mesh = frame.create_mesh(&placeholder_mesh())?;
    let pass = frame.add_render_pass(&RenderPassDescriptor::clearing("main", [0.0; 4]))?;
    frame.draw_mesh(
        mesh,
        &RenderState::for_pass(pass, ClientHandle::NULL),
        None,
    )?;
    frame.finish()?;

    decode_pending(&consumer, &mut decoder, &mut backend)?;

    let calls = drain(&calls);
    match &calls[position(&calls, "mesh create", |call| {
        matches!(call, BackendCall::CreateMesh { .. })
    })] {
        BackendCall::CreateMesh { descriptor, .. } => {
            assert!(descriptor.index_buffer.is_null());
            match &descriptor.layout {
                ResolvedVertexLayout::Separate { positions, colors, .. } => {
                    assert!(positions.is_null());
                    assert!(colors.is_null());
                }
                other => panic!("expected separate layout, got {other:?}"),
            }
        }
        _ => unreachable!(),
    }
    match &calls[position(&calls, "draw", |call| {
        matches!(call, BackendCall::DrawMesh { .. })
    })] {
        BackendCall::DrawMesh { state, .. } => {
            assert!(state.shader.is_null());
            assert!(state.uniform_buffers.iter().all(|b| b.handle.is_null()));
            assert!(state.textures.iter().all(|b| b.handle.is_null()));
        }
        _ => unreachable!(),
    }
    Ok(())
}

#[test]
fn draws_flush_sorted_by_pass_declaration_order() -> Result<()> {
    let (mut pipeline, consumer, mut decoder, mut backend, calls) = harness();

    let mut frame = pipeline.begin_frame();
    let mesh_late = frame.create_mesh(&placeholder_mesh())?; // server 101
    let mesh_early = frame.create_mesh(&placeholder_mesh())?; // server 102
    let shadow_pass = frame.add_render_pass(&RenderPassDescriptor::clearing("shadow", [0.0; 4]))?;
    let main_pass = frame.add_render_pass(&RenderPassDescriptor::clearing("main", [0.0; 4]))?;

    // Recorded against the later pass first.
    frame.draw_mesh(
        mesh_late,
        &RenderState::for_pass(main_pass, ClientHandle::NULL),
        None,
    )?;
    frame.draw_mesh(
        mesh_early,
        &RenderState::for_pass(shadow_pass, ClientHandle::NULL),
        None,
    )?;
    frame.finish()?;

    decode_pending(&consumer, &mut decoder, &mut backend)?;

    let calls = drain(&calls);
    let draws: Vec<u32> = calls
        .iter()
        .filter_map(|call| match call {
            BackendCall::DrawMesh { mesh, .. } => Some(*mesh),
            _ => None,
        })
        .collect();
    // The shadow-pass draw submits first despite being recorded second.
    assert_eq!(draws, vec![102, 101]);
    Ok(())
}

#[test]
fn instanced_draws_carry_their_instance_count() -> Result<()> {
    let (mut pipeline, consumer, mut decoder, mut backend, calls) = harness();

    let mut frame = pipeline.begin_frame();
    let mesh = frame.create_mesh(&placeholder_mesh())?;
    let pass = frame.add_render_pass(&RenderPassDescriptor::clearing("main", [0.0; 4]))?;
    frame.draw_mesh_instanced(
        mesh,
        &RenderState::for_pass(pass, ClientHandle::NULL),
        32,
        None,
    )?;
    frame.finish()?;

    decode_pending(&consumer, &mut decoder, &mut backend)?;

    let calls = drain(&calls);
    assert!(calls.iter().any(|call| matches!(
        call,
        BackendCall::DrawMeshInstanced {
            mesh: 101,
            instances: 32,
            ..
        }
    )));
    Ok(())
}

#[test]
fn dispatch_flushes_pending_updates_in_stream_order() -> Result<()> {
    let (mut pipeline, consumer, mut decoder, mut backend, calls) = harness();

    let v1 = [9u8; 8];
    let mut frame = pipeline.begin_frame();
    let storage = frame.create_storage_buffer(&[0u8; 64])?;
    frame.update_storage_buffer(storage, &v1, 8)?;
    let mut state = RenderState::default();
    state.bind_storage_buffer("b_particles", storage);
    frame.dispatch_compute([4, 4, 1], &state)?;
    frame.finish()?;

    let stats = decode_pending(&consumer, &mut decoder, &mut backend)?;
    assert_eq!(stats.dispatches, 1);

    let calls = drain(&calls);
    let update = position(&calls, "storage update", |call| {
        matches!(call, BackendCall::UpdateStorageBuffer { .. })
    });
    match &calls[update + 1] {
        BackendCall::DispatchCompute { groups, state } => {
            assert_eq!(*groups, [4, 4, 1]);
            assert_eq!(state.storage_buffers[0].handle.raw(), 101);
        }
        other => panic!("expected DispatchCompute, got {other:?}"),
    }
    Ok(())
}

#[test]
fn framebuffer_and_pass_targets_are_remapped() -> Result<()> {
    let (mut pipeline, consumer, mut decoder, mut backend, calls) = harness();

    let pixels = vec![0xABu8; 4 * 4 * 4];
    let mut frame = pipeline.begin_frame();
    let texture = frame.create_texture_2d(
        &TextureDescriptor::two_dimensional(4, 4, TextureFormat::Rgba8Unorm),
        &pixels,
    )?;
    let framebuffer = frame.create_framebuffer(&FramebufferDescriptor {
        label: Some("gbuffer".into()),
        color_attachments: [texture, ClientHandle::NULL, ClientHandle::NULL, ClientHandle::NULL],
        depth_attachment: ClientHandle::NULL,
    })?;
    frame.add_render_pass(&RenderPassDescriptor {
        name: "offscreen".into(),
        target: framebuffer,
        clear: kiln_core::render::ClearFlags::COLOR,
        clear_color: [0.0; 4],
        clear_depth: 1.0,
        clear_stencil: 0,
    })?;
    frame.finish()?;

    decode_pending(&consumer, &mut decoder, &mut backend)?;

    let calls = drain(&calls);
    match &calls[position(&calls, "framebuffer create", |call| {
        matches!(call, BackendCall::CreateFramebuffer { .. })
    })] {
        BackendCall::CreateFramebuffer { descriptor, .. } => {
            assert_eq!(descriptor.color_attachments[0].raw(), 101);
            assert!(descriptor.color_attachments[1].is_null());
            assert!(descriptor.depth_attachment.is_null());
        }
        _ => unreachable!(),
    }
    match &calls[position(&calls, "render pass", |call| {
        matches!(call, BackendCall::AddRenderPass { .. })
    })] {
        BackendCall::AddRenderPass { descriptor, .. } => {
            assert_eq!(descriptor.name, "offscreen");
            assert_eq!(descriptor.target.raw(), 102);
        }
        _ => unreachable!(),
    }
    Ok(())
}

#[test]
fn cubemap_faces_round_trip_byte_identical() -> Result<()> {
    let (mut pipeline, consumer, mut decoder, mut backend, calls) = harness();

    let face = [0x11u8, 0x22, 0x33, 0x44];
    let faces: Vec<u8> = face.repeat(6);

    let mut frame = pipeline.begin_frame();
    frame.create_texture_cubemap(
        &TextureDescriptor::two_dimensional(1, 1, TextureFormat::Rgba8Unorm),
        &faces,
    )?;
    frame.finish()?;

    decode_pending(&consumer, &mut decoder, &mut backend)?;

    let calls = drain(&calls);
    assert!(calls.iter().any(|call| matches!(
        call,
        BackendCall::CreateTextureCubemap { pixels, .. } if *pixels == faces
    )));
    Ok(())
}

#[test]
fn destroyed_handles_become_unresolvable() -> Result<()> {
    let (mut pipeline, consumer, mut decoder, mut backend, calls) = harness();

    let mut frame = pipeline.begin_frame();
    let vb = frame.create_vertex_buffer(&[0u8; 12])?;
    frame.destroy_vertex_buffer(vb)?;
    frame.finish()?;
    decode_pending(&consumer, &mut decoder, &mut backend)?;

    assert!(drain(&calls)
        .iter()
        .any(|call| matches!(call, BackendCall::DestroyVertexBuffer { server: 101 })));

    // A later frame touching the destroyed handle fails loudly.
    let mut frame = pipeline.begin_frame();
    frame.update_vertex_buffer(vb, &[1u8; 4], 0)?;
    frame.finish()?;
    let err = decode_pending(&consumer, &mut decoder, &mut backend).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::UnresolvedHandle {
            kind: "vertex buffer",
            index: 1,
        }
    ));
    Ok(())
}

#[test]
fn unknown_opcodes_fail_loudly() {
    let (_, _, mut decoder, mut backend, _calls) = harness();
    let err = decoder.decode(&mut backend, &[0x63]).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Codec(CodecError::UnknownOpcode(0x63))
    ));
}

#[test]
fn draw_against_undeclared_pass_fails() -> Result<()> {
    let (mut pipeline, consumer, mut decoder, mut backend, _calls) = harness();

    let mut frame = pipeline.begin_frame();
    let mesh = frame.create_mesh(&placeholder_mesh())?;
    frame.draw_mesh(mesh, &RenderState::default(), None)?;
    frame.finish()?;

    let err = decode_pending(&consumer, &mut decoder, &mut backend).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownPassIndex(0)));
    Ok(())
}
