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

//! Headless demo: a simulation loop records frames, a render thread
//! decodes them against the logging [`NullBackend`].
//!
//! Run with `RUST_LOG=debug` to watch every command cross the thread
//! boundary.

mod null_backend;

use anyhow::Result;
use kiln_core::render::{
    IndexFormat, MeshDescriptor, PrimitiveTopology, RenderPassDescriptor, RenderState,
    ShaderDescriptor, TextureDescriptor, TextureFormat, VertexAttribute, VertexFormat,
    VertexLayout,
};
use kiln_pipeline::{
    frame_channel, EventBus, FrameEvent, FramePipeline, PipelineConfig, RenderThread,
};
use null_backend::NullBackend;
use std::time::Duration;

const VERTEX_SRC: &str = "void main() { gl_Position = vec4(position, 1.0); }";
const FRAGMENT_SRC: &str = "void main() { color = vec4(1.0); }";

const CLEAR: [f32; 4] = [0.05, 0.05, 0.08, 1.0];
const SIM_TICKS: u32 = 4;

fn main() -> Result<()> {
    env_logger::init();

    let config = PipelineConfig::default();
    let (producer, consumer) = frame_channel(config.frame_stream_bytes);
    let mut pipeline = FramePipeline::new(producer);

    let backend = NullBackend::new(8 * 1024 * 1024, 512 * 1024);
    let events = EventBus::new();
    let render_thread = RenderThread::spawn(backend, consumer, &config, events.sender())?;

    // Frame 0: upload the scene and draw it once.
    let vertices: [f32; 9] = [0.0, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0];
    let indices: [u32; 3] = [0, 1, 2];

    let mut frame = pipeline.begin_frame();
    let vertex_buffer = frame.create_vertex_buffer(bytemuck::cast_slice(&vertices))?;
    let index_buffer = frame.create_index_buffer(bytemuck::cast_slice(&indices))?;
    let shader = frame.create_shader(&ShaderDescriptor {
        label: "unlit".into(),
        vertex_source: Some(VERTEX_SRC.into()),
        fragment_source: Some(FRAGMENT_SRC.into()),
        compute_source: None,
    })?;
    let sky = frame.create_texture_cubemap(
        &TextureDescriptor::two_dimensional(2, 2, TextureFormat::Rgba8Srgb),
        &[0x80u8; 2 * 2 * 4 * 6],
    )?;
    let camera = frame.create_uniform_buffer(bytemuck::cast_slice(&[0.0f32; 4]))?;
    let mesh = frame.create_mesh(&MeshDescriptor {
        label: Some("triangle".into()),
        layout: VertexLayout::Interlaced {
            buffer: vertex_buffer,
            stride: 12,
            attributes: &[VertexAttribute {
                location: 0,
                format: VertexFormat::Float32x3,
                offset: 0,
            }],
        },
        vertex_count: 3,
        index_buffer,
        index_format: IndexFormat::U32,
        index_count: 3,
        topology: PrimitiveTopology::Triangles,
    })?;
    let pass = frame.add_render_pass(&RenderPassDescriptor::clearing("forward", CLEAR))?;
    let mut state = RenderState::for_pass(pass, shader);
    state
        .bind_uniform_buffer("u_camera", camera)
        .bind_texture("u_sky", sky);
    frame.draw_mesh(mesh, &state, None)?;
    frame.finish()?;

    // The upload frame must decode before animation starts overwriting
    // unconsumed frames: creates are recorded once, draws every tick.
    match events.receiver().recv_timeout(Duration::from_secs(5)) {
        Ok(FrameEvent::Decoded(stats)) => {
            log::info!("scene uploaded: {} resources created", stats.creates)
        }
        Ok(FrameEvent::Error(message)) => anyhow::bail!("scene upload failed: {message}"),
        Err(err) => anyhow::bail!("render thread did not respond: {err}"),
    }

    // Animation ticks: a camera update and a draw per frame. The render
    // thread keeps up or skips to the latest frame; the simulation never
    // waits either way.
    for tick in 1..=SIM_TICKS {
        let mut frame = pipeline.begin_frame();
        let pass = frame.add_render_pass(&RenderPassDescriptor::clearing("forward", CLEAR))?;
        let angle = tick as f32 * 0.1;
        frame.update_uniform_buffer(camera, bytemuck::cast_slice(&[angle, 0.0, 0.0, 0.0]), 0)?;

        let mut state = RenderState::for_pass(pass, shader);
        state
            .bind_uniform_buffer("u_camera", camera)
            .bind_texture("u_sky", sky);
        frame.draw_mesh(mesh, &state, None)?;
        frame.finish()?;

        std::thread::sleep(Duration::from_millis(8));
    }

    pipeline.shutdown();
    render_thread
        .join()
        .map_err(|_| anyhow::anyhow!("render thread panicked"))?;

    let mut decoded = 0u32;
    while let Ok(event) = events.receiver().try_recv() {
        match event {
            FrameEvent::Decoded(stats) => {
                decoded += 1;
                log::info!(
                    "frame decoded: {} commands, {} draws, {} bytes",
                    stats.commands,
                    stats.draws,
                    stats.stream_bytes,
                );
            }
            FrameEvent::Error(message) => log::error!("decode error: {message}"),
        }
    }
    log::info!(
        "{decoded} frames decoded, {} intermediate frames dropped",
        pipeline.dropped_frames(),
    );
    Ok(())
}
