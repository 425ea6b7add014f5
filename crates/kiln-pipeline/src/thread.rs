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

//! The render thread: a decode loop over the frame channel.

use crate::config::PipelineConfig;
use crate::decode::FrameDecoder;
use crate::events::FrameEvent;
use crate::frame::FrameConsumer;
use kiln_core::GraphicsBackend;
use std::thread::JoinHandle;

/// Owns the long-lived render thread.
///
/// The thread condition-waits on the frame channel, decodes each acquired
/// frame against the backend, returns the slot, and publishes a
/// [`FrameEvent`] per frame. It ends when the producer side shuts the
/// channel down, or immediately after a decode error (the backend is
/// desynchronized at that point, so continuing would compound the
/// damage).
#[derive(Debug)]
pub struct RenderThread {
    handle: JoinHandle<()>,
}

impl RenderThread {
    /// Spawns the render thread over its exclusively-owned backend,
    /// decoder state and channel endpoint.
    ///
    /// ## Errors
    /// An `io::Error` if the OS refuses to spawn the thread.
    pub fn spawn<B>(
        mut backend: B,
        consumer: FrameConsumer,
        config: &PipelineConfig,
        events: flume::Sender<FrameEvent>,
    ) -> std::io::Result<Self>
    where
        B: GraphicsBackend + 'static,
    {
        let mut decoder = FrameDecoder::new(config);
        let handle = std::thread::Builder::new()
            .name("kiln-render".to_string())
            .spawn(move || {
                log::info!("render thread started");
                while let Some(slot) = consumer.acquire() {
                    let outcome = decoder.decode(&mut backend, slot.bytes());
                    consumer.release(slot);
                    match outcome {
                        Ok(stats) => {
                            if events.send(FrameEvent::Decoded(stats)).is_err() {
                                log::trace!("no listener for frame stats");
                            }
                        }
                        Err(err) => {
                            log::error!("frame decode failed: {err}");
                            events.send(FrameEvent::Error(err.to_string())).ok();
                            break;
                        }
                    }
                }
                log::info!("render thread stopped");
            })?;
        Ok(Self { handle })
    }

    /// Waits for the thread to finish. Call after signalling shutdown
    /// through the producer side.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}
