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

//! # Kiln Pipeline
//!
//! The rendering-command pipeline: a simulation thread records frames
//! through the [`FramePipeline`], a double-buffered [`frame
//! channel`](frame::frame_channel) hands sealed frames across the thread
//! boundary without ever blocking the producer, and the
//! [`RenderThread`] decodes each frame against a
//! [`GraphicsBackend`](kiln_core::GraphicsBackend), remapping every
//! client handle to its server-space counterpart on the way through.
//!
//! Frames are atomic: commands apply in recorded order, draws are
//! pass-sorted at the frame boundary, and frame N is fully visible to the
//! backend before frame N+1 begins decoding. A slow consumer never stalls
//! the producer; it simply misses intermediate frames ("latest frame
//! wins").

#![warn(missing_docs)]

pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod events;
pub mod frame;
pub mod thread;

pub use config::PipelineConfig;
pub use decode::{FrameDecoder, FrameStats, ServerResourceTable};
pub use encode::{ClientResourceTable, FrameEncoder, FramePipeline};
pub use error::{DecodeError, EncodeError};
pub use events::{EventBus, FrameEvent};
pub use frame::{frame_channel, FrameConsumer, FrameProducer, FrameSlot};
pub use thread::RenderThread;
