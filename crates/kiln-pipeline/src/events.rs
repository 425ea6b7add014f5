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

//! Diagnostics events published by the render thread.

use crate::decode::FrameStats;

/// What the render thread reports after handling one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// A frame decoded successfully.
    Decoded(FrameStats),
    /// Decoding failed and the render thread is stopping. Carries the
    /// rendered error message; the error itself is also logged.
    Error(String),
}

/// Manages a generic, thread-safe event channel.
///
/// Generic over the event type `T` so the pipeline stays decoupled from
/// whatever higher layers want to transport alongside [`FrameEvent`]s.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a new bus with an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Sends an event, logging instead of failing if every receiver is
    /// gone.
    pub fn publish(&self, event: T) {
        if self.sender.send(event).is_err() {
            log::warn!("event dropped: all receivers disconnected");
        }
    }

    /// A clone of the sender end, for publishing from another thread.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// The receiver end, for the owner of the bus to drain.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
