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

use super::FrameSlot;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Shared state of the two-slot hand-off. Only the slot exchange is ever
/// under this lock; recording and decoding happen on thread-owned slots.
#[derive(Debug)]
struct ChannelState {
    /// The most recently sealed, not yet consumed frame.
    ready: Option<FrameSlot>,
    /// Slots with no unconsumed frame in them.
    free: Vec<FrameSlot>,
    /// Set once; wakes the consumer for the last time.
    shutdown: bool,
    /// Sealed frames that were overwritten before the consumer got to
    /// them ("latest frame wins").
    dropped_frames: u64,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<ChannelState>,
    ready_cv: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().expect("frame channel lock poisoned")
    }
}

/// The simulation thread's endpoint: acquires slots for recording and
/// submits sealed frames. Never blocks beyond the slot-swap lock.
#[derive(Debug)]
pub struct FrameProducer {
    shared: Arc<Shared>,
}

/// The render thread's endpoint: waits for sealed frames and returns
/// consumed slots.
#[derive(Debug)]
pub struct FrameConsumer {
    shared: Arc<Shared>,
}

/// Creates the double-buffered frame channel: two slots of
/// `frame_stream_bytes` capacity, alternating between the producer and
/// consumer endpoints.
pub fn frame_channel(frame_stream_bytes: usize) -> (FrameProducer, FrameConsumer) {
    let shared = Arc::new(Shared {
        state: Mutex::new(ChannelState {
            ready: None,
            free: vec![
                FrameSlot::new(frame_stream_bytes),
                FrameSlot::new(frame_stream_bytes),
            ],
            shutdown: false,
            dropped_frames: 0,
        }),
        ready_cv: Condvar::new(),
    });
    (
        FrameProducer {
            shared: Arc::clone(&shared),
        },
        FrameConsumer { shared },
    )
}

impl FrameProducer {
    /// Takes a slot to record into. Never waits: if no slot is free, the
    /// unconsumed ready frame is reclaimed and dropped (latest frame
    /// wins).
    pub fn acquire(&self) -> FrameSlot {
        let mut state = self.shared.lock();
        if let Some(slot) = state.free.pop() {
            return slot;
        }
        match state.ready.take() {
            Some(slot) => {
                state.dropped_frames += 1;
                log::trace!("producer reclaimed an unconsumed frame");
                slot
            }
            // Two slots, at most one held per side: one of `free`/`ready`
            // always has a slot when the producer holds none.
            None => unreachable!("both frame slots in flight"),
        }
    }

    /// Publishes a sealed frame, replacing any unconsumed one, and wakes
    /// the consumer.
    pub fn submit(&self, slot: FrameSlot) {
        let mut state = self.shared.lock();
        if let Some(stale) = state.ready.replace(slot) {
            state.dropped_frames += 1;
            state.free.push(stale);
            log::trace!("unconsumed frame overwritten by a newer one");
        }
        drop(state);
        self.shared.ready_cv.notify_one();
    }

    /// Returns a slot without publishing it, e.g. when recording was
    /// abandoned.
    pub fn release(&self, slot: FrameSlot) {
        self.shared.lock().free.push(slot);
    }

    /// Signals the consumer to stop once the ready frame (if any) is
    /// drained.
    pub fn shutdown(&self) {
        self.shared.lock().shutdown = true;
        self.shared.ready_cv.notify_all();
    }

    /// Frames that were sealed but overwritten before being consumed.
    pub fn dropped_frames(&self) -> u64 {
        self.shared.lock().dropped_frames
    }
}

impl FrameConsumer {
    /// Blocks until a sealed frame is available and takes it. A ready
    /// frame is drained even after shutdown; `None` means the channel is
    /// shut down and empty.
    pub fn acquire(&self) -> Option<FrameSlot> {
        let mut state = self.shared.lock();
        loop {
            if let Some(slot) = state.ready.take() {
                return Some(slot);
            }
            if state.shutdown {
                return None;
            }
            state = self
                .shared
                .ready_cv
                .wait(state)
                .expect("frame channel lock poisoned");
        }
    }

    /// Returns a consumed slot to the free pool.
    pub fn release(&self, slot: FrameSlot) {
        self.shared.lock().free.push(slot);
    }
}
