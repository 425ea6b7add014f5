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

//! Fixed capacities of the pipeline's per-frame memory.

use serde::{Deserialize, Serialize};

/// Sizes of the pre-reserved per-frame buffers.
///
/// All per-frame memory is fixed at pipeline creation; running out at
/// runtime is a recording bug, not a condition the pipeline grows out of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Capacity in bytes of each frame slot's command stream. Two slots of
    /// this size exist for the double-buffered hand-off.
    pub frame_stream_bytes: usize,
    /// Capacity in bytes of the decoder's staging arena, which holds
    /// deferred update payloads until their dependent draw submits.
    pub decode_arena_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_stream_bytes: 4 * 1024 * 1024,
            decode_arena_bytes: 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_nonzero() {
        let config = PipelineConfig::default();
        assert!(config.frame_stream_bytes > 0);
        assert!(config.decode_arena_bytes > 0);
    }
}
