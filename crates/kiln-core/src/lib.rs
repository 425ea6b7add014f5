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

//! # Kiln Core
//!
//! Foundational crate for the kiln rendering pipeline: typed resource
//! handles, the per-frame allocator family, the bounded binary cursor,
//! the command opcode set, render state and resource descriptors, and
//! the [`GraphicsBackend`] contract implemented by concrete backends.

#![warn(missing_docs)]

pub mod backend;
pub mod codec;
pub mod command;
pub mod error;
pub mod flags;
pub mod handle;
pub mod hash;
pub mod memory;
pub mod render;

pub use backend::GraphicsBackend;
pub use command::Opcode;
pub use error::{AllocError, CodecError, ResourceError};
pub use handle::{ClientHandle, ServerHandle};
