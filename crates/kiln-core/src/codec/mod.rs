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

//! The bounded binary cursor that every frame serializes through.
//!
//! [`StreamWriter`] appends into a fixed byte buffer with a running offset;
//! [`StreamReader`] mirrors it for consumption. Values are encoded in host
//! byte order: a frame stream crosses a thread boundary, never a process
//! or machine boundary.

mod reader;
mod writer;

pub use reader::StreamReader;
pub use writer::StreamWriter;
