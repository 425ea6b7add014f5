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

//! The full per-draw render state bundle.

use super::wire_enum;
use crate::codec::StreamWriter;
use crate::error::CodecError;
use crate::handle::{
    ClientHandle, ResourceKind, ServerHandle, ShaderKind, StorageBufferKind, TextureKind,
    UniformBufferKind,
};
use crate::hash::name_hash;
use crate::kiln_bitflags;
use bytemuck::{Pod, Zeroable};

/// Number of uniform buffer binding slots in a render state.
pub const MAX_UNIFORM_SLOTS: usize = 8;
/// Number of storage buffer binding slots in a render state.
pub const MAX_STORAGE_SLOTS: usize = 8;
/// Number of texture binding slots in a render state.
pub const MAX_TEXTURE_SLOTS: usize = 16;
/// Number of image binding slots in a render state.
pub const MAX_IMAGE_SLOTS: usize = 8;

/// Index of a declared render pass, used by draws for ordering.
///
/// The encoder assigns frame-local indices starting at 0 in declaration
/// order; the decoder rewrites them to the backend's own pass indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PassIndex(pub u32);

/// One named resource binding slot: the FNV-1a hash of the shader-side
/// binding name plus the bound handle. A null handle marks a free slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Binding<H> {
    /// FNV-1a hash of the shader-side binding name.
    pub name_hash: u32,
    /// The bound resource, null when the slot is unused.
    pub handle: H,
}

impl<H> Binding<H> {
    /// Builds a binding from a shader-side name and a handle.
    pub fn new(name: &str, handle: H) -> Self {
        Self {
            name_hash: name_hash(name),
            handle,
        }
    }
}

kiln_bitflags! {
    /// Read/write access of an image binding.
    pub struct ImageAccess: u8 {
        /// The shader reads from the image.
        const READ = 1 << 0;
        /// The shader writes to the image.
        const WRITE = 1 << 1;
    }
}

/// One named image binding slot with its access flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageBinding<H> {
    /// FNV-1a hash of the shader-side binding name.
    pub name_hash: u32,
    /// The bound texture, null when the slot is unused.
    pub texture: H,
    /// How the shader accesses the image.
    pub access: ImageAccess,
}

kiln_bitflags! {
    /// Bit-packed boolean render toggles.
    pub struct RenderFlags: u8 {
        /// Depth writes are enabled.
        const DEPTH_WRITE = 1 << 0;
        /// Color writes are enabled.
        const COLOR_WRITE = 1 << 1;
        /// Alpha blending is enabled.
        const ALPHA_BLEND = 1 << 2;
        /// Rasterize as wireframe.
        const WIREFRAME = 1 << 3;
    }
}

wire_enum! {
    /// Depth comparison function.
    pub enum DepthFunc: "depth function" {
        /// The depth test never passes.
        Never = 0,
        /// Passes when the fragment is nearer.
        Less = 1,
        /// Passes on exact equality.
        Equal = 2,
        /// Passes when nearer or equal.
        LessEqual = 3,
        /// Passes when the fragment is farther.
        Greater = 4,
        /// Passes on inequality.
        NotEqual = 5,
        /// Passes when farther or equal.
        GreaterEqual = 6,
        /// The depth test always passes.
        Always = 7,
    }
}

impl Default for DepthFunc {
    fn default() -> Self {
        DepthFunc::Less
    }
}

wire_enum! {
    /// Fixed-function blend equation.
    pub enum BlendMode: "blend mode" {
        /// Source replaces destination.
        Opaque = 0,
        /// Standard source-over alpha blending.
        Alpha = 1,
        /// Source is added to destination.
        Additive = 2,
        /// Source is multiplied with destination.
        Multiply = 3,
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        BlendMode::Opaque
    }
}

wire_enum! {
    /// Triangle face culling.
    pub enum CullMode: "cull mode" {
        /// No culling.
        None = 0,
        /// Cull front faces.
        Front = 1,
        /// Cull back faces.
        Back = 2,
    }
}

impl Default for CullMode {
    fn default() -> Self {
        CullMode::Back
    }
}

/// Rasterizer viewport rectangle in pixels.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Viewport {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

/// Finds the first free slot and stores the binding there. Running out of
/// slots is a recording defect and asserts in debug builds.
fn push_binding<K: ResourceKind>(
    slots: &mut [Binding<ClientHandle<K>>],
    name: &str,
    handle: ClientHandle<K>,
) {
    for slot in slots.iter_mut() {
        if slot.handle.is_null() {
            *slot = Binding::new(name, handle);
            return;
        }
    }
    debug_assert!(false, "no free {} binding slot for '{name}'", K::NAME);
}

/// The complete state of one draw or dispatch, recorded with client-space
/// handles.
///
/// Binding arrays are fixed-count; unused slots hold null handles and pass
/// through remapping unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    /// The render pass this draw is ordered under.
    pub pass: PassIndex,
    /// The shader program.
    pub shader: ClientHandle<ShaderKind>,
    /// Uniform buffer bindings.
    pub uniform_buffers: [Binding<ClientHandle<UniformBufferKind>>; MAX_UNIFORM_SLOTS],
    /// Storage buffer bindings.
    pub storage_buffers: [Binding<ClientHandle<StorageBufferKind>>; MAX_STORAGE_SLOTS],
    /// Sampled texture bindings.
    pub textures: [Binding<ClientHandle<TextureKind>>; MAX_TEXTURE_SLOTS],
    /// Image bindings with access flags.
    pub images: [ImageBinding<ClientHandle<TextureKind>>; MAX_IMAGE_SLOTS],
    /// Viewport rectangle.
    pub viewport: Viewport,
    /// Depth comparison function.
    pub depth_func: DepthFunc,
    /// Blend equation.
    pub blend_mode: BlendMode,
    /// Face culling mode.
    pub cull_mode: CullMode,
    /// Bit-packed boolean toggles.
    pub flags: RenderFlags,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            pass: PassIndex(0),
            shader: ClientHandle::NULL,
            uniform_buffers: [Binding::default(); MAX_UNIFORM_SLOTS],
            storage_buffers: [Binding::default(); MAX_STORAGE_SLOTS],
            textures: [Binding::default(); MAX_TEXTURE_SLOTS],
            images: [ImageBinding::default(); MAX_IMAGE_SLOTS],
            viewport: Viewport::default(),
            depth_func: DepthFunc::default(),
            blend_mode: BlendMode::default(),
            cull_mode: CullMode::default(),
            flags: RenderFlags::DEPTH_WRITE | RenderFlags::COLOR_WRITE,
        }
    }
}

impl RenderState {
    /// A default state drawing under `pass` with `shader`.
    pub fn for_pass(pass: PassIndex, shader: ClientHandle<ShaderKind>) -> Self {
        Self {
            pass,
            shader,
            ..Self::default()
        }
    }

    /// Binds a uniform buffer to the first free slot.
    pub fn bind_uniform_buffer(
        &mut self,
        name: &str,
        buffer: ClientHandle<UniformBufferKind>,
    ) -> &mut Self {
        push_binding(&mut self.uniform_buffers, name, buffer);
        self
    }

    /// Binds a storage buffer to the first free slot.
    pub fn bind_storage_buffer(
        &mut self,
        name: &str,
        buffer: ClientHandle<StorageBufferKind>,
    ) -> &mut Self {
        push_binding(&mut self.storage_buffers, name, buffer);
        self
    }

    /// Binds a sampled texture to the first free slot.
    pub fn bind_texture(&mut self, name: &str, texture: ClientHandle<TextureKind>) -> &mut Self {
        push_binding(&mut self.textures, name, texture);
        self
    }

    /// Binds an image with the given access flags to the first free slot.
    pub fn bind_image(
        &mut self,
        name: &str,
        texture: ClientHandle<TextureKind>,
        access: ImageAccess,
    ) -> &mut Self {
        for slot in self.images.iter_mut() {
            if slot.texture.is_null() {
                *slot = ImageBinding {
                    name_hash: name_hash(name),
                    texture,
                    access,
                };
                return self;
            }
        }
        debug_assert!(false, "no free image binding slot for '{name}'");
        self
    }

    /// Serializes the state into the command stream.
    ///
    /// The decoder owns the mirror-image read because it remaps every
    /// embedded handle as it goes.
    pub fn encode(&self, writer: &mut StreamWriter<'_>) -> Result<(), CodecError> {
        writer.write_u32(self.pass.0)?;
        writer.write_pod(&self.shader)?;
        for binding in &self.uniform_buffers {
            writer.write_u32(binding.name_hash)?;
            writer.write_pod(&binding.handle)?;
        }
        for binding in &self.storage_buffers {
            writer.write_u32(binding.name_hash)?;
            writer.write_pod(&binding.handle)?;
        }
        for binding in &self.textures {
            writer.write_u32(binding.name_hash)?;
            writer.write_pod(&binding.handle)?;
        }
        for image in &self.images {
            writer.write_u32(image.name_hash)?;
            writer.write_pod(&image.texture)?;
            writer.write_u8(image.access.bits())?;
        }
        writer.write_pod(&self.viewport)?;
        writer.write_u8(self.depth_func.as_u8())?;
        writer.write_u8(self.blend_mode.as_u8())?;
        writer.write_u8(self.cull_mode.as_u8())?;
        writer.write_u8(self.flags.bits())?;
        Ok(())
    }
}

/// A [`RenderState`] after the decoder remapped every handle into server
/// space and rewrote the pass index to the backend's.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRenderState {
    /// The backend's pass index this draw is ordered under.
    pub pass: PassIndex,
    /// The shader program.
    pub shader: ServerHandle<ShaderKind>,
    /// Uniform buffer bindings.
    pub uniform_buffers: [Binding<ServerHandle<UniformBufferKind>>; MAX_UNIFORM_SLOTS],
    /// Storage buffer bindings.
    pub storage_buffers: [Binding<ServerHandle<StorageBufferKind>>; MAX_STORAGE_SLOTS],
    /// Sampled texture bindings.
    pub textures: [Binding<ServerHandle<TextureKind>>; MAX_TEXTURE_SLOTS],
    /// Image bindings with access flags.
    pub images: [ImageBinding<ServerHandle<TextureKind>>; MAX_IMAGE_SLOTS],
    /// Viewport rectangle.
    pub viewport: Viewport,
    /// Depth comparison function.
    pub depth_func: DepthFunc,
    /// Blend equation.
    pub blend_mode: BlendMode,
    /// Face culling mode.
    pub cull_mode: CullMode,
    /// Bit-packed boolean toggles.
    pub flags: RenderFlags,
}

impl Default for ResolvedRenderState {
    fn default() -> Self {
        Self {
            pass: PassIndex(0),
            shader: ServerHandle::NULL,
            uniform_buffers: [Binding::default(); MAX_UNIFORM_SLOTS],
            storage_buffers: [Binding::default(); MAX_STORAGE_SLOTS],
            textures: [Binding::default(); MAX_TEXTURE_SLOTS],
            images: [ImageBinding::default(); MAX_IMAGE_SLOTS],
            viewport: Viewport::default(),
            depth_func: DepthFunc::default(),
            blend_mode: BlendMode::default(),
            cull_mode: CullMode::default(),
            flags: RenderFlags::DEPTH_WRITE | RenderFlags::COLOR_WRITE,
        }
    }
}
