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

//! Descriptors for the resources a frame can create.

use super::wire_enum;
use crate::codec::StreamWriter;
use crate::error::CodecError;
use crate::handle::{
    ClientHandle, FramebufferKind, IndexBufferKind, ServerHandle, TextureKind, VertexBufferKind,
};
use crate::kiln_bitflags;
use std::borrow::Cow;

/// Maximum number of vertex attributes in an interlaced layout.
pub const MAX_VERTEX_ATTRIBUTES: usize = 8;
/// Maximum number of color attachments on a framebuffer.
pub const MAX_COLOR_ATTACHMENTS: usize = 4;

wire_enum! {
    /// Width of the indices in an index buffer.
    pub enum IndexFormat: "index format" {
        /// 16-bit indices.
        U16 = 0,
        /// 32-bit indices.
        U32 = 1,
    }
}

impl Default for IndexFormat {
    fn default() -> Self {
        IndexFormat::U32
    }
}

wire_enum! {
    /// How vertices assemble into primitives.
    pub enum PrimitiveTopology: "primitive topology" {
        /// Isolated points.
        Points = 0,
        /// Isolated line segments.
        Lines = 1,
        /// A connected line strip.
        LineStrip = 2,
        /// Isolated triangles.
        Triangles = 3,
        /// A connected triangle strip.
        TriangleStrip = 4,
    }
}

impl Default for PrimitiveTopology {
    fn default() -> Self {
        PrimitiveTopology::Triangles
    }
}

wire_enum! {
    /// Component layout of one vertex attribute.
    pub enum VertexFormat: "vertex format" {
        /// One 32-bit float.
        Float32 = 0,
        /// Two 32-bit floats.
        Float32x2 = 1,
        /// Three 32-bit floats.
        Float32x3 = 2,
        /// Four 32-bit floats.
        Float32x4 = 3,
        /// One unsigned 32-bit integer.
        U32 = 4,
        /// Four normalized unsigned bytes.
        U8x4Norm = 5,
    }
}

wire_enum! {
    /// Pixel format of a texture.
    pub enum TextureFormat: "texture format" {
        /// 8-bit RGBA, linear.
        Rgba8Unorm = 0,
        /// 8-bit RGBA, sRGB encoded.
        Rgba8Srgb = 1,
        /// 16-bit float RGBA.
        Rgba16Float = 2,
        /// 32-bit float RGBA.
        Rgba32Float = 3,
        /// Single-channel 32-bit float.
        R32Float = 4,
        /// 32-bit float depth.
        Depth32Float = 5,
        /// 24-bit depth with 8-bit stencil.
        Depth24Stencil8 = 6,
    }
}

wire_enum! {
    /// Texture sampling filter.
    pub enum FilterMode: "filter mode" {
        /// Nearest-neighbour sampling.
        Nearest = 0,
        /// Linear interpolation.
        Linear = 1,
    }
}

impl Default for FilterMode {
    fn default() -> Self {
        FilterMode::Linear
    }
}

wire_enum! {
    /// Texture coordinate wrapping.
    pub enum WrapMode: "wrap mode" {
        /// Clamp to the edge texel.
        Clamp = 0,
        /// Repeat the texture.
        Repeat = 1,
        /// Repeat with mirroring.
        MirrorRepeat = 2,
    }
}

impl Default for WrapMode {
    fn default() -> Self {
        WrapMode::Repeat
    }
}

/// One attribute of an interlaced vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader attribute location.
    pub location: u32,
    /// Component layout.
    pub format: VertexFormat,
    /// Byte offset within one vertex.
    pub offset: u32,
}

/// How a mesh's vertex data is laid out across buffers.
///
/// A tagged choice, so the decoder always knows exactly which shape it is
/// rebuilding.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexLayout<'a> {
    /// All attributes interlaced in one buffer with a fixed stride.
    Interlaced {
        /// The buffer holding the interlaced data.
        buffer: ClientHandle<VertexBufferKind>,
        /// Bytes from one vertex to the next.
        stride: u32,
        /// Attribute descriptions, at most [`MAX_VERTEX_ATTRIBUTES`].
        attributes: &'a [VertexAttribute],
    },
    /// One tightly packed buffer per attribute stream. Unused streams are
    /// null.
    Separate {
        /// Vertex positions.
        positions: ClientHandle<VertexBufferKind>,
        /// Vertex normals.
        normals: ClientHandle<VertexBufferKind>,
        /// Vertex tangents.
        tangents: ClientHandle<VertexBufferKind>,
        /// Texture coordinates.
        uvs: ClientHandle<VertexBufferKind>,
        /// Vertex colors.
        colors: ClientHandle<VertexBufferKind>,
    },
}

const LAYOUT_TAG_INTERLACED: u8 = 0;
const LAYOUT_TAG_SEPARATE: u8 = 1;

/// Describes a mesh to create, in client handle space.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDescriptor<'a> {
    /// An optional debug label for the mesh.
    pub label: Option<Cow<'a, str>>,
    /// Vertex data layout.
    pub layout: VertexLayout<'a>,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Index buffer, or null for non-indexed drawing.
    pub index_buffer: ClientHandle<IndexBufferKind>,
    /// Width of the indices.
    pub index_format: IndexFormat,
    /// Number of indices, 0 for non-indexed drawing.
    pub index_count: u32,
    /// Primitive assembly.
    pub topology: PrimitiveTopology,
}

/// A [`MeshDescriptor`] after handle remapping, in server handle space.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMeshDescriptor {
    /// An optional debug label for the mesh.
    pub label: Option<String>,
    /// Vertex data layout.
    pub layout: ResolvedVertexLayout,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Index buffer, or null for non-indexed drawing.
    pub index_buffer: ServerHandle<IndexBufferKind>,
    /// Width of the indices.
    pub index_format: IndexFormat,
    /// Number of indices, 0 for non-indexed drawing.
    pub index_count: u32,
    /// Primitive assembly.
    pub topology: PrimitiveTopology,
}

/// Server-space form of [`VertexLayout`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedVertexLayout {
    /// All attributes interlaced in one buffer with a fixed stride.
    Interlaced {
        /// The buffer holding the interlaced data.
        buffer: ServerHandle<VertexBufferKind>,
        /// Bytes from one vertex to the next.
        stride: u32,
        /// Attribute descriptions.
        attributes: Vec<VertexAttribute>,
    },
    /// One tightly packed buffer per attribute stream.
    Separate {
        /// Vertex positions.
        positions: ServerHandle<VertexBufferKind>,
        /// Vertex normals.
        normals: ServerHandle<VertexBufferKind>,
        /// Vertex tangents.
        tangents: ServerHandle<VertexBufferKind>,
        /// Texture coordinates.
        uvs: ServerHandle<VertexBufferKind>,
        /// Vertex colors.
        colors: ServerHandle<VertexBufferKind>,
    },
}

/// Describes a texture to create. Shared by the 2D, 3D and cubemap create
/// commands; the opcode selects the class, and `depth` is 1 for 2D
/// textures and the slice count for 3D textures.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label for the texture.
    pub label: Option<Cow<'a, str>>,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth in texels (1 for 2D and cubemaps).
    pub depth: u32,
    /// Pixel format.
    pub format: TextureFormat,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Coordinate wrapping.
    pub wrap: WrapMode,
}

impl TextureDescriptor<'_> {
    /// A 2D descriptor with default filtering and wrapping.
    pub fn two_dimensional(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: None,
            width,
            height,
            depth: 1,
            format,
            min_filter: FilterMode::default(),
            mag_filter: FilterMode::default(),
            wrap: WrapMode::default(),
        }
    }
}

/// Describes a framebuffer to create, in client handle space. Unused
/// attachment slots are null.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FramebufferDescriptor<'a> {
    /// An optional debug label for the framebuffer.
    pub label: Option<Cow<'a, str>>,
    /// Color attachment textures.
    pub color_attachments: [ClientHandle<TextureKind>; MAX_COLOR_ATTACHMENTS],
    /// Depth attachment texture, or null.
    pub depth_attachment: ClientHandle<TextureKind>,
}

/// A [`FramebufferDescriptor`] after handle remapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedFramebufferDescriptor {
    /// An optional debug label for the framebuffer.
    pub label: Option<String>,
    /// Color attachment textures.
    pub color_attachments: [ServerHandle<TextureKind>; MAX_COLOR_ATTACHMENTS],
    /// Depth attachment texture, or null.
    pub depth_attachment: ServerHandle<TextureKind>,
}

kiln_bitflags! {
    /// Which attachments a render pass clears on entry.
    pub struct ClearFlags: u8 {
        /// Clear the color attachments.
        const COLOR = 1 << 0;
        /// Clear the depth attachment.
        const DEPTH = 1 << 1;
        /// Clear the stencil attachment.
        const STENCIL = 1 << 2;
    }
}

/// Declares a render pass, in client handle space.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDescriptor<'a> {
    /// Debug name of the pass.
    pub name: Cow<'a, str>,
    /// Target framebuffer, or null for the backbuffer.
    pub target: ClientHandle<FramebufferKind>,
    /// Which attachments to clear on entry.
    pub clear: ClearFlags,
    /// Clear color, used when [`ClearFlags::COLOR`] is set.
    pub clear_color: [f32; 4],
    /// Clear depth, used when [`ClearFlags::DEPTH`] is set.
    pub clear_depth: f32,
    /// Clear stencil, used when [`ClearFlags::STENCIL`] is set.
    pub clear_stencil: u32,
}

impl<'a> RenderPassDescriptor<'a> {
    /// A backbuffer pass clearing color and depth to the given color.
    pub fn clearing(name: &'a str, clear_color: [f32; 4]) -> Self {
        Self {
            name: Cow::Borrowed(name),
            target: ClientHandle::NULL,
            clear: ClearFlags::COLOR | ClearFlags::DEPTH,
            clear_color,
            clear_depth: 1.0,
            clear_stencil: 0,
        }
    }
}

/// A [`RenderPassDescriptor`] after handle remapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRenderPassDescriptor {
    /// Debug name of the pass.
    pub name: String,
    /// Target framebuffer, or null for the backbuffer.
    pub target: ServerHandle<FramebufferKind>,
    /// Which attachments to clear on entry.
    pub clear: ClearFlags,
    /// Clear color, used when [`ClearFlags::COLOR`] is set.
    pub clear_color: [f32; 4],
    /// Clear depth, used when [`ClearFlags::DEPTH`] is set.
    pub clear_depth: f32,
    /// Clear stencil, used when [`ClearFlags::STENCIL`] is set.
    pub clear_stencil: u32,
}

/// Source text for the stages of a shader program. Absent stages are
/// `None`; a compute shader carries only `compute_source`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderDescriptor<'a> {
    /// A debug label for the shader.
    pub label: Cow<'a, str>,
    /// Vertex stage source text.
    pub vertex_source: Option<Cow<'a, str>>,
    /// Fragment stage source text.
    pub fragment_source: Option<Cow<'a, str>>,
    /// Compute stage source text.
    pub compute_source: Option<Cow<'a, str>>,
}

fn write_opt_str(writer: &mut StreamWriter<'_>, value: Option<&str>) -> Result<(), CodecError> {
    match value {
        Some(text) => {
            writer.write_u8(1)?;
            writer.write_str(text)
        }
        None => writer.write_u8(0),
    }
}

impl MeshDescriptor<'_> {
    /// Serializes the descriptor into the command stream.
    pub fn encode(&self, writer: &mut StreamWriter<'_>) -> Result<(), CodecError> {
        write_opt_str(writer, self.label.as_deref())?;
        match &self.layout {
            VertexLayout::Interlaced {
                buffer,
                stride,
                attributes,
            } => {
                if attributes.len() > MAX_VERTEX_ATTRIBUTES {
                    return Err(CodecError::InvalidValue {
                        what: "vertex attribute count",
                        value: attributes.len() as u32,
                    });
                }
                writer.write_u8(LAYOUT_TAG_INTERLACED)?;
                writer.write_pod(buffer)?;
                writer.write_u32(*stride)?;
                writer.write_u32(attributes.len() as u32)?;
                for attribute in *attributes {
                    writer.write_u32(attribute.location)?;
                    writer.write_u8(attribute.format.as_u8())?;
                    writer.write_u32(attribute.offset)?;
                }
            }
            VertexLayout::Separate {
                positions,
                normals,
                tangents,
                uvs,
                colors,
            } => {
                writer.write_u8(LAYOUT_TAG_SEPARATE)?;
                writer.write_pod(positions)?;
                writer.write_pod(normals)?;
                writer.write_pod(tangents)?;
                writer.write_pod(uvs)?;
                writer.write_pod(colors)?;
            }
        }
        writer.write_u32(self.vertex_count)?;
        writer.write_pod(&self.index_buffer)?;
        writer.write_u8(self.index_format.as_u8())?;
        writer.write_u32(self.index_count)?;
        writer.write_u8(self.topology.as_u8())
    }

    /// Wire tag of the interlaced layout.
    pub const INTERLACED_TAG: u8 = LAYOUT_TAG_INTERLACED;
    /// Wire tag of the separate layout.
    pub const SEPARATE_TAG: u8 = LAYOUT_TAG_SEPARATE;
}

impl TextureDescriptor<'_> {
    /// Serializes the descriptor into the command stream.
    pub fn encode(&self, writer: &mut StreamWriter<'_>) -> Result<(), CodecError> {
        write_opt_str(writer, self.label.as_deref())?;
        writer.write_u32(self.width)?;
        writer.write_u32(self.height)?;
        writer.write_u32(self.depth)?;
        writer.write_u8(self.format.as_u8())?;
        writer.write_u8(self.min_filter.as_u8())?;
        writer.write_u8(self.mag_filter.as_u8())?;
        writer.write_u8(self.wrap.as_u8())
    }
}

impl FramebufferDescriptor<'_> {
    /// Serializes the descriptor into the command stream.
    pub fn encode(&self, writer: &mut StreamWriter<'_>) -> Result<(), CodecError> {
        write_opt_str(writer, self.label.as_deref())?;
        for attachment in &self.color_attachments {
            writer.write_pod(attachment)?;
        }
        writer.write_pod(&self.depth_attachment)
    }
}

impl RenderPassDescriptor<'_> {
    /// Serializes the descriptor into the command stream.
    pub fn encode(&self, writer: &mut StreamWriter<'_>) -> Result<(), CodecError> {
        writer.write_str(&self.name)?;
        writer.write_pod(&self.target)?;
        writer.write_u8(self.clear.bits())?;
        for channel in &self.clear_color {
            writer.write_f32(*channel)?;
        }
        writer.write_f32(self.clear_depth)?;
        writer.write_u32(self.clear_stencil)
    }
}

impl ShaderDescriptor<'_> {
    /// Serializes the descriptor into the command stream.
    pub fn encode(&self, writer: &mut StreamWriter<'_>) -> Result<(), CodecError> {
        writer.write_str(&self.label)?;
        write_opt_str(writer, self.vertex_source.as_deref())?;
        write_opt_str(writer, self.fragment_source.as_deref())?;
        write_opt_str(writer, self.compute_source.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_enums_round_trip() {
        assert_eq!(IndexFormat::try_from(0).unwrap(), IndexFormat::U16);
        assert_eq!(
            TextureFormat::try_from(TextureFormat::Depth32Float.as_u8()).unwrap(),
            TextureFormat::Depth32Float
        );
        assert!(matches!(
            TextureFormat::try_from(99).unwrap_err(),
            crate::error::CodecError::InvalidValue {
                what: "texture format",
                value: 99,
            }
        ));
    }

    #[test]
    fn too_many_attributes_is_an_encode_error() {
        let attributes = [VertexAttribute {
            location: 0,
            format: VertexFormat::Float32x3,
            offset: 0,
        }; MAX_VERTEX_ATTRIBUTES + 1];
        let descriptor = MeshDescriptor {
            label: None,
            layout: VertexLayout::Interlaced {
                buffer: ClientHandle::from_raw(1),
                stride: 12,
                attributes: &attributes,
            },
            vertex_count: 3,
            index_buffer: ClientHandle::NULL,
            index_format: IndexFormat::U32,
            index_count: 0,
            topology: PrimitiveTopology::Triangles,
        };

        let mut buf = [0u8; 256];
        let mut writer = StreamWriter::new(&mut buf);
        assert!(descriptor.encode(&mut writer).is_err());
    }

    #[test]
    fn clearing_pass_defaults() {
        let pass = RenderPassDescriptor::clearing("main", [0.1, 0.2, 0.3, 1.0]);
        assert!(pass.target.is_null());
        assert!(pass.clear.contains(ClearFlags::COLOR | ClearFlags::DEPTH));
        assert!(!pass.clear.contains(ClearFlags::STENCIL));
        assert_eq!(pass.clear_depth, 1.0);
    }
}
