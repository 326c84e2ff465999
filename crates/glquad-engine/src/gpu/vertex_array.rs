use std::rc::Rc;

use anyhow::Result;

use crate::device::GlApi;

/// A float vertex attribute sourced from the bound array buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    /// Attribute slot (`layout(location = N)`).
    pub index: u32,
    /// Number of `f32` components, 1..=4.
    pub components: i32,
    /// Bytes between consecutive vertices.
    pub stride: i32,
    /// Byte offset of the first component.
    pub offset: i32,
}

impl VertexAttribute {
    /// A tightly packed `vecN` attribute occupying the whole vertex.
    pub const fn packed_f32(index: u32, components: i32) -> Self {
        Self {
            index,
            components,
            stride: components * size_of::<f32>() as i32,
            offset: 0,
        }
    }
}

/// Owns one vertex array object.
///
/// The vertex array records attribute layout and the element buffer binding,
/// so it must be bound while those are configured.
pub struct VertexArray<G: GlApi> {
    gl: Rc<G>,
    handle: G::VertexArray,
}

impl<G: GlApi> VertexArray<G> {
    pub fn new(gl: &Rc<G>) -> Result<Self> {
        let handle = gl
            .create_vertex_array()
            .map_err(|e| anyhow::anyhow!("failed to create vertex array: {e}"))?;

        Ok(Self {
            gl: Rc::clone(gl),
            handle,
        })
    }

    #[inline]
    pub fn bind(&self) {
        self.gl.bind_vertex_array(Some(self.handle));
    }

    #[inline]
    pub fn unbind(&self) {
        self.gl.bind_vertex_array(None);
    }

    #[inline]
    pub fn handle(&self) -> G::VertexArray {
        self.handle
    }

    /// Binds this vertex array, then enables `attr` and points it at the
    /// currently bound array buffer.
    pub fn enable_attribute(&self, attr: VertexAttribute) {
        self.bind();
        self.gl.enable_vertex_attrib_array(attr.index);
        self.gl
            .vertex_attrib_pointer_f32(attr.index, attr.components, attr.stride, attr.offset);
    }
}

impl<G: GlApi> Drop for VertexArray<G> {
    fn drop(&mut self) {
        self.gl.delete_vertex_array(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{AttribState, HeadlessGl};
    use crate::gpu::VertexBuffer;

    #[test]
    fn packed_vec2_has_eight_byte_stride() {
        let attr = VertexAttribute::packed_f32(0, 2);
        assert_eq!(attr.stride, 8);
        assert_eq!(attr.offset, 0);
    }

    #[test]
    fn attribute_points_at_bound_array_buffer() {
        let gl = Rc::new(HeadlessGl::new());
        let vao = VertexArray::new(&gl).unwrap();
        let vb = VertexBuffer::new(&gl, &[0.0f32, 0.0, 1.0, 0.0, 1.0, 1.0]).unwrap();

        vb.bind();
        vao.enable_attribute(VertexAttribute::packed_f32(0, 2));

        assert_eq!(
            gl.attribute(0),
            Some(AttribState {
                enabled: true,
                size: 2,
                stride: 8,
                offset: 0,
                buffer: Some(vb.handle()),
            })
        );
        assert!(!gl.has_pending_error());
    }

    #[test]
    fn attribute_setup_without_vertex_array_is_an_error() {
        let gl = Rc::new(HeadlessGl::new());
        gl.enable_vertex_attrib_array(0);
        assert_eq!(gl.get_error(), glow::INVALID_OPERATION);
    }

    #[test]
    fn drop_deletes_and_unbinds() {
        let gl = Rc::new(HeadlessGl::new());
        let vao = VertexArray::new(&gl).unwrap();
        vao.bind();
        drop(vao);

        assert_eq!(gl.live_vertex_arrays(), 0);
        assert_eq!(gl.bound_vertex_array(), None);
    }
}
