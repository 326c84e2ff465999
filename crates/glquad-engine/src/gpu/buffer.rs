use std::marker::PhantomData;
use std::rc::Rc;

use anyhow::Result;
use bytemuck::Pod;

use crate::device::{BufferTarget, GlApi, IndexType};

/// Binding point a [`GpuBuffer`] is created for.
pub trait BufferKind {
    const TARGET: BufferTarget;
}

/// Vertex data (`GL_ARRAY_BUFFER`).
#[derive(Debug)]
pub enum Vertices {}

/// Index data (`GL_ELEMENT_ARRAY_BUFFER`).
#[derive(Debug)]
pub enum Indices {}

impl BufferKind for Vertices {
    const TARGET: BufferTarget = BufferTarget::Array;
}

impl BufferKind for Indices {
    const TARGET: BufferTarget = BufferTarget::ElementArray;
}

pub type VertexBuffer<G> = GpuBuffer<G, Vertices>;
pub type IndexBuffer<G> = GpuBuffer<G, Indices>;

/// A GPU buffer with a fixed payload, uploaded once at construction.
///
/// The element count always fits in an `i32`. Owns exactly one buffer handle and deletes it on drop. The buffer is left
/// unbound after construction. Not `Clone`: ownership moves, handles don't get
/// duplicated.
pub struct GpuBuffer<G: GlApi, K: BufferKind> {
    gl: Rc<G>,
    handle: G::Buffer,
    byte_len: usize,
    len: usize,
    _kind: PhantomData<K>,
}

impl<G: GlApi, K: BufferKind> GpuBuffer<G, K> {
    fn upload<T: Pod>(gl: &Rc<G>, data: &[T]) -> Result<Self> {
        // Draw counts are GLsizei.
        if i32::try_from(data.len()).is_err() {
            anyhow::bail!(
                "{} elements do not fit a GL draw count ({:?} buffer)",
                data.len(),
                K::TARGET
            );
        }

        let bytes: &[u8] = bytemuck::cast_slice(data);

        let handle = gl
            .create_buffer()
            .map_err(|e| anyhow::anyhow!("failed to create {:?} buffer: {e}", K::TARGET))?;

        gl.bind_buffer(K::TARGET, Some(handle));
        gl.buffer_data(K::TARGET, bytes);
        gl.bind_buffer(K::TARGET, None);

        log::debug!(
            "uploaded {} bytes to {:?} buffer {:?}",
            bytes.len(),
            K::TARGET,
            handle
        );

        Ok(Self {
            gl: Rc::clone(gl),
            handle,
            byte_len: bytes.len(),
            len: data.len(),
            _kind: PhantomData,
        })
    }

    /// Makes this buffer the active one for its target.
    #[inline]
    pub fn bind(&self) {
        self.gl.bind_buffer(K::TARGET, Some(self.handle));
    }

    /// Clears the binding of this buffer's target.
    #[inline]
    pub fn unbind(&self) {
        self.gl.bind_buffer(K::TARGET, None);
    }

    #[inline]
    pub fn handle(&self) -> G::Buffer {
        self.handle
    }

    #[inline]
    pub fn target(&self) -> BufferTarget {
        K::TARGET
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

impl<G: GlApi> GpuBuffer<G, Vertices> {
    /// Uploads `vertices` into a new vertex buffer.
    pub fn new<T: Pod>(gl: &Rc<G>, vertices: &[T]) -> Result<Self> {
        Self::upload(gl, vertices)
    }

    /// Number of `T` elements uploaded.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<G: GlApi> GpuBuffer<G, Indices> {
    /// Uploads `indices` into a new index buffer.
    pub fn new(gl: &Rc<G>, indices: &[u32]) -> Result<Self> {
        Self::upload(gl, indices)
    }

    /// Number of indices to submit to a draw call.
    #[inline]
    pub fn count(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn index_type(&self) -> IndexType {
        IndexType::U32
    }
}

impl<G: GlApi, K: BufferKind> Drop for GpuBuffer<G, K> {
    fn drop(&mut self) {
        log::trace!("deleting {:?} buffer {:?}", K::TARGET, self.handle);
        self.gl.delete_buffer(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessGl;

    const POSITIONS: [f32; 8] = [-0.5, -0.5, 0.5, -0.5, 0.5, 0.5, -0.5, 0.5];
    const INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

    #[test]
    fn index_buffer_records_count() {
        let gl = Rc::new(HeadlessGl::new());
        let ib = IndexBuffer::new(&gl, &INDICES).unwrap();

        assert_eq!(ib.count(), 6);
        assert_eq!(ib.byte_len(), 24);
        assert_eq!(ib.index_type(), IndexType::U32);
    }

    #[test]
    fn upload_stores_payload_and_leaves_target_unbound() {
        let gl = Rc::new(HeadlessGl::new());
        let vb = VertexBuffer::new(&gl, &POSITIONS).unwrap();

        assert_eq!(gl.buffer_binding(BufferTarget::Array), None);
        assert_eq!(
            gl.buffer_contents(vb.handle()).unwrap(),
            bytemuck::cast_slice::<f32, u8>(&POSITIONS)
        );
        assert_eq!(vb.len(), 8);
        assert!(!gl.has_pending_error());
    }

    #[test]
    fn bind_then_unbind_clears_target() {
        let gl = Rc::new(HeadlessGl::new());
        let vb = VertexBuffer::new(&gl, &POSITIONS).unwrap();

        vb.bind();
        assert_eq!(gl.buffer_binding(BufferTarget::Array), Some(vb.handle()));

        vb.unbind();
        assert_eq!(gl.buffer_binding(BufferTarget::Array), None);
    }

    #[test]
    fn oversized_payload_is_rejected_before_allocation() {
        let gl = Rc::new(HeadlessGl::new());
        // Zero-sized elements: the length is real, the allocation is not.
        let oversized = vec![(); i32::MAX as usize + 1];

        assert!(VertexBuffer::new(&gl, &oversized).is_err());
        assert_eq!(gl.live_buffers(), 0);
    }

    #[test]
    fn drop_releases_handle_exactly_once() {
        let gl = Rc::new(HeadlessGl::new());
        let vb = VertexBuffer::new(&gl, &POSITIONS).unwrap();
        let ib = IndexBuffer::new(&gl, &INDICES).unwrap();
        let handles = [vb.handle(), ib.handle()];
        assert_eq!(gl.live_buffers(), 2);

        // Moving ownership must not release anything.
        let moved = vb;
        assert_eq!(gl.live_buffers(), 2);

        drop(moved);
        drop(ib);

        assert_eq!(gl.live_buffers(), 0);
        assert_eq!(gl.deleted_buffers(), handles);
    }
}
