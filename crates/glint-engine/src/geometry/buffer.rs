use crate::device::{AttributeSlot, Backend, BufferId, BufferKind, GraphicsContext};
use crate::error::{RenderError, Result};

/// Checks that `len` values split into a positive, whole number of items.
///
/// Returns the item count. Zero-sized items, empty data and a remainder all
/// fail with `InvalidLayout`; nothing is ever truncated.
pub fn validate_layout(len: usize, item_size: u32) -> Result<u32> {
    let invalid = || RenderError::InvalidLayout { len, item_size };

    if item_size == 0 || len == 0 || len % item_size as usize != 0 {
        return Err(invalid());
    }
    u32::try_from(len / item_size as usize).map_err(|_| invalid())
}

/// Immutable `f32` vertex data resident in GPU memory.
///
/// `item_size` is the number of components per vertex, `item_count` the
/// number of vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryBuffer {
    id: BufferId,
    item_size: u32,
    item_count: u32,
}

impl GeometryBuffer {
    /// Uploads `data` as static vertex data, `item_size` floats per vertex.
    pub fn upload<B: Backend>(ctx: &mut GraphicsContext<B>, data: &[f32], item_size: u32) -> Result<Self> {
        let item_count = validate_layout(data.len(), item_size)?;
        let id = ctx.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(data));

        log::debug!("vertex buffer {id:?}: {item_count} items x {item_size} components");

        Ok(Self {
            id,
            item_size,
            item_count,
        })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn item_size(&self) -> u32 {
        self.item_size
    }

    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    /// Makes this buffer the source of `slot` for the next draw.
    ///
    /// Binding is global to the context: binding another buffer to the same
    /// slot replaces this one.
    pub fn bind<B: Backend>(&self, ctx: &mut GraphicsContext<B>, slot: AttributeSlot) {
        ctx.bind_attribute(slot, self.id, self.item_size);
    }

    pub fn destroy<B: Backend>(self, ctx: &mut GraphicsContext<B>) {
        ctx.destroy_buffer(self.id);
    }
}

/// Immutable `u16` element indices resident in GPU memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBuffer {
    id: BufferId,
    count: u32,
}

impl IndexBuffer {
    /// Uploads `indices` as a static element buffer (one index per item).
    pub fn upload<B: Backend>(ctx: &mut GraphicsContext<B>, indices: &[u16]) -> Result<Self> {
        let count = validate_layout(indices.len(), 1)?;

        // Buffer copies must be 4-byte aligned; pad odd index counts.
        let id = if indices.len() % 2 == 0 {
            ctx.create_buffer(BufferKind::Index, bytemuck::cast_slice(indices))
        } else {
            let mut padded = indices.to_vec();
            padded.push(0);
            ctx.create_buffer(BufferKind::Index, bytemuck::cast_slice(&padded))
        };

        log::debug!("index buffer {id:?}: {count} indices");

        Ok(Self { id, count })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn item_size(&self) -> u32 {
        1
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Makes this buffer the element source of the next indexed draw.
    pub fn bind<B: Backend>(&self, ctx: &mut GraphicsContext<B>) {
        ctx.bind_index_buffer(self.id);
    }

    pub fn destroy<B: Backend>(self, ctx: &mut GraphicsContext<B>) {
        ctx.destroy_buffer(self.id);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::backend::headless::{HeadlessBackend, HeadlessSurface, RecordedCommand};
    use crate::device::ContextConfig;

    fn ctx() -> GraphicsContext<HeadlessBackend> {
        GraphicsContext::acquire(HeadlessSurface::new(), ContextConfig::default()).unwrap()
    }

    #[test]
    fn triangle_positions_have_three_items() {
        let mut ctx = ctx();
        let data = [0.0, 1.0, 0.0, -1.0, -1.0, 0.0, 1.0, -1.0, 0.0];
        let buffer = GeometryBuffer::upload(&mut ctx, &data, 3).unwrap();

        assert_eq!(buffer.item_size(), 3);
        assert_eq!(buffer.item_count(), 3);
        assert_eq!(ctx.backend().buffer_len(buffer.id()), Some(data.len() * 4));
    }

    // Four-component colors read as two-component items used to truncate silently.
    #[test]
    fn color_data_with_wrong_item_size_is_rejected() {
        let mut ctx = ctx();
        let colors = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0];

        let err = GeometryBuffer::upload(&mut ctx, &colors[..10], 4).err().unwrap();
        assert_eq!(err, RenderError::InvalidLayout { len: 10, item_size: 4 });
        assert_eq!(ctx.backend().buffer_count(), 0);
    }

    #[test]
    fn zero_item_size_and_empty_data_are_rejected() {
        assert!(validate_layout(3, 0).is_err());
        assert!(validate_layout(0, 3).is_err());
    }

    #[test]
    fn odd_index_count_is_padded_but_count_is_exact() {
        let mut ctx = ctx();
        let indices = IndexBuffer::upload(&mut ctx, &[0, 1, 2]).unwrap();

        assert_eq!(indices.count(), 3);
        assert_eq!(indices.item_size(), 1);
        assert_eq!(ctx.backend().buffer_len(indices.id()), Some(8));
    }

    #[test]
    fn bind_records_slot_and_components() {
        let mut ctx = ctx();
        let buffer = GeometryBuffer::upload(&mut ctx, &[0.0; 8], 4).unwrap();
        buffer.bind(&mut ctx, AttributeSlot(1));

        assert!(ctx.backend().commands().contains(&RecordedCommand::BindAttribute {
            slot: AttributeSlot(1),
            buffer: buffer.id(),
            components: 4,
        }));
    }

    #[test]
    fn destroy_releases_buffer() {
        let mut ctx = ctx();
        let buffer = GeometryBuffer::upload(&mut ctx, &[0.0; 3], 3).unwrap();
        buffer.destroy(&mut ctx);
        assert_eq!(ctx.backend().buffer_count(), 0);
    }

    proptest! {
        #[test]
        fn whole_layouts_upload_with_exact_count(item_size in 1u32..8, items in 1usize..64) {
            let mut ctx = ctx();
            let data = vec![0.5f32; item_size as usize * items];

            let buffer = GeometryBuffer::upload(&mut ctx, &data, item_size).unwrap();
            prop_assert_eq!(buffer.item_count() as usize, items);
            prop_assert_eq!(buffer.item_count() as usize * item_size as usize, data.len());
        }

        #[test]
        fn partial_layouts_fail(item_size in 2u32..8, items in 0usize..64, extra in 1u32..8) {
            let extra = (extra % item_size).max(1) as usize;
            let len = item_size as usize * items + extra;

            let mut ctx = ctx();
            let data = vec![0.0f32; len];
            let err = GeometryBuffer::upload(&mut ctx, &data, item_size).err().unwrap();
            prop_assert_eq!(err, RenderError::InvalidLayout { len, item_size });
        }
    }
}
