use bytemuck::{Pod, Zeroable};

/// Which kind of stage entity an instance draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DrawKind {
    /// An emoji particle (flying or in the pile).
    Emoji = 0,
    /// A landing spark.
    Spark = 1,
}

impl DrawKind {
    pub fn as_f32(self) -> f32 {
        self as u32 as f32
    }
}

/// Per-instance draw state for the external renderer.
/// Must match the host protocol: 12 floats = 48 bytes stride.
///
/// Scales are multiples of the glyph size; the renderer multiplies by
/// `ProtocolLayout`'s glyph size to get pixels.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct DrawInstance {
    pub x: f32,
    pub y: f32,
    /// Rotation in radians.
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Atlas column of the glyph.
    pub glyph_col: f32,
    /// Atlas row of the glyph.
    pub glyph_row: f32,
    /// Glyph id (atlas cell index).
    pub glyph_id: f32,
    /// `DrawKind` as a float.
    pub kind: f32,
    /// Opacity (0.0 = invisible, 1.0 = opaque).
    pub alpha: f32,
    /// Position in the draw order (0 drawn first).
    pub order: f32,
    /// Depth key for grounded particles, -1 otherwise.
    pub depth: f32,
}

impl DrawInstance {
    pub const FLOATS: usize = 12;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;
}

/// Draw state for one frame, already in draw order:
/// the pile back to front, then airborne particles, then sparks.
pub struct DrawBuffer {
    pub instances: Vec<DrawInstance>,
    /// Instances `[0..pile_end)` are the depth-sorted pile.
    pub pile_end: u32,
    /// Instances `[pile_end..flight_end)` are airborne; sparks follow.
    pub flight_end: u32,
}

impl DrawBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: Vec::with_capacity(capacity),
            pile_end: 0,
            flight_end: 0,
        }
    }

    pub fn clear(&mut self) {
        self.instances.clear();
        self.pile_end = 0;
        self.flight_end = 0;
    }

    /// Append an instance, stamping its draw order.
    pub fn push(&mut self, mut instance: DrawInstance) {
        instance.order = self.instances.len() as f32;
        self.instances.push(instance);
    }

    pub fn mark_pile_end(&mut self) {
        self.pile_end = self.instance_count();
    }

    pub fn mark_flight_end(&mut self) {
        self.flight_end = self.instance_count();
    }

    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Raw pointer to instance data for SharedArrayBuffer reads.
    pub fn instances_ptr(&self) -> *const f32 {
        self.instances.as_ptr() as *const f32
    }
}

impl Default for DrawBuffer {
    fn default() -> Self {
        Self::with_capacity(512)
    }
}
