use orbis_lod::{PatchDraw, RenderSink, SlotIndex};

/// Stands in for GPU buffers: counts uploads and draws.
#[derive(Default)]
pub struct CountingSink {
    pub index_count: usize,
    pub uploads: usize,
    pub uploaded_bytes: usize,
    pub draws: usize,
}

impl CountingSink {
    pub fn begin_frame(&mut self) {
        self.draws = 0;
    }
}

impl RenderSink for CountingSink {
    fn write_indices(&mut self, indices: &[u32]) {
        self.index_count = indices.len();
    }

    fn write_vertices(&mut self, _slot: SlotIndex, _first_vertex: u32, bytes: &[u8]) {
        self.uploads += 1;
        self.uploaded_bytes += bytes.len();
    }

    fn draw_patch(&mut self, _draw: &PatchDraw) {
        self.draws += 1;
    }
}
