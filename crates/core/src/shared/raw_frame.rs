use crate::shared::dimensions::{Dimensions, PLANE_COUNT};

/// A single raw picture: planar 8-bit YUV 4:2:0, planes stored back to back
/// (Y, then U, then V) with no row padding.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFrame {
    data: Vec<u8>,
    dimensions: Dimensions,
    index: u64,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, dimensions: Dimensions, index: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            dimensions.frame_size(),
            "data length must equal the YUV 4:2:0 frame size"
        );
        Self {
            data,
            dimensions,
            index,
        }
    }

    /// Zero-filled frame, used as the destination buffer for a read.
    pub fn blank(dimensions: Dimensions, index: u64) -> Self {
        Self {
            data: vec![0; dimensions.frame_size()],
            dimensions,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn plane(&self, plane: usize) -> &[u8] {
        let range = self.plane_range(plane);
        &self.data[range]
    }

    pub fn plane_mut(&mut self, plane: usize) -> &mut [u8] {
        let range = self.plane_range(plane);
        &mut self.data[range]
    }

    /// Copies a tightly packed `source`-sized picture into the top-left corner
    /// of this frame and fills the remainder of every plane by repeating the
    /// last column and the last row.
    pub fn fill_padded(&mut self, packed: &[u8], source: Dimensions) {
        debug_assert!(source.fits_within(self.dimensions));
        debug_assert_eq!(packed.len(), source.frame_size());

        let mut offset = 0;
        for plane in 0..PLANE_COUNT {
            let (src_w, src_h) = source.plane(plane);
            let (dst_w, dst_h) = self.dimensions.plane(plane);
            let src = &packed[offset..offset + src_w * src_h];
            let dst = self.plane_mut(plane);

            for row in 0..src_h {
                let line = &mut dst[row * dst_w..(row + 1) * dst_w];
                line[..src_w].copy_from_slice(&src[row * src_w..(row + 1) * src_w]);
                if src_w > 0 && src_w < dst_w {
                    let edge = line[src_w - 1];
                    line[src_w..].fill(edge);
                }
            }
            if src_h > 0 {
                let last = (src_h - 1) * dst_w;
                for row in src_h..dst_h {
                    dst.copy_within(last..last + dst_w, row * dst_w);
                }
            }

            offset += src_w * src_h;
        }
    }

    /// Returns the top-left `target` region of every plane as a new frame.
    pub fn cropped(&self, target: Dimensions) -> RawFrame {
        if target == self.dimensions {
            return self.clone();
        }
        debug_assert!(target.fits_within(self.dimensions));

        let mut data = Vec::with_capacity(target.frame_size());
        for plane in 0..PLANE_COUNT {
            let (dst_w, dst_h) = target.plane(plane);
            let (src_w, _) = self.dimensions.plane(plane);
            let src = self.plane(plane);
            for row in 0..dst_h {
                data.extend_from_slice(&src[row * src_w..row * src_w + dst_w]);
            }
        }
        RawFrame::new(data, target, self.index)
    }

    fn plane_range(&self, plane: usize) -> std::ops::Range<usize> {
        let start: usize = (0..plane).map(|p| self.dimensions.plane_size(p)).sum();
        start..start + self.dimensions.plane_size(plane)
    }
}
