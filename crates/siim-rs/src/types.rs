use serde::{Deserialize, Serialize};

/// Dense binary segmentation mask.
///
/// Stored row-major: pixel (row, col) is at index `row * width + col`.
/// A value of 0 is background; anything greater is foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub height: u32,
    pub width: u32,
    /// Row-major pixel data, length `height * width`.
    pub data: Vec<u8>,
}

impl Mask {
    /// Create an all-background mask of the given shape.
    pub fn zeros(height: u32, width: u32) -> Self {
        let n = (height as usize) * (width as usize);
        Mask {
            height,
            width,
            data: vec![0u8; n],
        }
    }

    /// Build a mask from row-major pixel data.
    pub fn from_rows(height: u32, width: u32, data: Vec<u8>) -> Self {
        let n = (height as usize) * (width as usize);
        assert_eq!(data.len(), n, "mask length must equal height*width");
        Mask {
            height,
            width,
            data,
        }
    }

    /// Build a mask from a column-major (Fortran order) buffer.
    ///
    /// In the buffer, pixel (row, col) is at index `col * height + row` —
    /// the order the RLE label format flattens pixels in.
    pub fn from_column_major(height: u32, width: u32, buf: Vec<u8>) -> Self {
        let h = height as usize;
        let w = width as usize;
        assert_eq!(buf.len(), h * w, "buffer length must equal height*width");
        let mut data = vec![0u8; h * w];
        for col in 0..w {
            for row in 0..h {
                data[row * w + col] = buf[col * h + row];
            }
        }
        Mask {
            height,
            width,
            data,
        }
    }

    /// Flatten the mask into a column-major (Fortran order) buffer.
    pub fn to_column_major(&self) -> Vec<u8> {
        let h = self.height as usize;
        let w = self.width as usize;
        let mut buf = vec![0u8; h * w];
        for col in 0..w {
            for row in 0..h {
                buf[col * h + row] = self.data[row * w + col];
            }
        }
        buf
    }

    pub fn get(&self, row: u32, col: u32) -> u8 {
        self.data[(row as usize) * (self.width as usize) + (col as usize)]
    }

    pub fn set(&mut self, row: u32, col: u32, value: u8) {
        self.data[(row as usize) * (self.width as usize) + (col as usize)] = value;
    }

    /// Number of foreground pixels.
    pub fn area(&self) -> u64 {
        self.data.iter().filter(|&&v| v > 0).count() as u64
    }
}

/// One row of the label table: an image identifier and its RLE label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageRecord {
    pub image_id: String,
    /// RLE label string; `"-1"` means "examined, no pneumothorax found".
    pub rle: String,
    /// Derived flag: true iff the label denotes at least one foreground pixel.
    pub has_mask: bool,
}

/// One fold of a stratified k-fold split.
///
/// `train` and `eval` are disjoint index sets into the record slice the
/// split was computed over.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FoldSplit {
    pub fold: usize,
    pub train: Vec<usize>,
    pub eval: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_major_roundtrip() {
        // 2x3 mask:
        //   1 0 1
        //   0 1 0
        let mask = Mask::from_rows(2, 3, vec![1, 0, 1, 0, 1, 0]);
        let buf = mask.to_column_major();
        // Columns top-to-bottom: [1,0], [0,1], [1,0]
        assert_eq!(buf, vec![1, 0, 0, 1, 1, 0]);
        assert_eq!(Mask::from_column_major(2, 3, buf), mask);
    }

    #[test]
    fn test_get_set() {
        let mut mask = Mask::zeros(4, 5);
        mask.set(2, 3, 1);
        assert_eq!(mask.get(2, 3), 1);
        assert_eq!(mask.get(3, 2), 0);
        assert_eq!(mask.area(), 1);
    }

    #[test]
    fn test_zeros_shape() {
        let mask = Mask::zeros(3, 7);
        assert_eq!(mask.data.len(), 21);
        assert_eq!(mask.area(), 0);
    }
}
