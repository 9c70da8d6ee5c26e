use std::fmt;
use std::ops::Deref;

use crate::error::OcrError;

/// Immutable view over an 8-bit grayscale image.
#[derive(Clone)]
pub struct LumaPlane<'a> {
    width: u32,
    height: u32,
    stride: usize,
    data: &'a [u8],
}

impl<'a> LumaPlane<'a> {
    pub fn from_parts(
        width: u32,
        height: u32,
        stride: usize,
        data: &'a [u8],
    ) -> Result<Self, OcrError> {
        if stride < width as usize {
            return Err(OcrError::StrideTooSmall { stride, width });
        }
        let required = stride
            .checked_mul(height as usize)
            .ok_or(OcrError::PlaneOverflow { stride, height })?;
        if data.len() < required {
            return Err(OcrError::InsufficientPlaneData {
                provided: data.len(),
                required,
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            data: &data[..required],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Visible pixels with row padding removed.
    pub fn packed(&self) -> Vec<u8> {
        let width = self.width as usize;
        if self.stride == width {
            return self.data.to_vec();
        }
        let mut packed = Vec::with_capacity(width * self.height as usize);
        for row in self.data.chunks(self.stride.max(1)) {
            packed.extend_from_slice(&row[..width]);
        }
        packed
    }
}

impl fmt::Debug for LumaPlane<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LumaPlane")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Deref for LumaPlane<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_data() {
        let data = [0u8; 5];
        let err = LumaPlane::from_parts(2, 3, 2, &data).unwrap_err();
        assert!(matches!(
            err,
            OcrError::InsufficientPlaneData {
                provided: 5,
                required: 6
            }
        ));
    }

    #[test]
    fn packed_strips_padding() {
        let data = [1u8, 2, 0, 3, 4, 0];
        let plane = LumaPlane::from_parts(2, 2, 3, &data).unwrap();
        assert_eq!(plane.packed(), vec![1, 2, 3, 4]);
    }
}
