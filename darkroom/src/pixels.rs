use std::ops::{Deref, Index};

use crate::error::{Error, Result};

/// Single-channel pixel plane stored row-major as `f32`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixels {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl Pixels {
    /// Wraps `data`; fails with [`Error::Shape`] when `data.len() != width * height`.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::Shape {
                operation: "Pixels::new",
                expected: (width, height),
                actual: (data.len(), 1),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn new_filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Builds a plane from `f(x, y)`.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            data,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Fails with [`Error::Shape`] unless `other` has the same shape.
    pub(crate) fn ensure_same_shape(&self, other: &Pixels, operation: &'static str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::Shape {
                operation,
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(())
    }

    /// Element-wise `self - other`.
    pub fn subtract(&self, other: &Pixels) -> Result<Pixels> {
        self.ensure_same_shape(other, "subtract")?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| a - b)
            .collect();
        Ok(Pixels {
            data,
            width: self.width,
            height: self.height,
        })
    }
}

impl Index<(usize, usize)> for Pixels {
    type Output = f32;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.data[y * self.width + x]
    }
}

impl Deref for Pixels {
    type Target = [f32];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
