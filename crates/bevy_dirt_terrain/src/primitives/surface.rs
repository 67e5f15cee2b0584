//! Row-major 2D buffer.
//!
//! A [`Surface`] is a generic 2D buffer that can hold any element type. The
//! density field stores its samples in a `Surface<u8>`; stamps use the same
//! type for their coverage masks.
//!
//! # Coordinate System
//!
//! Surfaces use a Y+ up coordinate system consistent with world coordinates:
//! - **X+** is to the right (east)
//! - **Y+** is upward (toward sky)
//! - **(0, 0)** is the bottom-left corner
//!
//! Data is stored in row-major order where row 0 is the bottom of the surface.

use std::ops::{Index, IndexMut};

/// A 2D buffer of elements.
///
/// Data is stored in row-major order (y * width + x).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface<T> {
  data: Box<[T]>,
  width: u32,
  height: u32,
}

impl<T: Clone + Default> Surface<T> {
  /// Creates a new surface filled with the default value.
  pub fn new(width: u32, height: u32) -> Self {
    Self::filled(width, height, T::default())
  }
}

impl<T: Clone> Surface<T> {
  /// Creates a new surface filled with the given value.
  pub fn filled(width: u32, height: u32, value: T) -> Self {
    let len = (width as usize) * (height as usize);
    Self {
      data: vec![value; len].into_boxed_slice(),
      width,
      height,
    }
  }
}

impl<T> Surface<T> {
  /// Wraps an existing buffer. Returns `None` unless
  /// `data.len() == width * height`.
  pub fn from_vec(width: u32, height: u32, data: Vec<T>) -> Option<Self> {
    if data.len() != (width as usize) * (height as usize) {
      return None;
    }
    Some(Self {
      data: data.into_boxed_slice(),
      width,
      height,
    })
  }

  /// Returns the width of the surface.
  #[inline]
  pub fn width(&self) -> u32 {
    self.width
  }

  /// Returns the height of the surface.
  #[inline]
  pub fn height(&self) -> u32 {
    self.height
  }

  /// Converts (x, y) to a linear index, or `None` if out of bounds.
  #[inline]
  fn index_of(&self, x: u32, y: u32) -> Option<usize> {
    if x < self.width && y < self.height {
      Some((y as usize) * (self.width as usize) + (x as usize))
    } else {
      None
    }
  }

  /// Returns a reference to the element at (x, y), or `None` if out of bounds.
  #[inline]
  pub fn get(&self, x: u32, y: u32) -> Option<&T> {
    self.index_of(x, y).map(|i| &self.data[i])
  }

  /// Returns a mutable reference to the element at (x, y), or `None` if out of
  /// bounds.
  #[inline]
  pub fn get_mut(&mut self, x: u32, y: u32) -> Option<&mut T> {
    self.index_of(x, y).map(|i| &mut self.data[i])
  }

  /// Sets the element at (x, y). Returns `true` if successful, `false` if out
  /// of bounds.
  #[inline]
  pub fn set(&mut self, x: u32, y: u32, value: T) -> bool {
    if let Some(i) = self.index_of(x, y) {
      self.data[i] = value;
      true
    } else {
      false
    }
  }

  /// Returns `len` elements of row `y` starting at column `x`.
  ///
  /// # Panics
  /// Panics if the span leaves the row.
  #[inline]
  pub fn row_span(&self, x: u32, y: u32, len: u32) -> &[T] {
    assert!(x + len <= self.width && y < self.height);
    let start = (y as usize) * (self.width as usize) + (x as usize);
    &self.data[start..start + len as usize]
  }

  /// Returns a slice of the underlying data.
  #[inline]
  pub fn as_slice(&self) -> &[T] {
    &self.data
  }

  /// Returns a mutable slice of the underlying data.
  #[inline]
  pub fn as_slice_mut(&mut self) -> &mut [T] {
    &mut self.data
  }

  /// Fills the entire surface with the given value.
  #[inline]
  pub fn fill(&mut self, value: T)
  where
    T: Clone,
  {
    self.data.fill(value);
  }
}

impl<T> Index<(u32, u32)> for Surface<T> {
  type Output = T;

  #[inline]
  fn index(&self, (x, y): (u32, u32)) -> &Self::Output {
    let i = (y as usize) * (self.width as usize) + (x as usize);
    &self.data[i]
  }
}

impl<T> IndexMut<(u32, u32)> for Surface<T> {
  #[inline]
  fn index_mut(&mut self, (x, y): (u32, u32)) -> &mut Self::Output {
    let i = (y as usize) * (self.width as usize) + (x as usize);
    &mut self.data[i]
  }
}
