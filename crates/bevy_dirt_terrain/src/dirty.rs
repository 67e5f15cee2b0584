//! Dirty regions produced by terrain edits.
//!
//! The density texture is single-channel 8-bit, and the upload path only
//! accepts row strides that are multiples of 4 bytes. Every region handed to
//! texture sync therefore starts on a 4-texel column and spans a multiple of
//! 4 texels horizontally.

use crate::primitives::TexelRect;

/// Horizontal alignment of dirty regions, in texels.
pub const ROW_ALIGNMENT: u32 = 4;

/// Rectangle of the density field changed by one edit.
///
/// Produced by [`DensityField::paint`](crate::field::DensityField::paint) and
/// consumed the same frame by texture sync and geometry invalidation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyRegion {
  pub rect: TexelRect,
}

impl DirtyRegion {
  pub const EMPTY: Self = Self {
    rect: TexelRect::new(0, 0, 0, 0),
  };

  /// Smallest aligned region containing `rect`.
  ///
  /// The left edge is rounded down and the right edge rounded up to a
  /// multiple of [`ROW_ALIGNMENT`], then limited to `field_width` (itself a
  /// multiple of the alignment). Empty input yields [`DirtyRegion::EMPTY`].
  pub fn covering(rect: TexelRect, field_width: u32) -> Self {
    if rect.is_empty() {
      return Self::EMPTY;
    }
    let x0 = align_down(rect.x);
    let x1 = align_up(rect.right()).min(field_width);
    Self {
      rect: TexelRect::new(x0, rect.y, x1.saturating_sub(x0), rect.height),
    }
  }

  /// Wraps a caller-built rectangle without aligning it.
  pub const fn from_rect(rect: TexelRect) -> Self {
    Self { rect }
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.rect.is_empty()
  }

  /// True when both the left edge and the width are multiples of
  /// [`ROW_ALIGNMENT`].
  #[inline]
  pub fn is_aligned(&self) -> bool {
    self.rect.x % ROW_ALIGNMENT == 0 && self.rect.width % ROW_ALIGNMENT == 0
  }
}

#[inline]
const fn align_down(v: u32) -> u32 {
  v & !(ROW_ALIGNMENT - 1)
}

#[inline]
const fn align_up(v: u32) -> u32 {
  (v + ROW_ALIGNMENT - 1) & !(ROW_ALIGNMENT - 1)
}
