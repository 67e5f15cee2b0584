/// An axis-aligned rectangle of texels.
///
/// `x`/`y` address the bottom-left texel; the rectangle covers
/// `x..x + width` by `y..y + height`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TexelRect {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl TexelRect {
  /// Creates a new rectangle.
  #[inline]
  pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// Creates a rectangle covering an entire surface.
  #[inline]
  pub fn full(surface_width: u32, surface_height: u32) -> Self {
    Self::new(0, 0, surface_width, surface_height)
  }

  /// Builds the rectangle covering the signed span `[min, max)` clipped to
  /// `[0, bound_width) x [0, bound_height)`.
  ///
  /// Spans that miss the bounds entirely produce an empty rectangle.
  pub fn clipped_from_span(
    min_x: i64,
    min_y: i64,
    max_x: i64,
    max_y: i64,
    bound_width: u32,
    bound_height: u32,
  ) -> Self {
    let x0 = min_x.clamp(0, bound_width as i64);
    let y0 = min_y.clamp(0, bound_height as i64);
    let x1 = max_x.clamp(x0, bound_width as i64);
    let y1 = max_y.clamp(y0, bound_height as i64);
    Self::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
  }

  /// Exclusive right edge.
  #[inline]
  pub const fn right(&self) -> u32 {
    self.x + self.width
  }

  /// Exclusive top edge.
  #[inline]
  pub const fn top(&self) -> u32 {
    self.y + self.height
  }

  /// Number of texels covered.
  #[inline]
  pub const fn area(&self) -> usize {
    self.width as usize * self.height as usize
  }

  #[inline]
  pub const fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  /// Returns true if `other` lies entirely inside this rectangle.
  pub fn contains_rect(&self, other: &TexelRect) -> bool {
    other.x >= self.x
      && other.y >= self.y
      && other.right() <= self.right()
      && other.top() <= self.top()
  }

  /// Clamps this rect to fit within the given bounds.
  pub fn clamped(&self, bound_width: u32, bound_height: u32) -> Self {
    let x = self.x.min(bound_width);
    let y = self.y.min(bound_height);
    let max_w = bound_width.saturating_sub(x);
    let max_h = bound_height.saturating_sub(y);
    Self {
      x,
      y,
      width: self.width.min(max_w),
      height: self.height.min(max_h),
    }
  }
}
