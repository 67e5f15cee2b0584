mod rect;
mod surface;

pub use rect::TexelRect;
pub use surface::Surface;
