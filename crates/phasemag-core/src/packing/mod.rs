pub mod packer;
pub mod window;

pub use packer::{CoefficientPacker, PackedArray, PackedLayout, Segment, SegmentKind};
pub use window::CoefficientWindow;
