pub mod labels;
pub mod mask;
pub mod split;
pub mod types;

pub use labels::{LabelError, LabelTable};
pub use mask::{RleError, NO_MASK};
pub use split::SplitError;
pub use types::{FoldSplit, ImageRecord, Mask};
