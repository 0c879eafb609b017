pub mod directory;
pub mod source;

pub use directory::{DEFAULT_FRAME_EXTENSION, DirectorySource, DirectorySourceOptions};
pub use source::{FrameSource, MemorySource};
