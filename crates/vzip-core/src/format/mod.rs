//! Archive record format.
//!
//! An archive is a plain sequence of records in frame order with no header
//! or trailer:
//!
//! ```text
//! record := length: u32 (native byte order) ++ payload: [u8; length]
//! ```

pub mod consts;
pub mod reader;
pub mod writer;

pub use consts::*;
pub use reader::{ArchiveReader, ArchiveRecord};
pub use writer::{ArchiveSummary, OrderedWriter};
