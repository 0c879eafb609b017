/// Width of the length field in front of every record.
pub const RECORD_LENGTH_SIZE: usize = 4;

/// Largest payload a record can describe.
pub const MAX_RECORD_LEN: usize = u32::MAX as usize;

/// File extension used for archives by the CLI.
pub const ARCHIVE_EXTENSION: &str = "vzip";
