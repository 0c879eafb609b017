use std::io::{ErrorKind, Read};

use crate::types::FrameId;
use crate::{Result, VzipError};

use super::RECORD_LENGTH_SIZE;

/// One record read back from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub frame: FrameId,
    pub payload: Vec<u8>,
}

/// Iterates the records of an archive stream.
///
/// A stream that ends exactly on a record boundary ends the iteration; a
/// stream cut inside a length field or payload yields an error, after which
/// the iterator is exhausted.
#[derive(Debug)]
pub struct ArchiveReader<R: Read> {
    reader: R,
    next_frame: usize,
    finished: bool,
}

impl<R: Read> ArchiveReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            next_frame: 0,
            finished: false,
        }
    }

    /// Number of records returned so far.
    pub fn records_read(&self) -> usize {
        self.next_frame
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_length(&mut self) -> Result<Option<u32>> {
        let mut field = [0u8; RECORD_LENGTH_SIZE];
        let mut filled = 0;
        while filled < field.len() {
            match self.reader.read(&mut field[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(VzipError::InvalidFormat("truncated record length")),
                Ok(read) => filled += read,
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(error.into()),
            }
        }
        Ok(Some(u32::from_ne_bytes(field)))
    }

    fn read_record(&mut self) -> Result<Option<ArchiveRecord>> {
        let Some(length) = self.read_length()? else {
            return Ok(None);
        };

        // Grow while reading rather than trusting the length for one allocation.
        let mut payload = Vec::new();
        (&mut self.reader)
            .take(u64::from(length))
            .read_to_end(&mut payload)?;
        if payload.len() != length as usize {
            return Err(VzipError::InvalidFormat("truncated record payload"));
        }

        let frame = FrameId(self.next_frame);
        self.next_frame += 1;
        Ok(Some(ArchiveRecord { frame, payload }))
    }
}

impl<R: Read> Iterator for ArchiveReader<R> {
    type Item = Result<ArchiveRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let frame = self.next_frame;
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error.with_context(format!("reading record {frame}"))))
            }
        }
    }
}
