use crate::core::{Checksum, Header, CHECKSUM_OFFSET, HEADER_SIZE, MAGIC};

/// binary writer for sac format
///
/// Frames are appended straight into the output buffer as they are
/// coded; the checksum is only known at the end and is patched in by
/// [`Writer::finish`].
pub struct Writer {
    buffer: Vec<u8>,
}

impl Writer {
    /// start a stream: magic, header with an empty checksum, metadata
    pub fn begin(header: &Header, metadata: &[u8]) -> Self {
        let mut buffer = Vec::with_capacity(MAGIC.len() + HEADER_SIZE + metadata.len());
        buffer.extend_from_slice(&MAGIC);
        write_header(&mut buffer, header);
        buffer.extend_from_slice(metadata);
        Writer { buffer }
    }

    /// output buffer, frames are appended here
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// patch the checksum into the header and hand out the bytes
    pub fn finish(mut self, checksum: &Checksum) -> Vec<u8> {
        let at = MAGIC.len() + CHECKSUM_OFFSET;
        self.buffer[at..at + checksum.len()].copy_from_slice(checksum);
        self.buffer
    }
}

/// serialize the header (magic excluded)
pub fn write_header(out: &mut Vec<u8>, header: &Header) {
    let start = out.len();
    out.push(header.version_major);
    out.push(header.version_minor);
    out.extend_from_slice(&header.flags.to_le_bytes());
    out.extend_from_slice(&header.sample_rate.to_le_bytes());
    out.push(header.channels);
    out.push(header.bits_per_sample);
    out.extend_from_slice(&header.num_samples.to_le_bytes());
    out.extend_from_slice(&header.frame_len.to_le_bytes());
    out.extend_from_slice(&header.checksum);
    out.extend_from_slice(&header.meta_size.to_le_bytes());
    debug_assert_eq!(out.len() - start, HEADER_SIZE);
}
