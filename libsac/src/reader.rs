use crate::core::{
    CoderConfig, FrameSummary, Header, MtMode, SacError, SacResult, StreamInfo,
    CHECKSUM_SIZE, HEADER_SIZE, MAGIC, MAX_BITS_PER_SAMPLE, MAX_CHANNELS, MAX_FRAME_LEN,
    VERSION_MAJOR,
};
use crate::lossless::FrameCoder;

/// a parsed container, frames still encoded
#[derive(Debug, Clone)]
pub struct SacFile<'a> {
    pub header: Header,
    pub metadata: &'a [u8],
    /// everything after the metadata
    pub frames: &'a [u8],
}

/// binary reader for sac format
pub struct Reader;

impl Reader {
    /// new reader
    pub fn new() -> Self {
        Reader
    }

    /// split a stream into header, metadata and frame bytes
    pub fn read<'a>(&self, data: &'a [u8]) -> SacResult<SacFile<'a>> {
        let mut cursor = ByteReader::new(data);

        let magic = cursor
            .read_slice(MAGIC.len())
            .map_err(|_| SacError::Format("not a sac stream: too short".to_string()))?;
        if magic != MAGIC {
            return Err(SacError::Format("not a sac stream: bad magic".to_string()));
        }

        let header = self.read_header(&mut cursor)?;
        let metadata = cursor.read_slice(header.meta_size as usize)?;
        let frames = cursor.rest();

        Ok(SacFile {
            header,
            metadata,
            frames,
        })
    }

    /// parse and sanity check the header (after the magic)
    pub fn read_header(&self, cursor: &mut ByteReader) -> SacResult<Header> {
        if cursor.remaining() < HEADER_SIZE {
            return Err(SacError::truncated("header"));
        }
        let header = Header {
            version_major: cursor.read_u8()?,
            version_minor: cursor.read_u8()?,
            flags: cursor.read_u16_le()?,
            sample_rate: cursor.read_u32_le()?,
            channels: cursor.read_u8()?,
            bits_per_sample: cursor.read_u8()?,
            num_samples: cursor.read_u64_le()?,
            frame_len: cursor.read_u32_le()?,
            checksum: cursor.read_array::<CHECKSUM_SIZE>()?,
            meta_size: cursor.read_u32_le()?,
        };

        if header.version_major != VERSION_MAJOR {
            return Err(SacError::Format(format!(
                "unsupported version {}.{}",
                header.version_major, header.version_minor
            )));
        }
        if header.channels == 0 || header.channels > MAX_CHANNELS {
            return Err(SacError::Format(format!(
                "{} channels in header",
                header.channels
            )));
        }
        if header.bits_per_sample == 0 || header.bits_per_sample > MAX_BITS_PER_SAMPLE {
            return Err(SacError::Format(format!(
                "{} bits per sample in header",
                header.bits_per_sample
            )));
        }
        if header.frame_len == 0 || header.frame_len > MAX_FRAME_LEN {
            return Err(SacError::Format(format!(
                "frame length {} in header",
                header.frame_len
            )));
        }
        Ok(header)
    }

    /// header and metadata, no frame is touched
    pub fn read_info(&self, data: &[u8]) -> SacResult<StreamInfo> {
        let file = self.read(data)?;
        Ok(StreamInfo {
            header: file.header,
            file_size: data.len(),
            metadata: file.metadata.to_vec(),
        })
    }

    /// walk every frame header without decoding the payloads
    pub fn scan_frames(&self, data: &[u8]) -> SacResult<Vec<FrameSummary>> {
        let file = self.read(data)?;
        let header = &file.header;

        let config = CoderConfig {
            mt_mode: MtMode::Off,
            ..Default::default()
        };
        let mut coder = FrameCoder::new(header.channels as usize, frame_alloc(header), config)?;

        let mut cursor = ByteReader::new(file.frames);
        let mut summaries = Vec::with_capacity(header.num_frames() as usize);
        let mut seen = 0u64;
        while seen < header.num_samples {
            coder.read_encoded(&mut cursor)?;
            seen += coder.num_samples() as u64;
            if seen > header.num_samples {
                return Err(overshoot(header));
            }
            summaries.push(coder.frame_summary());
            coder.skip_frame()?;
        }
        Ok(summaries)
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

/// largest frame a stream may hold; buffers still grow only as frames arrive
pub(crate) fn frame_alloc(header: &Header) -> usize {
    (header.frame_len as u64).min(header.num_samples).max(1) as usize
}

pub(crate) fn overshoot(header: &Header) -> SacError {
    SacError::Format(format!(
        "frames hold more than the {} samples in the header",
        header.num_samples
    ))
}

/// little-endian cursor over a byte slice
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// everything not yet consumed
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    pub fn read_slice(&mut self, count: usize) -> SacResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(SacError::truncated(&format!(
                "{count} bytes at offset {}",
                self.pos
            )));
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> SacResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> SacResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> SacResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> SacResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> SacResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_reports_truncation() {
        let mut c = ByteReader::new(&[1, 0, 0]);
        assert_eq!(c.read_u16_le().unwrap(), 1);
        assert!(matches!(c.read_u32_le(), Err(SacError::Format(_))));
        assert_eq!(c.position(), 2);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let err = Reader::new().read(b"RIFF0000").unwrap_err();
        assert!(matches!(err, SacError::Format(_)));
    }
}
