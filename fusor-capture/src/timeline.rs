//! Length-prefixed binary timeline format for recorded frame streams.
//!
//! Each record on the wire is a 4-byte little-endian payload length followed
//! by the payload:
//!
//! ```text
//! time_ms:   u32 LE   millisecond offset from recording start
//! color_len: u32 LE   number of raw color bytes
//! color:     color_len bytes (packed BGRA)
//! depth_len: u32 LE   number of depth samples
//! depth:     depth_len x u16 LE (millimeters)
//! ```
//!
//! Records appear in capture order, one per accepted frame.

use std::io::{self, Read, Write};

/// One recorded frame of a timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRecord {
    /// Millisecond offset from the start of the recording.
    pub time_ms: u32,
    /// Packed BGRA color bytes.
    pub color_data: Vec<u8>,
    /// Raw depth in millimeters.
    pub depth_data: Vec<u16>,
}

impl TimelineRecord {
    /// Encoded payload size in bytes, excluding the length prefix.
    pub fn payload_len(&self) -> usize {
        4 + 4 + self.color_data.len() + 4 + self.depth_data.len() * 2
    }

    /// Append this record, length prefix included, to a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&(self.payload_len() as u32).to_le_bytes())?;
        writer.write_all(&self.time_ms.to_le_bytes())?;
        writer.write_all(&(self.color_data.len() as u32).to_le_bytes())?;
        writer.write_all(&self.color_data)?;
        writer.write_all(&(self.depth_data.len() as u32).to_le_bytes())?;

        let mut depth_bytes = Vec::with_capacity(self.depth_data.len() * 2);
        for value in &self.depth_data {
            depth_bytes.extend_from_slice(&value.to_le_bytes());
        }
        writer.write_all(&depth_bytes)
    }

    /// Read the next record from a reader. Returns `Ok(None)` on a clean
    /// end-of-stream at a record boundary; a truncated record is an error.
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Option<Self>> {
        let mut length = [0u8; 4];
        match reader.read_exact(&mut length) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }

        let payload_len = u32::from_le_bytes(length) as usize;
        let mut payload = vec![0u8; payload_len];
        reader.read_exact(&mut payload)?;

        let mut offset = 0;
        let time_ms = read_u32(&payload, &mut offset)?;
        let color_len = read_u32(&payload, &mut offset)? as usize;
        let color_data = read_bytes(&payload, &mut offset, color_len)?.to_vec();
        let depth_len = read_u32(&payload, &mut offset)? as usize;
        let depth_data = read_bytes(&payload, &mut offset, depth_len * 2)?
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        if offset != payload.len() {
            return Err(truncated("trailing bytes after timeline record"));
        }

        Ok(Some(Self {
            time_ms,
            color_data,
            depth_data,
        }))
    }
}

fn truncated(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

fn read_u32(payload: &[u8], offset: &mut usize) -> io::Result<u32> {
    let bytes = read_bytes(payload, offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_bytes<'a>(payload: &'a [u8], offset: &mut usize, len: usize) -> io::Result<&'a [u8]> {
    let end = offset
        .checked_add(len)
        .filter(|&end| end <= payload.len())
        .ok_or_else(|| truncated("truncated timeline record"))?;
    let bytes = &payload[*offset..end];
    *offset = end;
    Ok(bytes)
}
