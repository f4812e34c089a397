use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::link::error::LinkError;

/// This codec has a configurable delimiter sequence for reading,
/// and optionally appends a sequence to each payload it encodes.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// How far into the buffer we have already looked for a delimiter.
    cursor: usize,

    /// How to delimit incoming byte streams.
    /// This delimiter is not included in the yielded frames.
    read_delimiter: Vec<u8>,

    /// If provided, which bytes to append when writing (encoding) payloads.
    /// If `None`, forwards the data as-is.
    write_delimiter: Option<Vec<u8>>,
}

impl LineCodec {
    /// Create a new codec.
    pub fn new<R: Into<Vec<u8>>>(read_delimiter: R, write_delimiter: Option<Vec<u8>>) -> Self {
        let read_delimiter = read_delimiter.into();
        assert!(
            !read_delimiter.is_empty(),
            "The read delimiter cannot be empty"
        );

        Self {
            cursor: 0,
            read_delimiter,
            write_delimiter,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(&b"\r\n"[..], None)
    }
}

impl Decoder for LineCodec {
    type Item = Vec<u8>;
    type Error = LinkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let delimiter = &self.read_delimiter[..];

        // Resume a bit before where the last scan stopped, in case the
        // delimiter straddles a chunk boundary.
        let start = self.cursor.saturating_sub(delimiter.len() - 1);

        let position = src[start..]
            .windows(delimiter.len())
            .position(|window| window == delimiter);

        if let Some(position) = position {
            // The scan might have started late in the buffer (from the cursor),
            // so the global position within the buffer has to be calculated.
            let actual_position = start + position;

            // Next time we start over.
            self.cursor = 0;

            // Split at the delimiter, getting the bytes before it.
            let line = src.split_to(actual_position);

            // Discard the delimiter by advancing the source buffer beyond it.
            src.advance(delimiter.len());

            Ok(Some(line[..].to_vec()))
        } else {
            // We did not find a full frame.
            // The next time we are called the same buffer `src` will be provided
            // to us, but possibly with more data.
            // Since our job is to find the delimiter, we don't need to re-read
            // the bytes we have already looked at.
            self.cursor = src.len();

            // Indicate that we need more bytes to look at.
            Ok(None)
        }
    }
}

impl Encoder<Vec<u8>> for LineCodec {
    type Error = LinkError;

    fn encode(&mut self, item: Vec<u8>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item);

        if let Some(delimiter) = &self.write_delimiter {
            dst.extend_from_slice(delimiter);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode_all(codec: &mut LineCodec, buffer: &mut BytesMut) -> Vec<Vec<u8>> {
        let mut frames = vec![];
        while let Some(frame) = codec.decode(buffer).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn one_record_per_delimiter() {
        let mut codec = LineCodec::default();
        let mut buffer = BytesMut::from(&b"12.5\r\n27.1\r\nno delimiter yet"[..]);

        let frames = decode_all(&mut codec, &mut buffer);

        assert_eq!(frames, vec![b"12.5".to_vec(), b"27.1".to_vec()]);
        assert_eq!(&buffer[..], b"no delimiter yet");
    }

    #[test]
    fn records_are_chunking_independent() {
        let mut codec = LineCodec::default();
        let mut buffer = BytesMut::from(&b"12.5\r\n27"[..]);

        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(b"12.5".to_vec()));
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);

        buffer.extend_from_slice(b"1\r\n");

        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(b"27.1".to_vec()));
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
    }

    #[test]
    fn delimiter_straddles_a_chunk_boundary() {
        let mut codec = LineCodec::default();
        let mut buffer = BytesMut::from(&b"a\r"[..]);

        assert_eq!(codec.decode(&mut buffer).unwrap(), None);

        buffer.extend_from_slice(b"\nb\r\n");

        let frames = decode_all(&mut codec, &mut buffer);
        assert_eq!(frames, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn empty_lines_are_records_too() {
        let mut codec = LineCodec::default();
        let mut buffer = BytesMut::from(&b"\r\n\r\n"[..]);

        let frames = decode_all(&mut codec, &mut buffer);
        assert_eq!(frames, vec![b"".to_vec(), b"".to_vec()]);
    }

    #[test]
    fn encodes_verbatim_by_default() {
        let mut codec = LineCodec::default();
        let mut wire = BytesMut::new();

        codec.encode(b"LED1:ON".to_vec(), &mut wire).unwrap();

        assert_eq!(&wire[..], b"LED1:ON");
    }

    #[test]
    fn encodes_with_write_delimiter_when_set() {
        let mut codec = LineCodec::new(&b"\r\n"[..], Some(b"\n".to_vec()));
        let mut wire = BytesMut::new();

        codec.encode(b"LED1:ON".to_vec(), &mut wire).unwrap();

        assert_eq!(&wire[..], b"LED1:ON\n");
    }
}
