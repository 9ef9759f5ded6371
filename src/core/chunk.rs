//! Unit of transfer between the reader and writer threads

use std::io::Read;

/// An owned run of bytes read from the source
///
/// The buffer length is exactly the number of valid bytes, so a short final
/// read produces a short chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    seq: u64,
    data: Vec<u8>,
}

impl Chunk {
    /// Wrap `data` as chunk number `seq`
    pub fn new(seq: u64, data: Vec<u8>) -> Self {
        Self { seq, data }
    }

    /// Position of this chunk in the stream, starting at zero
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Number of valid bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the chunk holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The valid bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take the buffer out of the chunk
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

/// Read up to `chunk_size` bytes, retrying short reads until the chunk is
/// full or the reader reports end of stream
///
/// The returned buffer holds exactly what was read and is never
/// zero-filled up front; an empty buffer means end of stream.
pub fn read_chunk<R: Read + ?Sized>(reader: &mut R, chunk_size: usize) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(chunk_size);
    (&mut *reader).take(chunk_size as u64).read_to_end(&mut buffer)?;

    if buffer.len() < chunk_size {
        buffer.shrink_to_fit();
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, ErrorKind};

    /// Hands out at most `step` bytes per read call
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        interrupt_next: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(std::io::Error::new(ErrorKind::Interrupted, "signal"));
            }
            self.interrupt_next = true;
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_read_chunk_splits_stream() {
        let data: Vec<u8> = (0..130u8).collect();
        let mut cursor = Cursor::new(data.clone());

        let first = read_chunk(&mut cursor, 64).unwrap();
        let second = read_chunk(&mut cursor, 64).unwrap();
        let third = read_chunk(&mut cursor, 64).unwrap();
        let end = read_chunk(&mut cursor, 64).unwrap();

        assert_eq!(first.len(), 64);
        assert_eq!(second.len(), 64);
        assert_eq!(third.len(), 2);
        assert!(end.is_empty());
        assert_eq!([first, second, third].concat(), data);
    }

    #[test]
    fn test_read_chunk_fills_across_short_reads() {
        let mut reader = Trickle {
            data: vec![7u8; 100],
            pos: 0,
            step: 5,
            interrupt_next: false,
        };

        let chunk = read_chunk(&mut reader, 64).unwrap();
        assert_eq!(chunk.len(), 64);
        let rest = read_chunk(&mut reader, 64).unwrap();
        assert_eq!(rest.len(), 36);
    }

    #[test]
    fn test_read_chunk_end_of_stream_holds_nothing() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);

        let chunk = read_chunk(&mut cursor, 1 << 20).unwrap();
        assert_eq!(chunk, vec![1, 2, 3]);
        assert!(chunk.capacity() < 1 << 20);

        let end = read_chunk(&mut cursor, 1 << 20).unwrap();
        assert!(end.is_empty());
        assert!(end.capacity() < 1 << 20);
    }

    #[test]
    fn test_read_chunk_reports_errors() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::Other, "disk gone"))
            }
        }

        let err = read_chunk(&mut Broken, 64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_chunk_accessors() {
        let chunk = Chunk::new(3, b"abc".to_vec());
        assert_eq!(chunk.seq(), 3);
        assert_eq!(chunk.len(), 3);
        assert!(!chunk.is_empty());
        assert_eq!(chunk.as_bytes(), b"abc");
        assert_eq!(chunk.into_inner(), b"abc".to_vec());
    }
}
