//! Append-only output log with cursor-based readers.
//!
//! One writer (the job's output pump) appends; any number of readers each
//! hold their own byte offset and advance independently. Bytes at a given
//! offset never change once written, so a reader can resume from any
//! offset it has previously seen.

use std::sync::{Arc, RwLock};

/// Cheaply clonable handle to a job's captured output.
#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    inner: Arc<RwLock<Vec<u8>>>,
}

impl OutputLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk to the log.
    ///
    /// Never blocks readers for longer than the copy itself.
    pub fn append(&self, chunk: &[u8]) {
        let mut data = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        data.extend_from_slice(chunk);
    }

    /// Returns all bytes from `offset` to the current end, and the new end
    /// offset.
    ///
    /// An `offset` at or past the end returns an empty chunk and the
    /// current length.
    #[must_use]
    pub fn read_from(&self, offset: usize) -> (Vec<u8>, usize) {
        let data = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let len = data.len();
        if offset >= len {
            return (Vec::new(), len);
        }
        (data[offset..].to_vec(), len)
    }

    /// Returns true iff bytes exist beyond `offset`.
    #[must_use]
    pub fn has_new(&self, offset: usize) -> bool {
        offset < self.len()
    }

    /// Returns the current length of the log in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// Returns true iff nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn sequential_appends_concatenate() {
        let log = OutputLog::new();
        log.append(b"one ");
        log.append(b"two ");
        log.append(b"three");

        let (bytes, offset) = log.read_from(0);
        assert_eq!(bytes, b"one two three");
        assert_eq!(offset, 13);
    }

    #[test]
    fn read_from_mid_offset_returns_suffix() {
        let log = OutputLog::new();
        log.append(b"hello world");

        let (bytes, offset) = log.read_from(6);
        assert_eq!(bytes, b"world");
        assert_eq!(offset, 11);
    }

    #[test]
    fn read_at_end_is_empty_and_stable() {
        let log = OutputLog::new();
        log.append(b"abc");

        let (bytes, offset) = log.read_from(3);
        assert!(bytes.is_empty());
        assert_eq!(offset, 3);
        assert!(!log.has_new(3));
    }

    #[test]
    fn has_new_tracks_growth() {
        let log = OutputLog::new();
        assert!(!log.has_new(0));

        log.append(b"x");
        assert!(log.has_new(0));
        assert!(!log.has_new(1));
    }

    #[test]
    fn independent_readers_advance_separately() {
        let log = OutputLog::new();
        log.append(b"aaaa");

        let (_, fast) = log.read_from(0);
        log.append(b"bbbb");

        let (rest, _) = log.read_from(fast);
        assert_eq!(rest, b"bbbb");

        let (all, _) = log.read_from(0);
        assert_eq!(all, b"aaaabbbb");
    }

    #[test]
    fn concurrent_writer_and_readers() {
        let log = OutputLog::new();
        let writer = {
            let log = log.clone();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    log.append(b"ab");
                }
            })
        };

        let reader = {
            let log = log.clone();
            std::thread::spawn(move || {
                let mut offset = 0;
                let mut seen = Vec::new();
                while seen.len() < 2000 {
                    let (bytes, next) = log.read_from(offset);
                    seen.extend_from_slice(&bytes);
                    offset = next;
                }
                seen
            })
        };

        writer.join().expect("writer");
        let seen = reader.join().expect("reader");
        assert_eq!(seen.len(), 2000);
        assert!(seen.chunks(2).all(|c| c == b"ab"));
    }
}
