//! Single-producer/single-consumer byte pipe that hands variable-length
//! messages from the network thread to the render thread without locking.
//!
//! Every record is a 4-byte length prefix followed by the payload, padded up to
//! the next word so that each prefix is an aligned atomic. A zero prefix marks
//! the end of the written data and `u32::MAX` sends the reader back to the
//! start of the arena.

use std::slice;
use std::sync::atomic::{fence, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

const PREFIX_LEN: usize = 4;
const STOP: u32 = 0;
const LOOP: u32 = u32::MAX;

fn padded(len: usize) -> usize {
    (len + PREFIX_LEN - 1) & !(PREFIX_LEN - 1)
}

struct Arena {
    words: Box<[AtomicU32]>,
    /// Published by the consumer, read by the producer for overwrite checks.
    read_head: AtomicUsize,
}

impl Arena {
    fn capacity(&self) -> usize {
        self.words.len() * PREFIX_LEN
    }

    fn word(&self, offset: usize) -> &AtomicU32 {
        &self.words[offset / PREFIX_LEN]
    }

    fn bytes(&self) -> *mut u8 {
        self.words.as_ptr() as *mut u8
    }
}

/// Allocates a pipe of `capacity` bytes (rounded down to a whole word) and
/// returns its two ends.
pub fn pipe(capacity: usize) -> (Producer, Consumer) {
    let words = capacity / PREFIX_LEN;
    assert!(words >= 2, "a pipe needs room for at least two words");

    let arena = Arc::new(Arena {
        words: (0..words).map(|_| AtomicU32::new(STOP)).collect(),
        read_head: AtomicUsize::new(0),
    });

    let producer = Producer {
        arena: Arc::clone(&arena),
        write_head: 0,
        remaining: words * PREFIX_LEN,
        acquired: None,
    };
    let consumer = Consumer {
        arena,
        read_head: 0,
    };
    (producer, consumer)
}

/// The writing end. Owned by exactly one thread.
pub struct Producer {
    arena: Arc<Arena>,
    write_head: usize,
    /// Bytes from `write_head` to the end of the arena.
    remaining: usize,
    acquired: Option<usize>,
}

impl Producer {
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Returns a writable region of exactly `len` bytes, or `None` if the
    /// record does not fit without overwriting unread data. The tail of the
    /// arena is tried first, then the start. `None` is backpressure, not an
    /// error: the caller may drop the message or retry later.
    ///
    /// Zero-length records are never accepted, their prefix would read as
    /// "no data".
    pub fn acquire_write_region(&mut self, len: usize) -> Option<&mut [u8]> {
        if len == 0 || len >= LOOP as usize {
            return None;
        }

        let capacity = self.arena.capacity();
        let read_head = self.arena.read_head.load(Ordering::Acquire);
        let record = PREFIX_LEN + padded(len);
        // The record plus the terminator written behind it.
        let required = record + PREFIX_LEN;

        let offset = if required <= self.remaining {
            let end = self.write_head + record;
            if self.write_head < read_head && end >= read_head {
                return None;
            }
            self.write_head
        } else if required <= capacity {
            if self.write_head < read_head || required > read_head {
                return None;
            }

            let old_write_head = self.write_head;
            self.write_head = 0;
            self.remaining = capacity;
            self.arena.word(0).store(STOP, Ordering::Relaxed);
            fence(Ordering::Release);
            self.arena.word(old_write_head).store(LOOP, Ordering::Relaxed);
            0
        } else {
            return None;
        };

        self.acquired = Some(len);
        // SAFETY: the region lies between the prefix at `offset` and the
        // terminator slot behind it. The checks above guarantee the consumer
        // does not read any of these bytes until the prefix is published.
        Some(unsafe { slice::from_raw_parts_mut(self.arena.bytes().add(offset + PREFIX_LEN), len) })
    }

    /// Publishes the `len` bytes written into the last acquired region.
    ///
    /// The terminator behind the record is stored first, then a release fence,
    /// then the record's own prefix. The reader therefore never observes a
    /// prefix whose payload or terminator is still in flight.
    pub fn commit_write(&mut self, len: usize) {
        let acquired = self.acquired.take();
        assert!(
            matches!(acquired, Some(max) if len > 0 && len <= max),
            "commit_write({len}) does not match the acquired region {acquired:?}"
        );

        let record = PREFIX_LEN + padded(len);
        assert!(self.remaining >= record + PREFIX_LEN);
        let start = self.write_head;
        self.write_head += record;
        self.remaining -= record;

        self.arena.word(self.write_head).store(STOP, Ordering::Relaxed);
        fence(Ordering::Release);
        self.arena.word(start).store(len as u32, Ordering::Relaxed);
    }

    /// Copies a whole message into the pipe. Returns `false` if it did not fit.
    pub fn push(&mut self, payload: &[u8]) -> bool {
        match self.acquire_write_region(payload.len()) {
            Some(region) => region.copy_from_slice(payload),
            None => return false,
        }
        self.commit_write(payload.len());
        true
    }

    /// Clears both cursors and zeroes the arena. Holding both ends mutably
    /// guarantees that no other thread is touching the pipe.
    pub fn reset(&mut self, consumer: &mut Consumer) {
        assert!(
            Arc::ptr_eq(&self.arena, &consumer.arena),
            "producer and consumer belong to different pipes"
        );

        for word in self.arena.words.iter() {
            word.store(STOP, Ordering::Relaxed);
        }
        self.write_head = 0;
        self.remaining = self.arena.capacity();
        self.acquired = None;
        consumer.read_head = 0;
        self.arena.read_head.store(0, Ordering::Release);
    }
}

/// The reading end. Owned by exactly one thread.
pub struct Consumer {
    arena: Arc<Arena>,
    read_head: usize,
}

impl Consumer {
    /// Number of payload bytes in the next record, zero if there is none.
    pub fn has_data(&mut self) -> usize {
        let mut len = self.arena.word(self.read_head).load(Ordering::Acquire);
        if len == LOOP {
            self.read_head = 0;
            self.arena.read_head.store(0, Ordering::Release);
            len = self.arena.word(0).load(Ordering::Acquire);
        }
        len as usize
    }

    /// Returns the next record without consuming it.
    pub fn peek_read(&mut self) -> Option<&[u8]> {
        let len = self.has_data();
        if len == 0 {
            return None;
        }

        // SAFETY: the acquire load in `has_data` synchronises with the
        // producer's release fence, so all `len` payload bytes are written and
        // the producer will not touch them until `consume` moves past them.
        Some(unsafe { slice::from_raw_parts(self.arena.bytes().add(self.read_head + PREFIX_LEN), len) })
    }

    /// Releases the current record. Must only be called while `has_data()` is
    /// non-zero.
    pub fn consume(&mut self) {
        let len = self.arena.word(self.read_head).load(Ordering::Acquire);
        assert!(
            len != STOP && len != LOOP,
            "consume() called on a pipe without data"
        );

        self.read_head += PREFIX_LEN + padded(len as usize);
        self.arena.read_head.store(self.read_head, Ordering::Release);
    }
}
