use crate::stream::part::Part;
use crossbeam_channel::Sender;
use std::io::{self, Write};
use std::mem;

/// Adapts a byte stream into fixed-size `Part`s fed through a bounded
/// channel. The archiver writes into this as an ordinary `Write` sink; the
/// upload coordinator is the channel's sole consumer.
///
/// `write` blocks when the channel is full (the channel's bound, not this
/// struct, provides backpressure), and `close` flushes a final short tail
/// and drops the sender, closing the channel exactly once.
pub struct PartChannelWriter {
    buffer: Vec<u8>,
    next_part_number: u64,
    min_part_size: usize,
    sender: Option<Sender<Part>>,
}

impl PartChannelWriter {
    #[must_use]
    pub fn new(sender: Sender<Part>, min_part_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(min_part_size),
            next_part_number: 1,
            min_part_size,
            sender: Some(sender),
        }
    }

    fn emit(&mut self, bytes: Vec<u8>) -> io::Result<()> {
        let number = self.next_part_number;
        self.next_part_number += 1;
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| io::Error::other("write after close"))?;
        sender
            .send(Part::new(number, bytes))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "part channel closed"))
    }

    /// Flushes the residual tail (if any) and closes the channel. Safe to
    /// call once; later calls are a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        let Some(sender) = self.sender.take() else {
            return Ok(());
        };
        if !self.buffer.is_empty() {
            let tail = mem::take(&mut self.buffer);
            let number = self.next_part_number;
            self.next_part_number += 1;
            sender
                .send(Part::new(number, tail))
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "part channel closed"))?;
        }
        Ok(())
    }
}

impl Write for PartChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        while self.buffer.len() >= self.min_part_size {
            let tail = self.buffer.split_off(self.min_part_size);
            let chunk = mem::replace(&mut self.buffer, tail);
            self.emit(chunk)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PartChannelWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn drain(rx: &crossbeam_channel::Receiver<Part>) -> Vec<Part> {
        rx.try_iter().collect()
    }

    #[test]
    fn numbers_parts_from_one_with_no_gaps() {
        let (tx, rx) = unbounded();
        let mut writer = PartChannelWriter::new(tx, 4);
        writer.write_all(&[0u8; 10]).unwrap();
        writer.close().unwrap();

        let parts = drain(&rx);
        let numbers: Vec<u64> = parts.iter().map(Part::number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn all_but_last_part_are_exactly_min_size() {
        let (tx, rx) = unbounded();
        let mut writer = PartChannelWriter::new(tx, 4);
        writer.write_all(&[0u8; 10]).unwrap();
        writer.close().unwrap();

        let parts = drain(&rx);
        assert_eq!(parts[0].len(), 4);
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 2);
    }

    #[test]
    fn total_bytes_conserved() {
        let (tx, rx) = unbounded();
        let mut writer = PartChannelWriter::new(tx, 7);
        let input: Vec<u8> = (0..53u8).collect();
        writer.write_all(&input).unwrap();
        writer.close().unwrap();

        let parts = drain(&rx);
        let total: usize = parts.iter().map(Part::len).sum();
        assert_eq!(total, input.len());

        let reassembled: Vec<u8> = parts.into_iter().flat_map(Part::into_bytes).collect();
        assert_eq!(reassembled, input);
    }

    #[test]
    fn exact_multiple_of_min_size_yields_no_short_tail_part() {
        let (tx, rx) = unbounded();
        let mut writer = PartChannelWriter::new(tx, 5);
        writer.write_all(&[0u8; 10]).unwrap();
        writer.close().unwrap();

        let parts = drain(&rx);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 5);
        assert_eq!(parts[1].len(), 5);
    }

    #[test]
    fn empty_write_then_close_emits_nothing() {
        let (tx, rx) = unbounded();
        let mut writer = PartChannelWriter::new(tx, 5);
        writer.close().unwrap();
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let (tx, rx) = unbounded();
        let mut writer = PartChannelWriter::new(tx, 5);
        writer.write_all(&[1, 2, 3]).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert_eq!(drain(&rx).len(), 1);
    }

    #[test]
    fn drop_without_explicit_close_still_closes_channel() {
        let (tx, rx) = unbounded();
        {
            let mut writer = PartChannelWriter::new(tx, 5);
            writer.write_all(&[1, 2, 3]).unwrap();
        }
        assert_eq!(drain(&rx).len(), 1);
        assert!(rx.recv().is_err());
    }
}
