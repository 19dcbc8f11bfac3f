//! In-flight entries and their ordered data handles.
//!
//! Every handle is a one-shot channel. An entry is announced to the
//! sequencer as a [`PendingEntry`] as soon as it is scheduled; its header
//! becomes available once the CRC is known, and its compressed data arrives
//! as an ordered sequence of block handles that the sequencer drains one by
//! one. Dropping a sender without sending means the producing task failed
//! and recorded its error with the pipeline.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::format::FileHeader;
use crate::rate_limit::Reservation;

/// Compressed bytes of one block, delivered once.
pub(crate) type BlockFuture = Receiver<Vec<u8>>;

/// An entry whose header is final.
#[derive(Debug)]
pub(crate) struct ReadyEntry {
    pub(crate) header: FileHeader,
    /// Block handles in offset order; the sequence ends when the sender is dropped.
    pub(crate) blocks: Receiver<BlockFuture>,
    /// Memory held for the entry, released when the sequencer takes the header.
    pub(crate) memory: Option<Reservation>,
}

/// An entry queued for writing whose header may not be known yet.
#[derive(Debug)]
pub(crate) struct PendingEntry {
    pub(crate) name: String,
    pub(crate) ready: Receiver<ReadyEntry>,
}

impl PendingEntry {
    pub(crate) fn new(name: impl Into<String>) -> (Self, Sender<ReadyEntry>) {
        let (tx, rx) = mpsc::channel();
        let entry = Self {
            name: name.into(),
            ready: rx,
        };
        (entry, tx)
    }

    /// An entry whose header and content are already known.
    pub(crate) fn resolved(header: FileHeader, data: Option<Vec<u8>>) -> Self {
        let (entry, ready) = Self::new(header.name.clone());
        // The receiver is alive, the send cannot fail.
        let _ = ready.send(ReadyEntry {
            header,
            blocks: completed_blocks(data),
            memory: None,
        });
        entry
    }
}

/// A closed block sequence holding at most one already-resolved block.
pub(crate) fn completed_blocks(data: Option<Vec<u8>>) -> Receiver<BlockFuture> {
    let (blocks_tx, blocks_rx) = mpsc::channel();
    if let Some(data) = data {
        let (block_tx, block_rx) = mpsc::channel();
        let _ = block_tx.send(data);
        let _ = blocks_tx.send(block_rx);
    }
    blocks_rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CompressionMethod;

    #[test]
    fn test_resolved_entry() {
        let header = FileHeader::symlink("link", b"target");
        let pending = PendingEntry::resolved(header, Some(b"target".to_vec()));
        assert_eq!(pending.name, "link");

        let ready = pending.ready.recv().unwrap();
        let blocks: Vec<Vec<u8>> = ready.blocks.iter().map(|b| b.recv().unwrap()).collect();
        assert_eq!(blocks, [b"target".to_vec()]);
        assert!(ready.memory.is_none());
    }

    #[test]
    fn test_resolved_without_data() {
        let header = FileHeader::directory("dir");
        let pending = PendingEntry::resolved(header, None);
        let ready = pending.ready.recv().unwrap();
        assert_eq!(ready.header.method, CompressionMethod::Store);
        assert!(ready.blocks.recv().is_err());
    }

    #[test]
    fn test_dropped_sender() {
        let (pending, ready) = PendingEntry::new("a");
        drop(ready);
        assert!(pending.ready.recv().is_err());
    }
}
