//! The single writer of the archive stream.

use std::io::Write;
use std::sync::mpsc::Receiver;

use super::entry::{PendingEntry, ReadyEntry};
use super::pipeline::Pipeline;
use crate::Result;
use crate::codec::CompressionMethod;
use crate::format::ZipWriter;

/// Drains queued entries in order and writes them to `zip`.
///
/// Returns once the producer has closed the queue and every entry is
/// written, or with the first error of the build.
pub(crate) fn write_entries<W: Write>(
    zip: &mut ZipWriter<W>,
    queue: Receiver<PendingEntry>,
    pipeline: &Pipeline,
) -> Result<()> {
    for pending in queue {
        let Ok(ready) = pending.ready.recv() else {
            return Err(pipeline.take_error());
        };
        let ReadyEntry {
            mut header,
            blocks,
            memory,
        } = ready;

        match header.method {
            CompressionMethod::Deflate => zip.create_compressed_header(header)?,
            CompressionMethod::Store => {
                header.compressed_size = header.uncompressed_size;
                zip.create_header(header)?;
            }
        }
        drop(memory);

        for block in blocks {
            let Ok(data) = block.recv() else {
                return Err(pipeline.take_error());
            };
            zip.write_data(&data)?;
        }

        // A closed block sequence is only complete if nobody failed first.
        if pipeline.is_aborted() {
            return Err(pipeline.take_error());
        }
        zip.close_entry()?;
        log::trace!("wrote {}", pending.name);
    }

    if pipeline.is_aborted() {
        return Err(pipeline.take_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::format::FileHeader;
    use crate::write::ZipOptions;
    use crate::write::entry::BlockFuture;
    use std::sync::mpsc;

    #[test]
    fn test_blocks_written_in_order() {
        let pipeline = Pipeline::new(&ZipOptions::default());
        let (queue_tx, queue_rx) = mpsc::sync_channel(4);

        let (pending, ready_tx) = PendingEntry::new("a.bin");
        queue_tx.send(pending).unwrap();
        drop(queue_tx);

        let (blocks_tx, blocks_rx) = mpsc::channel::<BlockFuture>();
        let mut senders = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = mpsc::channel();
            blocks_tx.send(rx).unwrap();
            senders.push(tx);
        }
        drop(blocks_tx);
        // Resolve out of order.
        senders[2].send(b"c".to_vec()).unwrap();
        senders[0].send(b"a".to_vec()).unwrap();
        senders[1].send(b"b".to_vec()).unwrap();

        let mut header = FileHeader::file("a.bin", CompressionMethod::Store, 3, false);
        header.crc32 = crate::checksum::Crc32::compute(b"abc");
        ready_tx
            .send(ReadyEntry {
                header,
                blocks: blocks_rx,
                memory: None,
            })
            .unwrap();

        let mut zip = ZipWriter::new(Vec::new());
        write_entries(&mut zip, queue_rx, &pipeline).unwrap();
        let bytes = zip.finish().unwrap();
        let data_start = 30 + "a.bin".len();
        assert_eq!(&bytes[data_start..data_start + 3], b"abc");
    }

    #[test]
    fn test_recorded_error_returned() {
        let pipeline = Pipeline::new(&ZipOptions::default());
        let (queue_tx, queue_rx) = mpsc::sync_channel(4);
        let (pending, ready_tx) = PendingEntry::new("broken");
        queue_tx.send(pending).unwrap();
        drop(queue_tx);

        pipeline.fail(Error::UnsupportedFileType {
            path: "/dev/null".into(),
        });
        drop(ready_tx);

        let mut zip = ZipWriter::new(Vec::new());
        let err = write_entries(&mut zip, queue_rx, &pipeline).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType { .. }));
    }

    #[test]
    fn test_abort_after_queue_closed() {
        let pipeline = Pipeline::new(&ZipOptions::default());
        let (queue_tx, queue_rx) = mpsc::sync_channel::<PendingEntry>(1);
        drop(queue_tx);
        pipeline.fail(Error::MissingOutputPath);

        let mut zip = ZipWriter::new(Vec::new());
        let err = write_entries(&mut zip, queue_rx, &pipeline).unwrap_err();
        assert!(matches!(err, Error::MissingOutputPath));
    }
}
