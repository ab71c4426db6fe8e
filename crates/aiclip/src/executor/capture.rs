use crate::model::OutputExcerpt;
use std::io::Read;
use std::thread::JoinHandle;

const CHUNK: usize = 8 * 1024;

/// Drain `reader` on its own thread, keeping at most `limit` leading bytes.
///
/// The stream is read to the end even after the limit is hit so the child never
/// blocks on a full pipe.
pub(crate) fn drain<R>(mut reader: R, limit: usize) -> JoinHandle<OutputExcerpt>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut kept = Vec::with_capacity(limit.min(CHUNK));
        let mut dropped = 0u64;
        let mut buf = [0u8; CHUNK];
        loop {
            let read = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            };
            let Some(chunk) = buf.get(..read) else {
                break;
            };
            let room = limit.saturating_sub(kept.len()).min(chunk.len());
            let (keep, rest) = chunk.split_at(room);
            kept.extend_from_slice(keep);
            dropped += rest.len() as u64;
        }
        excerpt(&kept, dropped)
    })
}

fn excerpt(kept: &[u8], dropped: u64) -> OutputExcerpt {
    let mut text = String::from_utf8_lossy(kept).into_owned();
    if dropped > 0 {
        text.push_str(&format!("\n[... {dropped} more bytes truncated]"));
    }
    OutputExcerpt {
        text,
        truncated_bytes: dropped,
    }
}
