use super::FRAME_DELIMITER;

/// Upper bound on an unterminated fragment before it is discarded.
const DEFAULT_MAX_PENDING: usize = 1024;

/// Turns a byte stream into newline-terminated frames, carrying the trailing
/// fragment over to the next read.
#[derive(Debug)]
pub struct FrameReassembler {
    pending: Vec<u8>,
    max_pending: usize,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING)
    }

    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_pending,
        }
    }

    /// Appends `bytes` and returns every frame completed by them, in order.
    /// Frames are returned without their terminator; blank lines are skipped.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == FRAME_DELIMITER) {
            let end = start + offset;
            let line = trim_cr(&self.pending[start..end]);
            if !line.is_empty() {
                frames.push(line.to_vec());
            }
            start = end + 1;
        }
        self.pending.drain(..start);

        if self.pending.len() > self.max_pending {
            tracing::warn!(
                "Discarding {} bytes of unterminated input",
                self.pending.len()
            );
            self.pending.clear();
        }

        frames
    }

    /// Drops the carry-over. Called when a new connection starts.
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits one datagram into frames. Datagrams are complete, so a final line
/// without terminator still counts.
pub fn split_datagram(datagram: &[u8]) -> Vec<&[u8]> {
    datagram
        .split(|b| *b == FRAME_DELIMITER)
        .map(trim_cr)
        .filter(|line| !line.is_empty())
        .collect()
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
