//! 1014 block framing.
//!
//! Blocked files are a sequence of 1014-byte physical blocks: 1012
//! bytes of logical data followed by two `0x40` fill bytes. The final
//! block is padded with `0x40` out to 1012 before its fill, so a
//! blocked file is always a whole number of 1014-byte blocks.
//!
//! [`Unblock1014`] and [`Block1014`] are `Read`/`Write` adapters that
//! strip and apply the framing, so the variable-record layer composes
//! over them unchanged.

use std::io::{self, Read, Write};

use crate::error::BlockViolation;

pub const BLOCK_LEN: usize = 1014;
pub const BLOCK_DATA_LEN: usize = 1012;
pub const PAD: u8 = 0x40;

/// Reader adapter exposing the logical byte stream of a blocked file.
///
/// Strict by default: a short final block or fill bytes that are not
/// `0x40 0x40` fail. Tolerant mode accepts both, the way mainframe
/// transfers sometimes deliver them.
pub struct Unblock1014<R: Read> {
    source: R,
    pending: Vec<u8>,
    at: usize,
    eof: bool,
    tolerant: bool,
}

impl<R: Read> Unblock1014<R> {
    pub fn new(source: R) -> Self {
        Unblock1014 {
            source,
            pending: Vec::new(),
            at: 0,
            eof: false,
            tolerant: false,
        }
    }

    pub fn tolerant(source: R) -> Self {
        Unblock1014 {
            tolerant: true,
            ..Unblock1014::new(source)
        }
    }

    /// Pull the next physical block into the pending buffer.
    fn fill(&mut self) -> io::Result<()> {
        let mut block = [0u8; BLOCK_LEN];
        let mut have = 0;
        while have < BLOCK_LEN {
            let n = self.source.read(&mut block[have..])?;
            if n == 0 {
                break;
            }
            have += n;
        }

        if have == 0 {
            self.eof = true;
            return Ok(());
        }
        if have < BLOCK_LEN {
            if !self.tolerant {
                return Err(BlockViolation(format!(
                    "incomplete final block: {have} of {BLOCK_LEN} bytes"
                ))
                .into_io());
            }
            self.eof = true;
            self.pending = block[..have.min(BLOCK_DATA_LEN)].to_vec();
            self.at = 0;
            return Ok(());
        }

        if !self.tolerant && block[BLOCK_DATA_LEN..] != [PAD, PAD] {
            return Err(BlockViolation(format!(
                "fill bytes are {:02X} {:02X}, expected {PAD:02X} {PAD:02X}",
                block[BLOCK_DATA_LEN],
                block[BLOCK_DATA_LEN + 1]
            ))
            .into_io());
        }
        self.pending = block[..BLOCK_DATA_LEN].to_vec();
        self.at = 0;
        Ok(())
    }
}

impl<R: Read> Read for Unblock1014<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.at >= self.pending.len() {
            if self.eof {
                return Ok(0);
            }
            self.fill()?;
            if self.at >= self.pending.len() {
                return Ok(0);
            }
        }
        let take = buf.len().min(self.pending.len() - self.at);
        buf[..take].copy_from_slice(&self.pending[self.at..self.at + take]);
        self.at += take;
        Ok(take)
    }
}

/// Writer adapter applying 1014 blocking to its output.
///
/// [`Block1014::finalise`] must be called once the logical stream is
/// complete; it pads the final block and emits its fill bytes.
pub struct Block1014<W: Write> {
    sink: W,
    in_block: usize,
}

impl<W: Write> Block1014<W> {
    pub fn new(sink: W) -> Self {
        Block1014 { sink, in_block: 0 }
    }

    /// Complete the blocking by padding out the final block.
    ///
    /// A stream that ended exactly on a block boundary still gets a
    /// trailing all-pad block, matching the files the scheme produces.
    pub fn finalise(&mut self) -> io::Result<()> {
        let pad = vec![PAD; BLOCK_DATA_LEN - self.in_block + 2];
        self.sink.write_all(&pad)?;
        self.in_block = 0;
        self.sink.flush()
    }
}

impl<W: Write> Write for Block1014<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut remaining = buf;
        while !remaining.is_empty() {
            let space = BLOCK_DATA_LEN - self.in_block;
            let take = remaining.len().min(space);
            self.sink.write_all(&remaining[..take])?;
            self.in_block += take;
            remaining = &remaining[take..];
            if self.in_block == BLOCK_DATA_LEN {
                self.sink.write_all(&[PAD, PAD])?;
                self.in_block = 0;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Re-frame a whole unblocked stream as 1014 blocked.
///
/// Unlike the streaming [`Block1014`] writer, a stream ending exactly
/// on a block boundary emits no trailing pad block here, so blocking
/// undoes unblocking byte for byte.
pub fn block_1014<R: Read, W: Write>(input: &mut R, output: &mut W) -> io::Result<()> {
    loop {
        let mut chunk = [PAD; BLOCK_DATA_LEN];
        let mut have = 0;
        while have < BLOCK_DATA_LEN {
            let n = input.read(&mut chunk[have..])?;
            if n == 0 {
                break;
            }
            have += n;
        }
        if have == 0 {
            break;
        }
        output.write_all(&chunk)?;
        output.write_all(&[PAD, PAD])?;
        if have < BLOCK_DATA_LEN {
            break;
        }
    }
    output.flush()
}

/// Strip 1014 blocking from a whole stream.
pub fn unblock_1014<R: Read, W: Write>(input: &mut R, output: &mut W) -> io::Result<()> {
    let mut unblocker = Unblock1014::new(input);
    io::copy(&mut unblocker, output)?;
    output.flush()
}
