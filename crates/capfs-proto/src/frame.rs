//! Bounded line framing.
//!
//! Lines end with `\n`; a `\r` right before it is dropped too. Reads are
//! bounded so a peer that never sends a terminator cannot make the server
//! buffer without limit.

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt};

/// One unit read from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, terminator stripped
    Line(Vec<u8>),
    /// The limit was reached before a terminator; the rest of the line is
    /// still in the stream
    Partial(Vec<u8>),
    /// The peer closed the stream
    Eof,
}

/// Reads bounded lines from a buffered stream.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    /// `\r` consumed at the limit that turned out not to end the line.
    carried_cr: bool,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    /// Wraps a buffered reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            carried_cr: false,
        }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads up to `limit` bytes of one line.
    ///
    /// Data left unterminated at end of stream is returned as a final line.
    pub async fn read_line(&mut self, limit: usize) -> io::Result<Frame> {
        let mut buf = Vec::new();
        if std::mem::take(&mut self.carried_cr) {
            buf.push(b'\r');
        }
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                return Ok(if buf.is_empty() {
                    Frame::Eof
                } else {
                    Frame::Line(strip_cr(buf))
                });
            }

            let room = limit.saturating_sub(buf.len());
            if let Some(pos) = available.iter().position(|&b| b == b'\n') {
                // A `\r` just past the limit still belongs to the terminator.
                if pos <= room || (pos == room + 1 && available[room] == b'\r') {
                    buf.extend_from_slice(&available[..pos]);
                    self.inner.consume(pos + 1);
                    return Ok(Frame::Line(strip_cr(buf)));
                }
            }
            if room == 0 {
                // Only a `\r` is buffered; its `\n` may come with the next fill.
                if available == b"\r" {
                    self.inner.consume(1);
                    let next = self.inner.fill_buf().await?.first().copied();
                    match next {
                        Some(b'\n') => {
                            self.inner.consume(1);
                            return Ok(Frame::Line(buf));
                        }
                        None => return Ok(Frame::Line(buf)),
                        Some(_) => {
                            self.carried_cr = true;
                            return Ok(Frame::Partial(buf));
                        }
                    }
                }
                return Ok(Frame::Partial(buf));
            }

            let take = available.len().min(room);
            buf.extend_from_slice(&available[..take]);
            self.inner.consume(take);
        }
    }

    /// Reads one command line of at most `limit` bytes.
    ///
    /// An over-long line is consumed through its terminator and reported as
    /// `Partial` holding its first `limit` bytes.
    pub async fn read_command(&mut self, limit: usize) -> io::Result<Frame> {
        match self.read_line(limit).await? {
            Frame::Partial(head) => loop {
                match self.read_line(limit).await? {
                    Frame::Line(_) => return Ok(Frame::Partial(head)),
                    Frame::Partial(_) => continue,
                    Frame::Eof => return Ok(Frame::Eof),
                }
            },
            frame => Ok(frame),
        }
    }
}

fn strip_cr(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}
