//! Protocol client.
//!
//! A thin wrapper over one connection. Each call sends one command and
//! collects its response; `read` collects up to the end-of-stream marker.

use capfs_core::WriteMode;
use capfs_proto::{Frame, LineReader, Response, END_OF_FILE, READ_CHUNK_SIZE};
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server closed the connection
    #[error("Server disconnected")]
    Closed,

    /// Server refused the handshake
    #[error("Handshake rejected: {0}")]
    Rejected(String),
}

/// A connected, authenticated client.
pub struct Client {
    reader: LineReader<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connects and performs the handshake.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        username: &str,
        group: &str,
    ) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();
        let mut client = Self {
            reader: LineReader::new(BufReader::new(read_half)),
            writer: write_half,
        };

        client.send_line(&format!("{username}|{group}")).await?;
        let reply = client.recv_line().await?;
        if !reply.is_empty() {
            return Err(ClientError::Rejected(reply));
        }
        Ok(client)
    }

    /// Sends one raw line.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receives one response line, terminator stripped.
    pub async fn recv_line(&mut self) -> Result<String, ClientError> {
        let mut line = Vec::new();
        loop {
            match self.reader.read_line(READ_CHUNK_SIZE).await? {
                Frame::Line(rest) => {
                    line.extend_from_slice(&rest);
                    return Ok(String::from_utf8_lossy(&line).into_owned());
                }
                Frame::Partial(piece) => line.extend_from_slice(&piece),
                Frame::Eof => return Err(ClientError::Closed),
            }
        }
    }

    /// Sends a command and returns its one-line response.
    pub async fn command(&mut self, line: &str) -> Result<String, ClientError> {
        self.send_line(line).await?;
        self.recv_line().await
    }

    /// `create <name> <mask>`
    pub async fn create(&mut self, name: &str, mask: &str) -> Result<String, ClientError> {
        self.command(&format!("create {name} {mask}")).await
    }

    /// `mode <name> <mask>`
    pub async fn mode(&mut self, name: &str, mask: &str) -> Result<String, ClientError> {
        self.command(&format!("mode {name} {mask}")).await
    }

    /// Sends `write <name> <o|a>` and returns the first response.
    ///
    /// If the response is the content prompt, the write stays open until
    /// [`Client::finish_write`].
    pub async fn start_write(&mut self, name: &str, mode: WriteMode) -> Result<String, ClientError> {
        self.command(&format!("write {name} {mode}")).await
    }

    /// Ends an open write with an empty line and returns the final response.
    pub async fn finish_write(&mut self) -> Result<String, ClientError> {
        self.command("").await
    }

    /// Writes `lines` to a file and returns the final response.
    pub async fn write<S: AsRef<str>>(
        &mut self,
        name: &str,
        mode: WriteMode,
        lines: &[S],
    ) -> Result<String, ClientError> {
        let reply = self.start_write(name, mode).await?;
        if reply != prompt() {
            return Ok(reply);
        }
        for line in lines {
            // An empty line would end the write early.
            let line = line.as_ref();
            if !line.is_empty() {
                self.send_line(line).await?;
            }
        }
        self.finish_write().await
    }

    /// Sends `read <name>` and collects everything before the marker.
    pub async fn read(&mut self, name: &str) -> Result<String, ClientError> {
        self.send_line(&format!("read {name}")).await?;
        self.collect_stream().await
    }

    /// Collects a marker-terminated response.
    pub async fn collect_stream(&mut self) -> Result<String, ClientError> {
        let marker = END_OF_FILE.as_bytes();
        let mut body = Vec::new();
        loop {
            match self.reader.read_line(READ_CHUNK_SIZE).await? {
                Frame::Line(line) => {
                    body.extend_from_slice(&line);
                    if body.ends_with(marker) {
                        body.truncate(body.len() - marker.len());
                        return Ok(String::from_utf8_lossy(&body).into_owned());
                    }
                    body.push(b'\n');
                }
                Frame::Partial(piece) => body.extend_from_slice(&piece),
                Frame::Eof => return Err(ClientError::Closed),
            }
        }
    }

    /// Sends `exit` and closes the connection.
    pub async fn exit(mut self) -> Result<(), ClientError> {
        self.send_line("exit").await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

fn prompt() -> String {
    Response::WritePrompt.to_string().trim_end().to_string()
}
