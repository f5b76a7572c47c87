//! Per-connection session state machine.
//!
//! A session moves `Handshake -> CommandLoop -> Closed`. It shares nothing
//! with other sessions except the file table and the records in it. Gate
//! admissions are held as guards, so any early return (including a
//! transport error) releases them.

use std::sync::Arc;

use capfs_core::{Identity, Operation, WriteMode};
use capfs_proto::{
    parse_handshake, Command, CommandKind, Frame, LineReader, ParseError, Response, END_OF_STREAM,
};
use capfs_store::{FileTable, TableError};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::SessionError;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for `<username>|<group>`
    Handshake,
    /// Reading commands
    CommandLoop,
    /// Finished
    Closed,
}

enum Flow {
    Continue,
    Exit,
}

/// One client session.
pub struct Session<R, W> {
    table: Arc<FileTable>,
    config: Arc<ServerConfig>,
    reader: LineReader<R>,
    writer: W,
    state: SessionState,
    identity: Option<Identity>,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a session over a buffered reader and a writer.
    pub fn new(table: Arc<FileTable>, config: Arc<ServerConfig>, reader: R, writer: W) -> Self {
        Self {
            table,
            config,
            reader: LineReader::new(reader),
            writer,
            state: SessionState::Handshake,
            identity: None,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the identity, once the handshake has succeeded.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Runs the session to completion.
    ///
    /// `Ok` means the peer exited, disconnected between commands or failed
    /// the handshake. Errors mean the connection broke mid-exchange.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        let result = self.drive().await;
        self.state = SessionState::Closed;
        result
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        let identity = match self.handshake().await? {
            Some(identity) => identity,
            None => return Ok(()),
        };
        info!(user = %identity, "Session started");
        self.identity = Some(identity.clone());
        self.state = SessionState::CommandLoop;

        loop {
            let line = match self.reader.read_command(self.config.max_command_line).await? {
                Frame::Line(line) => line,
                Frame::Partial(_) => {
                    self.send(&Response::LineTooLong(self.config.max_command_line))
                        .await?;
                    continue;
                }
                Frame::Eof => {
                    info!(user = %identity, "Client disconnected");
                    return Ok(());
                }
            };

            let line = String::from_utf8_lossy(&line);
            debug!(user = %identity, command = %line, "Received command");

            match Command::parse(&line) {
                Ok(command) => {
                    if let Flow::Exit = self.dispatch(&identity, command).await? {
                        info!(user = %identity, "Client exited");
                        return Ok(());
                    }
                }
                Err(ParseError::Usage(kind)) => self.send(&Response::Usage(kind)).await?,
                Err(ParseError::Unknown(_)) => self.send(&Response::InvalidCommand).await?,
            }
        }
    }

    async fn handshake(&mut self) -> Result<Option<Identity>, SessionError> {
        let line = match self.reader.read_command(self.config.max_command_line).await? {
            Frame::Line(line) => String::from_utf8_lossy(&line).into_owned(),
            Frame::Partial(_) => String::new(),
            Frame::Eof => return Err(SessionError::Closed),
        };

        match parse_handshake(&line) {
            Ok(identity) => {
                self.send(&Response::Welcome).await?;
                Ok(Some(identity))
            }
            Err(e) => {
                warn!(error = %e, "Handshake rejected");
                self.send(&Response::InvalidGroup).await?;
                Ok(None)
            }
        }
    }

    async fn dispatch(&mut self, identity: &Identity, command: Command) -> Result<Flow, SessionError> {
        match command {
            Command::Create { name, mask } => {
                let response = match self.table.create(&name, identity, mask.as_str()) {
                    Ok(_) => Response::Created,
                    Err(TableError::AlreadyExists(_)) => Response::AlreadyExists(name),
                    Err(TableError::TableFull(_)) => Response::TableFull,
                    Err(_) => Response::Usage(CommandKind::Create),
                };
                self.send(&response).await?;
            }
            Command::Mode { name, mask } => {
                let response = match self.table.set_permissions(&name, identity, mask.as_str()) {
                    Ok(()) => Response::ModeChanged(name),
                    Err(TableError::NotFound(_)) => Response::ModeNotFound,
                    Err(TableError::PermissionDenied(_)) => Response::NotOwner,
                    Err(_) => Response::Usage(CommandKind::Mode),
                };
                self.send(&response).await?;
            }
            Command::Write { name, mode } => self.write(identity, name, mode).await?,
            Command::Read { name } => self.read(identity, name).await?,
            Command::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    async fn write(
        &mut self,
        identity: &Identity,
        name: String,
        mode: WriteMode,
    ) -> Result<(), SessionError> {
        let Some(record) = self.table.lookup(&name) else {
            return self.send(&Response::WriteNotFound(name)).await;
        };
        let Some(mut admission) = record.try_write(mode) else {
            debug!(user = %identity, file = %name, "Write refused, file busy");
            return self.send(&Response::WriteBusy).await;
        };
        if !record.authorize(identity, Operation::Write) {
            drop(admission);
            return self.send(&Response::WriteDenied(name)).await;
        }

        self.send(&Response::WritePrompt).await?;
        loop {
            match self.reader.read_line(self.config.max_content_line).await? {
                Frame::Line(line) if line.is_empty() => break,
                Frame::Line(piece) | Frame::Partial(piece) => admission.ingest(&piece),
                Frame::Eof => {
                    warn!(user = %identity, file = %name, "Client disconnected during write");
                    return Err(SessionError::Closed);
                }
            }
        }

        let bytes = admission.written();
        drop(admission);
        info!(user = %identity, file = %name, mode = %mode, bytes, "Write complete");
        self.send(&Response::Written { name, bytes }).await
    }

    async fn read(&mut self, identity: &Identity, name: String) -> Result<(), SessionError> {
        let Some(record) = self.table.lookup(&name) else {
            return self.send(&Response::ReadNotFound(name)).await;
        };
        let Some(admission) = record.try_read() else {
            debug!(user = %identity, file = %name, "Read refused, file busy");
            return self.send(&Response::ReadBusy).await;
        };
        if !record.authorize(identity, Operation::Read) {
            drop(admission);
            return self.send(&Response::ReadDenied(name)).await;
        }
        if admission.is_empty() {
            drop(admission);
            return self.send(&Response::ReadEmpty(name)).await;
        }

        let delay = self.config.read_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let total = admission.len();
        let chunk_size = self.config.chunk_size.max(1);
        let mut sent = 0;
        while sent < total {
            let chunk = admission.read_chunk(sent, chunk_size);
            self.writer.write_all(&chunk).await?;
            sent += chunk.len();
        }
        self.writer.write_all(END_OF_STREAM).await?;
        self.writer.flush().await?;
        drop(admission);

        debug!(user = %identity, file = %name, bytes = total, "Read complete");
        Ok(())
    }

    async fn send(&mut self, response: &Response) -> Result<(), SessionError> {
        self.writer.write_all(&response.to_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capfs_core::Group;
    use capfs_store::StoreConfig;
    use tokio::io::{duplex, split, AsyncReadExt, BufReader, DuplexStream};
    use tokio::task::JoinHandle;

    struct Harness {
        peer: DuplexStream,
        task: JoinHandle<(Result<(), SessionError>, SessionState)>,
    }

    fn spawn_session(table: Arc<FileTable>, config: ServerConfig) -> Harness {
        let (peer, server) = duplex(1 << 20);
        let (read_half, write_half) = split(server);
        let task = tokio::spawn(async move {
            let mut session = Session::new(
                table,
                Arc::new(config),
                BufReader::new(read_half),
                write_half,
            );
            let result = session.run().await;
            (result, session.state())
        });
        Harness { peer, task }
    }

    async fn exchange(peer: &mut DuplexStream, input: &[u8], expect: &str) {
        peer.write_all(input).await.unwrap();
        let mut buf = vec![0u8; expect.len()];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&buf), expect, "after sending {input:?}");
    }

    #[tokio::test]
    async fn test_invalid_group_closes() {
        let table = Arc::new(FileTable::with_defaults());
        let mut h = spawn_session(table, ServerConfig::default());

        exchange(&mut h.peer, b"alice|EE-students\n", "Invalid group\n").await;
        let (result, state) = h.task.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(state, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_command_loop() {
        let table = Arc::new(FileTable::with_defaults());
        let mut h = spawn_session(table.clone(), ServerConfig::default());
        let p = &mut h.peer;

        exchange(p, b"alice|CSE-students\n", "\n").await;
        exchange(p, b"create notes.txt rw----\n", "File created successfully.\n").await;
        exchange(p, b"create notes.txt rwrwrw\n", "File notes.txt already exists.\n").await;
        exchange(p, b"create notes.txt\n", "Invalid command. Usage: create <filename> <rwrwrw>.\n").await;
        exchange(p, b"read notes.txt\n", "File notes.txt is empty.\nEND_OF_FILE\n").await;
        exchange(p, b"write notes.txt o\n", "Enter your content. End with an empty line:\n").await;
        exchange(p, b"hello\r\nworld\n\n", "File notes.txt written successfully with 10 bytes.\n").await;
        exchange(p, b"read notes.txt\n", "helloworldEND_OF_FILE\n").await;
        exchange(p, b"mode notes.txt rwr---\n", "Permissions of file notes.txt updated successfully.\n").await;
        exchange(p, b"mode nope rwr---\n", "file not exist\n").await;
        exchange(p, b"frobnicate\n", "Invalid command.\n").await;
        exchange(p, b"\n", "Invalid command.\n").await;
        p.write_all(b"exit\n").await.unwrap();

        let (result, state) = h.task.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(state, SessionState::Closed);
        assert_eq!(table.lookup("notes.txt").unwrap().permissions().as_str(), "rwr---");
    }

    #[tokio::test]
    async fn test_read_streams_in_chunks() {
        let table = Arc::new(FileTable::with_defaults());
        let alice = Identity::new("alice", Group::AosStudents);
        let record = table.create("big", &alice, "rw----").unwrap();
        {
            let mut w = record.try_write(WriteMode::Append).unwrap();
            w.ingest(&[b'x'; 100]);
        }

        let config = ServerConfig {
            chunk_size: 7,
            ..Default::default()
        };
        let mut h = spawn_session(table, config);
        let p = &mut h.peer;
        exchange(p, b"alice|AOS-students\n", "\n").await;
        let expected = format!("{}END_OF_FILE\n", "x".repeat(100));
        exchange(p, b"read big\n", &expected).await;
        p.write_all(b"exit\n").await.unwrap();
        assert!(h.task.await.unwrap().0.is_ok());
    }

    #[tokio::test]
    async fn test_long_command_line_rejected() {
        let table = Arc::new(FileTable::with_defaults());
        let mut h = spawn_session(table, ServerConfig::default());
        let p = &mut h.peer;

        exchange(p, b"bob|AOS-students\n", "\n").await;
        let mut long = vec![b'a'; 600];
        long.push(b'\n');
        exchange(p, &long, "Invalid command. Line exceeds 512 bytes.\n").await;
        exchange(p, b"read nope\n", "File nope not found.\nEND_OF_FILE\n").await;
        drop(h.peer);
        assert!(h.task.await.unwrap().0.is_ok());
    }

    #[tokio::test]
    async fn test_content_crlf_split_at_limit() {
        let table = Arc::new(FileTable::with_defaults());
        let config = ServerConfig {
            max_content_line: 8,
            ..Default::default()
        };
        let mut h = spawn_session(table.clone(), config);
        let p = &mut h.peer;

        exchange(p, b"alice|CSE-students\n", "\n").await;
        exchange(p, b"create f rw----\n", "File created successfully.\n").await;
        exchange(p, b"write f a\n", "Enter your content. End with an empty line:\n").await;

        // The `\n` of a line exactly at the limit arrives separately.
        p.write_all(b"12345678\r").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        exchange(p, b"\nsecond\n\n", "File f written successfully with 14 bytes.\n").await;
        exchange(p, b"read f\n", "12345678secondEND_OF_FILE\n").await;

        p.write_all(b"exit\n").await.unwrap();
        assert!(h.task.await.unwrap().0.is_ok());
        assert_eq!(table.lookup("f").unwrap().size(), 14);
    }

    #[tokio::test]
    async fn test_long_content_lines_ingested_in_pieces() {
        let table = Arc::new(FileTable::with_defaults());
        let config = ServerConfig {
            max_content_line: 4,
            ..Default::default()
        };
        let mut h = spawn_session(table.clone(), config);
        let p = &mut h.peer;

        exchange(p, b"bob|AOS-students\n", "\n").await;
        exchange(p, b"create f rw----\n", "File created successfully.\n").await;
        exchange(p, b"write f o\n", "Enter your content. End with an empty line:\n").await;
        // Over the limit, then exactly at it.
        exchange(
            p,
            b"abcdefghij\r\nwxyz\r\n\r\n",
            "File f written successfully with 14 bytes.\n",
        )
        .await;
        // Content never read as commands.
        exchange(p, b"read f\n", "abcdefghijwxyzEND_OF_FILE\n").await;

        p.write_all(b"exit\n").await.unwrap();
        assert!(h.task.await.unwrap().0.is_ok());
        assert_eq!(table.lookup("f").unwrap().size(), 14);
    }

    #[tokio::test]
    async fn test_disconnect_mid_write_releases_gate() {
        let table = Arc::new(FileTable::new(StoreConfig::default()));
        let mut h = spawn_session(table.clone(), ServerConfig::default());
        let p = &mut h.peer;

        exchange(p, b"alice|CSE-students\n", "\n").await;
        exchange(p, b"create f.txt rw----\n", "File created successfully.\n").await;
        exchange(p, b"write f.txt a\n", "Enter your content. End with an empty line:\n").await;
        p.write_all(b"partial line\n").await.unwrap();
        drop(h.peer);

        let (result, state) = h.task.await.unwrap();
        assert!(matches!(result, Err(SessionError::Closed)));
        assert_eq!(state, SessionState::Closed);

        let record = table.lookup("f.txt").unwrap();
        assert!(record.gate_state().is_idle());
        assert_eq!(record.size(), "partial line".len());
    }

    #[tokio::test]
    async fn test_denied_write_releases_gate() {
        let table = Arc::new(FileTable::with_defaults());
        let alice = Identity::new("alice", Group::CseStudents);
        table.create("f.txt", &alice, "rw----").unwrap();

        let mut h = spawn_session(table.clone(), ServerConfig::default());
        let p = &mut h.peer;
        exchange(p, b"bob|CSE-students\n", "\n").await;
        exchange(p, b"write f.txt a\n", "Permission denied: You cannot write to file f.txt.\n").await;
        exchange(p, b"mode f.txt rwrwrw\n", "Permission denied: You are not the owner.\n").await;
        assert!(table.lookup("f.txt").unwrap().gate_state().is_idle());
        p.write_all(b"exit\n").await.unwrap();
        assert!(h.task.await.unwrap().0.is_ok());
    }
}
