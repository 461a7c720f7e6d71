//! The connection shim: owns the byte stream, feeds inbound lines into
//! the dispatch queue and serializes outbound messages onto the wire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::codec::{decode_line, Message};
use crate::dispatch::DispatchQueue;
use crate::error::{ElkError, Result};
use crate::event::{EventSender, PanelEvent};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One panel connection: a locked writer half and a reader task that
/// is the dispatch queue's only producer.
pub struct Connection {
    writer: Mutex<BoxedWriter>,
    queue: Arc<DispatchQueue>,
    connected: Arc<AtomicBool>,
    reader_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Connect to the panel's M1XEP interface over TCP.
    pub async fn connect_tcp(address: &str, event_tx: EventSender) -> Result<Arc<Self>> {
        info!("connecting to panel at {address}");
        let stream = TcpStream::connect(address).await.map_err(|e| {
            error!("TCP connect failed: {e}");
            ElkError::Io(e)
        })?;
        Ok(Self::from_stream(stream, event_tx))
    }

    /// Wrap an established byte stream (TCP socket, serial device,
    /// test duplex) and start the reader task.
    pub fn from_stream<S>(stream: S, event_tx: EventSender) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let queue = Arc::new(DispatchQueue::new());
        let connected = Arc::new(AtomicBool::new(true));

        let handle = spawn_reader_task(read_half, queue.clone(), connected.clone(), event_tx);

        Arc::new(Self {
            writer: Mutex::new(Box::new(write_half)),
            queue,
            connected,
            reader_handle: std::sync::Mutex::new(Some(handle)),
        })
    }

    /// The inbound message queue fed by this connection's reader task.
    pub fn queue(&self) -> &Arc<DispatchQueue> {
        &self.queue
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Serialize and send one message. The frame and its terminator go
    /// out as a single locked write so concurrent senders can never
    /// interleave partial frames.
    pub async fn send(&self, msg: &Message) -> Result<()> {
        if !self.is_connected() {
            return Err(ElkError::Disconnected);
        }
        let mut frame = msg.encode();
        frame.push_str("\r\n");
        debug!("sending {} frame", msg.kind);

        let mut writer = self.writer.lock().await;
        writer.write_all(frame.as_bytes()).await.map_err(|e| {
            error!("failed to write {} frame: {e}", msg.kind);
            ElkError::Io(e)
        })?;
        writer.flush().await.map_err(ElkError::Io)?;
        Ok(())
    }

    /// Tear the connection down: stop the reader, close the queue and
    /// unblock every pending wait.
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.queue.close();
        if let Ok(mut handle) = self.reader_handle.lock() {
            if let Some(h) = handle.take() {
                h.abort();
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Spawn the task that owns the read half: frame the byte stream into
/// lines, decode each one and enqueue it. A malformed line is logged
/// and dropped; it never reaches entity code and never kills the task.
fn spawn_reader_task<R>(
    mut reader: R,
    queue: Arc<DispatchQueue>,
    connected: Arc<AtomicBool>,
    event_tx: EventSender,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        let mut pending = Vec::new();

        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    debug!("reader: connection closed by peer");
                    break;
                }
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    for line in take_lines(&mut pending) {
                        match decode_line(&line) {
                            Ok(msg) => queue.enqueue(msg).await,
                            Err(e) => warn!("dropping bad frame {line:?}: {e}"),
                        }
                    }
                }
                Err(e) => {
                    error!("reader: read error: {e}");
                    break;
                }
            }
        }

        connected.store(false, Ordering::SeqCst);
        queue.close();
        let _ = event_tx.send(PanelEvent::Disconnected);
    })
}

/// Split complete CR/LF-terminated lines off the front of the buffer,
/// leaving any partial trailing line in place.
fn take_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    for i in 0..pending.len() {
        if pending[i] == b'\n' {
            let mut end = i;
            if end > start && pending[end - 1] == b'\r' {
                end -= 1;
            }
            let line = String::from_utf8_lossy(&pending[start..end]).into_owned();
            if !line.is_empty() {
                lines.push(line);
            }
            start = i + 1;
        }
    }
    pending.drain(..start);
    lines
}
