use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use scheduler_agent_core::tool::{Error as ToolError, Tool, ToolResult, Toolset};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use crate::protocol::{
    CallToolParams, CallToolResult, InitializeResult, ListToolsResult,
    PROTOCOL_VERSION, Request, Response, RpcError, ToolDescriptor, codes,
    methods,
};

/// Where to find a tool server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportConfig {
    /// Spawn a child process and talk over its stdin and stdout.
    Stdio {
        /// Program to run.
        command: String,
        /// Program arguments.
        args: Vec<String>,
    },
    /// Connect to a listening server.
    Tcp {
        /// Host name or address.
        host: String,
        /// Port.
        port: u16,
    },
}

/// Errors while talking to a tool server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server process could not be started.
    #[error("failed to spawn `{command}`")]
    Spawn {
        /// Program that failed to start.
        command: String,
        /// Cause.
        #[source]
        source: io::Error,
    },
    /// Reading from or writing to the transport failed.
    #[error("tool server transport failed")]
    Io(#[from] io::Error),
    /// The server went away before answering.
    #[error("tool server closed the connection")]
    Closed,
    /// The server answered with an error object.
    #[error("tool server returned an error: {0}")]
    Rpc(RpcError),
    /// The server answered with something unexpected.
    #[error("unexpected reply from tool server: {0}")]
    Protocol(String),
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type SharedWriter = Arc<Mutex<BoxedWriter>>;
// `None` once the reader has stopped; no request may wait after that.
type PendingMap = Arc<Mutex<Option<HashMap<u64, oneshot::Sender<Response>>>>>;

/// One JSON-RPC connection shared by every remote tool.
///
/// Responses are matched to requests by id, so calls may overlap.
struct Connection {
    writer: SharedWriter,
    pending: PendingMap,
    next_id: AtomicU64,
    reader_task: JoinHandle<()>,
    // Killed when the connection is dropped.
    _child: std::sync::Mutex<Option<Child>>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

impl Connection {
    fn new<R, W>(reader: R, writer: W, child: Option<Child>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: BoxedWriter = Box::new(writer);
        let writer = Arc::new(Mutex::new(writer));
        let pending: PendingMap = Arc::new(Mutex::new(Some(HashMap::new())));
        let reader_task = tokio::spawn(read_messages(
            reader,
            Arc::clone(&writer),
            Arc::clone(&pending),
        ));
        Self {
            writer,
            pending,
            next_id: AtomicU64::new(1),
            reader_task,
            _child: std::sync::Mutex::new(child),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        match self.pending.lock().await.as_mut() {
            Some(pending) => {
                pending.insert(id, tx);
            }
            None => return Err(ClientError::Closed),
        }

        trace!(id, method, "sending request");
        if let Err(err) =
            write_line(&self.writer, &Request::new(id, method, params)).await
        {
            if let Some(pending) = self.pending.lock().await.as_mut() {
                pending.remove(&id);
            }
            return Err(err);
        }

        let resp = rx.await.map_err(|_| ClientError::Closed)?;
        if let Some(err) = resp.error {
            return Err(ClientError::Rpc(err));
        }
        serde_json::from_value(resp.result.unwrap_or(Value::Null))
            .map_err(|err| ClientError::Protocol(format!("{method}: {err}")))
    }

    async fn notify(&self, method: &str) -> Result<(), ClientError> {
        write_line(&self.writer, &Request::notification(method)).await
    }
}

async fn write_line<T: Serialize>(
    writer: &Mutex<BoxedWriter>,
    message: &T,
) -> Result<(), ClientError> {
    let mut line = serde_json::to_string(message)
        .map_err(|err| ClientError::Protocol(err.to_string()))?;
    line.push('\n');
    let mut writer = writer.lock().await;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_messages<R: AsyncRead + Unpin>(
    reader: R,
    writer: SharedWriter,
    pending: PendingMap,
) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!("failed to read from tool server: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(err) => {
                warn!("ignoring malformed line from tool server: {err}");
                continue;
            }
        };
        if value.get("method").is_some() {
            answer_server_request(&writer, value).await;
            continue;
        }
        let resp: Response = match serde_json::from_value(value) {
            Ok(resp) => resp,
            Err(err) => {
                warn!("ignoring malformed response from tool server: {err}");
                continue;
            }
        };
        let Some(id) = resp.id.as_u64() else {
            debug!("ignoring message without a request id");
            continue;
        };
        let tx = pending.lock().await.as_mut().and_then(|p| p.remove(&id));
        match tx {
            Some(tx) => {
                tx.send(resp).ok();
            }
            None => debug!(id, "ignoring response to an unknown request"),
        }
    }
    debug!("tool server connection closed");
    // Dropping the senders fails every waiting request, and later
    // requests see the closed map.
    pending.lock().await.take();
}

/// Handles a request or notification sent by the server.
async fn answer_server_request(writer: &Mutex<BoxedWriter>, value: Value) {
    let req: Request = match serde_json::from_value(value) {
        Ok(req) => req,
        Err(err) => {
            warn!("ignoring malformed request from tool server: {err}");
            return;
        }
    };
    let Some(id) = req.id else {
        trace!("server notification: {}", req.method);
        return;
    };
    let resp = match req.method.as_str() {
        methods::PING => Response::success(id, json!({})),
        method => {
            debug!("tool server sent unsupported request `{method}`");
            Response::failure(
                id,
                RpcError::new(
                    codes::METHOD_NOT_FOUND,
                    format!("Method not found: {method}"),
                ),
            )
        }
    };
    if let Err(err) = write_line(writer, &resp).await {
        warn!("failed to answer tool server: {err}");
    }
}

/// The tools of a remote tool server.
pub struct RemoteToolset {
    connection: Arc<Connection>,
    tools: Vec<ToolDescriptor>,
}

impl RemoteToolset {
    /// Connects to a tool server, performs the handshake and lists its
    /// tools.
    pub async fn connect(config: &TransportConfig) -> Result<Self, ClientError> {
        match config {
            TransportConfig::Stdio { command, args } => {
                info!("spawning tool server `{command}`");
                let mut child = Command::new(command)
                    .args(args)
                    .stdin(std::process::Stdio::piped())
                    .stdout(std::process::Stdio::piped())
                    .kill_on_drop(true)
                    .spawn()
                    .map_err(|source| ClientError::Spawn {
                        command: command.clone(),
                        source,
                    })?;
                let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take())
                else {
                    return Err(ClientError::Protocol(
                        "child process has no stdio pipes".to_owned(),
                    ));
                };
                Self::handshake(Connection::new(stdout, stdin, Some(child))).await
            }
            TransportConfig::Tcp { host, port } => {
                info!("connecting to tool server at {host}:{port}");
                let stream = TcpStream::connect((host.as_str(), *port)).await?;
                let (reader, writer) = stream.into_split();
                Self::handshake(Connection::new(reader, writer, None)).await
            }
        }
    }

    /// Runs the protocol over an already established byte stream.
    pub async fn from_streams<R, W>(reader: R, writer: W) -> Result<Self, ClientError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::handshake(Connection::new(reader, writer, None)).await
    }

    async fn handshake(connection: Connection) -> Result<Self, ClientError> {
        let init: InitializeResult = connection
            .request(
                methods::INITIALIZE,
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                })),
            )
            .await?;
        if init.protocol_version != PROTOCOL_VERSION {
            warn!(
                "tool server speaks protocol {}, expected {PROTOCOL_VERSION}",
                init.protocol_version
            );
        }
        connection.notify(methods::INITIALIZED).await?;

        let listed: ListToolsResult =
            connection.request(methods::TOOLS_LIST, None).await?;
        info!(
            server = %init.server_info.name,
            version = %init.server_info.version,
            tools = listed.tools.len(),
            "connected to tool server"
        );
        Ok(Self {
            connection: Arc::new(connection),
            tools: listed.tools,
        })
    }

    /// Returns the descriptors reported by the server.
    #[inline]
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Sends a `ping` request.
    pub async fn ping(&self) -> Result<(), ClientError> {
        self.connection
            .request::<Value>(methods::PING, None)
            .await
            .map(drop)
    }

    /// Wraps every remote tool as a local [`Tool`].
    ///
    /// The connection stays open as long as any of the tools is alive.
    pub fn into_toolset(self) -> Toolset {
        let mut toolset = Toolset::new();
        for descriptor in self.tools {
            toolset.add_tool(RemoteTool {
                connection: Arc::clone(&self.connection),
                descriptor,
            });
        }
        toolset
    }
}

struct RemoteTool {
    connection: Arc<Connection>,
    descriptor: ToolDescriptor,
}

impl Tool for RemoteTool {
    type Input = Value;

    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn parameter_schema(&self) -> &Value {
        &self.descriptor.input_schema
    }

    fn execute(
        &self,
        input: Value,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let connection = Arc::clone(&self.connection);
        let params = CallToolParams {
            name: self.descriptor.name.clone(),
            arguments: input,
        };
        async move {
            let params = serde_json::to_value(&params).map_err(|err| {
                ToolError::invalid_input().with_reason(err.to_string())
            })?;
            let result: CallToolResult = connection
                .request(methods::TOOLS_CALL, Some(params))
                .await
                .map_err(tool_error_from_client)?;
            let text = result.joined_text();
            if result.is_error {
                Err(ToolError::execution_error().with_reason(text))
            } else {
                Ok(text)
            }
        }
    }
}

fn tool_error_from_client(err: ClientError) -> ToolError {
    let ClientError::Rpc(rpc) = err else {
        return ToolError::execution_error()
            .with_reason(format!("tool server unavailable: {err}"));
    };
    let base = match rpc.code {
        codes::CONFIGURATION_ERROR => ToolError::configuration(),
        codes::INVALID_PARAMS if rpc.message.starts_with("Tool not found") => {
            ToolError::not_found()
        }
        codes::INVALID_PARAMS => ToolError::invalid_input(),
        _ => ToolError::execution_error(),
    };
    base.with_reason(rpc.message)
}
