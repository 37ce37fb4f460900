use std::io;

use scheduler_agent_core::tool::{ErrorKind as ToolErrorKind, Toolset};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeResult,
    ListToolsResult, PROTOCOL_VERSION, Request, Response, RpcError,
    ToolDescriptor, codes, methods,
};
use crate::toolbox::{SERVER_NAME, SERVER_VERSION};

/// Serves a toolset over line-delimited JSON-RPC.
///
/// Requests on one connection are handled concurrently and answered in
/// the order they arrive.
#[derive(Clone)]
pub struct ToolServer {
    toolset: Toolset,
    info: Implementation,
}

impl ToolServer {
    /// Creates a server for the given tools.
    pub fn new(toolset: Toolset) -> Self {
        Self {
            toolset,
            info: Implementation {
                name: SERVER_NAME.to_owned(),
                version: SERVER_VERSION.to_owned(),
            },
        }
    }

    /// Serves one connection until the reader reaches end of stream.
    ///
    /// Every request runs in its own task; responses are written in the
    /// order the requests arrived.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JoinHandle<Option<Response>>>();

        let read_loop = async move {
            let mut lines = BufReader::new(reader).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                let server = self.clone();
                let handle =
                    tokio::spawn(async move { server.handle_line(&line).await });
                if tx.send(handle).is_err() {
                    break;
                }
            }
            debug!("client closed the connection");
            Ok::<_, io::Error>(())
        };

        let write_loop = async move {
            let mut writer = writer;
            while let Some(handle) = rx.recv().await {
                let resp = match handle.await {
                    Ok(Some(resp)) => resp,
                    Ok(None) => continue,
                    Err(err) => {
                        error!("request task failed: {err}");
                        continue;
                    }
                };
                let mut encoded = serde_json::to_string(&resp)?;
                encoded.push('\n');
                writer.write_all(encoded.as_bytes()).await?;
                writer.flush().await?;
            }
            Ok::<_, io::Error>(())
        };

        tokio::try_join!(read_loop, write_loop)?;
        Ok(())
    }

    /// Serves the process's stdin and stdout.
    pub async fn serve_stdio(&self) -> io::Result<()> {
        info!("serving tools over stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Accepts TCP connections forever, one task per connection.
    pub async fn serve_tcp(&self, listener: TcpListener) -> io::Result<()> {
        info!("serving tools on {}", listener.local_addr()?);
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = self.clone();
            tokio::spawn(
                async move {
                    debug!("accepted");
                    let (reader, writer) = stream.into_split();
                    if let Err(err) = server.serve(reader, writer).await {
                        warn!("connection failed: {err}");
                    }
                }
                .instrument(info_span!("connection", %peer)),
            );
        }
    }

    async fn handle_line(&self, line: &str) -> Option<Response> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!("unparsable line: {err}");
                return Some(Response::failure(
                    Value::Null,
                    RpcError::new(codes::PARSE_ERROR, format!("Parse error: {err}")),
                ));
            }
        };
        let id = value.get("id").cloned();
        let req: Request = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(err) => {
                return Some(Response::failure(
                    id.unwrap_or(Value::Null),
                    RpcError::new(
                        codes::INVALID_REQUEST,
                        format!("Invalid request: {err}"),
                    ),
                ));
            }
        };

        let Some(id) = req.id else {
            trace!("notification: {}", req.method);
            return None;
        };
        let outcome = self
            .dispatch(&req.method, req.params)
            .instrument(debug_span!("request", method = %req.method))
            .await;
        Some(match outcome {
            Ok(result) => Response::success(id, result),
            Err(err) => Response::failure(id, err),
        })
    }

    async fn dispatch(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, RpcError> {
        match method {
            methods::INITIALIZE => to_value(&InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_owned(),
                server_info: self.info.clone(),
                capabilities: json!({ "tools": {} }),
            }),
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST => to_value(&ListToolsResult {
                tools: self
                    .toolset
                    .definitions()
                    .into_iter()
                    .map(|tool| ToolDescriptor {
                        name: tool.name,
                        description: tool.description,
                        input_schema: tool.parameters,
                    })
                    .collect(),
            }),
            methods::TOOLS_CALL => {
                let params: CallToolParams =
                    serde_json::from_value(params.unwrap_or(Value::Null))
                        .map_err(|err| {
                            RpcError::new(
                                codes::INVALID_PARAMS,
                                format!("Invalid params: {err}"),
                            )
                        })?;
                self.call_tool(params).await
            }
            _ => Err(RpcError::new(
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            )),
        }
    }

    async fn call_tool(&self, params: CallToolParams) -> Result<Value, RpcError> {
        let result = match self.toolset.call(&params.name, params.arguments).await {
            Ok(output) => CallToolResult::text(output, false),
            Err(err) => match err.kind() {
                ToolErrorKind::NotFound => {
                    return Err(RpcError::new(
                        codes::INVALID_PARAMS,
                        err.reason(),
                    ));
                }
                ToolErrorKind::Configuration => {
                    return Err(RpcError::new(
                        codes::CONFIGURATION_ERROR,
                        err.reason(),
                    ));
                }
                _ => {
                    debug!("tool `{}` failed: {err}", params.name);
                    CallToolResult::text(err.reason(), true)
                }
            },
        };
        to_value(&result)
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|err| {
        RpcError::new(codes::INTERNAL_ERROR, format!("Internal error: {err}"))
    })
}
