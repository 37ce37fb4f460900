use std::time::Duration;

use scheduler_agent_core::tool::ErrorKind;
use scheduler_agent_toolbox::{RemoteToolset, TavilyConfig, ToolServer, Toolbox};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, duplex};
use tokio::net::TcpListener;
use tokio::time::timeout;

fn server() -> ToolServer {
    ToolServer::new(Toolbox::builtin(TavilyConfig::new(None)).into_toolset())
}

async fn in_memory_remote() -> RemoteToolset {
    let (client_end, server_end) = duplex(64 * 1024);
    tokio::spawn(async move {
        let (reader, writer) = tokio::io::split(server_end);
        server().serve(reader, writer).await.ok();
    });
    let (reader, writer) = tokio::io::split(client_end);
    RemoteToolset::from_streams(reader, writer).await.unwrap()
}

#[tokio::test]
async fn test_remote_round_trip() {
    let remote = in_memory_remote().await;
    let names: Vec<_> = remote.descriptors().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["add", "search_langgraph_docs", "search_fastmcp_docs", "status"]
    );
    remote.ping().await.unwrap();

    let toolset = remote.into_toolset();
    assert_eq!(toolset.len(), 4);
    let add = toolset
        .definitions()
        .into_iter()
        .find(|tool| tool.name == "add")
        .unwrap();
    assert_eq!(add.parameters["type"], "object");

    let sum = toolset.call("add", json!({ "a": 2, "b": 2 })).await;
    assert_eq!(sum, Ok("4".to_owned()));

    let status = toolset.call("status", Value::Null).await.unwrap();
    let status: Value = serde_json::from_str(&status).unwrap();
    assert_eq!(status["status"], "ok");
}

#[tokio::test]
async fn test_remote_errors_keep_their_kind() {
    let toolset = in_memory_remote().await.into_toolset();

    let err = toolset
        .call("add", json!({ "a": i64::MAX, "b": 1 }))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExecutionError);

    let err = toolset
        .call("search_langgraph_docs", json!({ "query": "StateGraph" }))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_concurrent_remote_calls() {
    let toolset = in_memory_remote().await.into_toolset();
    let calls: Vec<_> = (0..8)
        .map(|i| tokio::spawn(toolset.call("add", json!({ "a": i, "b": 100 }))))
        .collect();
    for (i, call) in calls.into_iter().enumerate() {
        assert_eq!(call.await.unwrap(), Ok((i + 100).to_string()));
    }
}

#[tokio::test]
async fn test_tcp_transport() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move { server().serve_tcp(listener).await.ok() });

    let remote = RemoteToolset::connect(&scheduler_agent_toolbox::TransportConfig::Tcp {
        host: "127.0.0.1".to_owned(),
        port,
    })
    .await
    .unwrap();
    let toolset = remote.into_toolset();
    let sum = toolset.call("add", json!({ "a": 40, "b": 2 })).await;
    assert_eq!(sum, Ok("42".to_owned()));
}

#[tokio::test]
async fn test_connect_failures() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let result = RemoteToolset::connect(&scheduler_agent_toolbox::TransportConfig::Tcp {
        host: "127.0.0.1".to_owned(),
        port,
    })
    .await;
    assert!(result.is_err());

    let result = RemoteToolset::connect(&scheduler_agent_toolbox::TransportConfig::Stdio {
        command: "/nonexistent/scheduler-tool-server".to_owned(),
        args: vec![],
    })
    .await;
    assert!(matches!(
        result,
        Err(scheduler_agent_toolbox::ClientError::Spawn { .. })
    ));
}

#[tokio::test]
async fn test_calls_fail_after_server_goes_away() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let serving = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, writer) = stream.into_split();
        server().serve(reader, writer).await.ok();
    });

    let toolset = RemoteToolset::connect(&scheduler_agent_toolbox::TransportConfig::Tcp {
        host: "127.0.0.1".to_owned(),
        port,
    })
    .await
    .unwrap()
    .into_toolset();
    serving.abort();
    tokio::time::sleep(Duration::from_millis(200)).await;

    for _ in 0..2 {
        let err = timeout(
            Duration::from_secs(3),
            toolset.call("add", json!({ "a": 2, "b": 2 })),
        )
        .await
        .expect("call hung after the tool server went away")
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionError);
    }
}

async fn send_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) {
    writer.write_all(format!("{line}\n").as_bytes()).await.unwrap();
}

#[tokio::test]
async fn test_server_requests_are_answered() {
    let (client_end, server_end) = duplex(64 * 1024);
    let fake_server = tokio::spawn(async move {
        let (reader, mut writer) = tokio::io::split(server_end);
        let mut lines = BufReader::new(reader).lines();

        let init: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(init["method"], "initialize");
        // Same id as the pending `initialize`, but it is a request.
        send_line(&mut writer, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await;
        let pong: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

        send_line(&mut writer, r#"{"jsonrpc":"2.0","method":"notifications/message","params":{}}"#).await;
        send_line(&mut writer, r#"{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","serverInfo":{"name":"calendar","version":"1.0.0"}}}"#).await;
        let initialized: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(initialized["method"], "notifications/initialized");
        let list: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(list["method"], "tools/list");
        send_line(&mut writer, &format!(
            r#"{{"jsonrpc":"2.0","id":{},"result":{{"tools":[]}}}}"#,
            list["id"]
        ))
        .await;
        pong
    });

    let (reader, writer) = tokio::io::split(client_end);
    let remote = timeout(
        Duration::from_secs(3),
        RemoteToolset::from_streams(reader, writer),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(remote.descriptors().is_empty());

    let pong = fake_server.await.unwrap();
    assert_eq!(pong["id"], 1);
    assert_eq!(pong["result"], json!({}));
    assert!(pong.get("method").is_none());
}
