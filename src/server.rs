use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::{Result, MediaRpcError};
use crate::protocol::{
    self, CallParams, RpcRequest, RpcResponse, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND,
    PARSE_ERROR,
};

/// Line-oriented JSON-RPC server around a [`Dispatcher`]
#[derive(Clone)]
pub struct Server {
    dispatcher: Arc<Dispatcher>,
    permits: Arc<Semaphore>,
}

impl Server {
    pub fn new(dispatcher: Arc<Dispatcher>, max_concurrent_requests: usize) -> Self {
        Self {
            dispatcher,
            permits: Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
        }
    }

    /// Serve on the process's stdin/stdout until stdin closes
    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run(stdin, stdout).await
    }

    /// Read requests line by line, handle each in its own task and write
    /// responses in completion order. Returns once the reader hits EOF and
    /// every in-flight request has been answered. A read error stops
    /// reading but still lets pending answers go out.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::channel::<RpcResponse>(64);

        let read_side = async move {
            let mut buf = Vec::new();
            loop {
                if tx.is_closed() {
                    break;
                }
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Stopped reading requests: {}", e);
                        break;
                    }
                }
                let line = match std::str::from_utf8(&buf) {
                    Ok(line) => line.trim().to_string(),
                    Err(e) => {
                        warn!("Request is not valid UTF-8: {}", e);
                        let reply = RpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e));
                        if tx.send(reply).await.is_err() {
                            break;
                        }
                        continue;
                    }
                };
                if line.is_empty() {
                    continue;
                }
                let server = self.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(response) = server.handle_line(&line).await {
                        if tx.send(response).await.is_err() {
                            warn!("Response channel closed before reply could be sent");
                        }
                    }
                });
            }
            debug!("Input closed, waiting for in-flight requests");
        };

        let write_side = async move {
            while let Some(response) = rx.recv().await {
                let mut line = serde_json::to_string(&response)?;
                line.push('\n');
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
            Ok::<(), MediaRpcError>(())
        };

        let ((), written) = tokio::join!(read_side, write_side);
        written?;
        info!("Server loop finished");
        Ok(())
    }

    /// Handle one raw line. `None` means nothing should be written back.
    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparseable request: {}", e);
                return Some(RpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)));
            }
        };
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: RpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(RpcResponse::error(id, INVALID_REQUEST, format!("Invalid request: {}", e)));
            }
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(RpcResponse::error(id, INVALID_REQUEST, "Unsupported jsonrpc version"));
        }
        self.handle_request(request).await
    }

    pub async fn handle_request(&self, request: RpcRequest) -> Option<RpcResponse> {
        if request.is_notification() {
            debug!("Notification: {}", request.method);
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => RpcResponse::result(
                id,
                protocol::initialize_result(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            ),
            "ping" => RpcResponse::result(id, serde_json::json!({})),
            "tools/list" => RpcResponse::result(id, protocol::tools_list_result(self.dispatcher.list_operations())),
            "tools/call" => match serde_json::from_value::<CallParams>(request.params) {
                Ok(params) => {
                    let _permit = match self.permits.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return Some(RpcResponse::error(id, INVALID_REQUEST, "Server is shutting down")),
                    };
                    info!("tools/call {}", params.name);
                    let envelope = self.dispatcher.dispatch(&params.name, &params.arguments).await;
                    RpcResponse::result(id, protocol::tool_call_result(&envelope))
                }
                Err(e) => RpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
            },
            other => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
        };
        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::Config;
    use crate::process::{MockProcessRunner, ProcessOutput};
    use crate::workspace::MockWorkspace;
    use serde_json::json;

    fn server(runner: MockProcessRunner) -> Server {
        let mut workspace = MockWorkspace::new();
        workspace.expect_exists().returning(|_| true);
        let dispatcher = Dispatcher::new(
            Arc::new(Catalog::builtin().unwrap()),
            &Config::default(),
            Arc::new(runner),
            Arc::new(workspace),
        );
        Server::new(Arc::new(dispatcher), 2)
    }

    #[tokio::test]
    async fn test_tools_list_reflects_catalog() {
        let server = server(MockProcessRunner::new());
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = response.result.unwrap()["tools"].as_array().cloned().unwrap();
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(tools.len(), catalog.len());
        for (tool, descriptor) in tools.iter().zip(catalog.list()) {
            assert_eq!(tool["name"], descriptor.name.as_str());
            assert_eq!(tool["inputSchema"]["required"], json!(descriptor.required));
        }
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let server = server(MockProcessRunner::new());
        let reply = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_null_id_is_answered() {
        let server = server(MockProcessRunner::new());
        let reply = server
            .handle_line(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(reply.id, Value::Null);
        assert_eq!(reply.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server(MockProcessRunner::new());

        let parse = server.handle_line("{not json").await.unwrap();
        assert_eq!(parse.error.unwrap().code, PARSE_ERROR);
        assert_eq!(parse.id, Value::Null);

        let unknown = server
            .handle_line(r#"{"jsonrpc":"2.0","id":"a","method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(unknown.error.unwrap().code, METHOD_NOT_FOUND);
        assert_eq!(unknown.id, json!("a"));

        let bad_params = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"arguments":{}}}"#)
            .await
            .unwrap();
        assert_eq!(bad_params.error.unwrap().code, INVALID_PARAMS);

        let old = server
            .handle_line(r#"{"jsonrpc":"1.0","id":4,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(old.error.unwrap().code, INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_tool_call_unknown_operation_is_result_not_error() {
        let server = server(MockProcessRunner::new());
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#)
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["error"], "unknown_operation");
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_gets_parse_error_and_loop_continues() {
        let server = server(MockProcessRunner::new());

        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#);
        input.push(b'\n');

        let mut output = Vec::new();
        server.run(input.as_slice(), &mut output).await.unwrap();

        let responses: Vec<RpcResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        let parse = responses.iter().find(|r| r.error.is_some()).unwrap();
        assert_eq!(parse.id, Value::Null);
        assert_eq!(parse.error.as_ref().unwrap().code, PARSE_ERROR);
        assert!(responses.iter().any(|r| r.id == json!(1)));
        assert!(responses.iter().any(|r| r.id == json!(3)));
    }

    #[tokio::test]
    async fn test_run_answers_every_request() {
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|_| Ok(ProcessOutput::succeeded("ok")));
        let server = server(runner);

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"rotate_video","arguments":{"input":"a.mp4","output":"b.mp4","rotation":"90"}}}"#, "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#, "\n",
        );
        let mut output = Vec::new();
        server.run(input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<RpcResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);

        let mut ids: Vec<i64> = responses.iter().map(|r| r.id.as_i64().unwrap()).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);

        let call = responses.iter().find(|r| r.id == json!(2)).unwrap();
        assert_eq!(call.result.as_ref().unwrap()["isError"], false);

        let init = responses.iter().find(|r| r.id == json!(1)).unwrap();
        assert_eq!(init.result.as_ref().unwrap()["serverInfo"]["name"], "mediarpc");
    }
}
