use futures::future::BoxFuture;
use tracing::debug;

use reverie_core::error::{Result, ReverieError};

/// A named bundle of externally-implemented operations.
///
/// Nodes invoke operations by string method name via [`Tool::dispatch`]
/// rather than importing the implementation directly. This is the seam
/// across which model invocation, memory search/store, and prompt assembly
/// are plugged into the workflow engine.
pub trait Tool: Send + Sync + 'static {
    /// Tool type name (unique within a registry).
    fn name(&self) -> &str;

    /// Method names this tool exposes.
    fn methods(&self) -> &[&str];

    /// Run one of this tool's methods with positional JSON arguments.
    ///
    /// Called through [`Tool::dispatch`]; implementations may assume
    /// `method` is one of [`Tool::methods`].
    fn invoke(
        &self,
        method: &str,
        args: Vec<serde_json::Value>,
    ) -> BoxFuture<'_, Result<serde_json::Value>>;

    /// Resolve and run a method by name.
    ///
    /// Fails with `ToolMethodNotFound` if the method is not exposed by this
    /// tool; any failure from the method itself is wrapped with the
    /// tool/method identity for diagnostics.
    fn dispatch<'a>(
        &'a self,
        method: &'a str,
        args: Vec<serde_json::Value>,
    ) -> BoxFuture<'a, Result<serde_json::Value>> {
        Box::pin(async move {
            if !self.methods().contains(&method) {
                return Err(ReverieError::ToolMethodNotFound {
                    tool: self.name().to_string(),
                    method: method.to_string(),
                });
            }

            debug!(
                tool = self.name(),
                method,
                arg_count = args.len(),
                "Dispatching tool method"
            );

            self.invoke(method, args)
                .await
                .map_err(|e| ReverieError::ToolExecution {
                    tool: self.name().to_string(),
                    method: method.to_string(),
                    message: e.to_string(),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn methods(&self) -> &[&str] {
            &["say", "fail"]
        }

        fn invoke(
            &self,
            method: &str,
            args: Vec<serde_json::Value>,
        ) -> BoxFuture<'_, Result<serde_json::Value>> {
            let method = method.to_string();
            Box::pin(async move {
                match method.as_str() {
                    "say" => Ok(args.into_iter().next().unwrap_or(serde_json::Value::Null)),
                    _ => Err(ReverieError::NodeExecution {
                        node: "inner".into(),
                        message: "forced failure".into(),
                    }),
                }
            })
        }
    }

    #[tokio::test]
    async fn test_dispatch_known_method() {
        let tool = EchoTool;
        let out = tool
            .dispatch("say", vec![serde_json::json!("hi")])
            .await
            .unwrap();
        assert_eq!(out, serde_json::json!("hi"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method() {
        let tool = EchoTool;
        let err = tool.dispatch("shout", vec![]).await.unwrap_err();
        match err {
            ReverieError::ToolMethodNotFound { tool, method } => {
                assert_eq!(tool, "echo");
                assert_eq!(method, "shout");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_wraps_internal_failure() {
        let tool = EchoTool;
        let err = tool.dispatch("fail", vec![]).await.unwrap_err();
        match err {
            ReverieError::ToolExecution { tool, method, message } => {
                assert_eq!(tool, "echo");
                assert_eq!(method, "fail");
                assert!(message.contains("forced failure"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
