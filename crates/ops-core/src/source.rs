//! Tool Sources
//!
//! A tool source is an external system that advertises tools over a
//! connection. Connections to every configured source are held together by
//! a [`SourceScope`]: they are opened in declared order and released in
//! reverse order, including when opening fails partway through.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::tool::{Tool, ToolSet};

/// An external system exposing tools
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Short identifier used in logs and errors
    fn name(&self) -> &str;

    /// Open a connection to the source
    async fn connect(&self) -> Result<Box<dyn SourceConnection>>;
}

/// A live connection to a tool source
#[async_trait]
pub trait SourceConnection: Send + Sync {
    /// Name of the source this connection belongs to
    fn source_name(&self) -> &str;

    /// Enumerate the tools advertised by the source, in source order
    async fn list_tools(&self) -> Result<Vec<Arc<dyn Tool>>>;

    /// Release the connection
    async fn close(&self) -> Result<()>;
}

fn as_connectivity(source_name: &str, err: AgentError) -> AgentError {
    match err {
        err @ AgentError::Connectivity { .. } => err,
        other => AgentError::connectivity(source_name, other),
    }
}

/// Connections to a fixed list of sources, released together
pub struct SourceScope {
    connections: Vec<Box<dyn SourceConnection>>,
    released: bool,
}

impl SourceScope {
    /// Connect to every source in order.
    ///
    /// If any connection fails, the ones already opened are closed in
    /// reverse order before the error is returned.
    pub async fn open(sources: &[Arc<dyn ToolSource>]) -> Result<Self> {
        let mut scope = Self {
            connections: Vec::with_capacity(sources.len()),
            released: false,
        };

        for source in sources {
            tracing::debug!(source = source.name(), "Connecting to tool source");
            match source.connect().await {
                Ok(connection) => scope.connections.push(connection),
                Err(err) => {
                    tracing::error!(source = source.name(), error = %err, "Tool source connection failed");
                    scope.release().await;
                    return Err(as_connectivity(source.name(), err));
                }
            }
        }

        Ok(scope)
    }

    /// Names of the connected sources, in connection order
    pub fn source_names(&self) -> Vec<&str> {
        self.connections.iter().map(|c| c.source_name()).collect()
    }

    /// Fetch every source's tools and merge them, first-seen name wins.
    ///
    /// A failing listing fails the whole aggregation.
    pub async fn aggregate(&self) -> Result<ToolSet> {
        let mut lists = Vec::with_capacity(self.connections.len());

        for connection in &self.connections {
            let tools = connection
                .list_tools()
                .await
                .map_err(|err| as_connectivity(connection.source_name(), err))?;
            tracing::debug!(
                source = connection.source_name(),
                count = tools.len(),
                "Listed tools"
            );
            lists.push(tools);
        }

        let set = ToolSet::aggregate(lists);
        tracing::debug!(tools = ?set, "Aggregated tool set");
        Ok(set)
    }

    /// Close every connection in reverse order
    pub async fn close(mut self) {
        self.release().await;
    }

    async fn release(&mut self) {
        close_in_reverse(std::mem::take(&mut self.connections)).await;
        self.released = true;
    }
}

async fn close_in_reverse(mut connections: Vec<Box<dyn SourceConnection>>) {
    while let Some(connection) = connections.pop() {
        if let Err(err) = connection.close().await {
            tracing::warn!(
                source = connection.source_name(),
                error = %err,
                "Failed to close tool source connection"
            );
        }
    }
}

/// A scope dropped while still open (its future was cancelled) hands its
/// connections to a background task that closes them in reverse order.
impl Drop for SourceScope {
    fn drop(&mut self) {
        if self.released || self.connections.is_empty() {
            return;
        }
        let connections = std::mem::take(&mut self.connections);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    open = connections.len(),
                    "Source scope dropped without close, releasing in background"
                );
                handle.spawn(close_in_reverse(connections));
            }
            Err(_) => tracing::error!(
                open = connections.len(),
                "Source scope dropped outside a runtime, connections abandoned"
            ),
        }
    }
}

/// Open all sources, aggregate their tools, run `f`, then close the scope.
///
/// The scope is closed on every path out of this function once it has been
/// opened, whether aggregation or `f` fails or not.
pub async fn with_tools<F, Fut, T>(sources: &[Arc<dyn ToolSource>], f: F) -> Result<T>
where
    F: FnOnce(ToolSet) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let scope = SourceScope::open(sources).await?;

    let tools = match scope.aggregate().await {
        Ok(tools) => tools,
        Err(err) => {
            scope.close().await;
            return Err(err);
        }
    };

    let result = f(tools).await;
    scope.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ToolCall, ToolResult, ToolSchema};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Stub(&'static str);

    #[async_trait]
    impl Tool for Stub {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.0.into(),
                ..Default::default()
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            Ok(ToolResult::success(&call.name, "ok"))
        }
    }

    struct FakeSource {
        name: &'static str,
        tools: Vec<&'static str>,
        fail_connect: bool,
        fail_list: bool,
        log: Log,
    }

    impl FakeSource {
        fn new(name: &'static str, tools: Vec<&'static str>, log: &Log) -> Self {
            Self {
                name,
                tools,
                fail_connect: false,
                fail_list: false,
                log: Arc::clone(log),
            }
        }
    }

    struct FakeConnection {
        name: &'static str,
        tools: Vec<&'static str>,
        fail_list: bool,
        log: Log,
    }

    #[async_trait]
    impl ToolSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn connect(&self) -> Result<Box<dyn SourceConnection>> {
            if self.fail_connect {
                return Err(AgentError::Other("connection refused".into()));
            }
            self.log.lock().unwrap().push(format!("open {}", self.name));
            Ok(Box::new(FakeConnection {
                name: self.name,
                tools: self.tools.clone(),
                fail_list: self.fail_list,
                log: Arc::clone(&self.log),
            }))
        }
    }

    #[async_trait]
    impl SourceConnection for FakeConnection {
        fn source_name(&self) -> &str {
            self.name
        }

        async fn list_tools(&self) -> Result<Vec<Arc<dyn Tool>>> {
            if self.fail_list {
                return Err(AgentError::Other("listing failed".into()));
            }
            Ok(self
                .tools
                .iter()
                .map(|t| Arc::new(Stub(*t)) as Arc<dyn Tool>)
                .collect())
        }

        async fn close(&self) -> Result<()> {
            self.log.lock().unwrap().push(format!("close {}", self.name));
            Ok(())
        }
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_open_and_close_order() {
        let log = Log::default();
        let sources: Vec<Arc<dyn ToolSource>> = vec![
            Arc::new(FakeSource::new("cmms", vec!["a"], &log)),
            Arc::new(FakeSource::new("erp", vec!["b"], &log)),
            Arc::new(FakeSource::new("mes", vec!["c"], &log)),
        ];

        let scope = SourceScope::open(&sources).await.unwrap();
        assert_eq!(scope.source_names(), vec!["cmms", "erp", "mes"]);
        scope.close().await;

        assert_eq!(
            entries(&log),
            vec!["open cmms", "open erp", "open mes", "close mes", "close erp", "close cmms"]
        );
    }

    #[tokio::test]
    async fn test_failed_connect_releases_opened_sources() {
        let log = Log::default();
        let mut broken = FakeSource::new("mes", vec![], &log);
        broken.fail_connect = true;
        let sources: Vec<Arc<dyn ToolSource>> = vec![
            Arc::new(FakeSource::new("cmms", vec![], &log)),
            Arc::new(FakeSource::new("erp", vec![], &log)),
            Arc::new(broken),
            Arc::new(FakeSource::new("wpms", vec![], &log)),
        ];

        let err = SourceScope::open(&sources).await.err().unwrap();
        match err {
            AgentError::Connectivity { source_name, .. } => assert_eq!(source_name, "mes"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            entries(&log),
            vec!["open cmms", "open erp", "close erp", "close cmms"]
        );
    }

    #[tokio::test]
    async fn test_with_tools_aggregates_in_source_order() {
        let log = Log::default();
        let sources: Vec<Arc<dyn ToolSource>> = vec![
            Arc::new(FakeSource::new("erp", vec!["get_inventory", "get_production_orders"], &log)),
            Arc::new(FakeSource::new(
                "mes",
                vec!["get_production_orders", "get_line_status"],
                &log,
            )),
        ];

        let names = with_tools(&sources, |tools| async move {
            Ok(tools.names().iter().map(ToString::to_string).collect::<Vec<_>>())
        })
        .await
        .unwrap();

        assert_eq!(
            names,
            vec!["get_inventory", "get_production_orders", "get_line_status"]
        );
        assert_eq!(entries(&log).last().map(String::as_str), Some("close erp"));
    }

    #[tokio::test]
    async fn test_failed_listing_fails_whole_aggregation() {
        let log = Log::default();
        let mut broken = FakeSource::new("wpms", vec!["get_employees"], &log);
        broken.fail_list = true;
        let sources: Vec<Arc<dyn ToolSource>> = vec![
            Arc::new(FakeSource::new("cmms", vec!["get_work_orders"], &log)),
            Arc::new(broken),
        ];

        let result = with_tools(&sources, |_| async { Ok(()) }).await;
        assert!(matches!(result, Err(AgentError::Connectivity { .. })));
        assert_eq!(
            entries(&log),
            vec!["open cmms", "open wpms", "close wpms", "close cmms"]
        );
    }

    #[tokio::test]
    async fn test_scope_closed_when_body_fails() {
        let log = Log::default();
        let sources: Vec<Arc<dyn ToolSource>> =
            vec![Arc::new(FakeSource::new("cmms", vec!["a"], &log))];

        let result: Result<()> = with_tools(&sources, |_| async {
            Err(AgentError::UpstreamAgent("model exploded".into()))
        })
        .await;

        assert!(matches!(result, Err(AgentError::UpstreamAgent(_))));
        assert_eq!(entries(&log), vec!["open cmms", "close cmms"]);
    }

    #[tokio::test]
    async fn test_cancelled_body_still_closes_scope() {
        let log = Log::default();
        let sources: Vec<Arc<dyn ToolSource>> = vec![
            Arc::new(FakeSource::new("cmms", vec!["a"], &log)),
            Arc::new(FakeSource::new("erp", vec!["b"], &log)),
        ];

        let pending = with_tools(&sources, |_| async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(())
        });
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(50), pending).await;
        assert!(timed_out.is_err());

        for _ in 0..100 {
            if entries(&log).len() == 4 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(
            entries(&log),
            vec!["open cmms", "open erp", "close erp", "close cmms"]
        );
    }
}
