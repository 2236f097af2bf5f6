use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use jsonrpc2_common::transport::{NetworkTransport, Transport, TransportMode};
use jsonrpc2_common::{CallOptions, IdGenerator, RandomIds, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::CallContext;
use crate::logging::{LogEntry, Logger, LoggingStage};
use crate::middleware::{Middleware, Pipeline};
use crate::terminal::NetworkCall;
use crate::tracer::{Tracer, TracingMiddleware};

/// Deadline applied to calls that do not set their own
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Client construction options.
#[derive(Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub logger: Option<Logger>,
    pub user_agent: Option<String>,
    pub tracer: Option<Arc<dyn Tracer>>,
    pub ids: Arc<dyn IdGenerator>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            logger: None,
            user_agent: None,
            tracer: None,
            ids: Arc::new(RandomIds),
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    /// Sets the callback that receives one [`LogEntry`] per call.
    pub fn with_logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(&LogEntry<'_>) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Enables the tracing stage, placed right after the logging stage.
    pub fn with_tracer<T: Tracer>(mut self, tracer: T) -> Self {
        self.tracer = Some(Arc::new(tracer));
        self
    }

    pub fn with_id_generator<G: IdGenerator + 'static>(mut self, ids: G) -> Self {
        self.ids = Arc::new(ids);
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .field("user_agent", &self.user_agent)
            .field("tracer", &self.tracer.is_some())
            .finish_non_exhaustive()
    }
}

/// State shared by every clone of a client.
struct Shared {
    address: String,
    mode: TransportMode,
    default_timeout: Duration,
    logging: Arc<dyn Middleware>,
    tracing: Option<Arc<dyn Middleware>>,
    terminal: NetworkCall,
}

/// JSON-RPC client for one remote address.
///
/// Every call runs through the logging stage, the tracing stage (when a
/// tracer is configured), the registered middleware in registration order,
/// and finally the network stage. Clones share the transport and
/// configuration but keep their own middleware list.
///
/// # Example
///
/// ```no_run
/// use jsonrpc2_client::{from_fn, CallOptions, Client, ClientConfig};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> jsonrpc2_client::Result<()> {
/// let mut client = Client::new("http://127.0.0.1:8080/rpc", ClientConfig::default())?;
/// client.use_middleware(from_fn(|ctx, next| {
///     Box::pin(async move {
///         ctx.options.headers.insert("x-api-key".into(), "secret".into());
///         next.run(ctx).await
///     })
/// }));
///
/// let result = client.call("Foo.Bar", json!({"foo": "bar"}), CallOptions::default()).await?;
/// println!("{}", result);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
    middleware: Vec<Arc<dyn Middleware>>,
    pipeline: Pipeline,
}

impl Client {
    /// Creates a client for `address`.
    ///
    /// `tcp://host:port` selects the raw TCP transport; any other scheme is
    /// sent as an HTTP POST. No connection is opened until the first call.
    pub fn new(address: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let address = address.into();
        let mode = TransportMode::parse(&address)?;
        let transport = NetworkTransport::new(mode.clone(), config.user_agent.clone());

        Ok(Self::assemble(address, mode, config, Arc::new(transport)))
    }

    /// Like [`Client::new`], with a caller-supplied transport.
    pub fn with_transport(
        address: impl Into<String>,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let address = address.into();
        let mode = TransportMode::parse(&address)?;

        Ok(Self::assemble(address, mode, config, transport))
    }

    fn assemble(
        address: String,
        mode: TransportMode,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        tracing::debug!(%address, transport = %mode, timeout_ms = config.timeout.as_millis() as u64, "Creating client");

        let shared = Shared {
            logging: Arc::new(LoggingStage::new(address.clone(), config.logger)),
            tracing: config
                .tracer
                .map(|tracer| Arc::new(TracingMiddleware::new(tracer)) as Arc<dyn Middleware>),
            terminal: NetworkCall::new(transport, config.timeout, config.ids),
            default_timeout: config.timeout,
            address,
            mode,
        };

        let mut client = Self {
            shared: Arc::new(shared),
            middleware: Vec::new(),
            pipeline: Pipeline::new(Vec::new()),
        };
        client.rebuild();
        client
    }

    /// Appends a middleware. It runs after every previously registered one.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self.rebuild();
        self
    }

    fn rebuild(&mut self) {
        let mut stages = Vec::with_capacity(self.middleware.len() + 2);
        stages.push(self.shared.logging.clone());
        stages.extend(self.shared.tracing.clone());
        stages.extend(self.middleware.iter().cloned());

        self.pipeline = Pipeline::new(stages);
    }

    /// Calls `method` and returns its result, or `null` if the server sent none.
    pub async fn call(
        &self,
        method: impl Into<String>,
        params: Value,
        options: CallOptions,
    ) -> Result<Value> {
        let mut ctx = CallContext::new(method, params, options);
        self.pipeline.execute(&mut ctx, &self.shared.terminal).await?;

        Ok(ctx.result.unwrap_or(Value::Null))
    }

    /// Sends a call with a `null` id.
    pub async fn notify(&self, method: impl Into<String>, params: Value) -> Result<Value> {
        self.call(method, params, CallOptions::default().asynchronous())
            .await
    }

    /// Calls `method` and deserializes the result.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: impl Into<String>,
        params: Value,
        options: CallOptions,
    ) -> Result<T> {
        let value = self.call(method, params, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn address(&self) -> &str {
        &self.shared.address
    }

    pub fn mode(&self) -> &TransportMode {
        &self.shared.mode
    }

    pub fn default_timeout(&self) -> Duration {
        self.shared.default_timeout
    }

    /// Number of registered user middleware.
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.shared.address)
            .field("mode", &self.shared.mode)
            .field("default_timeout", &self.shared.default_timeout)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;
    use crate::tracer::{W3cTracer, TRACEPARENT};
    use futures_util::future::BoxFuture;
    use jsonrpc2_common::transport::Exchange;
    use jsonrpc2_common::{JsonRpcError, JsonRpcRequest, RpcError, SequentialIds};
    use serde_json::json;
    use std::sync::Mutex;

    type Reply = fn(&JsonRpcRequest) -> Result<Option<Value>>;

    /// Transport that records requests and answers from a fixed function.
    struct MockTransport {
        sent: Mutex<Vec<(JsonRpcRequest, Exchange)>>,
        reply: Reply,
    }

    impl MockTransport {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                reply,
            })
        }

        fn echo() -> Arc<Self> {
            Self::new(|request| {
                Ok(Some(json!({
                    "jsonrpc": "2.0",
                    "id": request.id,
                    "result": request.params,
                })))
            })
        }

        fn sent(&self) -> Vec<(JsonRpcRequest, Exchange)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        fn exchange<'a>(
            &'a self,
            request: &'a JsonRpcRequest,
            exchange: &'a Exchange,
        ) -> BoxFuture<'a, Result<Option<Value>>> {
            Box::pin(async move {
                self.sent
                    .lock()
                    .unwrap()
                    .push((request.clone(), exchange.clone()));
                (self.reply)(request)
            })
        }
    }

    fn client(transport: &Arc<MockTransport>, config: ClientConfig) -> Client {
        Client::with_transport("http://localhost:8080", config, transport.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_call_sends_envelope_and_returns_result() {
        let transport = MockTransport::echo();
        let client = client(&transport, ClientConfig::default());

        let result = client
            .call("Foo.Bar", json!({"foo": "bar"}), CallOptions::default())
            .await
            .unwrap();

        assert_eq!(result, json!([{"foo": "bar"}]));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let (request, exchange) = &sent[0];
        assert_eq!(request.method, "Foo.Bar");
        assert_eq!(request.jsonrpc, "2.0");
        let id = request.id.as_deref().unwrap();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(exchange.timeout, DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_absent_result_is_null() {
        let transport = MockTransport::new(|_| Ok(Some(json!({"jsonrpc": "2.0", "id": "1"}))));
        let client = client(&transport, ClientConfig::default());

        let result = client.call("test", json!([]), CallOptions::default()).await.unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_not_found_sentinel_is_success() {
        let transport = MockTransport::new(|_| Ok(Some(json!({"error": "not found"}))));
        let client = client(&transport, ClientConfig::default());

        let result = client.call("test", json!([]), CallOptions::default()).await.unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_remote_error_carries_message_code_data() {
        let transport = MockTransport::new(|_| {
            Ok(Some(json!({
                "error": {"message": "boom!", "code": -32000, "data": {"retry": false}}
            })))
        });
        let client = client(&transport, ClientConfig::default());

        let err = client.call("test", json!([]), CallOptions::default()).await.unwrap_err();
        let remote = err.remote().unwrap();
        assert_eq!(remote.message, "boom!");
        assert_eq!(remote.code, Some(json!(-32000)));
        assert_eq!(remote.data, Some(json!({"retry": false})));
        assert_eq!(err.code().as_deref(), Some("-32000"));
    }

    #[tokio::test]
    async fn test_string_error_is_failure_without_code() {
        let transport = MockTransport::new(|_| Ok(Some(json!({"error": "exploded"}))));
        let client = client(&transport, ClientConfig::default());

        let err = client.call("test", json!([]), CallOptions::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "exploded");
        assert_eq!(err.code(), None);
    }

    #[tokio::test]
    async fn test_async_call_has_null_id() {
        let transport = MockTransport::echo();
        let client = client(&transport, ClientConfig::default());

        client
            .call("test", json!("hello"), CallOptions::default().asynchronous())
            .await
            .unwrap();
        client.notify("test", json!("hello")).await.unwrap();

        for (request, _) in transport.sent() {
            assert_eq!(request.id, None);
            assert_eq!(request.params, json!(["hello"]));
        }
    }

    #[tokio::test]
    async fn test_ids_are_unique_per_call() {
        let transport = MockTransport::echo();
        let client = client(&transport, ClientConfig::default());

        for _ in 0..10 {
            client.call("test", json!([]), CallOptions::default()).await.unwrap();
        }

        let mut ids: Vec<_> = transport.sent().into_iter().map(|(r, _)| r.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[tokio::test]
    async fn test_injected_id_generator() {
        let transport = MockTransport::echo();
        let config = ClientConfig::default().with_id_generator(SequentialIds::new("req"));
        let client = client(&transport, config);

        client.call("a", json!([]), CallOptions::default()).await.unwrap();
        client.call("b", json!([]), CallOptions::default()).await.unwrap();

        let ids: Vec<_> = transport.sent().into_iter().map(|(r, _)| r.id).collect();
        assert_eq!(ids, vec![Some("req-1".to_string()), Some("req-2".to_string())]);
    }

    #[tokio::test]
    async fn test_force_array_disabled() {
        let transport = MockTransport::echo();
        let client = client(&transport, ClientConfig::default());

        let result = client
            .call(
                "test",
                json!({"hello": "world"}),
                CallOptions::default().with_force_array(false),
            )
            .await
            .unwrap();

        assert_eq!(result, json!({"hello": "world"}));
    }

    #[tokio::test]
    async fn test_timeouts_reach_the_transport() {
        let transport = MockTransport::echo();
        let client = client(&transport, ClientConfig::default().with_timeout_ms(250));

        client.call("a", json!([]), CallOptions::default()).await.unwrap();
        client
            .call("b", json!([]), CallOptions::default().with_timeout_ms(50))
            .await
            .unwrap();

        let timeouts: Vec<_> = transport.sent().into_iter().map(|(_, e)| e.timeout).collect();
        assert_eq!(
            timeouts,
            vec![Duration::from_millis(250), Duration::from_millis(50)]
        );
        assert_eq!(client.default_timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_short_circuit_skips_transport() {
        let transport = MockTransport::echo();
        let mut client = client(&transport, ClientConfig::default());
        client.use_middleware(from_fn(|ctx, _next| {
            Box::pin(async move {
                ctx.result = Some(json!("short-circuited"));
                Ok(())
            })
        }));

        let result = client.call("test", json!([]), CallOptions::default()).await.unwrap();

        assert_eq!(result, json!("short-circuited"));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_middleware_rewrites_request() {
        let transport = MockTransport::echo();
        let mut client = client(&transport, ClientConfig::default());
        client.use_middleware(from_fn(|ctx, next| {
            Box::pin(async move {
                assert_eq!(ctx.params, json!(["hello"]));
                ctx.method = "Renamed.Method".into();
                ctx.params = json!(["world"]);
                next.run(ctx).await
            })
        }));

        let result = client.call("test", json!("hello"), CallOptions::default()).await.unwrap();

        assert_eq!(result, json!(["world"]));
        assert_eq!(transport.sent()[0].0.method, "Renamed.Method");
    }

    #[tokio::test]
    async fn test_middleware_rewrites_response() {
        let transport = MockTransport::echo();
        let mut client = client(&transport, ClientConfig::default());
        client.use_middleware(from_fn(|ctx, next| {
            Box::pin(async move {
                next.run(&mut *ctx).await?;
                ctx.result = Some(json!({"wrapped": ctx.result.take()}));
                Ok(())
            })
        }));

        let result = client.call("test", json!(1), CallOptions::default()).await.unwrap();
        assert_eq!(result, json!({"wrapped": [1]}));
    }

    #[tokio::test]
    async fn test_middleware_intercepts_remote_error() {
        let transport = MockTransport::new(|_| {
            Ok(Some(json!({"error": {"message": "boom!", "code": 0}})))
        });
        let mut client = client(&transport, ClientConfig::default());
        client.use_middleware(from_fn(|ctx, next| {
            Box::pin(async move { next.run(ctx).await.map_err(|e| e.annotate("intercepted")) })
        }));

        let err = client.call("test", json!([]), CallOptions::default()).await.unwrap_err();

        assert!(err.has_note("intercepted"));
        assert_eq!(err.to_string(), "boom!");
        assert_eq!(err.remote().and_then(|e| e.code.clone()), Some(json!(0)));
    }

    #[tokio::test]
    async fn test_middleware_can_swallow_error() {
        let transport = MockTransport::new(|_| Err(RpcError::Connection("refused".into())));
        let mut client = client(&transport, ClientConfig::default());
        client.use_middleware(from_fn(|ctx, next| {
            Box::pin(async move {
                if next.run(&mut *ctx).await.is_err() {
                    ctx.result = Some(json!("fallback"));
                }
                Ok(())
            })
        }));

        let result = client.call("test", json!([]), CallOptions::default()).await.unwrap();
        assert_eq!(result, json!("fallback"));
    }

    #[tokio::test]
    async fn test_middleware_runs_in_registration_order() {
        let transport = MockTransport::echo();
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut client = client(&transport, ClientConfig::default());

        for name in ["first", "second"] {
            let trace = trace.clone();
            client.use_middleware(from_fn(move |ctx, next| {
                let trace = trace.clone();
                Box::pin(async move {
                    trace.lock().unwrap().push(format!("{} in", name));
                    let outcome = next.run(&mut *ctx).await;
                    trace.lock().unwrap().push(format!("{} out", name));
                    outcome
                })
            }));
        }

        client.call("test", json!([]), CallOptions::default()).await.unwrap();

        assert_eq!(
            *trace.lock().unwrap(),
            vec!["first in", "second in", "second out", "first out"]
        );
        assert_eq!(client.middleware_count(), 2);
    }

    #[tokio::test]
    async fn test_logger_sees_middleware_outcome_once() {
        let transport = MockTransport::echo();
        let entries = Arc::new(Mutex::new(Vec::new()));
        let sink = entries.clone();
        let config = ClientConfig::default().with_logger(move |entry| {
            sink.lock().unwrap().push((
                entry.method.to_string(),
                entry.result.cloned(),
                entry.error.map(|e| e.to_string()),
                entry.addr.to_string(),
            ));
        });
        let mut client = client(&transport, config);
        client.use_middleware(from_fn(|ctx, next| {
            Box::pin(async move {
                next.run(&mut *ctx).await?;
                ctx.result = Some(json!("modified"));
                Ok(())
            })
        }));

        client.call("test", json!([]), CallOptions::default()).await.unwrap();

        assert_eq!(
            *entries.lock().unwrap(),
            vec![(
                "test".to_string(),
                Some(json!("modified")),
                None,
                "http://localhost:8080".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_logger_called_once_on_failure() {
        let transport = MockTransport::new(|_| Err(RpcError::Timeout(50)));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let config = ClientConfig::default().with_logger(move |entry| {
            sink.lock()
                .unwrap()
                .push((entry.result.is_none(), entry.error.map(|e| e.is_timeout())));
        });
        let client = client(&transport, config);

        let err = client.call("test", json!([]), CallOptions::default()).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.code().as_deref(), Some("ETIMEDOUT"));
        assert_eq!(*calls.lock().unwrap(), vec![(true, Some(true))]);
    }

    #[tokio::test]
    async fn test_tracer_injects_headers() {
        let transport = MockTransport::echo();
        let client = client(&transport, ClientConfig::default().with_tracer(W3cTracer::new()));

        client.call("test", json!([]), CallOptions::default()).await.unwrap();

        let (_, exchange) = &transport.sent()[0];
        let traceparent = exchange.headers.get(TRACEPARENT).unwrap();
        assert!(traceparent.starts_with("00-"));
        assert_eq!(traceparent.len(), 55);
    }

    #[tokio::test]
    async fn test_call_as_deserializes() {
        let transport = MockTransport::new(|_| Ok(Some(json!({"result": {"n": 42}}))));
        let client = client(&transport, ClientConfig::default());

        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Answer {
            n: u32,
        }

        let answer: Answer = client
            .call_as("test", json!([]), CallOptions::default())
            .await
            .unwrap();
        assert_eq!(answer, Answer { n: 42 });

        let wrong: Result<String> = client.call_as("test", json!([]), CallOptions::default()).await;
        assert!(matches!(wrong, Err(RpcError::JsonSerialization(_))));
    }

    #[tokio::test]
    async fn test_clone_keeps_own_middleware() {
        let transport = MockTransport::echo();
        let original = client(&transport, ClientConfig::default());
        let mut extended = original.clone();
        extended.use_middleware(from_fn(|ctx, _next| {
            Box::pin(async move {
                ctx.result = Some(json!("extended"));
                Ok(())
            })
        }));

        let a = original.call("test", json!(1), CallOptions::default()).await.unwrap();
        let b = extended.call("test", json!(1), CallOptions::default()).await.unwrap();

        assert_eq!(a, json!([1]));
        assert_eq!(b, json!("extended"));
        assert_eq!(extended.address(), original.address());
    }

    #[test]
    fn test_address_selects_transport() {
        let tcp = Client::new("tcp://localhost:4003", ClientConfig::default()).unwrap();
        assert!(tcp.mode().is_tcp());

        let http = Client::new("http://localhost:8080/rpc", ClientConfig::default()).unwrap();
        assert!(!http.mode().is_tcp());
        assert_eq!(http.address(), "http://localhost:8080/rpc");
    }

    #[test]
    fn test_invalid_address_rejected() {
        for address in [
            "localhost:8080",
            "tcp://localhost",
            "not a url",
            "https://127.0.0.1:1/rpc",
        ] {
            let result = Client::new(address, ClientConfig::default());
            assert!(
                matches!(result, Err(RpcError::InvalidAddress(_))),
                "accepted {:?}",
                address
            );
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(10_000));
        assert!(config.logger.is_none());
        assert!(config.tracer.is_none());
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn test_remote_error_helper() {
        let err = RpcError::Remote(JsonRpcError::method_not_found());
        assert_eq!(err.code().as_deref(), Some("-32601"));
    }
}
