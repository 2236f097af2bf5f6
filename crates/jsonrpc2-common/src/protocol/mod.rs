pub mod error;
pub mod jsonrpc;
pub mod requests;
pub mod responses;


pub use error::{Result, RpcError, TIMEOUT_CODE};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JSONRPC_VERSION};
pub use requests::{CallOptions, IdGenerator, RandomIds, RequestId, SequentialIds};
pub use responses::{JsonRpcResponse, NOT_FOUND_SENTINEL};
