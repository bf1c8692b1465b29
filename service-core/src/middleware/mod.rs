pub mod security_headers;
pub mod tracing;

pub use security_headers::security_headers_middleware;
pub use tracing::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
