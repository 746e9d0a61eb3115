pub mod dispatch_executor;
pub mod dispatcher;
pub mod infrastructure;
pub mod request_gate;
pub mod sampler;
pub mod session;
pub mod session_logger;
