pub mod method_whitelist;
pub mod trace_id;

pub use method_whitelist::method_whitelist_middleware;
pub use trace_id::{trace_id_middleware, TraceId};
