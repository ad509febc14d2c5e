//! Platform REST surface

mod routes;
mod sender;

pub use routes::ReplyRoute;
pub use sender::{RequestSender, TRACE_ID_HEADER};
