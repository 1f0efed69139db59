//! Request descriptor types

mod descriptor;
mod headers;

pub use descriptor::{OutboundRequest, RequestDescriptor, normalize_method};
pub use headers::HeaderMap;
