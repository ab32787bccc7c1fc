//! HTTP protocol layer module
//!
//! Protocol building blocks shared by the static handler: validators,
//! conditional evaluation, range parsing, bodies, compression and response
//! builders. Nothing here touches the filesystem layout of the served root.

pub mod body;
pub mod cache;
pub mod compress;
pub mod conditional;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use body::ResponseBody;
pub use cache::{CachePolicy, Validators};
pub use conditional::Condition;
pub use range::{parse_range_header, ByteRange, RangeParseResult};
