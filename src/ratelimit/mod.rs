//! Rate limiting logic and state management.

mod bucket;
mod key;
mod registry;

pub use bucket::{BucketPolicy, TokenBucket};
pub use key::route_key;
pub use registry::BucketRegistry;
