//! Monotonic clock abstraction and time-expiration policies.

pub mod clock;
pub mod policy;

pub use clock::{Clock, FakeClock, SystemClock};
pub use policy::{
    combined, CustomExpiry, ExpireAfterAccess, ExpireAfterWrite, ExpiryPolicy, NeverExpire,
};
