//! Retry and repeat policies.
//!
//! A [`RetryPolicy`] is a pure function from the current [`RetryStatus`] to
//! an optional delay. Policies are values: they describe *what* retry
//! behavior you want and are composed with ordinary method calls, while the
//! effect combinators [`IO::retry`](crate::IO::retry),
//! [`IO::retry_if`](crate::IO::retry_if) and
//! [`IO::repeat`](crate::IO::repeat) do the actual waiting.
//!
//! # Quick Start
//!
//! ```rust
//! use eddy::retry::RetryPolicies;
//! use eddy::IO;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicies::exponential_backoff_delay(Duration::from_millis(1))
//!     .cap_delay(Duration::from_millis(5))
//!     .append(RetryPolicies::limit_retries(3));
//!
//! let effect = IO::<i32>::fail("always fails").retry(policy);
//! assert!(effect.run().await.is_err());
//! # });
//! ```
//!
//! # Testing policies
//!
//! [`RetryPolicy::simulate`] runs a policy without sleeping and returns
//! every status it would grant a retry for. It is the easiest way to check a
//! composed policy does what you meant.

mod policies;
mod policy;
mod status;

pub use policies::RetryPolicies;
pub use policy::RetryPolicy;
pub use status::RetryStatus;
