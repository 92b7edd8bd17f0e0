//! # Eddy
//!
//! Deferred effects, sequential and parallel expressions, and composable
//! retry policies.
//!
//! ## Philosophy
//!
//! An effect is a **recipe**, not a running computation:
//! - [`IO`] describes work and runs it only when asked, every time it is asked
//! - [`exp`] combines several effects under a reduction (all, any, cond,
//!   switch, list, JSON object, ...) evaluated either one by one or in
//!   parallel
//! - [`retry`] policies are plain values that decide whether, and after how
//!   long, a failed effect runs again
//!
//! Failures, panics and timeouts never escape an effect: they come back as an
//! [`Error`] from [`IO::run`].
//!
//! ## Quick Example
//!
//! ```rust
//! use eddy::exp::{AllExp, CondExp, Exp};
//! use eddy::retry::RetryPolicies;
//! use eddy::IO;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let healthy = AllExp::par([IO::succeed(true), IO::succeed(true)])
//!     .retry_each(RetryPolicies::constant_delay(Duration::from_millis(5))
//!         .append(RetryPolicies::limit_retries(2)));
//!
//! let status = CondExp::seq()
//!     .when(healthy.into_io(), || IO::succeed("serving"))
//!     .otherwise(|| IO::succeed("degraded"));
//!
//! assert_eq!(status.into_io().run().await.unwrap(), "serving");
//! # });
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod causes;
pub mod debug;
pub mod error;
pub mod executor;
pub mod exp;
pub mod io;
pub mod retry;
pub mod scope;
pub mod testing;

// Re-exports
pub use debug::EventBuilder;
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use executor::{Executor, WorkerPool, WorkerPoolBuilder};
pub use exp::{Exp, Strategy};
pub use io::{Close, IO};
pub use retry::{RetryPolicies, RetryPolicy, RetryStatus};
pub use scope::TaskGroup;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::debug::EventBuilder;
    pub use crate::error::{Error, ErrorKind, Result, ResultExt};
    pub use crate::executor::{Executor, WorkerPool};
    pub use crate::exp::{
        AllExp, AnyExp, CondExp, Exp, IfElseExp, JsArrayExp, JsObjExp, ListExp, PairExp,
        Strategy, SwitchExp, TripleExp,
    };
    pub use crate::io::{Close, IO};
    pub use crate::retry::{RetryPolicies, RetryPolicy, RetryStatus};
}
