//! Conditional logging macros.
//!
//! Behind the `tracing` feature these forward to the `tracing` macros;
//! without it they compile to nothing, so the geometry hot paths carry no
//! logging cost. Numerical fallback paths deliberately stay silent either
//! way (they would flood interactive redraws); only coarse decisions like
//! routing candidate choice are instrumented.

#[cfg(feature = "tracing")]
pub use tracing::{debug, warn};

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub use crate::{debug, warn};
