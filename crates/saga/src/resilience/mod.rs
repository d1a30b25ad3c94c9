//! Retry, timeout and circuit breaking for calls to the inventory authority.

pub mod breaker;
pub mod policy;
pub mod retry;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use policy::{ResilienceError, ResiliencePolicy, Transient};
pub use retry::RetryConfig;
