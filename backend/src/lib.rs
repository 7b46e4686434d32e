//! Zarver backend: a social decision-helper service.
//!
//! Users submit a dilemma, get four generated alternatives, roll a dice to
//! pick one, and share the outcome. Layout follows the hexagon: `domain`
//! holds entities, services, and ports; `inbound` holds the HTTP and
//! WebSocket adapters; `outbound` holds the document store, generator, and
//! realtime push adapters; `server` wires it all together.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

pub use middleware::Trace;
