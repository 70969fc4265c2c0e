//! petsit: session and load orchestration for the pet-sitting marketplace client.
//!
//! Attaches bearer credentials to API calls, refreshes an expired access
//! token exactly once however many calls notice it, persists the result, and
//! gives every screen a cancellable, observable load per slot.
//!
//! # Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use petsit::prelude::*;
//!
//! # async fn example() -> petsit::error::Result<()> {
//! let session = Session::from_config(&SessionConfig::from_env()?)?;
//! let loads: LoadCoordinator<serde_json::Value> = LoadCoordinator::new();
//! let mut bookings = loads.observe("bookings");
//!
//! let transport = session.transport().clone();
//! loads.run("bookings", async move { transport.get_json("/bookings").await });
//!
//! while let Some(state) = bookings.next().await {
//!     if state.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod load;
pub mod prelude;
pub mod session;
pub mod transport;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
