//! Station daemon library.
//!
//! The cloud-pairing subsystem of the appliance: durable key identity,
//! one-time cloud registration, and the event-driven lifecycle that wires
//! the ticket service to the cloud connection.
//!
//! ```text
//! StorageReady(root) ──▶ keystore ──▶ registration ──▶ awaiting connection
//!                                                          │ LinkUp
//!                                                          ▼
//!                                       tickets active ◀─ connected
//!                                                          │ LinkDown / Shutdown
//!                                                          ▼
//!                                       tickets torn down, state cleared
//! ```

pub mod bus;
pub mod config;
pub mod coordinator;
pub mod info;
pub mod keystore;
pub mod link;
pub mod registration;
pub mod tickets;

pub use bus::{EventBus, LifecycleSignal, StationEvent};
pub use coordinator::{Coordinator, StationError};
pub use info::{StationHandle, StationInfo};
pub use registration::CloudClient;
