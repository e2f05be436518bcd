//! # Payment Sandbox Engine
//!
//! The lifecycle engine for the payment initiation sandbox. It owns the three resource kinds the
//! sandbox manages (payment consents, payment initiations and SCA enrollments), the rules for
//! creating them and moving them through their state machines, and the store that holds them.
//!
//! The library is divided into two main sections:
//! 1. The storage contract ([`traits::ResourceStore`]) and its reference backend
//!    ([`MemoryStore`]). The reference store keeps everything in process memory: records never
//!    expire and are never evicted, which is a deliberate property of the sandbox. A durable
//!    backend is a drop-in replacement behind the same trait, provided it preserves that
//!    "never silently disappears" contract.
//! 2. The lifecycle API ([`LifecycleApi`]). This is the only component that creates or mutates
//!    resources. Identifiers are generated server-side ([`IdGenerator`]) and are never
//!    client-supplied.

pub mod api;
pub mod db_types;
pub mod errors;
pub mod memory;
pub mod traits;

pub use api::{IdGenerator, LifecycleApi};
pub use errors::ResourceStoreError;
pub use memory::MemoryStore;
pub use traits::ResourceStore;
