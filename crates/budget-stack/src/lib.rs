//! budget-stack — declarative composition of the budget tracker stack.
//!
//! Declares an artifact bucket, one compute principal, an optional token
//! authorizer, keyed tables with read/write grants, and the HTTP routing
//! tree, in that order. The result is a [`StackGraph`] of immutable
//! resource descriptors plus typed handles to each provisioned part.
//!
//! # Components
//!
//! - **`graph`** — construct graph; rejects duplicate ids and out-of-order dependencies
//! - **`artifact`** — disposable bucket the function artifact is staged in
//! - **`compute`** — the shared compute principal and its direct URL
//! - **`authorizer`** — token authorizer backed by the same principal
//! - **`tables`** — tables, secondary indexes, grants
//! - **`routing`** — path tree, per-verb access policy, gateway declaration
//! - **`assembler`** — runs everything above in dependency order
//!
//! Assembly is synchronous and all-or-nothing: the first error aborts it.

pub mod artifact;
pub mod assembler;
pub mod authorizer;
pub mod compute;
pub mod error;
pub mod graph;
pub mod report;
pub mod routing;
pub mod tables;

pub use assembler::{AssembledStack, StackAssembler};
pub use error::{StackError, StackResult};
pub use graph::{ConstructId, StackGraph, StackOutput};
pub use routing::{MethodBinding, RouteEntry, RouteNode, RouteTree};
pub use tables::{KeySchema, ProvisionedIndex, ProvisionedTable};
