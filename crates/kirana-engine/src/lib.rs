//! Transport-agnostic ordering engine for an unversioned quick-commerce
//! storefront.
//!
//! The storefront offers no contract: endpoints move, field names drift,
//! and failures hide inside 200s. The engine copes by expressing every
//! operation as an ordered list of candidate actions, classifying each
//! response heuristically, and walking the list until something sticks.
//! Transports (private endpoints, driven page) plug in underneath via the
//! [`Transport`] trait.

pub mod action;
pub mod classify;
pub mod error;
pub mod extract;
pub mod operation;
pub mod ops;
pub mod resolver;
pub mod session;
pub mod tracker;
pub mod transport;
pub mod workflow;

pub use action::{Action, Collect, HttpCall, HttpMethod, PageItem, PageScript, PageSnapshot, PageStep, RawResult};
pub use classify::{classify, AuthData, Classification, Extracted};
pub use error::OpError;
pub use operation::{Operation, OperationKind};
pub use ops::{OrderService, Outcome, ProductRef};
pub use resolver::{attempt, Resolved, RetryPolicy};
pub use session::{SessionError, SessionRecord, SessionStore};
pub use tracker::{KnownProduct, KnownProducts};
pub use transport::{Transport, TransportFault};
pub use workflow::{CancelFlag, FlowState, OrderWorkflow};
