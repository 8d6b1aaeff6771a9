//! # Parley Core
//!
//! Foundation types for the Parley command dispatch framework.
//!
//! This crate holds everything the dispatch pipeline shares but that does not
//! depend on how handlers are composed:
//!
//! - **Context**: the read-only [`DispatchContext`] snapshot of one message
//! - **Capabilities**: [`Permission`] and [`PermissionSet`]
//! - **Commands**: [`CommandInfo`], [`ParamType`] and coerced [`Args`]
//! - **Access**: [`Restriction`] predicates and their [`Denial`]s
//! - **Events**: the five [`EventKind`]s and the [`EventBus`]
//!
//! Handler composition, resolution and dispatch live in `parley-framework`.

pub mod access;
pub mod command;
pub mod context;
pub mod error;
pub mod event;
pub mod permission;

pub use access::{Denial, Requirement, Restriction, RestrictionKind};
pub use command::{
    Arg, ArgAccessError, Args, CastFailure, CastFailureReason, CommandInfo, ParamType,
    ReferenceKind,
};
pub use context::DispatchContext;
pub use error::{BoxError, EventError, EventResult, ParseNameError};
pub use event::{Event, EventBus, EventKind, Subscriber, SubscriptionId};
pub use permission::{Permission, PermissionSet};
