//! ibx-bloxone library - BloxOne on-prem host management
//!
//! Looks up an on-prem host by display name or IP address and updates it:
//! enabling, disabling, starting or stopping one of its applications, or
//! renaming it.

pub mod client;
pub mod error;
pub mod host;

pub use client::{B1Client, HostSelector};
pub use error::B1Error;
pub use host::{
    apply_action, plan_action, rename_host, ActionOutcome, ActionPlan, AppType, HostAction,
    HostUpdate, NoChange, OnPremHost,
};
