//! Shared-wallet sync engine for gemshare.
//!
//! Keeps every local player's gem wallet equal in a cooperative session.
//! The host game is reached only through the [`host`] traits, so the engine
//! runs the same against a live game or the in-memory [`host::mock`] world.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Prober**: finds readers for a player's resource level and ceiling
//! - **Classifier**: recognizes player roots and their indicator children
//! - **Binder**: keeps player labels bound to roots
//! - **Discovery**: periodically binds readers for newly active roots
//! - **Reconciliation**: merges wallets once, then raises laggards to the max
//! - **Interceptor**: mirrors a wallet change to everyone immediately
//! - **Engine**: the single coordinator context owning all of the above
//! - **Orchestrator**: the executor task and host hooks that drive the
//!   engine under one lock
//!
//! ## Wallet policy
//!
//! 1. **Merge**: the first cycle that reads every wallet and sees a positive
//!    one gives every player the sum of all positive wallets
//! 2. **Converge**: afterwards, every player is raised to the richest wallet
//! 3. **Re-arm**: a roster change resets to step 1
//!
//! Writes the engine makes are wrapped in a suppression window so the host's
//! notification of them never triggers another mirror pass.
//!
//! # Example
//!
//! ```
//! use gemshare_sync::host::mock::MemoryHost;
//! use gemshare_sync::{GemshareConfig, ReconcileAction, SyncEngine};
//!
//! let host = MemoryHost::new();
//! let a = host.spawn("Wallet A", None);
//! let b = host.spawn("Wallet B", None);
//! host.set_wallet(a, 50);
//! host.set_wallet(b, 0);
//!
//! let mut engine = SyncEngine::new(GemshareConfig::default()).unwrap();
//! let outcome = engine.reconcile_tick(&host);
//!
//! assert_eq!(outcome.action, ReconcileAction::Merged { sum: 50 });
//! assert_eq!(host.wallet(b), Some(50));
//! ```

pub mod binder;
pub mod classifier;
mod config;
pub mod discovery;
mod engine;
mod error;
pub mod host;
pub mod interceptor;
mod orchestrator;
pub mod prober;
pub mod reconcile;
mod suppression;

pub use binder::{BindingSource, LabelBinder};
pub use config::{GemshareConfig, MarkerConfig, ProbeConfig};
pub use discovery::{Baseline, Discovery, DiscoveryRecord, LevelChange};
pub use engine::SyncEngine;
pub use error::{HostError, HostResult, SyncError, SyncResult};
pub use host::{
    Capability, Host, HookKind, HostCallback, HostEvent, HostEvents, HostGraph, Member,
    MemberKind, MemberRef, WalletAccess,
};
pub use interceptor::MirrorOutcome;
pub use orchestrator::{Orchestrator, OrchestratorHandle, SyncCommand, SyncEvent};
pub use prober::{MemberReader, Prober, ResourceReaders};
pub use reconcile::{MergeState, ReconcileAction, ReconcileOutcome, Reconciler};
pub use suppression::{Suppression, SuppressionGuard};
