//! Orchestrator: runs the sync engine against a live host.
//!
//! The [`SyncEngine`] sits behind one lock shared by the executor task and
//! the wallet hook. The executor takes it for each discovery scan,
//! reconciliation cycle or roster change; the wallet hook takes it to mirror
//! a mutation within the host's own notification, so a change is propagated
//! from the value the mutation produced and never overtaken by a later one.
//! Roster and HUD notifications are queued as [`SyncCommand`]s and handled
//! by the executor alongside the two periodic timers.
//!
//! Hosts must not hold their own locks while invoking hook callbacks.

use crate::config::GemshareConfig;
use crate::discovery::DiscoveryRecord;
use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::host::{Host, HookKind, HostCallback, HostEvent};
use crate::interceptor::MirrorOutcome;
use crate::reconcile::{ReconcileAction, ReconcileOutcome};
use crate::suppression::Suppression;
use gemshare_types::{HookId, Label, NodeId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Work item for the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncCommand {
    /// Run a discovery scan now.
    DiscoveryTick,
    /// Run a reconciliation cycle now.
    ReconcileTick,
    RosterChanged { manager: NodeId },
    HudInitialized { hud: NodeId, label: String },
    WalletMutated { source: NodeId, delta: i64 },
    /// Unregister hooks and stop the executor.
    Shutdown,
}

impl From<HostEvent> for SyncCommand {
    fn from(event: HostEvent) -> Self {
        match event {
            HostEvent::RosterChanged { manager } => Self::RosterChanged { manager },
            HostEvent::HudInitialized { hud, label } => Self::HudInitialized { hud, label },
            HostEvent::WalletMutated { source, delta } => Self::WalletMutated { source, delta },
        }
    }
}

/// Something the executor did, reported to whoever holds the handle.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    PlayerBound(DiscoveryRecord),
    RosterMapped(Vec<(Label, NodeId)>),
    HudMapped { label: Label, root: NodeId },
    /// A reconciliation cycle that had at least two entities.
    Reconciled(ReconcileOutcome),
    Mirrored(MirrorOutcome),
}

/// Handle to a running orchestrator.
pub struct OrchestratorHandle {
    command_tx: mpsc::UnboundedSender<SyncCommand>,
    event_rx: mpsc::UnboundedReceiver<SyncEvent>,
    task: JoinHandle<()>,
    suppression: Suppression,
}

impl OrchestratorHandle {
    /// Queues a command for the executor.
    pub fn send(&self, command: SyncCommand) -> SyncResult<()> {
        self.command_tx
            .send(command)
            .map_err(|_| SyncError::ChannelClosed)
    }

    /// Waits for the next executor event. `None` once the executor stopped
    /// and every buffered event was drained.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        self.event_rx.recv().await
    }

    /// Returns a buffered event without waiting.
    pub fn try_next_event(&mut self) -> Option<SyncEvent> {
        self.event_rx.try_recv().ok()
    }

    /// The suppression window shared with the engine and the wallet hook.
    pub fn suppression(&self) -> &Suppression {
        &self.suppression
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the executor and waits until its hooks are unregistered.
    pub async fn shutdown(self) -> SyncResult<()> {
        // The executor may already be gone; joining is what matters.
        let _ = self.command_tx.send(SyncCommand::Shutdown);
        self.task
            .await
            .map_err(|e| SyncError::Config(format!("executor task failed: {e}")))
    }
}

pub struct Orchestrator;

impl Orchestrator {
    /// Registers the three host hooks and starts the executor task.
    ///
    /// Must be called from within a tokio runtime. If any hook fails to
    /// register, the ones already registered are removed again.
    pub fn spawn<H>(host: Arc<H>, config: GemshareConfig) -> SyncResult<OrchestratorHandle>
    where
        H: Host + 'static,
    {
        let suppression = Suppression::new();
        let engine = SyncEngine::with_suppression(config, suppression.clone())?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            engine: Mutex::new(engine),
            event_tx,
        });

        let hooks = register_hooks(&host, &shared, &command_tx, &suppression)?;
        info!("gemshare hooks registered ({})", hooks.len());

        let executor = Executor {
            host,
            shared,
            hooks,
        };
        let task = tokio::spawn(executor.run(command_rx));

        Ok(OrchestratorHandle {
            command_tx,
            event_rx,
            task,
            suppression,
        })
    }
}

/// State reachable from both the executor and the hooks.
struct Shared {
    engine: Mutex<SyncEngine>,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
}

impl Shared {
    fn engine(&self) -> MutexGuard<'_, SyncEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SyncEvent) {
        // Nobody listening is fine; the engine keeps running.
        let _ = self.event_tx.send(event);
    }

    fn mirror<H: Host + ?Sized>(&self, host: &H, source: NodeId, delta: i64) {
        let outcome = self.engine().on_wallet_mutated(host, source, delta);
        if let Some(outcome) = outcome {
            self.emit(SyncEvent::Mirrored(outcome));
        }
    }
}

fn register_hooks<H: Host + 'static>(
    host: &Arc<H>,
    shared: &Arc<Shared>,
    command_tx: &mpsc::UnboundedSender<SyncCommand>,
    suppression: &Suppression,
) -> SyncResult<Vec<HookId>> {
    let mut registered = Vec::with_capacity(3);
    for kind in [
        HookKind::RosterChanged,
        HookKind::HudInitialized,
        HookKind::WalletMutated,
    ] {
        let callback = hook_callback(
            kind,
            Arc::downgrade(host),
            shared.clone(),
            command_tx.clone(),
            suppression.clone(),
        );
        match host.subscribe(kind, callback) {
            Ok(id) => {
                debug!(hook = %id, ?kind, "hook registered");
                registered.push(id);
            }
            Err(e) => {
                warn!("failed to register {kind:?} hook: {e}");
                for id in registered {
                    host.unsubscribe(id);
                }
                return Err(e.into());
            }
        }
    }
    Ok(registered)
}

fn hook_callback<H: Host + 'static>(
    kind: HookKind,
    host: Weak<H>,
    shared: Arc<Shared>,
    command_tx: mpsc::UnboundedSender<SyncCommand>,
    suppression: Suppression,
) -> HostCallback {
    Arc::new(move |event: &HostEvent| {
        debug!(?kind, "[HOOK] {kind:?} invoked");
        match event {
            HostEvent::WalletMutated { source, delta } => {
                // Raised by our own corrective write on this thread.
                if suppression.covers_current_thread() {
                    return;
                }
                match host.upgrade() {
                    Some(host) => shared.mirror(host.as_ref(), *source, *delta),
                    None => debug!("host gone, dropping wallet mutation"),
                }
            }
            other => {
                if command_tx.send(SyncCommand::from(other.clone())).is_err() {
                    debug!(?kind, "executor gone, dropping host event");
                }
            }
        }
    })
}

struct Executor<H: Host + ?Sized> {
    host: Arc<H>,
    shared: Arc<Shared>,
    hooks: Vec<HookId>,
}

impl<H: Host + ?Sized> Executor<H> {
    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<SyncCommand>) {
        let (discovery_period, reconcile_period) = {
            let engine = self.shared.engine();
            (
                engine.config().discovery_period(),
                engine.config().reconcile_period(),
            )
        };
        let mut discovery = periodic(discovery_period);
        let mut reconcile = periodic(reconcile_period);

        loop {
            tokio::select! {
                biased;

                command = command_rx.recv() => {
                    match command {
                        Some(SyncCommand::Shutdown) | None => break,
                        Some(command) => self.handle(command),
                    }
                }
                _ = discovery.tick() => self.handle(SyncCommand::DiscoveryTick),
                _ = reconcile.tick() => self.handle(SyncCommand::ReconcileTick),
            }
        }

        for id in self.hooks.drain(..) {
            if !self.host.unsubscribe(id) {
                debug!(hook = %id, "hook was already unregistered");
            }
        }
        info!("gemshare executor stopped");
    }

    /// Runs one command under the engine lock; events go out once it is released.
    fn handle(&self, command: SyncCommand) {
        let host = self.host.as_ref();
        let shared = self.shared.as_ref();
        match command {
            SyncCommand::DiscoveryTick => {
                let records = shared.engine().discovery_tick(host);
                for record in records {
                    shared.emit(SyncEvent::PlayerBound(record));
                }
            }
            SyncCommand::ReconcileTick => {
                let outcome = shared.engine().reconcile_tick(host);
                if outcome.action != ReconcileAction::Skipped {
                    shared.emit(SyncEvent::Reconciled(outcome));
                }
            }
            SyncCommand::RosterChanged { manager } => {
                let bindings = shared.engine().refresh_from_roster(host, manager);
                shared.emit(SyncEvent::RosterMapped(bindings));
            }
            SyncCommand::HudInitialized { hud, label } => {
                let bound = shared.engine().bind_hud(host, &label, hud);
                if let Ok((label, root)) = bound {
                    shared.emit(SyncEvent::HudMapped { label, root });
                }
            }
            SyncCommand::WalletMutated { source, delta } => shared.mirror(host, source, delta),
            SyncCommand::Shutdown => {}
        }
    }
}

/// Interval whose first tick is one full period away.
fn periodic(period: Duration) -> tokio::time::Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
