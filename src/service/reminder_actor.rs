use crate::db::{BudgetStorage, DueReminder};
use crate::error::BudgetError;
use crate::google::fcm::PushSender;
use crate::service::clock::Clock;

use chrono::{DateTime, FixedOffset};
use futures::stream::{self, StreamExt};
use ractor::concurrency::JoinHandle;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const REMINDER_TITLE: &str = "⏰ Reminder from Budgetlytic";

/// Messages handled by the reminder actor.
#[derive(Debug)]
pub enum ReminderMessage {
    /// Periodic sweep, sent by the actor's own interval timer.
    Tick,
    /// Sweep immediately and reply with the number of delivered reminders.
    ProcessNow(RpcReplyPort<Result<usize, BudgetError>>),
}

/// Everything the actor needs to deliver reminders.
#[derive(Clone)]
pub struct ReminderDeps {
    pub storage: BudgetStorage,
    pub push: Arc<dyn PushSender>,
    pub clock: Clock,
    pub interval: Duration,
    pub concurrency: usize,
}

/// Handle for interacting with the reminder actor.
#[derive(Clone)]
pub struct ReminderHandle {
    actor: ActorRef<ReminderMessage>,
}

impl ReminderHandle {
    pub async fn process_now(&self) -> Result<usize, BudgetError> {
        ractor::call!(self.actor, ReminderMessage::ProcessNow)
            .map_err(|e| BudgetError::RactorError(format!("ProcessNow RPC failed: {e}")))?
    }

    pub fn stop(&self) {
        self.actor.stop(Some("shutdown".to_string()));
    }
}

struct ReminderState {
    deps: ReminderDeps,
    ticker: Option<JoinHandle<()>>,
}

struct ReminderActor;

#[ractor::async_trait]
impl Actor for ReminderActor {
    type Msg = ReminderMessage;
    type State = ReminderState;
    type Arguments = ReminderDeps;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        deps: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let ticker = myself.send_interval(deps.interval, || ReminderMessage::Tick);
        info!(
            interval_secs = deps.interval.as_secs(),
            concurrency = deps.concurrency,
            "ReminderActor started"
        );
        Ok(ReminderState {
            deps,
            ticker: Some(ticker),
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        info!("ReminderActor stopped");
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let deps = &state.deps;
        match message {
            ReminderMessage::Tick => {
                if let Err(e) = dispatch_due(deps, deps.clock.now()).await {
                    warn!("Reminder sweep failed: {}", e);
                }
            }
            ReminderMessage::ProcessNow(reply) => {
                let _ = reply.send(dispatch_due(deps, deps.clock.now()).await);
            }
        }
        Ok(())
    }
}

/// Send every reminder due at `now` and mark the delivered ones as sent.
/// Failed deliveries stay unsent and are retried on the next sweep. A failure
/// to record one delivery does not stop the others from being recorded.
pub async fn dispatch_due(
    deps: &ReminderDeps,
    now: DateTime<FixedOffset>,
) -> Result<usize, BudgetError> {
    let due = deps.storage.due_reminders(now).await?;
    if due.is_empty() {
        return Ok(0);
    }
    debug!(count = due.len(), "Dispatching due reminders");

    let outcomes: Vec<(DueReminder, Result<(), BudgetError>)> = stream::iter(due)
        .map(|reminder| {
            let push = deps.push.clone();
            async move {
                let res = push
                    .send(&reminder.token, REMINDER_TITLE, &reminder.message)
                    .await;
                (reminder, res)
            }
        })
        .buffer_unordered(deps.concurrency.max(1))
        .collect()
        .await;

    let mut delivered = 0;
    for (reminder, res) in outcomes {
        match res {
            Ok(()) => {
                delivered += 1;
                info!(id = reminder.id, user = %reminder.user_id, "Reminder delivered");
                if let Err(e) = deps.storage.mark_reminder_sent(reminder.id).await {
                    warn!(
                        id = reminder.id,
                        user = %reminder.user_id,
                        "Reminder delivered but not marked sent: {}",
                        e
                    );
                }
            }
            Err(e) => warn!(
                id = reminder.id,
                user = %reminder.user_id,
                "Reminder delivery failed: {}",
                e
            ),
        }
    }
    Ok(delivered)
}

/// Spawn the reminder actor and return a handle.
pub async fn spawn(deps: ReminderDeps) -> Result<ReminderHandle, BudgetError> {
    let (actor, _jh) = Actor::spawn(Some("ReminderActor".to_string()), ReminderActor, deps)
        .await
        .map_err(|e| BudgetError::RactorError(format!("failed to spawn ReminderActor: {e}")))?;
    Ok(ReminderHandle { actor })
}
