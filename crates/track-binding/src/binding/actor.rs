//! `BindingActor` - owns one [`BindingMachine`] on its own task.
//!
//! Each `BindingActor`:
//! - Serializes membership events, config changes and retry deliveries for
//!   one consumer surface
//! - Turns [`Next::RetryAfter`] into a timer task that posts the ticket back
//!   into the mailbox
//! - Detaches on cancellation
//!
//! # Lifecycle
//!
//! 1. Spawned with a machine in `Unresolved`; evaluates once at startup so
//!    that an explicit participant id starts probing without waiting for
//!    membership
//! 2. Runs until cancelled or every handle is dropped
//! 3. Timer tasks hold a weak sender and a child token, so they never keep
//!    the actor alive and die with it

use common::types::ParticipantId;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::machine::BindingMachine;
use super::messages::BindingMessage;
use super::state::{BindingState, BindingStatus, Next, RetryTicket};
use crate::errors::BindingError;
use crate::identity::BindingConfig;
use crate::membership::MembershipEvent;

/// Handle to a `BindingActor`.
#[derive(Clone, Debug)]
pub struct BindingActorHandle {
    sender: mpsc::Sender<BindingMessage>,
    cancel_token: CancellationToken,
    consumer_id: String,
}

impl BindingActorHandle {
    /// Get the consumer ID.
    #[must_use]
    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    /// Replace the binding config.
    pub async fn set_config(&self, config: BindingConfig) -> Result<(), BindingError> {
        self.send(BindingMessage::SetConfig { config }).await
    }

    /// Re-run resolution.
    pub async fn reevaluate(&self) -> Result<(), BindingError> {
        self.send(BindingMessage::Reevaluate).await
    }

    /// Deliver a membership event.
    pub async fn notify(&self, event: MembershipEvent) -> Result<(), BindingError> {
        self.send(BindingMessage::Membership(event)).await
    }

    /// Participant currently bound, if any.
    pub async fn current_binding(&self) -> Result<Option<ParticipantId>, BindingError> {
        let (tx, rx) = oneshot::channel();
        self.send(BindingMessage::GetBinding { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| BindingError::Internal(format!("response receive failed: {e}")))
    }

    /// Full status snapshot.
    pub async fn status(&self) -> Result<BindingStatus, BindingError> {
        let (tx, rx) = oneshot::channel();
        self.send(BindingMessage::GetStatus { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| BindingError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the binding actor. A bound target is detached first.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Token cancelled together with this actor.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    async fn send(&self, message: BindingMessage) -> Result<(), BindingError> {
        self.sender
            .send(message)
            .await
            .map_err(|e| BindingError::Internal(format!("channel send failed: {e}")))
    }
}

/// The `BindingActor` implementation.
pub struct BindingActor {
    /// Consumer surface ID.
    consumer_id: String,
    /// The state machine driven by this actor.
    machine: BindingMachine,
    /// Message receiver.
    receiver: mpsc::Receiver<BindingMessage>,
    /// Sender handed to retry timers; does not keep the mailbox open.
    retry_sender: mpsc::WeakSender<BindingMessage>,
    /// Cancellation token.
    cancel_token: CancellationToken,
    /// Token of the retry timer currently in flight.
    retry_token: Option<CancellationToken>,
    /// Messages handled so far.
    messages_processed: u64,
}

impl BindingActor {
    /// Spawn a new binding actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        machine: BindingMachine,
        mailbox_buffer: usize,
        cancel_token: CancellationToken,
    ) -> (BindingActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(mailbox_buffer.max(1));
        let consumer_id = machine.consumer_id().to_string();

        let actor = Self {
            consumer_id: consumer_id.clone(),
            machine,
            receiver,
            retry_sender: sender.downgrade(),
            cancel_token: cancel_token.clone(),
            retry_token: None,
            messages_processed: 0,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = BindingActorHandle {
            sender,
            cancel_token,
            consumer_id,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(
        skip_all,
        name = "tb.binding.actor",
        fields(consumer_id = %self.consumer_id)
    )]
    async fn run(mut self) {
        debug!(
            target: "tb.binding.actor",
            consumer_id = %self.consumer_id,
            "BindingActor started"
        );

        let next = self.machine.reevaluate();
        self.schedule(next);

        loop {
            tokio::select! {
                // Handle cancellation
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "tb.binding.actor",
                        consumer_id = %self.consumer_id,
                        "BindingActor received cancellation signal"
                    );
                    break;
                }

                // Handle messages
                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.handle_message(message);
                            self.messages_processed += 1;
                        }
                        None => {
                            debug!(
                                target: "tb.binding.actor",
                                consumer_id = %self.consumer_id,
                                "BindingActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        self.cancel_retry();
        self.machine.shutdown();

        info!(
            target: "tb.binding.actor",
            consumer_id = %self.consumer_id,
            messages_processed = self.messages_processed,
            "BindingActor stopped"
        );
    }

    fn handle_message(&mut self, message: BindingMessage) {
        let next = match message {
            BindingMessage::Membership(event) => self.machine.on_membership(event),
            BindingMessage::SetConfig { config } => self.machine.set_config(config),
            BindingMessage::Reevaluate => self.machine.reevaluate(),
            BindingMessage::RetryFired(ticket) => self.machine.on_retry(ticket),
            BindingMessage::GetBinding { respond_to } => {
                let _ = respond_to.send(self.machine.current_binding().cloned());
                Next::Idle
            }
            BindingMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.machine.status());
                Next::Idle
            }
        };

        self.schedule(next);
    }

    /// Act on the machine's request after a transition.
    fn schedule(&mut self, next: Next) {
        match next {
            Next::RetryAfter(ticket) => self.spawn_retry(ticket),
            Next::GaveUp => self.cancel_retry(),
            // Leaving Probing makes any in-flight ticket stale
            Next::Idle if self.machine.state() != BindingState::Probing => self.cancel_retry(),
            Next::Idle => {}
        }
    }

    fn spawn_retry(&mut self, ticket: RetryTicket) {
        self.cancel_retry();

        let token = self.cancel_token.child_token();
        let sender = self.retry_sender.clone();
        self.retry_token = Some(token.clone());

        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(ticket.delay) => {
                    if let Some(sender) = sender.upgrade() {
                        let _ = sender.send(BindingMessage::RetryFired(ticket)).await;
                    }
                }
            }
        });
    }

    fn cancel_retry(&mut self) {
        if let Some(token) = self.retry_token.take() {
            token.cancel();
        }
    }
}
