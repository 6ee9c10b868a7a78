//! Per-channel connection relay.
//!
//! One [`RelaySession`] exists per connected channel. On each inbound
//! question it resolves the active provider, spawns a generation task, and
//! forwards every provider event onto the channel's outbound sink until the
//! terminal event arrives or the caller disconnects. Disconnect is the only
//! cancellation trigger; there is no timeout and nothing is retried.
//!
//! The outbound side is an `mpsc::Sender<ChannelReply>` rather than a
//! socket, so the whole state machine can be driven with injected fixtures.
//! The WebSocket handler in askbridge-api bridges the sink to the wire.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use askbridge_types::channel::{AnswerEvent, ChannelReply};

use crate::provider::ReleaseFn;
use crate::store::ProviderResolver;

/// Reply sent when a question arrives while another is still in flight.
///
/// Policy: the new question is rejected; the in-flight request continues
/// untouched. At most one request is ever active per channel.
const BUSY_MESSAGE: &str = "a question is already in flight on this channel";

enum SlotState {
    Empty,
    Armed(ReleaseFn),
    Fired,
}

/// At-most-once holder for a provider's release hook.
///
/// Both the disconnect path ([`fire`](Self::fire)) and the call-completion
/// path ([`store`](Self::store)) check-and-clear the slot under a lock, so
/// the hook runs exactly once regardless of which side wins the race. If
/// disconnect fires before the provider call resolves, the hook stored
/// afterwards runs immediately so the late generation is still torn down.
pub struct ReleaseSlot {
    state: Mutex<SlotState>,
}

impl ReleaseSlot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Empty),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the release hook once the provider call has resolved.
    pub fn store(&self, release: ReleaseFn) {
        let mut state = self.lock();
        match *state {
            SlotState::Empty => *state = SlotState::Armed(release),
            // Disconnect already fired; tear down now. The slot stays
            // Fired so later fires remain no-ops.
            SlotState::Fired => {
                drop(state);
                release();
            }
            // One store per request; a second store replaces the hook.
            SlotState::Armed(_) => *state = SlotState::Armed(release),
        }
    }

    /// Invoke the stored hook, if any. Subsequent calls are no-ops.
    pub fn fire(&self) {
        let release = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, SlotState::Fired) {
                SlotState::Armed(release) => Some(release),
                SlotState::Empty | SlotState::Fired => None,
            }
        };
        if let Some(release) = release {
            release();
        }
    }
}

impl Default for ReleaseSlot {
    fn default() -> Self {
        Self::new()
    }
}

struct ActiveRequest {
    cancel: CancellationToken,
    release: Arc<ReleaseSlot>,
    task: JoinHandle<()>,
}

/// Per-channel relay state machine.
///
/// Idle while no request is active, Active while one generation task is
/// running, and effectively Closed once [`disconnect`](Self::disconnect)
/// has been called by the channel owner.
pub struct RelaySession<R> {
    resolver: Arc<R>,
    outbound: mpsc::Sender<ChannelReply>,
    active: Option<ActiveRequest>,
}

impl<R: ProviderResolver + 'static> RelaySession<R> {
    pub fn new(resolver: Arc<R>, outbound: mpsc::Sender<ChannelReply>) -> Self {
        Self {
            resolver,
            outbound,
            active: None,
        }
    }

    /// Handle an inbound question.
    ///
    /// Resolution and generation run on a spawned task so the channel loop
    /// stays responsive to disconnect. Every failure surfaces as a single
    /// `{error}` reply; nothing escapes as a panic.
    ///
    /// Never awaits: the caller is typically also the sole drainer of the
    /// outbound channel, so a blocking send here would wedge the
    /// connection. The busy reply is dropped if the channel is full.
    pub fn handle_question(&mut self, question: String) {
        if self.active.as_ref().is_some_and(|a| !a.task.is_finished()) {
            if let Err(err) = self
                .outbound
                .try_send(ChannelReply::Error(BUSY_MESSAGE.to_string()))
            {
                tracing::debug!(error = %err, "busy reply dropped");
            }
            return;
        }

        let request_id = Uuid::now_v7();
        let cancel = CancellationToken::new();
        let release = Arc::new(ReleaseSlot::new());

        let task = tokio::spawn(run_generation(
            self.resolver.clone(),
            question,
            request_id,
            cancel.clone(),
            release.clone(),
            self.outbound.clone(),
        ));

        self.active = Some(ActiveRequest {
            cancel,
            release,
            task,
        });
    }

    /// Handle channel disconnect.
    ///
    /// Signals cancellation to the in-flight request and fires the
    /// provider's release hook. Safe to call repeatedly: the token is
    /// idempotent and the slot fires at most once. Cancellation itself
    /// posts no message.
    pub fn disconnect(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
            active.release.fire();
        }
    }
}

async fn run_generation<R: ProviderResolver>(
    resolver: Arc<R>,
    question: String,
    request_id: Uuid,
    cancel: CancellationToken,
    release: Arc<ReleaseSlot>,
    outbound: mpsc::Sender<ChannelReply>,
) {
    let provider = match resolver.resolve().await {
        Ok(provider) => provider,
        Err(err) => {
            tracing::warn!(%request_id, error = %err, "provider resolution failed");
            let _ = outbound.send(ChannelReply::Error(err.to_string())).await;
            return;
        }
    };

    tracing::debug!(
        %request_id,
        provider = provider.name(),
        model = provider.model(),
        "question accepted"
    );

    let generation = match provider.generate_answer(&question, cancel.clone()).await {
        Ok(generation) => generation,
        Err(err) => {
            tracing::warn!(%request_id, error = %err, "provider invocation failed");
            let _ = outbound.send(ChannelReply::Error(err.to_string())).await;
            return;
        }
    };

    if let Some(hook) = generation.release {
        release.store(hook);
    }

    let mut events = generation.events;
    loop {
        tokio::select! {
            // Disconnect flipped the shared token: stop consuming. The
            // provider halts its own emission; no message is posted.
            _ = cancel.cancelled() => break,
            next = events.next() => match next {
                Some(Ok(AnswerEvent::Data(payload))) => {
                    if outbound.send(ChannelReply::Payload(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(AnswerEvent::Done)) => {
                    let _ = outbound.send(ChannelReply::Done).await;
                    break;
                }
                Some(Err(err)) => {
                    tracing::warn!(%request_id, error = %err, "generation failed mid-stream");
                    let _ = outbound.send(ChannelReply::Error(err.to_string())).await;
                    break;
                }
                None => {
                    // Stream ended without a terminal event. The relay is a
                    // pass-through and does not invent a DONE.
                    tracing::debug!(%request_id, "event stream ended without terminal event");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::stream;
    use serde_json::json;
    use tokio::sync::Notify;

    use askbridge_types::error::{ProviderError, ResolveError};

    use crate::provider::box_provider::BoxAnswerProvider;
    use crate::provider::{AnswerProvider, AnswerStream, Generation};

    /// Hands out pre-built resolution results, one per resolve() call.
    struct StubResolver {
        queue: Mutex<VecDeque<Result<BoxAnswerProvider, ResolveError>>>,
    }

    impl StubResolver {
        fn new(results: Vec<Result<BoxAnswerProvider, ResolveError>>) -> Arc<Self> {
            Arc::new(Self {
                queue: Mutex::new(results.into()),
            })
        }
    }

    impl ProviderResolver for StubResolver {
        async fn resolve(&self) -> Result<BoxAnswerProvider, ResolveError> {
            self.queue
                .lock()
                .unwrap()
                .pop_front()
                .expect("no stubbed resolution left")
        }
    }

    /// Yields a pre-built Generation, optionally waiting on a gate first to
    /// model a slow provider call.
    struct StubProvider {
        generation: Mutex<Option<Generation>>,
        gate: Option<Arc<Notify>>,
    }

    impl StubProvider {
        fn boxed(generation: Generation) -> BoxAnswerProvider {
            BoxAnswerProvider::new(Self {
                generation: Mutex::new(Some(generation)),
                gate: None,
            })
        }

        fn gated(generation: Generation, gate: Arc<Notify>) -> BoxAnswerProvider {
            BoxAnswerProvider::new(Self {
                generation: Mutex::new(Some(generation)),
                gate: Some(gate),
            })
        }
    }

    impl AnswerProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn generate_answer(
            &self,
            _prompt: &str,
            _cancel: CancellationToken,
        ) -> Result<Generation, ProviderError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(self
                .generation
                .lock()
                .unwrap()
                .take()
                .expect("generation already taken"))
        }
    }

    /// Rejects every invocation with a fixed message.
    struct FailingProvider {
        message: String,
    }

    impl AnswerProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn model(&self) -> &str {
            "failing-model"
        }

        async fn generate_answer(
            &self,
            _prompt: &str,
            _cancel: CancellationToken,
        ) -> Result<Generation, ProviderError> {
            Err(ProviderError::Provider {
                message: self.message.clone(),
            })
        }
    }

    fn finite_events(events: Vec<Result<AnswerEvent, ProviderError>>) -> AnswerStream {
        Box::pin(stream::iter(events))
    }

    fn never_ending_events(head: Vec<Result<AnswerEvent, ProviderError>>) -> AnswerStream {
        Box::pin(stream::iter(head).chain(stream::pending()))
    }

    async fn await_active_task<R: ProviderResolver + 'static>(session: &mut RelaySession<R>) {
        let active = session.active.as_mut().expect("no active request");
        (&mut active.task).await.expect("generation task panicked");
    }

    #[tokio::test]
    async fn events_are_forwarded_in_order_then_done() {
        let e1 = json!({ "text": "The" });
        let e2 = json!({ "text": "The sky" });
        let e3 = json!({ "text": "The sky is blue" });
        let provider = StubProvider::boxed(Generation {
            events: finite_events(vec![
                Ok(AnswerEvent::Data(e1.clone())),
                Ok(AnswerEvent::Data(e2.clone())),
                Ok(AnswerEvent::Data(e3.clone())),
                Ok(AnswerEvent::Done),
            ]),
            release: None,
        });
        let resolver = StubResolver::new(vec![Ok(provider)]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut session = RelaySession::new(resolver, tx);

        session.handle_question("why is the sky blue?".to_string());
        await_active_task(&mut session).await;

        assert_eq!(rx.recv().await.unwrap(), ChannelReply::Payload(e1));
        assert_eq!(rx.recv().await.unwrap(), ChannelReply::Payload(e2));
        assert_eq!(rx.recv().await.unwrap(), ChannelReply::Payload(e3));
        assert_eq!(rx.recv().await.unwrap(), ChannelReply::Done);
        assert!(rx.try_recv().is_err(), "nothing may follow DONE");
    }

    #[tokio::test]
    async fn resolution_failure_yields_exactly_one_error() {
        let resolver =
            StubResolver::new(vec![Err(ResolveError::UnknownProvider("grok".to_string()))]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut session = RelaySession::new(resolver, tx);

        session.handle_question("anyone there?".to_string());
        await_active_task(&mut session).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            ChannelReply::Error("unknown provider 'grok'".to_string())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn invocation_failure_uses_the_error_text_and_sends_no_done() {
        let provider = BoxAnswerProvider::new(FailingProvider {
            message: "kaboom".to_string(),
        });
        let resolver = StubResolver::new(vec![Ok(provider)]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut session = RelaySession::new(resolver, tx);

        session.handle_question("boom?".to_string());
        await_active_task(&mut session).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            ChannelReply::Error("provider error: kaboom".to_string())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn mid_stream_failure_terminates_with_error_only() {
        let partial = json!({ "text": "partial" });
        let provider = StubProvider::boxed(Generation {
            events: finite_events(vec![
                Ok(AnswerEvent::Data(partial.clone())),
                Err(ProviderError::Stream("connection reset".to_string())),
            ]),
            release: None,
        });
        let resolver = StubResolver::new(vec![Ok(provider)]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut session = RelaySession::new(resolver, tx);

        session.handle_question("stream?".to_string());
        await_active_task(&mut session).await;

        assert_eq!(rx.recv().await.unwrap(), ChannelReply::Payload(partial));
        assert_eq!(
            rx.recv().await.unwrap(),
            ChannelReply::Error("stream error: connection reset".to_string())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_cancels_and_fires_release_exactly_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let hook = {
            let released = released.clone();
            Box::new(move || {
                released.fetch_add(1, Ordering::SeqCst);
            })
        };
        let provider = StubProvider::boxed(Generation {
            events: never_ending_events(vec![Ok(AnswerEvent::Data(json!({ "text": "..." })))]),
            release: Some(hook),
        });
        let resolver = StubResolver::new(vec![Ok(provider)]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut session = RelaySession::new(resolver, tx);

        session.handle_question("hang forever".to_string());
        // The first payload proves the provider call resolved and the
        // release hook is stored.
        assert!(matches!(
            rx.recv().await.unwrap(),
            ChannelReply::Payload(_)
        ));

        let cancel = session.active.as_ref().unwrap().cancel.clone();
        session.disconnect();
        session.disconnect();

        assert!(cancel.is_cancelled());
        assert_eq!(released.load(Ordering::SeqCst), 1);

        await_active_task(&mut session).await;
        // Cancellation posts no message.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_before_provider_resolves_is_tolerated() {
        let released = Arc::new(AtomicUsize::new(0));
        let hook = {
            let released = released.clone();
            Box::new(move || {
                released.fetch_add(1, Ordering::SeqCst);
            })
        };
        let gate = Arc::new(Notify::new());
        let provider = StubProvider::gated(
            Generation {
                events: never_ending_events(vec![]),
                release: Some(hook),
            },
            gate.clone(),
        );
        let resolver = StubResolver::new(vec![Ok(provider)]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut session = RelaySession::new(resolver, tx);

        session.handle_question("slow start".to_string());
        // Disconnect wins the race: the release hook does not exist yet.
        session.disconnect();
        assert_eq!(released.load(Ordering::SeqCst), 0);

        // The provider call resolves afterwards; the late hook still runs,
        // once.
        gate.notify_one();
        await_active_task(&mut session).await;
        assert_eq!(released.load(Ordering::SeqCst), 1);

        session.disconnect();
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn second_question_while_active_is_rejected() {
        let provider = StubProvider::boxed(Generation {
            events: never_ending_events(vec![]),
            release: None,
        });
        let resolver = StubResolver::new(vec![Ok(provider)]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut session = RelaySession::new(resolver, tx);

        session.handle_question("first".to_string());
        session.handle_question("second".to_string());

        assert_eq!(
            rx.recv().await.unwrap(),
            ChannelReply::Error(BUSY_MESSAGE.to_string())
        );

        session.disconnect();
        await_active_task(&mut session).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn busy_reply_is_dropped_rather_than_queued_behind_a_full_channel() {
        let provider = StubProvider::boxed(Generation {
            events: never_ending_events(vec![]),
            release: None,
        });
        let resolver = StubResolver::new(vec![Ok(provider)]);
        let (tx, mut rx) = mpsc::channel(1);
        // Occupy the only slot. The channel owner is also the drainer, so
        // an awaiting send here could never complete.
        tx.send(ChannelReply::Done).await.unwrap();
        let mut session = RelaySession::new(resolver, tx);

        session.handle_question("first".to_string());
        session.handle_question("second".to_string());

        assert_eq!(rx.recv().await.unwrap(), ChannelReply::Done);
        // The busy reply was dropped, not delivered late.
        assert!(rx.try_recv().is_err());

        session.disconnect();
        await_active_task(&mut session).await;
    }

    #[tokio::test]
    async fn a_new_question_is_accepted_once_the_previous_settled() {
        let first = StubProvider::boxed(Generation {
            events: finite_events(vec![Ok(AnswerEvent::Done)]),
            release: None,
        });
        let second = StubProvider::boxed(Generation {
            events: finite_events(vec![Ok(AnswerEvent::Done)]),
            release: None,
        });
        let resolver = StubResolver::new(vec![Ok(first), Ok(second)]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut session = RelaySession::new(resolver, tx);

        session.handle_question("first".to_string());
        await_active_task(&mut session).await;
        assert_eq!(rx.recv().await.unwrap(), ChannelReply::Done);

        session.handle_question("second".to_string());
        await_active_task(&mut session).await;
        assert_eq!(rx.recv().await.unwrap(), ChannelReply::Done);
    }

    #[test]
    fn release_slot_fire_on_empty_is_a_no_op() {
        let slot = ReleaseSlot::new();
        slot.fire();
        slot.fire();
    }

    #[test]
    fn release_slot_store_then_fire_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let slot = ReleaseSlot::new();
        let c = count.clone();
        slot.store(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        slot.fire();
        slot.fire();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_slot_store_after_fire_runs_immediately_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let slot = ReleaseSlot::new();
        slot.fire();
        let c = count.clone();
        slot.store(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        slot.fire();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
