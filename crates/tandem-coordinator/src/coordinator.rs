//! The dual-agent coordinator.
//!
//! One coordinator owns the primary and shadow agents for a deployment and
//! drives all autonomous behavior. Inbound handling is run-to-completion:
//! timers never preempt in-flight work, they spawn new tasks that re-check
//! the world before acting. Every recorded activity, user or agent, re-arms
//! the group's idle timer, so the group always has exactly one pending
//! timer while it is tracked.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use tandem_agent::{
    send_with_reply_fallback, ChatTransport, CompanionAgent, HistoryStore, SendOptions,
};
use tandem_core::{
    split_segments, ConversationHistory, RandomSource, SegmentCache, SegmentId, ThreadRandom,
};
use tandem_router::UsageSnapshot;

use crate::activity::ActivityRegistry;
use crate::burst::{default_tasks, pick_task};
use crate::bus::{InterjectionBus, InterjectionEvent};
use crate::config::CoordinatorConfig;
use crate::error::Result;

/// An inbound group message handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Group (chat) the message arrived in.
    pub group_id: i64,
    /// Transport message id, used for reply threading.
    pub message_id: i64,
    /// Message text.
    pub text: String,
    /// Explicit model override from the user, if any.
    pub override_model: Option<String>,
}

/// Shared-history key for a group.
fn group_key(group_id: i64) -> String {
    format!("group-{group_id}")
}

struct Inner {
    config: CoordinatorConfig,
    primary: Arc<CompanionAgent>,
    shadow: Arc<CompanionAgent>,
    transport: Arc<dyn ChatTransport>,
    history: Arc<Mutex<ConversationHistory>>,
    idle_oracle: Option<Arc<dyn HistoryStore>>,
    activity: ActivityRegistry,
    segments: Mutex<SegmentCache>,
    bus: InterjectionBus,
    rng: Arc<dyn RandomSource>,
}

/// Coordinator for the primary and shadow agents.
pub struct DualAgentCoordinator {
    inner: Arc<Inner>,
}

impl DualAgentCoordinator {
    /// Create a coordinator with the default random source and no external
    /// idle oracle. `history` is the shared conversation history both
    /// agents were constructed with.
    pub fn new(
        config: CoordinatorConfig,
        primary: Arc<CompanionAgent>,
        shadow: Arc<CompanionAgent>,
        transport: Arc<dyn ChatTransport>,
        history: Arc<Mutex<ConversationHistory>>,
    ) -> Result<Self> {
        Self::with_parts(
            config,
            primary,
            shadow,
            transport,
            history,
            None,
            Arc::new(ThreadRandom),
        )
    }

    /// Create a coordinator with every part injected (tests, hosts with a
    /// durable activity oracle).
    pub fn with_parts(
        config: CoordinatorConfig,
        primary: Arc<CompanionAgent>,
        shadow: Arc<CompanionAgent>,
        transport: Arc<dyn ChatTransport>,
        history: Arc<Mutex<ConversationHistory>>,
        idle_oracle: Option<Arc<dyn HistoryStore>>,
        rng: Arc<dyn RandomSource>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                primary,
                shadow,
                transport,
                history,
                idle_oracle,
                activity: ActivityRegistry::new(),
                segments: Mutex::new(SegmentCache::new()),
                bus: InterjectionBus::new(),
                rng,
            }),
        })
    }

    /// Subscribe to shadow-agent interjections.
    pub fn subscribe_interjections(&self) -> broadcast::Receiver<InterjectionEvent> {
        self.inner.bus.subscribe()
    }

    /// Read-only snapshot of the shared usage counters. Both agents route
    /// through one counter, so this covers every decision in the process.
    pub async fn usage_stats(&self) -> UsageSnapshot {
        self.inner.primary.usage_stats().await
    }

    /// Look up a cached reply segment by id (save/copy/expand actions).
    pub async fn cached_segment(&self, id: &SegmentId) -> tandem_core::Result<String> {
        self.inner.segments.lock().await.get(id)
    }

    /// Number of live cached segments.
    pub async fn cached_segment_count(&self) -> usize {
        self.inner.segments.lock().await.len()
    }

    /// Groups with live activity records.
    pub async fn active_groups(&self) -> Vec<i64> {
        self.inner.activity.active_groups().await
    }

    /// Evict groups inactive past the configured horizon, releasing their
    /// timers and in-memory history. Returns the evicted group ids.
    pub async fn sweep_stale_groups(&self) -> Vec<i64> {
        let horizon = ChronoDuration::milliseconds(self.inner.config.stale_group_horizon_ms as i64);
        let swept = self.inner.activity.sweep_stale(horizon).await;
        if !swept.is_empty() {
            let mut history = self.inner.history.lock().await;
            for id in &swept {
                history.clear(&group_key(*id));
            }
        }
        swept
    }

    /// Primary entry point: handle one inbound group message.
    ///
    /// Abandons any in-flight burst for the group, answers through the
    /// primary agent, caches the reply's segments when it is long, resets
    /// the idle timer, and schedules a possible shadow interjection.
    pub async fn handle_inbound_message(&self, message: InboundMessage) -> Result<()> {
        let inner = &self.inner;
        inner.activity.bump_epoch(message.group_id).await;
        inner.activity.note_activity(message.group_id).await;

        let key = group_key(message.group_id);
        let reply = inner
            .primary
            .reply(&key, &message.text, message.override_model.as_deref())
            .await;
        Inner::cache_long_reply(inner, message.group_id, &reply.content).await;
        let sent_id = send_with_reply_fallback(
            inner.transport.as_ref(),
            message.group_id,
            &reply.content,
            Some(message.message_id),
        )
        .await?;
        Inner::touch(inner, message.group_id).await;

        debug!(
            group_id = message.group_id,
            model = %reply.decision.model,
            reason = %reply.decision.reason,
            degraded = reply.degraded,
            "Primary reply sent"
        );

        Inner::schedule_interjection(Arc::clone(inner), message.group_id, sent_id, reply.content);
        Ok(())
    }
}

impl Inner {
    /// Record activity and re-arm the idle timer. Called for every message
    /// sent into the group, user and agent alike.
    async fn touch(inner: &Arc<Inner>, group_id: i64) {
        inner.activity.note_activity(group_id).await;
        Inner::arm_idle_timer(inner, group_id).await;
    }

    /// Install a fresh idle timer with a randomized delay, replacing any
    /// pending one. The fired timer hands off to a detached task so that a
    /// later replacement can only cancel the waiting, never work already
    /// in flight.
    async fn arm_idle_timer(inner: &Arc<Inner>, group_id: i64) {
        let config = &inner.config;
        let delay_ms = inner
            .rng
            .next_in_range(config.idle_window_min_ms, config.idle_window_max_ms + 1);
        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            tokio::spawn(Inner::idle_timer_fired(task_inner, group_id));
        });
        inner.activity.install_timer(group_id, handle).await;
        debug!(group_id, delay_ms, "Idle timer armed");
    }

    /// Re-arm the timer unless the group has been swept in the meantime.
    async fn rearm_if_tracked(inner: &Arc<Inner>, group_id: i64) {
        if inner.activity.contains(group_id).await {
            Inner::arm_idle_timer(inner, group_id).await;
        }
    }

    /// A fired timer only nominates the group; real idleness and the burst
    /// cooldown are re-checked before anything happens. Whatever the
    /// outcome, the group leaves with a fresh pending timer.
    fn idle_timer_fired(
        inner: Arc<Inner>,
        group_id: i64,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(async move {
        let min_idle = ChronoDuration::milliseconds(inner.config.idle_window_min_ms as i64);
        let cooldown = ChronoDuration::milliseconds(inner.config.burst_cooldown_ms as i64);

        if let Some(oracle) = &inner.idle_oracle {
            let threshold_minutes = (inner.config.idle_window_min_ms / 60_000).max(1) as i64;
            match oracle.is_idle(&group_key(group_id), threshold_minutes).await {
                Ok(false) => {
                    debug!(group_id, "Durable store reports recent activity, skipping burst");
                    Inner::rearm_if_tracked(&inner, group_id).await;
                    return;
                }
                Ok(true) => {}
                Err(e) => {
                    warn!(group_id, error = %e, "Idle oracle failed, trusting local state");
                }
            }
        }

        if !inner.activity.try_begin_burst(group_id, min_idle, cooldown).await {
            Inner::rearm_if_tracked(&inner, group_id).await;
            return;
        }
        let epoch = inner.activity.epoch(group_id).await;
        info!(group_id, "Group idle, starting autonomous burst");
        Inner::run_idle_burst(&inner, group_id, epoch).await;
        Inner::rearm_if_tracked(&inner, group_id).await;
        })
    }

    /// Run one multi-turn autonomous exchange. Stops early if a real user
    /// message moves the group's epoch; the turn already in flight is the
    /// last one sent.
    async fn run_idle_burst(inner: &Arc<Inner>, group_id: i64, epoch: u64) {
        let config = &inner.config;
        let turns = inner
            .rng
            .next_in_range(config.burst_turns_min, config.burst_turns_max + 1);
        let key = group_key(group_id);

        for turn in 1..=turns {
            if inner.activity.epoch(group_id).await != epoch {
                info!(group_id, turn, "Burst abandoned, real message arrived");
                return;
            }

            let task = pick_task(default_tasks(), inner.rng.as_ref());
            let reply = inner.primary.compose(&key, task.instruction).await;
            Inner::cache_long_reply(inner, group_id, &reply.content).await;
            if let Err(e) = inner
                .transport
                .send_message(group_id, &reply.content, &SendOptions::default())
                .await
            {
                warn!(group_id, error = %e, "Burst send failed, ending burst");
                return;
            }
            Inner::touch(inner, group_id).await;
            debug!(group_id, turn, task = task.name, "Burst turn sent");

            if turn % config.shadow_reaction_every == 0 {
                Inner::shadow_interject(inner, group_id, None, &reply.content, false).await;
            }
            if turn < turns {
                sleep(Duration::from_millis(config.inter_turn_delay_ms)).await;
            }
        }
        debug!(group_id, turns, "Burst complete");
    }

    /// Split a structured or oversized primary response into addressable
    /// segments so later user actions (save, copy, expand) can reference
    /// one piece by id. Unstructured short replies stay uncached.
    async fn cache_long_reply(inner: &Arc<Inner>, group_id: i64, content: &str) {
        let pieces = split_segments(content);
        if pieces.len() < 2 {
            return;
        }
        let owner = group_key(group_id);
        let mut cache = inner.segments.lock().await;
        let count = pieces.len();
        for piece in pieces {
            let id = cache.put(piece, &owner);
            debug!(group_id, segment_id = %id, "Cached reply segment");
        }
        debug!(group_id, segments = count, "Reply split into segments");
    }

    /// Schedule a delayed shadow interjection for a primary reply.
    fn schedule_interjection(inner: Arc<Inner>, group_id: i64, reply_to: i64, context: String) {
        if inner.shadow.persona().interjection_chance <= 0.0 {
            return;
        }
        let delay = Duration::from_millis(inner.config.shadow_delay_ms);
        tokio::spawn(async move {
            sleep(delay).await;
            Inner::shadow_interject(&inner, group_id, Some(reply_to), &context, true).await;
        });
    }

    /// Let the shadow agent react to something the primary said. When
    /// `allow_counter` is set, the primary may counter-reply exactly once;
    /// the counter-reply itself never schedules anything further, which is
    /// what bounds the bounce to one hop.
    async fn shadow_interject(
        inner: &Arc<Inner>,
        group_id: i64,
        reply_to: Option<i64>,
        context: &str,
        allow_counter: bool,
    ) {
        let shadow_persona = inner.shadow.persona();
        if !inner.rng.roll(shadow_persona.interjection_chance) {
            debug!(group_id, "Shadow declined to interject");
            return;
        }

        let key = group_key(group_id);
        let instruction = format!(
            "{} just said: \"{}\". Add a brief reaction or aside of your own \
             if you have one.",
            inner.primary.persona().name,
            context
        );
        let reply = inner.shadow.compose(&key, &instruction).await;
        if reply.degraded {
            // An unsolicited canned apology would read as noise; stay quiet.
            debug!(group_id, "Shadow generation degraded, staying quiet");
            return;
        }

        let sent_id = match send_with_reply_fallback(
            inner.transport.as_ref(),
            group_id,
            &reply.content,
            reply_to,
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(group_id, error = %e, "Shadow interjection send failed");
                return;
            }
        };
        Inner::touch(inner, group_id).await;
        inner.bus.publish(InterjectionEvent {
            group_id,
            agent_id: shadow_persona.id.clone(),
            content: reply.content.clone(),
            in_reply_to: reply_to,
        });

        if allow_counter && inner.rng.roll(inner.primary.persona().counter_reply_chance) {
            Inner::counter_reply(inner, group_id, sent_id, &reply.content).await;
        }
    }

    /// One-hop counter-reply from the primary to a shadow interjection.
    async fn counter_reply(inner: &Arc<Inner>, group_id: i64, reply_to: i64, context: &str) {
        let key = group_key(group_id);
        let instruction = format!(
            "{} chimed in: \"{}\". Answer them in one short sentence, then \
             let it go.",
            inner.shadow.persona().name,
            context
        );
        let reply = inner.primary.compose(&key, &instruction).await;
        if reply.degraded {
            return;
        }
        if let Err(e) = send_with_reply_fallback(
            inner.transport.as_ref(),
            group_id,
            &reply.content,
            Some(reply_to),
        )
        .await
        {
            warn!(group_id, error = %e, "Counter-reply send failed");
            return;
        }
        Inner::touch(inner, group_id).await;
        debug!(group_id, "Counter-reply sent");
    }
}
