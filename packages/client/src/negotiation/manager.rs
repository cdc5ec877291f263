//! Room-level negotiation driver.
//!
//! `NegotiationManager` owns every [`PeerLink`] of the current room, the pending
//! candidate buffer and the room-scoped timers. It is fed three kinds of input
//! by the session loop: server events, media engine callbacks and fired timers.
//! Outgoing signaling is written to the `outbound` channel.
//!
//! Roles per pair:
//! - a joining participant receives `existing-participants` and initiates
//!   toward each listed peer
//! - an existing participant receives `user-joined` and waits for the offer
//! - a spectator receives `current-participants` and initiates (receive only)
//!   toward every participant, and toward each participant announced later by
//!   `user-joined`
//!
//! When both sides of a pair are `offering` at once (reconnect or retry races)
//! the side with the smaller session id keeps its offer and ignores the
//! incoming one; the other side rolls back and answers. Exactly one
//! offer/answer exchange completes.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use kupid_shared::protocol::{ClientEvent, IceCandidate, SdpKind, ServerEvent, SessionDescription};
use tokio::sync::mpsc;

use super::{
    candidate_buffer::CandidateBuffer,
    error::NegotiationError,
    media::{
        LinkContext, MediaDirection, MediaEvent, MediaEventKind, PeerConnectionFactory,
    },
    peer_link::PeerLink,
    state::LinkState,
    timer::{ClientTimerKey, ClientTimers, TimerFired},
};

#[derive(Debug, Clone)]
pub struct NegotiationConfig {
    /// Delay of the single bounded retry toward a peer
    pub retry_delay: Duration,
    /// Delay before re-querying the participant list when no media arrived
    pub participant_check_delay: Duration,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
            participant_check_delay: Duration::from_secs(3),
        }
    }
}

/// The local client's role in the current room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalRole {
    Participant,
    Spectator,
}

/// Input delivered by the media engine or a timer
#[derive(Debug)]
pub enum NegotiationInput {
    Media(MediaEvent),
    Timer(TimerFired),
}

/// Receiving half of the manager's internal channels
pub struct NegotiationInbox {
    media: mpsc::UnboundedReceiver<MediaEvent>,
    timers: mpsc::UnboundedReceiver<TimerFired>,
}

impl NegotiationInbox {
    pub async fn recv(&mut self) -> Option<NegotiationInput> {
        tokio::select! {
            Some(event) = self.media.recv() => Some(NegotiationInput::Media(event)),
            Some(fired) = self.timers.recv() => Some(NegotiationInput::Timer(fired)),
            else => None,
        }
    }
}

#[derive(Debug, Default)]
struct RetryBudget {
    /// One retry granted per join event; consumed when the timer fires
    available: bool,
}

pub struct NegotiationManager {
    local: String,
    config: NegotiationConfig,
    factory: Arc<dyn PeerConnectionFactory>,
    outbound: mpsc::UnboundedSender<ClientEvent>,
    media_tx: mpsc::UnboundedSender<MediaEvent>,
    room: Option<String>,
    role: Option<LocalRole>,
    /// Remote participants of the current room as last reported by the server
    participants: HashSet<String>,
    links: HashMap<String, PeerLink>,
    candidates: CandidateBuffer,
    retries: HashMap<String, RetryBudget>,
    timers: ClientTimers,
    next_generation: u64,
}

impl NegotiationManager {
    /// # Arguments
    ///
    /// * `local` - This client's session id
    /// * `config` - Retry and participant-check delays
    /// * `factory` - Media engine used to create peer connections
    /// * `outbound` - Events to send to the server
    ///
    /// # Returns
    ///
    /// The manager and the inbox the session loop must poll and feed back
    /// through [`NegotiationManager::handle_input`].
    pub fn new(
        local: String,
        config: NegotiationConfig,
        factory: Arc<dyn PeerConnectionFactory>,
        outbound: mpsc::UnboundedSender<ClientEvent>,
    ) -> (Self, NegotiationInbox) {
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let manager = Self {
            local,
            config,
            factory,
            outbound,
            media_tx,
            room: None,
            role: None,
            participants: HashSet::new(),
            links: HashMap::new(),
            candidates: CandidateBuffer::new(),
            retries: HashMap::new(),
            timers: ClientTimers::new(timer_tx),
            next_generation: 0,
        };
        let inbox = NegotiationInbox {
            media: media_rx,
            timers: timer_rx,
        };
        (manager, inbox)
    }

    pub fn local_session(&self) -> &str {
        &self.local
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn role(&self) -> Option<LocalRole> {
        self.role
    }

    pub fn link(&self, remote: &str) -> Option<&PeerLink> {
        self.links.get(remote)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn pending_candidates(&self, remote: &str) -> usize {
        self.candidates.len(remote)
    }

    pub fn is_retry_armed(&self, remote: &str) -> bool {
        self.timers
            .is_armed(&ClientTimerKey::Retry(remote.to_string()))
    }

    fn send(&self, event: ClientEvent) {
        if self.outbound.send(event).is_err() {
            tracing::debug!("outbound channel closed, dropping event");
        }
    }

    // ========================================
    // Room lifecycle
    // ========================================

    /// Join `room_id`, leaving the current room first
    ///
    /// Joining the room we are already set up for is a no-op.
    pub async fn join_room(&mut self, room_id: &str) {
        if self.room.as_deref() == Some(room_id) {
            tracing::debug!(room_id, "already set up for room, skipping");
            return;
        }
        self.leave_room().await;

        tracing::info!(room_id, session = %self.local, "joining room");
        self.room = Some(room_id.to_string());
        self.send(ClientEvent::JoinRoom {
            room_id: room_id.to_string(),
            session: self.local.clone(),
        });
        self.timers.arm(
            ClientTimerKey::ParticipantCheck,
            self.config.participant_check_delay,
        );
    }

    /// Leave the current room and tear down every link and timer scoped to it
    pub async fn leave_room(&mut self) {
        let Some(room_id) = self.room.take() else {
            return;
        };
        self.send(ClientEvent::LeaveRoom {
            room_id: room_id.clone(),
        });
        self.teardown().await;
        tracing::info!(%room_id, "left room");
    }

    /// Drop all room state without notifying the server (transport lost)
    pub async fn reset(&mut self) {
        self.room = None;
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        self.timers.cancel_all();
        for (_, mut link) in self.links.drain() {
            link.close().await;
        }
        self.candidates.clear();
        self.participants.clear();
        self.retries.clear();
        self.role = None;
    }

    // ========================================
    // Server events
    // ========================================

    /// Handle a server event; events unrelated to negotiation are ignored
    pub async fn handle_server_event(&mut self, event: &ServerEvent) {
        if self.room.is_none() {
            return;
        }
        match event {
            ServerEvent::ExistingParticipants {
                participant_sessions,
            } => {
                self.on_participant_list(participant_sessions, LocalRole::Participant)
                    .await;
            }
            ServerEvent::CurrentParticipants {
                participant_sessions,
            } => {
                self.on_participant_list(participant_sessions, LocalRole::Spectator)
                    .await;
            }
            ServerEvent::UserJoined { session } => self.on_user_joined(session).await,
            ServerEvent::UserLeft { session } => self.on_user_left(session).await,
            ServerEvent::Offer {
                from_session,
                payload,
            } => {
                if let Err(e) = self.on_offer(from_session, payload).await {
                    tracing::warn!(remote = %from_session, "failed to handle offer: {}", e);
                }
            }
            ServerEvent::Answer {
                from_session,
                payload,
            } => {
                if let Err(e) = self.on_answer(from_session, payload).await {
                    tracing::warn!(remote = %from_session, "failed to handle answer: {}", e);
                }
            }
            ServerEvent::Candidate {
                from_session,
                payload,
            } => {
                if let Err(e) = self.on_candidate(from_session, payload).await {
                    tracing::warn!(remote = %from_session, "failed to handle candidate: {}", e);
                }
            }
            _ => {}
        }
    }

    /// `existing-participants` / `current-participants`
    ///
    /// The first list after a join fixes the local role and grants each listed
    /// peer its retry; later lists (participant re-query) only add missing links.
    async fn on_participant_list(&mut self, sessions: &[String], role: LocalRole) {
        let initial = self.role.is_none();
        if initial {
            tracing::info!(?role, "local role assigned");
            self.role = Some(role);
        }

        let local = self.local.clone();
        for remote in sessions.iter().filter(|s| **s != local) {
            self.participants.insert(remote.clone());
            if initial {
                self.grant_retry(remote);
            }
            let has_link = self
                .links
                .get(remote)
                .is_some_and(|link| !link.state().is_closed());
            if !has_link {
                self.initiate(remote).await;
            }
        }
    }

    /// `user-joined`
    ///
    /// Participants wait for the joiner's offer. Spectators open a receive-only
    /// link toward the participant that filled the slot.
    async fn on_user_joined(&mut self, remote: &str) {
        if remote == self.local {
            return;
        }
        self.participants.insert(remote.to_string());
        self.grant_retry(remote);
        if self.role == Some(LocalRole::Spectator) {
            tracing::info!(%remote, "participant joined, opening receive-only link");
            self.initiate(remote).await;
        } else {
            tracing::info!(%remote, "peer joined, waiting for its offer");
        }
    }

    async fn on_user_left(&mut self, remote: &str) {
        tracing::info!(%remote, "peer left");
        self.participants.remove(remote);
        self.retries.remove(remote);
        self.timers
            .cancel(&ClientTimerKey::Retry(remote.to_string()));
        self.candidates.discard(remote);
        if let Some(mut link) = self.links.remove(remote) {
            link.close().await;
            tracing::info!(%remote, "remote stream removed");
        }
    }

    async fn on_offer(
        &mut self,
        remote: &str,
        payload: &serde_json::Value,
    ) -> Result<(), NegotiationError> {
        let offer = parse_description(payload, SdpKind::Offer)?;

        if self
            .links
            .get(remote)
            .is_some_and(|link| link.state() == LinkState::Offering)
            && self.keeps_offer_on_glare(remote)
        {
            tracing::info!(%remote, "glare: keeping local offer, remote offer ignored");
            return Ok(());
        }

        if !self
            .links
            .get(remote)
            .is_some_and(|link| !link.state().is_closed())
        {
            self.replace_link(remote, false);
        }

        let result = match self.links.get_mut(remote) {
            Some(link) => link.accept_offer(offer.clone()).await,
            None => return Ok(()),
        };
        let answer = match result {
            Ok(answer) => answer,
            Err(e) => {
                // リンクを作り直し、非開始側として同じ offer を一度だけ適用し直す
                tracing::warn!(%remote, "recreating link after failed offer: {}", e);
                self.close_link(remote).await;
                self.replace_link(remote, false);
                match self.links.get_mut(remote) {
                    Some(link) => link.accept_offer(offer).await?,
                    None => return Ok(()),
                }
            }
        };

        self.send(ClientEvent::Answer {
            to_session: remote.to_string(),
            payload: serde_json::to_value(&answer)?,
        });
        self.flush_candidates(remote).await;
        Ok(())
    }

    async fn on_answer(
        &mut self,
        remote: &str,
        payload: &serde_json::Value,
    ) -> Result<(), NegotiationError> {
        let answer = parse_description(payload, SdpKind::Answer)?;
        let Some(link) = self.links.get_mut(remote) else {
            tracing::debug!(%remote, "answer for unknown link ignored");
            return Ok(());
        };
        match link.accept_answer(answer).await {
            Ok(()) => {
                self.flush_candidates(remote).await;
                Ok(())
            }
            Err(NegotiationError::InvalidTransition { from, .. }) => {
                tracing::debug!(%remote, ?from, "stale answer ignored");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn on_candidate(
        &mut self,
        remote: &str,
        payload: &serde_json::Value,
    ) -> Result<(), NegotiationError> {
        let candidate: IceCandidate = serde_json::from_value(payload.clone())?;
        match self.links.get_mut(remote) {
            Some(link) if link.has_remote_description() && !link.state().is_closed() => {
                if let Err(e) = link.add_candidate(candidate.clone()).await {
                    tracing::debug!(%remote, "candidate rejected, buffering: {}", e);
                    self.candidates.push(remote, candidate);
                }
            }
            _ => self.candidates.push(remote, candidate),
        }
        Ok(())
    }

    /// Apply buffered candidates once the remote description has landed
    async fn flush_candidates(&mut self, remote: &str) {
        let Some(link) = self.links.get_mut(remote) else {
            return;
        };
        if !link.has_remote_description() {
            return;
        }
        for candidate in self.candidates.drain(remote) {
            if let Err(e) = link.add_candidate(candidate).await {
                tracing::warn!(%remote, "failed to apply buffered candidate: {}", e);
            }
        }
    }

    // ========================================
    // Links
    // ========================================

    /// Glare tie-break: the side with the smaller session id keeps its offer,
    /// the other side rolls back and answers
    fn keeps_offer_on_glare(&self, remote: &str) -> bool {
        self.local.as_str() < remote
    }

    fn direction(&self) -> MediaDirection {
        match self.role {
            Some(LocalRole::Spectator) => MediaDirection::RecvOnly,
            _ => MediaDirection::SendRecv,
        }
    }

    /// Install a fresh idle link toward `remote`, replacing any previous one
    fn replace_link(&mut self, remote: &str, initiator: bool) {
        self.next_generation += 1;
        let context = LinkContext {
            local: self.local.clone(),
            remote: remote.to_string(),
            generation: self.next_generation,
            direction: self.direction(),
        };
        tracing::debug!(%remote, generation = self.next_generation, initiator, "creating link");
        let connection = self.factory.create(context, self.media_tx.clone());
        let link = PeerLink::new(
            remote.to_string(),
            self.next_generation,
            initiator,
            connection,
        );
        self.links.insert(remote.to_string(), link);
    }

    async fn close_link(&mut self, remote: &str) {
        if let Some(mut link) = self.links.remove(remote) {
            link.close().await;
        }
    }

    /// Create a new initiating link toward `remote` and send the offer
    async fn initiate(&mut self, remote: &str) {
        self.close_link(remote).await;
        self.replace_link(remote, true);
        let Some(link) = self.links.get_mut(remote) else {
            return;
        };
        let offer = match link.start_offer().await {
            Ok(offer) => offer,
            Err(e) => {
                tracing::warn!(%remote, "failed to create offer: {}", e);
                return;
            }
        };
        match serde_json::to_value(&offer) {
            Ok(payload) => {
                tracing::info!(%remote, "sending offer");
                self.send(ClientEvent::Offer {
                    to_session: remote.to_string(),
                    payload,
                });
            }
            Err(e) => tracing::error!("failed to encode offer: {}", e),
        }
    }

    // ========================================
    // Retry
    // ========================================

    fn grant_retry(&mut self, remote: &str) {
        self.retries
            .insert(remote.to_string(), RetryBudget { available: true });
        self.timers
            .arm(ClientTimerKey::Retry(remote.to_string()), self.config.retry_delay);
    }

    fn arm_retry_if_unused(&mut self, remote: &str) {
        let available = self.retries.get(remote).is_some_and(|r| r.available);
        let key = ClientTimerKey::Retry(remote.to_string());
        if available && !self.timers.is_armed(&key) {
            self.timers.arm(key, self.config.retry_delay);
        }
    }

    async fn on_retry(&mut self, remote: &str) {
        let Some(budget) = self.retries.get_mut(remote) else {
            return;
        };
        if !budget.available {
            return;
        }
        budget.available = false;

        if !self.participants.contains(remote) {
            return;
        }
        if self
            .links
            .get(remote)
            .is_some_and(PeerLink::has_inbound_media)
        {
            return;
        }
        tracing::info!(%remote, "no remote media yet, retrying as initiator");
        self.initiate(remote).await;
    }

    async fn on_participant_check(&mut self) {
        let Some(room_id) = self.room.clone() else {
            return;
        };
        if self.links.values().any(PeerLink::has_inbound_media) {
            return;
        }
        tracing::info!(%room_id, "no remote media yet, re-querying participants");
        self.send(ClientEvent::GetRoomParticipants { room_id });
    }

    // ========================================
    // Media / timers
    // ========================================

    pub async fn handle_input(&mut self, input: NegotiationInput) {
        match input {
            NegotiationInput::Media(event) => self.handle_media_event(event).await,
            NegotiationInput::Timer(fired) => self.handle_timer(fired).await,
        }
    }

    pub async fn handle_media_event(&mut self, event: MediaEvent) {
        let current = self
            .links
            .get(&event.remote)
            .is_some_and(|link| link.generation() == event.generation);
        if !current {
            tracing::trace!(remote = %event.remote, generation = event.generation, "stale media event");
            return;
        }
        let remote = event.remote;

        match event.kind {
            MediaEventKind::LocalCandidate(candidate) => match serde_json::to_value(&candidate) {
                Ok(payload) => self.send(ClientEvent::Candidate {
                    to_session: remote,
                    payload,
                }),
                Err(e) => tracing::error!("failed to encode candidate: {}", e),
            },
            MediaEventKind::TrackReceived => {
                if let Some(link) = self.links.get_mut(&remote) {
                    link.mark_inbound_media();
                }
                tracing::info!(%remote, "remote stream attached");
            }
            MediaEventKind::Connected => {
                if let Some(link) = self.links.get_mut(&remote) {
                    link.mark_connected();
                }
            }
            kind @ (MediaEventKind::Failed | MediaEventKind::Closed) => {
                tracing::warn!(%remote, ?kind, "link lost, remote stream removed");
                self.close_link(&remote).await;
                if self.participants.contains(&remote) {
                    self.arm_retry_if_unused(&remote);
                }
            }
        }
    }

    pub async fn handle_timer(&mut self, fired: TimerFired) {
        if !self.timers.take_if_current(&fired) {
            return;
        }
        match fired.key {
            ClientTimerKey::Retry(remote) => self.on_retry(&remote).await,
            ClientTimerKey::ParticipantCheck => self.on_participant_check().await,
        }
    }

    /// State of the link toward `remote`, if any
    pub fn link_state(&self, remote: &str) -> Option<LinkState> {
        self.links.get(remote).map(PeerLink::state)
    }
}

fn parse_description(
    payload: &serde_json::Value,
    expected: SdpKind,
) -> Result<SessionDescription, NegotiationError> {
    let desc: SessionDescription = serde_json::from_value(payload.clone())?;
    if desc.kind != expected {
        return Err(NegotiationError::UnexpectedKind {
            expected,
            actual: desc.kind,
        });
    }
    Ok(desc)
}
