//! One negotiation instance toward one remote session.

use kupid_shared::protocol::{IceCandidate, SessionDescription};

use super::{
    error::NegotiationError,
    media::PeerConnection,
    state::{LinkEvent, LinkState},
};

pub struct PeerLink {
    remote: String,
    generation: u64,
    state: LinkState,
    initiator: bool,
    connection: Box<dyn PeerConnection>,
    has_remote_description: bool,
    inbound_media: bool,
}

impl PeerLink {
    /// # Arguments
    ///
    /// * `remote` - Remote session id
    /// * `generation` - Distinguishes this link from earlier links to the same remote
    /// * `initiator` - Whether this side sends the first offer
    /// * `connection` - Engine-side peer connection owned by the link
    pub fn new(
        remote: String,
        generation: u64,
        initiator: bool,
        connection: Box<dyn PeerConnection>,
    ) -> Self {
        Self {
            remote,
            generation,
            state: LinkState::Idle,
            initiator,
            connection,
            has_remote_description: false,
            inbound_media: false,
        }
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    pub fn has_remote_description(&self) -> bool {
        self.has_remote_description
    }

    pub fn has_inbound_media(&self) -> bool {
        self.inbound_media
    }

    /// Create and apply a local offer (`idle → offering`)
    pub async fn start_offer(&mut self) -> Result<SessionDescription, NegotiationError> {
        let next = self.state.transition(LinkEvent::LocalOffer)?;
        let offer = self.connection.create_offer().await?;
        self.connection.set_local_description(offer.clone()).await?;
        self.state = next;
        Ok(offer)
    }

    /// Apply a remote offer and produce the answer
    ///
    /// On glare (`offering`) the pending local offer is rolled back first and
    /// this side continues as the non-initiating one. A failed rollback is
    /// reported as [`NegotiationError::RollbackFailed`]; the link is then unusable.
    pub async fn accept_offer(
        &mut self,
        offer: SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        if self.state == LinkState::Offering {
            tracing::info!(remote = %self.remote, "glare: rolling back local offer");
            self.connection
                .rollback()
                .await
                .map_err(NegotiationError::RollbackFailed)?;
            self.state = self.state.transition(LinkEvent::Rollback)?;
            self.initiator = false;
        }

        let next = self.state.transition(LinkEvent::RemoteOffer)?;
        self.connection.set_remote_description(offer).await?;
        self.has_remote_description = true;
        let answer = self.connection.create_answer().await?;
        self.connection.set_local_description(answer.clone()).await?;
        self.state = next;
        Ok(answer)
    }

    /// Apply the remote answer (`offering → connected`)
    pub async fn accept_answer(
        &mut self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let next = self.state.transition(LinkEvent::RemoteAnswer)?;
        self.connection.set_remote_description(answer).await?;
        self.has_remote_description = true;
        self.state = next;
        Ok(())
    }

    pub async fn add_candidate(&mut self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        self.connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    /// The engine reported a connected transport
    pub fn mark_connected(&mut self) {
        if let Ok(next) = self.state.transition(LinkEvent::MediaConnected) {
            self.state = next;
        }
    }

    /// A remote track arrived
    pub fn mark_inbound_media(&mut self) {
        self.inbound_media = true;
        self.mark_connected();
    }

    pub async fn close(&mut self) {
        if let Ok(next) = self.state.transition(LinkEvent::Close) {
            self.connection.close().await;
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::negotiation::{
        loopback::{LoopbackFactory, LoopbackOptions},
        media::{LinkContext, MediaDirection, PeerConnectionFactory},
    };

    fn link(factory: &LoopbackFactory, initiator: bool) -> PeerLink {
        let (tx, _rx) = mpsc::unbounded_channel();
        let context = LinkContext {
            local: "S1".to_string(),
            remote: "S2".to_string(),
            generation: 1,
            direction: MediaDirection::SendRecv,
        };
        PeerLink::new("S2".to_string(), 1, initiator, factory.create(context, tx))
    }

    #[tokio::test]
    async fn test_glare_rolls_back_and_answers() {
        // テスト項目: offering 中に offer を受けると rollback して answering になる
        // given (前提条件):
        let factory = LoopbackFactory::default();
        let mut link = link(&factory, true);
        link.start_offer().await.unwrap();

        // when (操作):
        let answer = link
            .accept_offer(SessionDescription::offer("v=0 remote"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(answer.kind, kupid_shared::protocol::SdpKind::Answer);
        assert_eq!(link.state(), LinkState::Answering);
        assert!(!link.is_initiator());
        assert_eq!(factory.recorder().log().rollbacks, 1);
    }

    #[tokio::test]
    async fn test_failed_rollback_is_reported() {
        // テスト項目: rollback に失敗すると RollbackFailed が返る
        // given (前提条件):
        let factory = LoopbackFactory::new(LoopbackOptions {
            fail_rollback: true,
            ..LoopbackOptions::default()
        });
        let mut link = link(&factory, true);
        link.start_offer().await.unwrap();

        // when (操作):
        let result = link
            .accept_offer(SessionDescription::offer("v=0 remote"))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(NegotiationError::RollbackFailed(_))));
    }

    #[tokio::test]
    async fn test_answer_completes_offering_link() {
        // テスト項目: answer を受けると offering から connected になる
        // given (前提条件):
        let factory = LoopbackFactory::default();
        let mut link = link(&factory, true);
        link.start_offer().await.unwrap();

        // when (操作):
        link.accept_answer(SessionDescription::answer("v=0 remote"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(link.state(), LinkState::Connected);
        assert!(link.has_remote_description());
    }

    #[tokio::test]
    async fn test_answer_without_offer_is_rejected() {
        // テスト項目: offer を出していないリンクへの answer は無効な遷移になる
        // given (前提条件):
        let factory = LoopbackFactory::default();
        let mut link = link(&factory, false);

        // when (操作):
        let result = link
            .accept_answer(SessionDescription::answer("v=0 stale"))
            .await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(NegotiationError::InvalidTransition { .. })
        ));
        assert_eq!(link.state(), LinkState::Idle);
    }

    #[tokio::test]
    async fn test_close_is_terminal() {
        // テスト項目: close 後は offer を開始できない
        // given (前提条件):
        let factory = LoopbackFactory::default();
        let mut link = link(&factory, true);

        // when (操作):
        link.close().await;
        let result = link.start_offer().await;

        // then (期待する結果):
        assert_eq!(link.state(), LinkState::Closed);
        assert!(result.is_err());
        assert_eq!(factory.recorder().log().closed, vec![("S2".to_string(), 1)]);
    }
}
