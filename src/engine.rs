// Match engine API boundary. Transports (request/response handlers, push
// hubs, the headless driver) depend on this trait rather than on the
// service's storage and catalog types. It is implemented for `MatchService`.

use crate::cards::Card;
use crate::game::{Match, MatchId, PlayerId};
use crate::hub::MatchEvent;
use crate::service::{
    MatchService, MatchSetup, MatchView, MoveReport, PlayError, PlayRequest, QueryError,
    SetupServiceError,
};
use crate::store::MatchStore;
use tokio::sync::mpsc::UnboundedReceiver;

pub trait MatchEngine: Send + Sync {
    // Setup
    fn create_match(
        &self,
        player1: &PlayerId,
        opponent: Option<&PlayerId>,
    ) -> Result<MatchSetup, SetupServiceError>;
    fn join_match(
        &self,
        match_id: MatchId,
        player: &PlayerId,
    ) -> Result<MatchSetup, SetupServiceError>;
    fn abandon_match(&self, match_id: MatchId) -> Result<Match, SetupServiceError>;

    // Moves
    fn play_card(&self, req: &PlayRequest) -> Result<MoveReport, PlayError>;

    // Queries
    fn match_status(&self, match_id: MatchId) -> Result<MatchView, QueryError>;
    fn hand(&self, match_id: MatchId, player: &PlayerId) -> Result<Vec<Card>, QueryError>;
    fn waiting_matches(&self) -> Result<Vec<Match>, QueryError>;

    // Push
    fn subscribe(&self, match_id: MatchId) -> UnboundedReceiver<MatchEvent>;
}

impl<S, C> MatchEngine for MatchService<S, C>
where
    S: MatchStore,
    C: crate::cards::CardCatalog,
{
    fn create_match(
        &self,
        player1: &PlayerId,
        opponent: Option<&PlayerId>,
    ) -> Result<MatchSetup, SetupServiceError> {
        self.create_match(player1, opponent)
    }
    fn join_match(
        &self,
        match_id: MatchId,
        player: &PlayerId,
    ) -> Result<MatchSetup, SetupServiceError> {
        self.join_match(match_id, player)
    }
    fn abandon_match(&self, match_id: MatchId) -> Result<Match, SetupServiceError> {
        self.abandon_match(match_id)
    }

    fn play_card(&self, req: &PlayRequest) -> Result<MoveReport, PlayError> {
        self.play_card(req)
    }

    fn match_status(&self, match_id: MatchId) -> Result<MatchView, QueryError> {
        self.match_status(match_id)
    }
    fn hand(&self, match_id: MatchId, player: &PlayerId) -> Result<Vec<Card>, QueryError> {
        self.hand(match_id, player)
    }
    fn waiting_matches(&self) -> Result<Vec<Match>, QueryError> {
        self.waiting_matches()
    }

    fn subscribe(&self, match_id: MatchId) -> UnboundedReceiver<MatchEvent> {
        self.subscribe(match_id)
    }
}
