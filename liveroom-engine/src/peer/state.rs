use std::fmt;

/// Negotiation state of a single peer link.
///
/// Initiator: `Idle -> Offering -> AwaitingAnswer -> Stable`.
/// Responder: `Idle -> Answering -> Stable`.
/// Any state may move to `Closed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    Idle,
    Offering,
    AwaitingAnswer,
    Answering,
    Stable,
    Closed,
}

impl LinkState {
    /// True while one side has an offer outstanding.
    pub fn is_offering(self) -> bool {
        matches!(self, LinkState::Offering | LinkState::AwaitingAnswer)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Idle => "idle",
            LinkState::Offering => "offering",
            LinkState::AwaitingAnswer => "awaiting-answer",
            LinkState::Answering => "answering",
            LinkState::Stable => "stable",
            LinkState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Inputs that drive a [`LinkState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkInput {
    /// Local side starts creating an offer.
    BeginOffer,
    /// The local offer was applied and sent.
    OfferSent,
    /// A remote offer is being applied.
    RemoteOffer,
    /// The local answer was applied and sent.
    AnswerSent,
    /// The remote answer was applied.
    RemoteAnswer,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("input {input:?} is not accepted in state {from}")]
pub struct InvalidTransition {
    pub from: LinkState,
    pub input: LinkInput,
}

/// The single transition function of the peer link state machine.
pub fn transition(from: LinkState, input: LinkInput) -> Result<LinkState, InvalidTransition> {
    use LinkInput::*;
    use LinkState::*;

    let next = match (from, input) {
        (Closed, _) => return Err(InvalidTransition { from, input }),
        (_, Close) => Closed,
        (Idle, BeginOffer) => Offering,
        (Offering, OfferSent) => AwaitingAnswer,
        (AwaitingAnswer, RemoteAnswer) => Stable,
        (Idle, RemoteOffer) => Answering,
        (Answering, AnswerSent) => Stable,
        _ => return Err(InvalidTransition { from, input }),
    };
    Ok(next)
}
