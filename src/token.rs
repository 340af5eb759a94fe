//! Staleness tokens for asynchronous operations.
//!
//! Every extraction and every playback request is tagged with a [`Token`]
//! minted by a [`TokenSource`].  The orchestrator remembers the live token of
//! each subsystem in a [`TokenSlot`]; a result is applied only if
//! [`TokenSlot::settle`] accepts its token.  Issuing a new token replaces the
//! old one, so results from superseded operations are dropped.

use std::fmt;

/// Opaque identifier of one asynchronous request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u64);

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mints strictly increasing tokens.  Never yields the same token twice.
#[derive(Debug, Default)]
pub struct TokenSource {
    next: u64,
}

impl TokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self) -> Token {
        self.next += 1;
        Token(self.next)
    }
}

/// Holds at most one live token for a subsystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenSlot(Option<Token>);

impl TokenSlot {
    /// Mint a new token and make it the live one, invalidating any previous.
    pub fn issue(&mut self, source: &mut TokenSource) -> Token {
        let token = source.mint();
        self.0 = Some(token);
        token
    }

    /// Accept a result for `token`.
    ///
    /// Returns `true` and clears the slot when `token` is the live one;
    /// returns `false` (slot untouched) for stale tokens.
    pub fn settle(&mut self, token: Token) -> bool {
        if self.0 == Some(token) {
            self.0 = None;
            true
        } else {
            false
        }
    }

    /// Forget the live token, so its eventual result is treated as stale.
    pub fn clear(&mut self) -> Option<Token> {
        self.0.take()
    }

    pub fn current(&self) -> Option<Token> {
        self.0
    }

    pub fn is_active(&self) -> bool {
        self.0.is_some()
    }
}
