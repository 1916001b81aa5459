use crate::types::{
    GameSnapshot,
    GameStatus,
};
use alloy::primitives::Address;

/// Wallet-relative flags derived from a snapshot.
///
/// Addresses are compared as parsed bytes, so the textual case a wallet or contract used
/// for an address never affects the result.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ViewFlags {
    pub is_user_in_game: bool,
    pub is_user_creator: bool,
    pub is_my_turn: bool,
    pub can_join: bool,
}

impl ViewFlags {
    pub fn project(snapshot: &GameSnapshot, wallet: Option<&Address>) -> Self {
        let Some(wallet) = wallet else {
            return Self::default();
        };
        let is_user_in_game = snapshot.players.contains(wallet);
        let is_user_creator = snapshot.creator() == Some(wallet);
        let is_my_turn = snapshot.status == GameStatus::Active
            && snapshot.current_player.as_ref() == Some(wallet);
        // a waiting game always lists its creator; an empty list means the read degraded
        let can_join = snapshot.status == GameStatus::Waiting
            && !snapshot.players.is_empty()
            && !snapshot.is_full()
            && !is_user_in_game;
        Self {
            is_user_in_game,
            is_user_creator,
            is_my_turn,
            can_join,
        }
    }
}
