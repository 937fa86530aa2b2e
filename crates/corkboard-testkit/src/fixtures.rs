//! Factories for domain values used across engine tests.

use corkboard_core::{Board, BoardId, BoardRole, Idea, IdeaId, Principal, PrincipalId};

/// A principal with a fresh id and the given email address.
pub fn principal(email: &str) -> Principal {
    Principal::new(PrincipalId::new(), email)
}

/// A board owned by `owner`, with a fresh id and no role grants.
pub fn board(name: &str, owner: &Principal) -> Board {
    Board::new(BoardId::new(), name, owner.id)
}

/// A board owned by `owner` that additionally grants `role` to `grantee`.
pub fn shared_board(name: &str, owner: &Principal, grantee: &Principal, role: BoardRole) -> Board {
    board(name, owner).with_role(grantee.email.clone(), role)
}

/// An idea on `board` with the given ease/confidence/impact scores.
pub fn idea(board: &Board, name: &str, scores: (u8, u8, u8)) -> Idea {
    Idea {
        id: IdeaId::new(),
        board_id: board.id,
        name: name.to_string(),
        description: None,
        ease: scores.0,
        confidence: scores.1,
        impact: scores.2,
    }
}
