//! Opening-book collaborator contract and weighted candidate sampling

use rand::Rng;

/// A book candidate: a coordinate move and its integer weight (higher =
/// played more often in the book's source material).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMove {
    pub mv: String,
    pub weight: u32,
}

/// An opening book the orchestrator may consult before searching.
pub trait OpeningBook: Send + Sync {
    /// Candidates for an arbitrary position.
    fn moves_from_fen(&self, fen: &str) -> Vec<BookMove>;

    /// Candidates for the position reached by a move list from the
    /// initial position.
    fn moves_from_history(&self, moves: &[String]) -> Vec<BookMove>;
}

/// Roulette-wheel selection over normalized integer weights: each
/// candidate is chosen with probability weight / total. Zero-weight
/// candidates are never picked; `None` when the list has no weight.
pub fn pick_weighted<'a, R: Rng>(candidates: &'a [BookMove], rng: &mut R) -> Option<&'a BookMove> {
    let total: u64 = candidates.iter().map(|c| c.weight as u64).sum();
    if total == 0 {
        return None;
    }
    let mut spin = rng.random_range(0..total);
    for candidate in candidates {
        let weight = candidate.weight as u64;
        if spin < weight {
            return Some(candidate);
        }
        spin -= weight;
    }
    None
}
