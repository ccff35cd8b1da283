use rand::{CryptoRng, Rng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::constants;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Heart => "♥",
            Self::Spade => "♠",
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Placeholder for card values.
pub type Value = u8;

pub const MIN_VALUE: Value = 2;
pub const ACE: Value = 14;

/// A card is a tuple of a uInt8 value (deuce=2u8 ... ace=14u8)
/// and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl Card {
    /// Rank as clients print it ("A", "K", "10", "2", ...).
    #[must_use]
    pub fn rank_label(&self) -> String {
        match self.0 {
            14 => "A".to_string(),
            13 => "K".to_string(),
            12 => "Q".to_string(),
            11 => "J".to_string(),
            v => v.to_string(),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = format!("{}/{}", self.rank_label(), self.1);
        write!(f, "{repr:>4}")
    }
}

/// Hand categories, weakest first so the derived ordering matches poker.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl Rank {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::HighCard => "High Card",
            Self::OnePair => "One Pair",
            Self::TwoPair => "Two Pair",
            Self::ThreeOfAKind => "Three of a Kind",
            Self::Straight => "Straight",
            Self::Flush => "Flush",
            Self::FullHouse => "Full House",
            Self::FourOfAKind => "Four of a Kind",
            Self::StraightFlush => "Straight Flush",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Comparable strength of a 7-card holding. The category decides first,
/// then `values` are compared lexicographically.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandScore {
    pub rank: Rank,
    pub values: Vec<Value>,
}

#[derive(Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// The 52 canonical cards in suit-major order.
    #[must_use]
    pub fn canonical() -> Vec<Card> {
        Suit::ALL
            .into_iter()
            .flat_map(|suit| (MIN_VALUE..=ACE).map(move |value| Card(value, suit)))
            .collect()
    }

    /// Fresh deck shuffled with the thread-local CSPRNG.
    #[must_use]
    pub fn build() -> Self {
        Self::build_with(&mut rand::rng())
    }

    /// Fresh deck shuffled with the given generator (Fisher-Yates).
    pub fn build_with<R: Rng + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut cards = Self::canonical();
        cards.shuffle(rng);
        Self { cards }
    }

    /// Take the next card.
    ///
    /// # Panics
    ///
    /// Panics when the deck is empty. Seat limits guarantee a hand never
    /// needs more than 52 cards, so this is an invariant violation.
    pub fn draw(&mut self) -> Card {
        match self.cards.pop() {
            Some(card) => card,
            None => panic!("drew from an exhausted deck"),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::build()
    }
}

/// Type alias for whole chips. Stacks, bets and the pot are all
/// whole chip counts.
pub type Chips = u32;

/// Type alias for seat positions; seat order is turn order.
pub type SeatIndex = usize;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: &str) -> Self {
        let mut id: String = s.trim().to_string();
        id.truncate(constants::MAX_USER_INPUT_LENGTH * 2);
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// Public identity of a seat occupant.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

impl PlayerInfo {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: PlayerId::new(id),
            name: name.to_string(),
            avatar: String::new(),
        }
        .sanitized()
    }

    /// Truncate free-text fields and fall back to the id for a blank name.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let mut name: String = self
            .name
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .take(constants::MAX_USER_INPUT_LENGTH)
            .collect();
        name = name.trim().to_string();
        if name.is_empty() {
            name = self.id.to_string();
        }
        self.name = name;
        self.avatar = self
            .avatar
            .chars()
            .take(constants::MAX_USER_INPUT_LENGTH * 8)
            .collect();
        self
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Blinds {
    pub small: Chips,
    pub big: Chips,
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}/{}", self.small, self.big)
    }
}

/// Per-hand status of a seat.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeatStatus {
    /// Dealt in and still able to act.
    Active,
    /// Gave up the hand.
    Folded,
    /// Whole stack committed; no further actions this hand.
    AllIn,
    /// Occupied but not dealt into the current hand.
    SittingOut,
    /// Nobody sits here.
    Empty,
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Active => "active",
            Self::Folded => "folded",
            Self::AllIn => "all-in",
            Self::SittingOut => "sitting out",
            Self::Empty => "empty",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug)]
pub struct Seat {
    pub occupant: Option<PlayerInfo>,
    pub chips: Chips,
    pub status: SeatStatus,
    /// Chips put in on the current street.
    pub current_bet: Chips,
    /// Acted since the last bet increase.
    pub acted: bool,
    pub hole: Vec<Card>,
    /// Occupant asked to leave mid-hand; the seat empties when the hand ends.
    pub leaving: bool,
}

impl Seat {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            occupant: None,
            chips: 0,
            status: SeatStatus::Empty,
            current_bet: 0,
            acted: false,
            hole: Vec::with_capacity(constants::HOLE_CARDS),
            leaving: false,
        }
    }

    pub fn seat(&mut self, player: PlayerInfo, chips: Chips) {
        self.occupant = Some(player);
        self.chips = chips;
        self.status = SeatStatus::SittingOut;
        self.current_bet = 0;
        self.acted = false;
        self.hole.clear();
        self.leaving = false;
    }

    pub fn vacate(&mut self) {
        *self = Self::empty();
    }

    /// Clear per-hand fields; willing seats are dealt in.
    pub fn reset_for_hand(&mut self) {
        self.current_bet = 0;
        self.acted = false;
        self.hole.clear();
        if self.occupant.is_some() {
            self.status = if self.is_willing() {
                SeatStatus::Active
            } else {
                SeatStatus::SittingOut
            };
        }
    }

    #[must_use]
    pub fn player_id(&self) -> Option<&PlayerId> {
        self.occupant.as_ref().map(|p| &p.id)
    }

    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// Occupied, has chips and is not on the way out.
    #[must_use]
    pub fn is_willing(&self) -> bool {
        self.occupant.is_some() && self.chips > 0 && !self.leaving
    }

    #[must_use]
    pub fn can_act(&self) -> bool {
        self.status == SeatStatus::Active
    }

    /// Still competing for the pot.
    #[must_use]
    pub fn in_hand(&self) -> bool {
        matches!(self.status, SeatStatus::Active | SeatStatus::AllIn)
    }

    /// Chips still needed to match `max_bet`.
    #[must_use]
    pub fn owes(&self, max_bet: Chips) -> Chips {
        max_bet.saturating_sub(self.current_bet)
    }

    /// Move up to `amount` chips from the stack into the current bet and
    /// return how many actually moved. An emptied stack goes all-in.
    pub fn commit(&mut self, amount: Chips) -> Chips {
        let paid = amount.min(self.chips);
        self.chips -= paid;
        self.current_bet += paid;
        if self.chips == 0 && self.status == SeatStatus::Active {
            self.status = SeatStatus::AllIn;
        }
        paid
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Phase {
    #[must_use]
    pub fn is_street(self) -> bool {
        matches!(self, Self::Preflop | Self::Flop | Self::Turn | Self::River)
    }

    /// Street that follows this one and how many community cards it deals.
    #[must_use]
    pub fn next_street(self) -> Option<(Phase, usize)> {
        match self {
            Self::Preflop => Some((Self::Flop, 3)),
            Self::Flop => Some((Self::Turn, 1)),
            Self::Turn => Some((Self::River, 1)),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Preflop => "preflop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PlayerAction {
    Fold,
    Check,
    Call,
    /// Raise to this total bet on the street.
    Raise(Chips),
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Fold => "folds".to_string(),
            Self::Check => "checks".to_string(),
            Self::Call => "calls".to_string(),
            Self::Raise(amount) => format!("raises to ${amount}"),
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub seat: SeatIndex,
    pub player_id: PlayerId,
    pub amount: Chips,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Result of a finished hand.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandOutcome {
    pub hand_id: u64,
    pub pot: Chips,
    pub community: Vec<Card>,
    pub winners: Vec<Winner>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashSet;

    // === Card Tests ===

    #[test]
    fn test_card_rank_labels() {
        assert_eq!(Card(14, Suit::Heart).rank_label(), "A");
        assert_eq!(Card(13, Suit::Heart).rank_label(), "K");
        assert_eq!(Card(12, Suit::Heart).rank_label(), "Q");
        assert_eq!(Card(11, Suit::Heart).rank_label(), "J");
        assert_eq!(Card(10, Suit::Heart).rank_label(), "10");
        assert_eq!(Card(2, Suit::Heart).rank_label(), "2");
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card(14, Suit::Spade).to_string(), " A/♠");
        assert_eq!(Card(10, Suit::Diamond).to_string(), "10/♦");
    }

    // === Deck Tests ===

    #[test]
    fn test_canonical_deck_is_complete() {
        let cards = Deck::canonical();
        assert_eq!(cards.len(), 52);
        let unique: HashSet<_> = cards.iter().collect();
        assert_eq!(unique.len(), 52);
        assert!(cards.iter().all(|c| (MIN_VALUE..=ACE).contains(&c.0)));
    }

    #[test]
    fn test_deck_draws_every_card_once() {
        let mut deck = Deck::build();
        let mut seen = HashSet::new();
        while !deck.is_empty() {
            assert!(seen.insert(deck.draw()));
        }
        assert_eq!(seen.len(), 52);
    }

    #[test]
    fn test_seeded_decks_are_reproducible() {
        let a = Deck::build_with(&mut StdRng::seed_from_u64(7));
        let b = Deck::build_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a.cards, b.cards);
    }

    #[test]
    #[should_panic(expected = "exhausted deck")]
    fn test_draw_from_empty_deck_panics() {
        let mut deck = Deck::build();
        for _ in 0..53 {
            deck.draw();
        }
    }

    // === Rank Tests ===

    #[test]
    fn test_rank_ordering() {
        assert!(Rank::HighCard < Rank::OnePair);
        assert!(Rank::OnePair < Rank::TwoPair);
        assert!(Rank::TwoPair < Rank::ThreeOfAKind);
        assert!(Rank::ThreeOfAKind < Rank::Straight);
        assert!(Rank::Straight < Rank::Flush);
        assert!(Rank::Flush < Rank::FullHouse);
        assert!(Rank::FullHouse < Rank::FourOfAKind);
        assert!(Rank::FourOfAKind < Rank::StraightFlush);
    }

    #[test]
    fn test_hand_score_compares_category_before_values() {
        let two_pair = HandScore {
            rank: Rank::TwoPair,
            values: vec![5, 4, 3],
        };
        let one_pair = HandScore {
            rank: Rank::OnePair,
            values: vec![14, 13, 12, 11],
        };
        assert!(two_pair > one_pair);
    }

    // === Seat Tests ===

    #[test]
    fn test_seat_commit_clamps_and_goes_all_in() {
        let mut seat = Seat::empty();
        seat.seat(PlayerInfo::new("p1", "Alice"), 30);
        seat.reset_for_hand();
        assert_eq!(seat.status, SeatStatus::Active);

        let paid = seat.commit(50);
        assert_eq!(paid, 30);
        assert_eq!(seat.chips, 0);
        assert_eq!(seat.current_bet, 30);
        assert_eq!(seat.status, SeatStatus::AllIn);
    }

    #[test]
    fn test_busted_seat_sits_out() {
        let mut seat = Seat::empty();
        seat.seat(PlayerInfo::new("p1", "Alice"), 0);
        seat.reset_for_hand();
        assert_eq!(seat.status, SeatStatus::SittingOut);
        assert!(!seat.is_willing());
    }

    #[test]
    fn test_vacate_resets_everything() {
        let mut seat = Seat::empty();
        seat.seat(PlayerInfo::new("p1", "Alice"), 100);
        seat.hole.push(Card(2, Suit::Club));
        seat.vacate();
        assert_eq!(seat.status, SeatStatus::Empty);
        assert!(seat.occupant.is_none());
        assert!(seat.hole.is_empty());
    }

    // === PlayerInfo Tests ===

    #[test]
    fn test_player_info_blank_name_falls_back_to_id() {
        let info = PlayerInfo::new("p42", "   ");
        assert_eq!(info.name, "p42");
    }

    #[test]
    fn test_player_info_truncates_long_names() {
        let info = PlayerInfo::new("p1", &"x".repeat(200));
        assert_eq!(info.name.len(), constants::MAX_USER_INPUT_LENGTH);
    }

    #[test]
    fn test_player_id_deserialize_trims() {
        let id: PlayerId = serde_json::from_str("\"  alice \"").unwrap();
        assert_eq!(id.as_str(), "alice");
    }

    // === Phase Tests ===

    #[test]
    fn test_phase_street_progression() {
        assert_eq!(Phase::Preflop.next_street(), Some((Phase::Flop, 3)));
        assert_eq!(Phase::Flop.next_street(), Some((Phase::Turn, 1)));
        assert_eq!(Phase::Turn.next_street(), Some((Phase::River, 1)));
        assert_eq!(Phase::River.next_street(), None);
        assert!(!Phase::Waiting.is_street());
    }

    #[test]
    fn test_seat_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&SeatStatus::AllIn).unwrap(),
            "\"all-in\""
        );
        assert_eq!(
            serde_json::to_string(&SeatStatus::SittingOut).unwrap(),
            "\"sitting-out\""
        );
    }

    #[test]
    fn test_blinds_display() {
        let blinds = Blinds { small: 25, big: 50 };
        assert_eq!(blinds.to_string(), "$25/50");
    }
}
