//! Pure hand evaluation.
//!
//! [`eval`] scores up to seven cards into a [`HandScore`] whose derived
//! ordering is the poker ordering, and [`argmax`] picks the winners among a
//! set of scores.

use serde::Serialize;

use super::entities::{ACE, Card, HandScore, Rank, Suit, Value};

/// Occurrence count per value, indexed by value (0 and 1 unused).
type Counts = [u8; ACE as usize + 1];

/// Score the best five-card hand contained in `cards`.
///
/// Works for any number of cards; fewer than five simply cannot make the
/// five-card categories.
#[must_use]
pub fn eval(cards: &[Card]) -> HandScore {
    let counts = count_values(cards);

    if let Some(high) = flush_cards(cards).and_then(|suited| straight_high(&suited)) {
        return score(Rank::StraightFlush, vec![high]);
    }

    if let Some(quad) = highest_with(&counts, 4, &[]) {
        let kicker = kickers(&counts, &[quad], 1);
        return score(Rank::FourOfAKind, [vec![quad], kicker].concat());
    }

    if let Some(trips) = highest_with(&counts, 3, &[]) {
        // A second set of trips plays as the pair.
        let pair = [
            highest_with(&counts, 3, &[trips]),
            highest_with(&counts, 2, &[trips]),
        ]
        .into_iter()
        .flatten()
        .max();
        if let Some(pair) = pair {
            return score(Rank::FullHouse, vec![trips, pair]);
        }
    }

    if let Some(mut suited) = flush_cards(cards) {
        suited.truncate(5);
        return score(Rank::Flush, suited);
    }

    let distinct: Vec<Value> = (2..=ACE).rev().filter(|&v| counts[v as usize] > 0).collect();
    if let Some(high) = straight_high(&distinct) {
        return score(Rank::Straight, vec![high]);
    }

    if let Some(trips) = highest_with(&counts, 3, &[]) {
        let kicker = kickers(&counts, &[trips], 2);
        return score(Rank::ThreeOfAKind, [vec![trips], kicker].concat());
    }

    if let Some(high_pair) = highest_with(&counts, 2, &[]) {
        if let Some(low_pair) = highest_with(&counts, 2, &[high_pair]) {
            let kicker = kickers(&counts, &[high_pair, low_pair], 1);
            return score(Rank::TwoPair, [vec![high_pair, low_pair], kicker].concat());
        }
        let kicker = kickers(&counts, &[high_pair], 3);
        return score(Rank::OnePair, [vec![high_pair], kicker].concat());
    }

    score(Rank::HighCard, kickers(&counts, &[], 5))
}

/// Indices of every maximal score, in ascending order. Empty input gives an
/// empty result.
#[must_use]
pub fn argmax(scores: &[HandScore]) -> Vec<usize> {
    let Some(best) = scores.iter().max() else {
        return Vec::new();
    };
    scores
        .iter()
        .enumerate()
        .filter_map(|(idx, s)| (s == best).then_some(idx))
        .collect()
}

fn score(rank: Rank, values: Vec<Value>) -> HandScore {
    HandScore { rank, values }
}

fn count_values(cards: &[Card]) -> Counts {
    let mut counts = [0u8; ACE as usize + 1];
    for card in cards {
        counts[card.0 as usize] += 1;
    }
    counts
}

/// Highest value appearing at least `n` times that isn't excluded.
fn highest_with(counts: &Counts, n: u8, exclude: &[Value]) -> Option<Value> {
    (2..=ACE)
        .rev()
        .find(|&v| counts[v as usize] >= n && !exclude.contains(&v))
}

/// The `n` best single values not in `exclude`, one per distinct value.
fn kickers(counts: &Counts, exclude: &[Value], n: usize) -> Vec<Value> {
    (2..=ACE)
        .rev()
        .filter(|&v| counts[v as usize] > 0 && !exclude.contains(&v))
        .take(n)
        .collect()
}

/// Values of the best flush suit, highest first. When several suits hold
/// five or more cards the one with the best top five wins.
fn flush_cards(cards: &[Card]) -> Option<Vec<Value>> {
    Suit::ALL
        .into_iter()
        .filter_map(|suit| {
            let mut values: Vec<Value> = cards
                .iter()
                .filter(|c| c.1 == suit)
                .map(|c| c.0)
                .collect();
            if values.len() < 5 {
                return None;
            }
            values.sort_unstable_by(|a, b| b.cmp(a));
            Some(values)
        })
        .max_by(|a, b| a[..5].cmp(&b[..5]))
}

/// High card of the best straight among `values`, which may hold
/// duplicates in any order. The wheel (A-2-3-4-5) is five-high.
fn straight_high(values: &[Value]) -> Option<Value> {
    let mut present = [false; ACE as usize + 1];
    for &v in values {
        present[v as usize] = true;
    }
    // Ace also plays low.
    present[1] = present[ACE as usize];
    (5..=ACE)
        .rev()
        .find(|&high| (high - 4..=high).all(|v| present[v as usize]))
}

/// Outcome of one canonical evaluator fixture.
#[derive(Clone, Debug, Serialize)]
pub struct FixtureResult {
    pub name: &'static str,
    pub cards: Vec<String>,
    pub expected: &'static str,
    pub category: &'static str,
    pub ok: bool,
}

const FIXTURES: [(&str, &str, Rank); 11] = [
    ("Royal Flush", "AH KH QH JH TH 2C 3D", Rank::StraightFlush),
    ("Straight Flush 9-high", "9H 8H 7H 6H 5H 2C 3D", Rank::StraightFlush),
    ("Quads", "AH AD AC AS 9D 3C 2S", Rank::FourOfAKind),
    ("Full House", "AH AD AC KH KD 3C 2S", Rank::FullHouse),
    ("Flush", "AH 9H 7H 4H 2H KC 3D", Rank::Flush),
    ("Wheel Straight", "AH 2C 3D 4S 5H 9C KD", Rank::Straight),
    ("Broadway Straight", "AH KD QD JC TS 2C 3D", Rank::Straight),
    ("Trips", "QH QD QS 9C 7D 3C 2S", Rank::ThreeOfAKind),
    ("Two Pair", "KH KD 9C 9D 5S 3C 2S", Rank::TwoPair),
    ("One Pair", "JH JD 9C 7D 5S 3C 2S", Rank::OnePair),
    ("High Card", "AH 9D 7C 5S 3H 2C JD", Rank::HighCard),
];

/// Parse a short card code such as `"TH"` or `"2c"`.
#[must_use]
pub fn parse_card(code: &str) -> Option<Card> {
    let mut chars = code.chars();
    let value = match chars.next()?.to_ascii_uppercase() {
        'A' => 14,
        'K' => 13,
        'Q' => 12,
        'J' => 11,
        'T' => 10,
        c @ '2'..='9' => c.to_digit(10)? as Value,
        _ => return None,
    };
    let suit = match chars.next()?.to_ascii_uppercase() {
        'C' => Suit::Club,
        'D' => Suit::Diamond,
        'H' => Suit::Heart,
        'S' => Suit::Spade,
        _ => return None,
    };
    chars.next().is_none().then_some(Card(value, suit))
}

/// Parse a whitespace-separated list of card codes.
#[must_use]
pub fn parse_cards(codes: &str) -> Option<Vec<Card>> {
    codes.split_whitespace().map(parse_card).collect()
}

/// Evaluate the canonical fixture hands.
#[must_use]
pub fn fixtures() -> Vec<FixtureResult> {
    FIXTURES
        .iter()
        .map(|&(name, codes, expected)| {
            let cards = parse_cards(codes).unwrap_or_default();
            let rank = eval(&cards).rank;
            FixtureResult {
                name,
                cards: codes.split_whitespace().map(str::to_string).collect(),
                expected: expected.label(),
                category: rank.label(),
                ok: cards.len() == 7 && rank == expected,
            }
        })
        .collect()
}
