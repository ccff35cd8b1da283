//! End-to-end tests driving table actors through their message inbox.
//!
//! Time is paused, so turn deadlines and the next-hand timer fire as soon as
//! every task is idle.

use holdem_engine::{
    db::{HandRepository, InMemoryHandRepository},
    entities::{PlayerId, PlayerInfo, SeatStatus},
    game::{CardView, PublicTableView},
    messages::ERR_UNAUTHORIZED,
    net::{ConnectionId, ServerMessage},
    table::{TableConfig, TableHandle, TableManager, TableMessage},
};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

struct Client {
    connection_id: ConnectionId,
    rx: mpsc::Receiver<ServerMessage>,
}

impl Client {
    async fn connect(handle: &TableHandle) -> Self {
        let (outbox, rx) = mpsc::channel(256);
        let connection_id = ConnectionId::new();
        handle
            .send(TableMessage::Connect {
                connection_id,
                outbox,
            })
            .await
            .unwrap();
        Self { connection_id, rx }
    }

    async fn join(&self, handle: &TableHandle, id: &str, password: Option<&str>, token: Option<&str>) {
        handle
            .send(TableMessage::Join {
                connection_id: self.connection_id,
                player: PlayerInfo::new(id, id),
                invite_token: token.map(str::to_string),
                password: password.map(str::to_string),
            })
            .await
            .unwrap();
    }

    /// Wait for the outcome of a join: an error or a seat announcement.
    async fn join_reply(&mut self) -> ServerMessage {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(30), self.rx.recv())
                .await
                .expect("no reply to join")
                .expect("table closed");
            if matches!(message, ServerMessage::Error { .. } | ServerMessage::PlayerJoined { .. }) {
                return message;
            }
        }
    }

    /// Everything delivered so far.
    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

fn manager() -> (TableManager, Arc<InMemoryHandRepository>) {
    let hands = Arc::new(InMemoryHandRepository::new());
    (TableManager::new(hands.clone()), hands)
}

fn seat_of<'a>(view: &'a PublicTableView, id: &str) -> &'a holdem_engine::game::PublicSeatView {
    view.players
        .iter()
        .find(|p| p.player_id.as_ref().map(PlayerId::as_str) == Some(id))
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_turn_timeout_folds_seat_owing_chips() {
    let (manager, hands) = manager();
    let created = manager
        .create_table(TableConfig::default(), false, None)
        .await
        .unwrap();
    let handle = manager.get_table(&created.table_id).await.unwrap();

    let mut clients = Vec::new();
    for id in ["alice", "bob", "carol"] {
        let client = Client::connect(&handle).await;
        client.join(&handle, id, None, None).await;
        clients.push(client);
    }

    // Hand 1 started heads-up on bob's join; carol sat down mid-hand and is
    // dealt into the next one after the first hand times out.
    let view = handle.snapshot().await.unwrap();
    assert_eq!(view.hand_id, 1);
    assert_eq!(seat_of(&view, "carol").status, SeatStatus::SittingOut);

    let timeout = Duration::from_secs(TableConfig::default().turn_timeout_secs);
    let delay = Duration::from_secs(5);
    tokio::time::sleep(timeout + delay + Duration::from_secs(1)).await;

    let before = handle.snapshot().await.unwrap();
    assert_eq!(before.hand_id, 2);
    let seat = before.current_seat.unwrap();
    let owing = &before.players[seat];
    assert!(owing.current_bet < before.current_max_bet);
    assert!(before.remaining_ms.unwrap() <= timeout.as_millis() as u64);

    tokio::time::sleep(timeout + Duration::from_millis(500)).await;

    let after = handle.snapshot().await.unwrap();
    assert_eq!(after.hand_id, 2);
    assert_eq!(after.players[seat].status, SeatStatus::Folded);
    assert_eq!(after.players[seat].chips, owing.chips);
    assert_eq!(after.pot, before.pot);
    let next = after.current_seat.unwrap();
    assert_ne!(next, seat);
    assert_eq!(after.players[next].status, SeatStatus::Active);

    // The first hand was persisted.
    tokio::task::yield_now().await;
    let recorded = hands.recent_hands(&created.table_id, 10).await.unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].hand_id, 1);
    assert_eq!(recorded[0].pot, 75);
}

#[tokio::test]
async fn test_public_snapshots_hide_every_hole_card() {
    let (manager, _) = manager();
    let created = manager
        .create_table(TableConfig::default(), false, None)
        .await
        .unwrap();
    let handle = manager.get_table(&created.table_id).await.unwrap();

    let mut spectator = Client::connect(&handle).await;
    let mut alice = Client::connect(&handle).await;
    let mut bob = Client::connect(&handle).await;
    alice.join(&handle, "alice", None, None).await;
    bob.join(&handle, "bob", None, None).await;

    // The snapshot round-trip orders after everything already sent.
    let view = handle.snapshot().await.unwrap();
    assert_eq!(view.hand_id, 1);

    let mut own_cards = Vec::new();
    for (client, id) in [(&mut alice, "alice"), (&mut bob, "bob")] {
        let mut latest = None;
        for message in client.drain() {
            match message {
                ServerMessage::State { table } => {
                    for seat in &table.players {
                        assert!(seat.cards.iter().all(CardView::is_hidden));
                    }
                }
                ServerMessage::HoleCards { player_id, cards } => {
                    assert_eq!(player_id.as_str(), id);
                    latest = Some(cards);
                }
                _ => {}
            }
        }
        let cards = latest.unwrap();
        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|c| !c.is_hidden()));
        own_cards.push(cards);
    }
    assert!(own_cards[0].iter().all(|c| !own_cards[1].contains(c)));

    let spectator_messages = spectator.drain();
    assert!(
        !spectator_messages
            .iter()
            .any(|m| matches!(m, ServerMessage::HoleCards { .. }))
    );
    let dealt = seat_of(&view, "alice");
    assert_eq!(dealt.cards.len(), 2);
    assert!(dealt.cards.iter().all(CardView::is_hidden));
}

#[tokio::test]
async fn test_private_table_rejects_wrong_password() {
    let (manager, _) = manager();
    let created = manager
        .create_table(TableConfig::default(), true, Some("hunter2"))
        .await
        .unwrap();
    let token = created.invite_token.clone().unwrap();
    let handle = manager.get_table(&created.table_id).await.unwrap();

    let mut mallory = Client::connect(&handle).await;
    mallory.join(&handle, "mallory", Some("guess"), None).await;
    mallory.join(&handle, "mallory", None, Some("0000000000000000")).await;
    mallory.join(&handle, "mallory", None, None).await;

    let mut errors = Vec::new();
    for _ in 0..3 {
        match mallory.join_reply().await {
            ServerMessage::Error { message } => errors.push(message),
            other => panic!("rejected join was answered with {other}"),
        }
    }
    assert_eq!(errors, vec![ERR_UNAUTHORIZED; 3]);
    let summary = handle.summary().await.unwrap();
    assert_eq!(summary.seated, 0);

    let mut by_password = Client::connect(&handle).await;
    by_password.join(&handle, "alice", Some("hunter2"), None).await;
    assert!(matches!(
        by_password.join_reply().await,
        ServerMessage::PlayerJoined { .. }
    ));
    let mut by_token = Client::connect(&handle).await;
    by_token.join(&handle, "bob", None, Some(&token)).await;
    assert!(matches!(
        by_token.join_reply().await,
        ServerMessage::PlayerJoined { .. }
    ));

    let summary = handle.summary().await.unwrap();
    assert_eq!(summary.seated, 2);
    assert!(summary.is_private);
}

#[tokio::test]
async fn test_leave_mid_hand_folds_and_frees_seat() {
    let config = TableConfig {
        next_hand_delay_secs: None,
        ..TableConfig::default()
    };
    let (manager, _) = manager();
    let created = manager.create_table(config, false, None).await.unwrap();
    let handle = manager.get_table(&created.table_id).await.unwrap();

    let alice = Client::connect(&handle).await;
    let mut bob = Client::connect(&handle).await;
    alice.join(&handle, "alice", None, None).await;
    bob.join(&handle, "bob", None, None).await;

    handle
        .send(TableMessage::Leave {
            connection_id: alice.connection_id,
            player_id: PlayerId::new("alice"),
        })
        .await
        .unwrap();

    let view = handle.snapshot().await.unwrap();
    assert!(view.current_seat.is_none());
    assert_eq!(handle.summary().await.unwrap().seated, 1);
    let winners: Vec<&str> = view.winners.iter().map(|w| w.player_id.as_str()).collect();
    assert_eq!(winners, vec!["bob"]);
    assert!(
        bob.drain()
            .iter()
            .any(|m| matches!(m, ServerMessage::PlayerLeft { player_id } if player_id.as_str() == "alice"))
    );
}

#[tokio::test]
async fn test_player_left_is_sent_before_hand_ends() {
    let config = TableConfig {
        next_hand_delay_secs: None,
        ..TableConfig::default()
    };
    let (manager, _) = manager();
    let created = manager.create_table(config, false, None).await.unwrap();
    let handle = manager.get_table(&created.table_id).await.unwrap();

    let mut clients = Vec::new();
    for id in ["alice", "bob", "carol"] {
        let client = Client::connect(&handle).await;
        client.join(&handle, id, None, None).await;
        clients.push((id, client));
    }
    let view = handle.snapshot().await.unwrap();
    let on_turn = view.players[view.current_seat.unwrap()].player_id.clone().unwrap();
    let (leaver, leaver_client) = clients
        .iter()
        .find(|(id, _)| *id != on_turn.as_str())
        .map(|(id, c)| (*id, c.connection_id))
        .unwrap();
    let watcher = clients.iter_mut().find(|(id, _)| *id == on_turn.as_str()).unwrap();
    watcher.1.drain();

    handle
        .send(TableMessage::Leave {
            connection_id: leaver_client,
            player_id: PlayerId::new(leaver),
        })
        .await
        .unwrap();

    let view = handle.snapshot().await.unwrap();
    assert_eq!(view.hand_id, 1);
    assert!(view.current_seat.is_some());
    assert_eq!(seat_of(&view, leaver).status, SeatStatus::Folded);
    assert!(
        watcher
            .1
            .drain()
            .iter()
            .any(|m| matches!(m, ServerMessage::PlayerLeft { player_id } if player_id.as_str() == leaver))
    );
}

#[tokio::test]
async fn test_action_for_another_player_is_ignored() {
    let (manager, _) = manager();
    let created = manager
        .create_table(TableConfig::default(), false, None)
        .await
        .unwrap();
    let handle = manager.get_table(&created.table_id).await.unwrap();

    let alice = Client::connect(&handle).await;
    let bob = Client::connect(&handle).await;
    alice.join(&handle, "alice", None, None).await;
    bob.join(&handle, "bob", None, None).await;

    let before = handle.snapshot().await.unwrap();
    let on_turn = before.players[before.current_seat.unwrap()]
        .player_id
        .clone()
        .unwrap();
    let other = if on_turn.as_str() == "alice" { &bob } else { &alice };

    handle
        .send(TableMessage::Action {
            connection_id: other.connection_id,
            player_id: on_turn,
            action: holdem_engine::PlayerAction::Fold,
        })
        .await
        .unwrap();

    let after = handle.snapshot().await.unwrap();
    assert_eq!(after.current_seat, before.current_seat);
    assert_eq!(after.pot, before.pot);
    assert!(after.players.iter().all(|p| p.status != SeatStatus::Folded));
}

#[tokio::test(start_paused = true)]
async fn test_join_that_starts_hand_publishes_once() {
    let (manager, _) = manager();
    let created = manager
        .create_table(TableConfig::default(), false, None)
        .await
        .unwrap();
    let handle = manager.get_table(&created.table_id).await.unwrap();

    let mut alice = Client::connect(&handle).await;
    alice.join(&handle, "alice", None, None).await;
    handle.snapshot().await.unwrap();
    alice.drain();

    let bob = Client::connect(&handle).await;
    bob.join(&handle, "bob", None, None).await;
    let view = handle.snapshot().await.unwrap();
    assert_eq!(view.hand_id, 1);

    let messages = alice.drain();
    let states = messages
        .iter()
        .filter(|m| matches!(m, ServerMessage::State { table } if table.hand_id == 1))
        .count();
    let hole_cards = messages
        .iter()
        .filter(|m| matches!(m, ServerMessage::HoleCards { cards, .. } if cards.len() == 2))
        .count();
    assert_eq!(states, 1);
    assert_eq!(hole_cards, 1);
}

#[tokio::test]
async fn test_table_keeps_serving_while_password_is_checked() {
    let (manager, _) = manager();
    let created = manager
        .create_table(TableConfig::default(), true, Some("hunter2"))
        .await
        .unwrap();
    let handle = manager.get_table(&created.table_id).await.unwrap();

    let mut alice = Client::connect(&handle).await;
    alice.join(&handle, "alice", Some("hunter2"), None).await;
    // Answered while the hash is still being verified.
    let view = handle.snapshot().await.unwrap();
    assert!(view.players.iter().all(|p| p.player_id.is_none()));

    assert!(matches!(
        alice.join_reply().await,
        ServerMessage::PlayerJoined { .. }
    ));
    assert_eq!(handle.summary().await.unwrap().seated, 1);
}
