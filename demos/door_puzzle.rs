//! Door Puzzle
//!
//! This example walks a door puzzle through the service layer.
//!
//! Key concepts:
//! - Registering a puzzle from a JSON definition
//! - Guards evaluated by an injected oracle
//! - Subscribers receiving change events over `ChannelDelivery`
//! - Cancelled transitions leaving state and subscribers untouched
//!
//! Run with: cargo run --example door_puzzle

use puzzlebox::core::FnGuardOracle;
use puzzlebox::notify::{ChannelDelivery, SubscriberToken};
use puzzlebox::{PuzzleService, Settings};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const DOOR: &str = r#"{
    "initialState": "Closed",
    "states": {
        "Closed": {
            "actions": {
                "Open": { "targetState": "Opened" },
                "Lock": { "targetState": "Locked" }
            }
        },
        "Opened": { "actions": { "Close": { "targetState": "Closed" } } },
        "Locked": {
            "actions": { "Unlock": { "targetState": "Closed" } },
            "exitGuard": "has-key"
        }
    }
}"#;

#[tokio::main]
async fn main() {
    println!("=== Door Puzzle Example ===\n");

    // The player has no key until they find one.
    let has_key = Arc::new(AtomicBool::new(false));
    let oracle = {
        let has_key = has_key.clone();
        FnGuardOracle::from_predicate(move |request| {
            request.guard != "has-key" || has_key.load(Ordering::SeqCst)
        })
    };

    let delivery = Arc::new(ChannelDelivery::new());
    let service = PuzzleService::new(&Settings::default(), Arc::new(oracle), delivery.clone())
        .unwrap();

    let added = service.add_puzzle(DOOR);
    let id = added.puzzle_id.unwrap();
    println!("Puzzle added: {id}");

    let token = SubscriberToken::new("player-1");
    let mut events = delivery.connect(token.clone());
    service.subscribe(&id, token).unwrap();

    let snapshot = service.snapshot(&id).await.unwrap();
    println!(
        "State: {} (actions: {:?})\n",
        snapshot.current_state, snapshot.available_actions
    );

    for action in ["Lock", "Unlock"] {
        let result = service.perform_action(&id, action).await.unwrap();
        match &result.cancel_reason {
            None => println!("{action}: now {}", result.current_state),
            Some(reason) => println!("{action}: cancelled ({reason})"),
        }
    }

    println!("\nThe player finds the key.");
    has_key.store(true, Ordering::SeqCst);

    for action in ["Unlock", "Open", "Bogus"] {
        match service.perform_action(&id, action).await {
            Ok(result) => println!("{action}: now {}", result.current_state),
            Err(err) => println!("{action}: rejected ({err})"),
        }
    }

    println!("\nEvents seen by player-1:");
    while let Ok(event) = events.try_recv() {
        println!(
            "  {} -> {} {:?}",
            event.puzzle_id, event.new_state, event.available_actions
        );
    }

    println!("\n=== Example Complete ===");
}
