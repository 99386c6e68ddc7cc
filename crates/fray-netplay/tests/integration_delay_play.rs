use fray_core::{Input, PeerId};
use fray_netplay::{
    LoopbackHub, LoopbackTransport, NetcodeConfig, NetcodeEvent, NetcodeMode, NetcodeSession,
};

const FRAME_MS: u64 = 16;

fn peer(id: &str) -> PeerId {
    PeerId::from(id)
}

fn config() -> NetcodeConfig {
    NetcodeConfig {
        // Reconcile membership every tick so joins land immediately.
        roster_poll_frames: 0,
        ..NetcodeConfig::default()
    }
}

fn session(hub: &LoopbackHub, id: &str, color: &str) -> NetcodeSession<LoopbackTransport> {
    NetcodeSession::new(
        peer(id),
        color,
        NetcodeMode::Delay,
        config(),
        hub.join(peer(id)),
    )
}

fn right() -> Input {
    Input::new(false, false, false, true)
}

fn down() -> Input {
    Input::new(false, false, true, false)
}

#[test]
fn test_remote_positions_replay_on_the_senders_timeline() {
    let hub = LoopbackHub::new();
    let mut alice = session(&hub, "alice", "#e74c3c");
    let mut bob = session(&hub, "bob", "#3498db");

    // 1. Alice plays ten frames while bob's process is stalled; his
    //    mailbox just queues.
    let mut now_ms: u64 = 1_000;
    for _ in 0..10 {
        alice.tick(right(), now_ms).unwrap();
        now_ms += FRAME_MS;
    }
    assert_eq!(alice.world().players[&peer("alice")].x, 430.0);

    // 2. Bob wakes and drains the whole burst at once. The stale arrivals
    //    push his measured delay to ~94ms, so only positions that have
    //    aged that long apply now; the rest stay scheduled.
    bob.tick(Input::NONE, now_ms).unwrap();
    assert_eq!(bob.stats().deferred_packets, 10);
    assert_eq!(bob.world().players[&peer("alice")].x, 415.0);

    // 3. As bob's clock advances the remaining updates fall due in send
    //    order, landing him on alice's true position.
    bob.tick(Input::NONE, now_ms + 240).unwrap();
    assert_eq!(bob.world().players[&peer("alice")].x, 430.0);
    assert_eq!(
        bob.world().players[&peer("alice")].y,
        alice.world().players[&peer("alice")].y
    );
}

#[test]
fn test_three_peers_agree_on_every_position_after_settling() {
    let hub = LoopbackHub::new();
    let mut alice = session(&hub, "alice", "#e74c3c");
    let mut bob = session(&hub, "bob", "#3498db");
    let mut carol = session(&hub, "carol", "#2ecc71");

    // 1. Forty frames of movement, everyone on the same clock.
    let mut now_ms: u64 = 1_000;
    for _ in 0..40 {
        alice.tick(right(), now_ms).unwrap();
        bob.tick(down(), now_ms).unwrap();
        carol.tick(Input::NONE, now_ms).unwrap();
        now_ms += FRAME_MS;
    }
    // 2. A quiet stretch lets the last broadcasts fall due everywhere.
    for _ in 0..10 {
        alice.tick(Input::NONE, now_ms).unwrap();
        bob.tick(Input::NONE, now_ms).unwrap();
        carol.tick(Input::NONE, now_ms).unwrap();
        now_ms += FRAME_MS;
    }

    assert!(alice.is_host());
    assert!(!bob.is_host());
    assert!(!carol.is_host());

    for session in [&alice, &bob, &carol] {
        assert_eq!(session.roster().len(), 3);
        let world = session.world();
        let a = &world.players[&peer("alice")];
        let b = &world.players[&peer("bob")];
        let c = &world.players[&peer("carol")];
        assert_eq!((a.x, a.y), (520.0, 300.0));
        assert_eq!((b.x, b.y), (400.0, 420.0));
        assert_eq!((c.x, c.y), (400.0, 300.0));
    }
}

#[test]
fn test_defeat_halts_the_victim_and_departure_reaches_the_survivor() {
    let hub = LoopbackHub::new();
    let mut alice = session(&hub, "alice", "#e74c3c");
    let mut bob = session(&hub, "bob", "#3498db");

    // 1. Ten frames so membership and positions settle; alice strafes
    //    right, bob holds the center.
    let mut now_ms: u64 = 1_000;
    for _ in 0..10 {
        alice.tick(right(), now_ms).unwrap();
        bob.tick(Input::NONE, now_ms).unwrap();
        now_ms += FRAME_MS;
    }

    // 2. First hitscan: bob shoots straight along +x and clips her.
    let shot = bob.fire_hitscan(0.0, now_ms).unwrap().expect("ready to fire");
    assert!(shot.hit.is_some());
    for _ in 0..65 {
        alice.tick(right(), now_ms).unwrap();
        bob.tick(Input::NONE, now_ms).unwrap();
        now_ms += FRAME_MS;
    }
    // The victim applies her own damage; the wound reaches bob's copy
    // through her position updates.
    assert_eq!(alice.world().players[&peer("alice")].radius, 20.0);
    assert_eq!(bob.world().players[&peer("alice")].radius, 20.0);

    // 3. Second shot once the cooldown has passed: 20 -> 10 puts alice on
    //    the defeat floor. She halts and says goodbye; bob scrubs her.
    let shot = bob
        .fire_hitscan(0.0, now_ms)
        .unwrap()
        .expect("cooldown has passed");
    assert!(shot.hit.is_some());
    alice.tick(right(), now_ms).unwrap();
    bob.tick(Input::NONE, now_ms).unwrap();
    now_ms += FRAME_MS;

    assert!(alice.is_stopped());
    assert!(!bob.world().players.contains_key(&peer("alice")));
    assert!(!bob.roster().contains(&peer("alice")));

    // The embedder tears the dead connection down like a closed socket,
    // so the roster poll cannot re-admit her.
    hub.drop_peer(&peer("alice"));
    let frozen = alice.current_frame();
    for _ in 0..5 {
        alice.tick(right(), now_ms).unwrap();
        bob.tick(Input::NONE, now_ms).unwrap();
        now_ms += FRAME_MS;
    }
    assert_eq!(alice.current_frame(), frozen);
    assert!(!bob.world().players.contains_key(&peer("alice")));

    let alice_events = alice.drain_events();
    let wounds = alice_events
        .iter()
        .filter(|event| matches!(event, NetcodeEvent::DamageTaken { .. }))
        .count();
    assert_eq!(wounds, 2);
    assert!(alice_events.contains(&NetcodeEvent::Defeated {
        by: Some(peer("bob")),
    }));

    let bob_events = bob.drain_events();
    assert!(bob_events.contains(&NetcodeEvent::PeerLeft(peer("alice"))));
    let lasers = bob_events
        .iter()
        .filter(|event| matches!(event, NetcodeEvent::LaserFired { .. }))
        .count();
    assert_eq!(lasers, 2);
}
