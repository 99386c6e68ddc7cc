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
        NetcodeMode::Rollback,
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

fn scripted(step: u64) -> Input {
    match step % 6 {
        0 => Input::new(true, false, false, false),
        1 => Input::new(false, true, false, false),
        2 => Input::new(false, false, true, true),
        3 => Input::NONE,
        4 => Input::new(false, false, false, true),
        _ => Input::new(true, false, false, true),
    }
}

#[test]
fn test_two_peers_converge_on_identical_worlds() {
    let hub = LoopbackHub::new();
    let mut alice = session(&hub, "alice", "#e74c3c");
    let mut bob = session(&hub, "bob", "#3498db");

    // 1. Sixty frames of opposing movement. Bob always ticks after alice,
    //    so her inputs reach him in the round they are for while his reach
    //    her one round late and trigger rollbacks.
    let mut now_ms: u64 = 1_000;
    for _ in 0..60 {
        alice.tick(right(), now_ms).unwrap();
        bob.tick(down(), now_ms).unwrap();
        now_ms += FRAME_MS;
    }

    // 2. A quiet tail so the final inputs and corrections land everywhere.
    for _ in 0..20 {
        alice.tick(Input::NONE, now_ms).unwrap();
        bob.tick(Input::NONE, now_ms).unwrap();
        now_ms += FRAME_MS;
    }

    assert!(alice.is_host());
    assert!(!bob.is_host());
    assert_eq!(alice.current_frame(), bob.current_frame());

    assert!(alice.stats().rollbacks >= 1);
    assert_eq!(bob.stats().rollbacks, 0);

    // Bit-identical worlds on both sides.
    assert_eq!(alice.world().digest(), bob.world().digest());
    assert_eq!(alice.world(), bob.world());
    for world in [alice.world(), bob.world()] {
        let a = &world.players[&peer("alice")];
        let b = &world.players[&peer("bob")];
        assert_eq!((a.x, a.y), (580.0, 300.0));
        assert_eq!((b.x, b.y), (400.0, 480.0));
    }

    let bob_events = bob.drain_events();
    assert!(bob_events.contains(&NetcodeEvent::PeerJoined(peer("alice"))));
    assert!(bob_events.contains(&NetcodeEvent::Synced { frame: 0 }));
}

#[test]
fn test_late_joiner_adopts_host_state_and_converges() {
    let hub = LoopbackHub::new();
    let mut alice = session(&hub, "alice", "#e74c3c");

    // 1. Alice plays thirty frames alone.
    let mut now_ms: u64 = 1_000;
    for _ in 0..30 {
        alice.tick(right(), now_ms).unwrap();
        now_ms += FRAME_MS;
    }
    assert_eq!(alice.current_frame(), 30);

    // 2. Bob connects mid-game. Alice's next poll admits him and, being
    //    the host, pushes her full state; bob adopts it before simulating
    //    his first frame.
    let mut bob = session(&hub, "bob", "#3498db");
    for _ in 0..30 {
        alice.tick(right(), now_ms).unwrap();
        bob.tick(down(), now_ms).unwrap();
        now_ms += FRAME_MS;
    }
    // 3. Quiet tail.
    for _ in 0..20 {
        alice.tick(Input::NONE, now_ms).unwrap();
        bob.tick(Input::NONE, now_ms).unwrap();
        now_ms += FRAME_MS;
    }

    let alice_events = alice.drain_events();
    assert!(alice_events.contains(&NetcodeEvent::PeerJoined(peer("bob"))));
    let bob_events = bob.drain_events();
    assert!(bob_events.contains(&NetcodeEvent::Synced { frame: 30 }));

    // Bob joined thirty frames in yet lands on the exact same world,
    // including the frames of alice's history he never saw.
    assert_eq!(alice.current_frame(), bob.current_frame());
    assert!(alice.stats().rollbacks >= 1);
    assert_eq!(bob.stats().rollbacks, 0);
    assert_eq!(alice.world().digest(), bob.world().digest());
    assert_eq!(alice.world(), bob.world());
    for world in [alice.world(), bob.world()] {
        let a = &world.players[&peer("alice")];
        let b = &world.players[&peer("bob")];
        assert_eq!((a.x, a.y), (580.0, 300.0));
        assert_eq!((b.x, b.y), (400.0, 390.0));
    }
}

#[test]
fn test_projectile_flight_is_identical_on_both_peers() {
    let hub = LoopbackHub::new();
    let mut alice = session(&hub, "alice", "#e74c3c");
    let mut bob = session(&hub, "bob", "#3498db");

    // 1. Bob walks away from the spawn row the whole time so the shot
    //    never connects; alice stands still and owns the projectile.
    let mut now_ms: u64 = 1_000;
    for _ in 0..21 {
        alice.tick(Input::NONE, now_ms).unwrap();
        bob.tick(down(), now_ms).unwrap();
        now_ms += FRAME_MS;
    }
    let id = alice.spawn_projectile(0.0, now_ms).unwrap().unwrap();
    assert_eq!(id.owner, peer("alice"));
    assert!(alice.world().projectiles.contains_key(&id));
    assert!(!bob.world().projectiles.contains_key(&id));

    // 2. Five more rounds: the announcement reaches bob and both sides
    //    advance the shot the same number of times.
    for _ in 0..5 {
        alice.tick(Input::NONE, now_ms).unwrap();
        bob.tick(down(), now_ms).unwrap();
        now_ms += FRAME_MS;
    }
    let on_alice = &alice.world().projectiles[&id];
    let on_bob = &bob.world().projectiles[&id];
    assert_eq!((on_alice.x, on_alice.y), (410.0, 300.0));
    assert_eq!((on_bob.x, on_bob.y), (410.0, 300.0));

    // 3. Keep going until the shot clears the arena margin. Both peers
    //    cull it on the same frame without any deletion traffic.
    for _ in 0..230 {
        alice.tick(Input::NONE, now_ms).unwrap();
        bob.tick(down(), now_ms).unwrap();
        now_ms += FRAME_MS;
    }
    assert!(alice.world().projectiles.is_empty());
    assert!(bob.world().projectiles.is_empty());

    // Only bob's very first input was ever mispredicted, well before the
    // spawn, so no rollback crossed it and the worlds stayed identical.
    assert_eq!(alice.stats().rollbacks, 1);
    assert_eq!(alice.world().digest(), bob.world().digest());
}

#[test]
fn test_scripted_chaos_converges_after_settling() {
    let hub = LoopbackHub::new();
    let mut alice = session(&hub, "alice", "#e74c3c");
    let mut bob = session(&hub, "bob", "#3498db");

    // 1. Bob's input changes every couple of frames, so alice mispredicts
    //    his stream over and over and spends the whole run rolling back.
    let mut now_ms: u64 = 1_000;
    for round in 0..120u64 {
        alice.tick(scripted(round), now_ms).unwrap();
        bob.tick(scripted(round / 2 + 3), now_ms).unwrap();
        now_ms += FRAME_MS;
    }
    // 2. Quiet tail.
    for _ in 0..30 {
        alice.tick(Input::NONE, now_ms).unwrap();
        bob.tick(Input::NONE, now_ms).unwrap();
        now_ms += FRAME_MS;
    }

    assert!(alice.stats().rollbacks >= 20);
    assert_eq!(bob.stats().rollbacks, 0);
    assert_eq!(alice.current_frame(), bob.current_frame());
    assert_eq!(alice.world().digest(), bob.world().digest());
    assert_eq!(alice.world(), bob.world());
}
