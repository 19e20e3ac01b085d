//! End-to-end tests through the public API.

use std::sync::Arc;

use simplex::core::{trinity_digest, ChainError, MerkleTree, SEAL_PREFIX_BYTES};
use simplex::store::{MemoryStore, SqliteStore, Store};
use simplex::{Received, Simplex, SimplexConfig, SimplexError};
use simplex_testkit::{fixed_time, TestFixture};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn abc() -> SimplexConfig {
    SimplexConfig {
        roster: vec!["a".into(), "b".into(), "c".into()],
        ..SimplexConfig::default()
    }
}

#[tokio::test]
async fn broadcast_scenario() {
    init_tracing();
    let simplex = Simplex::new(MemoryStore::new(), abc());

    let records = simplex.broadcast("a", "hi").await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.seal.verified));

    let status = simplex.status();
    assert_eq!(status.mesh.channels, 3);
    assert_eq!(status.seal.chain_length, 2);
    assert_eq!(status.seal.merkle_leaves, 2);
    assert!(status.seal.integrity);

    let ab = simplex.channel("a", "b").unwrap();
    assert_eq!(ab.lock().ratchet_count(), 1);
}

#[tokio::test]
async fn default_roster_full_mesh() {
    let simplex = Simplex::new(MemoryStore::new(), SimplexConfig::default());
    let status = simplex.status();
    assert_eq!(status.mesh.channels, 10);
    assert_eq!(status.mesh.topology, "full_mesh");
    assert_eq!(
        status.mesh.daemons,
        vec!["leonardo", "nyx", "zoe", "euterpe", "omniscient"]
    );
    assert!(!status.seal.integrity);
}

#[test]
fn roundtrip_against_replayed_state() {
    let fixture = TestFixture::new();
    let handle = fixture.registry.get_channel("a", "c").unwrap();
    let mut receiver_side = handle.lock().clone();

    let record = fixture.send("c", "a", "meet at the usual place").unwrap();
    let received = receiver_side.receive(&record.encrypted, &record.tag).unwrap();
    assert_eq!(received, Received::Plaintext("meet at the usual place".into()));
    assert_eq!(receiver_side.ratchet_count(), handle.lock().ratchet_count());
}

#[test]
fn seal_summary_matches_chain() {
    let fixture = TestFixture::new();
    let record = fixture.send("a", "b", "x").unwrap();

    let entry = &fixture.seal.entries()[0];
    let trinity = trinity_digest(&entry.payload);
    assert_eq!(record.seal.seal, trinity.prefix_hex(SEAL_PREFIX_BYTES));
    assert_eq!(record.seal.timestamp, "2024-01-01T00:00:00.000000Z");
    assert_eq!(record.timestamp, record.seal.timestamp);

    let ciphertext = hex::decode(&record.encrypted).unwrap();
    assert!(entry.payload.ends_with(&ciphertext));
    assert!(entry.payload.starts_with(fixture.seal.nonce().as_bytes()));
}

#[test]
fn every_sealed_payload_proves_inclusion() {
    let fixture = TestFixture::new();
    for i in 0..9 {
        fixture.broadcast(["a", "b", "c"][i % 3], &format!("round {}", i)).unwrap();
    }
    assert_eq!(fixture.seal.len(), 18);

    for i in 0..18 {
        let (payload, proof) = fixture.seal.inclusion(i).unwrap();
        assert!(fixture.seal.verify_inclusion(&payload, i, &proof));
    }

    let tree = MerkleTree::from_leaves(fixture.seal.entries().into_iter().map(|e| e.payload));
    assert_eq!(tree.root(), fixture.seal.merkle_root());
}

#[tokio::test]
async fn reopen_continues_chain_from_sqlite() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("simplex.db");

    let (nonce, head) = {
        let simplex = Simplex::open(SqliteStore::open(&path).unwrap(), abc()).await.unwrap();
        simplex.broadcast("b", "first").await.unwrap();
        simplex.send("c", "a", "second").await.unwrap();
        assert_eq!(simplex.flush().await.unwrap(), 3);
        (*simplex.seal().nonce(), simplex.seal().head())
    };

    let simplex = Simplex::open(SqliteStore::open(&path).unwrap(), abc()).await.unwrap();
    assert_eq!(*simplex.seal().nonce(), nonce);
    assert_eq!(simplex.seal().head(), head);
    assert_eq!(simplex.persisted().await, 3);
    simplex.audit().unwrap();

    let record = simplex.send("a", "b", "third").await.unwrap();
    assert_eq!(record.seal.chain_position, 4);
    assert_eq!(simplex.flush().await.unwrap(), 1);
    assert_eq!(simplex.store().seal_count().await.unwrap(), 4);
}

#[tokio::test]
async fn reopen_rejects_tampered_store() {
    let source = Simplex::new(MemoryStore::new(), abc());
    source.broadcast("a", "one").await.unwrap();
    source.broadcast("b", "two").await.unwrap();
    source.flush().await.unwrap();

    let forged = MemoryStore::new();
    forged.save_nonce(source.seal().nonce()).await.unwrap();
    for (i, entry) in source.seal().entries().into_iter().enumerate() {
        let mut payload = entry.payload.to_vec();
        if i == 2 {
            let last = payload.len() - 1;
            payload[last] ^= 0xff;
        }
        forged
            .append_seal(i as u64 + 1, &entry.link, &payload)
            .await
            .unwrap();
    }

    let err = Simplex::open(forged, abc()).await.unwrap_err();
    assert!(matches!(
        err,
        SimplexError::Chain(ChainError::BrokenLink { position: 3, .. })
    ));
}

#[tokio::test]
async fn flush_reports_conflicting_store() {
    let simplex = Simplex::new(MemoryStore::new(), abc());
    simplex.send("a", "b", "mine").await.unwrap();

    let other = simplex.seal().entries()[0].link;
    simplex
        .store()
        .append_seal(1, &other, b"not the sealed payload")
        .await
        .unwrap();

    let err = simplex.flush().await.unwrap_err();
    assert!(matches!(
        err,
        SimplexError::Store(simplex::store::StoreError::Conflict { position: 1 })
    ));
}

#[tokio::test]
async fn concurrent_sends_keep_chain_consistent() {
    let simplex = Arc::new(Simplex::new(
        MemoryStore::new(),
        SimplexConfig {
            persist_on_send: true,
            ..SimplexConfig::default()
        },
    ));
    let roster = simplex.registry().participants().to_vec();

    let mut tasks = Vec::new();
    for (i, sender) in roster.iter().enumerate() {
        let simplex = simplex.clone();
        let sender = sender.clone();
        let receiver = roster[(i + 1) % roster.len()].clone();
        tasks.push(tokio::spawn(async move {
            for n in 0..10 {
                simplex
                    .send(&sender, &receiver, &format!("{} #{}", sender, n))
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let status = simplex.status();
    assert_eq!(status.seal.chain_length, 50);
    assert_eq!(status.mesh.total_ratchets, 50);
    simplex.audit().unwrap();
    assert_eq!(simplex.store().seal_count().await.unwrap(), 50);

    let stored: Vec<_> = simplex
        .store()
        .load_seals()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.link)
        .collect();
    assert_eq!(stored, simplex.seal().links());
}

#[test]
fn fixture_times_are_fixed() {
    assert_eq!(fixed_time().timestamp(), 1_704_067_200);
}
