//! End-to-end tests of the wired coordinator: manager → polls, benchlist →
//! live set → sampling and throttler shares.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use node_runtime::{BenchlistSettings, ConfigError, Coordinator, CoordinatorError, NodeConfig};
use shared_types::{BlockId, ChainId, ValidatorId};
use tokio::time::{sleep, timeout};
use vc_01_validators::{NetworkId, SampleSeed, StaticValidatorSource, ValidatorError};
use vc_02_poll::{PollConfig, PollError};
use vc_03_throttling::ByteThrottlerConfig;
use vc_04_benchlist::{BenchEvent, Benchable, RecordingBenchable};

const CHAIN: ChainId = ChainId::new([3; 32]);

fn vdr(n: u8) -> ValidatorId {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    ValidatorId::new(bytes)
}

fn block(n: u8) -> BlockId {
    BlockId::new([n; 32])
}

/// Local network with `count` default validators of equal weight.
fn local_config(count: u8) -> NodeConfig {
    let mut config = NodeConfig {
        chain_id: CHAIN,
        poll: PollConfig { k: 5, alpha: 3 },
        throttler: ByteThrottlerConfig {
            vdr_alloc_size: 1024,
            at_large_alloc_size: 0,
            node_max_at_large_bytes: 0,
        },
        benchlist: BenchlistSettings {
            threshold: 2,
            minimum_failing_duration_secs: 0,
            duration_secs: 60,
            max_portion: 0.5,
        },
        ..NodeConfig::default()
    };
    config.validators.network_id = NetworkId::LOCAL_ID;
    config.validators.node_ids = (1..=count).map(|n| vdr(n).to_string()).collect();
    config
}

fn coordinator(config: &NodeConfig) -> (Coordinator, Arc<RecordingBenchable>) {
    let recorder = Arc::new(RecordingBenchable::new());
    let coordinator =
        Coordinator::new(config, None, Arc::clone(&recorder) as Arc<dyn Benchable>).unwrap();
    (coordinator, recorder)
}

async fn is_blocked<F: std::future::Future>(future: F) -> bool {
    timeout(Duration::from_millis(50), future).await.is_err()
}

#[tokio::test]
async fn test_poll_over_sampled_validators_reaches_quorum() {
    let (coordinator, _) = coordinator(&local_config(5));
    let validators = coordinator.refresh_validators().await.unwrap();
    assert_eq!(validators.len(), 5);
    assert_eq!(validators.total_weight(), 5 * 200_000);

    let voters = coordinator.start_poll(1, SampleSeed::Deterministic(7)).unwrap();
    let mut sorted = voters.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 5);
    assert_eq!(coordinator.open_polls(), 1);

    let accepted = block(0xaa);
    assert!(coordinator.record_vote(1, voters[0], accepted).is_empty());
    assert!(coordinator.record_vote(1, voters[1], block(0xbb)).is_empty());
    assert!(coordinator.record_vote(1, voters[2], accepted).is_empty());
    let results = coordinator.record_vote(1, voters[3], accepted);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].count(&accepted), 3);
    assert_eq!(results[0].count(&block(0xbb)), 1);
    assert_eq!(coordinator.open_polls(), 0);
}

#[tokio::test]
async fn test_same_seed_same_sample() {
    let (coordinator, _) = coordinator(&local_config(8));
    let first = coordinator.start_poll(1, SampleSeed::Deterministic(42)).unwrap();
    let second = coordinator.start_poll(2, SampleSeed::Deterministic(42)).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_duplicate_request_id_rejected() {
    let (coordinator, _) = coordinator(&local_config(5));
    coordinator.start_poll(9, SampleSeed::Secure).unwrap();
    assert!(matches!(
        coordinator.start_poll(9, SampleSeed::Secure),
        Err(CoordinatorError::DuplicateRequest(9))
    ));
    assert_eq!(coordinator.open_polls(), 1);
}

#[tokio::test]
async fn test_results_delivered_in_creation_order() {
    let (coordinator, _) = coordinator(&local_config(5));
    let older = coordinator.start_poll(1, SampleSeed::Deterministic(1)).unwrap();
    let newer = coordinator.start_poll(2, SampleSeed::Deterministic(2)).unwrap();

    // The newer poll finishes first but waits for the older one.
    for voter in &newer[..3] {
        assert!(coordinator.record_vote(2, *voter, block(2)).is_empty());
    }
    for voter in &older[..2] {
        assert!(coordinator.record_vote(1, *voter, block(1)).is_empty());
    }
    let results = coordinator.record_vote(1, older[2], block(1));

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].count(&block(1)), 3);
    assert_eq!(results[1].count(&block(2)), 3);
}

#[tokio::test]
async fn test_failures_finish_poll_when_quorum_unreachable() {
    let (coordinator, _) = coordinator(&local_config(5));
    let voters = coordinator.start_poll(4, SampleSeed::Deterministic(4)).unwrap();

    assert!(coordinator.record_failure(4, voters[0]).is_empty());
    assert!(coordinator.record_failure(4, voters[1]).is_empty());
    assert!(coordinator.record_vote(4, voters[2], block(1)).is_empty());
    // One vote in, one voter left: three agreeing votes are out of reach.
    let results = coordinator.record_failure(4, voters[3]);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].received(), 1);
    assert_eq!(results[0].count(&block(1)), 1);
    assert_eq!(coordinator.open_polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_benched_validator_leaves_sample_and_share() {
    let mut config = local_config(4);
    config.poll = PollConfig { k: 4, alpha: 2 };
    let (coordinator, recorder) = coordinator(&config);
    let (v1, v2) = (vdr(1), vdr(2));

    // Failures outside any open poll still count towards the bench.
    coordinator.record_failure(77, v1);
    coordinator.record_failure(77, v1);

    assert!(coordinator.benchlist().is_benched(&v1));
    assert_eq!(recorder.events(), vec![BenchEvent::Benched(CHAIN, v1)]);
    let live = coordinator.live_set();
    assert_eq!(live.len(), 3);
    assert_eq!(live.weight_of(&v1), 0);

    let voters = coordinator.start_poll(1, SampleSeed::Deterministic(11)).unwrap();
    assert_eq!(voters.len(), 3);
    assert!(!voters.contains(&v1));

    // No stake, no validator share, and no at-large pool to fall back on.
    assert!(is_blocked(coordinator.admit(1, v1)).await);
    coordinator.admit(341, v2).await;
    assert_eq!(coordinator.throttler().snapshot().vdr_used(&v2), 341);

    sleep(Duration::from_secs(61)).await;
    assert!(!coordinator.benchlist().is_benched(&v1));
    assert_eq!(live.len(), 4);
    assert_eq!(
        recorder.events(),
        vec![
            BenchEvent::Benched(CHAIN, v1),
            BenchEvent::Unbenched(CHAIN, v1),
        ]
    );

    coordinator.admit(256, v1).await;
    assert_eq!(coordinator.throttler().snapshot().vdr_used(&v1), 256);
}

#[tokio::test(start_paused = true)]
async fn test_response_resets_failure_streak() {
    let (coordinator, recorder) = coordinator(&local_config(4));
    let v1 = vdr(1);

    coordinator.record_failure(1, v1);
    coordinator.record_vote(1, v1, block(1));
    coordinator.record_failure(1, v1);

    assert!(!coordinator.benchlist().is_benched(&v1));
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_sourced_membership_drives_throttler_shares() {
    let source = Arc::new(StaticValidatorSource::new());
    source.accept(block(1), HashMap::from([(vdr(1), 3), (vdr(2), 1)]));

    let mut config = local_config(0);
    config.validators.network_id = 4242;
    let recorder = Arc::new(RecordingBenchable::new());
    let coordinator = Coordinator::new(&config, Some(source.clone()), recorder).unwrap();
    assert!(coordinator.live_set().is_empty());

    let live = coordinator.refresh_validators().await.unwrap();
    assert!(Arc::ptr_eq(&live, &coordinator.live_set()));
    assert_eq!(live.total_weight(), 4);

    // Shares are 3/4 and 1/4 of the validator pool.
    coordinator.admit(768, vdr(1)).await;
    assert!(is_blocked(coordinator.admit(1, vdr(1))).await);
    coordinator.admit(256, vdr(2)).await;
    assert_eq!(coordinator.throttler().snapshot().remaining_vdr_bytes, 0);

    coordinator.processed(768, vdr(1));
    coordinator.disconnected(vdr(2));
    let snapshot = coordinator.throttler().snapshot();
    assert_eq!(snapshot.remaining_vdr_bytes, 1024);
    assert!(snapshot.vdr_bytes_used.is_empty());

    // An outage keeps the last known membership.
    source.set_unavailable(true);
    let live = coordinator.refresh_validators().await.unwrap();
    assert_eq!(live.len(), 2);
    assert_eq!(source.load_count(), 1);
}

#[tokio::test]
async fn test_songbird_node_starts_with_baked_in_validators() {
    let mut config = local_config(0);
    config.validators.network_id = NetworkId::SONGBIRD_ID;
    let (coordinator, _) = coordinator(&config);

    let validators = coordinator.refresh_validators().await.unwrap();
    assert_eq!(validators.len(), 20);
    assert_eq!(validators.total_weight(), 20 * 50_000);

    let known: ValidatorId = "NodeID-3M9KVT6ixi4gVMisbm5TnPXYXgFN5LHuv".parse().unwrap();
    assert_eq!(validators.weight_of(&known), 50_000);

    let voters = coordinator.start_poll(1, SampleSeed::Deterministic(3)).unwrap();
    assert_eq!(voters.len(), 5);
}

#[tokio::test]
async fn test_empty_membership_cannot_poll() {
    let mut config = local_config(0);
    config.validators.network_id = 4242;
    let (coordinator, _) = coordinator(&config);

    assert!(matches!(
        coordinator.refresh_validators().await,
        Err(CoordinatorError::Validators(ValidatorError::NoValidators))
    ));
    assert!(matches!(
        coordinator.start_poll(1, SampleSeed::Secure),
        Err(CoordinatorError::Poll(PollError::AlphaExceedsVoters { .. }))
    ));
}

#[tokio::test]
async fn test_invalid_configuration_fails_construction() {
    let mut config = local_config(3);
    config.poll = PollConfig { k: 2, alpha: 3 };
    let result = Coordinator::new(&config, None, Arc::new(RecordingBenchable::new()));
    assert!(matches!(
        result,
        Err(CoordinatorError::Config(ConfigError::Poll(_)))
    ));

    let mut config = local_config(3);
    config.validators.node_ids.push("NodeID-not-base58".to_string());
    let result = Coordinator::new(&config, None, Arc::new(RecordingBenchable::new()));
    assert!(matches!(
        result,
        Err(CoordinatorError::Validators(ValidatorError::InvalidNodeId { .. }))
    ));
}
