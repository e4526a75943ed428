use bridge::premium::{evaluate_premium, evaluate_premium_in, select_stream, PremiumStatus, TimestampUnit};
use bridge::stream::{Stream, StreamStatus};

const RECEIVER: &str = "finance-r-v2.dcversus.testnet";

fn stream(id: &str, receiver: &str, status: StreamStatus, created: u64, balance: u128, available: u128, rate: u128) -> Stream {
    Stream {
        id: id.into(),
        owner_id: "alice.testnet".into(),
        receiver_id: receiver.into(),
        token_account_id: "wrap.testnet".into(),
        status,
        timestamp_created: created,
        last_action: None,
        balance,
        available_to_withdraw: available,
        tokens_per_sec: rate,
        tokens_total_withdrawn: 0,
    }
}

fn active(id: &str, created: u64) -> Stream {
    stream(id, RECEIVER, StreamStatus::Active, created, 1_000, 0, 10)
}

#[test]
fn empty_input_has_no_entitlement() {
    assert_eq!(evaluate_premium(&[], RECEIVER, 0), PremiumStatus::NONE);
    assert_eq!(evaluate_premium(&[], RECEIVER, 1_700_000_000), PremiumStatus { premium: false, end_timestamp: 0 });
}

#[test]
fn streams_to_other_receivers_are_ignored() {
    let streams = vec![
        stream("a", "someone.testnet", StreamStatus::Active, 100, 1_000, 0, 10),
        stream("b", "other.testnet", StreamStatus::Active, 200, 5_000, 0, 1),
    ];
    assert_eq!(evaluate_premium(&streams, RECEIVER, 150), PremiumStatus::NONE);
}

#[test]
fn newest_active_stream_wins_regardless_of_order() {
    let older = active("older", 100);
    let newer = active("newer", 200);

    let forward = [older.clone(), newer.clone()];
    let backward = [newer, older];
    assert_eq!(select_stream(&forward, RECEIVER).map(|s| s.id.as_str()), Some("newer"));
    assert_eq!(select_stream(&backward, RECEIVER).map(|s| s.id.as_str()), Some("newer"));
    assert_eq!(
        evaluate_premium(&forward, RECEIVER, 0),
        evaluate_premium(&backward, RECEIVER, 0)
    );
}

#[test]
fn equal_creation_times_keep_input_order() {
    let streams = [active("first", 300), active("second", 300)];
    assert_eq!(select_stream(&streams, RECEIVER).map(|s| s.id.as_str()), Some("first"));
}

#[test]
fn one_day_deposit_ends_a_day_after_creation() {
    let t = 1_650_000_000;
    let streams = [stream(
        "day",
        RECEIVER,
        StreamStatus::Active,
        t,
        240_000_000_000_000_000_000_000,
        0,
        2_777_777_777_777_777_777,
    )];
    let status = evaluate_premium(&streams, RECEIVER, t);
    assert!(status.premium);
    assert_eq!(status.end_timestamp, t + 86_400);
}

#[test]
fn nanosecond_timestamps_scale_the_projection() {
    let t = 1_650_000_000_000_000_000;
    let streams = [stream(
        "day",
        RECEIVER,
        StreamStatus::Active,
        t,
        240_000_000_000_000_000_000_000,
        0,
        2_777_777_777_777_777_777,
    )];
    let status = evaluate_premium_in(&streams, RECEIVER, t, TimestampUnit::Nanos);
    assert!(status.premium);
    assert_eq!(status.end_timestamp, t + 86_400 * 1_000_000_000);
}

#[test]
fn finished_and_paused_streams_are_not_candidates() {
    let streams = [
        stream(
            "done",
            RECEIVER,
            StreamStatus::Finished { reason: Some("FinishedNaturally".into()) },
            500,
            10_000,
            0,
            1,
        ),
        stream("held", RECEIVER, StreamStatus::Paused, 600, 10_000, 0, 1),
    ];
    assert_eq!(evaluate_premium(&streams, RECEIVER, 0), PremiumStatus::NONE);
}

#[test]
fn finished_newer_stream_does_not_shadow_active_one() {
    let streams = [
        active("live", 100),
        stream("done", RECEIVER, StreamStatus::Finished { reason: None }, 900, 0, 0, 10),
    ];
    assert_eq!(select_stream(&streams, RECEIVER).map(|s| s.id.as_str()), Some("live"));
    assert!(evaluate_premium(&streams, RECEIVER, 0).premium);
}

#[test]
fn zero_balance_is_not_premium() {
    let streams = [stream("empty", RECEIVER, StreamStatus::Active, 100, 0, 0, 10)];
    let status = evaluate_premium(&streams, RECEIVER, 50);
    assert!(!status.premium);
    assert_eq!(status.end_timestamp, 100);
    assert_eq!(streams[0].remaining_fraction(), 0.0);
}

#[test]
fn fully_withdrawable_stream_is_not_premium() {
    let streams = [stream("drained", RECEIVER, StreamStatus::Active, 100, 1_000, 1_000, 10)];
    assert!(!evaluate_premium(&streams, RECEIVER, 0).premium);

    let over = [stream("over", RECEIVER, StreamStatus::Active, 100, 1_000, 5_000, 10)];
    assert!(!evaluate_premium(&over, RECEIVER, 0).premium);
}

#[test]
fn partially_withdrawable_stream_stays_premium() {
    let streams = [stream("half", RECEIVER, StreamStatus::Active, 100, 1_000, 500, 10)];
    assert!((streams[0].remaining_fraction() - 0.5).abs() < f64::EPSILON);
    assert!(evaluate_premium(&streams, RECEIVER, 0).premium);
}

#[test]
fn missing_rate_means_already_expired() {
    let streams = [stream("norate", RECEIVER, StreamStatus::Active, 777, 1_000, 0, 0)];
    let status = evaluate_premium(&streams, RECEIVER, 10_000);
    assert_eq!(status.end_timestamp, 777);
}

#[test]
fn projection_never_precedes_now() {
    // 1_000 tokens at 10/s last 100s from creation at 100.
    let streams = [active("live", 100)];
    assert_eq!(evaluate_premium(&streams, RECEIVER, 150).end_timestamp, 200);
    assert_eq!(evaluate_premium(&streams, RECEIVER, 5_000).end_timestamp, 5_000);
}

#[test]
fn huge_balances_saturate_instead_of_overflowing() {
    let streams = [stream("whale", RECEIVER, StreamStatus::Active, 10, u128::MAX, 0, 1)];
    let status = evaluate_premium_in(&streams, RECEIVER, 0, TimestampUnit::Nanos);
    assert!(status.premium);
    assert_eq!(status.end_timestamp, u64::MAX);
}

#[test]
fn evaluation_is_idempotent() {
    let streams = vec![
        active("a", 100),
        active("b", 200),
        stream("c", "other.testnet", StreamStatus::Active, 300, 1, 0, 1),
    ];
    let first = serde_json::to_vec(&evaluate_premium(&streams, RECEIVER, 123)).unwrap();
    let second = serde_json::to_vec(&evaluate_premium(&streams, RECEIVER, 123)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn status_serialises_with_host_field_names() {
    let status = PremiumStatus { premium: true, end_timestamp: 42 };
    assert_eq!(
        serde_json::to_value(status).unwrap(),
        serde_json::json!({ "premium": true, "endTimestamp": 42 })
    );
}

#[test]
fn contract_records_decode() {
    let raw = r#"[
        {
            "id": "8GAMxhfT6K3WW4V1mn5wmHsBZ6LZzmLV5fBgq4dFfE5b",
            "description": "premium",
            "creator_id": "alice.testnet",
            "owner_id": "alice.testnet",
            "receiver_id": "finance-r-v2.dcversus.testnet",
            "token_account_id": "wrap.testnet",
            "timestamp_created": 1650000000000000000,
            "last_action": 1650000100000000000,
            "balance": "240000000000000000000000",
            "tokens_per_sec": "2777777777777777777",
            "status": "Active",
            "tokens_total_withdrawn": "0",
            "is_expirable": true,
            "is_locked": false
        },
        {
            "id": "2",
            "owner_id": "alice.testnet",
            "receiver_id": "finance-r-v2.dcversus.testnet",
            "timestamp_created": 1,
            "balance": "0",
            "tokens_per_sec": "1",
            "status": { "Finished": { "reason": "FinishedNaturally" } }
        }
    ]"#;
    let streams: Vec<Stream> = serde_json::from_str(raw).unwrap();
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].status, StreamStatus::Active);
    assert_eq!(streams[0].balance, 240_000_000_000_000_000_000_000);
    assert_eq!(streams[0].available_to_withdraw, 0);
    assert_eq!(streams[0].last_action, Some(1_650_000_100_000_000_000));
    assert_eq!(
        streams[1].status,
        StreamStatus::Finished { reason: Some("FinishedNaturally".into()) }
    );
}

#[test]
fn unknown_status_is_rejected() {
    let raw = r#"{"id":"x","receiver_id":"r","timestamp_created":1,"status":"Exploded"}"#;
    assert!(serde_json::from_str::<Stream>(raw).is_err());
}
