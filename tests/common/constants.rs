//! Shared constants for end-to-end tests
#![allow(dead_code)]

/// Participant ids known to the fake provider. The OAuth code and the
/// access token of a participant are derived from the id.
pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";
pub const CAROL: &str = "carol";

/// Alice's popular tracks (level 1 once imported).
pub const ALICE_POPULAR_TRACKS: [&str; 3] = ["alice-pop-1", "alice-pop-2", "alice-pop-3"];
/// Alice's obscure tracks (level 0 until classified).
pub const ALICE_OBSCURE_TRACKS: [&str; 2] = ["alice-obscure-1", "alice-obscure-2"];

pub const BOB_POPULAR_TRACKS: [&str; 3] = ["bob-pop-1", "bob-pop-2", "bob-pop-3"];
pub const BOB_OBSCURE_TRACKS: [&str; 1] = ["bob-obscure-1"];

pub const POPULAR: u8 = 90;
pub const OBSCURE: u8 = 10;

/// Track id the fake provider has no audio features for.
pub const FEATURELESS_TRACK: &str = "alice-obscure-2";

pub const DEVICE_ID: &str = "test-device";

// Timeouts
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
