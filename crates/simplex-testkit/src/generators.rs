//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use crate::fixtures::{roster_of, TestFixture};

/// Generate leaf bytes of at most `max_len` bytes.
pub fn leaf(max_len: usize) -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..=max_len).prop_map(Bytes::from)
}

/// Generate a non-empty list of leaves.
pub fn leaves(max_count: usize) -> impl Strategy<Value = Vec<Bytes>> {
    prop::collection::vec(leaf(64), 1..=max_count.max(1))
}

/// Generate a participant name.
pub fn participant_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,11}".prop_map(String::from)
}

/// Generate a roster of 2 to `max_size` distinct names.
pub fn roster(max_size: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(participant_name(), 2..=max_size.max(2))
        .prop_map(|names| names.into_iter().collect())
}

/// Generate message text.
pub fn message_text() -> impl Strategy<Value = String> {
    ".{0,64}".prop_map(String::from)
}

/// Scripted traffic over a roster of `p0..pN`.
#[derive(Debug, Clone)]
pub struct TrafficParams {
    pub roster_size: usize,
    /// `(sender, receiver, text)` as roster indices; sender never equals receiver.
    pub messages: Vec<(usize, usize, String)>,
}

impl Arbitrary for TrafficParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (2usize..=6)
            .prop_flat_map(|n| {
                let message = (0..n, 1..n, message_text())
                    .prop_map(move |(sender, offset, text)| (sender, (sender + offset) % n, text));
                (Just(n), prop::collection::vec(message, 0..32))
            })
            .prop_map(|(roster_size, messages)| TrafficParams {
                roster_size,
                messages,
            })
            .boxed()
    }
}

/// Build a fixture over `p0..pN` and play the traffic through it.
pub fn traffic_from_params(params: &TrafficParams) -> TestFixture {
    let roster = roster_of(params.roster_size);
    let fixture = TestFixture::with_roster(roster.clone());
    for (sender, receiver, text) in &params.messages {
        // Indices come from the roster, so the send cannot be rejected.
        let _ = fixture.send(&roster[*sender], &roster[*receiver], text);
    }
    fixture
}
