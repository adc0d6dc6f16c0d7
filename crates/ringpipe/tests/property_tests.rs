//! Property-based tests for the ring buffer invariants.
//!
//! Coverage:
//! - capacity rounding and the reserved slot
//! - occupancy conservation under arbitrary (including overwriting) traffic
//! - FIFO round trip against a `VecDeque` model
//! - blocking transfers of arbitrary size between two threads

#![cfg(not(feature = "loom"))]

use proptest::prelude::*;
use ringpipe::RingBuffer;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
enum Op {
    Write(Vec<u8>),
    Read(usize),
}

fn op_strategy(max_len: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..max_len).prop_map(Op::Write),
        (0..max_len).prop_map(Op::Read),
    ]
}

// =============================================================================
// Capacity rounding
// "capacity is the smallest power of two >= elements * element_size"
// =============================================================================

proptest! {
    #[test]
    fn prop_capacity_is_next_power_of_two(
        elements in 1usize..100_000,
        element_size in 1usize..64,
    ) {
        let ring = RingBuffer::new(elements, element_size).unwrap();
        let requested = elements * element_size;
        let bytes = ring.byte_size();

        prop_assert!(bytes.is_power_of_two());
        prop_assert!(bytes >= requested);
        prop_assert!(bytes / 2 < requested, "{} is not the smallest fit for {}", bytes, requested);

        // Freshly created: empty, one byte reserved
        prop_assert!(ring.is_empty());
        prop_assert_eq!(ring.write_avail_bytes(), bytes - 1);
        prop_assert_eq!(ring.size(), bytes / element_size);
    }
}

// =============================================================================
// Occupancy conservation
// "read_size + write_size == capacity - 1" after every operation, even when
// non-blocking writes overwrite unread data
// =============================================================================

proptest! {
    #[test]
    fn prop_occupancy_conserved(
        ops in prop::collection::vec(op_strategy(40), 1..60),
    ) {
        let ring = RingBuffer::new(16, 1).unwrap();
        let usable = ring.byte_size() - 1;

        for op in ops {
            match op {
                Op::Write(data) => {
                    prop_assert_eq!(ring.write(&data, data.len()).unwrap(), data.len());
                }
                Op::Read(len) => {
                    let before = ring.read_avail_bytes();
                    let mut out = vec![0u8; len];
                    let n = ring.read(&mut out, len).unwrap();
                    prop_assert_eq!(n, len.min(before));
                }
            }

            prop_assert_eq!(ring.read_avail_bytes() + ring.write_avail_bytes(), usable);
            prop_assert!(!(ring.is_empty() && ring.is_full()));
        }
    }
}

// =============================================================================
// FIFO round trip
// "bytes come out in the order they went in" while no write exceeds free space
// =============================================================================

proptest! {
    #[test]
    fn prop_fifo_round_trip(
        ops in prop::collection::vec(op_strategy(64), 1..100),
    ) {
        let ring = RingBuffer::new(64, 1).unwrap();
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                Op::Write(mut data) => {
                    data.truncate(ring.write_avail_bytes());
                    ring.write(&data, data.len()).unwrap();
                    model.extend(data);
                }
                Op::Read(len) => {
                    let mut out = vec![0u8; len];
                    let n = ring.read(&mut out, len).unwrap();
                    let expected: Vec<u8> = model.drain(..n).collect();
                    prop_assert_eq!(&out[..n], &expected[..]);
                }
            }
            prop_assert_eq!(ring.read_avail_bytes(), model.len());
        }

        let mut rest = vec![0u8; model.len()];
        let rest_len = rest.len();
        let n = ring.read(&mut rest, rest_len).unwrap();
        prop_assert_eq!(n, model.len());
        prop_assert!(rest.iter().eq(model.iter()));
    }
}

// =============================================================================
// Blocking transfer
// "a blocking write and a blocking read of the same total deliver every byte"
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_blocking_transfer_delivers_everything(
        capacity in 2usize..256,
        data in prop::collection::vec(any::<u8>(), 1..4096),
    ) {
        let ring = Arc::new(RingBuffer::new(capacity, 1).unwrap());
        let total = data.len();

        let writer = {
            let ring = Arc::clone(&ring);
            let data = data.clone();
            thread::spawn(move || ring.blocking_write(&data, total, None).unwrap())
        };

        let mut out = vec![0u8; total];
        let n = ring.blocking_read(&mut out, total, None).unwrap();

        prop_assert_eq!(writer.join().unwrap(), total);
        prop_assert_eq!(n, total);
        prop_assert_eq!(out, data);
    }
}
