#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::num::NonZeroUsize;

use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

use super::*;

fn nz(v: usize) -> NonZeroUsize {
    NonZeroUsize::new(v).unwrap()
}

#[test]
fn even_split() {
    let plan = PartitionPlan::new(12, nz(4));
    assert_eq!(plan.worker_count(), 4);
    for rank in 0..4 {
        assert_eq!(plan.count(rank), 3);
        assert_eq!(plan.offset(rank), rank * 3);
    }
}

#[test]
fn last_rank_absorbs_remainder() {
    let plan = PartitionPlan::new(14, nz(4));
    assert_eq!(plan.count(0), 3);
    assert_eq!(plan.count(1), 3);
    assert_eq!(plan.count(2), 3);
    assert_eq!(plan.count(3), 5);
    assert_eq!(plan.offset(3), 9);
}

#[test]
fn single_worker_takes_everything() {
    let plan = PartitionPlan::new(1000, nz(1));
    assert_eq!(plan.count(0), 1000);
    assert_eq!(plan.offset(0), 0);
}

#[test]
fn more_workers_than_bytes_clamps_to_zero() {
    // 3 bytes across 8 workers: ranks 0 through 6 own nothing, rank 7 owns all 3.
    let plan = PartitionPlan::new(3, nz(8));
    for rank in 0..7 {
        assert_eq!(plan.count(rank), 0);
        assert_eq!(plan.offset(rank), 0);
    }
    assert_eq!(plan.count(7), 3);
    assert_eq!(plan.offset(7), 0);
}

#[test]
fn empty_buffer_is_all_zero_slices() {
    let plan = PartitionPlan::new(0, nz(4));
    for rank in 0..4 {
        assert_eq!(plan.count(rank), 0);
        assert!(plan.range(rank).is_empty());
    }
}

#[test]
fn chunk_returns_the_owned_bytes() {
    let buf: Vec<u8> = (0..14).collect();
    let plan = PartitionPlan::new(14, nz(4));
    assert_eq!(plan.chunk(&buf, 0).unwrap(), &[0, 1, 2]);
    assert_eq!(plan.chunk(&buf, 3).unwrap(), &[9, 10, 11, 12, 13]);
}

#[test]
fn chunk_rejects_wrong_buffer_length() {
    let buf = vec![0u8; 13];
    let plan = PartitionPlan::new(14, nz(4));
    let err = plan.chunk(&buf, 0).unwrap_err();
    assert!(matches!(
        err,
        MorphError::PartitionOutOfBounds { len: 13, .. }
    ));
}

#[test]
fn chunk_rejects_out_of_range_rank() {
    let buf = vec![0u8; 14];
    let plan = PartitionPlan::new(14, nz(4));
    assert!(plan.chunk(&buf, 4).is_err());
}

#[test]
fn chunk_mut_writes_in_place() {
    let mut buf = vec![0u8; 10];
    let plan = PartitionPlan::new(10, nz(3));
    plan.chunk_mut(&mut buf, 1).unwrap().fill(9);
    assert_eq!(buf, [0, 0, 0, 9, 9, 9, 0, 0, 0, 0]);
}

#[quickcheck]
fn counts_sum_to_total(total_size: usize, workers: usize) -> TestResult {
    if workers == 0 || workers > 256 || total_size > 1 << 24 {
        return TestResult::discard();
    }
    let plan = PartitionPlan::new(total_size, NonZeroUsize::new(workers).unwrap());
    TestResult::from_bool(plan.counts.iter().sum::<usize>() == total_size)
}

#[quickcheck]
fn offsets_are_prefix_sums(total_size: usize, workers: usize) -> TestResult {
    if workers == 0 || workers > 256 || total_size > 1 << 24 {
        return TestResult::discard();
    }
    let plan = PartitionPlan::new(total_size, NonZeroUsize::new(workers).unwrap());
    let mut acc = 0;
    for rank in 0..workers {
        if plan.offset(rank) != acc {
            return TestResult::failed();
        }
        acc += plan.count(rank);
    }
    TestResult::passed()
}

#[quickcheck]
fn ranges_tile_the_buffer_without_gaps(total_size: usize, workers: usize) -> TestResult {
    if workers == 0 || workers > 64 || total_size > 1 << 16 {
        return TestResult::discard();
    }
    let plan = PartitionPlan::new(total_size, NonZeroUsize::new(workers).unwrap());
    let mut covered = vec![0u8; total_size];
    for rank in 0..workers {
        for i in plan.range(rank) {
            covered[i] += 1;
        }
    }
    TestResult::from_bool(covered.iter().all(|&c| c == 1))
}
