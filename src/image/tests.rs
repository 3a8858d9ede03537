#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::num::NonZeroUsize;

use super::*;

fn nz(v: usize) -> NonZeroUsize {
    NonZeroUsize::new(v).unwrap()
}

#[test]
fn new_is_zero_filled_with_exact_size() {
    let img = ImageBuffer::new(nz(4), nz(3), nz(3));
    assert_eq!(img.size(), 36);
    assert!(img.pixels().iter().all(|&p| p == 0));
}

#[test]
fn from_pixels_accepts_matching_buffer() {
    let img = ImageBuffer::from_pixels(nz(2), nz(2), nz(3), vec![7; 12]).unwrap();
    assert_eq!(img.size(), 12);
    assert_eq!(img.width().get(), 2);
    assert_eq!(img.channels().get(), 3);
}

#[test]
fn from_pixels_rejects_short_buffer() {
    let err = ImageBuffer::from_pixels(nz(2), nz(2), nz(3), vec![0; 11]).unwrap_err();
    assert!(matches!(
        err,
        MorphError::BufferSizeMismatch {
            expected: 12,
            actual: 11
        }
    ));
}

#[test]
fn from_pixels_rejects_long_buffer() {
    let err = ImageBuffer::from_pixels(nz(1), nz(1), nz(1), vec![0; 2]).unwrap_err();
    assert!(matches!(err, MorphError::BufferSizeMismatch { .. }));
}

#[test]
fn same_shape_requires_all_three_dimensions() {
    let a = ImageBuffer::new(nz(3), nz(3), nz(3));
    assert!(a.same_shape(&ImageBuffer::new(nz(3), nz(3), nz(3))));
    assert!(!a.same_shape(&ImageBuffer::new(nz(4), nz(3), nz(3))));
    assert!(!a.same_shape(&ImageBuffer::new(nz(3), nz(4), nz(3))));
    assert!(!a.same_shape(&ImageBuffer::new(nz(3), nz(3), nz(4))));
}

#[test]
fn into_pixels_round_trips() {
    let pixels: Vec<u8> = (0..24).collect();
    let img = ImageBuffer::from_pixels(nz(4), nz(2), nz(3), pixels.clone()).unwrap();
    assert_eq!(img.into_pixels(), pixels);
}
