#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::num::NonZeroUsize;

use super::*;

fn nz(v: usize) -> NonZeroUsize {
    NonZeroUsize::new(v).unwrap()
}

#[test]
fn resize_to_same_dimensions_is_identity() {
    let img = ImageBuffer::from_pixels(nz(4), nz(4), nz(3), (0..48).collect()).unwrap();
    let resized = resize(&img, nz(4), nz(4)).unwrap();
    assert_eq!(resized, img);
}

#[test]
fn resize_changes_dimensions_and_buffer_together() {
    let img = ImageBuffer::from_pixels(nz(8), nz(8), nz(3), vec![120; 192]).unwrap();
    let resized = resize(&img, nz(4), nz(2)).unwrap();
    assert_eq!(resized.width().get(), 4);
    assert_eq!(resized.height().get(), 2);
    assert_eq!(resized.channels().get(), 3);
    assert_eq!(resized.size(), 4 * 2 * 3);
}

#[test]
fn resize_of_constant_image_stays_constant() {
    // A bilinear filter cannot introduce new values into a flat image.
    let img = ImageBuffer::from_pixels(nz(6), nz(6), nz(1), vec![77; 36]).unwrap();
    let resized = resize(&img, nz(3), nz(3)).unwrap();
    assert!(resized.pixels().iter().all(|&p| p == 77));
}

#[test]
fn resize_preserves_channel_count() {
    for channels in [1usize, 3, 4] {
        let img =
            ImageBuffer::from_pixels(nz(5), nz(5), nz(channels), vec![9; 25 * channels]).unwrap();
        let resized = resize(&img, nz(2), nz(7)).unwrap();
        assert_eq!(resized.channels().get(), channels);
        assert_eq!(resized.size(), 2 * 7 * channels);
    }
}

#[test]
fn to_rgb_expands_grayscale() {
    let img = ImageBuffer::from_pixels(nz(2), nz(2), nz(1), vec![10, 20, 30, 40]).unwrap();
    let rgb = to_rgb(&img).unwrap();
    assert_eq!(rgb.channels().get(), 3);
    assert_eq!(rgb.pixels()[..3], [10, 10, 10]);
}

#[test]
fn to_rgb_drops_alpha() {
    let img = ImageBuffer::from_pixels(nz(1), nz(1), nz(4), vec![1, 2, 3, 255]).unwrap();
    let rgb = to_rgb(&img).unwrap();
    assert_eq!(rgb.channels().get(), 3);
    assert_eq!(rgb.pixels(), &[1, 2, 3]);
}

#[test]
fn dynamic_round_trip_preserves_pixels() {
    for channels in [1usize, 3, 4] {
        let pixels: Vec<u8> = (0..(6 * channels) as u8).collect();
        let img = ImageBuffer::from_pixels(nz(3), nz(2), nz(channels), pixels).unwrap();
        let round_tripped = from_dynamic(to_dynamic(&img).unwrap()).unwrap();
        assert_eq!(round_tripped, img);
    }
}

#[test]
fn load_missing_file_is_a_load_error() {
    let err = load_image(std::path::Path::new("/nonexistent/morph-input.png")).unwrap_err();
    assert!(matches!(err, MorphError::Load { .. }));
}
