#![allow(clippy::undocumented_unsafe_blocks)]

use std::arch::x86_64::*;

/// AVX2 path for the blend kernel. Arithmetic is done in f64 lanes with a
/// truncating conversion, so the output is bit-identical to the scalar
/// path for every input.
#[target_feature(enable = "avx2")]
pub(super) fn blend_into(src1: &[u8], src2: &[u8], dest: &mut [u8], alpha: f64) {
    let v_alpha = _mm256_set1_pd(alpha);
    let v_r_alpha = _mm256_set1_pd(1.0 - alpha);

    let len = dest.len();
    let mut i = 0;
    while i + 4 <= len {
        unsafe {
            let a = widen4(src1.as_ptr().add(i));
            let b = widen4(src2.as_ptr().add(i));
            // mul + mul + add, not fmadd: keeps rounding identical to the
            // scalar kernel
            let blended = _mm256_add_pd(_mm256_mul_pd(a, v_alpha), _mm256_mul_pd(b, v_r_alpha));
            // cvttpd truncates toward zero, same as the scalar `as u8` cast
            narrow4(dest.as_mut_ptr().add(i), _mm256_cvttpd_epi32(blended));
        }
        i += 4;
    }

    super::rust::blend_into(&src1[i..], &src2[i..], &mut dest[i..], alpha);
}

/// Loads 4 bytes and widens them to 4 f64 lanes.
#[target_feature(enable = "avx2")]
unsafe fn widen4(ptr: *const u8) -> __m256d {
    let packed = ptr.cast::<u32>().read_unaligned();
    let bytes = _mm_cvtsi32_si128(packed as i32);
    _mm256_cvtepi32_pd(_mm_cvtepu8_epi32(bytes))
}

/// Narrows 4 i32 lanes (each in `[0, 255]`) back to 4 bytes.
#[target_feature(enable = "avx2")]
unsafe fn narrow4(ptr: *mut u8, ints: __m128i) {
    let mask = _mm_set_epi8(-1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 12, 8, 4, 0);
    let packed = _mm_cvtsi128_si32(_mm_shuffle_epi8(ints, mask)) as u32;
    ptr.cast::<u32>().write_unaligned(packed);
}
