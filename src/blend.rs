#[cfg(target_arch = "x86_64")]
mod avx2;
mod rust;


use cfg_if::cfg_if;

#[cfg(target_arch = "x86_64")]
cpufeatures::new!(cpuid_avx2, "avx2");

#[cfg(target_arch = "x86_64")]
pub(crate) use cpuid_avx2::get as has_avx2;

/// Alpha-composites two equal-length byte slices into `dest`.
///
/// For every index `i`, `dest[i] = trunc(src1[i] * alpha + src2[i] *
/// (1 - alpha))`, computed in f64 and truncated toward zero, matching
/// unsigned 8-bit sample semantics. Both inputs are already in `[0, 255]`
/// and alpha is in `[0, 1]`, so the result never needs explicit clamping.
///
/// Element-wise with no cross-element dependency, so any internal
/// vectorization is invisible to callers.
///
/// # Panics
/// Panics if the three slices do not have the same length.
pub fn blend_into(src1: &[u8], src2: &[u8], dest: &mut [u8], alpha: f64) {
    assert_eq!(src1.len(), src2.len());
    assert_eq!(src1.len(), dest.len());

    cfg_if! {
        if #[cfg(all(target_arch = "x86_64", not(feature = "no_simd")))] {
            if has_avx2() {
                // SAFETY: We check for AVX2 first
                unsafe {
                    avx2::blend_into(src1, src2, dest, alpha);
                }
                return;
            }
        }
    }

    rust::blend_into(src1, src2, dest, alpha);
}

/// Allocating wrapper around [`blend_into`].
#[must_use]
pub fn blend(src1: &[u8], src2: &[u8], alpha: f64) -> Vec<u8> {
    let mut dest = vec![0; src1.len()];
    blend_into(src1, src2, &mut dest, alpha);
    dest
}
