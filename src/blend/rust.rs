pub(super) fn blend_into(src1: &[u8], src2: &[u8], dest: &mut [u8], alpha: f64) {
    let r_alpha = 1.0 - alpha;
    for ((d, &a), &b) in dest.iter_mut().zip(src1).zip(src2) {
        // `as u8` truncates toward zero; the value cannot exceed 255.
        *d = (f64::from(a) * alpha + f64::from(b) * r_alpha) as u8;
    }
}
