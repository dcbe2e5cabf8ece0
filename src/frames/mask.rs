#![allow(
    clippy::cast_ptr_alignment,
    clippy::ptr_as_ptr,
    clippy::cast_possible_wrap
)]

/// XORs `payload` in place with `mask_key`, byte `i` against `mask_key[i % 4]`.
///
/// Masking is its own inverse, so the same call masks outgoing payloads and
/// unmasks received ones.
pub fn mask(payload: &mut [u8], mask_key: [u8; 4]) {
    #[cfg(all(target_arch = "x86_64", feature = "simd_masking"))]
    if is_x86_feature_detected!("avx2") {
        // SAFETY: avx2 support checked above
        unsafe { mask_avx2(payload, mask_key) };
        return;
    }

    mask_words(payload, mask_key);
}

#[cfg(all(target_arch = "x86_64", feature = "simd_masking"))]
#[target_feature(enable = "avx2")]
unsafe fn mask_avx2(payload: &mut [u8], mask_key: [u8; 4]) {
    use std::arch::x86_64::{
        __m256i, _mm256_loadu_si256, _mm256_set1_epi32, _mm256_storeu_si256, _mm256_xor_si256,
    };

    let mut blocks = payload.chunks_exact_mut(32);
    #[allow(unused_unsafe)]
    unsafe {
        let mask256 = _mm256_set1_epi32(i32::from_le_bytes(mask_key));
        for block in &mut blocks {
            let ptr = block.as_mut_ptr() as *mut __m256i;
            let data = _mm256_loadu_si256(ptr);
            _mm256_storeu_si256(ptr, _mm256_xor_si256(data, mask256));
        }
    }

    // 32 is a multiple of 4 so the tail starts on key index 0
    mask_words(blocks.into_remainder(), mask_key);
}

fn mask_words(payload: &mut [u8], mask_key: [u8; 4]) {
    let word = u32::from_ne_bytes(mask_key);
    let mut words = payload.chunks_exact_mut(4);
    for w in &mut words {
        let masked = u32::from_ne_bytes([w[0], w[1], w[2], w[3]]) ^ word;
        w.copy_from_slice(&masked.to_ne_bytes());
    }
    for (b, k) in words.into_remainder().iter_mut().zip(mask_key) {
        *b ^= k;
    }
}
