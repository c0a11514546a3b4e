use mediasort_common::{BitHash, CoreError, CoreResult};

/// Turns a decoded `resolution x resolution` grayscale frame into a
/// [`BitHash`] of `resolution^2` bits (spec.md §4.2).
///
/// Bit `i` is `1` iff `samples[i] >= mean(samples)`. This is the
/// simplest possible perceptual hash — mean-threshold, not the teacher's
/// 3D-DCT (`vid_dup_finder_lib::video_hashing::dct_3d`) — because
/// spec.md §4.2 specifies mean-brightness thresholding directly; the DCT
/// step is a teacher implementation detail this spec does not carry
/// forward (frequency-domain energy compaction bought the teacher
/// robustness to small time offsets across video frames, which the DTW
/// sequence alignment in `similarity.rs` now supplies instead).
///
/// Pure function: no I/O, no panics on well-formed input.
pub fn hash_frame(samples: &[u8], resolution: u32) -> CoreResult<BitHash> {
    let expected_len = (resolution as usize) * (resolution as usize);
    if samples.is_empty() || samples.len() != expected_len {
        return Err(CoreError::EmptyFrames);
    }

    let mean = mean_brightness(samples);
    Ok(BitHash::from_bits(expected_len, |i| {
        f64::from(samples[i]) >= mean
    }))
}

fn mean_brightness(samples: &[u8]) -> f64 {
    let sum: u64 = samples.iter().map(|&b| u64::from(b)).sum();
    sum as f64 / samples.len() as f64
}
