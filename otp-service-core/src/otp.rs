//! Six-digit one-time codes drawn from the operating system RNG.
//!
//! Three random bytes give a value in `0..2^24`. Values at or above
//! [`REJECTION_THRESHOLD`] (the largest multiple of one million below 2^24)
//! are redrawn so that the final `% 1_000_000` is unbiased.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CoreError, Result};

pub const CODE_SPACE: u32 = 1_000_000;
pub const REJECTION_THRESHOLD: u32 = 16_000_000;
pub const CODE_LENGTH: usize = 6;

/// Maps a 24-bit sample to a code, or `None` when the sample must be redrawn.
pub fn code_from_sample(sample: u32) -> Option<String> {
    if sample >= REJECTION_THRESHOLD {
        return None;
    }
    Some(format!("{:06}", sample % CODE_SPACE))
}

pub fn sample_from_bytes(bytes: [u8; 3]) -> u32 {
    u32::from(bytes[0]) << 16 | u32::from(bytes[1]) << 8 | u32::from(bytes[2])
}

/// Generates a uniformly distributed code in `000000..=999999`.
pub fn generate_code() -> Result<String> {
    generate_code_with(&mut OsRng)
}

pub fn generate_code_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<String> {
    let mut buf = [0u8; 3];
    loop {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| CoreError::Randomness(e.to_string()))?;
        if let Some(code) = code_from_sample(sample_from_bytes(buf)) {
            return Ok(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::mock::StepRng;
    use rstest::rstest;

    #[rstest]
    #[case(0, Some("000000"))]
    #[case(42, Some("000042"))]
    #[case(999_999, Some("999999"))]
    #[case(1_000_000, Some("000000"))]
    #[case(15_999_999, Some("999999"))]
    #[case(16_000_000, None)]
    #[case(16_777_215, None)]
    fn sample_mapping(#[case] sample: u32, #[case] expected: Option<&str>) {
        assert_eq!(code_from_sample(sample).as_deref(), expected);
    }

    #[test]
    fn bytes_are_big_endian() {
        assert_eq!(sample_from_bytes([0x01, 0x02, 0x03]), 0x010203);
        assert_eq!(sample_from_bytes([0xff, 0xff, 0xff]), 16_777_215);
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..1_000 {
            let code = generate_code().unwrap();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn leading_zeros_show_up_over_many_draws() {
        let with_leading_zero = (0..20_000)
            .filter(|_| generate_code().unwrap().starts_with('0'))
            .count();
        // Expected around 2000 (10%).
        assert!(with_leading_zero > 1_000, "got {}", with_leading_zero);
    }

    #[test]
    fn rejected_samples_are_redrawn() {
        // StepRng yields 0xffffffff... first (rejected), then wraps to small values.
        let mut rng = StepRng::new(u64::MAX, 1);
        let code = generate_code_with(&mut rng).unwrap();
        assert_eq!(code.len(), 6);
    }

    proptest! {
        #[test]
        fn accepted_samples_map_into_code_space(sample in 0u32..REJECTION_THRESHOLD) {
            let code = code_from_sample(sample).unwrap();
            prop_assert_eq!(code.len(), 6);
            prop_assert_eq!(code.parse::<u32>().unwrap(), sample % CODE_SPACE);
        }

        #[test]
        fn samples_above_threshold_are_rejected(sample in REJECTION_THRESHOLD..(1u32 << 24)) {
            prop_assert!(code_from_sample(sample).is_none());
        }
    }
}
