//! 激光器协议属性测试

use proptest::prelude::*;
use tct_laser::protocol::{
    LaserCommand, frequency_packet, frequency_word, intensity_sequence, validate_intensity,
    word_frequency,
};

proptest! {
    #[test]
    fn test_frequency_word_fits_in_u16(hz in 50.0f64..=100_000.0) {
        let word = frequency_word(hz).unwrap();
        let packet = frequency_packet(hz).unwrap();
        prop_assert_eq!(packet.len(), 3);
        prop_assert_eq!(packet[0], u8::from(LaserCommand::SetFrequency));
        prop_assert_eq!(u16::from_le_bytes([packet[1], packet[2]]), word);
    }

    #[test]
    fn test_frequency_word_close_to_request(hz in 50.0f64..=100_000.0) {
        let word = frequency_word(hz).unwrap();
        // 量化误差不超过半个字
        let lo = word_frequency(word.saturating_add(1));
        let hi = if word == 0 { f64::INFINITY } else { word_frequency(word - 1) };
        prop_assert!(lo <= hz && hz <= hi);
    }

    #[test]
    fn test_out_of_range_frequency_rejected(hz in prop_oneof![0.0f64..50.0, 100_000.0001f64..1e9]) {
        prop_assert!(frequency_word(hz).unwrap_err().is_validation());
    }

    #[test]
    fn test_intensity_sequence_order(code in 0i64..1024) {
        let code = validate_intensity(code).unwrap();
        let [lo, hi] = code.to_le_bytes();
        prop_assert_eq!(
            intensity_sequence(code),
            vec![vec![90], vec![4], vec![92], vec![94, lo, hi], vec![91]]
        );
    }
}
