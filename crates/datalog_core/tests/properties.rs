//! Property tests for append, rollover and backward reads.

use datalog_core::{Config, DataLogger, PaddingPolicy};
use proptest::prelude::*;

/// 4-byte records, 8 per segment, 4 segments retained.
fn config() -> Config {
    Config::new()
        .max_segment_size(32)
        .max_log_set_size(128)
        .max_record_size(8)
}

const PER_SEGMENT: usize = 8;
const RETENTION: usize = 4;

fn logger_with(values: &[i32]) -> DataLogger {
    let logger = DataLogger::in_memory(config()).unwrap();
    logger.register("prop", 4).unwrap();
    for v in values {
        logger.append("prop", &v.to_le_bytes()).unwrap();
    }
    logger
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn reads_back_newest_suffix_in_reverse(values in prop::collection::vec(any::<i32>(), 1..120)) {
        let logger = logger_with(&values);
        let read: Vec<i32> = logger
            .read_latest("prop", values.len() + 10)
            .unwrap()
            .into_iter()
            .map(|r| i32::from_le_bytes([r[0], r[1], r[2], r[3]]))
            .collect();

        let expected: Vec<i32> = values.iter().rev().take(read.len()).copied().collect();
        prop_assert_eq!(&read, &expected);

        // Full segments behind the head are always retained.
        let floor = values.len().min((RETENTION - 1) * PER_SEGMENT + 1);
        prop_assert!(read.len() >= floor, "read {} of {}", read.len(), values.len());
        if values.len() <= RETENTION * PER_SEGMENT {
            prop_assert_eq!(read.len(), values.len());
        }
    }

    #[test]
    fn retained_segments_never_exceed_retention(count in 1usize..200) {
        let values: Vec<i32> = (0..count as i32).collect();
        let logger = logger_with(&values);

        let stats = logger.stats("prop").unwrap();
        prop_assert!(stats.segments <= RETENTION);
        prop_assert_eq!(stats.segments, count.div_ceil(PER_SEGMENT).min(RETENTION));
        prop_assert_eq!(stats.bytes_on_disk, stats.records * 4);
    }

    #[test]
    fn primed_and_direct_reads_agree(
        values in prop::collection::vec(any::<i32>(), 1..=32),
        count in 1usize..80,
    ) {
        let logger = logger_with(&values);
        let direct = logger.read_latest("prop", count).unwrap().concat();

        let needed = logger.prime_read("prop", count).unwrap();
        let mut buffer = vec![0u8; needed];
        let outcome = logger.perform_read(&mut buffer).unwrap();

        prop_assert_eq!(outcome.filled, count.min(values.len()));
        prop_assert_eq!(&buffer[..outcome.bytes_filled()], direct.as_slice());
    }

    #[test]
    fn short_records_padded_by_policy(data in prop::collection::vec(any::<u8>(), 1..=8), zero in any::<bool>()) {
        let policy = if zero { PaddingPolicy::Zero } else { PaddingPolicy::RepeatLastByte };
        let logger = DataLogger::in_memory(config().padding(policy)).unwrap();
        logger.register("pad", 8).unwrap();
        logger.append("pad", &data).unwrap();

        let record = logger.read_latest("pad", 1).unwrap().remove(0);
        prop_assert_eq!(record.len(), 8);
        prop_assert_eq!(&record[..data.len()], data.as_slice());
        let fill = if zero { 0 } else { data[data.len() - 1] };
        prop_assert!(record[data.len()..].iter().all(|&b| b == fill));
    }
}
