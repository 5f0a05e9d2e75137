use snowflake::SnowflakeIdBucket;
use std::sync::Mutex;

static ID_GENERATOR: Mutex<Option<SnowflakeIdBucket>> = Mutex::new(None);

/// Initializes the Snowflake ID generator for this process.
///
/// `machine_id` and `node_id` are both in the 0-31 range. Call once at
/// startup; [`next_id`] falls back to `(1, 1)` if never initialized.
pub fn init(machine_id: i32, node_id: i32) {
    let mut generator = ID_GENERATOR.lock().unwrap();
    *generator = Some(SnowflakeIdBucket::new(machine_id, node_id));
}

/// Returns a fresh Snowflake ID as a decimal string.
pub fn next_id() -> String {
    let mut generator = ID_GENERATOR.lock().unwrap();
    let bucket = generator.get_or_insert_with(|| SnowflakeIdBucket::new(1, 1));
    bucket.get_id().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        init(1, 1);
        let mut seen = HashSet::new();
        for _ in 0..500 {
            assert!(seen.insert(next_id()));
        }
    }

    #[test]
    fn ids_parse_as_i64() {
        init(1, 1);
        assert!(next_id().parse::<i64>().is_ok());
    }
}
