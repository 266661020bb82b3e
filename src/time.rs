// Wall clock used for result timestamps

pub fn now_unix_millis() -> i64 {
    #[cfg(miri)]
    {
        0
    }
    #[cfg(not(miri))]
    {
        chrono::Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(miri))]
    #[test]
    fn test_now_is_after_2020() {
        assert!(now_unix_millis() > 1_577_836_800_000);
    }
}
