pub(in crate::api::rest) mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer};

    // The calendar endpoint returns "09:30", older responses carried seconds
    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        NaiveTime::parse_from_str(&s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
            .map_err(|e| serde::de::Error::custom(format!("invalid clock time {s}: {e}")))
    }
}
