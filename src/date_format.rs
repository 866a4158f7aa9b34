//! Serde helper for timestamp columns. Renders timestamps as plain
//! text so normalized records stay JSON-representable.

use chrono::NaiveDateTime;
use serde::{self, Deserialize, Deserializer, Serializer};

const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn serialize<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.format(FORMAT).to_string())
}

pub fn deserialize<'d, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'d>,
{
    let s = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Stamped {
        #[serde(with = "super")]
        date: chrono::NaiveDateTime,
    }

    #[test]
    fn round_trip() {
        let stamped = Stamped {
            date: NaiveDate::from_ymd(2021, 3, 14).and_hms(9, 26, 53),
        };
        let json = serde_json::to_string(&stamped).unwrap();
        assert_eq!(json, r#"{"date":"2021-03-14 09:26:53"}"#);
        assert_eq!(serde_json::from_str::<Stamped>(&json).unwrap(), stamped);
    }
}
