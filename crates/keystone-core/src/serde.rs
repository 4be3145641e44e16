// Module name shadows the `serde` crate — use `::serde` for the external crate.
use ::serde::Serializer;
use chrono::{DateTime, SecondsFormat, Utc};

/// Serialize `DateTime<Utc>` as RFC 3339 with millisecond precision and a `Z` suffix.
pub fn to_rfc3339_ms<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Serialize seconds since the UNIX epoch as an RFC 3339 timestamp.
pub fn epoch_secs_to_rfc3339<S>(secs: &u64, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let secs = i64::try_from(*secs).map_err(::serde::ser::Error::custom)?;
    let dt = DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| ::serde::ser::Error::custom("timestamp out of range"))?;
    s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}
