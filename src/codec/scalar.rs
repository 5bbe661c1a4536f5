//! Primitive encode/decode and the fixed textual conventions:
//!
//! - uuid: lowercase hex grouped `8-4-4-4-12`
//! - date: `YYYY-MM-DD`
//! - datetime: RFC 3339, `±HH:MM` offset on output (`Z` accepted on input),
//!   sub-seconds only when present
//! - time: `HH:MM:SS[.fff]`
//! - char: a string of exactly one character
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat};
use ordered_float::OrderedFloat;
use serde_json::Number;
use uuid::Uuid;

use crate::data::Data;
use crate::json::{is_integer_literal, Json};
use crate::ty::Prim;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Why a primitive rule refused; the session adds path and descriptor.
#[derive(Debug, PartialEq)]
pub(super) enum Reject {
    Mismatch,
    Invalid(String),
}

pub(super) fn encode(prim: Prim, value: &Data) -> Result<Json, Reject> {
    let json = match (prim, value) {
        (Prim::Null, Data::Absent) => Json::Null,
        (Prim::Bool, Data::Bool(b)) => Json::Bool(*b),
        (Prim::Int, Data::Int(i)) => Json::Number((*i).into()),
        (Prim::Float, Data::Float(f)) => Number::from_f64(f.0)
            .map(Json::Number)
            .ok_or_else(|| Reject::Invalid(format!("{} has no JSON representation", f.0)))?,
        (Prim::Decimal, Data::Decimal(n)) => Json::Number(n.clone()),
        (Prim::Text, Data::Text(s)) => Json::String(s.clone()),
        (Prim::Char, Data::Char(c)) => Json::String(c.to_string()),
        (Prim::Uuid, Data::Uuid(u)) => Json::String(u.hyphenated().to_string()),
        (Prim::Date, Data::Date(d)) => Json::String(d.format(DATE_FORMAT).to_string()),
        (Prim::DateTime, Data::DateTime(dt)) => {
            Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
        }
        (Prim::Time, Data::Time(t)) => Json::String(t.format(TIME_FORMAT).to_string()),
        _ => return Err(Reject::Mismatch),
    };
    Ok(json)
}

pub(super) fn decode(prim: Prim, node: &Json) -> Result<Data, Reject> {
    match (prim, node) {
        (Prim::Null, Json::Null) => Ok(Data::Absent),
        (Prim::Bool, Json::Bool(b)) => Ok(Data::Bool(*b)),
        (Prim::Int, Json::Number(n)) => decode_int(n),
        // integer literals are acceptable floats
        (Prim::Float, Json::Number(n)) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| Data::Float(OrderedFloat(f)))
            .ok_or_else(|| Reject::Invalid("number out of float range".into())),
        (Prim::Decimal, Json::Number(n)) => Ok(Data::Decimal(n.clone())),
        (Prim::Text, Json::String(s)) => Ok(Data::Text(s.clone())),
        (Prim::Char, Json::String(s)) => decode_char(s),
        (Prim::Uuid, Json::String(s)) => decode_uuid(s),
        (Prim::Date, Json::String(s)) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Data::Date)
            .map_err(|e| Reject::Invalid(format!("not a YYYY-MM-DD date: {e}"))),
        (Prim::DateTime, Json::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(Data::DateTime)
            .map_err(|e| Reject::Invalid(format!("not an RFC 3339 datetime with offset: {e}"))),
        (Prim::Time, Json::String(s)) => NaiveTime::parse_from_str(s, TIME_FORMAT)
            .map(Data::Time)
            .map_err(|e| Reject::Invalid(format!("not an HH:MM:SS time: {e}"))),
        _ => Err(Reject::Mismatch),
    }
}

fn decode_int(n: &Number) -> Result<Data, Reject> {
    if !is_integer_literal(n) {
        return Err(Reject::Mismatch);
    }
    n.as_i64()
        .map(Data::Int)
        .ok_or_else(|| Reject::Invalid("integer does not fit in 64 bits".into()))
}

fn decode_char(s: &str) -> Result<Data, Reject> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Data::Char(c)),
        _ => Err(Reject::Invalid(format!(
            "char must be a string of length 1, found length {}",
            s.chars().count()
        ))),
    }
}

fn decode_uuid(s: &str) -> Result<Data, Reject> {
    let uuid = Uuid::try_parse(s).map_err(|e| Reject::Invalid(format!("not a uuid: {e}")))?;
    if uuid.hyphenated().to_string() != s {
        return Err(Reject::Invalid("uuid must be lowercase and hyphenated 8-4-4-4-12".into()));
    }
    Ok(Data::Uuid(uuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;

    fn ok(prim: Prim, value: Data, expected: Json) {
        assert_eq!(encode(prim, &value), Ok(expected.clone()));
        assert_eq!(decode(prim, &expected), Ok(value));
    }

    #[test]
    fn plain_scalars() {
        ok(Prim::Int, Data::Int(3), json!(3));
        ok(Prim::Float, Data::float(1.23), json!(1.23));
        ok(Prim::Text, Data::text("bla"), json!("bla"));
        ok(Prim::Bool, Data::Bool(true), json!(true));
        ok(Prim::Null, Data::Absent, json!(null));
        ok(Prim::Char, Data::Char('x'), json!("x"));
    }

    #[test]
    fn no_implicit_coercions() {
        assert_eq!(encode(Prim::Int, &Data::Bool(true)), Err(Reject::Mismatch));
        assert_eq!(encode(Prim::Int, &Data::text("3")), Err(Reject::Mismatch));
        assert_eq!(encode(Prim::Text, &Data::Absent), Err(Reject::Mismatch));
        assert_eq!(decode(Prim::Int, &json!(true)), Err(Reject::Mismatch));
        assert_eq!(decode(Prim::Int, &json!("3")), Err(Reject::Mismatch));
        assert_eq!(decode(Prim::Int, &json!(1.5)), Err(Reject::Mismatch));
        assert_eq!(decode(Prim::Text, &json!(null)), Err(Reject::Mismatch));
        assert_eq!(decode(Prim::Null, &json!("bla")), Err(Reject::Mismatch));
    }

    #[test]
    fn float_accepts_integer_literals() {
        assert_eq!(decode(Prim::Float, &json!(1)), Ok(Data::float(1.0)));
        assert!(matches!(encode(Prim::Float, &Data::float(f64::NAN)), Err(Reject::Invalid(_))));
    }

    #[test]
    fn oversized_integers_are_invalid_not_mismatched() {
        let big: Json = serde_json::from_str("123456789012345678901234567890").unwrap();
        assert!(matches!(decode(Prim::Int, &big), Err(Reject::Invalid(_))));
    }

    #[test]
    fn decimal_preserves_precision() {
        let node: Json = serde_json::from_str("0.1000000000000000055511151231257827").unwrap();
        let data = decode(Prim::Decimal, &node).unwrap();
        assert_eq!(encode(Prim::Decimal, &data), Ok(node));
        assert_eq!(decode(Prim::Decimal, &json!(7)), Ok(Data::decimal("7").unwrap()));
    }

    #[test]
    fn char_length_is_checked() {
        assert!(matches!(decode(Prim::Char, &json!("xy")), Err(Reject::Invalid(_))));
        assert!(matches!(decode(Prim::Char, &json!("")), Err(Reject::Invalid(_))));
        assert_eq!(decode(Prim::Char, &json!("é")), Ok(Data::Char('é')));
    }

    #[test]
    fn uuid_is_lowercase_hyphenated() {
        let text = "bd65600d-8669-4903-8a14-af88203add38";
        ok(Prim::Uuid, Data::Uuid(Uuid::parse_str(text).unwrap()), json!(text));
        assert!(matches!(decode(Prim::Uuid, &json!(text.to_uppercase())), Err(Reject::Invalid(_))));
        assert!(matches!(
            decode(Prim::Uuid, &json!("bd65600d866949038a14af88203add38")),
            Err(Reject::Invalid(_))
        ));
        assert!(matches!(decode(Prim::Uuid, &json!("bd65600d")), Err(Reject::Invalid(_))));
    }

    #[test]
    fn dates_and_times() {
        ok(Prim::Date, Data::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()), json!("2020-01-01"));
        ok(Prim::Time, Data::Time(NaiveTime::from_hms_opt(17, 45, 55).unwrap()), json!("17:45:55"));
        ok(
            Prim::Time,
            Data::Time(NaiveTime::from_hms_micro_opt(17, 45, 55, 123456).unwrap()),
            json!("17:45:55.123456"),
        );
        assert!(matches!(decode(Prim::Date, &json!("2020-13-01")), Err(Reject::Invalid(_))));
        assert_eq!(decode(Prim::Date, &json!(3)), Err(Reject::Mismatch));
    }

    #[test]
    fn datetimes_keep_offset_and_subseconds() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let plain = utc.with_ymd_and_hms(2020, 1, 1, 17, 45, 55).unwrap();
        ok(Prim::DateTime, Data::DateTime(plain), json!("2020-01-01T17:45:55+00:00"));

        let micros = utc.with_ymd_and_hms(2022, 7, 12, 14, 43, 53).unwrap()
            + chrono::Duration::microseconds(123456);
        ok(Prim::DateTime, Data::DateTime(micros), json!("2022-07-12T14:43:53.123456+00:00"));

        let zulu = decode(Prim::DateTime, &json!("2020-01-01T17:45:55Z")).unwrap();
        assert_eq!(zulu, Data::DateTime(plain));
        assert!(matches!(decode(Prim::DateTime, &json!("2022-07-12")), Err(Reject::Invalid(_))));
    }
}
