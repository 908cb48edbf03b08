use super::*;
use time::OffsetDateTime;

#[test]
fn numeric_values_have_scores() {
    assert_eq!(Value::Int(30).score(), Some(30.0));
    assert_eq!(Value::Uint(7).score(), Some(7.0));
    assert_eq!(Value::Float(2.5).score(), Some(2.5));
    assert_eq!(Value::from("30").score(), None);
}

#[test]
fn temporal_values_are_not_numeric() {
    let ts = Value::from(OffsetDateTime::UNIX_EPOCH);

    assert_eq!(ts.kind(), Some(PropertyKind::Temporal));
    assert!(!ts.is_numeric());
    assert_eq!(ts.score(), None);
}

#[test]
fn stringify_keeps_float_fraction_distinct_from_int() {
    assert_eq!(Value::Int(30).stringify().unwrap(), "30");
    assert_eq!(Value::Float(30.0).stringify().unwrap(), "30.0");
    assert_eq!(Value::Float(0.1).stringify().unwrap(), "0.1");
}

#[test]
fn stringify_timestamp_is_rfc3339_utc() {
    let ts = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();

    assert_eq!(
        Value::Timestamp(ts).stringify().unwrap(),
        "2023-11-14T22:13:20Z"
    );
}

#[test]
fn stringify_rejects_values_without_text_form() {
    assert!(matches!(
        Value::Float(f64::NAN).stringify(),
        Err(ValueRenderError::NonFinite(_))
    ));
    assert!(matches!(
        Value::Blob(vec![1, 2, 3]).stringify(),
        Err(ValueRenderError::Binary { len: 3 })
    ));
    assert!(matches!(Value::Null.stringify(), Err(ValueRenderError::Null)));
}

#[test]
fn render_errors_become_configuration_errors() {
    let err: InternalError = Value::Blob(vec![0]).stringify().unwrap_err().into();

    assert_eq!(err.class, crate::error::ErrorClass::Configuration);
    assert_eq!(err.origin, crate::error::ErrorOrigin::Codec);
}

#[test]
fn option_none_is_null() {
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some(4_i64)), Value::Int(4));
}
