//! Typed conversion and output rendering through the router.

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rstest::rstest;
use ruta::{
    ColorMode, DispatchError, FromStrConverter, Json, JsonStyle, Output, Params, RouteEnum,
    Router, Settings, TypeConverter, Value,
};
use std::net::IpAddr;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

fn args(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}

fn quiet() -> Settings {
    Settings {
        color: ColorMode::Never,
        ..Default::default()
    }
}

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, RouteEnum)]
#[ruta(alias = "env")]
enum Environment {
    Dev,
    Staging,
    #[ruta(name = "prod")]
    Production,
}

async fn deploy(params: Params) -> String {
    match params.get::<Environment>("target") {
        Some(env) => format!("{:?}", env),
        None => "none".to_string(),
    }
}

#[test]
fn test_derived_route_enum() {
    assert_eq!(Environment::TYPE_NAME, "Environment");
    assert_eq!(Environment::ALIAS, Some("env"));
    assert_eq!(Environment::variants(), &["Dev", "Staging", "prod"]);
    assert_eq!(Environment::from_variant("prod"), Some(Environment::Production));
    assert_eq!(Environment::from_variant("Production"), None);
    assert_eq!(Environment::Staging.variant(), "Staging");
}

#[rstest]
#[case("deploy dev", "Dev")]
#[case("deploy STAGING", "Staging")]
#[case("deploy Prod", "Production")]
#[tokio::test]
async fn test_enum_members_match_case_insensitively(#[case] line: &str, #[case] expected: &str) {
    let router: Router = Router::new()
        .enum_type::<Environment>()
        .route("deploy {target:env}", deploy);

    let response = router.dispatch(args(line)).await.unwrap();
    assert_eq!(response.output, Output::Text(expected.into()));
}

#[tokio::test]
async fn test_enum_by_type_name() {
    let router: Router = Router::new()
        .enum_type::<Environment>()
        .route("deploy {target:Environment}", deploy);

    let response = router.dispatch(args("deploy dev")).await.unwrap();
    assert_eq!(response.output, Output::Text("Dev".into()));
}

#[tokio::test]
async fn test_enum_failure_lists_valid_values() {
    let router: Router = Router::new()
        .enum_type::<Environment>()
        .route("deploy {target:env}", deploy)
        .settings(quiet());

    let response = router.execute_with(args("deploy qa")).await;
    assert_eq!(response.exit_code, 1);
    assert_eq!(
        response.output.to_string(),
        "Error: Invalid argument 'target'\n\ncannot convert 'qa' to Environment\n\nValid values: Dev, Staging, prod"
    );
}

// ============================================================================
// Custom converters
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Rgb(u8, u8, u8);

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').ok_or("missing '#'")?;
        if hex.len() != 6 {
            return Err(format!("expected 6 hex digits, got {}", hex.len()));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

async fn paint(params: Params) -> String {
    let colors: Vec<String> = params
        .value("c")
        .and_then(Value::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(Value::downcast::<Rgb>)
        .map(|Rgb(r, g, b)| format!("{},{},{}", r, g, b))
        .collect();
    colors.join(" ")
}

#[tokio::test]
async fn test_from_str_converter_by_alias() {
    let router: Router = Router::new()
        .converter(FromStrConverter::<Rgb>::new().with_alias("color"))
        .route("paint {*c:color}", paint);

    let response = router.dispatch(args("paint #ff0000 #00ff80")).await.unwrap();
    assert_eq!(response.output, Output::Text("255,0,0 0,255,128".into()));
}

#[tokio::test]
async fn test_catch_all_failure_names_element() {
    let router: Router = Router::new()
        .converter(FromStrConverter::<Rgb>::new().with_alias("color"))
        .route("paint {*c:color}", paint);

    let err = router.dispatch(args("paint #ff0000 red")).await.unwrap_err();
    assert_matches!(
        &err,
        DispatchError::Conversion(failure) if failure.element == Some(1) && failure.raw == "red"
    );
    assert_eq!(
        err.to_string(),
        "Error: Invalid argument 'c'\n\ncannot convert 'red' to color (element 1)"
    );
}

#[derive(Debug, Clone)]
struct Email(String);

struct EmailConverter;

impl TypeConverter for EmailConverter {
    fn target_type(&self) -> &str {
        "mail::Email"
    }

    fn try_convert(&self, raw: &str) -> Option<Value> {
        raw.contains('@').then(|| Value::custom(Email(raw.to_string()), raw))
    }
}

struct Exploding;

impl TypeConverter for Exploding {
    fn target_type(&self) -> &str {
        "Exploding"
    }

    fn try_convert(&self, _raw: &str) -> Option<Value> {
        panic!("converter bug")
    }
}

#[tokio::test]
async fn test_custom_converter_by_simple_name() {
    async fn send(params: Params) -> String {
        params
            .custom::<Email>("to")
            .map(|email| email.0)
            .unwrap_or_default()
    }

    let router: Router = Router::new()
        .converter(EmailConverter)
        .route("send {to:Email}", send)
        .settings(quiet());

    let response = router.dispatch(args("send ada@example.org")).await.unwrap();
    assert_eq!(response.output, Output::Text("ada@example.org".into()));

    let err = router.dispatch(args("send nobody")).await.unwrap_err();
    assert_matches!(err, DispatchError::Conversion(failure) if failure.name == "to");
}

#[tokio::test]
async fn test_panicking_converter_is_a_failure() {
    let router: Router = Router::new()
        .converter(Exploding)
        .route("boom {x:Exploding}", || async {});

    assert_matches!(
        router.dispatch(args("boom now")).await,
        Err(DispatchError::Conversion(failure)) if failure.name == "x"
    );
}

#[tokio::test]
async fn test_unknown_type_alias() {
    let router: Router = Router::new().route("wait {d:fortnight}", || async {});
    assert_eq!(router.unknown_types(), vec!["fortnight"]);

    let err = router.dispatch(args("wait 2")).await.unwrap_err();
    assert_matches!(&err, DispatchError::Conversion(failure) if failure.unknown_type);
    assert_eq!(
        err.to_string(),
        "Error: Invalid argument 'd'\n\nunknown type 'fortnight' for value '2'"
    );
}

#[test]
fn test_invalid_default_is_reported_before_dispatch() {
    let router: Router = Router::new()
        .enum_type::<Environment>()
        .route("deploy --to {target:env=qa}", deploy)
        .route("serve --port {p:int=8080}", || async {});

    let invalid = router.invalid_defaults();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].name, "target");
    assert_eq!(
        invalid[0].reason(),
        "cannot convert 'qa' to Environment\n\nValid values: Dev, Staging, prod"
    );
}

// ============================================================================
// Round-trips
// ============================================================================

async fn echo_value(params: Params) -> Value {
    params.value("v").cloned().unwrap_or(Value::Null)
}

#[rstest]
#[case("int", "-42")]
#[case("long", "9000000000")]
#[case("byte", "255")]
#[case("double", "2.5")]
#[case("bool", "true")]
#[case("char", "x")]
#[case("guid", "67e55044-10b1-426f-9247-bb680e5fe0c8")]
#[case("date", "2024-03-09")]
#[case("time", "08:05:30")]
#[case("datetime", "2024-03-09T08:05:30")]
#[case("timespan", "01:30:00")]
#[case("timespan", "2.04:00:00")]
#[case("timespan", "-00:00:05")]
#[tokio::test]
async fn test_builtin_text_round_trip(#[case] alias: &str, #[case] text: &str) {
    let router: Router = Router::new().route(format!("echo {{v:{}}}", alias), echo_value);

    let response = router.dispatch(["echo", text]).await.unwrap();
    assert_eq!(response.output, Output::Text(text.into()));
}

#[rstest]
#[case("int", "12abc")]
#[case("byte", "256")]
#[case("bool", "yes please")]
#[case("guid", "not-a-guid")]
#[case("date", "2024-13-01")]
#[case("uri", "not a url")]
#[case("ip", "300.1.1.1")]
#[tokio::test]
async fn test_builtin_parse_failures(#[case] alias: &str, #[case] text: &str) {
    let router: Router = Router::new().route(format!("echo {{v:{}}}", alias), echo_value);

    assert_matches!(
        router.dispatch(["echo", text]).await,
        Err(DispatchError::Conversion(failure)) if failure.raw == text
    );
}

// ============================================================================
// Output rendering
// ============================================================================

#[tokio::test]
async fn test_output_strategy_table() {
    #[derive(Debug, serde::Serialize)]
    struct Status {
        healthy: bool,
        jobs: u32,
    }

    let router: Router = Router::new()
        .route("unit", || async {})
        .route("text", || async { "hello" })
        .route("number", || async { 42u64 })
        .route("flag", || async { false })
        .route("uuid", || async {
            Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap()
        })
        .route("date", || async { NaiveDate::from_ymd_opt(2024, 3, 9).unwrap() })
        .route("datetime", || async {
            NaiveDateTime::new(
                NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
                NaiveTime::from_hms_opt(8, 5, 0).unwrap(),
            )
        })
        .route("duration", || async { TimeDelta::try_milliseconds(90_061_500).unwrap() })
        .route("url", || async { Url::parse("https://example.org/a").unwrap() })
        .route("ip", || async { "127.0.0.1".parse::<IpAddr>().unwrap() })
        .route("json", || async { Json(Status { healthy: true, jobs: 3 }) });

    let expect = [
        ("unit", Output::Silent),
        ("text", Output::Text("hello".into())),
        ("number", Output::Text("42".into())),
        ("flag", Output::Text("false".into())),
        ("uuid", Output::Text("67e55044-10b1-426f-9247-bb680e5fe0c8".into())),
        ("date", Output::Text("2024-03-09".into())),
        ("datetime", Output::Text("2024-03-09T08:05:00".into())),
        ("duration", Output::Text("1.01:01:01.5".into())),
        ("url", Output::Text("https://example.org/a".into())),
        ("ip", Output::Text("127.0.0.1".into())),
        (
            "json",
            Output::Json(serde_json::json!({ "healthy": true, "jobs": 3 })),
        ),
    ];

    for (command, output) in expect {
        let response = router.dispatch([command]).await.unwrap();
        assert_eq!(response.exit_code, 0, "{}", command);
        assert_eq!(response.output, output, "{}", command);
    }
}

#[tokio::test]
async fn test_json_rendering_follows_settings() {
    let router: Router = Router::new()
        .route("json", || async { Json(vec![1, 2]) })
        .settings(Settings {
            json: JsonStyle::Compact,
            ..quiet()
        });

    let response = router.execute_with(["json"]).await;
    assert_eq!(response.rendered(router.output_settings()), "[1,2]");
}
