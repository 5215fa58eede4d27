use std::fmt;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use axum_catcher::{
    BoxError, Catchable, Catcher, Caught, DEFAULT_MESSAGE, ErrorTag, Scenario, UNMAPPED, catch,
    catch_all,
};
use http_body_util::BodyExt;
use serde_json::{Map, Value, json};
use tower::{Service, ServiceBuilder, ServiceExt};
use tracing_subscriber::fmt::MakeWriter;

const APP_CLIENT_ERROR: ErrorTag = ErrorTag::from_static("app.client_error");

#[derive(Debug)]
struct DivideByZero;

impl fmt::Display for DivideByZero {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("division by zero")
    }
}

impl Catchable for DivideByZero {
    fn tag(&self) -> ErrorTag {
        ErrorTag::from_static("app.divide_by_zero")
    }
}

#[derive(Debug)]
struct OutOfBounds {
    index: usize,
    len: usize,
}

impl fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index {} out of range for length {}", self.index, self.len)
    }
}

impl Catchable for OutOfBounds {
    fn tag(&self) -> ErrorTag {
        ErrorTag::from_static("app.out_of_bounds")
    }
}

#[derive(Debug)]
struct EntityNotFound {
    id: String,
}

impl fmt::Display for EntityNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User ID {} could not be found", self.id)
    }
}

impl Catchable for EntityNotFound {
    fn tag(&self) -> ErrorTag {
        ErrorTag::from_static("app.entity_not_found")
    }

    fn ancestors(&self) -> &[ErrorTag] {
        const ANCESTORS: &[ErrorTag] = &[APP_CLIENT_ERROR];
        ANCESTORS
    }
}

fn query_param(req: &Request<Body>, key: &str) -> Option<String> {
    req.uri().query()?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| v.to_string())
    })
}

fn json_response(value: Value) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&value).unwrap()))
        .unwrap()
}

/// Routes mirroring a small application: division, list indexing and a
/// user lookup, each failing with its own catchable error.
async fn handler(req: Request<Body>) -> Result<Response, BoxError> {
    match req.uri().path() {
        "/divide" => {
            let a: i64 = query_param(&req, "a").unwrap().parse().unwrap();
            let b: i64 = query_param(&req, "b").unwrap().parse().unwrap();
            if b == 0 {
                return Err(Caught::new(DivideByZero).into());
            }
            Ok(json_response(json!({"result": a / b})))
        }
        "/element" => {
            let n: usize = query_param(&req, "n").unwrap().parse().unwrap();
            let data = [10, 20, 30];
            match data.get(n) {
                Some(value) => Ok(json_response(json!({"result": value}))),
                None => Err(Caught::new(OutOfBounds {
                    index: n,
                    len: data.len(),
                })
                .into()),
            }
        }
        path if path.starts_with("/user/") => {
            let id = &path["/user/".len()..];
            if id == "1001" {
                Ok(json_response(json!({"name": "Jayne Doe"})))
            } else {
                Err(Caught::new(EntityNotFound { id: id.to_string() }).into())
            }
        }
        "/io-failure" => Err("disk on fire".into()),
        _ => Ok(json_response(json!({"ok": true}))),
    }
}

fn app(
    catcher: Catcher,
) -> impl Service<Request<Body>, Response = Response, Error = BoxError> + Clone {
    ServiceBuilder::new()
        .layer(catcher.into_layer())
        .service_fn(handler)
}

async fn get<S>(app: &S, uri: &str) -> Result<Response, BoxError>
where
    S: Service<Request<Body>, Response = Response, Error = BoxError> + Clone,
{
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
}

/// Collects formatted log output so tests can assert on emitted diagnostics.
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn constant_message_scenario() {
    let mut catcher = Catcher::new();
    catcher.register(
        catch("app.divide_by_zero")
            .with_status_code(StatusCode::FORBIDDEN)
            .and_return("Zero division makes zero sense"),
    );
    let app = app(catcher);

    let resp = get(&app, "/divide?a=10&b=2").await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"result": 5}));

    let resp = get(&app, "/divide?a=10&b=0").await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(resp).await,
        json!({"message": "Zero division makes zero sense", "code": 403})
    );
}

#[tokio::test]
async fn single_scenario_for_multiple_tags() {
    let mut catcher = Catcher::new();
    catcher.register(
        catch_all([
            "app.divide_by_zero",
            "app.entity_not_found",
            "app.out_of_bounds",
        ])
        .with_status_code(StatusCode::IM_A_TEAPOT)
        .and_return("I'm a teapot"),
    );
    let app = app(catcher);

    for uri in ["/divide?a=10&b=0", "/user/1009", "/element?n=100"] {
        let resp = get(&app, uri).await.unwrap();
        assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT, "uri: {uri}");
        assert_eq!(
            body_json(resp).await.get("message"),
            Some(&json!("I'm a teapot")),
            "uri: {uri}"
        );
    }
}

#[tokio::test]
async fn stringified_exception() {
    let mut catcher = Catcher::new();
    catcher.register(
        catch("app.entity_not_found")
            .with_status_code(StatusCode::NOT_FOUND)
            .and_stringify(),
    );
    let app = app(catcher);

    let resp = get(&app, "/user/1001").await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"name": "Jayne Doe"}));

    let resp = get(&app, "/user/1009").await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(resp).await.get("message"),
        Some(&json!("User ID 1009 could not be found"))
    );
}

#[tokio::test]
async fn scenario_for_parent_tag_catches_descendants() {
    let mut catcher = Catcher::new();
    catcher.register(
        catch(APP_CLIENT_ERROR)
            .with_status_code(StatusCode::NOT_FOUND)
            .and_stringify(),
    );
    let app = app(catcher);

    let resp = get(&app, "/user/1009").await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(resp).await.get("message"),
        Some(&json!("User ID 1009 could not be found"))
    );
}

#[tokio::test]
async fn exact_scenario_beats_the_parent_scenario() {
    let mut catcher = Catcher::new();
    catcher.register(catch(APP_CLIENT_ERROR).with_status_code(StatusCode::BAD_REQUEST));
    catcher.register(
        catch("app.entity_not_found")
            .with_status_code(StatusCode::NOT_FOUND)
            .and_stringify(),
    );
    let app = app(catcher);

    let resp = get(&app, "/user/1009").await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn callable_message() {
    let mut catcher = Catcher::new();
    catcher.register(
        catch("app.out_of_bounds")
            .with_status_code(StatusCode::IM_A_TEAPOT)
            .and_call(|err: &dyn Catchable, _parts: &Parts| format!("Out of bound: {err}")),
    );
    let app = app(catcher);

    let resp = get(&app, "/element?n=100").await.unwrap();
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    let message = body_json(resp).await["message"].as_str().unwrap().to_string();
    assert!(message.starts_with("Out of bound:"), "message: {message}");
}

#[tokio::test]
async fn async_callable_message() {
    let mut catcher = Catcher::new();
    catcher.register(
        catch("app.out_of_bounds")
            .with_status_code(StatusCode::IM_A_TEAPOT)
            .and_call_async(|err: &dyn Catchable, parts: &Parts| {
                let text = format!("{} on {}", err, parts.uri.path());
                async move { Ok(Value::String(text)) }
            }),
    );
    let app = app(catcher);

    let resp = get(&app, "/element?n=100").await.unwrap();
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(
        body_json(resp).await.get("message"),
        Some(&json!("index 100 out of range for length 3 on /element"))
    );
}

#[tokio::test]
async fn unregistered_error_yields_the_default_500() {
    let app = app(Catcher::new());

    let resp = get(&app, "/divide?a=10&b=0").await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(resp).await,
        json!({"message": DEFAULT_MESSAGE, "code": 500})
    );
}

#[tokio::test]
async fn non_catchable_error_yields_the_default_500() {
    let app = app(Catcher::new());

    let resp = get(&app, "/io-failure").await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(resp).await,
        json!({"message": DEFAULT_MESSAGE, "code": 500})
    );
}

#[tokio::test]
async fn unrecognized_errors_can_be_mapped_via_the_unmapped_tag() {
    let mut catcher = Catcher::new();
    catcher.register(
        catch(UNMAPPED)
            .with_status_code(StatusCode::BAD_GATEWAY)
            .and_stringify(),
    );
    let app = app(catcher);

    let resp = get(&app, "/io-failure").await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(resp).await,
        json!({"message": "disk on fire", "code": 502})
    );
}

#[tokio::test]
async fn diagnostics_are_logged_for_overrides_and_unmapped_errors() {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut catcher = Catcher::new();
    catcher.register(catch("app.divide_by_zero").with_status_code(StatusCode::FORBIDDEN));
    catcher.register(catch("app.divide_by_zero").with_status_code(StatusCode::GONE));
    catcher.register(Scenario::default());
    let app = app(catcher);

    let resp = get(&app, "/io-failure").await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let logs = capture.contents();
    assert!(logs.contains("replaces the existing one"), "logs: {logs}");
    assert!(logs.contains("will never match"), "logs: {logs}");
    assert!(logs.contains("unrecognized error"), "logs: {logs}");
}

#[tokio::test]
async fn additional_fields_are_merged_verbatim() {
    let mut fields = Map::new();
    fields.insert("error_code".to_string(), json!("ENTITY_NOT_FOUND"));

    let mut catcher = Catcher::new();
    catcher.register(
        catch("app.entity_not_found")
            .with_status_code(StatusCode::NOT_FOUND)
            .and_stringify()
            .with_additional_fields(fields),
    );
    let app = app(catcher);

    let resp = get(&app, "/user/1009").await.unwrap();
    assert_eq!(
        body_json(resp).await,
        json!({
            "message": "User ID 1009 could not be found",
            "code": 404,
            "error_code": "ENTITY_NOT_FOUND"
        })
    );
}

#[tokio::test]
async fn custom_envelope_keys() {
    let mut catcher = Catcher::new().with_envelope_keys("error", "status");
    catcher.register(
        catch("app.divide_by_zero")
            .with_status_code(StatusCode::FORBIDDEN)
            .and_return("Zero division makes zero sense"),
    );
    let app = app(catcher);

    let resp = get(&app, "/divide?a=10&b=0").await.unwrap();
    assert_eq!(
        body_json(resp).await,
        json!({"error": "Zero division makes zero sense", "status": 403})
    );
}

#[tokio::test]
async fn custom_encoder_and_content_type() {
    let mut catcher = Catcher::new().with_encoder("application/xml", |envelope| {
        let message = envelope
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(format!("<response><message>{message}</message></response>"))
    });
    catcher.register(
        catch("app.divide_by_zero")
            .with_status_code(StatusCode::IM_A_TEAPOT)
            .and_return("I'm a teapot"),
    );
    let app = app(catcher);

    let resp = get(&app, "/divide?a=10&b=0").await.unwrap();
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/xml"
    );
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("teapot"), "body: {text}");
}

#[tokio::test]
async fn resolver_fault_propagates_to_the_host() {
    let mut catcher = Catcher::new();
    catcher.register(catch("app.divide_by_zero").and_call_async(
        |_err: &dyn Catchable, _parts: &Parts| async move {
            Err::<Value, BoxError>("resolver exploded".into())
        },
    ));
    let app = app(catcher);

    let err = get(&app, "/divide?a=10&b=0").await.unwrap_err();
    assert_eq!(err.to_string(), "resolver exploded");
}

#[tokio::test]
async fn successful_responses_pass_through_untouched() {
    let mut catcher = Catcher::new();
    catcher.register(catch("app.divide_by_zero").with_status_code(StatusCode::FORBIDDEN));
    let app = app(catcher);

    let resp = get(&app, "/anything").await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_json(resp).await, json!({"ok": true}));
}
