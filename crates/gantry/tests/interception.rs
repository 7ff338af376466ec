//! Filters and interceptors around dispatch.

use std::sync::Arc;

use gantry::prelude::*;
use gantry_test::TestClient;
use http::StatusCode;
use parking_lot::Mutex;
use serde_json::json;

type Log = Arc<Mutex<Vec<String>>>;

fn recording_filter(label: &'static str, log: &Log) -> Arc<dyn Filter> {
    let log = Arc::clone(log);
    Arc::new(FnFilter::new(label, move |request, response, next| {
        log.lock().push(format!("{label}:in"));
        next.run(request, response);
        log.lock().push(format!("{label}:out"));
    }))
}

#[test]
fn test_filters_wrap_dispatch_in_order() {
    let log = Log::default();
    let handler_log = Arc::clone(&log);
    let pipeline = Gantry::new()
        .filter("/*", recording_filter("outer", &log))
        .filter("/api/*", recording_filter("inner", &log))
        .routes(move |mapper| {
            mapper.get("/api/ping").handle(move || {
                handler_log.lock().push("handler".to_string());
                "pong"
            });
        })
        .build()
        .unwrap();

    TestClient::new(pipeline).get("/api/ping").send().assert_status(StatusCode::OK);
    assert_eq!(
        *log.lock(),
        vec!["outer:in", "inner:in", "handler", "inner:out", "outer:out"]
    );
}

#[test]
fn test_excluded_path_skips_filter() {
    let log = Log::default();
    let pipeline = Gantry::new()
        .filter("/*", recording_filter("audit", &log))
        .exclude_filter("/health")
        .routes(|mapper| {
            mapper.get("/health").handle(|| "ok");
            mapper.get("/orders").handle(|| "orders");
        })
        .build()
        .unwrap();
    let client = TestClient::new(pipeline);

    client.get("/health").send().assert_body_eq("\"ok\"");
    assert!(log.lock().is_empty());

    client.get("/orders").send().assert_body_eq("\"orders\"");
    assert_eq!(*log.lock(), vec!["audit:in", "audit:out"]);
}

#[test]
fn test_filter_short_circuits() {
    let pipeline = Gantry::new()
        .filter(
            "/admin/*",
            Arc::new(FnFilter::new("deny", |_request, response, _next| {
                response.write_error(StatusCode::FORBIDDEN, "FORBIDDEN", "admins only");
            })),
        )
        .routes(|mapper| mapper.get("/admin/stats").handle(|| "secret"))
        .build()
        .unwrap();

    TestClient::new(pipeline)
        .get("/admin/stats")
        .send()
        .assert_status(StatusCode::FORBIDDEN)
        .assert_json_field("error.message", &json!("admins only"));
}

#[test]
fn test_cors_filter_answers_preflight() {
    let pipeline = Gantry::new()
        .filter("/*", Arc::new(CorsFilter::builder().allow_any_origin().build()))
        .routes(|mapper| mapper.get("/data").handle(|| 1))
        .build()
        .unwrap();
    let client = TestClient::new(pipeline);

    client
        .request(http::Method::OPTIONS, "/data")
        .send()
        .assert_status(StatusCode::NO_CONTENT)
        .assert_header("access-control-allow-origin", "*");

    client
        .get("/data")
        .send()
        .assert_status(StatusCode::OK)
        .assert_header("access-control-allow-origin", "*");
}

struct Recording {
    label: &'static str,
    pass: bool,
    log: Log,
}

impl Interceptor for Recording {
    fn name(&self) -> &'static str {
        self.label
    }

    fn pre_handle(&self, _: &mut RequestContext, _: &ResponseWriter, _: &RouteEntry) -> bool {
        self.log.lock().push(format!("pre:{}", self.label));
        self.pass
    }

    fn after_handle(
        &self,
        _: &RequestContext,
        _: &ResponseWriter,
        _: &RouteEntry,
        completion: &Completion<'_>,
    ) {
        let outcome = match (completion.invoked, completion.error) {
            (false, _) => "skipped".to_string(),
            (true, Some(err)) => format!("error {}", err.error_code()),
            (true, None) => "ok".to_string(),
        };
        self.log.lock().push(format!("post:{}:{outcome}", self.label));
    }
}

fn recording(label: &'static str, pass: bool, log: &Log) -> Arc<dyn Interceptor> {
    Arc::new(Recording {
        label,
        pass,
        log: Arc::clone(log),
    })
}

fn intercepted(a_passes: bool, b_passes: bool, log: &Log) -> TestClient {
    let pipeline = Gantry::new()
        .interceptor("/*", recording("a", a_passes, log))
        .interceptor("/*", recording("b", b_passes, log))
        .routes(|mapper| {
            mapper.get("/ok").handle(|| "fine");
            mapper.get("/fail").handle(|| -> Result<String, HandlerError> {
                Err(HandlerError::bad_request("nope"))
            });
        })
        .build()
        .unwrap();
    TestClient::new(pipeline)
}

#[test]
fn test_interceptors_unwind_in_reverse() {
    let log = Log::default();
    intercepted(true, true, &log)
        .get("/ok")
        .send()
        .assert_body_eq("\"fine\"");
    assert_eq!(*log.lock(), vec!["pre:a", "pre:b", "post:b:ok", "post:a:ok"]);
}

#[test]
fn test_interceptors_unwind_after_handler_error() {
    let log = Log::default();
    intercepted(true, true, &log)
        .get("/fail")
        .send()
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        *log.lock(),
        vec![
            "pre:a",
            "pre:b",
            "post:b:error BAD_REQUEST",
            "post:a:error BAD_REQUEST"
        ]
    );
}

#[test]
fn test_rejecting_interceptor_stops_request() {
    let log = Log::default();
    let response = intercepted(false, true, &log).get("/ok").send();
    assert_ne!(response.text().unwrap(), "\"fine\"");
    assert_eq!(*log.lock(), vec!["pre:a", "post:a:skipped"]);
}

#[test]
fn test_excluded_interceptor_path() {
    let log = Log::default();
    let pipeline = Gantry::new()
        .interceptor("/*", recording("a", true, &log))
        .exclude_interceptor("/ok")
        .routes(|mapper| mapper.get("/ok").handle(|| "fine"))
        .build()
        .unwrap();

    TestClient::new(pipeline).get("/ok").send().assert_body_eq("\"fine\"");
    assert!(log.lock().is_empty());
}

struct Tenant;

impl Interceptor for Tenant {
    fn name(&self) -> &'static str {
        "tenant"
    }

    fn pre_handle(
        &self,
        request: &mut RequestContext,
        response: &ResponseWriter,
        _: &RouteEntry,
    ) -> bool {
        if request.header("x-tenant").is_none() {
            response.write_error(StatusCode::UNAUTHORIZED, "NO_TENANT", "tenant required");
            return false;
        }
        request.set_attribute("tenant.checked", true);
        true
    }
}

struct Security;

impl WebConfigurer for Security {
    fn add_interceptors(&self, interceptors: &mut InterceptorRegister) {
        interceptors.push("/tenants/*", Arc::new(Tenant));
    }
}

#[test]
fn test_configured_interceptor_guards_and_annotates() {
    let pipeline = Gantry::new()
        .configure(Security)
        .routes(|mapper| {
            mapper
                .get("/tenants/me")
                .header("x-tenant")
                .handle(|request: RequestContext, tenant: String| {
                    json!({
                        "tenant": tenant,
                        "checked": request.has_attribute("tenant.checked"),
                    })
                });
        })
        .build()
        .unwrap();
    let client = TestClient::new(pipeline);

    client
        .get("/tenants/me")
        .header("x-tenant", "acme")
        .send()
        .assert_json_eq(&json!({"tenant": "acme", "checked": true}));
}

#[test]
fn test_configured_interceptor_rejects() {
    let pipeline = Gantry::new()
        .configure(Security)
        .routes(|mapper| mapper.get("/tenants/me").handle(|| "me"))
        .build()
        .unwrap();

    TestClient::new(pipeline)
        .get("/tenants/me")
        .send()
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_json_field("error.code", &json!("NO_TENANT"));
}
