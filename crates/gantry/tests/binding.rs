//! Argument binding from headers, query strings, forms, bodies and uploads.

use gantry::prelude::*;
use gantry_test::TestClient;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize)]
struct Person {
    name: String,
    age: u32,
}

fn client(routes: impl FnOnce(&mut Mapper) + Send + 'static) -> TestClient {
    TestClient::new(Gantry::new().routes(routes).build().unwrap())
}

#[test]
fn test_required_header() {
    let client = client(|mapper| {
        mapper
            .get("/secure")
            .header("Token")
            .handle(|token: String| format!("token {token}"));
    });

    client
        .get("/secure")
        .send()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("error.code", &json!("MISSING_PARAMETER"));

    client
        .get("/secure")
        .header("Token", "t-1")
        .send()
        .assert_status(StatusCode::OK)
        .assert_body_eq("\"token t-1\"");
}

#[test]
fn test_optional_header_and_query() {
    let client = client(|mapper| {
        mapper
            .get("/search")
            .param("q")
            .param_optional("page")
            .header_optional("Accept-Language")
            .handle(|q: String, page: Option<u32>, language: Option<String>| {
                json!({
                    "q": q,
                    "page": page.unwrap_or(1),
                    "language": language,
                })
            });
    });

    client
        .get("/search")
        .query("q", "rust lang")
        .send()
        .assert_json_eq(&json!({"q": "rust lang", "page": 1, "language": null}));

    client
        .get("/search")
        .query("q", "rust")
        .query("page", "3")
        .header("Accept-Language", "en")
        .send()
        .assert_json_eq(&json!({"q": "rust", "page": 3, "language": "en"}));

    client
        .get("/search")
        .send()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("error.code", &json!("MISSING_PARAMETER"));
}

#[test]
fn test_form_body_fills_plain_parameters() {
    let client = client(|mapper| {
        mapper
            .post("/login")
            .param("user")
            .param("remember")
            .handle(|user: String, remember: bool| format!("{user}:{remember}"));
    });

    client
        .post("/login")
        .form(&[("user", "ada"), ("remember", "true")])
        .send()
        .assert_status(StatusCode::OK)
        .assert_body_eq("\"ada:true\"");
}

#[test]
fn test_json_body_on_post() {
    let client = client(|mapper| {
        mapper
            .post("/people")
            .body("person")
            .handle(|person: Body<Person>| format!("{} is {}", person.name, person.age));
    });

    client
        .post("/people")
        .json(&json!({"name": "a", "age": 3}))
        .send()
        .assert_status(StatusCode::OK)
        .assert_body_eq("\"a is 3\"");
}

#[test]
fn test_malformed_body_is_bad_request() {
    let client = client(|mapper| {
        mapper
            .post("/people")
            .body("person")
            .handle(|person: Body<Person>| person.into_inner().name);
    });

    client
        .post("/people")
        .content_type("application/json")
        .body("{not json")
        .send()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("error.code", &json!("DESERIALIZATION_FAILED"));

    client
        .post("/people")
        .json(&json!({"name": "a"}))
        .send()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("error.code", &json!("DESERIALIZATION_FAILED"));
}

#[test]
fn test_lenient_decoding_leaves_body_unresolved() {
    let pipeline = Gantry::new()
        .config(PipelineConfig::builder().lenient_body_decoding(true).build())
        .routes(|mapper| {
            mapper
                .post("/people")
                .body_optional("person")
                .handle(|person: Option<Body<Person>>| {
                    person.map_or_else(|| "anonymous".to_string(), |p| p.into_inner().name)
                });
        })
        .build()
        .unwrap();
    let client = TestClient::new(pipeline);

    client
        .post("/people")
        .content_type("application/json")
        .body("{not json")
        .send()
        .assert_status(StatusCode::OK)
        .assert_body_eq("\"anonymous\"");

    client
        .post("/people")
        .json(&json!({"name": "b", "age": 9}))
        .send()
        .assert_body_eq("\"b\"");
}

#[test]
fn test_body_requires_post_or_put() {
    let client = client(|mapper| {
        mapper
            .patch("/people")
            .body("person")
            .handle(|person: Body<Person>| person.into_inner().age);
    });

    client
        .patch("/people")
        .json(&json!({"name": "a", "age": 3}))
        .send()
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_json_field("error.code", &json!("METHOD_NOT_ALLOWED"));
}

#[derive(Debug, Deserialize)]
struct Paging {
    page: u32,
    size: Option<u32>,
    tenant: String,
}

impl ValueObject for Paging {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("page").required(),
            FieldDescriptor::new("size").named("per_page"),
            FieldDescriptor::new("tenant").named("X-Tenant").header().required(),
        ]
    }
}

#[test]
fn test_value_object_bound_field_by_field() {
    let client = client(|mapper| {
        mapper.get("/items").value_object("paging").handle(|paging: Bind<Paging>| {
            json!({
                "page": paging.page,
                "size": paging.size,
                "tenant": paging.tenant,
            })
        });
    });

    client
        .get("/items")
        .query("page", "2")
        .query("per_page", "50")
        .header("X-Tenant", "acme")
        .send()
        .assert_status(StatusCode::OK)
        .assert_json_eq(&json!({"page": 2, "size": 50, "tenant": "acme"}));

    client
        .get("/items")
        .query("page", "2")
        .send()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("error.code", &json!("MISSING_PARAMETER"));
}

#[derive(Debug, Deserialize)]
struct Window {
    page: u32,
    size: u32,
    desc: bool,
    sort: String,
}

impl ValueObject for Window {
    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("page"),
            FieldDescriptor::new("size"),
            FieldDescriptor::new("desc"),
            FieldDescriptor::new("sort"),
        ]
    }
}

#[test]
fn test_value_object_absent_fields_take_zero_values() {
    let client = client(|mapper| {
        mapper.get("/items").value_object("window").handle(|window: Bind<Window>| {
            json!({
                "page": window.page,
                "size": window.size,
                "desc": window.desc,
                "sort": window.sort,
            })
        });
        mapper.get("/plain").param_optional("size").handle(|size: u32| size);
    });

    client
        .get("/items")
        .query("page", "2")
        .send()
        .assert_status(StatusCode::OK)
        .assert_json_eq(&json!({"page": 2, "size": 0, "desc": false, "sort": ""}));

    client.get("/plain").send().assert_status(StatusCode::OK).assert_body_eq("0");

    client
        .get("/items")
        .query("page", "many")
        .send()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("error.code", &json!("INVALID_PARAMETER"));
}

#[test]
fn test_multipart_file_and_fields() {
    let client = client(|mapper| {
        mapper
            .post("/avatars")
            .param("owner")
            .file("avatar")
            .handle(|owner: String, avatar: MultipartFile| {
                json!({
                    "owner": owner,
                    "file": avatar.file_name(),
                    "type": avatar.content_type(),
                    "size": avatar.len(),
                })
            });
    });

    client
        .post("/avatars")
        .multipart_field("owner", "ada")
        .multipart_file("avatar", "me.png", "image/png", &b"\x89PNG"[..])
        .send()
        .assert_status(StatusCode::OK)
        .assert_json_eq(&json!({
            "owner": "ada",
            "file": "me.png",
            "type": "image/png",
            "size": 4,
        }));

    client
        .post("/avatars")
        .multipart_field("owner", "ada")
        .send()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json_field("error.code", &json!("MISSING_PARAMETER"));
}

#[test]
fn test_transport_parameters_alongside_custom_ones() {
    let client = client(|mapper| {
        mapper.get("/echo/{word}").path_variable("word").handle(
            |request: RequestContext, word: String, response: ResponseWriter| {
                response.insert_header("x-echo", &word);
                format!("{} {word}", request.method())
            },
        );
    });

    client
        .get("/echo/hi")
        .send()
        .assert_header("x-echo", "hi")
        .assert_body_eq("\"GET hi\"");
}
