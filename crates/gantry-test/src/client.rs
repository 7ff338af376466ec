//! Test client that drives a pipeline in-process.

use bytes::Bytes;
use gantry_server::Pipeline;
use http::Method;
use serde::Serialize;

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;

/// Sends requests straight into a built [`Pipeline`], without a socket.
///
/// # Example
///
/// ```rust
/// use gantry_server::Gantry;
/// use gantry_test::TestClient;
/// use http::StatusCode;
///
/// let pipeline = Gantry::new()
///     .routes(|mapper| {
///         mapper.get("/users/{id}").path_variable("id").handle(|id: u32| id * 2);
///     })
///     .build()
///     .unwrap();
///
/// let client = TestClient::new(pipeline);
/// client
///     .get("/users/21")
///     .send()
///     .assert_status(StatusCode::OK)
///     .assert_body_eq("42");
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    pipeline: Pipeline,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client for `pipeline`.
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// The pipeline under test.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Starts a `GET` request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a `POST` request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a `PUT` request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a `PATCH` request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a `DELETE` request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, uri);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest {
            client: self,
            builder,
        }
    }
}

/// A request builder bound to a [`TestClient`].
#[must_use = "a request does nothing until `send` is called"]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.query(name, value);
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets a form-urlencoded body.
    pub fn form<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.form(value);
        self
    }

    /// Adds a plain multipart field.
    pub fn multipart_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.multipart_field(name, value);
        self
    }

    /// Adds a multipart file part.
    pub fn multipart_file(
        mut self,
        field: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        self.builder = self.builder.multipart_file(field, filename, content_type, content);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built; use
    /// [`TestClientRequest::try_send`] to handle that case.
    pub fn send(self) -> TestResponse {
        self.try_send()
            .unwrap_or_else(|e| panic!("test request failed: {e}"))
    }

    /// Sends the request, reporting build failures.
    pub fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?.into_http_request();
        let response = self.client.pipeline.handle(request);
        TestResponse::from_http(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{RequestContext, ResponseWriter};
    use gantry_server::Gantry;
    use http::StatusCode;
    use serde_json::json;

    fn client() -> TestClient {
        let pipeline = Gantry::new()
            .routes(|mapper| {
                mapper
                    .request("/echo")
                    .method(Method::GET)
                    .method(Method::POST)
                    .method(Method::PUT)
                    .method(Method::PATCH)
                    .method(Method::DELETE)
                    .handle(|request: RequestContext| {
                        json!({
                            "method": request.method().as_str(),
                            "path": request.path(),
                            "query": request.uri().query(),
                            "custom": request.header("x-custom"),
                        })
                    });
                mapper
                    .post("/raw")
                    .handle(|request: RequestContext, response: ResponseWriter| {
                        response.insert_header("content-type", "text/plain");
                        response.write(request.body());
                    });
            })
            .build()
            .unwrap();
        TestClient::new(pipeline)
    }

    #[test]
    fn test_all_methods() {
        let client = client();
        for (response, method) in [
            (client.get("/echo").send(), "GET"),
            (client.post("/echo").send(), "POST"),
            (client.put("/echo").send(), "PUT"),
            (client.patch("/echo").send(), "PATCH"),
            (client.delete("/echo").send(), "DELETE"),
        ] {
            response
                .assert_status(StatusCode::OK)
                .assert_json_field("method", &json!(method));
        }
    }

    #[test]
    fn test_query_and_default_header() {
        let client = client().with_default_header("X-Custom", "yes");
        client
            .get("/echo")
            .query("page", "2")
            .send()
            .assert_json_field("query", &json!("page=2"))
            .assert_json_field("custom", &json!("yes"));
    }

    #[test]
    fn test_raw_body() {
        client()
            .post("/raw")
            .body("payload")
            .send()
            .assert_header("content-type", "text/plain")
            .assert_body_eq("payload");
    }

    #[test]
    fn test_try_send_reports_build_errors() {
        let err = client()
            .get("/echo")
            .header("bad header", "x")
            .try_send()
            .unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));
    }

    #[test]
    fn test_unknown_path() {
        client().get("/nope").send().assert_status(StatusCode::NOT_FOUND);
    }
}
