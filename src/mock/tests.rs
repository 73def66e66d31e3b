//! Tests for route loading, matching and dispatch.

#[cfg(test)]
mod mock_tests {
    use std::collections::HashMap;
    use std::io::Write;
    use serde_json::{json, Map, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use crate::mock::{
        build_server, evaluate, load_routes, parse_routes, read_routes, register, respond, shallow_equal,
        Error, MatchError, RouteDeclaration,
    };
    use crate::parser::{HttpRequest, HttpVersion, Method};
    use crate::server::{HttpServer, Router, ServerConfig, StatusCode};

    fn request(
        method: Method,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> HttpRequest {
        let mut header_map: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        header_map.insert("Host".to_string(), "localhost".to_string());

        let body = match body {
            Some(value) => {
                header_map.insert("Content-Type".to_string(), "application/json".to_string());
                serde_json::to_vec(&value).unwrap()
            }
            None => Vec::new(),
        };

        let mut request = HttpRequest::with_body(method, "/test".to_string(), HttpVersion::Http11, header_map, body);
        request.path_params = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        request
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn raw_request(method: &str, path: &str, headers: &[(&str, &str)], body: Option<&str>) -> String {
        let mut raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n");
        for (name, value) in headers {
            raw.push_str(&format!("{name}: {value}\r\n"));
        }
        if let Some(body) = body {
            raw.push_str("Content-Type: application/json\r\n");
            raw.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
        } else {
            raw.push_str("\r\n");
        }
        raw
    }

    /// Send one raw request through the server and return status and body.
    async fn exchange(router: &Router, raw: &str) -> (u16, String) {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);
        client.write_all(raw.as_bytes()).await.unwrap();

        let _ = HttpServer::handle_connection(&mut server, router, &ServerConfig::default()).await;
        drop(server);

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8(response).unwrap();

        let (head, body) = response.split_once("\r\n\r\n").unwrap();
        let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
        (status, body.to_string())
    }

    fn routes(table: &str) -> Router {
        let mut router = Router::new();
        register(&mut router, parse_routes(table).unwrap());
        router
    }

    // Declarations

    #[test]
    fn test_declaration_defaults() {
        let declaration = RouteDeclaration::from_json("/health", json!({})).unwrap();
        assert_eq!(declaration.pattern, "/health");
        assert_eq!(declaration.method, Method::GET);
        assert_eq!(declaration.response, json!({}));
        assert!(declaration.params.is_empty());
        assert!(declaration.headers.is_empty());
        assert!(declaration.body.is_empty());
    }

    #[test]
    fn test_declaration_fields() {
        let declaration = RouteDeclaration::from_json(
            "/users/:id",
            json!({
                "method": "put",
                "params": {"id": "42"},
                "headers": {"x-token": "abc"},
                "body": {"name": "alice"},
                "response": [1, 2, 3],
                "description": "ignored"
            }),
        )
        .unwrap();

        let expected = RouteDeclaration::new("/users/:id", Method::PUT, json!([1, 2, 3]))
            .with_param("id", "42")
            .with_header("x-token", "abc")
            .with_body_field("name", "alice");
        assert_eq!(declaration, expected);
    }

    #[test]
    fn test_declaration_keeps_null_response() {
        let declaration = RouteDeclaration::from_json("/empty", json!({"response": null})).unwrap();
        assert_eq!(declaration.response, Value::Null);
    }

    #[test]
    fn test_unsupported_method() {
        let result = RouteDeclaration::from_json("/trace", json!({"method": "TRACE"}));
        assert!(matches!(
            result,
            Err(Error::UnsupportedMethod { ref pattern, ref method }) if pattern == "/trace" && method == "TRACE"
        ));

        assert!(matches!(
            RouteDeclaration::from_json("/head", json!({"method": "head"})),
            Err(Error::UnsupportedMethod { .. })
        ));
    }

    #[test]
    fn test_invalid_declarations() {
        assert!(matches!(
            RouteDeclaration::from_json("/a", json!("GET")),
            Err(Error::InvalidDeclaration { .. })
        ));
        assert!(matches!(
            RouteDeclaration::from_json("/a", json!({"headers": ["x-token"]})),
            Err(Error::InvalidDeclaration { .. })
        ));
        assert!(matches!(
            RouteDeclaration::from_json("/a", json!({"method": 7})),
            Err(Error::InvalidDeclaration { .. })
        ));
    }

    #[test]
    fn test_non_string_constraints_are_kept() {
        let declaration = RouteDeclaration::from_json(
            "/users/:id",
            json!({"params": {"id": 42}, "headers": {"x-retries": 3}}),
        )
        .unwrap();
        assert_eq!(declaration.params, vec![("id".to_string(), json!(42))]);
        assert_eq!(declaration.headers, vec![("x-retries".to_string(), json!(3))]);

        let result = evaluate(&declaration, &request(Method::GET, &[("id", "42")], &[("x-retries", "3")], None));
        assert_eq!(result, Err(MatchError::ParamMismatch("id".to_string())));

        let header_only = RouteDeclaration::new("/test", Method::GET, json!({})).with_header("x-retries", 3);
        let result = evaluate(&header_only, &request(Method::GET, &[], &[("x-retries", "3")], None));
        assert_eq!(result, Err(MatchError::HeaderMismatch("x-retries".to_string())));
        let result = evaluate(&header_only, &request(Method::GET, &[], &[], None));
        assert_eq!(result, Err(MatchError::HeaderMismatch("x-retries".to_string())));
    }

    // Loader

    #[test]
    fn test_parse_routes_keeps_file_order() {
        let declarations = parse_routes(
            r#"{
                "/zeta": {"method": "GET"},
                "/alpha": {"method": "POST"},
                "/mid/:id": {"method": "delete"}
            }"#,
        )
        .unwrap();

        let patterns: Vec<&str> = declarations.iter().map(|d| d.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["/zeta", "/alpha", "/mid/:id"]);
        assert_eq!(declarations[2].method, Method::DELETE);
    }

    #[test]
    fn test_parse_routes_last_duplicate_wins() {
        let declarations = parse_routes(
            r#"{
                "/users": {"response": {"version": 1}},
                "/other": {},
                "/users": {"response": {"version": 2}}
            }"#,
        )
        .unwrap();

        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0].pattern, "/users");
        assert_eq!(declarations[0].response, json!({"version": 2}));
    }

    #[test]
    fn test_parse_routes_skips_bad_declarations() {
        let declarations = parse_routes(
            r#"{
                "/trace": {"method": "TRACE"},
                "/broken": {"headers": ["x-token"]},
                "/ok": {"method": "GET"}
            }"#,
        )
        .unwrap();

        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].pattern, "/ok");
    }

    #[test]
    fn test_parse_routes_errors() {
        assert!(matches!(parse_routes("{not json"), Err(Error::Json(_))));
        assert!(matches!(parse_routes("[1, 2]"), Err(Error::NotAnObject)));
        assert!(parse_routes("{}").unwrap().is_empty());
    }

    #[test]
    fn test_load_routes_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"/users/:id": {{"params": {{"id": "42"}}, "response": {{"ok": true}}}}}}"#).unwrap();

        let declarations = load_routes(file.path());
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].params, vec![("id".to_string(), json!("42"))]);
    }

    #[test]
    fn test_load_routes_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("routes.json");
        assert!(matches!(read_routes(&missing), Err(Error::Io { .. })));
        assert!(load_routes(&missing).is_empty());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "this is not json").unwrap();
        assert!(load_routes(file.path()).is_empty());
    }

    // Matcher

    #[test]
    fn test_empty_constraints_always_match() {
        let declaration = RouteDeclaration::new("/test", Method::POST, json!({"ok": true}));
        let req = request(Method::POST, &[("id", "1")], &[("X-Any", "thing")], Some(json!({"a": "b"})));
        assert_eq!(evaluate(&declaration, &req), Ok(&json!({"ok": true})));
    }

    #[test]
    fn test_param_mismatch() {
        let declaration = RouteDeclaration::new("/users/:id", Method::GET, json!({}))
            .with_param("id", "42");

        assert!(evaluate(&declaration, &request(Method::GET, &[("id", "42")], &[], None)).is_ok());
        assert_eq!(
            evaluate(&declaration, &request(Method::GET, &[("id", "43")], &[], None)),
            Err(MatchError::ParamMismatch("id".to_string()))
        );
        assert_eq!(
            evaluate(&declaration, &request(Method::GET, &[], &[], None)),
            Err(MatchError::ParamMismatch("id".to_string()))
        );
    }

    #[test]
    fn test_first_failing_param_is_reported() {
        let declaration = RouteDeclaration::new("/a/:x/:y", Method::GET, json!({}))
            .with_param("y", "1")
            .with_param("x", "1");

        let req = request(Method::GET, &[("x", "2"), ("y", "2")], &[], None);
        assert_eq!(evaluate(&declaration, &req), Err(MatchError::ParamMismatch("y".to_string())));
    }

    #[test]
    fn test_header_name_case_insensitive_value_case_sensitive() {
        let lower = RouteDeclaration::new("/test", Method::GET, json!({})).with_header("x-token", "abc");
        let upper = RouteDeclaration::new("/test", Method::GET, json!({})).with_header("x-token", "ABC");
        let req = request(Method::GET, &[], &[("X-Token", "abc")], None);

        assert!(evaluate(&lower, &req).is_ok());
        assert_eq!(evaluate(&upper, &req), Err(MatchError::HeaderMismatch("x-token".to_string())));
        assert_eq!(
            evaluate(&lower, &request(Method::GET, &[], &[], None)),
            Err(MatchError::HeaderMismatch("x-token".to_string()))
        );
    }

    #[test]
    fn test_body_requires_exact_shallow_equality() {
        let declaration = RouteDeclaration::new("/users", Method::POST, json!({"created": true}))
            .with_body_field("name", "alice");

        let matching = request(Method::POST, &[], &[], Some(json!({"name": "alice"})));
        let different = request(Method::POST, &[], &[], Some(json!({"name": "bob"})));
        let extra = request(Method::POST, &[], &[], Some(json!({"name": "alice", "extra": "x"})));
        let missing = request(Method::POST, &[], &[], None);

        assert!(evaluate(&declaration, &matching).is_ok());
        assert_eq!(evaluate(&declaration, &different), Err(MatchError::BodyMismatch));
        assert_eq!(evaluate(&declaration, &extra), Err(MatchError::BodyMismatch));
        assert_eq!(evaluate(&declaration, &missing), Err(MatchError::BodyMismatch));
    }

    #[test]
    fn test_check_order_is_params_body_headers() {
        let declaration = RouteDeclaration::new("/users/:id", Method::PUT, json!({}))
            .with_param("id", "42")
            .with_body_field("name", "alice")
            .with_header("x-token", "abc");

        let all_wrong = request(Method::PUT, &[("id", "1")], &[("x-token", "nope")], Some(json!({"name": "bob"})));
        assert_eq!(evaluate(&declaration, &all_wrong), Err(MatchError::ParamMismatch("id".to_string())));

        let body_and_header_wrong = request(Method::PUT, &[("id", "42")], &[("x-token", "nope")], Some(json!({"name": "bob"})));
        assert_eq!(evaluate(&declaration, &body_and_header_wrong), Err(MatchError::BodyMismatch));

        let header_wrong = request(Method::PUT, &[("id", "42")], &[("x-token", "nope")], Some(json!({"name": "alice"})));
        assert_eq!(evaluate(&declaration, &header_wrong), Err(MatchError::HeaderMismatch("x-token".to_string())));
    }

    #[test]
    fn test_shallow_equal() {
        assert!(shallow_equal(&object(json!({})), &object(json!({}))));
        assert!(shallow_equal(&object(json!({"a": "1", "b": 2})), &object(json!({"b": 2, "a": "1"}))));
        assert!(shallow_equal(&object(json!({"n": 1})), &object(json!({"n": 1.0}))));
        assert!(!shallow_equal(&object(json!({"a": "1"})), &object(json!({"a": 1}))));
        assert!(!shallow_equal(&object(json!({"a": "1"})), &object(json!({"b": "1"}))));
        assert!(!shallow_equal(&object(json!({"a": "1"})), &object(json!({"a": "1", "b": "2"}))));
        assert!(!shallow_equal(&object(json!({"a": {"x": 1}})), &object(json!({"a": {"x": 1}}))));
        assert!(!shallow_equal(&object(json!({"a": [1]})), &object(json!({"a": [1]}))));
    }

    // Dispatcher

    #[test]
    fn test_respond_builds_json_responses() {
        let declaration = RouteDeclaration::new("/users/:id", Method::GET, json!({"ok": true}))
            .with_param("id", "42");

        let ok = respond(&declaration, &request(Method::GET, &[("id", "42")], &[], None)).unwrap();
        assert_eq!(ok.status, StatusCode::Ok);
        assert_eq!(ok.get_header("Content-Type").unwrap(), "application/json");
        assert_eq!(serde_json::from_slice::<Value>(&ok.body).unwrap(), json!({"ok": true}));

        let rejected = respond(&declaration, &request(Method::GET, &[("id", "7")], &[], None)).unwrap();
        assert_eq!(rejected.status, StatusCode::BadRequest);
        assert_eq!(
            serde_json::from_slice::<Value>(&rejected.body).unwrap(),
            json!({"error": "Incorrect value for parameter id"})
        );
    }

    #[test]
    fn test_register_binds_each_declaration() {
        let mut router = Router::new();
        let count = register(
            &mut router,
            vec![
                RouteDeclaration::new("/a", Method::GET, json!(1)),
                RouteDeclaration::new("/b/:id", Method::PATCH, json!(2)),
            ],
        );

        assert_eq!(count, 2);
        assert_eq!(router.len(), 2);
        assert!(router.find(Method::GET, "/a").is_some());
        assert!(router.find(Method::PATCH, "/b/9").is_some());
        assert!(router.find(Method::GET, "/b/9").is_none());
    }

    #[tokio::test]
    async fn test_user_scenario() {
        let router = routes(r#"{"/users/:id": {"method": "GET", "params": {"id": "42"}, "response": {"ok": true}}}"#);

        let (status, body) = exchange(&router, &raw_request("GET", "/users/42", &[], None)).await;
        assert_eq!(status, 200);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"ok": true}));

        let (status, body) = exchange(&router, &raw_request("GET", "/users/43", &[], None)).await;
        assert_eq!(status, 400);
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({"error": "Incorrect value for parameter id"})
        );
    }

    #[tokio::test]
    async fn test_unconstrained_route_answers_any_request() {
        let router = routes(r#"{"/items": {"method": "post", "response": [{"id": 1}]}}"#);

        let (status, body) = exchange(
            &router,
            &raw_request("POST", "/items?page=2", &[("X-Anything", "1")], Some(r#"{"free": "form"}"#)),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!([{"id": 1}]));
    }

    #[tokio::test]
    async fn test_body_and_header_rejections_over_the_wire() {
        let router = routes(
            r#"{"/login": {
                "method": "POST",
                "headers": {"x-client": "web"},
                "body": {"user": "alice"},
                "response": {"token": "t"}
            }}"#,
        );

        let (status, body) = exchange(
            &router,
            &raw_request("POST", "/login", &[("X-Client", "web")], Some(r#"{"user": "alice"}"#)),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"token": "t"}));

        let (status, body) = exchange(
            &router,
            &raw_request("POST", "/login", &[("X-Client", "web")], Some(r#"{"user": "alice", "extra": "x"}"#)),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"error": "Incorrect request body"}));

        let (status, body) = exchange(
            &router,
            &raw_request("POST", "/login", &[("X-Client", "WEB")], Some(r#"{"user": "alice"}"#)),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({"error": "Incorrect value for header x-client"})
        );
    }

    #[tokio::test]
    async fn test_chunked_body_is_matched() {
        let router = routes(r#"{"/login": {"method": "POST", "body": {"user": "alice"}, "response": {"token": "t"}}}"#);

        let raw = "POST /login HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\
                   Transfer-Encoding: chunked\r\n\r\n10\r\n{\"user\":\"alice\"}\r\n0\r\n\r\n";
        let (status, body) = exchange(&router, raw).await;
        assert_eq!(status, 200);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"token": "t"}));
    }

    #[tokio::test]
    async fn test_non_string_param_route_always_rejects() {
        let router = routes(r#"{"/users/:id": {"params": {"id": 42}, "response": {"ok": true}}}"#);
        assert_eq!(router.len(), 1);

        let (status, body) = exchange(&router, &raw_request("GET", "/users/42", &[], None)).await;
        assert_eq!(status, 400);
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({"error": "Incorrect value for parameter id"})
        );
    }

    #[tokio::test]
    async fn test_repeated_header_is_joined_before_matching() {
        let router = routes(r#"{"/feed": {"headers": {"accept-language": "en, fr"}, "response": {"ok": true}}}"#);

        let (status, _) = exchange(
            &router,
            &raw_request("GET", "/feed", &[("Accept-Language", "en"), ("accept-language", "fr")], None),
        )
        .await;
        assert_eq!(status, 200);

        let (status, _) = exchange(&router, &raw_request("GET", "/feed", &[("Accept-Language", "en")], None)).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn test_unsupported_method_route_is_never_matched() {
        let router = routes(r#"{"/trace": {"method": "TRACE"}, "/ok": {}}"#);
        assert_eq!(router.len(), 1);

        let (status, _) = exchange(&router, &raw_request("GET", "/trace", &[], None)).await;
        assert_eq!(status, 404);
        let (status, _) = exchange(&router, &raw_request("GET", "/ok", &[], None)).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_missing_route_file_serves_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let server = build_server(ServerConfig::default(), load_routes(&dir.path().join("routes.json")));
        assert!(server.router.is_empty());

        let (status, body) = exchange(&server.router, &raw_request("GET", "/anything", &[], None)).await;
        assert_eq!(status, 404);
        assert_eq!(body, "Not found: /anything");
    }
}
