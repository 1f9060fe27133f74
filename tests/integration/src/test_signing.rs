//! Signing integration tests.

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use nimbus_auth::TIMESTAMP_HEADER;
    use nimbus_client::{ClientError, unpack_api_error};
    use nimbus_core::Context;
    use serde_json::{Value, json};

    use crate::{KEY_ID, TestServer, api_client, api_client_with_secret, json};

    #[tokio::test]
    async fn test_should_pass_server_signature_verification() {
        let server = TestServer::start(|_, _| json(StatusCode::OK, &json!({"items": []}))).await;
        let api = api_client(&server);

        let body: Value = api
            .get(&Context::background(), "projects/p1/vms")
            .await
            .unwrap();

        assert_eq!(body, json!({"items": []}));
        let received = server.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].target, "/v1/projects/p1/vms");
        assert_eq!(received[0].verified.as_deref(), Ok(KEY_ID));
        assert!(received[0].headers.contains_key(TIMESTAMP_HEADER));
        let authorization = received[0]
            .headers
            .get(http::header::AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(authorization.starts_with("Bearer 1.0:integration-key:"));
    }

    #[tokio::test]
    async fn test_should_verify_requests_with_unordered_escaped_query() {
        let server = TestServer::start(|_, _| json(StatusCode::OK, &json!({}))).await;
        let api = api_client(&server);

        let _: Value = api
            .get(
                &Context::background(),
                "vms?name=web%20server&tag=b&tag=a&filter=zone%3Deu-1",
            )
            .await
            .unwrap();

        let received = server.received();
        assert!(received[0].verified.is_ok(), "{:?}", received[0].verified);
    }

    #[tokio::test]
    async fn test_should_verify_signed_bodies_and_methods() {
        let server = TestServer::start(|received, _| {
            json(StatusCode::OK, &json!({"method": received.method.as_str()}))
        })
        .await;
        let api = api_client(&server);
        let ctx = Context::background();

        let created: Value = api
            .post(&ctx, "vms", &json!({"name": "web"}))
            .await
            .unwrap();
        let updated: Value = api
            .patch(&ctx, "vms/vm-1", &json!({"name": "api"}))
            .await
            .unwrap();
        let deleted: Value = api.delete(&ctx, "vms/vm-1").await.unwrap();

        assert_eq!(created["method"], "POST");
        assert_eq!(updated["method"], "PATCH");
        assert_eq!(deleted["method"], "DELETE");
        assert!(server.received().iter().all(|r| r.verified.is_ok()));
        assert_eq!(
            server.received()[0].body,
            bytes::Bytes::from_static(br#"{"name":"web"}"#)
        );
    }

    #[tokio::test]
    async fn test_should_reject_wrong_secret_without_retrying() {
        let server = TestServer::start(|_, _| json(StatusCode::OK, &json!({}))).await;
        // base64url("wrong-secret")
        let api = api_client_with_secret(&server, "d3Jvbmctc2VjcmV0");

        let err = api
            .get::<Value>(&Context::background(), "vms")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Api { status, .. } if status == StatusCode::UNAUTHORIZED
        ));
        assert_eq!(server.hits(), 1);
        assert_eq!(
            unpack_api_error(err).to_string(),
            "signature does not match"
        );
    }

    #[tokio::test]
    async fn test_should_not_send_with_undecodable_secret() {
        let server = TestServer::start(|_, _| json(StatusCode::OK, &json!({}))).await;
        let api = api_client_with_secret(&server, "not=base64url");

        let err = api
            .get::<Value>(&Context::background(), "vms")
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Signing(_)));
        assert_eq!(server.hits(), 0);
    }
}
