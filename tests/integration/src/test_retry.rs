//! Retry integration tests.

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use nimbus_client::{ClientError, ReqwestTransport, TransportErrorKind, unpack_api_error};
    use nimbus_core::Context;
    use serde_json::{Value, json};

    use crate::{TestServer, api_client, json, status};

    #[tokio::test]
    async fn test_should_recover_from_transient_server_errors() {
        let server = TestServer::start(|_, index| match index {
            0 => status(StatusCode::SERVICE_UNAVAILABLE),
            1 => status(StatusCode::BAD_GATEWAY),
            _ => json(StatusCode::OK, &json!({"id": "vm-1"})),
        })
        .await;
        let api = api_client(&server);

        let vm: Value = api.get(&Context::background(), "vms/vm-1").await.unwrap();

        assert_eq!(vm["id"], "vm-1");
        assert_eq!(server.hits(), 3);
        // Every attempt is signed afresh and verifies.
        assert!(server.received().iter().all(|r| r.verified.is_ok()));
    }

    #[tokio::test]
    async fn test_should_give_up_after_retry_budget() {
        let server = TestServer::start(|_, _| status(StatusCode::INTERNAL_SERVER_ERROR)).await;
        let api = api_client(&server);

        let err = api
            .get::<Value>(&Context::background(), "vms")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn test_should_never_retry_post() {
        let server = TestServer::start(|_, _| status(StatusCode::SERVICE_UNAVAILABLE)).await;
        let api = api_client(&server);

        let err = api
            .post::<_, Value>(&Context::background(), "vms", &json!({"name": "web"}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Api { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE
        ));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_should_retry_rate_limited_requests_after_hint() {
        let server = TestServer::start(|_, index| {
            if index == 0 {
                let mut response = status(StatusCode::TOO_MANY_REQUESTS);
                response
                    .headers_mut()
                    .insert(http::header::RETRY_AFTER, http::HeaderValue::from_static("0"));
                response
            } else {
                json(StatusCode::OK, &json!([]))
            }
        })
        .await;
        let api = api_client(&server);

        let list: Value = api.get(&Context::background(), "vms").await.unwrap();

        assert_eq!(list, json!([]));
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn test_should_not_retry_not_implemented() {
        let server = TestServer::start(|_, _| status(StatusCode::NOT_IMPLEMENTED)).await;
        let api = api_client(&server);

        let err = api
            .get::<Value>(&Context::background(), "vms")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Api { status, .. } if status == StatusCode::NOT_IMPLEMENTED
        ));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_should_unpack_rpc_description_from_client_error() {
        let server = TestServer::start(|_, _| {
            json(
                StatusCode::BAD_REQUEST,
                &json!({
                    "code": "invalid_argument",
                    "message": "rpc error: code = InvalidArgument desc = vm name already taken"
                }),
            )
        })
        .await;
        let api = api_client(&server);

        let err = api
            .put::<_, Value>(&Context::background(), "vms/vm-1", &json!({"name": "web"}))
            .await
            .unwrap_err();

        assert_eq!(server.hits(), 1);
        assert_eq!(unpack_api_error(err).to_string(), "vm name already taken");
    }

    #[tokio::test]
    async fn test_should_not_retry_redirect_loop() {
        let server = TestServer::start(|received, _| {
            let mut response = status(StatusCode::FOUND);
            response.headers_mut().insert(
                http::header::LOCATION,
                http::HeaderValue::from_str(&received.target).unwrap(),
            );
            response
        })
        .await;
        let api = api_client(&server);

        let err = api
            .get::<Value>(&Context::background(), "vms/loop")
            .await
            .unwrap_err();

        let ClientError::Transport(err) = err else {
            panic!("expected transport error, got {err:?}");
        };
        assert_eq!(err.kind, TransportErrorKind::TooManyRedirects);
        assert_eq!(err.method, http::Method::GET);
        // One redirect chain only: a retry would start a second one.
        let hits = server.hits();
        assert!(hits > 1, "redirects were not followed: {hits}");
        assert!(hits <= ReqwestTransport::MAX_REDIRECTS + 1, "chain was retried: {hits}");
        assert!(server.received().iter().all(|r| r.verified.is_ok()));
    }

    #[tokio::test]
    async fn test_should_stop_retrying_when_cancelled() {
        let server = TestServer::start(|_, _| status(StatusCode::SERVICE_UNAVAILABLE)).await;
        let api = api_client(&server);
        let (ctx, handle) = Context::cancellable();
        handle.cancel();

        let err = api.get::<Value>(&ctx, "vms").await.unwrap_err();

        assert!(matches!(err, ClientError::Context(_)));
        assert_eq!(server.hits(), 0);
    }
}
