use domain::event::AuthRequest;
use domain::identity::UserIdentity;
use library::communication::request::{RequestError, Requestor};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

const BEARER_PREFIX: &str = "Bearer ";

/// Reasons a caller could not be authenticated
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The credentials were refused
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// No identity service answered in time
    #[error("identity service did not answer within {0:?}")]
    Timeout(Duration),
    /// The bus failed while exchanging the request or the identity service could not check the token
    #[error("identity service unable to answer")]
    Upstream(#[source] RequestError),
}

impl AuthenticationError {
    /// HTTP status code equivalent for surfacing the error to callers
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Timeout(_) => 503,
            Self::Upstream(_) => 502,
        }
    }
}

impl From<RequestError> for AuthenticationError {
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::Rejected(reason) => Self::Unauthorized(reason),
            RequestError::Timeout(bound) => Self::Timeout(bound),
            other => Self::Upstream(other),
        }
    }
}

/// Client side of the token validation exchange
///
/// Each call waits at most for the configured timeout.
#[derive(Clone)]
pub struct IdentityClient<R: Requestor> {
    requestor: R,
    timeout: Duration,
}

impl<R> IdentityClient<R>
where
    R: Requestor + Send + Sync,
{
    /// Creates a new client which gives up after `timeout`
    pub fn new(requestor: R, timeout: Duration) -> Self {
        Self { requestor, timeout }
    }

    /// Authenticates the value of an `Authorization` header
    ///
    /// Values not carrying a bearer token are refused without contacting the identity service.
    pub async fn authenticate(&self, authorization: &str) -> Result<UserIdentity, AuthenticationError> {
        let token = bearer_token(authorization)
            .ok_or_else(|| AuthenticationError::Unauthorized("missing bearer token".into()))?;

        self.validate_token(token).await
    }

    /// Resolves a raw access token into the identity it was issued to
    #[instrument(skip(self, token))]
    pub async fn validate_token(&self, token: &str) -> Result<UserIdentity, AuthenticationError> {
        let request = AuthRequest::new(token.to_owned());
        debug!(correlation_id = %request.correlation_id, "Requesting token validation");

        Ok(self.requestor.request(&request, self.timeout).await?)
    }
}

fn bearer_token(authorization: &str) -> Option<&str> {
    let token = authorization.strip_prefix(BEARER_PREFIX)?.trim();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod does {
    use super::super::AuthenticationService;
    use super::*;
    use async_trait::async_trait;
    use domain::identity::{TokenError, TokenValidator};
    use harness::Service;
    use library::communication::event::{
        ConsumerExt, ConsumerGroupDescriptor, ConsumerGroupIdentifier, ConsumptionOptions,
        QueueLocation,
    };
    use library::communication::implementation::memory::MemoryCommunicationFactory;
    use library::communication::CommunicationFactory;
    use library::EmptyResult;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::task::JoinHandle;
    use tokio::time::Instant;

    const BOUND: Duration = Duration::from_secs(5);

    struct Directory;

    #[async_trait]
    impl TokenValidator for Directory {
        async fn validate(&self, token: &str) -> Result<UserIdentity, TokenError> {
            match token {
                "T1" => Ok(UserIdentity {
                    id: 7.into(),
                    username: "alice".into(),
                }),
                "T2" => Ok(UserIdentity {
                    id: 8.into(),
                    username: "bob".into(),
                }),
                "stale" => Err(TokenError::Expired),
                "offline" => Err(TokenError::Lookup("directory unreachable".into())),
                _ => Err(TokenError::Invalid),
            }
        }
    }

    fn spawn_service(factory: &MemoryCommunicationFactory) -> JoinHandle<EmptyResult> {
        let factory = factory.clone();

        tokio::spawn(async move {
            let group = ConsumerGroupDescriptor::new(
                ConsumerGroupIdentifier::Identity,
                QueueLocation::Head,
            );
            let provider = factory.queue_provider();
            let config = (Arc::new(Directory), Duration::from_secs(300));
            let responder = <AuthenticationService<Directory, MemoryCommunicationFactory> as Service<
                MemoryCommunicationFactory,
            >>::instantiate(factory, &config);

            responder
                .consume_queue(provider, &group, "identity-1", &ConsumptionOptions::default())
                .await
        })
    }

    fn client(
        factory: &MemoryCommunicationFactory,
    ) -> IdentityClient<<MemoryCommunicationFactory as CommunicationFactory>::Requestor> {
        IdentityClient::new(factory.requestor(), BOUND)
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_valid_tokens_within_the_bound() {
        let factory = MemoryCommunicationFactory::default();
        let service = spawn_service(&factory);
        let start = Instant::now();

        let user = client(&factory).authenticate("Bearer T1").await.unwrap();

        assert_eq!(
            user,
            UserIdentity {
                id: 7.into(),
                username: "alice".into()
            }
        );
        assert!(start.elapsed() < BOUND);
        service.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn refuse_invalid_and_expired_tokens() {
        let factory = MemoryCommunicationFactory::default();
        let service = spawn_service(&factory);

        for token in ["forged", "stale"] {
            let error = client(&factory).validate_token(token).await.unwrap_err();

            assert!(matches!(error, AuthenticationError::Unauthorized(_)));
            assert_eq!(error.status_code(), 401);
        }

        service.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn report_failed_lookups_as_upstream_errors() {
        let factory = MemoryCommunicationFactory::default();
        let service = spawn_service(&factory);

        let error = client(&factory).validate_token("offline").await.unwrap_err();

        assert!(matches!(
            error,
            AuthenticationError::Upstream(RequestError::Unavailable(_))
        ));
        assert_eq!(error.status_code(), 502);
        service.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn keep_overlapping_validations_apart() {
        let factory = MemoryCommunicationFactory::default();
        let service = spawn_service(&factory);
        let client = client(&factory);

        let (alice, bob, forged) = futures::join!(
            client.validate_token("T1"),
            client.validate_token("T2"),
            client.validate_token("forged")
        );

        assert_eq!(alice.unwrap().username, "alice");
        assert_eq!(
            bob.unwrap(),
            UserIdentity {
                id: 8.into(),
                username: "bob".into()
            }
        );
        assert!(matches!(forged, Err(AuthenticationError::Unauthorized(_))));
        service.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn time_out_at_the_bound_without_identity_service() {
        let factory = MemoryCommunicationFactory::default();
        let start = Instant::now();

        let error = client(&factory).validate_token("T1").await.unwrap_err();

        assert!(matches!(error, AuthenticationError::Timeout(bound) if bound == BOUND));
        assert_eq!(start.elapsed(), BOUND);
        assert_eq!(error.status_code(), 503);
    }

    #[tokio::test(start_paused = true)]
    async fn refuse_malformed_headers_locally() {
        let factory = MemoryCommunicationFactory::default();

        for header in ["T1", "Basic dXNlcjpwdw==", "Bearer ", "bearer T1"] {
            let error = client(&factory).authenticate(header).await.unwrap_err();
            assert!(matches!(error, AuthenticationError::Unauthorized(_)));
        }

        assert_eq!(factory.broker().retained_count("auth_request").await, 0);
    }

    #[test]
    fn extract_bearer_tokens() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Token abc"), None);
    }
}
