use async_trait::async_trait;
use domain::event::{AuthRequest, AuthResponse};
use domain::identity::{TokenError, TokenValidator};
use domain::CacheKey;
use harness::Service;
use library::cache::CacheStoreExt;
use library::communication::request::{Request, RequestProcessor, Responder};
use library::communication::CommunicationFactory;
use library::BoxedError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Validates access tokens using a [`TokenValidator`]
///
/// Consumes:
/// - [`AuthRequest`]
///
/// Responds with:
/// - [`AuthResponse`]
///
/// Every request is answered. Invalid or expired tokens are rejected, while a failing lookup is
/// answered as unavailable so callers can tell the two apart. Resolved identities are written to
/// the `user_profile` cache on the way out.
pub struct AuthenticationService<V, F: CommunicationFactory> {
    validator: Arc<V>,
    cache: <F as CommunicationFactory>::CacheStore,
    profile_ttl: Duration,
}

impl<V, F> Service<F> for AuthenticationService<V, F>
where
    V: TokenValidator + Send + Sync,
    F: CommunicationFactory + Send + Sync,
{
    const NAME: &'static str = "AuthenticationService";
    type Instance = Responder<
        AuthRequest,
        AuthenticationService<V, F>,
        <F as CommunicationFactory>::ResponsePublisher,
    >;

    type Config = (Arc<V>, Duration);

    fn instantiate(factory: F, config: &Self::Config) -> Self::Instance {
        let publisher = factory.response_publisher();
        let processor = Self {
            validator: config.0.clone(),
            cache: factory.cache_store(),
            profile_ttl: config.1,
        };

        Responder::new(processor, publisher)
    }
}

#[async_trait]
impl<V, F> RequestProcessor for AuthenticationService<V, F>
where
    V: TokenValidator + Send + Sync,
    F: CommunicationFactory + Send + Sync,
{
    type Request = AuthRequest;

    #[instrument(skip(self, request), fields(correlation_id = %request.correlation_id))]
    async fn process(
        &self,
        request: &Self::Request,
    ) -> Result<<Self::Request as Request>::Response, BoxedError> {
        let user = match self.validator.validate(&request.access_token).await {
            Ok(user) => user,
            Err(e @ TokenError::Lookup(_)) => {
                warn!(error = %e, "Token lookup failed");
                return Ok(AuthResponse::unavailable(
                    request.correlation_id.clone(),
                    e.to_string(),
                ));
            }
            Err(e) => {
                debug!(error = %e, "Token did not resolve");
                return Ok(request.reject(e.to_string()));
            }
        };

        let key = CacheKey::UserProfile(user.id).to_string();
        if let Err(e) = self.cache.set_json(&key, &user, self.profile_ttl).await {
            warn!(%key, error = %e, "Failed to refresh cached profile");
        }

        debug!(user = %user.id, "Token resolved");
        Ok(AuthResponse::accepted(request.correlation_id.clone(), user))
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use domain::identity::UserIdentity;
    use futures::StreamExt;
    use library::cache::CacheStore;
    use library::communication::event::{
        ConsumerExt, ConsumerGroupDescriptor, ConsumerGroupIdentifier, ConsumptionOptions,
        NotificationPublisher, QueueLocation,
    };
    use library::communication::implementation::memory::MemoryCommunicationFactory;
    use library::communication::request::{CorrelationId, ResponseCollector};
    use library::EmptyResult;
    use pretty_assertions::assert_eq;
    use tokio::task::JoinHandle;

    const PROFILE_TTL: Duration = Duration::from_secs(300);

    struct Directory;

    #[async_trait]
    impl TokenValidator for Directory {
        async fn validate(&self, token: &str) -> Result<UserIdentity, TokenError> {
            match token {
                "T1" => Ok(UserIdentity {
                    id: 7.into(),
                    username: "alice".into(),
                }),
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
            let config = (Arc::new(Directory), PROFILE_TTL);
            let responder = <AuthenticationService<Directory, MemoryCommunicationFactory> as Service<
                MemoryCommunicationFactory,
            >>::instantiate(factory, &config);

            responder
                .consume_queue(provider, &group, "identity-1", &ConsumptionOptions::default())
                .await
        })
    }

    async fn exchange(factory: &MemoryCommunicationFactory, token: &str) -> AuthResponse {
        let request = AuthRequest {
            correlation_id: CorrelationId::from("abc"),
            access_token: token.into(),
        };

        let mut replies = factory
            .broker()
            .subscribe::<AuthResponse>(&request.reply_to())
            .await
            .unwrap();

        factory.broker().publish(&request).await.unwrap();
        replies.next().await.unwrap().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn reply_with_identity_on_correlated_channel() {
        let factory = MemoryCommunicationFactory::default();
        let service = spawn_service(&factory);

        let reply = exchange(&factory, "T1").await;

        let alice = UserIdentity {
            id: 7.into(),
            username: "alice".into(),
        };
        assert_eq!(reply, AuthResponse::accepted("abc".into(), alice.clone()));
        assert_eq!(
            factory.cache().get_json::<UserIdentity>("user_profile:7").await.unwrap(),
            Some(alice)
        );

        service.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn reject_invalid_tokens() {
        let factory = MemoryCommunicationFactory::default();
        let service = spawn_service(&factory);

        assert_eq!(
            exchange(&factory, "forged").await,
            AuthResponse::rejected("abc".into(), "invalid token".into())
        );

        assert_eq!(factory.cache().get("user_profile:7").await.unwrap(), None);

        service.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn reply_unavailable_when_the_lookup_fails() {
        let factory = MemoryCommunicationFactory::default();
        let service = spawn_service(&factory);

        let reply = exchange(&factory, "offline").await;

        assert_eq!(
            reply,
            AuthResponse::unavailable("abc".into(), "identity lookup failed".into())
        );
        service.abort();
    }
}
