use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use stor::{CacheMetrics, Codec, JsonCodec, NoopMetrics, Store};

/// Extractor to access the [`Store`] from Axum handlers
pub struct Cache<C = JsonCodec, M = NoopMetrics>(pub Store<C, M>)
where
    C: Codec,
    M: CacheMetrics;

impl<State, C, M> FromRequestParts<State> for Cache<C, M>
where
    C: Codec,
    M: CacheMetrics,
    State: Send + Sync,
    Store<C, M>: FromRef<State>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &State) -> Result<Self, Self::Rejection> {
        Ok(Cache(Store::<C, M>::from_ref(state)))
    }
}

impl<C, M> std::ops::Deref for Cache<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    type Target = Store<C, M>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
