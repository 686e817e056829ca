//! Hand-written unary client for the `playersync.PlayerStore` service.
//!
//! Mirrors the shape tonic's codegen would produce for the service, without
//! a build-time codegen step. Deadlines and retries are the store client's
//! concern, not this stub's.

use crate::wire;
use http::uri::PathAndQuery;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Response, Status};

type StdError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Thin gRPC stub over an established channel. Cloning is cheap; clones
/// share the underlying HTTP/2 connection.
#[derive(Debug, Clone)]
pub struct PlayerStoreClient {
    inner: Grpc<Channel>,
}

impl PlayerStoreClient {
    /// Connect lazily is not offered on purpose: the engine wants the
    /// connection error at startup, not on the first player read.
    pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
    where
        D: TryInto<Endpoint>,
        D::Error: Into<StdError>,
    {
        let channel = Endpoint::new(dst)?.connect().await?;
        Ok(Self::new(channel))
    }

    pub fn new(channel: Channel) -> Self {
        Self {
            inner: Grpc::new(channel),
        }
    }

    async fn ready(&mut self) -> Result<(), Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::unavailable(format!("store channel not ready: {e}")))
    }

    pub async fn get_player(
        &mut self,
        request: wire::GetPlayerRequest,
    ) -> Result<Response<wire::GetPlayerResponse>, Status> {
        self.ready().await?;
        let codec: ProstCodec<wire::GetPlayerRequest, wire::GetPlayerResponse> =
            ProstCodec::default();
        let path = PathAndQuery::from_static("/playersync.PlayerStore/GetPlayer");
        self.inner.unary(Request::new(request), path, codec).await
    }

    pub async fn get_player_by_name(
        &mut self,
        request: wire::GetPlayerByNameRequest,
    ) -> Result<Response<wire::GetPlayerResponse>, Status> {
        self.ready().await?;
        let codec: ProstCodec<wire::GetPlayerByNameRequest, wire::GetPlayerResponse> =
            ProstCodec::default();
        let path = PathAndQuery::from_static("/playersync.PlayerStore/GetPlayerByName");
        self.inner.unary(Request::new(request), path, codec).await
    }

    pub async fn upsert_player(
        &mut self,
        request: wire::UpsertPlayerRequest,
    ) -> Result<Response<wire::UpsertPlayerResponse>, Status> {
        self.ready().await?;
        let codec: ProstCodec<wire::UpsertPlayerRequest, wire::UpsertPlayerResponse> =
            ProstCodec::default();
        let path = PathAndQuery::from_static("/playersync.PlayerStore/UpsertPlayer");
        self.inner.unary(Request::new(request), path, codec).await
    }

    pub async fn delete_player(
        &mut self,
        request: wire::DeletePlayerRequest,
    ) -> Result<Response<wire::DeletePlayerResponse>, Status> {
        self.ready().await?;
        let codec: ProstCodec<wire::DeletePlayerRequest, wire::DeletePlayerResponse> =
            ProstCodec::default();
        let path = PathAndQuery::from_static("/playersync.PlayerStore/DeletePlayer");
        self.inner.unary(Request::new(request), path, codec).await
    }

    pub async fn list_by_attribute(
        &mut self,
        request: wire::ListByAttributeRequest,
    ) -> Result<Response<wire::ListByAttributeResponse>, Status> {
        self.ready().await?;
        let codec: ProstCodec<wire::ListByAttributeRequest, wire::ListByAttributeResponse> =
            ProstCodec::default();
        let path = PathAndQuery::from_static("/playersync.PlayerStore/ListByAttribute");
        self.inner.unary(Request::new(request), path, codec).await
    }
}
