//! dial-in 구독 커넥터.
//!
//! `TelemetryConnector` 포트 구현. 코드 생성 없이 `tonic::client::Grpc`로
//! `CreateSubs` 서버 스트리밍 RPC를 직접 호출한다.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use telemon_core::config::DeviceConfig;
use telemon_core::error::CoreError;
use telemon_core::models::telemetry::{SubscriptionEncoding, SubscriptionSpec, TelemetryMessage};
use telemon_core::ports::connector::{TelemetryConnector, TelemetryStream};
use tonic::codec::Streaming;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::Endpoint;
use tracing::{debug, info, warn};

use super::error_mapping::{map_grpc_status_error, StreamPhase};
use crate::proto::dialin::{CreateSubsArgs, CreateSubsReply, CREATE_SUBS_PATH};

/// HTTP/2 keep-alive PING 간격
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);
/// keep-alive 응답 대기 시간
const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// 디바이스 로그인 정보 (요청 메타데이터로 전송)
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// gRPC dial-in 커넥터: `TelemetryConnector` 포트 구현
#[derive(Debug)]
pub struct GrpcDialInConnector {
    connect_timeout: Duration,
    credentials: Option<Credentials>,
    next_req_id: AtomicI64,
}

impl GrpcDialInConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            credentials: None,
            next_req_id: AtomicI64::new(1),
        }
    }

    /// 로그인 정보 설정
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// 디바이스 설정으로 생성
    pub fn from_device(device: &DeviceConfig) -> Self {
        let connector = Self::new(device.connect_timeout());
        match (&device.username, &device.password) {
            (Some(username), Some(password)) => connector.with_credentials(username, password),
            _ => connector,
        }
    }

    fn build_endpoint(&self, endpoint: &str, keep_alive: bool) -> Result<Endpoint, CoreError> {
        let mut ep = Endpoint::from_shared(normalize_endpoint(endpoint))
            .map_err(|e| CoreError::Connection(format!("잘못된 엔드포인트 '{endpoint}': {e}")))?
            .connect_timeout(self.connect_timeout);

        if keep_alive {
            ep = ep
                .http2_keep_alive_interval(KEEP_ALIVE_INTERVAL)
                .keep_alive_timeout(KEEP_ALIVE_TIMEOUT)
                .keep_alive_while_idle(true);
        }

        Ok(ep)
    }

    fn build_request(
        &self,
        subscription: &SubscriptionSpec,
    ) -> Result<tonic::Request<CreateSubsArgs>, CoreError> {
        let args = CreateSubsArgs {
            req_id: self.next_req_id.fetch_add(1, Ordering::Relaxed),
            encode: subscription.encoding.wire_code(),
            subidstr: subscription.subscription_id.clone(),
            qos: None,
            subscriptions: Vec::new(),
        };

        let mut request = tonic::Request::new(args);
        if let Some(credentials) = &self.credentials {
            let username: MetadataValue<Ascii> = credentials
                .username
                .parse()
                .map_err(|e| CoreError::Config(format!("username 메타데이터 변환 실패: {e}")))?;
            let password: MetadataValue<Ascii> = credentials
                .password
                .parse()
                .map_err(|e| CoreError::Config(format!("password 메타데이터 변환 실패: {e}")))?;
            request.metadata_mut().insert("username", username);
            request.metadata_mut().insert("password", password);
        }

        Ok(request)
    }

    /// 채널 연결 → 준비 → `CreateSubs` 호출
    async fn subscribe(
        &self,
        endpoint: &str,
        subscription: &SubscriptionSpec,
    ) -> Result<Streaming<CreateSubsReply>, CoreError> {
        let request = self.build_request(subscription)?;
        let channel = self
            .build_endpoint(endpoint, subscription.keep_alive)?
            .connect()
            .await
            .map_err(|e| CoreError::Connection(format!("gRPC 연결 실패 ({endpoint}): {e}")))?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready()
            .await
            .map_err(|e| CoreError::Connection(format!("gRPC 채널 준비 실패: {e}")))?;

        let codec = tonic_prost::ProstCodec::default();
        let path = PathAndQuery::from_static(CREATE_SUBS_PATH);

        debug!(
            endpoint,
            subscription = %subscription.subscription_id,
            "구독 요청"
        );
        let response = grpc
            .server_streaming(request, path, codec)
            .await
            .map_err(|status| {
                map_grpc_status_error("grpc subscribe", status, StreamPhase::Subscribe)
            })?;

        Ok(response.into_inner())
    }
}

/// 스킴 없는 `host:port`는 평문 HTTP/2로 간주
fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

#[async_trait]
impl TelemetryConnector for GrpcDialInConnector {
    async fn open(
        &self,
        endpoint: &str,
        subscription: &SubscriptionSpec,
    ) -> Result<Box<dyn TelemetryStream>, CoreError> {
        if subscription.encoding != SubscriptionEncoding::Gpb {
            warn!(
                encoding = %subscription.encoding,
                "GPB key-value 이외 인코딩 구독: 디코딩되지 않을 수 있음"
            );
        }

        // TCP 연결 뒤 HTTP/2 핸드셰이크나 구독 응답이 없는 피어도 같은 제한을 받는다
        let subscribe = self.subscribe(endpoint, subscription);
        let inner = tokio::time::timeout(self.connect_timeout, subscribe)
            .await
            .map_err(|_| {
                CoreError::Connection(format!(
                    "구독 수립 시간 초과 ({endpoint}, {}ms)",
                    self.connect_timeout.as_millis()
                ))
            })??;

        info!(
            endpoint,
            subscription = %subscription.subscription_id,
            "텔레메트리 스트림 수립"
        );

        Ok(Box::new(GrpcTelemetryStream::new(inner, subscription.encoding)))
    }
}

/// 구독 응답 스트림: `TelemetryStream` 포트 구현
///
/// 드롭되면 HTTP/2 스트림과 채널이 함께 해제된다.
pub struct GrpcTelemetryStream {
    inner: Streaming<CreateSubsReply>,
    encoding: SubscriptionEncoding,
    next_index: u64,
}

impl GrpcTelemetryStream {
    fn new(inner: Streaming<CreateSubsReply>, encoding: SubscriptionEncoding) -> Self {
        Self {
            inner,
            encoding,
            next_index: 0,
        }
    }
}

#[async_trait]
impl TelemetryStream for GrpcTelemetryStream {
    async fn next_message(&mut self) -> Result<Option<TelemetryMessage>, CoreError> {
        loop {
            let reply = match self.inner.message().await {
                Ok(Some(reply)) => reply,
                Ok(None) => return Ok(None),
                Err(status) => {
                    return Err(map_grpc_status_error(
                        "grpc stream",
                        status,
                        StreamPhase::Stream,
                    ))
                }
            };

            if !reply.errors.is_empty() {
                return Err(CoreError::ConnectionLost(format!(
                    "디바이스 구독 오류: {}",
                    reply.errors
                )));
            }
            // 데이터 없는 응답 (구독 확인 등)
            if reply.data.is_empty() {
                continue;
            }

            let message = TelemetryMessage::new(reply.data, self.encoding, self.next_index);
            self.next_index += 1;
            return Ok(Some(message));
        }
    }
}
