//! DevTokenIssuer - 開発用のトークン発行
//!
//! 署名はしません。claims を JSON にしただけの文字列を返します。
//! 本番では control plane の署名付きトークン発行に差し替えます。

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::errors::DispatchError;
use crate::domain::ids::{JobId, PlatformId, ProjectId};
use crate::domain::wire::Credential;
use crate::ports::{Clock, TokenIssuer};

const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Serialize)]
struct Claims<'a> {
    sub: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<&'a str>,
    platform_id: &'a str,
    iat: i64,
    exp: i64,
    jti: String,
}

pub struct DevTokenIssuer<C> {
    clock: C,
    ttl: Duration,
}

impl<C: Clock> DevTokenIssuer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[async_trait]
impl<C: Clock> TokenIssuer for DevTokenIssuer<C> {
    async fn issue(
        &self,
        job_id: &JobId,
        project_id: Option<&ProjectId>,
        platform_id: &PlatformId,
    ) -> Result<Credential, DispatchError> {
        let iat = self.clock.now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs())
            .map_err(|_| DispatchError::TokenIssuance(format!("ttl out of range: {:?}", self.ttl)))?;
        let claims = Claims {
            sub: job_id.as_str(),
            project_id: project_id.map(ProjectId::as_str),
            platform_id: platform_id.as_str(),
            iat,
            exp: iat.saturating_add(ttl),
            jti: format!("{:016x}", rand::random::<u64>()),
        };
        let token = serde_json::to_string(&claims)
            .map_err(|e| DispatchError::TokenIssuance(e.to_string()))?;
        Ok(Credential::new(token))
    }
}
