// ==========================================
// 库存对账引擎 - 外部服务层
// ==========================================
// 职责: 身份服务 / 通知服务的端口定义与 HTTP 实现
// 约束: 每次外部调用都由调用方用 with_timeout 包裹
// ==========================================

pub mod error;
pub mod identity;
pub mod notification;

pub use error::{ServiceError, ServiceResult};
pub use identity::{HttpIdentityClient, IdentityService};
pub use notification::{templates, EmailMessage, HttpNotificationClient, NotificationService};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use std::future::Future;
use std::time::Duration;

/// 以超时包裹一次外部调用，超时映射为 ServiceError::Timeout
pub async fn with_timeout<T, F>(timeout_ms: u64, call: F) -> ServiceResult<T>
where
    F: Future<Output = ServiceResult<T>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout(timeout_ms)),
    }
}

/// 构建带 Bearer 令牌的 HTTP 客户端
pub(crate) fn build_client(token: &SecretString) -> ServiceResult<reqwest::Client> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|e| ServiceError::Parse(format!("令牌格式非法: {}", e)))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);

    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

/// 拼接接口地址（路径段逐个编码，邮箱等值可直接传入）
pub(crate) fn endpoint(base_url: &str, segments: &[&str]) -> ServiceResult<Url> {
    let mut url =
        Url::parse(base_url).map_err(|e| ServiceError::Parse(format!("{}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| ServiceError::Parse(format!("非法的服务地址: {}", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// 非 2xx 响应 → ServiceError::Api
pub(crate) async fn error_from_response(response: reqwest::Response) -> ServiceError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    ServiceError::Api { status, message }
}
