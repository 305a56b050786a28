// ==========================================
// 库存对账引擎 - 通知服务客户端
// ==========================================
// 接口: POST {base}/notifications/email
//       { to: [..], subject, template, data } → 2xx
// ==========================================

use crate::services::error::ServiceResult;
use crate::services::{build_client, endpoint, error_from_response};
use async_trait::async_trait;
use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;

/// 模板名
pub mod templates {
    pub const LOW_STOCK: &str = "low-stock-alert";
    pub const WELCOME_MANAGER: &str = "welcome-manager";
}

/// 模板邮件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub template: String,
    pub data: Value,
}

// ==========================================
// NotificationService Trait
// ==========================================
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> ServiceResult<()>;
}

// ==========================================
// HttpNotificationClient
// ==========================================
#[derive(Clone)]
pub struct HttpNotificationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotificationClient {
    pub fn new(base_url: &str, token: &SecretString) -> ServiceResult<Self> {
        Ok(Self {
            client: build_client(token)?,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl NotificationService for HttpNotificationClient {
    async fn send_email(&self, message: &EmailMessage) -> ServiceResult<()> {
        let url = endpoint(&self.base_url, &["notifications", "email"])?;

        let response = self.client.post(url).json(message).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}
