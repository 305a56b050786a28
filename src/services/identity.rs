// ==========================================
// 库存对账引擎 - 身份服务客户端
// ==========================================
// 接口:
// - GET  {base}/users/email/{email}  → 200 用户 | 404
// - POST {base}/users/               → 2xx 用户 | 409 邮箱已占用
// - GET  {base}/users/role/{role}    → 200 用户列表
// 认证: 服务间 Bearer 令牌
// ==========================================

use crate::domain::warehouse::{ManagerUser, NewUser};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::{build_client, endpoint, error_from_response};
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::SecretString;
use tracing::debug;

// ==========================================
// IdentityService Trait
// ==========================================
// 实现者: HttpIdentityClient；测试中使用记录型 Mock
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// 按邮箱查询用户（不存在返回 None）
    async fn find_user_by_email(&self, email: &str) -> ServiceResult<Option<ManagerUser>>;

    /// 创建用户
    ///
    /// # 错误
    /// - ServiceError::EmailInUse: 邮箱已被占用
    async fn create_user(&self, user: &NewUser) -> ServiceResult<ManagerUser>;

    /// 查询持有指定角色的全部用户
    async fn list_users_by_role(&self, role: &str) -> ServiceResult<Vec<ManagerUser>>;
}

// ==========================================
// HttpIdentityClient
// ==========================================
#[derive(Clone)]
pub struct HttpIdentityClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(base_url: &str, token: &SecretString) -> ServiceResult<Self> {
        Ok(Self {
            client: build_client(token)?,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl IdentityService for HttpIdentityClient {
    async fn find_user_by_email(&self, email: &str) -> ServiceResult<Option<ManagerUser>> {
        let url = endpoint(&self.base_url, &["users", "email", email])?;
        debug!(email = %email, "查询身份服务用户");

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let user = response
            .json::<ManagerUser>()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;
        Ok(Some(user))
    }

    async fn create_user(&self, user: &NewUser) -> ServiceResult<ManagerUser> {
        let url = endpoint(&self.base_url, &["users", ""])?;
        debug!(email = %user.email, role = %user.role, "身份服务创建用户");

        let response = self.client.post(url).json(user).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status == StatusCode::CONFLICT || message.to_lowercase().contains("already") {
                return Err(ServiceError::EmailInUse(user.email.clone()));
            }
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ManagerUser>()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))
    }

    async fn list_users_by_role(&self, role: &str) -> ServiceResult<Vec<ManagerUser>> {
        let url = endpoint(&self.base_url, &["users", "role", role])?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<Vec<ManagerUser>>()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))
    }
}
