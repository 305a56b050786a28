// ==========================================
// 库存对账引擎 - 仓库经理账号开通
// ==========================================
// 阶段: ProvisioningUsers（仓库管线，逐行）
// 语义: get-or-create
//   1. 本次导入缓存命中 → 复用
//   2. 身份服务按邮箱查到 → 复用
//   3. 查不到 → 以随机占位密码创建
//      - 邮箱已被占用（并发竞争）→ 重新按邮箱查询
//      - 其他失败 / 超时 → 返回 Err，由调用方记为行级错误
//   4. 创建成功 → 尽力发送欢迎邮件（失败不影响账号）
// ==========================================

use crate::domain::warehouse::{ManagerUser, NewUser};
use crate::importer::reference_resolver::WarehouseResolutionContext;
use crate::logging::RunLog;
use crate::services::{
    templates, with_timeout, EmailMessage, IdentityService, NotificationService, ServiceError,
    ServiceResult,
};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::json;

/// 占位密码长度
pub const PLACEHOLDER_PASSWORD_LEN: usize = 16;

/// 开通结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// 复用已有账号（缓存或身份服务中已存在）
    Reused(String),
    /// 本次新建
    Created(String),
}

impl ProvisionOutcome {
    pub fn user_id(&self) -> &str {
        match self {
            ProvisionOutcome::Reused(id) | ProvisionOutcome::Created(id) => id,
        }
    }
}

/// 经理信息（来自仓库行）
#[derive(Debug, Clone, Copy)]
pub struct ManagerRequest<'r> {
    pub email: &'r str,
    pub name: Option<&'r str>,
    pub phone: Option<&'r str>,
}

/// 生成随机占位密码（字母数字）
pub fn generate_placeholder_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PLACEHOLDER_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

pub struct UserProvisioner<'a> {
    identity: &'a dyn IdentityService,
    notifier: &'a dyn NotificationService,
    manager_role: String,
    timeout_ms: u64,
}

impl<'a> UserProvisioner<'a> {
    pub fn new(
        identity: &'a dyn IdentityService,
        notifier: &'a dyn NotificationService,
        manager_role: String,
        timeout_ms: u64,
    ) -> Self {
        Self {
            identity,
            notifier,
            manager_role,
            timeout_ms,
        }
    }

    /// 获取或创建经理账号，并写入本次导入的邮箱缓存
    pub async fn get_or_create(
        &self,
        ctx: &mut WarehouseResolutionContext,
        request: ManagerRequest<'_>,
        run_log: &mut RunLog,
    ) -> ServiceResult<ProvisionOutcome> {
        let email = request.email;

        if let Some(id) = ctx.managers.get(email) {
            return Ok(ProvisionOutcome::Reused(id.clone()));
        }

        if let Some(user) = self.find_by_email(email).await? {
            ctx.managers.insert(email.to_string(), user.id.clone());
            return Ok(ProvisionOutcome::Reused(user.id));
        }

        let new_user = NewUser {
            name: request.name.unwrap_or(email).to_string(),
            email: email.to_string(),
            phone: request.phone.map(str::to_string),
            password: generate_placeholder_password(),
            role: self.manager_role.clone(),
        };

        match with_timeout(self.timeout_ms, self.identity.create_user(&new_user)).await {
            Ok(user) => {
                ctx.managers.insert(email.to_string(), user.id.clone());
                run_log.info(format!("已开通经理账号: {}", email));
                self.send_welcome(&new_user, run_log).await;
                Ok(ProvisionOutcome::Created(user.id))
            }
            Err(ServiceError::EmailInUse(_)) => {
                // 其他导入刚刚创建了同一账号，重新查询
                run_log.info(format!("经理邮箱已被占用，重新查询: {}", email));
                match self.find_by_email(email).await? {
                    Some(user) => {
                        ctx.managers.insert(email.to_string(), user.id.clone());
                        Ok(ProvisionOutcome::Reused(user.id))
                    }
                    None => Err(ServiceError::EmailInUse(email.to_string())),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<ManagerUser>> {
        with_timeout(self.timeout_ms, self.identity.find_user_by_email(email)).await
    }

    async fn send_welcome(&self, user: &NewUser, run_log: &mut RunLog) {
        let message = EmailMessage {
            to: vec![user.email.clone()],
            subject: "仓库经理账号已开通".to_string(),
            template: templates::WELCOME_MANAGER.to_string(),
            data: json!({
                "name": user.name,
                "email": user.email,
                "role": user.role,
                "temporaryPassword": user.password,
            }),
        };
        if let Err(e) = with_timeout(self.timeout_ms, self.notifier.send_email(&message)).await {
            run_log.warn(format!("欢迎邮件发送失败 ({}): {}", user.email, e));
        }
    }
}
