// ==========================================
// 库存对账引擎 - 低库存告警
// ==========================================
// 阶段: DispatchingAlerts（全部分块完成后）
// 规则: 本次对账过的库存记录（取最终状态），
//       reorder_level != 0 且 stock_quantity <= reorder_level → 告警
// 发送: 查询调度员角色用户，汇总为一封表格邮件发送给全部调度员
// 红线: 尽力而为，查询/发送失败（含超时）只记录日志，不影响导入结果
// ==========================================

use crate::domain::catalog::LowStockAlert;
use crate::importer::reference_resolver::ProductResolutionContext;
use crate::logging::RunLog;
use crate::services::{templates, with_timeout, EmailMessage, IdentityService, NotificationService};
use serde_json::json;

pub struct AlertDispatcher<'a> {
    identity: &'a dyn IdentityService,
    notifier: &'a dyn NotificationService,
    dispatcher_role: String,
    timeout_ms: u64,
}

impl<'a> AlertDispatcher<'a> {
    pub fn new(
        identity: &'a dyn IdentityService,
        notifier: &'a dyn NotificationService,
        dispatcher_role: String,
        timeout_ms: u64,
    ) -> Self {
        Self {
            identity,
            notifier,
            dispatcher_role,
            timeout_ms,
        }
    }

    /// 评估本次对账过的库存，生成告警（按 (product, warehouse) 排序）
    pub fn collect(ctx: &ProductResolutionContext) -> Vec<LowStockAlert> {
        ctx.touched_stocks
            .iter()
            .filter_map(|key| ctx.stocks.get(key))
            .filter(|stock| stock.is_low_stock())
            .map(|stock| LowStockAlert {
                product_id: stock.product_id.clone(),
                warehouse_id: stock.warehouse_id.clone(),
                stock_quantity: stock.stock_quantity,
                reorder_level: stock.reorder_level,
            })
            .collect()
    }

    /// 发送汇总告警
    ///
    /// # 返回
    /// - true: 已成功发送给至少一位调度员
    /// - false: 无告警 / 无收件人 / 查询或发送失败
    pub async fn dispatch(
        &self,
        run_id: &str,
        alerts: &[LowStockAlert],
        run_log: &mut RunLog,
    ) -> bool {
        if alerts.is_empty() {
            return false;
        }

        let recipients = match with_timeout(
            self.timeout_ms,
            self.identity.list_users_by_role(&self.dispatcher_role),
        )
        .await
        {
            Ok(users) => users,
            Err(e) => {
                run_log.warn(format!(
                    "低库存告警: 查询 {} 角色用户失败: {}",
                    self.dispatcher_role, e
                ));
                return false;
            }
        };

        let to: Vec<String> = recipients.into_iter().map(|u| u.email).collect();
        if to.is_empty() {
            run_log.warn(format!(
                "低库存告警: 没有 {} 角色用户，{} 条告警未发送",
                self.dispatcher_role,
                alerts.len()
            ));
            return false;
        }

        let message = EmailMessage {
            to,
            subject: format!("低库存告警（{} 条）", alerts.len()),
            template: templates::LOW_STOCK.to_string(),
            data: json!({
                "runId": run_id,
                "count": alerts.len(),
                "alerts": alerts,
                "table": render_table(alerts),
            }),
        };

        match with_timeout(self.timeout_ms, self.notifier.send_email(&message)).await {
            Ok(()) => {
                run_log.info(format!(
                    "低库存告警已发送: {} 条告警, {} 位收件人",
                    alerts.len(),
                    message.to.len()
                ));
                true
            }
            Err(e) => {
                run_log.warn(format!("低库存告警发送失败: {}", e));
                false
            }
        }
    }
}

/// 告警表格（纯文本，邮件模板直接嵌入）
pub fn render_table(alerts: &[LowStockAlert]) -> String {
    let mut out = String::from("id_producto | id_almacen | cantidad_stock | nivel_reorden\n");
    for alert in alerts {
        out.push_str(&format!(
            "{} | {} | {} | {}\n",
            alert.product_id, alert.warehouse_id, alert.stock_quantity, alert.reorder_level
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{ProductWarehouseStock, StockKey};
    use chrono::NaiveDate;

    fn stock(product: &str, qty: i64, reorder: i64) -> ProductWarehouseStock {
        ProductWarehouseStock {
            id: Some(1),
            product_id: product.to_string(),
            warehouse_id: "W1".to_string(),
            stock_quantity: qty,
            reorder_level: reorder,
            last_restock: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expiration_date: NaiveDate::from_ymd_opt(9999, 12, 31).unwrap(),
            status: "activo".to_string(),
        }
    }

    #[test]
    fn test_collect_only_touched_low_stock() {
        let mut ctx = ProductResolutionContext::default();
        for (product, qty, reorder) in [("P1", 3, 10), ("P2", 30, 10), ("P3", 0, 0), ("P4", 1, 5)] {
            ctx.stocks
                .insert(StockKey::new(product, "W1"), stock(product, qty, reorder));
        }
        // P4 未在本次导入中出现
        for product in ["P1", "P2", "P3"] {
            ctx.touched_stocks.insert(StockKey::new(product, "W1"));
        }

        let alerts = AlertDispatcher::collect(&ctx);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].product_id, "P1");
        assert_eq!(alerts[0].stock_quantity, 3);
    }

    #[test]
    fn test_render_table() {
        let table = render_table(&[LowStockAlert {
            product_id: "P1".to_string(),
            warehouse_id: "W1".to_string(),
            stock_quantity: 3,
            reorder_level: 10,
        }]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "P1 | W1 | 3 | 10");
    }
}
