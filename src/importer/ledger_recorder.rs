// ==========================================
// 库存对账引擎 - 库存流水记录
// ==========================================
// 阶段: 每个分块落库后生成流水，PersistingLedger 阶段统一分块写入
// 规则:
// - CREATION: quantity = 新建数量
// - UPDATE:   quantity = 新数量 - 原数量（可为负，不做截断）
// - 数量未变化的 UPDATE 默认不记录；
//   record_unchanged_updates = true 时全部记录
// ==========================================

use crate::domain::catalog::{ProductWarehouseStock, StockMovement};
use crate::domain::types::MovementType;
use crate::importer::batch_reconciler::StagedBatch;
use crate::importer::reference_resolver::ProductResolutionContext;
use crate::repository::{CatalogRepository, RepositoryResult};
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

/// 流水记录策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerPolicy {
    pub record_unchanged_updates: bool,
}

pub struct LedgerRecorder;

impl LedgerRecorder {
    /// 为一个已落库的分块生成流水
    ///
    /// stock_id 取自解析上下文（新库存的 id 在落库后已回填）
    pub fn derive(
        ctx: &ProductResolutionContext,
        batch: &StagedBatch,
        policy: LedgerPolicy,
        run_id: &str,
        now: DateTime<Utc>,
    ) -> Vec<StockMovement> {
        let mut movements = Vec::with_capacity(batch.stock_creates.len() + batch.stock_updates.len());

        for stock in &batch.stock_creates {
            if let Some(stock_id) = Self::stock_id(ctx, stock) {
                movements.push(StockMovement {
                    id: Uuid::new_v4().to_string(),
                    stock_id,
                    product_id: stock.product_id.clone(),
                    warehouse_id: stock.warehouse_id.clone(),
                    movement_type: MovementType::Creation,
                    quantity: stock.stock_quantity,
                    resulting_stock: stock.stock_quantity,
                    note: format!("导入 {}: 新建库存记录", run_id),
                    created_at: now,
                });
            }
        }

        for update in &batch.stock_updates {
            let stock = &update.stock;
            let delta = stock.stock_quantity.saturating_sub(update.previous_quantity);
            if delta == 0 && !policy.record_unchanged_updates {
                continue;
            }
            if let Some(stock_id) = Self::stock_id(ctx, stock) {
                movements.push(StockMovement {
                    id: Uuid::new_v4().to_string(),
                    stock_id,
                    product_id: stock.product_id.clone(),
                    warehouse_id: stock.warehouse_id.clone(),
                    movement_type: MovementType::Update,
                    quantity: delta,
                    resulting_stock: stock.stock_quantity,
                    note: format!(
                        "导入 {}: 库存 {} → {}",
                        run_id, update.previous_quantity, stock.stock_quantity
                    ),
                    created_at: now,
                });
            }
        }

        movements
    }

    fn stock_id(ctx: &ProductResolutionContext, stock: &ProductWarehouseStock) -> Option<i64> {
        let id = stock
            .id
            .or_else(|| ctx.stocks.get(&stock.key()).and_then(|s| s.id));
        if id.is_none() {
            warn!(
                product_id = %stock.product_id,
                warehouse_id = %stock.warehouse_id,
                "库存记录缺少 id，跳过流水"
            );
        }
        id
    }

    /// 分块写入流水（与对账使用同一分块大小）
    ///
    /// # 返回
    /// - 写入的流水条数
    pub async fn persist<R>(
        repo: &R,
        movements: Vec<StockMovement>,
        batch_size: usize,
    ) -> RepositoryResult<usize>
    where
        R: CatalogRepository + ?Sized,
    {
        let mut recorded = 0;
        for chunk in movements.chunks(batch_size.max(1)) {
            recorded += repo.insert_movements(chunk.to_vec()).await?;
        }
        Ok(recorded)
    }
}
