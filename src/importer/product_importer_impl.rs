// ==========================================
// 库存对账引擎 - 商品库存导入器实现
// ==========================================
// 职责: 串联商品管线各阶段，累计计数与行级错误，返回汇总
// 流程: Ingesting → ResolvingReferences → Reconciling(i/N)
//       → PersistingLedger → DispatchingAlerts → Summarizing
// 致命: 文件格式错误、阶段内持久化错误（已提交的分块不回滚）
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import::{ProductFeedRow, ProductImportSummary};
use crate::domain::types::ImportStage;
use crate::importer::alert_dispatcher::AlertDispatcher;
use crate::importer::batch_reconciler::BatchReconciler;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::{FieldMapper, ProductImporter};
use crate::importer::ledger_recorder::{LedgerPolicy, LedgerRecorder};
use crate::importer::reference_resolver::ReferenceResolver;
use crate::logging::RunLog;
use crate::repository::CatalogRepository;
use crate::services::{IdentityService, NotificationService};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// 运行期参数（每次导入开始时从配置读取一次）
struct RunSettings {
    batch_size: usize,
    timeout_ms: u64,
    dispatcher_role: String,
    ledger_policy: LedgerPolicy,
}

// ==========================================
// ProductImporterImpl - 商品库存导入器
// ==========================================
pub struct ProductImporterImpl<R, C>
where
    R: CatalogRepository,
    C: ImportConfigReader,
{
    // 数据访问层
    repo: R,

    // 配置读取器
    config: C,

    // 外部服务
    identity: Arc<dyn IdentityService>,
    notifier: Arc<dyn NotificationService>,

    // 导入组件
    file_parser: UniversalFileParser,
    field_mapper: Box<dyn FieldMapper>,

    // 单次导入日志目录（None 表示仅 tracing）
    log_dir: Option<PathBuf>,
}

impl<R, C> ProductImporterImpl<R, C>
where
    R: CatalogRepository,
    C: ImportConfigReader,
{
    /// 创建新的 ProductImporter 实例
    ///
    /// # 参数
    /// - repo: 商品目录仓储
    /// - config: 配置读取器
    /// - identity: 身份服务（查询调度员）
    /// - notifier: 通知服务（发送告警邮件）
    /// - field_mapper: 字段映射器
    /// - log_dir: 单次导入日志目录
    pub fn new(
        repo: R,
        config: C,
        identity: Arc<dyn IdentityService>,
        notifier: Arc<dyn NotificationService>,
        field_mapper: Box<dyn FieldMapper>,
        log_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            repo,
            config,
            identity,
            notifier,
            file_parser: UniversalFileParser,
            field_mapper,
            log_dir,
        }
    }

    async fn load_settings(&self) -> ImportResult<RunSettings> {
        let read_err = |e: Box<dyn std::error::Error + Send + Sync>| {
            ImportError::ConfigReadError(e.to_string())
        };
        Ok(RunSettings {
            batch_size: self.config.get_batch_size().await.map_err(read_err)?.max(1),
            timeout_ms: self.config.get_external_timeout_ms().await.map_err(read_err)?,
            dispatcher_role: self.config.get_dispatcher_role().await.map_err(read_err)?,
            ledger_policy: LedgerPolicy {
                record_unchanged_updates: self
                    .config
                    .get_record_unchanged_updates()
                    .await
                    .map_err(read_err)?,
            },
        })
    }

    async fn run(
        &self,
        run_id: &str,
        file_path: &Path,
        declared_extension: &str,
        run_log: &mut RunLog,
    ) -> ImportResult<ProductImportSummary> {
        let start_time = Instant::now();
        let mut summary = ProductImportSummary {
            run_id: run_id.to_string(),
            ..Default::default()
        };

        // === Ingesting ===
        let raw_rows = self.file_parser.parse(file_path, declared_extension)?;
        summary.total_rows = raw_rows.len();
        run_log.info(format!("[{}] 读取 {} 行", ImportStage::Ingesting, raw_rows.len()));

        let rows: Vec<ProductFeedRow> = raw_rows
            .iter()
            .map(|row| self.field_mapper.map_product_row(row))
            .collect();
        drop(raw_rows);

        let settings = self.load_settings().await?;

        // === ResolvingReferences ===
        let stage = ImportStage::ResolvingReferences;
        let mut ctx = ReferenceResolver::resolve_catalog(&self.repo, &rows)
            .await
            .map_err(ImportError::persistence(stage))?;
        summary.suppliers_created = ctx.suppliers_created;
        summary.categories_created = ctx.categories_created;
        run_log.info(format!(
            "[{}] 新建供应商 {}, 新建分类 {}, 已知仓库 {}, 已知库存记录 {}",
            stage,
            ctx.suppliers_created,
            ctx.categories_created,
            ctx.warehouses.len(),
            ctx.stocks.len()
        ));

        // === Reconciling(i/N) ===
        let total_batches = rows.len().div_ceil(settings.batch_size);
        for (idx, chunk) in rows.chunks(settings.batch_size).enumerate() {
            let stage = ImportStage::Reconciling {
                batch: idx + 1,
                total: total_batches,
            };
            let now = Utc::now();
            let staged = BatchReconciler::stage_products(&mut ctx, chunk, now.date_naive(), now);
            for err in &staged.errors {
                run_log.warn(format!(
                    "[{}] 第 {} 行: {}",
                    stage, err.row, err.message
                ));
            }

            let counts = BatchReconciler::persist_products(&self.repo, &mut ctx, &staged)
                .await
                .map_err(ImportError::persistence(stage))?;
            summary.products_created += counts.products_created;
            summary.stocks_created += counts.stocks_created;
            summary.stocks_updated += counts.stocks_updated;
            summary.associations_created += counts.associations_created;

            run_log.info(format!(
                "[{}] 新建商品 {}, 新建库存 {}, 更新库存 {}, 行错误 {}",
                stage,
                counts.products_created,
                counts.stocks_created,
                counts.stocks_updated,
                staged.errors.len()
            ));

            // === PersistingLedger ===
            // 流水随本批提交
            let movements =
                LedgerRecorder::derive(&ctx, &staged, settings.ledger_policy, run_id, now);
            let recorded = LedgerRecorder::persist(&self.repo, movements, settings.batch_size)
                .await
                .map_err(ImportError::persistence(ImportStage::PersistingLedger))?;
            summary.movements_recorded += recorded;
            run_log.info(format!(
                "[{}] 批次 {}/{} 写入流水 {} 条",
                ImportStage::PersistingLedger,
                idx + 1,
                total_batches,
                recorded
            ));
            summary.error_details.extend(staged.errors);
        }

        // === DispatchingAlerts ===
        let alerts = AlertDispatcher::collect(&ctx);
        summary.low_stock_alerts = alerts.len();
        if !alerts.is_empty() {
            run_log.info(format!(
                "[{}] 低库存告警 {} 条",
                ImportStage::DispatchingAlerts,
                alerts.len()
            ));
            let dispatcher = AlertDispatcher::new(
                self.identity.as_ref(),
                self.notifier.as_ref(),
                settings.dispatcher_role.clone(),
                settings.timeout_ms,
            );
            summary.alerts_notified = dispatcher.dispatch(run_id, &alerts, run_log).await;
        }

        // === Summarizing ===
        summary.errors = summary.error_details.len();
        summary.elapsed_ms = start_time.elapsed().as_millis() as u64;
        run_log.info(format!(
            "[{}] 总行数 {}, 新建商品 {}, 新建库存 {}, 更新库存 {}, 流水 {}, 告警 {}, 错误 {}, 耗时 {} ms",
            ImportStage::Summarizing,
            summary.total_rows,
            summary.products_created,
            summary.stocks_created,
            summary.stocks_updated,
            summary.movements_recorded,
            summary.low_stock_alerts,
            summary.errors,
            summary.elapsed_ms
        ));

        Ok(summary)
    }
}

#[async_trait]
impl<R, C> ProductImporter for ProductImporterImpl<R, C>
where
    R: CatalogRepository,
    C: ImportConfigReader,
{
    #[instrument(skip(self, file_path), fields(run_id = tracing::field::Empty))]
    async fn import_file(
        &self,
        file_path: &Path,
        declared_extension: &str,
    ) -> ImportResult<ProductImportSummary> {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let mut run_log = RunLog::open(self.log_dir.as_deref(), "product", &run_id);
        run_log.info(format!(
            "开始商品库存导入: file={}, ext={}",
            file_path.display(),
            declared_extension
        ));

        match self
            .run(&run_id, file_path, declared_extension, &mut run_log)
            .await
        {
            Ok(summary) => Ok(summary),
            Err(e) => {
                run_log.error(format!("导入中止: {}", e));
                Err(e)
            }
        }
    }
}
