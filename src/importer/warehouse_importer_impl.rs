// ==========================================
// 库存对账引擎 - 仓库导入器实现
// ==========================================
// 流程: Ingesting → ResolvingReferences
//       → [ProvisioningUsers → Reconciling(i/N)]×N → Summarizing
// 行级: 静态校验失败、经理开通失败（含超时）→ 该行记错并跳过
// 致命: 文件格式错误、持久化错误
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import::{RowError, WarehouseFeedRow, WarehouseImportSummary};
use crate::domain::types::ImportStage;
use crate::importer::batch_reconciler::{BatchReconciler, StagedWarehouseBatch};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::{FieldMapper, WarehouseImporter};
use crate::importer::reference_resolver::ReferenceResolver;
use crate::importer::user_provisioner::{ManagerRequest, ProvisionOutcome, UserProvisioner};
use crate::logging::RunLog;
use crate::repository::WarehouseRepository;
use crate::services::{IdentityService, NotificationService};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// WarehouseImporterImpl - 仓库导入器
// ==========================================
pub struct WarehouseImporterImpl<R, C>
where
    R: WarehouseRepository,
    C: ImportConfigReader,
{
    repo: R,
    config: C,
    identity: Arc<dyn IdentityService>,
    notifier: Arc<dyn NotificationService>,
    file_parser: UniversalFileParser,
    field_mapper: Box<dyn FieldMapper>,
    log_dir: Option<PathBuf>,
}

impl<R, C> WarehouseImporterImpl<R, C>
where
    R: WarehouseRepository,
    C: ImportConfigReader,
{
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

    async fn run(
        &self,
        run_id: &str,
        file_path: &Path,
        declared_extension: &str,
        run_log: &mut RunLog,
    ) -> ImportResult<WarehouseImportSummary> {
        let start_time = Instant::now();
        let mut summary = WarehouseImportSummary {
            run_id: run_id.to_string(),
            ..Default::default()
        };

        // === Ingesting ===
        let raw_rows = self.file_parser.parse(file_path, declared_extension)?;
        summary.total_rows = raw_rows.len();
        run_log.info(format!("[{}] 读取 {} 行", ImportStage::Ingesting, raw_rows.len()));

        let rows: Vec<WarehouseFeedRow> = raw_rows
            .iter()
            .map(|row| self.field_mapper.map_warehouse_row(row))
            .collect();
        drop(raw_rows);

        let read_err = |e: Box<dyn std::error::Error + Send + Sync>| {
            ImportError::ConfigReadError(e.to_string())
        };
        let batch_size = self.config.get_batch_size().await.map_err(read_err)?.max(1);
        let timeout_ms = self.config.get_external_timeout_ms().await.map_err(read_err)?;
        let manager_role = self.config.get_manager_role().await.map_err(read_err)?;

        // === ResolvingReferences ===
        let stage = ImportStage::ResolvingReferences;
        let mut ctx = ReferenceResolver::resolve_warehouses(&self.repo, &rows)
            .await
            .map_err(ImportError::persistence(stage))?;
        summary.cities_created = ctx.cities_created;
        run_log.info(format!(
            "[{}] 新建城市 {}, 已知仓库 {}",
            stage,
            ctx.cities_created,
            ctx.warehouses.len()
        ));

        let provisioner = UserProvisioner::new(
            self.identity.as_ref(),
            self.notifier.as_ref(),
            manager_role,
            timeout_ms,
        );

        let total_batches = rows.len().div_ceil(batch_size);
        for (idx, chunk) in rows.chunks(batch_size).enumerate() {
            let stage = ImportStage::Reconciling {
                batch: idx + 1,
                total: total_batches,
            };
            let now = Utc::now();
            let mut batch = StagedWarehouseBatch::default();
            let mut errors: Vec<RowError> = Vec::new();

            // === ProvisioningUsers ===
            for row in chunk {
                let validated = match BatchReconciler::validate_warehouse_row(&ctx, row) {
                    Ok(v) => v,
                    Err(e) => {
                        errors.push(e);
                        continue;
                    }
                };

                let manager_id = match validated.manager_email.as_deref() {
                    None => None,
                    Some(email) => {
                        let request = ManagerRequest {
                            email,
                            name: row.manager_name.as_deref(),
                            phone: row.phone.as_deref(),
                        };
                        match provisioner.get_or_create(&mut ctx, request, run_log).await {
                            Ok(outcome) => {
                                match &outcome {
                                    ProvisionOutcome::Created(_) => summary.managers_created += 1,
                                    ProvisionOutcome::Reused(_) => summary.managers_reused += 1,
                                }
                                Some(outcome.user_id().to_string())
                            }
                            Err(e) => {
                                errors.push(RowError::new(
                                    row.row_number,
                                    Some(validated.warehouse_id.as_str()),
                                    format!("经理账号开通失败 ({}): {}", email, e),
                                ));
                                continue;
                            }
                        }
                    }
                };

                BatchReconciler::stage_warehouse(&mut ctx, &mut batch, row, validated, manager_id, now);
            }
            for err in &errors {
                run_log.warn(format!(
                    "[{}] 第 {} 行: {}",
                    ImportStage::ProvisioningUsers,
                    err.row,
                    err.message
                ));
            }

            // === Reconciling(i/N) ===
            let (created, updated) = BatchReconciler::persist_warehouses(&self.repo, batch)
                .await
                .map_err(ImportError::persistence(stage))?;
            summary.warehouses_created += created;
            summary.warehouses_updated += updated;
            run_log.info(format!(
                "[{}] 新建仓库 {}, 更新仓库 {}, 行错误 {}",
                stage,
                created,
                updated,
                errors.len()
            ));
            summary.error_details.extend(errors);
        }

        // === Summarizing ===
        summary.errors = summary.error_details.len();
        summary.elapsed_ms = start_time.elapsed().as_millis() as u64;
        run_log.info(format!(
            "[{}] 总行数 {}, 新建仓库 {}, 更新仓库 {}, 新建城市 {}, 新开经理 {}, 复用经理 {}, 错误 {}, 耗时 {} ms",
            ImportStage::Summarizing,
            summary.total_rows,
            summary.warehouses_created,
            summary.warehouses_updated,
            summary.cities_created,
            summary.managers_created,
            summary.managers_reused,
            summary.errors,
            summary.elapsed_ms
        ));

        Ok(summary)
    }
}

#[async_trait]
impl<R, C> WarehouseImporter for WarehouseImporterImpl<R, C>
where
    R: WarehouseRepository,
    C: ImportConfigReader,
{
    #[instrument(skip(self, file_path), fields(run_id = tracing::field::Empty))]
    async fn import_file(
        &self,
        file_path: &Path,
        declared_extension: &str,
    ) -> ImportResult<WarehouseImportSummary> {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let mut run_log = RunLog::open(self.log_dir.as_deref(), "warehouse", &run_id);
        run_log.info(format!(
            "开始仓库导入: file={}, ext={}",
            file_path.display(),
            declared_extension
        ));

        let result = self
            .run(&run_id, file_path, declared_extension, &mut run_log)
            .await;
        if let Err(e) = &result {
            run_log.error(format!("导入中止: {}", e));
        }
        result
    }
}
