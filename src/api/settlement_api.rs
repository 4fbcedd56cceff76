// ==========================================
// 服装批次流转系统 - 结算 API
// ==========================================
// 职责: 未结算批次查询、车间汇总、开单、标记付款
// 红线: 开单是单事务 (见 InvoiceRepository), 失败不留半成品;
//       总额开单时冻结, 之后工价变动不回溯
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator;
use crate::config::ConfigManager;
use crate::domain::batch::{Batch, BatchLineItem};
use crate::domain::catalog::{ProductCatalog, WorkshopDirectory};
use crate::domain::invoice::{Invoice, InvoiceBatchLink};
use crate::engine::settlement::{round2, SettlementEngine, WorkshopSummary};
use crate::repository::batch_repo::BatchRepository;
use crate::repository::invoice_repo::{InvoiceDraft, InvoiceRepository};

// ==========================================
// 请求/响应 DTO
// ==========================================

/// 开单请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateInvoiceRequest {
    pub workshop_id: String,
    pub batch_ids: Vec<String>,
    /// 应付日期; 缺省按配置账期从开单日推算
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub user_id: String,
}

/// 估值后的明细行（打印/导出协作方只读消费）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuatedLineItem {
    pub product_id: String,
    pub quantity: i64,
    pub selected_color: String,
    pub selected_size: String,
    pub unit_value: f64,
    pub line_total: f64,
}

/// 结算单内一个批次的明细视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceBatchView {
    pub batch_id: String,
    pub batch_code: String,
    pub amount: f64,
    pub line_items: Vec<ValuatedLineItem>,
}

/// 结算单完整视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub batches: Vec<InvoiceBatchView>,
}

// ==========================================
// SettlementApi - 结算 API
// ==========================================
pub struct SettlementApi {
    batch_repo: Arc<BatchRepository>,
    invoice_repo: Arc<InvoiceRepository>,
    catalog: Arc<dyn ProductCatalog>,
    directory: Arc<dyn WorkshopDirectory>,
    config: Arc<ConfigManager>,
}

impl SettlementApi {
    /// 创建新的 SettlementApi 实例
    pub fn new(
        batch_repo: Arc<BatchRepository>,
        invoice_repo: Arc<InvoiceRepository>,
        catalog: Arc<dyn ProductCatalog>,
        directory: Arc<dyn WorkshopDirectory>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            batch_repo,
            invoice_repo,
            catalog,
            directory,
            config,
        }
    }

    // ==========================================
    // 估值与查询
    // ==========================================

    /// 批次估值: Σ 件数 × 工价; 缺失工价按 0 计, 永不报错
    pub fn valuate_batch(&self, batch_id: &str) -> ApiResult<f64> {
        validator::require_id(batch_id, "批次ID")?;
        let items = self.batch_repo.get_line_items(batch_id)?;
        Ok(SettlementEngine::valuate_line_items(
            &items,
            self.catalog.as_ref(),
        ))
    }

    /// 车间未结算批次（裁剪日期在闭区间内, paid=false）
    pub fn get_unbilled_batches(
        &self,
        workshop_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ApiResult<Vec<Batch>> {
        validator::require_id(workshop_id, "车间ID")?;
        validator::validate_date_range(start, end)?;
        Ok(self.batch_repo.list_unbilled(workshop_id, start, end)?)
    }

    /// 全车间结算汇总（按车间排期顺序, 只读）
    ///
    /// 区间内没有批次的车间也会出现在汇总里 (计数为 0)
    pub fn get_workshop_summary(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ApiResult<Vec<WorkshopSummary>> {
        validator::validate_date_range(start, end)?;

        let mut summaries = Vec::new();
        for workshop in self.directory.list_workshops() {
            let batches =
                self.batch_repo
                    .list_by_workshop_in_range(&workshop.workshop_id, start, end)?;

            let mut pending = 0i64;
            let mut paid = 0i64;
            let mut unpaid_value = 0.0f64;
            for batch in &batches {
                if batch.paid {
                    paid += 1;
                } else {
                    pending += 1;
                    let items = self.batch_repo.get_line_items(&batch.batch_id)?;
                    unpaid_value +=
                        SettlementEngine::valuate_line_items(&items, self.catalog.as_ref());
                }
            }

            summaries.push(WorkshopSummary {
                workshop_id: workshop.workshop_id,
                workshop_name: workshop.name,
                pending_batch_count: pending,
                paid_batch_count: paid,
                total_unpaid_value: round2(unpaid_value),
            });
        }
        Ok(summaries)
    }

    // ==========================================
    // 开单
    // ==========================================

    /// 生成结算单
    ///
    /// 前置校验: 批次列表非空且无重复, 每个批次存在、属于目标车间、未结算;
    /// 之后进入仓储单事务 (单号派生 + 结算单 + 关联 + paid 置位 + 历史),
    /// 事务内会在锁下重做权威校验, 任一步失败整体回滚
    ///
    /// # 错误
    /// - InvalidInput: 批次列表为空/重复, 车间ID为空
    /// - NotFound: 批次或车间不存在
    /// - BillingConflict: 批次已结算或不属于目标车间
    #[instrument(skip(self, request), fields(
        workshop_id = %request.workshop_id,
        batch_count = request.batch_ids.len()
    ))]
    pub fn generate_invoice(&self, request: &GenerateInvoiceRequest) -> ApiResult<Invoice> {
        validator::require_id(&request.workshop_id, "车间ID")?;
        validator::require_id(&request.user_id, "操作人")?;
        if request.batch_ids.is_empty() {
            return Err(ApiError::InvalidInput(
                "开单批次列表不能为空".to_string(),
            ));
        }
        {
            let mut seen = std::collections::HashSet::new();
            for id in &request.batch_ids {
                if !seen.insert(id.as_str()) {
                    return Err(ApiError::InvalidInput(format!(
                        "开单批次列表存在重复: batch_id={}",
                        id
                    )));
                }
            }
        }

        let workshop = self
            .directory
            .get_workshop(&request.workshop_id)
            .ok_or_else(|| {
                ApiError::NotFound(format!("Workshop(id={})不存在", request.workshop_id))
            })?;

        // 友好预检: 归属与结算状态 (权威校验在事务内再做一次)
        let mut links: Vec<(String, f64)> = Vec::with_capacity(request.batch_ids.len());
        let mut total = 0.0f64;
        for batch_id in &request.batch_ids {
            let batch = self.batch_repo.get(batch_id)?;
            if batch.workshop_id.as_deref() != Some(request.workshop_id.as_str()) {
                return Err(ApiError::BillingConflict(format!(
                    "批次 {} 不属于车间 {}",
                    batch.code, workshop.name
                )));
            }
            if batch.paid {
                return Err(ApiError::BillingConflict(format!(
                    "批次 {} 已结算, 不可重复开单",
                    batch.code
                )));
            }

            let items = self.batch_repo.get_line_items(batch_id)?;
            let amount = SettlementEngine::valuate_line_items(&items, self.catalog.as_ref());
            total += amount;
            links.push((batch_id.clone(), amount));
        }

        let issue_date = chrono::Local::now().date_naive();
        let due_date = match request.due_date {
            Some(d) => d,
            None => {
                let days = self
                    .config
                    .default_due_days()
                    .map_err(|e| ApiError::InternalError(e.to_string()))?;
                issue_date + chrono::Duration::days(days)
            }
        };
        let sequence_base = self
            .config
            .invoice_sequence_base()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        let draft = InvoiceDraft {
            workshop_id: request.workshop_id.clone(),
            number_prefix: SettlementEngine::invoice_number_prefix(&workshop.name, issue_date),
            sequence_base,
            issue_date,
            due_date,
            total_amount: round2(total),
            notes: request.notes.clone(),
            links,
            user_id: request.user_id.clone(),
        };

        let invoice = self.invoice_repo.create_invoice(&draft)?;
        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            total_amount = invoice.total_amount,
            "结算单已生成"
        );
        Ok(invoice)
    }

    /// 标记结算单已付款（总额与关联不变）
    #[instrument(skip(self))]
    pub fn mark_invoice_paid(&self, invoice_id: &str) -> ApiResult<Invoice> {
        validator::require_id(invoice_id, "结算单ID")?;
        let paid_date = chrono::Local::now().date_naive();
        let invoice = self.invoice_repo.mark_paid(invoice_id, paid_date)?;
        info!(invoice_id, %paid_date, "结算单已标记付款");
        Ok(invoice)
    }

    // ==========================================
    // 结算单读取 (打印/导出协作方)
    // ==========================================

    /// 按ID查结算单
    pub fn get_invoice(&self, invoice_id: &str) -> ApiResult<Invoice> {
        validator::require_id(invoice_id, "结算单ID")?;
        Ok(self.invoice_repo.get(invoice_id)?)
    }

    /// 列出结算单（可按车间过滤）
    pub fn list_invoices(&self, workshop_id: Option<&str>) -> ApiResult<Vec<Invoice>> {
        Ok(self.invoice_repo.list(workshop_id)?)
    }

    /// 结算单批次关联
    pub fn get_invoice_links(&self, invoice_id: &str) -> ApiResult<Vec<InvoiceBatchLink>> {
        validator::require_id(invoice_id, "结算单ID")?;
        Ok(self.invoice_repo.get_links(invoice_id)?)
    }

    /// 结算单完整视图（含估值后的明细行, 供打印/导出只读消费）
    ///
    /// 注意: 明细行按当前工价估值展示, 而 amount/total_amount 是开单时
    /// 的冻结快照, 工价后续变动时两者允许不一致
    pub fn get_invoice_detail(&self, invoice_id: &str) -> ApiResult<InvoiceDetail> {
        let invoice = self.get_invoice(invoice_id)?;
        let links = self.invoice_repo.get_links(invoice_id)?;

        let mut batches = Vec::with_capacity(links.len());
        for link in links {
            let batch = self.batch_repo.get(&link.batch_id)?;
            let items = self.batch_repo.get_line_items(&link.batch_id)?;
            let line_items = items
                .into_iter()
                .map(|item: BatchLineItem| {
                    let unit = self
                        .catalog
                        .production_value(&item.product_id)
                        .unwrap_or(0.0);
                    ValuatedLineItem {
                        product_id: item.product_id,
                        quantity: item.quantity,
                        selected_color: item.selected_color,
                        selected_size: item.selected_size,
                        unit_value: unit,
                        line_total: round2(item.quantity as f64 * unit),
                    }
                })
                .collect();

            batches.push(InvoiceBatchView {
                batch_id: link.batch_id,
                batch_code: batch.code,
                amount: link.amount,
                line_items,
            });
        }

        Ok(InvoiceDetail { invoice, batches })
    }
}
