// ==========================================
// 服装批次流转系统 - 结算单仓储
// ==========================================
// 红线: 开单是单事务 (单号派生 + 结算单 + 关联 + 批次置已结算 + 历史),
//       任一步失败整体回滚, 保证"一个批次至多结算一次"
// 单号唯一索引 + 有限重试兜底并发下的单号竞争
// ==========================================

use crate::domain::history::HistoryEntry;
use crate::domain::invoice::{Invoice, InvoiceBatchLink};
use crate::domain::types::{HistoryAction, InvoiceStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

/// 单号冲突重试上限
const NUMBER_RETRY_LIMIT: u32 = 3;

/// 开单参数（单号序号与ID由仓储派生）
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub workshop_id: String,
    /// 单号前缀, 形如 "COS-150825-"（车间三字母 + 开单日 DDMMYY）
    pub number_prefix: String,
    /// 序号起始值（同前缀下首张结算单的序号）
    pub sequence_base: i64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub total_amount: f64,
    pub notes: Option<String>,
    /// 纳入结算的批次及其估值快照
    pub links: Vec<(String, f64)>,
    /// 历史记录操作人
    pub user_id: String,
}

// ==========================================
// InvoiceRepository - 结算单仓储
// ==========================================
pub struct InvoiceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InvoiceRepository {
    /// 创建新的结算单仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<Invoice> {
        let status_str: String = row.get("status")?;
        let status = InvoiceStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("未知结算单状态: {}", status_str).into(),
            )
        })?;

        Ok(Invoice {
            invoice_id: row.get("invoice_id")?,
            workshop_id: row.get("workshop_id")?,
            invoice_number: row.get("invoice_number")?,
            issue_date: row.get("issue_date")?,
            due_date: row.get("due_date")?,
            total_amount: row.get("total_amount")?,
            status,
            paid_date: row.get("paid_date")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }

    const SELECT_COLS: &'static str = r#"
        SELECT invoice_id, workshop_id, invoice_number, issue_date, due_date,
               total_amount, status, paid_date, notes, created_at
        FROM invoice
    "#;

    // ==========================================
    // 单号派生
    // ==========================================

    /// 同前缀下的下一个序号（事务内调用）
    ///
    /// 规则: 已有单号取最大序号 + 1, 无则取 sequence_base
    fn next_sequence(
        conn: &Connection,
        number_prefix: &str,
        sequence_base: i64,
    ) -> RepositoryResult<i64> {
        let max_seq: Option<i64> = conn.query_row(
            r#"
            SELECT MAX(CAST(substr(invoice_number, length(?1) + 1) AS INTEGER))
            FROM invoice
            WHERE invoice_number LIKE ?1 || '%'
            "#,
            params![number_prefix],
            |row| row.get(0),
        )?;

        Ok(match max_seq {
            Some(n) => n + 1,
            None => sequence_base,
        })
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 开单（单事务）
    ///
    /// 事务步骤:
    /// 1. 校验每个批次存在、属于目标车间、未结算（锁内权威校验）
    /// 2. 派生单号序号, 插入结算单
    /// 3. 插入批次关联（含估值快照）
    /// 4. 批次 paid 置 1
    /// 5. 每个批次落一条 INVOICED 历史
    ///
    /// 单号唯一索引冲突时整体重试（上限 3 次）, 不向调用方暴露竞争
    pub fn create_invoice(&self, draft: &InvoiceDraft) -> RepositoryResult<Invoice> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_create_invoice(draft) {
                Err(RepositoryError::UniqueConstraintViolation(msg))
                    if attempt < NUMBER_RETRY_LIMIT =>
                {
                    tracing::warn!(
                        attempt,
                        prefix = %draft.number_prefix,
                        "结算单号冲突, 重试: {}",
                        msg
                    );
                    continue;
                }
                other => return other,
            }
        }
    }

    fn try_create_invoice(&self, draft: &InvoiceDraft) -> RepositoryResult<Invoice> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        // 锁内权威校验: 批次存在、归属、未结算
        for (batch_id, _) in &draft.links {
            let (workshop_id, paid): (Option<String>, i64) = tx
                .query_row(
                    "SELECT workshop_id, paid FROM batch WHERE batch_id = ?",
                    params![batch_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                        entity: "Batch".to_string(),
                        id: batch_id.clone(),
                    },
                    other => other.into(),
                })?;
            if workshop_id.as_deref() != Some(draft.workshop_id.as_str()) {
                return Err(RepositoryError::BusinessRuleViolation(format!(
                    "批次不属于目标车间: batch_id={}, workshop_id={}",
                    batch_id, draft.workshop_id
                )));
            }
            if paid != 0 {
                return Err(RepositoryError::BusinessRuleViolation(format!(
                    "批次已结算, 不可重复开单: batch_id={}",
                    batch_id
                )));
            }
        }

        let sequence = Self::next_sequence(&tx, &draft.number_prefix, draft.sequence_base)?;
        let invoice_number = format!("{}{}", draft.number_prefix, sequence);
        let invoice_id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Local::now().naive_local();

        tx.execute(
            r#"
            INSERT INTO invoice (
                invoice_id, workshop_id, invoice_number, issue_date, due_date,
                total_amount, status, paid_date, notes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, 'PENDING', NULL, ?, ?)
            "#,
            params![
                invoice_id,
                draft.workshop_id,
                invoice_number,
                draft.issue_date.format("%Y-%m-%d").to_string(),
                draft.due_date.format("%Y-%m-%d").to_string(),
                draft.total_amount,
                draft.notes,
                created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        for (batch_id, amount) in &draft.links {
            tx.execute(
                "INSERT INTO invoice_batch_link (invoice_id, batch_id, amount) VALUES (?, ?, ?)",
                params![invoice_id, batch_id, amount],
            )?;

            tx.execute(
                "UPDATE batch SET paid = 1 WHERE batch_id = ?",
                params![batch_id],
            )?;

            let entry = HistoryEntry::new(
                batch_id.clone(),
                HistoryAction::Invoiced,
                draft.user_id.clone(),
                Some(format!("结算单 {} 金额 {:.2}", invoice_number, amount)),
            );
            tx.execute(
                r#"
                INSERT INTO batch_history (entry_id, batch_id, action, user_id, logged_at, notes)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![
                    entry.entry_id,
                    entry.batch_id,
                    entry.action.to_string(),
                    entry.user_id,
                    entry.logged_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    entry.notes,
                ],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(Invoice {
            invoice_id,
            workshop_id: draft.workshop_id.clone(),
            invoice_number,
            issue_date: draft.issue_date,
            due_date: draft.due_date,
            total_amount: draft.total_amount,
            status: InvoiceStatus::Pending,
            paid_date: None,
            notes: draft.notes.clone(),
            created_at,
        })
    }

    /// 标记结算单已付款（不触碰总额与关联）
    pub fn mark_paid(&self, invoice_id: &str, paid_date: NaiveDate) -> RepositoryResult<Invoice> {
        {
            let conn = self.get_conn()?;
            let rows = conn.execute(
                "UPDATE invoice SET status = 'PAID', paid_date = ? WHERE invoice_id = ?",
                params![paid_date.format("%Y-%m-%d").to_string(), invoice_id],
            )?;
            if rows == 0 {
                return Err(RepositoryError::NotFound {
                    entity: "Invoice".to_string(),
                    id: invoice_id.to_string(),
                });
            }
        }
        self.get(invoice_id)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按ID查结算单
    pub fn get(&self, invoice_id: &str) -> RepositoryResult<Invoice> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE invoice_id = ?", Self::SELECT_COLS);
        conn.query_row(&sql, params![invoice_id], Self::map_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                    entity: "Invoice".to_string(),
                    id: invoice_id.to_string(),
                },
                other => other.into(),
            })
    }

    /// 列出结算单（可按车间过滤, 按开单日期降序）
    pub fn list(&self, workshop_id: Option<&str>) -> RepositoryResult<Vec<Invoice>> {
        let conn = self.get_conn()?;
        let invoices = match workshop_id {
            Some(w) => {
                let sql = format!(
                    "{} WHERE workshop_id = ? ORDER BY issue_date DESC, invoice_number DESC",
                    Self::SELECT_COLS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![w], Self::map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "{} ORDER BY issue_date DESC, invoice_number DESC",
                    Self::SELECT_COLS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], Self::map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(invoices)
    }

    /// 查询结算单的批次关联（打印/导出协作方只读消费）
    pub fn get_links(&self, invoice_id: &str) -> RepositoryResult<Vec<InvoiceBatchLink>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT invoice_id, batch_id, amount
            FROM invoice_batch_link
            WHERE invoice_id = ?
            ORDER BY batch_id ASC
            "#,
        )?;
        let links = stmt
            .query_map(params![invoice_id], |row| {
                Ok(InvoiceBatchLink {
                    invoice_id: row.get("invoice_id")?,
                    batch_id: row.get("batch_id")?,
                    amount: row.get("amount")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }
}
