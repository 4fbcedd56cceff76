// ==========================================
// 服装批次流转系统 - 批次仓储
// ==========================================
// 红线: Repository 不做业务逻辑, 只做数据映射
// 例外: 批次编号派生必须与插入同事务, 否则重启/并发下会重号
// ==========================================

use crate::domain::batch::{Batch, BatchLineItem};
use crate::domain::history::HistoryEntry;
use crate::domain::types::BatchStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

/// 新批次的写入参数（编号与创建时间由仓储派生）
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub cut_date: NaiveDate,
    pub status: BatchStatus,
    pub workshop_id: Option<String>,
    pub expected_return_date: Option<NaiveDate>,
    pub observations: Option<String>,
    pub line_items: Vec<NewBatchLineItem>,
}

/// 新批次明细行
#[derive(Debug, Clone)]
pub struct NewBatchLineItem {
    pub product_id: String,
    pub quantity: i64,
    pub selected_color: String,
    pub selected_size: String,
}

// ==========================================
// BatchRepository - 批次仓储
// ==========================================
pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    /// 创建新的批次仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_row(row: &Row) -> rusqlite::Result<Batch> {
        let status_str: String = row.get("status")?;
        let status = BatchStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("未知批次状态: {}", status_str).into(),
            )
        })?;

        Ok(Batch {
            batch_id: row.get("batch_id")?,
            code: row.get("code")?,
            cut_date: row.get("cut_date")?,
            status,
            workshop_id: row.get("workshop_id")?,
            expected_return_date: row.get("expected_return_date")?,
            actual_return_date: row.get("actual_return_date")?,
            observations: row.get("observations")?,
            paid: row.get::<_, i64>("paid")? != 0,
            image_url: row.get("image_url")?,
            created_at: row.get("created_at")?,
        })
    }

    const SELECT_COLS: &'static str = r#"
        SELECT batch_id, code, cut_date, status, workshop_id,
               expected_return_date, actual_return_date, observations,
               paid, image_url, created_at
        FROM batch
    "#;

    // ==========================================
    // 编号派生
    // ==========================================

    /// 派生下一个批次编号（事务内调用）
    ///
    /// 规则: 现有纯数字编号的最大值 + 1, 按 pad_width 补零;
    /// 库中无批次或编号均非数字时回落到 "001" 形式的首号
    fn next_code(conn: &Connection, pad_width: usize) -> RepositoryResult<String> {
        let max_code: Option<i64> = conn.query_row(
            r#"
            SELECT MAX(CAST(code AS INTEGER)) FROM batch
            WHERE code != '' AND code NOT GLOB '*[^0-9]*'
            "#,
            [],
            |row| row.get(0),
        )?;

        let next = max_code.unwrap_or(0) + 1;
        Ok(format!("{:0width$}", next, width = pad_width))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 创建批次（编号派生 + 批次 + 明细 + 创建历史, 单事务）
    ///
    /// # 参数
    /// - `new_batch`: 写入参数（明细非空由 API 层保证）
    /// - `history`: 随创建一并落库的历史记录（batch_id 由本方法回填）
    /// - `pad_width`: 编号补零宽度
    ///
    /// # 返回
    /// - Ok(Batch): 落库后的完整批次
    pub fn create(
        &self,
        new_batch: &NewBatch,
        history: &HistoryEntry,
        pad_width: usize,
    ) -> RepositoryResult<Batch> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let code = Self::next_code(&tx, pad_width)?;
        let batch_id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Local::now().naive_local();

        tx.execute(
            r#"
            INSERT INTO batch (
                batch_id, code, cut_date, status, workshop_id,
                expected_return_date, actual_return_date, observations,
                paid, image_url, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, NULL, ?, 0, NULL, ?)
            "#,
            params![
                batch_id,
                code,
                new_batch.cut_date.format("%Y-%m-%d").to_string(),
                new_batch.status.to_string(),
                new_batch.workshop_id,
                new_batch
                    .expected_return_date
                    .map(|d| d.format("%Y-%m-%d").to_string()),
                new_batch.observations,
                created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        for item in &new_batch.line_items {
            tx.execute(
                r#"
                INSERT INTO batch_line_item (
                    batch_id, product_id, quantity, selected_color, selected_size
                ) VALUES (?, ?, ?, ?, ?)
                "#,
                params![
                    batch_id,
                    item.product_id,
                    item.quantity,
                    item.selected_color,
                    item.selected_size,
                ],
            )?;
        }

        Self::insert_history(&tx, &batch_id, history)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(Batch {
            batch_id,
            code,
            cut_date: new_batch.cut_date,
            status: new_batch.status,
            workshop_id: new_batch.workshop_id.clone(),
            expected_return_date: new_batch.expected_return_date,
            actual_return_date: None,
            observations: new_batch.observations.clone(),
            paid: false,
            image_url: None,
            created_at,
        })
    }

    /// 事务内写入一条批次历史（batch_id 以实参为准）
    fn insert_history(
        conn: &Connection,
        batch_id: &str,
        entry: &HistoryEntry,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO batch_history (entry_id, batch_id, action, user_id, logged_at, notes)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                entry.entry_id,
                batch_id,
                entry.action.to_string(),
                entry.user_id,
                entry.logged_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                entry.notes,
            ],
        )?;
        Ok(())
    }

    /// 更新批次状态字段（状态 + 车间 + 回厂日期 + 备注）并落历史, 单事务
    pub fn update_status_fields(
        &self,
        batch: &Batch,
        history: &HistoryEntry,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let rows = tx.execute(
            r#"
            UPDATE batch
            SET status = ?, workshop_id = ?, expected_return_date = ?,
                actual_return_date = ?, observations = ?
            WHERE batch_id = ?
            "#,
            params![
                batch.status.to_string(),
                batch.workshop_id,
                batch
                    .expected_return_date
                    .map(|d| d.format("%Y-%m-%d").to_string()),
                batch
                    .actual_return_date
                    .map(|d| d.format("%Y-%m-%d").to_string()),
                batch.observations,
                batch.batch_id,
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Batch".to_string(),
                id: batch.batch_id.clone(),
            });
        }

        Self::insert_history(&tx, &batch.batch_id, history)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 设置批次图片地址（图片服务回写, 不落历史）
    pub fn set_image_url(&self, batch_id: &str, image_url: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE batch SET image_url = ? WHERE batch_id = ?",
            params![image_url, batch_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Batch".to_string(),
                id: batch_id.to_string(),
            });
        }
        Ok(())
    }

    /// 删除批次（明细 + 历史 + 批次, 单事务）
    ///
    /// 已关联结算单的批次不可删除
    pub fn delete(&self, batch_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let linked: i64 = tx.query_row(
            "SELECT COUNT(*) FROM invoice_batch_link WHERE batch_id = ?",
            params![batch_id],
            |row| row.get(0),
        )?;
        if linked > 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "批次已关联结算单, 不可删除: batch_id={}",
                batch_id
            )));
        }

        tx.execute(
            "DELETE FROM batch_line_item WHERE batch_id = ?",
            params![batch_id],
        )?;
        tx.execute(
            "DELETE FROM batch_history WHERE batch_id = ?",
            params![batch_id],
        )?;
        let rows = tx.execute("DELETE FROM batch WHERE batch_id = ?", params![batch_id])?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Batch".to_string(),
                id: batch_id.to_string(),
            });
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按ID查批次
    pub fn get(&self, batch_id: &str) -> RepositoryResult<Batch> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE batch_id = ?", Self::SELECT_COLS);
        conn.query_row(&sql, params![batch_id], Self::map_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                    entity: "Batch".to_string(),
                    id: batch_id.to_string(),
                },
                other => other.into(),
            })
    }

    /// 查询批次明细行
    pub fn get_line_items(&self, batch_id: &str) -> RepositoryResult<Vec<BatchLineItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, product_id, quantity, selected_color, selected_size
            FROM batch_line_item
            WHERE batch_id = ?
            "#,
        )?;
        let items = stmt
            .query_map(params![batch_id], |row| {
                Ok(BatchLineItem {
                    batch_id: row.get("batch_id")?,
                    product_id: row.get("product_id")?,
                    quantity: row.get("quantity")?,
                    selected_color: row.get("selected_color")?,
                    selected_size: row.get("selected_size")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// 列出全部批次（按裁剪日期升序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY cut_date ASC, code ASC", Self::SELECT_COLS);
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(batches)
    }

    /// 列出车间的在途批次（status != RETURNED）
    ///
    /// 按预计回厂日期升序, 保证冲突检测结果确定性;
    /// 无预计回厂日期的批次排在最后
    pub fn list_open_by_workshop(&self, workshop_id: &str) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
            WHERE workshop_id = ? AND status != 'RETURNED'
            ORDER BY expected_return_date IS NULL, expected_return_date ASC, code ASC
            "#,
            Self::SELECT_COLS
        );
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map(params![workshop_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(batches)
    }

    /// 列出车间在日期区间内的批次（按裁剪日期过滤, 闭区间）
    pub fn list_by_workshop_in_range(
        &self,
        workshop_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
            WHERE workshop_id = ? AND cut_date >= ? AND cut_date <= ?
            ORDER BY cut_date ASC, code ASC
            "#,
            Self::SELECT_COLS
        );
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map(
                params![
                    workshop_id,
                    start.format("%Y-%m-%d").to_string(),
                    end.format("%Y-%m-%d").to_string(),
                ],
                Self::map_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(batches)
    }

    /// 列出车间未结算批次（paid=0 且裁剪日期在闭区间内）
    pub fn list_unbilled(
        &self,
        workshop_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
            WHERE workshop_id = ? AND paid = 0 AND cut_date >= ? AND cut_date <= ?
            ORDER BY cut_date ASC, code ASC
            "#,
            Self::SELECT_COLS
        );
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map(
                params![
                    workshop_id,
                    start.format("%Y-%m-%d").to_string(),
                    end.format("%Y-%m-%d").to_string(),
                ],
                Self::map_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(batches)
    }

    /// 判断批次是否已关联结算单
    pub fn is_invoiced(&self, batch_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM invoice_batch_link WHERE batch_id = ?",
            params![batch_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
