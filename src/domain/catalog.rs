// ==========================================
// 服装批次流转系统 - 主数据协作接口
// ==========================================
// 产品/车间主数据由外部系统维护, 核心只读:
// - ProductCatalog: 按款号取工价 (缺失视为 0, 不报错)
// - WorkshopDirectory: 车间名称与排期顺序
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// WorkshopRef - 车间只读视图
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkshopRef {
    pub workshop_id: String, // 车间ID
    pub name: String,        // 车间名称
    pub schedule_order: i32, // 排期顺序 (汇总报表按此排序)
}

// ==========================================
// ProductCatalog - 产品目录 (协作方)
// ==========================================
pub trait ProductCatalog: Send + Sync {
    /// 查询款号工价（单件加工单价）
    ///
    /// # 返回
    /// - Some(value): 工价
    /// - None: 款号不存在或未定价 (估值按 0 处理, 不报错)
    fn production_value(&self, product_id: &str) -> Option<f64>;
}

// ==========================================
// WorkshopDirectory - 车间名录 (协作方)
// ==========================================
pub trait WorkshopDirectory: Send + Sync {
    /// 按ID查车间
    fn get_workshop(&self, workshop_id: &str) -> Option<WorkshopRef>;

    /// 按排期顺序列出全部车间
    fn list_workshops(&self) -> Vec<WorkshopRef>;
}

// ==========================================
// 内存实现 - 供测试与演示程序使用
// ==========================================

/// 内存产品目录
#[derive(Debug, Default, Clone)]
pub struct InMemoryProductCatalog {
    values: HashMap<String, f64>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product_id: impl Into<String>, value: f64) -> Self {
        self.values.insert(product_id.into(), value);
        self
    }
}

impl ProductCatalog for InMemoryProductCatalog {
    fn production_value(&self, product_id: &str) -> Option<f64> {
        self.values.get(product_id).copied()
    }
}

/// 内存车间名录
#[derive(Debug, Default, Clone)]
pub struct InMemoryWorkshopDirectory {
    workshops: Vec<WorkshopRef>,
}

impl InMemoryWorkshopDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workshop(
        mut self,
        workshop_id: impl Into<String>,
        name: impl Into<String>,
        schedule_order: i32,
    ) -> Self {
        self.workshops.push(WorkshopRef {
            workshop_id: workshop_id.into(),
            name: name.into(),
            schedule_order,
        });
        self
    }
}

impl WorkshopDirectory for InMemoryWorkshopDirectory {
    fn get_workshop(&self, workshop_id: &str) -> Option<WorkshopRef> {
        self.workshops
            .iter()
            .find(|w| w.workshop_id == workshop_id)
            .cloned()
    }

    fn list_workshops(&self) -> Vec<WorkshopRef> {
        let mut list = self.workshops.clone();
        list.sort_by_key(|w| w.schedule_order);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_catalog_missing_product_is_none() {
        let catalog = InMemoryProductCatalog::new().with_product("P1", 12.0);
        assert_eq!(catalog.production_value("P1"), Some(12.0));
        assert_eq!(catalog.production_value("P404"), None);
    }

    #[test]
    fn test_directory_lists_in_schedule_order() {
        let dir = InMemoryWorkshopDirectory::new()
            .with_workshop("w-b", "Bordados Sul", 2)
            .with_workshop("w-a", "Costura Norte", 1);

        let names: Vec<String> = dir.list_workshops().into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["Costura Norte", "Bordados Sul"]);
    }
}
