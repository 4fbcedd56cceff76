// ==========================================
// 端到端业务流程测试
// ==========================================
// 职责: 裁剪 → 外发 → 冲突解除 → 回厂 → 开单 → 付款 全链路
// ==========================================


#[cfg(test)]
mod full_business_flow_test {
    use garment_batch_flow::domain::types::{
        BatchStatus, CalendarMode, HistoryAction, InvoiceStatus, LaneKey,
    };
    use garment_batch_flow::api::settlement_api::GenerateInvoiceRequest;

    use crate::test_helpers::{batch_request, date, setup};

    #[test]
    fn test_full_business_flow() {
        let ctx = setup();

        // 1. 裁剪一个批次, 外发 W1
        let a = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 10),
                BatchStatus::ExternalWorkshop,
                Some("W1"),
                Some(date(2025, 3, 14)),
                "P1",
                10,
            ))
            .unwrap();
        assert_eq!(a.code, "001");

        // 2. 日历上 W1 泳道出现该批次
        let calendar = ctx
            .calendar_api
            .get_calendar_window(date(2025, 3, 10), CalendarMode::Monthly)
            .unwrap();
        let w1_lane = calendar
            .lanes
            .iter()
            .find(|l| l.lane_key == LaneKey::Workshop("W1".to_string()))
            .expect("应有 W1 泳道");
        assert_eq!(w1_lane.batches[0].start_column, 9);
        assert_eq!(w1_lane.batches[0].span, 4);

        // 3. 03-12 再裁一批想给 W1 → 档期冲突
        let check = ctx
            .batch_api
            .check_conflict("W1", date(2025, 3, 12))
            .unwrap();
        assert!(check.conflict.is_some());

        // 4. 人工解除冲突后创建放行
        ctx.batch_api
            .resolve_conflict(&a.batch_id, date(2025, 3, 12), "supervisor")
            .unwrap();
        let b = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 12),
                BatchStatus::ExternalWorkshop,
                Some("W1"),
                Some(date(2025, 3, 18)),
                "P2",
                23,
            ))
            .unwrap();
        assert_eq!(b.code, "002");

        // 5. B 回厂
        ctx.batch_api
            .update_status(&b.batch_id, BatchStatus::Returned, None, None, "operator")
            .unwrap();

        // 6. 对 A、B 开单: 120.00 + 80.50 = 200.50
        let invoice = ctx
            .settlement_api
            .generate_invoice(&GenerateInvoiceRequest {
                workshop_id: "W1".to_string(),
                batch_ids: vec![a.batch_id.clone(), b.batch_id.clone()],
                due_date: None,
                notes: Some("三月结算".to_string()),
                user_id: "accountant".to_string(),
            })
            .unwrap();
        assert_eq!(invoice.total_amount, 200.5);
        assert!(invoice.invoice_number.starts_with("COS-"));

        // 7. 未结算清单已清空
        assert!(ctx
            .settlement_api
            .get_unbilled_batches("W1", date(2025, 3, 1), date(2025, 3, 31))
            .unwrap()
            .is_empty());

        // 8. 标记付款
        let paid = ctx
            .settlement_api
            .mark_invoice_paid(&invoice.invoice_id)
            .unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);

        // 9. 批次历史完整: A 有创建/冲突解除/结算
        let history = ctx.batch_api.get_history(&a.batch_id).unwrap();
        let actions: Vec<HistoryAction> = history.iter().map(|e| e.action).collect();
        assert!(actions.contains(&HistoryAction::Created));
        assert!(actions.contains(&HistoryAction::ConflictResolved));
        assert!(actions.contains(&HistoryAction::Invoiced));
    }
}
