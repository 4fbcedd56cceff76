// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证并发开单的单号唯一性与并发创建的编号唯一性
// ==========================================


#[cfg(test)]
mod concurrent_settlement_test {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use garment_batch_flow::api::settlement_api::GenerateInvoiceRequest;
    use garment_batch_flow::domain::types::BatchStatus;

    use crate::test_helpers::{batch_request, date, setup};

    #[test]
    fn test_concurrent_invoices_get_unique_numbers() {
        let ctx = setup();

        // 预备 4 个互不冲突的已回厂批次
        let mut batch_ids = Vec::new();
        for i in 0..4u32 {
            let batch = ctx
                .batch_api
                .create_batch(&batch_request(
                    date(2025, 3, 1 + i),
                    BatchStatus::ExternalWorkshop,
                    Some("W2"),
                    Some(date(2025, 3, 1 + i)),
                    "P1",
                    1,
                ))
                .unwrap();
            ctx.batch_api
                .update_status(&batch.batch_id, BatchStatus::Returned, None, None, "test_user")
                .unwrap();
            batch_ids.push(batch.batch_id);
        }

        // 4 个线程同日并发开单
        let handles: Vec<_> = batch_ids
            .into_iter()
            .map(|batch_id| {
                let api = Arc::clone(&ctx.settlement_api);
                thread::spawn(move || {
                    api.generate_invoice(&GenerateInvoiceRequest {
                        workshop_id: "W2".to_string(),
                        batch_ids: vec![batch_id],
                        due_date: None,
                        notes: None,
                        user_id: "test_user".to_string(),
                    })
                    .unwrap()
                })
            })
            .collect();

        let mut numbers = HashSet::new();
        let mut suffixes = Vec::new();
        for handle in handles {
            let invoice = handle.join().unwrap();
            assert!(
                numbers.insert(invoice.invoice_number.clone()),
                "单号重复: {}",
                invoice.invoice_number
            );
            let suffix: i64 = invoice
                .invoice_number
                .rsplit('-')
                .next()
                .unwrap()
                .parse()
                .unwrap();
            suffixes.push(suffix);
        }

        // 序号从 1000 起连续递增 (顺序由调度决定, 集合必须正好是 1000..=1003)
        suffixes.sort_unstable();
        assert_eq!(suffixes, vec![1000, 1001, 1002, 1003]);
    }

    #[test]
    fn test_concurrent_batch_creation_codes_are_unique() {
        let ctx = setup();

        let handles: Vec<_> = (0..6u32)
            .map(|i| {
                let api = Arc::clone(&ctx.batch_api);
                thread::spawn(move || {
                    api.create_batch(&crate::test_helpers::batch_request(
                        crate::test_helpers::date(2025, 3, 1 + i),
                        BatchStatus::Waiting,
                        None,
                        None,
                        "P1",
                        1,
                    ))
                    .unwrap()
                })
            })
            .collect();

        let mut codes = HashSet::new();
        for handle in handles {
            let batch = handle.join().unwrap();
            assert!(codes.insert(batch.code.clone()), "编号重复: {}", batch.code);
        }

        let mut sorted: Vec<String> = codes.into_iter().collect();
        sorted.sort();
        assert_eq!(sorted, vec!["001", "002", "003", "004", "005", "006"]);
    }

    #[test]
    fn test_double_billing_race_only_one_wins() {
        let ctx = setup();

        let batch = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 1),
                BatchStatus::ExternalWorkshop,
                Some("W2"),
                Some(date(2025, 3, 5)),
                "P1",
                10,
            ))
            .unwrap();

        // 两个线程同时对同一批次开单 → 只允许一张成单
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let api = Arc::clone(&ctx.settlement_api);
                let batch_id = batch.batch_id.clone();
                thread::spawn(move || {
                    api.generate_invoice(&GenerateInvoiceRequest {
                        workshop_id: "W2".to_string(),
                        batch_ids: vec![batch_id],
                        due_date: None,
                        notes: None,
                        user_id: "test_user".to_string(),
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok_count = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok_count, 1, "同一批次只允许开一张结算单");

        // 批次正好被一条关联引用
        assert_eq!(ctx.settlement_api.list_invoices(None).unwrap().len(), 1);
        let invoice = &ctx.settlement_api.list_invoices(None).unwrap()[0];
        assert_eq!(
            ctx.settlement_api
                .get_invoice_links(&invoice.invoice_id)
                .unwrap()
                .len(),
            1
        );
        assert!(ctx.batch_api.get_batch(&batch.batch_id).unwrap().paid);
    }
}
