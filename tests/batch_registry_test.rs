// ==========================================
// 批次登记测试
// ==========================================
// 职责: 验证批次创建/编号派生/状态流转/删除与历史落库
// ==========================================


#[cfg(test)]
mod batch_registry_test {
    use garment_batch_flow::api::error::ApiError;
    use garment_batch_flow::domain::types::{BatchStatus, HistoryAction};
    use rusqlite::params;

    use crate::test_helpers::{batch_request, date, setup};

    // ==========================================
    // 创建与编号派生
    // ==========================================

    #[test]
    fn test_create_batch_assigns_sequential_padded_codes() {
        let ctx = setup();

        let b1 = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 1),
                BatchStatus::Waiting,
                None,
                None,
                "P1",
                10,
            ))
            .unwrap();
        assert_eq!(b1.code, "001");

        let b2 = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 2),
                BatchStatus::Waiting,
                None,
                None,
                "P2",
                5,
            ))
            .unwrap();
        assert_eq!(b2.code, "002");
    }

    #[test]
    fn test_code_derivation_skips_non_numeric_codes() {
        let ctx = setup();

        // 直接塞入一条非数字编号的旧数据
        let b1 = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 1),
                BatchStatus::Waiting,
                None,
                None,
                "P1",
                1,
            ))
            .unwrap();
        assert_eq!(b1.code, "001");

        {
            let conn = ctx._temp_file.path().to_str().unwrap().to_string();
            let conn = garment_batch_flow::db::open_sqlite_connection(&conn).unwrap();
            conn.execute(
                "UPDATE batch SET code = 'LEGACY-A' WHERE batch_id = ?",
                params![b1.batch_id],
            )
            .unwrap();
        }

        // 非数字编号不参与 max 计算, 下一个仍从 001 起
        let b2 = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 2),
                BatchStatus::Waiting,
                None,
                None,
                "P1",
                1,
            ))
            .unwrap();
        assert_eq!(b2.code, "001");
    }

    #[test]
    fn test_create_batch_rejects_empty_line_items() {
        let ctx = setup();
        let mut request = batch_request(
            date(2025, 3, 1),
            BatchStatus::Waiting,
            None,
            None,
            "P1",
            1,
        );
        request.line_items.clear();

        let err = ctx.batch_api.create_batch(&request).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_create_batch_rejects_non_positive_quantity() {
        let ctx = setup();
        let request = batch_request(
            date(2025, 3, 1),
            BatchStatus::Waiting,
            None,
            None,
            "P1",
            0,
        );
        let err = ctx.batch_api.create_batch(&request).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_create_batch_enforces_workshop_invariant() {
        let ctx = setup();

        // 外发批次缺车间
        let request = batch_request(
            date(2025, 3, 1),
            BatchStatus::ExternalWorkshop,
            None,
            None,
            "P1",
            1,
        );
        assert!(matches!(
            ctx.batch_api.create_batch(&request).unwrap_err(),
            ApiError::InvalidInput(_)
        ));

        // 厂内批次带车间
        let request = batch_request(
            date(2025, 3, 1),
            BatchStatus::InternalProduction,
            Some("W1"),
            None,
            "P1",
            1,
        );
        assert!(matches!(
            ctx.batch_api.create_batch(&request).unwrap_err(),
            ApiError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_create_batch_writes_created_history() {
        let ctx = setup();
        let batch = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 1),
                BatchStatus::Waiting,
                None,
                None,
                "P1",
                3,
            ))
            .unwrap();

        let history = ctx.batch_api.get_history(&batch.batch_id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, HistoryAction::Created);
        assert_eq!(history[0].user_id, "test_user");
    }

    // ==========================================
    // 状态流转
    // ==========================================

    #[test]
    fn test_update_status_happy_path_sets_actual_return_date() {
        let ctx = setup();
        let batch = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 1),
                BatchStatus::Waiting,
                Some("W1"),
                Some(date(2025, 3, 5)),
                "P1",
                10,
            ))
            .unwrap();

        let batch = ctx
            .batch_api
            .update_status(
                &batch.batch_id,
                BatchStatus::ExternalWorkshop,
                None,
                None,
                "test_user",
            )
            .unwrap();
        assert_eq!(batch.status, BatchStatus::ExternalWorkshop);
        assert_eq!(batch.workshop_id.as_deref(), Some("W1"));
        assert!(batch.actual_return_date.is_none());

        let batch = ctx
            .batch_api
            .update_status(&batch.batch_id, BatchStatus::Returned, None, None, "test_user")
            .unwrap();
        assert_eq!(batch.status, BatchStatus::Returned);
        // 转 RETURNED 时自动落实际回厂日期
        assert_eq!(
            batch.actual_return_date,
            Some(chrono::Local::now().date_naive())
        );

        // 落库后的读回一致
        let reloaded = ctx.batch_api.get_batch(&batch.batch_id).unwrap();
        assert_eq!(reloaded.status, BatchStatus::Returned);
        assert_eq!(reloaded.actual_return_date, batch.actual_return_date);
    }

    #[test]
    fn test_returned_to_waiting_manual_override() {
        let ctx = setup();
        let batch = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 1),
                BatchStatus::Waiting,
                Some("W1"),
                Some(date(2025, 3, 5)),
                "P1",
                10,
            ))
            .unwrap();

        let batch = ctx
            .batch_api
            .update_status(
                &batch.batch_id,
                BatchStatus::ExternalWorkshop,
                None,
                None,
                "test_user",
            )
            .unwrap();
        let batch = ctx
            .batch_api
            .update_status(&batch.batch_id, BatchStatus::Returned, None, None, "test_user")
            .unwrap();
        assert!(batch.actual_return_date.is_some());

        // 人工回退: RETURNED → WAITING 是合法操作, 回厂记录作废
        let batch = ctx
            .batch_api
            .update_status(&batch.batch_id, BatchStatus::Waiting, None, None, "test_user")
            .unwrap();
        assert_eq!(batch.status, BatchStatus::Waiting);
        assert!(batch.actual_return_date.is_none());

        let history = ctx.batch_api.get_history(&batch.batch_id).unwrap();
        let transitions = history
            .iter()
            .filter(|e| e.action == HistoryAction::StatusChanged)
            .count();
        assert_eq!(transitions, 3);
    }

    #[test]
    fn test_illegal_transition_is_rejected() {
        let ctx = setup();
        let batch = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 1),
                BatchStatus::Waiting,
                Some("W1"),
                None,
                "P1",
                10,
            ))
            .unwrap();

        let batch = ctx
            .batch_api
            .update_status(
                &batch.batch_id,
                BatchStatus::ExternalWorkshop,
                None,
                None,
                "test_user",
            )
            .unwrap();

        // 外发中不允许直接改回 WAITING
        let err = ctx
            .batch_api
            .update_status(&batch.batch_id, BatchStatus::Waiting, None, None, "test_user")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_update_status_unknown_batch_is_not_found() {
        let ctx = setup();
        let err = ctx
            .batch_api
            .update_status("missing", BatchStatus::Returned, None, None, "test_user")
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    // ==========================================
    // 删除
    // ==========================================

    #[test]
    fn test_delete_batch_removes_line_items_and_history() {
        let ctx = setup();
        let batch = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 1),
                BatchStatus::Waiting,
                None,
                None,
                "P1",
                10,
            ))
            .unwrap();

        ctx.batch_api.delete_batch(&batch.batch_id).unwrap();

        assert!(matches!(
            ctx.batch_api.get_batch(&batch.batch_id).unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert!(ctx
            .batch_api
            .get_line_items(&batch.batch_id)
            .unwrap()
            .is_empty());
        assert!(ctx.batch_api.get_history(&batch.batch_id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_unknown_batch_is_not_found() {
        let ctx = setup();
        assert!(matches!(
            ctx.batch_api.delete_batch("missing").unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    // ==========================================
    // 图片回写
    // ==========================================

    #[test]
    fn test_set_image_url() {
        let ctx = setup();
        let batch = ctx
            .batch_api
            .create_batch(&batch_request(
                date(2025, 3, 1),
                BatchStatus::Waiting,
                None,
                None,
                "P1",
                10,
            ))
            .unwrap();

        ctx.batch_api
            .set_image_url(&batch.batch_id, "https://img.example/b1.jpg")
            .unwrap();
        let reloaded = ctx.batch_api.get_batch(&batch.batch_id).unwrap();
        assert_eq!(
            reloaded.image_url.as_deref(),
            Some("https://img.example/b1.jpg")
        );
    }
}
