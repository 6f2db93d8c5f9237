#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::services::{logs, users};
    use crate::tests::test_pool;
    use crate::types::{CreateLogRequest, ListLogsQuery, LogLevel, UpdateLogRequest};

    async fn seed_user(pool: &sqlx::SqlitePool, email: &str) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        users::create_user(
            &mut conn,
            &users::NewUser {
                name: "Reader",
                email,
                password_hash: "not-a-real-hash",
                verification_token: "tok",
                verification_expires_at: i64::MAX,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn create_then_get_returns_same_entry() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool, "a@example.com").await;
        let mut conn = pool.acquire().await.unwrap();

        let mut req = CreateLogRequest::event(Some(user_id), LogLevel::Warn, "book.listed", "listed Dune");
        req.details = Some("{\"isbn\":\"9780441013593\"}".into());
        let created = logs::create_log(&mut conn, &req).await.unwrap();

        assert!(created.id > 0);
        assert_eq!(created.user_id, Some(user_id));
        assert_eq!(created.level, LogLevel::Warn);
        assert_eq!(created.action, "book.listed");
        assert_eq!(created.details.as_deref(), Some("{\"isbn\":\"9780441013593\"}"));

        let fetched = logs::get_log_by_id(&mut conn, created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn get_unknown_id_is_none() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        assert!(logs::get_log_by_id(&mut conn, 4242).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let created = logs::create_log(
            &mut conn,
            &CreateLogRequest::event(None, LogLevel::Info, "book.listed", "listed Dune"),
        )
        .await
        .unwrap();

        let patch = UpdateLogRequest { message: Some("listed Dune Messiah".into()), ..Default::default() };
        let updated = logs::update_log(&mut conn, created.id, &patch).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.message, "listed Dune Messiah");
        assert_eq!(updated.action, created.action);
        assert_eq!(updated.level, created.level);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn update_keeps_details_when_absent_and_clears_on_null() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let mut req = CreateLogRequest::event(None, LogLevel::Info, "book.listed", "listed Dune");
        req.details = Some("{\"isbn\":\"9780441013593\"}".into());
        let created = logs::create_log(&mut conn, &req).await.unwrap();

        let patch = UpdateLogRequest { level: Some(LogLevel::Warn), ..Default::default() };
        let kept = logs::update_log(&mut conn, created.id, &patch).await.unwrap();
        assert_eq!(kept.details, created.details);

        let patch = UpdateLogRequest { details: Some(None), ..Default::default() };
        let cleared = logs::update_log(&mut conn, created.id, &patch).await.unwrap();
        assert_eq!(cleared.details, None);
        assert_eq!(cleared.level, LogLevel::Warn);

        let patch = UpdateLogRequest { details: Some(Some("relisted".into())), ..Default::default() };
        let set = logs::update_log(&mut conn, created.id, &patch).await.unwrap();
        assert_eq!(set.details.as_deref(), Some("relisted"));
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let patch = UpdateLogRequest { level: Some(LogLevel::Error), ..Default::default() };
        let err = logs::update_log(&mut conn, 99, &patch).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_only_the_requested_entry() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let first = logs::create_log(&mut conn, &CreateLogRequest::event(None, LogLevel::Info, "a", "first"))
            .await
            .unwrap();
        let second = logs::create_log(&mut conn, &CreateLogRequest::event(None, LogLevel::Info, "b", "second"))
            .await
            .unwrap();

        let deleted = logs::delete_log(&mut conn, second.id).await.unwrap();
        assert_eq!(deleted, second);

        assert!(logs::get_log_by_id(&mut conn, second.id).await.unwrap().is_none());
        assert_eq!(logs::get_log_by_id(&mut conn, first.id).await.unwrap(), Some(first));

        let again = logs::delete_log(&mut conn, second.id).await.unwrap_err();
        assert!(matches!(again, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn calls_share_a_transaction() {
        let pool = test_pool().await;

        let id = {
            let mut tx = pool.begin().await.unwrap();
            let log = logs::create_log(&mut tx, &CreateLogRequest::event(None, LogLevel::Info, "a", "pending"))
                .await
                .unwrap();
            // Visible inside the transaction before commit
            assert!(logs::get_log_by_id(&mut tx, log.id).await.unwrap().is_some());
            tx.rollback().await.unwrap();
            log.id
        };

        let mut conn = pool.acquire().await.unwrap();
        assert!(logs::get_log_by_id(&mut conn, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_transaction_persists_all_writes() {
        let pool = test_pool().await;

        let mut tx = pool.begin().await.unwrap();
        let log = logs::create_log(&mut tx, &CreateLogRequest::event(None, LogLevel::Info, "a", "draft"))
            .await
            .unwrap();
        let patch = UpdateLogRequest { message: Some("final".into()), ..Default::default() };
        logs::update_log(&mut tx, log.id, &patch).await.unwrap();
        tx.commit().await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let stored = logs::get_log_by_id(&mut conn, log.id).await.unwrap().unwrap();
        assert_eq!(stored.message, "final");
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let err = logs::create_log(&mut conn, &CreateLogRequest::event(Some(777), LogLevel::Info, "a", "m"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)), "{err:?}");
    }

    #[tokio::test]
    async fn list_filters_and_orders_newest_first() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice@example.com").await;
        let bob = seed_user(&pool, "bob@example.com").await;
        let mut conn = pool.acquire().await.unwrap();

        for (user, level, action) in [
            (alice, LogLevel::Info, "one"),
            (bob, LogLevel::Info, "two"),
            (alice, LogLevel::Error, "three"),
            (alice, LogLevel::Info, "four"),
        ] {
            logs::create_log(&mut conn, &CreateLogRequest::event(Some(user), level, action, "m")).await.unwrap();
        }

        let q = ListLogsQuery { user_id: Some(alice), ..Default::default() };
        let actions: Vec<_> = logs::list_logs(&mut conn, &q).await.unwrap().into_iter().map(|l| l.action).collect();
        assert_eq!(actions, vec!["four", "three", "one"]);

        let q = ListLogsQuery { user_id: Some(alice), level: Some(LogLevel::Error), ..Default::default() };
        let errors = logs::list_logs(&mut conn, &q).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].action, "three");

        let q = ListLogsQuery { limit: Some(2), offset: Some(1), ..Default::default() };
        let page: Vec<_> = logs::list_logs(&mut conn, &q).await.unwrap().into_iter().map(|l| l.action).collect();
        assert_eq!(page, vec!["three", "two"]);
    }
}
