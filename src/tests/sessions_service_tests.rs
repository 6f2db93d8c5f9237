#[cfg(test)]
mod tests {
    use crate::services::{sessions, users};
    use crate::tests::test_pool;

    const NOW: i64 = 1_700_000_000;

    async fn seed_user(conn: &mut sqlx::SqliteConnection) -> i64 {
        users::create_user(
            conn,
            &users::NewUser {
                name: "Reader",
                email: "sessions@example.com",
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
    async fn expired_session_is_not_active() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn).await;

        let expired = sessions::create_session(&mut conn, user_id, NOW - 1).await.unwrap();
        let live = sessions::create_session(&mut conn, user_id, NOW + 60).await.unwrap();

        assert!(sessions::find_active_session(&mut conn, &expired.id, NOW).await.unwrap().is_none());
        assert_eq!(sessions::find_active_session(&mut conn, &live.id, NOW).await.unwrap(), Some(live));
    }

    #[tokio::test]
    async fn session_expiring_now_is_not_active() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn).await;

        let session = sessions::create_session(&mut conn, user_id, NOW).await.unwrap();
        assert!(sessions::find_active_session(&mut conn, &session.id, NOW).await.unwrap().is_none());
        assert!(sessions::find_active_session(&mut conn, &session.id, NOW - 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn).await;

        let expired = sessions::create_session(&mut conn, user_id, NOW - 10).await.unwrap();
        let live = sessions::create_session(&mut conn, user_id, NOW + 3600).await.unwrap();

        assert_eq!(sessions::purge_expired(&mut conn, NOW).await.unwrap(), 1);
        assert!(!sessions::delete_session(&mut conn, &expired.id).await.unwrap());
        assert!(sessions::find_active_session(&mut conn, &live.id, NOW).await.unwrap().is_some());

        assert_eq!(sessions::purge_expired(&mut conn, NOW).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_user_sessions_leaves_others() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn).await;
        let other_id = users::create_user(
            &mut conn,
            &users::NewUser {
                name: "Other",
                email: "other@example.com",
                password_hash: "not-a-real-hash",
                verification_token: "tok2",
                verification_expires_at: i64::MAX,
            },
        )
        .await
        .unwrap()
        .id;

        sessions::create_session(&mut conn, user_id, NOW + 60).await.unwrap();
        sessions::create_session(&mut conn, user_id, NOW + 60).await.unwrap();
        let kept = sessions::create_session(&mut conn, other_id, NOW + 60).await.unwrap();

        assert_eq!(sessions::delete_user_sessions(&mut conn, user_id).await.unwrap(), 2);
        assert!(sessions::find_active_session(&mut conn, &kept.id, NOW).await.unwrap().is_some());
    }
}
