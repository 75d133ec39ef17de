use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement,
};
use unitwork::{
    OpContext, OpError, OpResult, Operation, SessionRunner, Severity, SqlBackend, SqlSession,
    UnitOfWork, classify, transactional,
};

async fn sqlite_runner() -> SessionRunner<SqlBackend> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.unwrap();

    let backend = db.get_database_backend();
    db.execute(Statement::from_string(
        backend,
        "CREATE TABLE plans (id TEXT PRIMARY KEY, name TEXT NOT NULL, price_minor INTEGER NOT NULL)",
    ))
    .await
    .unwrap();

    SessionRunner::new(SqlBackend::new(db))
}

async fn count_plans(db: &DatabaseConnection) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            "SELECT COUNT(*) AS n FROM plans",
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

async fn insert_plan<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    name: &str,
    price_minor: i64,
) -> OpResult<()> {
    conn.execute(Statement::from_sql_and_values(
        conn.get_database_backend(),
        "INSERT INTO plans (id, name, price_minor) VALUES (?, ?, ?)",
        vec![id.into(), name.into(), price_minor.into()],
    ))
    .await?;
    Ok(())
}

#[tokio::test]
async fn execute_single_commits_inserts() {
    let runner = sqlite_runner().await;

    runner
        .execute_single(|session| {
            Box::pin(async move { insert_plan(session.connection()?, "p1", "Basic", 500).await })
        })
        .await
        .unwrap();

    assert_eq!(count_plans(runner.backend().database()).await, 1);
}

#[tokio::test]
async fn failing_unit_rolls_back_its_writes() {
    let runner = sqlite_runner().await;

    let err = runner
        .execute_single::<(), _>(|session| {
            Box::pin(async move {
                insert_plan(session.connection()?, "p1", "Basic", 500).await?;
                Err(OpError::Raw("price rejected".to_string()))
            })
        })
        .await
        .unwrap_err();

    assert_eq!(err, OpError::Raw("price rejected".to_string()));
    assert_eq!(count_plans(runner.backend().database()).await, 0);
}

#[tokio::test]
async fn successful_batch_commits_in_order() {
    let runner = sqlite_runner().await;

    let units: Vec<UnitOfWork<SqlSession, u64>> = vec![
        Box::new(|session: &SqlSession| {
            Box::pin(async move {
                insert_plan(session.connection()?, "p1", "Basic", 500).await?;
                Ok(1)
            })
        }),
        Box::new(|session: &SqlSession| {
            Box::pin(async move {
                insert_plan(session.connection()?, "p2", "Pro", 1500).await?;
                Ok(2)
            })
        }),
    ];

    let results = runner.execute_batch(units).await.unwrap();
    assert_eq!(results, vec![1, 2]);
    assert_eq!(count_plans(runner.backend().database()).await, 2);
}

#[tokio::test]
async fn batch_with_failing_unit_leaves_no_rows() {
    let runner = sqlite_runner().await;

    let units: Vec<UnitOfWork<SqlSession, u64>> = vec![
        Box::new(|session: &SqlSession| {
            Box::pin(async move {
                insert_plan(session.connection()?, "p1", "Basic", 500).await?;
                Ok(1)
            })
        }),
        Box::new(|_session: &SqlSession| {
            Box::pin(async move { Err(OpError::Raw("second unit failed".to_string())) })
        }),
        Box::new(|session: &SqlSession| {
            Box::pin(async move {
                insert_plan(session.connection()?, "p3", "Max", 3000).await?;
                Ok(3)
            })
        }),
    ];

    let err = runner.execute_batch(units).await.unwrap_err();
    assert_eq!(err, OpError::Raw("second unit failed".to_string()));
    assert_eq!(count_plans(runner.backend().database()).await, 0);
}

/// Inserts one subscription plan through the injected session.
struct CreatePlan;

#[async_trait]
impl Operation<SqlSession> for CreatePlan {
    type Args = (String, i64);
    type Output = ();

    async fn call(
        &self,
        (name, price_minor): Self::Args,
        ctx: OpContext<'_, SqlSession>,
    ) -> OpResult<()> {
        let session = ctx
            .session
            .ok_or_else(|| OpError::Session("no session injected".to_string()))?;
        insert_plan(
            session.connection()?,
            &format!("plan:{name}"),
            &name,
            price_minor,
        )
        .await
    }
}

#[tokio::test]
async fn wrapped_operation_commits_and_classifies_database_failures() {
    let runner = sqlite_runner().await;
    let create = transactional(runner.clone(), classify(CreatePlan, "Plan creation failed"));

    create
        .call(("Basic".to_string(), 500), OpContext::new())
        .await
        .unwrap();
    assert_eq!(count_plans(runner.backend().database()).await, 1);

    // Same primary key again: the DbErr surfaces as a classified error and
    // nothing extra is committed.
    let err = create
        .call(("Basic".to_string(), 500), OpContext::new())
        .await
        .unwrap_err();
    match err {
        OpError::Domain(domain) => {
            assert!(domain.message.starts_with("Plan creation failed: "));
            assert_eq!(domain.severity, Severity::ServerFault);
        }
        other => panic!("expected a classified error, got {other:?}"),
    }
    assert_eq!(count_plans(runner.backend().database()).await, 1);
}
