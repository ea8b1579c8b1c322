use sqlx::PgPool;

#[derive(Clone)]
pub struct SqlxGestureRepo {
    pub pool: PgPool,
}

#[derive(Clone)]
pub struct SqlxProfileRepo {
    pub pool: PgPool,
}
