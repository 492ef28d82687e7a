//! Database service layer
//!
//! Bundles the repositories behind one constructor so services share a
//! single pool.

use crate::database::{
    CategoryRepository, CommentRepository, DatabasePool, EventRepository, RequestRepository,
    UserRepository,
};

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub categories: CategoryRepository,
    pub events: EventRepository,
    pub requests: RequestRepository,
    pub comments: CommentRepository,
    pool: DatabasePool,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            categories: CategoryRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            requests: RequestRepository::new(pool.clone()),
            comments: CommentRepository::new(pool.clone()),
            pool,
        }
    }

    /// The underlying pool, for callers that manage their own transactions
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}
