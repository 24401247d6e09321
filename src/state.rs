use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    repositories::{
        CommentRepository, DateProposalRepository, DateVoteRepository, NotificationRepository,
        SqliteCommentRepository, SqliteDateProposalRepository, SqliteDateVoteRepository,
        SqliteNotificationRepository, SqliteTripRepository, TripRepository,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub trips: Arc<dyn TripRepository>,
    pub proposals: Arc<dyn DateProposalRepository>,
    pub votes: Arc<dyn DateVoteRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        Self {
            trips: Arc::new(SqliteTripRepository::new(db.clone())),
            proposals: Arc::new(SqliteDateProposalRepository::new(db.clone())),
            votes: Arc::new(SqliteDateVoteRepository::new(db.clone())),
            comments: Arc::new(SqliteCommentRepository::new(db.clone())),
            notifications: Arc::new(SqliteNotificationRepository::new(db.clone())),
            config,
            db,
        }
    }
}
