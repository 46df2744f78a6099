use std::sync::Arc;

use tokio::sync::RwLock;

use crate::ccdb::{self, Database};
use crate::models::Challenge;

/// The challenge currently accepting submissions: always the newest one in the database.
#[derive(Debug, Clone, Default)]
pub struct ActiveChallenge {
    current: Arc<RwLock<Option<Challenge>>>,
}

impl ActiveChallenge {
    /// Loads the newest challenge, if there is one.
    pub fn load(db: &Database) -> ccdb::DBResult<Self> {
        let latest = ccdb::challenges::query_latest_challenge(db)?;
        match &latest {
            Some(challenge) => log::info!("Loaded latest challenge {} from DB.", challenge.id),
            None => log::info!("No challenge in the database yet."),
        }

        Ok(Self { current: Arc::new(RwLock::new(latest)) })
    }

    pub async fn current(&self) -> Option<Challenge> {
        self.current.read().await.clone()
    }

    /// Re-reads the newest challenge. The write lock is held across the read so
    /// nobody grades against a half-swapped challenge.
    pub async fn reload(&self, db: &Database) -> ccdb::DBResult<Option<Challenge>> {
        let mut current = self.current.write().await;
        *current = ccdb::challenges::query_latest_challenge(db)?;
        Ok(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccdb::testing;
    use crate::models::{ChallengeSolution, NewChallenge};

    fn new_challenge(description: &str) -> NewChallenge {
        NewChallenge {
            description: description.to_string(),
            solution: ChallengeSolution::default(),
            tests: String::from("import unittest"),
        }
    }

    #[tokio::test]
    async fn empty_database_has_no_active_challenge() {
        let (_dir, db) = testing::database();
        let active = ActiveChallenge::load(&db).unwrap();
        assert!(active.current().await.is_none());
    }

    #[tokio::test]
    async fn reload_picks_up_the_newest_challenge() {
        let (_dir, db) = testing::database();
        ccdb::challenges::insert_challenge(&db, &new_challenge("first")).unwrap();

        let active = ActiveChallenge::load(&db).unwrap();
        let clone = active.clone();
        assert_eq!(active.current().await.unwrap().description, "first");

        let second = ccdb::challenges::insert_challenge(&db, &new_challenge("second")).unwrap();
        assert_eq!(active.current().await.unwrap().description, "first");

        let reloaded = active.reload(&db).await.unwrap().unwrap();
        assert_eq!(reloaded.id, second.id);
        assert_eq!(clone.current().await.unwrap().id, second.id);
    }
}
