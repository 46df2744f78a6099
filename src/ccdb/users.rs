use rusqlite::{Connection, types::Type};

use crate::{ccdb::{DBResult, Database}, models};

/////*============== USER QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::User {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        let solved: String = row.get("solved_challenges")?;
        let solved_challenges = serde_json::from_str(&solved).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                row.as_ref().column_index("solved_challenges").unwrap_or_default(),
                Type::Text,
                Box::new(err),
            )
        })?;

        Ok(Self {
            chat_id: row.get("chat_id")?,
            username: row.get("username")?,
            full_name: row.get("full_name")?,
            solved_challenges,
            points: row.get("points")?,
        })
    }
}

/// Inserts a user, or does nothing if one with the same chat id exists.
/// Returns `true` if it was newly added, false otherwise.
pub fn insert_user(db: &Database, user: &models::User) -> DBResult<bool> {
    let connection = db.connect()?;

    log::trace!("[insert_user] Inserting user {} into users...", user.chat_id);

    let solved = serde_json::to_string(&user.solved_challenges)
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;

    let query_params = rusqlite::named_params! {
            ":chat_id":           user.chat_id,
            ":username":          user.username,
            ":full_name":         user.full_name,
            ":solved_challenges": solved,
            ":points":            user.points,
    };

    connection
        .prepare(
            "INSERT INTO users ( chat_id,  username,  full_name,  solved_challenges,  points)
             VALUES            (:chat_id, :username, :full_name, :solved_challenges, :points)",
        )?
        .execute(query_params)
        .map_or_else(crate::ccdb::swallow_constraint_violation, |_| Ok(true))
        .inspect(|added| {
            if *added {
                log::info!("User {} has been added to the database.", user.display_name());
            }
        })
}

/// Returns the user with chat id `chat_id`, if they exist.
pub fn query_user(db: &Database, chat_id: i64) -> DBResult<Option<models::User>> {
    let connection = db.connect()?;
    query_user_with(&connection, chat_id)
}

fn query_user_with(connection: &Connection, chat_id: i64) -> DBResult<Option<models::User>> {
    connection
        .prepare("SELECT * FROM users WHERE chat_id = :chat_id")?
        .query(rusqlite::named_params! { ":chat_id": chat_id })?
        .next()?
        .map(|row| row.try_into())
        .transpose()
}

/// Users with at least one point, best first.
pub fn query_top_users(db: &Database, limit: usize) -> DBResult<Vec<models::User>> {
    log::trace!("[query_top_users] Querying top {limit} users.");
    let connection = db.connect()?;

    let mut stmt = connection.prepare(
        "SELECT * FROM users
         WHERE points > 0
         ORDER BY points DESC
         LIMIT :limit",
    )?;

    let users = stmt
        .query_map(rusqlite::named_params! { ":limit": limit }, |row| models::User::try_from(row))?
        .collect::<DBResult<Vec<models::User>>>()?;

    Ok(users)
}

/// Appends `challenge_id` to the user's solved list and adds a point.
///
/// Does nothing if the user is unknown or already solved the challenge.
/// Returns `true` if a point was awarded.
pub(crate) fn award_solve(connection: &Connection, chat_id: i64, challenge_id: i64) -> DBResult<bool> {
    let Some(mut user) = query_user_with(connection, chat_id)? else {
        log::warn!("[award_solve] No user row for chat {chat_id}, nothing to award.");
        return Ok(false);
    };

    if user.solved_challenges.contains(&challenge_id) {
        return Ok(false);
    }

    user.solved_challenges.push(challenge_id);
    let solved = serde_json::to_string(&user.solved_challenges)
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;

    connection
        .prepare(
            "UPDATE users
             SET solved_challenges = :solved_challenges, points = points + 1
             WHERE chat_id = :chat_id",
        )?
        .execute(rusqlite::named_params! {
            ":solved_challenges": solved,
            ":chat_id": chat_id,
        })?;

    log::info!("[award_solve] {} solved challenge {challenge_id} (+1)", user.display_name());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccdb::testing;
    use pretty_assertions::assert_eq;

    fn user(chat_id: i64, username: &str, points: u32) -> models::User {
        models::User {
            chat_id,
            username: Some(username.to_string()),
            full_name: username.to_uppercase(),
            solved_challenges: (0..points as i64).collect(),
            points,
        }
    }

    #[test]
    fn insert_user_is_idempotent() {
        let (_dir, db) = testing::database();
        let ada = user(1, "ada", 0);

        assert!(insert_user(&db, &ada).unwrap());
        assert!(!insert_user(&db, &ada).unwrap());
        assert_eq!(query_user(&db, 1).unwrap(), Some(ada));
        assert_eq!(query_user(&db, 2).unwrap(), None);
    }

    #[test]
    fn top_users_skips_zero_points_and_sorts_descending() {
        let (_dir, db) = testing::database();
        insert_user(&db, &user(1, "zero", 0)).unwrap();
        insert_user(&db, &user(2, "two", 2)).unwrap();
        insert_user(&db, &user(3, "five", 5)).unwrap();
        insert_user(&db, &user(4, "one", 1)).unwrap();

        let names: Vec<_> = query_top_users(&db, 10)
            .unwrap()
            .into_iter()
            .map(|u| u.display_name())
            .collect();

        assert_eq!(names, ["@five", "@two", "@one"]);
    }

    #[test]
    fn top_users_respects_limit() {
        let (_dir, db) = testing::database();
        for id in 1..=12 {
            insert_user(&db, &user(id, &format!("u{id}"), id as u32)).unwrap();
        }

        let top = query_top_users(&db, 10).unwrap();
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].points, 12);
        assert_eq!(top[9].points, 3);
    }

    #[test]
    fn award_solve_only_counts_a_challenge_once() {
        let (_dir, db) = testing::database();
        insert_user(&db, &user(1, "ada", 0)).unwrap();
        let connection = db.connect().unwrap();

        assert!(award_solve(&connection, 1, 7).unwrap());
        assert!(!award_solve(&connection, 1, 7).unwrap());
        assert!(award_solve(&connection, 1, 8).unwrap());

        let ada = query_user(&db, 1).unwrap().unwrap();
        assert_eq!(ada.solved_challenges, vec![7, 8]);
        assert_eq!(ada.points, 2);
    }

    #[test]
    fn award_solve_ignores_unknown_users() {
        let (_dir, db) = testing::database();
        let connection = db.connect().unwrap();

        assert!(!award_solve(&connection, 42, 1).unwrap());
        assert_eq!(query_user(&db, 42).unwrap(), None);
    }
}
