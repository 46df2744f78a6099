use chrono::Utc;

use crate::{ccdb::{DBResult, Database}, models};

/////*============== CHALLENGE QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::Challenge {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        // Older rows stored "" for a missing solution
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        Ok(Self {
            id: row.get("id")?,
            description: row.get("description")?,
            solution: models::ChallengeSolution {
                photo_id: non_empty(row.get("solution_photo_id")?),
                text: non_empty(row.get("solution_text")?),
            },
            tests: row.get("tests")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a challenge and returns it with its assigned id.
pub fn insert_challenge(db: &Database, challenge: &models::NewChallenge) -> DBResult<models::Challenge> {
    let connection = db.connect()?;
    let created_at = Utc::now();

    log::trace!("[insert_challenge] Inserting new challenge into challenges...");

    let query_params = rusqlite::named_params! {
            ":description":       challenge.description,
            ":solution_photo_id": challenge.solution.photo_id,
            ":solution_text":     challenge.solution.text,
            ":tests":             challenge.tests,
            ":created_at":        created_at,
    };

    connection
        .prepare(
            "INSERT INTO challenges ( description,  solution_photo_id,  solution_text,  tests,  created_at)
             VALUES                 (:description, :solution_photo_id, :solution_text, :tests, :created_at)",
        )?
        .execute(query_params)?;

    let id = connection.last_insert_rowid();
    log::info!("[insert_challenge] Challenge {id} has been added.");

    Ok(models::Challenge {
        id,
        description: challenge.description.clone(),
        solution: challenge.solution.clone(),
        tests: challenge.tests.clone(),
        created_at,
    })
}

/// The most recently created challenge, if any exist.
pub fn query_latest_challenge(db: &Database) -> DBResult<Option<models::Challenge>> {
    log::trace!("[query_latest_challenge] Querying the newest challenge.");
    let connection = db.connect()?;

    connection
        .prepare("SELECT * FROM challenges ORDER BY id DESC LIMIT 1")?
        .query([])?
        .next()?
        .map(|row| row.try_into())
        .transpose()
}
