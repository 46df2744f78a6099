use crate::{ccdb::{DBResult, Database, users}, models};

/////*============== SOLVER QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::SolverRecord {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            challenge_id: row.get("challenge_id")?,
            chat_id: row.get("chat_id")?,
            display_name: row.get("display_name")?,
            result: row.get("result")?,
            solution: row.get("solution")?,
            code_length: row.get("code_length")?,
        })
    }
}

/// Returns the solver record for (`challenge_id`, `chat_id`), if one exists.
pub fn query_solver(db: &Database, challenge_id: i64, chat_id: i64) -> DBResult<Option<models::SolverRecord>> {
    let connection = db.connect()?;

    connection
        .prepare("SELECT * FROM solvers WHERE challenge_id = :challenge_id AND chat_id = :chat_id")?
        .query(rusqlite::named_params! { ":challenge_id": challenge_id, ":chat_id": chat_id })?
        .next()?
        .map(|row| row.try_into())
        .transpose()
}

/// Records a passing submission.
///
/// The first passing submission of a user for a challenge awards them a point.
/// The solver row is always overwritten with the latest run.
/// Returns `true` if this was the user's first solve of the challenge.
pub fn record_solve(db: &Database, record: &models::SolverRecord) -> DBResult<bool> {
    let mut connection = db.connect()?;
    let tx = connection.transaction()?;

    log::trace!(
        "[record_solve] Recording solve of challenge {} by {}",
        record.challenge_id, record.display_name
    );

    let key = rusqlite::named_params! {
            ":challenge_id": record.challenge_id,
            ":chat_id":      record.chat_id,
    };

    let first_solve = !tx
        .prepare("SELECT 1 FROM solvers WHERE challenge_id = :challenge_id AND chat_id = :chat_id")?
        .exists(key)?;

    if first_solve {
        users::award_solve(&tx, record.chat_id, record.challenge_id)?;
    }

    let query_params = rusqlite::named_params! {
            ":challenge_id": record.challenge_id,
            ":chat_id":      record.chat_id,
            ":display_name": record.display_name,
            ":result":       record.result,
            ":solution":     record.solution,
            ":code_length":  record.code_length,
    };

    tx.prepare(
        "INSERT INTO solvers ( challenge_id,  chat_id,  display_name,  result,  solution,  code_length)
         VALUES              (:challenge_id, :chat_id, :display_name, :result, :solution, :code_length)
         ON CONFLICT (challenge_id, chat_id) DO UPDATE SET
            display_name = excluded.display_name,
            result       = excluded.result,
            solution     = excluded.solution,
            code_length  = excluded.code_length",
    )?
    .execute(query_params)
    .inspect_err(|err| log::error!("[record_solve] Could not upsert solver record: {err}"))?;

    tx.commit()?;

    Ok(first_solve)
}

/// Fastest runs for a challenge.
pub fn query_fastest(db: &Database, challenge_id: i64, limit: usize) -> DBResult<Vec<models::SolverRecord>> {
    query_ranked(db, challenge_id, limit, "result")
}

/// Shortest solutions for a challenge.
pub fn query_shortest(db: &Database, challenge_id: i64, limit: usize) -> DBResult<Vec<models::SolverRecord>> {
    query_ranked(db, challenge_id, limit, "code_length")
}

fn query_ranked(
    db: &Database,
    challenge_id: i64,
    limit: usize,
    order_column: &'static str,
) -> DBResult<Vec<models::SolverRecord>> {
    log::trace!("[query_ranked] Ranking solvers of challenge {challenge_id} by {order_column}.");
    let connection = db.connect()?;

    let mut stmt = connection.prepare(&format!(
        "SELECT * FROM solvers
         WHERE challenge_id = :challenge_id
         ORDER BY {order_column} ASC
         LIMIT :limit"
    ))?;

    let solvers = stmt
        .query_map(
            rusqlite::named_params! { ":challenge_id": challenge_id, ":limit": limit },
            |row| models::SolverRecord::try_from(row),
        )?
        .collect::<DBResult<Vec<models::SolverRecord>>>()?;

    Ok(solvers)
}
