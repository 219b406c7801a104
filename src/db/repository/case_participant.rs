use std::str::FromStr;

use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::ParticipantRole;
use crate::models::CaseParticipant;

/// Insert or replace a participant row (kept in sync by the case service).
pub fn upsert_case_participant(
    conn: &Connection,
    participant: &CaseParticipant,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO case_participants (case_id, user_id, role, approved)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(case_id, user_id) DO UPDATE SET role = excluded.role,
         approved = excluded.approved",
        params![
            participant.case_id,
            participant.user_id,
            participant.role.as_str(),
            participant.approved as i32,
        ],
    )?;
    Ok(())
}

pub fn get_case_participant(
    conn: &Connection,
    case_id: &str,
    user_id: &str,
) -> Result<Option<CaseParticipant>, DatabaseError> {
    let result = conn.query_row(
        "SELECT case_id, user_id, role, approved FROM case_participants
         WHERE case_id = ?1 AND user_id = ?2",
        params![case_id, user_id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i32>(3)?,
            ))
        },
    );

    match result {
        Ok((case_id, user_id, role, approved)) => Ok(Some(CaseParticipant {
            case_id,
            user_id,
            role: ParticipantRole::from_str(&role)?,
            approved: approved != 0,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
