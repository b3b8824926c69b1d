use std::str::FromStr;

use anyhow::{anyhow, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_u32},
    models::UserProfile,
};
use crate::prediction::MuscleGroup;

fn row_to_user(row: &Row) -> Result<UserProfile> {
    let created_at: String = row.get("created_at")?;
    let muscle_group: String = row.get("muscle_group")?;
    let fatigue_level: Option<i64> = row.get("fatigue_level")?;

    Ok(UserProfile {
        id: row.get("id")?,
        name: row.get("name")?,
        age: to_u32(row.get("age")?, "age")?,
        height_cm: row.get("height_cm")?,
        weight_kg: row.get("weight_kg")?,
        training_frequency: to_u32(row.get("training_frequency")?, "training_frequency")?,
        fatigue_level: fatigue_level
            .map(|v| to_u32(v, "fatigue_level"))
            .transpose()?,
        previous_injury: row.get("previous_injury")?,
        muscle_group: MuscleGroup::from_str(&muscle_group)
            .map_err(|err| anyhow!("stored muscle group is invalid: {err}"))?,
        contraction_type: row.get("contraction_type")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

const USER_COLUMNS: &str =
    "id, name, age, height_cm, weight_kg, training_frequency, fatigue_level, previous_injury, \
     muscle_group, contraction_type, created_at";

impl Database {
    /// The profile captured when the given session was started.
    pub async fn get_user_for_session(&self, session_id: &str) -> Result<Option<UserProfile>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE id = (SELECT user_id FROM sessions WHERE id = ?1)"
            ))?;
            let mut rows = stmt.query(params![session_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_user(row)?)),
                None => Ok(None),
            }
        })
        .await
    }
}
