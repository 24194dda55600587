mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::auth;
use crate::error::{Error, Result};
use crate::models::*;
use crate::report::{ReportActivity, SessionReportData};

/// The persistence layer.
///
/// Every read/write on patients, templates, sessions, and activities takes
/// the requesting therapist's id and filters by it in SQL. Entities owned
/// by other therapists are invisible: they surface as [`Error::NotFound`].
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Validation("Database path has no parent directory".into()))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        Ok(schema::run_migrations(&conn)?)
    }

    // ============================================================
    // Therapist and token operations
    // ============================================================

    pub fn create_therapist(&self, input: CreateTherapistInput) -> Result<Therapist> {
        if input.username.trim().is_empty() {
            return Err(Error::Validation("username is required".into()));
        }
        if input.password.is_empty() {
            return Err(Error::Validation("password is required".into()));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM therapists WHERE username = ?",
            [&input.username],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(Error::Validation("username is already taken".into()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO therapists (id, username, password_hash, created_at)
             VALUES (?, ?, ?, ?)",
            (
                id.to_string(),
                &input.username,
                auth::hash_password(&input.password),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Therapist {
            id,
            username: input.username,
            created_at: now,
        })
    }

    pub fn get_therapist(&self, id: Uuid) -> Result<Therapist> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt =
            conn.prepare("SELECT id, username, created_at FROM therapists WHERE id = ?")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(therapist_from_row(row)?)
        } else {
            Err(Error::NotFound("therapist"))
        }
    }

    /// Check username/password. Unknown usernames and wrong passwords are
    /// indistinguishable to the caller.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<Therapist> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, username, created_at, password_hash
             FROM therapists WHERE username = ?",
        )?;
        let mut rows = stmt.query([username])?;
        let Some(row) = rows.next()? else {
            return Err(Error::Auth);
        };

        let stored: String = row.get(3)?;
        if !auth::verify_password(password, &stored) {
            return Err(Error::Auth);
        }
        Ok(therapist_from_row(row)?)
    }

    pub fn create_token(&self, therapist_id: Uuid) -> Result<String> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let token = auth::generate_token();
        conn.execute(
            "INSERT INTO auth_tokens (token, therapist_id, created_at) VALUES (?, ?, ?)",
            (&token, therapist_id.to_string(), Utc::now().to_rfc3339()),
        )?;
        Ok(token)
    }

    pub fn therapist_for_token(&self, token: &str) -> Result<Option<Therapist>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT t.id, t.username, t.created_at
             FROM auth_tokens k JOIN therapists t ON t.id = k.therapist_id
             WHERE k.token = ?",
        )?;
        let mut rows = stmt.query([token])?;
        if let Some(row) = rows.next()? {
            Ok(Some(therapist_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn revoke_token(&self, token: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM auth_tokens WHERE token = ?", [token])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Patient operations
    // ============================================================

    pub fn list_patients(&self, therapist: Uuid) -> Result<Vec<Patient>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, therapist_id, name, birth_date, created_at, updated_at
             FROM patients WHERE therapist_id = ? ORDER BY name",
        )?;

        let patients = stmt
            .query_map([therapist.to_string()], patient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patients)
    }

    pub fn get_patient(&self, therapist: Uuid, id: Uuid) -> Result<Patient> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, therapist_id, name, birth_date, created_at, updated_at
             FROM patients WHERE id = ? AND therapist_id = ?",
        )?;

        let mut rows = stmt.query((id.to_string(), therapist.to_string()))?;
        if let Some(row) = rows.next()? {
            Ok(patient_from_row(row)?)
        } else {
            Err(Error::NotFound("patient"))
        }
    }

    pub fn create_patient(&self, therapist: Uuid, input: CreatePatientInput) -> Result<Patient> {
        input.validate()?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO patients (id, therapist_id, name, birth_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                therapist.to_string(),
                &input.name,
                input.birth_date.map(|d| d.to_string()),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Patient {
            id,
            therapist_id: therapist,
            name: input.name,
            birth_date: input.birth_date,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_patient(
        &self,
        therapist: Uuid,
        id: Uuid,
        input: UpdatePatientInput,
    ) -> Result<Patient> {
        input.validate()?;
        let existing = self.get_patient(therapist, id)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let birth_date = input.birth_date.or(existing.birth_date);

        conn.execute(
            "UPDATE patients SET name = ?, birth_date = ?, updated_at = ?
             WHERE id = ? AND therapist_id = ?",
            (
                &name,
                birth_date.map(|d| d.to_string()),
                now.to_rfc3339(),
                id.to_string(),
                therapist.to_string(),
            ),
        )?;

        Ok(Patient {
            id,
            therapist_id: therapist,
            name,
            birth_date,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    /// Deletes a patient; their sessions and recorded activities go with
    /// them via the store's cascade rules.
    pub fn delete_patient(&self, therapist: Uuid, id: Uuid) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM patients WHERE id = ? AND therapist_id = ?",
            (id.to_string(), therapist.to_string()),
        )?;
        if rows == 0 {
            return Err(Error::NotFound("patient"));
        }
        Ok(())
    }

    // ============================================================
    // Activity template operations
    // ============================================================

    pub fn list_templates(&self, therapist: Uuid) -> Result<Vec<ActivityTemplate>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, therapist_id, description, created_at, updated_at
             FROM activity_templates WHERE therapist_id = ? ORDER BY description",
        )?;

        let templates = stmt
            .query_map([therapist.to_string()], template_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(templates)
    }

    pub fn get_template(&self, therapist: Uuid, id: Uuid) -> Result<ActivityTemplate> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, therapist_id, description, created_at, updated_at
             FROM activity_templates WHERE id = ? AND therapist_id = ?",
        )?;

        let mut rows = stmt.query((id.to_string(), therapist.to_string()))?;
        if let Some(row) = rows.next()? {
            Ok(template_from_row(row)?)
        } else {
            Err(Error::NotFound("activity template"))
        }
    }

    pub fn create_template(
        &self,
        therapist: Uuid,
        input: CreateTemplateInput,
    ) -> Result<ActivityTemplate> {
        input.validate()?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO activity_templates (id, therapist_id, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                therapist.to_string(),
                &input.description,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(ActivityTemplate {
            id,
            therapist_id: therapist,
            description: input.description,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_template(
        &self,
        therapist: Uuid,
        id: Uuid,
        input: UpdateTemplateInput,
    ) -> Result<ActivityTemplate> {
        input.validate()?;
        let existing = self.get_template(therapist, id)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let description = input.description.unwrap_or(existing.description);

        conn.execute(
            "UPDATE activity_templates SET description = ?, updated_at = ?
             WHERE id = ? AND therapist_id = ?",
            (
                &description,
                now.to_rfc3339(),
                id.to_string(),
                therapist.to_string(),
            ),
        )?;

        Ok(ActivityTemplate {
            id,
            therapist_id: therapist,
            description,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    pub fn delete_template(&self, therapist: Uuid, id: Uuid) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM activity_templates WHERE id = ? AND therapist_id = ?",
            (id.to_string(), therapist.to_string()),
        )?;
        if rows == 0 {
            return Err(Error::NotFound("activity template"));
        }
        Ok(())
    }

    // ============================================================
    // Session lifecycle operations
    // ============================================================

    /// Start a session for a patient, or return the already-open one.
    ///
    /// The second tuple element is true when a new session was created.
    /// The open-session check runs before the insert; the partial unique
    /// index on open sessions backs it up at the store level. When two
    /// callers race past the check, the loser's insert trips the index and
    /// resolves to the winner's session instead of an error.
    pub fn start_session(&self, therapist: Uuid, patient_id: Uuid) -> Result<(Session, bool)> {
        self.get_patient(therapist, patient_id)?;

        if let Some(open) = self.find_open_session(therapist, patient_id)? {
            return Ok((open, false));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let inserted = {
            let conn = self.conn.lock().expect("database lock poisoned");
            conn.execute(
                "INSERT INTO sessions (id, patient_id, therapist_id, started_at, closed)
                 VALUES (?, ?, ?, ?, 0)",
                (
                    id.to_string(),
                    patient_id.to_string(),
                    therapist.to_string(),
                    now.to_rfc3339(),
                ),
            )
        };

        match inserted {
            Ok(_) => Ok((
                Session {
                    id,
                    patient_id,
                    therapist_id: therapist,
                    started_at: now,
                    closed: false,
                },
                true,
            )),
            Err(err) if is_constraint_violation(&err) => {
                // Lost the race: another request opened the session between
                // the lookup and the insert.
                self.find_open_session(therapist, patient_id)?
                    .map(|open| (open, false))
                    .ok_or_else(|| Error::Db(err))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn get_session(&self, therapist: Uuid, id: Uuid) -> Result<Session> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, patient_id, therapist_id, started_at, closed
             FROM sessions WHERE id = ? AND therapist_id = ?",
        )?;

        let mut rows = stmt.query((id.to_string(), therapist.to_string()))?;
        if let Some(row) = rows.next()? {
            Ok(session_from_row(row)?)
        } else {
            Err(Error::NotFound("session"))
        }
    }

    pub fn list_sessions(&self, therapist: Uuid) -> Result<Vec<Session>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, patient_id, therapist_id, started_at, closed
             FROM sessions WHERE therapist_id = ? ORDER BY started_at DESC",
        )?;

        let sessions = stmt
            .query_map([therapist.to_string()], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// All open sessions for the therapist, newest-first.
    pub fn open_sessions(&self, therapist: Uuid) -> Result<Vec<Session>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, patient_id, therapist_id, started_at, closed
             FROM sessions WHERE therapist_id = ? AND closed = 0
             ORDER BY started_at DESC",
        )?;

        let sessions = stmt
            .query_map([therapist.to_string()], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// All sessions (open and closed) for one patient, newest-first.
    pub fn session_history(&self, therapist: Uuid, patient_id: Uuid) -> Result<Vec<Session>> {
        self.get_patient(therapist, patient_id)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, patient_id, therapist_id, started_at, closed
             FROM sessions WHERE patient_id = ? AND therapist_id = ?
             ORDER BY started_at DESC",
        )?;

        let sessions = stmt
            .query_map((patient_id.to_string(), therapist.to_string()), session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Close a session. Closing an already-closed session is a no-op.
    ///
    /// The second tuple element is true when this call performed the
    /// open→closed transition.
    pub fn close_session(&self, therapist: Uuid, id: Uuid) -> Result<(Session, bool)> {
        let session = self.get_session(therapist, id)?;
        if session.closed {
            return Ok((session, false));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "UPDATE sessions SET closed = 1 WHERE id = ? AND therapist_id = ?",
            (id.to_string(), therapist.to_string()),
        )?;

        Ok((
            Session {
                closed: true,
                ..session
            },
            true,
        ))
    }

    /// REST update: the only mutable field is `closed`, and only false→true.
    pub fn update_session(
        &self,
        therapist: Uuid,
        id: Uuid,
        input: UpdateSessionInput,
    ) -> Result<Session> {
        match input.closed {
            Some(true) => Ok(self.close_session(therapist, id)?.0),
            Some(false) => {
                let session = self.get_session(therapist, id)?;
                if session.closed {
                    Err(Error::Conflict("a closed session cannot be reopened"))
                } else {
                    Ok(session)
                }
            }
            None => self.get_session(therapist, id),
        }
    }

    pub fn delete_session(&self, therapist: Uuid, id: Uuid) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM sessions WHERE id = ? AND therapist_id = ?",
            (id.to_string(), therapist.to_string()),
        )?;
        if rows == 0 {
            return Err(Error::NotFound("session"));
        }
        Ok(())
    }

    fn find_open_session(&self, therapist: Uuid, patient_id: Uuid) -> Result<Option<Session>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, patient_id, therapist_id, started_at, closed
             FROM sessions WHERE patient_id = ? AND therapist_id = ? AND closed = 0",
        )?;

        let mut rows = stmt.query((patient_id.to_string(), therapist.to_string()))?;
        if let Some(row) = rows.next()? {
            Ok(Some(session_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    // ============================================================
    // Session activity operations
    // ============================================================

    /// Attach template activities to an open session, all-or-nothing.
    ///
    /// An empty selection is a caller error, a closed session a conflict,
    /// and any template outside the therapist's scope rolls the whole
    /// batch back.
    pub fn add_activities(
        &self,
        therapist: Uuid,
        session_id: Uuid,
        template_ids: &[Uuid],
    ) -> Result<Vec<SessionActivity>> {
        if template_ids.is_empty() {
            return Err(Error::Validation("no activities selected".into()));
        }

        let session = self.get_session(therapist, session_id)?;
        if session.closed {
            return Err(Error::Conflict("session is already closed"));
        }

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let now = Utc::now();
        let mut created = Vec::with_capacity(template_ids.len());

        for &template_id in template_ids {
            let owned: i64 = tx.query_row(
                "SELECT COUNT(*) FROM activity_templates WHERE id = ? AND therapist_id = ?",
                (template_id.to_string(), therapist.to_string()),
                |row| row.get(0),
            )?;
            if owned == 0 {
                // Dropping the transaction rolls back the batch.
                return Err(Error::NotFound("activity template"));
            }

            let id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO session_activities (id, session_id, template_id, response, notes, recorded_at)
                 VALUES (?, ?, ?, 'positive', NULL, ?)",
                (
                    id.to_string(),
                    session_id.to_string(),
                    template_id.to_string(),
                    now.to_rfc3339(),
                ),
            )?;

            created.push(SessionActivity {
                id,
                session_id,
                template_id,
                response: ActivityResponse::Positive,
                notes: None,
                recorded_at: now,
            });
        }

        tx.commit()?;
        Ok(created)
    }

    /// All activities for a session, newest-first by recording time.
    pub fn activities_for_session(
        &self,
        therapist: Uuid,
        session_id: Uuid,
    ) -> Result<Vec<SessionActivity>> {
        self.get_session(therapist, session_id)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, session_id, template_id, response, notes, recorded_at
             FROM session_activities WHERE session_id = ?
             ORDER BY recorded_at DESC, id",
        )?;

        let activities = stmt
            .query_map([session_id.to_string()], activity_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(activities)
    }

    pub fn get_activity(&self, therapist: Uuid, id: Uuid) -> Result<SessionActivity> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT a.id, a.session_id, a.template_id, a.response, a.notes, a.recorded_at
             FROM session_activities a JOIN sessions s ON s.id = a.session_id
             WHERE a.id = ? AND s.therapist_id = ?",
        )?;

        let mut rows = stmt.query((id.to_string(), therapist.to_string()))?;
        if let Some(row) = rows.next()? {
            Ok(activity_from_row(row)?)
        } else {
            Err(Error::NotFound("session activity"))
        }
    }

    /// REST create: one activity on an open session.
    pub fn create_activity(
        &self,
        therapist: Uuid,
        input: CreateActivityInput,
    ) -> Result<SessionActivity> {
        let session = self.get_session(therapist, input.session_id)?;
        if session.closed {
            return Err(Error::Conflict("session is already closed"));
        }
        self.get_template(therapist, input.template_id)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let response = input.response.unwrap_or(ActivityResponse::Positive);

        conn.execute(
            "INSERT INTO session_activities (id, session_id, template_id, response, notes, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                input.session_id.to_string(),
                input.template_id.to_string(),
                response.as_str(),
                &input.notes,
                now.to_rfc3339(),
            ),
        )?;

        Ok(SessionActivity {
            id,
            session_id: input.session_id,
            template_id: input.template_id,
            response,
            notes: input.notes,
            recorded_at: now,
        })
    }

    /// Edit response/notes. Deliberately does not check whether the parent
    /// session is still open: reports are static snapshots, so later edits
    /// only show up when a report is regenerated.
    ///
    /// Omitted notes keep the stored text; a blank string clears it.
    pub fn update_activity(
        &self,
        therapist: Uuid,
        id: Uuid,
        input: UpdateActivityInput,
    ) -> Result<SessionActivity> {
        let existing = self.get_activity(therapist, id)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let response = input.response.unwrap_or(existing.response);
        let notes = match input.notes {
            Some(n) if n.trim().is_empty() => None,
            Some(n) => Some(n),
            None => existing.notes,
        };

        conn.execute(
            "UPDATE session_activities SET response = ?, notes = ? WHERE id = ?",
            (response.as_str(), &notes, id.to_string()),
        )?;

        Ok(SessionActivity {
            response,
            notes,
            ..existing
        })
    }

    pub fn delete_activity(&self, therapist: Uuid, id: Uuid) -> Result<()> {
        self.get_activity(therapist, id)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "DELETE FROM session_activities WHERE id = ?",
            [id.to_string()],
        )?;
        Ok(())
    }

    // ============================================================
    // Report data
    // ============================================================

    /// Join everything a session report needs: session, patient, therapist
    /// identity, and the activity list with template descriptions.
    pub fn session_report_data(
        &self,
        therapist: Uuid,
        session_id: Uuid,
    ) -> Result<SessionReportData> {
        let session = self.get_session(therapist, session_id)?;
        let patient = self.get_patient(therapist, session.patient_id)?;
        let therapist = self.get_therapist(therapist)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT m.description, a.response, a.notes, a.recorded_at
             FROM session_activities a
             JOIN activity_templates m ON m.id = a.template_id
             WHERE a.session_id = ?
             ORDER BY a.recorded_at DESC, a.id",
        )?;

        let activities = stmt
            .query_map([session_id.to_string()], |row| {
                Ok(ReportActivity {
                    description: row.get(0)?,
                    response: ActivityResponse::from_str(&row.get::<_, String>(1)?)
                        .unwrap_or(ActivityResponse::Positive),
                    notes: row.get(2)?,
                    recorded_at: parse_datetime(row.get::<_, String>(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SessionReportData {
            session,
            patient,
            therapist,
            activities,
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

// ============================================================
// Row mappers and parse helpers
// ============================================================

fn therapist_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Therapist> {
    Ok(Therapist {
        id: parse_uuid(row.get::<_, String>(0)?),
        username: row.get(1)?,
        created_at: parse_datetime(row.get::<_, String>(2)?),
    })
}

fn patient_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: parse_uuid(row.get::<_, String>(0)?),
        therapist_id: parse_uuid(row.get::<_, String>(1)?),
        name: row.get(2)?,
        birth_date: row.get::<_, Option<String>>(3)?.and_then(parse_date),
        created_at: parse_datetime(row.get::<_, String>(4)?),
        updated_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn template_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityTemplate> {
    Ok(ActivityTemplate {
        id: parse_uuid(row.get::<_, String>(0)?),
        therapist_id: parse_uuid(row.get::<_, String>(1)?),
        description: row.get(2)?,
        created_at: parse_datetime(row.get::<_, String>(3)?),
        updated_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: parse_uuid(row.get::<_, String>(0)?),
        patient_id: parse_uuid(row.get::<_, String>(1)?),
        therapist_id: parse_uuid(row.get::<_, String>(2)?),
        started_at: parse_datetime(row.get::<_, String>(3)?),
        closed: row.get::<_, i32>(4)? != 0,
    })
}

fn activity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionActivity> {
    Ok(SessionActivity {
        id: parse_uuid(row.get::<_, String>(0)?),
        session_id: parse_uuid(row.get::<_, String>(1)?),
        template_id: parse_uuid(row.get::<_, String>(2)?),
        response: ActivityResponse::from_str(&row.get::<_, String>(3)?)
            .unwrap_or(ActivityResponse::Positive),
        notes: row.get(4)?,
        recorded_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: String) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}
