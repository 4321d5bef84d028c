use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{DiseaseMapping, Doctor, ScheduleEntry};

// ── Doctors ──

/// Exact, case-sensitive match on the stored name.
pub fn find_doctor_by_name(conn: &Connection, name: &str) -> anyhow::Result<Option<Doctor>> {
    let doctor = conn
        .query_row(
            "SELECT id, name, specialization FROM doctors WHERE name = ?1 LIMIT 1",
            params![name],
            |row| {
                Ok(Doctor {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    specialization: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(doctor)
}

pub fn get_doctors_by_specialization(
    conn: &Connection,
    specialization: &str,
) -> anyhow::Result<Vec<Doctor>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, specialization FROM doctors WHERE specialization = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![specialization], |row| {
        Ok(Doctor {
            id: row.get(0)?,
            name: row.get(1)?,
            specialization: row.get(2)?,
        })
    })?;

    let mut doctors = vec![];
    for row in rows {
        doctors.push(row?);
    }
    Ok(doctors)
}

pub fn insert_doctor(conn: &Connection, name: &str, specialization: &str) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO doctors (name, specialization) VALUES (?1, ?2)",
        params![name, specialization],
    )?;
    Ok(conn.last_insert_rowid())
}

// ── Availability ──

pub fn get_schedule(conn: &Connection, doctor_id: i64) -> anyhow::Result<Vec<ScheduleEntry>> {
    let mut stmt = conn.prepare(
        "SELECT day, time_start, time_end FROM availability WHERE doctor_id = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![doctor_id], |row| {
        Ok(ScheduleEntry {
            day: row.get(0)?,
            time_start: row.get(1)?,
            time_end: row.get(2)?,
        })
    })?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

pub fn insert_schedule(
    conn: &Connection,
    doctor_id: i64,
    entry: &ScheduleEntry,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO availability (doctor_id, day, time_start, time_end) VALUES (?1, ?2, ?3, ?4)",
        params![doctor_id, entry.day, entry.time_start, entry.time_end],
    )?;
    Ok(())
}

// ── Disease reference mapping ──

pub fn list_disease_mappings(conn: &Connection) -> anyhow::Result<Vec<DiseaseMapping>> {
    let mut stmt = conn.prepare(
        "SELECT disease_or_symptom, specialization FROM disease_to_specialization ORDER BY id ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(DiseaseMapping {
            disease_or_symptom: row.get(0)?,
            specialization: row.get(1)?,
        })
    })?;

    let mut mappings = vec![];
    for row in rows {
        mappings.push(row?);
    }
    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn entry(day: &str, start: &str, end: &str) -> ScheduleEntry {
        ScheduleEntry {
            day: day.to_string(),
            time_start: start.to_string(),
            time_end: end.to_string(),
        }
    }

    #[test]
    fn test_find_doctor_by_name_is_case_sensitive() {
        let conn = init_db(":memory:").unwrap();
        insert_doctor(&conn, "Dr. Andi", "Kardiolog").unwrap();

        assert!(find_doctor_by_name(&conn, "Dr. Andi").unwrap().is_some());
        assert!(find_doctor_by_name(&conn, "dr. andi").unwrap().is_none());
        assert!(find_doctor_by_name(&conn, "Dr. Andi'; DROP TABLE doctors; --").unwrap().is_none());
    }

    #[test]
    fn test_schedule_keeps_insertion_order() {
        let conn = init_db(":memory:").unwrap();
        let id = insert_doctor(&conn, "Dr. Sari", "Spesialis THT").unwrap();
        insert_schedule(&conn, id, &entry("Senin", "08:00", "10:00")).unwrap();
        insert_schedule(&conn, id, &entry("Rabu", "13:00", "15:00")).unwrap();

        let schedule = get_schedule(&conn, id).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].day, "Senin");
        assert_eq!(schedule[1].day, "Rabu");
    }

    #[test]
    fn test_doctors_by_specialization() {
        let conn = init_db(":memory:").unwrap();
        insert_doctor(&conn, "Dr. Sari", "Spesialis THT").unwrap();
        insert_doctor(&conn, "Dr. Andi", "Kardiolog").unwrap();
        insert_doctor(&conn, "Dr. Tono", "Spesialis THT").unwrap();

        let doctors = get_doctors_by_specialization(&conn, "Spesialis THT").unwrap();
        let names: Vec<_> = doctors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Dr. Sari", "Dr. Tono"]);
    }
}
