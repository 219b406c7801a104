use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::SummaryType;
use crate::models::{Document, DocumentMetadata};

const METADATA_COLUMNS: &str = "id, filename, filesize, filetype, case_id, uploaded_by,
     created_at, uploaded_at, summary_type, last_summarized";

pub fn insert_document(conn: &Connection, doc: &Document) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, filename, filesize, filetype, file_data, encryption_iv,
         case_id, uploaded_by, created_at, uploaded_at, summary, summary_type, last_summarized,
         summary_source_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            doc.id.to_string(),
            doc.filename,
            doc.filesize,
            doc.filetype,
            doc.file_data,
            doc.encryption_iv,
            doc.case_id,
            doc.uploaded_by,
            doc.created_at.to_rfc3339(),
            doc.uploaded_at.to_rfc3339(),
            doc.summary,
            doc.summary_type.map(|t| t.as_str()),
            doc.last_summarized.map(|t| t.to_rfc3339()),
            doc.summary_source_hash,
        ],
    )?;
    Ok(())
}

/// Full record including ciphertext.
pub fn get_document(conn: &Connection, id: &Uuid) -> Result<Option<Document>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, filesize, filetype, file_data, encryption_iv, case_id, uploaded_by,
         created_at, uploaded_at, summary, summary_type, last_summarized, summary_source_hash
         FROM documents WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok(DocumentRow {
            id: row.get(0)?,
            filename: row.get(1)?,
            filesize: row.get(2)?,
            filetype: row.get(3)?,
            file_data: row.get(4)?,
            encryption_iv: row.get(5)?,
            case_id: row.get(6)?,
            uploaded_by: row.get(7)?,
            created_at: row.get(8)?,
            uploaded_at: row.get(9)?,
            summary: row.get(10)?,
            summary_type: row.get(11)?,
            last_summarized: row.get(12)?,
            summary_source_hash: row.get(13)?,
        })
    });

    match result {
        Ok(row) => Ok(Some(document_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Case id of a document without loading its ciphertext.
pub fn get_document_case_id(conn: &Connection, id: &Uuid) -> Result<Option<String>, DatabaseError> {
    let result = conn.query_row(
        "SELECT case_id FROM documents WHERE id = ?1",
        params![id.to_string()],
        |row| row.get::<_, String>(0),
    );
    match result {
        Ok(case_id) => Ok(Some(case_id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Metadata for every document of a case, newest first. Ciphertext is never selected.
pub fn list_documents_by_case(
    conn: &Connection,
    case_id: &str,
) -> Result<Vec<DocumentMetadata>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {METADATA_COLUMNS} FROM documents WHERE case_id = ?1
         ORDER BY created_at DESC, id"
    ))?;

    let rows = stmt.query_map(params![case_id], |row| {
        Ok(MetadataRow {
            id: row.get(0)?,
            filename: row.get(1)?,
            filesize: row.get(2)?,
            filetype: row.get(3)?,
            case_id: row.get(4)?,
            uploaded_by: row.get(5)?,
            created_at: row.get(6)?,
            uploaded_at: row.get(7)?,
            summary_type: row.get(8)?,
            last_summarized: row.get(9)?,
        })
    })?;

    let mut docs = Vec::new();
    for row in rows {
        docs.push(metadata_from_row(row?)?);
    }
    Ok(docs)
}

/// Persist a computed summary on the record (summary cache).
pub fn update_document_summary(
    conn: &Connection,
    id: &Uuid,
    summary: &str,
    summary_type: SummaryType,
    source_hash: &str,
    summarized_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE documents SET summary = ?2, summary_type = ?3, last_summarized = ?4,
         summary_source_hash = ?5 WHERE id = ?1",
        params![
            id.to_string(),
            summary,
            summary_type.as_str(),
            summarized_at.to_rfc3339(),
            source_hash,
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::DocumentMissing(*id));
    }
    Ok(())
}

// Internal row types for Document mapping
struct DocumentRow {
    id: String,
    filename: String,
    filesize: i64,
    filetype: String,
    file_data: Vec<u8>,
    encryption_iv: String,
    case_id: String,
    uploaded_by: String,
    created_at: String,
    uploaded_at: String,
    summary: Option<String>,
    summary_type: Option<String>,
    last_summarized: Option<String>,
    summary_source_hash: Option<String>,
}

struct MetadataRow {
    id: String,
    filename: String,
    filesize: i64,
    filetype: String,
    case_id: String,
    uploaded_by: String,
    created_at: String,
    uploaded_at: String,
    summary_type: Option<String>,
    last_summarized: Option<String>,
}

fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::CorruptRow(e.to_string()))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow(format!("bad timestamp {raw}: {e}")))
}

fn parse_summary_type(raw: Option<String>) -> Result<Option<SummaryType>, DatabaseError> {
    raw.as_deref().map(SummaryType::from_str).transpose()
}

fn document_from_row(row: DocumentRow) -> Result<Document, DatabaseError> {
    Ok(Document {
        id: parse_uuid(&row.id)?,
        filename: row.filename,
        filesize: row.filesize,
        filetype: row.filetype,
        file_data: row.file_data,
        encryption_iv: row.encryption_iv,
        case_id: row.case_id,
        uploaded_by: row.uploaded_by,
        created_at: parse_timestamp(&row.created_at)?,
        uploaded_at: parse_timestamp(&row.uploaded_at)?,
        summary: row.summary,
        summary_type: parse_summary_type(row.summary_type)?,
        last_summarized: row.last_summarized.as_deref().map(parse_timestamp).transpose()?,
        summary_source_hash: row.summary_source_hash,
    })
}

fn metadata_from_row(row: MetadataRow) -> Result<DocumentMetadata, DatabaseError> {
    Ok(DocumentMetadata {
        id: parse_uuid(&row.id)?,
        filename: row.filename,
        filesize: row.filesize,
        filetype: row.filetype,
        case_id: row.case_id,
        uploaded_by: row.uploaded_by,
        created_at: parse_timestamp(&row.created_at)?,
        uploaded_at: parse_timestamp(&row.uploaded_at)?,
        summary_type: parse_summary_type(row.summary_type)?,
        last_summarized: row.last_summarized.as_deref().map(parse_timestamp).transpose()?,
    })
}
