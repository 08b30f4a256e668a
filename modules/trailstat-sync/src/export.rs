use std::path::Path;

use tracing::info;

use crate::error::SyncError;
use crate::types::ScrapedStatus;

pub const CSV_HEADER: [&str; 5] = ["id", "name", "badges", "points", "trails"];

/// Render statuses as CSV. The header row is always present.
pub fn to_csv(statuses: &[ScrapedStatus]) -> Result<Vec<u8>, SyncError> {
    let prep = |e: csv::Error| SyncError::CsvPreparation(e.to_string());

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER).map_err(prep)?;
    for status in statuses {
        writer.serialize(status).map_err(prep)?;
    }

    writer
        .into_inner()
        .map_err(|e| SyncError::CsvPreparation(e.to_string()))
}

/// Write statuses to `path`, replacing any previous export.
pub fn export_csv(statuses: &[ScrapedStatus], path: &Path) -> Result<(), SyncError> {
    let bytes = to_csv(statuses)?;

    let save = |e: std::io::Error| SyncError::CsvSave(format!("{}: {e}", path.display()));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(save)?;
        }
    }
    std::fs::write(path, bytes).map_err(save)?;

    info!(path = %path.display(), rows = statuses.len(), "CSV saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(id: &str, name: &str, badges: u64) -> ScrapedStatus {
        ScrapedStatus {
            id: id.to_string(),
            name: name.to_string(),
            badges,
            points: badges * 100,
            trails: badges / 2,
        }
    }

    #[test]
    fn empty_export_is_header_only() {
        let bytes = to_csv(&[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "id,name,badges,points,trails\n");
    }

    #[test]
    fn rows_follow_header_in_input_order() {
        let bytes = to_csv(&[status("a01", "Astro", 10), status("a02", "Codey", 4)]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "id,name,badges,points,trails\na01,Astro,10,1000,5\na02,Codey,4,400,2\n"
        );
    }

    #[test]
    fn names_with_commas_are_quoted_and_read_back() {
        let input = vec![
            status("a01", "Nomical, Astro", 3),
            status("a02", "Say \"Hi\" Codey", 1234),
            status("a03", "アストロ", 0),
        ];
        let bytes = to_csv(&input).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADER.to_vec());

        let parsed: Vec<ScrapedStatus> = reader.deserialize().map(|row| row.unwrap()).collect();
        assert_eq!(parsed, input);
    }

    #[test]
    fn export_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        export_csv(&[status("a01", "Astro", 1)], &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("id,name,badges,points,trails\n"));
        assert!(written.contains("a01,Astro,1,100,0"));
    }

    #[test]
    fn export_to_a_directory_path_is_a_save_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = export_csv(&[], dir.path()).unwrap_err();
        assert!(matches!(err, SyncError::CsvSave(_)), "got {err:?}");
    }
}
