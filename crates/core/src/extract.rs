//! Single-package extraction: container → property set → record.

use std::{fs::File, io::BufReader, path::Path};

use crate::{
    error::FormatResult,
    format::{decode_property_set, read_container, ContainerIndex},
    models::PackageRecord,
    normalize::{classify, normalize},
};

/// Extract a record from a package held in memory.
///
/// The record carries the icon bytes (if any) but no file path, so its
/// `app_type` reflects the category alone.
pub fn extract(data: &[u8]) -> FormatResult<PackageRecord> {
    let view = read_container(data)?;
    let properties = decode_property_set(view.metadata()?)?;
    let mut record = normalize(properties, data.len() as u64);
    record.icon_bytes = view.icon()?.map(<[u8]>::to_vec);
    Ok(record)
}

/// Extract a record from a package on disk, reading only the header, the
/// descriptor table and the two embedded resources.
pub fn extract_file(path: &Path) -> FormatResult<PackageRecord> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let index = ContainerIndex::from_reader(&mut reader)?;
    let blob = ContainerIndex::read_resource(&mut reader, &index.metadata)?;
    let properties = decode_property_set(&blob)?;
    let icon = index
        .icon
        .as_ref()
        .map(|descriptor| ContainerIndex::read_resource(&mut reader, descriptor))
        .transpose()?;

    let mut record = normalize(properties, file_size);
    record.icon_bytes = icon;
    record.app_type = classify(path.parent(), record.category.as_deref());
    record.file_path = path.to_path_buf();
    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;
    use tempfile::tempdir;

    use super::*;
    use crate::{
        error::FormatError,
        format::fixtures::{game_properties, ContainerFixture},
        models::{AppType, Region},
    };

    #[test]
    fn extracts_record_from_memory() {
        let bytes = ContainerFixture::new()
            .properties(game_properties(
                "CUSA00001",
                "EP0001-CUSA00001_00-SAMPLEGAME000000",
                "Sample Game",
                "gd",
            ))
            .icon(b"\x89PNG\r\n\x1a\nicon".to_vec())
            .build();
        let record = extract(&bytes).unwrap();
        assert_eq!(record.title_id.as_deref(), Some("CUSA00001"));
        assert_eq!(record.title, "Sample Game");
        assert_eq!(record.region, Some(Region::Eu));
        assert_eq!(record.system_version.as_deref(), Some("5.05"));
        assert_eq!(record.sdk_version.as_deref(), Some("5.05"));
        assert_eq!(record.size_bytes, bytes.len() as u64);
        assert!(record.icon_bytes.is_some());
        assert!(record.icon_reference.is_none());
    }

    #[test]
    fn metadata_must_be_a_property_set() {
        let bytes = ContainerFixture::new().metadata(b"not a psf".to_vec()).build();
        assert!(matches!(
            extract(&bytes),
            Err(FormatError::BadMagic { expected: "property set" })
        ));
    }

    #[test]
    fn extracts_from_disk_with_path_classification() -> Result<()> {
        let temp = tempdir()?;
        let dir = temp.path().join("patches");
        fs::create_dir_all(&dir)?;
        let path = dir.join("sample.pkg");
        fs::write(
            &path,
            ContainerFixture::new()
                .properties(game_properties(
                    "CUSA00001",
                    "UP0001-CUSA00001_00-SAMPLEGAME000000",
                    "Sample Game",
                    "gp",
                ))
                .build(),
        )?;

        let record = extract_file(&path)?;
        assert_eq!(record.app_type, AppType::Patch);
        assert_eq!(record.version, "01.05 (Update)");
        assert_eq!(record.file_path, path);
        assert!(record.icon_bytes.is_none());
        Ok(())
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = extract_file(Path::new("/nonexistent/package.pkg")).unwrap_err();
        assert!(matches!(err, FormatError::Io(_)));
    }
}
