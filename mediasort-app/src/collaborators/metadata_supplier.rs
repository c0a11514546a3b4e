use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;
use exif::{In, Tag};
use mediasort_common::{CoreError, CoreResult, Metadata};
use mediasort_core::MetadataSupplier;

use crate::datetime::parse_exif_datetime;

/// EXIF-backed reference `MetadataSupplier` (spec.md §6), grounded on the
/// `Make`/`Model`/`GPSLatitude`/`DateTimeOriginal` tag lookups other EXIF
/// dedup tools in this corpus use. Falls back to `image`'s own decoded
/// dimensions when a file carries no EXIF block at all (most re-encoded or
/// non-JPEG images).
pub struct RealMetadataSupplier;

#[async_trait]
impl MetadataSupplier for RealMetadataSupplier {
    async fn metadata(&self, path: &Path) -> CoreResult<Metadata> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || metadata_blocking(&owned))
            .await
            .map_err(|e| CoreError::Unreadable { path: path.to_path_buf(), reason: e.to_string() })?
    }
}

fn metadata_blocking(path: &Path) -> CoreResult<Metadata> {
    let exif_fields = read_exif(path);
    let (width, height) = read_dimensions(path);

    Ok(Metadata {
        image_date: exif_fields.as_ref().and_then(|e| e.image_date),
        gps_lat: exif_fields.as_ref().and_then(|e| e.gps_lat),
        gps_lon: exif_fields.as_ref().and_then(|e| e.gps_lon),
        camera_model: exif_fields.and_then(|e| e.camera_model),
        width,
        height,
    })
}

struct ExifFields {
    image_date: Option<SystemTime>,
    gps_lat: Option<f64>,
    gps_lon: Option<f64>,
    camera_model: Option<String>,
}

fn read_exif(path: &Path) -> Option<ExifFields> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;

    let image_date = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .and_then(|f| parse_exif_datetime(&f.display_value().to_string()));

    let camera_model = exif
        .get_field(Tag::Model, In::PRIMARY)
        .map(|f| f.display_value().to_string().trim().to_string())
        .filter(|s| !s.is_empty());

    let gps_lat = extract_gps_coord(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, "S");
    let gps_lon = extract_gps_coord(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, "W");

    Some(ExifFields { image_date, gps_lat, gps_lon, camera_model })
}

fn extract_gps_coord(exif: &exif::Exif, coord_tag: Tag, ref_tag: Tag, negative_ref: &str) -> Option<f64> {
    let field = exif.get_field(coord_tag, In::PRIMARY)?;
    let ref_field = exif.get_field(ref_tag, In::PRIMARY)?;
    let magnitude = parse_dms(&field.display_value().to_string())?;
    let sign = if ref_field.display_value().to_string().trim() == negative_ref { -1.0 } else { 1.0 };
    Some(magnitude * sign)
}

/// Parses EXIF's "X deg Y' Z.ZZ\"" degrees/minutes/seconds display form into
/// decimal degrees.
fn parse_dms(s: &str) -> Option<f64> {
    let numbers: Vec<f64> = s
        .split(|c: char| !c.is_ascii_digit() && c != '.')
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse::<f64>().ok())
        .collect();
    match numbers.as_slice() {
        [deg, min, sec, ..] => Some(deg + min / 60.0 + sec / 3600.0),
        _ => None,
    }
}

fn read_dimensions(path: &Path) -> (Option<u32>, Option<u32>) {
    image::image_dimensions(path).map(|(w, h)| (Some(w), Some(h))).unwrap_or((None, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_exif_datetime() {
        let ts = parse_exif_datetime("2023:07:04 12:30:00").unwrap();
        let secs = ts.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs();
        assert_eq!(secs, 1_688_473_800);
    }

    #[test]
    fn rejects_malformed_datetime() {
        assert!(parse_exif_datetime("not a date").is_none());
    }

    #[test]
    fn parses_dms_coordinate() {
        let deg = parse_dms("37 deg 46' 28.49\"").unwrap();
        let expected = 37.0 + 46.0 / 60.0 + 28.49 / 3600.0;
        assert!((deg - expected).abs() < 1e-6);
    }

    #[test]
    fn missing_file_yields_no_exif() {
        assert!(read_exif(Path::new("/nonexistent/path.jpg")).is_none());
    }
}
