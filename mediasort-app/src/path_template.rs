use std::path::PathBuf;

use mediasort_common::FileInfo;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::datetime::civil_date;

/// Renders a destination path from a placeholder template (spec.md §6: "a
/// path-format template governs target placement with placeholders for date
/// components, filename variants, geotag presence, camera model, media type,
/// and a random suffix").
///
/// Recognized placeholders: `{year}` `{month}` `{day}` `{stem}` `{ext}`
/// `{filename}` `{kind}` `{camera}` `{geo}` `{rand}`.
pub fn render(template: &str, file: &FileInfo) -> PathBuf {
    let date = file.metadata.image_date.unwrap_or(file.file_stats.mtime);
    let (year, month, day) = civil_date(date);

    let filename = file.path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let stem = file.path.file_stem().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let ext = file.path.extension().map(|e| e.to_string_lossy().to_string()).unwrap_or_default();
    let kind = if file.media.is_video() { "video" } else { "photo" };
    let camera = file.metadata.camera_model.as_deref().map(sanitize).unwrap_or_else(|| "unknown".to_string());
    let geo = if file.metadata.has_gps() { "geo" } else { "nogeo" };
    let rand_suffix = random_suffix();

    let rendered = template
        .replace("{year}", &format!("{year:04}"))
        .replace("{month}", &format!("{month:02}"))
        .replace("{day}", &format!("{day:02}"))
        .replace("{stem}", &stem)
        .replace("{ext}", &ext)
        .replace("{filename}", &filename)
        .replace("{kind}", kind)
        .replace("{camera}", &camera)
        .replace("{geo}", geo)
        .replace("{rand}", &rand_suffix);

    PathBuf::from(rendered)
}

fn sanitize(s: &str) -> String {
    s.chars().map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
}

fn random_suffix() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(6).map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::SystemTime;

    use mediasort_common::{FileStats, MediaInfo, Metadata};

    use super::*;

    fn sample_file(path: &str, image_date: Option<SystemTime>) -> FileInfo {
        FileInfo {
            path: PathBuf::from(path),
            file_stats: FileStats { size: 10, mtime: SystemTime::UNIX_EPOCH, ctime: SystemTime::UNIX_EPOCH, content_hash: [0u8; 16] },
            metadata: Metadata { image_date, gps_lat: None, gps_lon: None, camera_model: Some("Canon EOS 90D".to_string()), width: Some(100), height: Some(100) },
            media: MediaInfo::new(0.0, vec![]),
        }
    }

    #[test]
    fn substitutes_date_and_filename_placeholders() {
        let date = std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_688_473_800);
        let file = sample_file("/src/IMG_0001.jpg", Some(date));
        let rendered = render("{year}/{month}/{kind}/{filename}", &file);
        assert_eq!(rendered, PathBuf::from("2023/07/photo/IMG_0001.jpg"));
    }

    #[test]
    fn falls_back_to_mtime_when_no_exif_date() {
        let file = sample_file("/src/a.jpg", None);
        let rendered = render("{year}", &file);
        assert_eq!(rendered, PathBuf::from("1970"));
    }

    #[test]
    fn sanitizes_camera_model_for_path_safety() {
        let mut file = sample_file("/src/a.jpg", None);
        file.metadata.camera_model = Some("Canon EOS 90D/Mark II".to_string());
        let rendered = render("{camera}", &file);
        assert_eq!(rendered, PathBuf::from("Canon_EOS_90D_Mark_II"));
    }

    #[test]
    fn rand_suffix_is_six_alphanumeric_chars() {
        let file = sample_file("/src/a.jpg", None);
        let rendered = render("{rand}", &file);
        let s = rendered.to_string_lossy().to_string();
        assert_eq!(s.len(), 6);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
