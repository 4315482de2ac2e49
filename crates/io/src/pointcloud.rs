// ASCII point-cloud import and scan directory discovery

use std::io::Read;
use std::path::{Path, PathBuf};

use asbuilt_recon::element::ElementKind;
use asbuilt_recon::error::ReconError;
use asbuilt_recon::geometry::Point3;
use asbuilt_recon::scan::SegmentedCloud;

/// File extensions accepted as point clouds.
pub const CLOUD_EXTENSIONS: &[&str] = &["txt", "xyz", "pts", "asc"];

/// Read file and convert to UTF-8 if needed. Scanner exports are
/// occasionally written in a Windows code page.
fn read_file_as_utf8(path: &Path) -> Result<String, ReconError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Parse whitespace-separated lines; the first three fields are x, y, z.
/// Extra fields (intensity, colour) are ignored. Lines with fewer than three
/// numeric fields are skipped.
pub fn parse_points(content: &str) -> Vec<Point3> {
    let mut points = Vec::new();
    let mut skipped = 0usize;
    for line in content.lines() {
        let mut fields = line.split_whitespace().map(str::parse::<f64>);
        match (fields.next(), fields.next(), fields.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => points.push(Point3::new(x, y, z)),
            _ if line.trim().is_empty() => {}
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        log::debug!("skipped {skipped} malformed point lines");
    }
    points
}

pub fn read_points(path: &Path) -> Result<Vec<Point3>, ReconError> {
    let content = read_file_as_utf8(path)?;
    Ok(parse_points(&content))
}

/// Kind of a segmented file from its name prefix (`wall3`, `Column12`, ...).
pub fn kind_from_name(stem: &str) -> Option<ElementKind> {
    let lower = stem.to_ascii_lowercase();
    [
        ("wall", ElementKind::Wall),
        ("column", ElementKind::Column),
        ("ceiling", ElementKind::Ceiling),
    ]
    .into_iter()
    .find(|(prefix, _)| lower.starts_with(prefix))
    .map(|(_, kind)| kind)
}

pub fn read_cloud(path: &Path) -> Result<SegmentedCloud, ReconError> {
    let name = stem(path)?;
    let kind = kind_from_name(&name).ok_or_else(|| {
        ReconError::Io(format!(
            "{}: file name must start with wall, column or ceiling",
            path.display()
        ))
    })?;
    Ok(SegmentedCloud {
        name,
        kind,
        points: read_points(path)?,
    })
}

fn stem(path: &Path) -> Result<String, ReconError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| ReconError::Io(format!("{}: not a file name", path.display())))
}

/// Sort key: kind prefix, then the trailing number compared numerically, so
/// `wall2` comes before `wall10`.
fn natural_key(name: &str) -> (String, u64, String) {
    let lower = name.to_ascii_lowercase();
    let digits = lower.len() - lower.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (prefix, number) = lower.split_at(lower.len() - digits);
    (prefix.to_string(), number.parse().unwrap_or(0), lower.clone())
}

/// Collect every segmented cloud in `dir`, walls first, then columns, then
/// ceilings, each in natural name order. Files that are not clouds or whose
/// names carry no known kind are ignored.
pub fn discover_scans(dir: &Path) -> Result<Vec<SegmentedCloud>, ReconError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ReconError::Io(format!("{}: {e}", dir.display())))?;

    let mut files: Vec<(ElementKind, PathBuf)> = Vec::new();
    for entry in entries {
        let path = entry.map_err(ReconError::from)?.path();
        let is_cloud = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| CLOUD_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if !path.is_file() || !is_cloud {
            continue;
        }
        match kind_from_name(&stem(&path)?) {
            Some(kind) => files.push((kind, path)),
            None => log::debug!("ignoring {}", path.display()),
        }
    }

    let rank = |k: &ElementKind| match k {
        ElementKind::Wall => 0,
        ElementKind::Column => 1,
        ElementKind::Ceiling => 2,
        ElementKind::Opening => 3,
    };
    files.sort_by_cached_key(|(kind, path)| {
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        (rank(kind), natural_key(name))
    });

    let mut clouds = Vec::with_capacity(files.len());
    for (_, path) in &files {
        let cloud = read_cloud(path)?;
        log::debug!("{}: {} points", cloud.name, cloud.points.len());
        clouds.push(cloud);
    }
    log::info!("{}: {} segmented clouds", dir.display(), clouds.len());
    Ok(clouds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_short_and_garbage_lines() {
        let content = "1 2 3\n4 5\n\nx y z\n7.5\t8.5 9.5 120 255 0\n";
        let points = parse_points(content);
        assert_eq!(points, vec![Point3::new(1.0, 2.0, 3.0), Point3::new(7.5, 8.5, 9.5)]);
    }

    #[test]
    fn kind_prefix_is_case_insensitive() {
        assert_eq!(kind_from_name("Wall12"), Some(ElementKind::Wall));
        assert_eq!(kind_from_name("column_3"), Some(ElementKind::Column));
        assert_eq!(kind_from_name("ceiling1"), Some(ElementKind::Ceiling));
        assert_eq!(kind_from_name("region"), None);
    }

    #[test]
    fn natural_order_compares_numbers() {
        let mut names = vec!["wall10", "wall2", "wall1"];
        names.sort_by_key(|n| natural_key(n));
        assert_eq!(names, vec!["wall1", "wall2", "wall10"]);
    }

    #[test]
    fn discovery_orders_by_kind_then_number() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ceiling1.txt", "wall10.xyz", "column1.txt", "wall2.txt", "notes.md", "region.txt"] {
            std::fs::write(dir.path().join(name), "0 0 0\n1 1 1\n").unwrap();
        }
        let clouds = discover_scans(dir.path()).unwrap();
        let names: Vec<&str> = clouds.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["wall2", "wall10", "column1", "ceiling1"]);
        assert!(clouds.iter().all(|c| c.points.len() == 2));
    }

    #[test]
    fn latin1_file_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wall1.txt");
        std::fs::write(&path, b"1 2 3 \xe9\n").unwrap();
        assert_eq!(read_points(&path).unwrap(), vec![Point3::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let err = discover_scans(Path::new("/nonexistent/scans")).unwrap_err();
        assert!(matches!(err, ReconError::Io(_)));
    }
}
