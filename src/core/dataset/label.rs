use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::Path;

/// Extension of every label file written or read by the pipeline
pub const LABEL_EXTENSION: &str = "txt";

/// One bounding box in normalized center/width/height form
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    pub class_id: u32,
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
}

impl DetectionRecord {
    /// `class_id x_center y_center width height`
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        )
    }
}

impl fmt::Display for DetectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelInfo {
    pub detections: Vec<DetectionRecord>,
    /// Non-empty lines that were not a valid 5-token record
    pub skipped_lines: usize,
}

impl LabelInfo {
    pub fn is_background(&self) -> bool {
        self.detections.is_empty()
    }
}

/// Label file name for an image: same base name, `.txt` extension.
///
/// Works on the raw OS name, so non-UTF-8 names map to themselves.
/// Returns `None` when the path has no file name.
pub fn label_file_name(image_path: &Path) -> Option<OsString> {
    let name = image_path.file_name()?;
    Some(
        Path::new(name)
            .with_extension(LABEL_EXTENSION)
            .into_os_string(),
    )
}

/// Parse the contents of a label file.
///
/// Only lines with exactly five tokens that parse as `u32 f32 f32 f32 f32`
/// become detections.
pub fn parse_label_text(content: &str) -> LabelInfo {
    let mut info = LabelInfo::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let values: Vec<&str> = line.split_whitespace().collect();
        let parsed = if values.len() == 5 {
            match (
                values[0].parse::<u32>(),
                values[1].parse::<f32>(),
                values[2].parse::<f32>(),
                values[3].parse::<f32>(),
                values[4].parse::<f32>(),
            ) {
                (Ok(class_id), Ok(x), Ok(y), Ok(w), Ok(h)) => Some(DetectionRecord {
                    class_id,
                    x_center: x,
                    y_center: y,
                    width: w,
                    height: h,
                }),
                _ => None,
            }
        } else {
            None
        };

        match parsed {
            Some(record) => info.detections.push(record),
            None => info.skipped_lines += 1,
        }
    }

    info
}

/// Parse a label file from disk.
///
/// # Returns
/// * `Some(LabelInfo)` if the file could be read
/// * `None` if the file doesn't exist or cannot be read
pub fn parse_label_file(label_path: &Path) -> Option<LabelInfo> {
    let content = fs::read_to_string(label_path).ok()?;
    Some(parse_label_text(&content))
}
