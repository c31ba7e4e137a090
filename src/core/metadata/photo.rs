//! Photo metadata from embedded EXIF (kamadak-exif).

use super::ExtractedMetadata;
use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tags consulted for the capture date, most specific first
const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Read EXIF from a photo. `None` when the file has no readable EXIF
/// block; any individual tag may still be missing.
pub(super) fn read_exif(path: &Path) -> Option<ExtractedMetadata> {
    let file = File::open(path).ok()?;
    let mut bufreader = BufReader::new(&file);
    let exif = Reader::new().read_from_container(&mut bufreader).ok()?;

    let mut metadata = ExtractedMetadata {
        capture_date: DATE_TAGS.iter().find_map(|tag| {
            exif.get_field(*tag, In::PRIMARY)
                .and_then(|field| get_string_value(&field.value))
                .and_then(|s| parse_exif_datetime(&s))
        }),
        ..Default::default()
    };

    // Prefer actual pixel dimensions
    if let Some(field) = exif.get_field(Tag::PixelXDimension, In::PRIMARY) {
        metadata.width = get_u32_value(&field.value);
    }
    if let Some(field) = exif.get_field(Tag::PixelYDimension, In::PRIMARY) {
        metadata.height = get_u32_value(&field.value);
    }
    if metadata.width.is_none() {
        if let Some(field) = exif.get_field(Tag::ImageWidth, In::PRIMARY) {
            metadata.width = get_u32_value(&field.value);
        }
    }
    if metadata.height.is_none() {
        if let Some(field) = exif.get_field(Tag::ImageLength, In::PRIMARY) {
            metadata.height = get_u32_value(&field.value);
        }
    }

    if let Some(field) = exif.get_field(Tag::Make, In::PRIMARY) {
        metadata.camera_make = get_string_value(&field.value);
    }
    if let Some(field) = exif.get_field(Tag::Model, In::PRIMARY) {
        metadata.camera_model = get_string_value(&field.value);
    }

    Some(metadata)
}

/// Parse the EXIF date format "YYYY:MM:DD HH:MM:SS"
pub(super) fn parse_exif_datetime(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Helper to extract u32 from various EXIF value types
fn get_u32_value(value: &Value) -> Option<u32> {
    match value {
        Value::Long(vec) => vec.first().copied(),
        Value::Short(vec) => vec.first().map(|v| *v as u32),
        _ => None,
    }
}

/// Helper to extract string from EXIF ASCII value
fn get_string_value(value: &Value) -> Option<String> {
    let Value::Ascii(ref vec) = value else {
        return None;
    };
    let s = std::str::from_utf8(vec.first()?).ok()?;
    let trimmed = s.trim_end_matches('\0').trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
