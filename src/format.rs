//! The closed set of formats the converter understands.
//!
//! A [`Format`] is identified purely by file extension. There is no content
//! sniffing at this level: a mislabelled file is routed by its name and will
//! either fail to decode or be read as whatever its extension claims.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A recognised document or image type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Txt,
    Html,
    Csv,
    Md,
    Pdf,
    Doc,
    Docx,
    Xls,
    Xlsx,
    Jpg,
    Png,
    Gif,
}

/// Returned when a string does not name a known [`Format`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown format '{0}'")]
pub struct ParseFormatError(pub String);

impl Format {
    /// Every format, in registry order.
    pub const ALL: [Format; 12] = [
        Format::Txt,
        Format::Html,
        Format::Csv,
        Format::Md,
        Format::Pdf,
        Format::Doc,
        Format::Docx,
        Format::Xls,
        Format::Xlsx,
        Format::Jpg,
        Format::Png,
        Format::Gif,
    ];

    /// Canonical lower-case file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Txt => "txt",
            Format::Html => "html",
            Format::Csv => "csv",
            Format::Md => "md",
            Format::Pdf => "pdf",
            Format::Doc => "doc",
            Format::Docx => "docx",
            Format::Xls => "xls",
            Format::Xlsx => "xlsx",
            Format::Jpg => "jpg",
            Format::Png => "png",
            Format::Gif => "gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Txt => "text/plain",
            Format::Html => "text/html",
            Format::Csv => "text/csv",
            Format::Md => "text/markdown",
            Format::Pdf => "application/pdf",
            Format::Doc => "application/msword",
            Format::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Format::Xls => "application/vnd.ms-excel",
            Format::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Format::Jpg => "image/jpeg",
            Format::Png => "image/png",
            Format::Gif => "image/gif",
        }
    }

    /// Parse an extension case-insensitively. `jpeg` is accepted as `jpg`.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "txt" => Some(Format::Txt),
            "html" => Some(Format::Html),
            "csv" => Some(Format::Csv),
            "md" => Some(Format::Md),
            "pdf" => Some(Format::Pdf),
            "doc" => Some(Format::Doc),
            "docx" => Some(Format::Docx),
            "xls" => Some(Format::Xls),
            "xlsx" => Some(Format::Xlsx),
            "jpg" | "jpeg" => Some(Format::Jpg),
            "png" => Some(Format::Png),
            "gif" => Some(Format::Gif),
            _ => None,
        }
    }

    /// Infer the format from a file name's trailing extension.
    pub fn from_file_name(name: &str) -> Option<Format> {
        Format::from_extension(&extension_of(name))
    }

    pub fn is_image(self) -> bool {
        matches!(self, Format::Jpg | Format::Png | Format::Gif)
    }
}

/// The lower-cased text after the last `.` of a file name, or `""`.
pub fn extension_of(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::from_extension(s).ok_or_else(|| ParseFormatError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(Format::from_file_name("Report.PDF"), Some(Format::Pdf));
        assert_eq!(Format::from_file_name("photo.JpEg"), Some(Format::Jpg));
        assert_eq!(Format::from_file_name("archive.tar.csv"), Some(Format::Csv));
    }

    #[test]
    fn names_without_known_extension() {
        assert_eq!(Format::from_file_name("README"), None);
        assert_eq!(Format::from_file_name("movie.mp4"), None);
        assert_eq!(Format::from_file_name("dir.d/README"), None);
        assert_eq!(extension_of("dir.d/README"), "");
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for f in Format::ALL {
            assert_eq!(f.to_string().parse::<Format>(), Ok(f));
        }
        assert!("bmp".parse::<Format>().is_err());
    }

    #[test]
    fn image_formats() {
        let images: Vec<_> = Format::ALL.into_iter().filter(|f| f.is_image()).collect();
        assert_eq!(images, vec![Format::Jpg, Format::Png, Format::Gif]);
    }
}
