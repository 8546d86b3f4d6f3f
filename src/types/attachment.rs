//! Attachment model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Recognized attachment content types.
///
/// Anything else is sent as [`FileContentType::OctetStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileContentType {
    // Documents
    /// `application/pdf`
    #[serde(rename = "application/pdf")]
    Pdf,
    /// `text/plain`
    #[serde(rename = "text/plain")]
    Txt,
    /// `application/msword`
    #[serde(rename = "application/msword")]
    Doc,
    /// Word (OOXML) document.
    #[serde(rename = "application/vnd.openxmlformats-officedocument.wordprocessingml.document")]
    Docx,
    /// Excel (OOXML) workbook.
    #[serde(rename = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")]
    Xlsx,
    /// PowerPoint (OOXML) presentation.
    #[serde(rename = "application/vnd.openxmlformats-officedocument.presentationml.presentation")]
    Pptx,

    // Images
    /// `image/png`
    #[serde(rename = "image/png")]
    Png,
    /// `image/jpeg`
    #[serde(rename = "image/jpeg")]
    Jpeg,
    /// `image/gif`
    #[serde(rename = "image/gif")]
    Gif,
    /// `image/svg+xml`
    #[serde(rename = "image/svg+xml")]
    Svg,

    // Archives
    /// `application/zip`
    #[serde(rename = "application/zip")]
    Zip,
    /// `application/vnd.rar`
    #[serde(rename = "application/vnd.rar")]
    Rar,
    /// `application/x-7z-compressed`
    #[serde(rename = "application/x-7z-compressed")]
    SevenZip,

    // Data
    /// `application/json`
    #[serde(rename = "application/json")]
    Json,
    /// `text/csv`
    #[serde(rename = "text/csv")]
    Csv,

    // Media
    /// `audio/mpeg`
    #[serde(rename = "audio/mpeg")]
    Mp3,
    /// `video/mp4`
    #[serde(rename = "video/mp4")]
    Mp4,

    /// `application/octet-stream`
    #[serde(rename = "application/octet-stream")]
    OctetStream,
}

impl FileContentType {
    /// Every recognized type, in declaration order.
    pub const ALL: [FileContentType; 18] = [
        FileContentType::Pdf,
        FileContentType::Txt,
        FileContentType::Doc,
        FileContentType::Docx,
        FileContentType::Xlsx,
        FileContentType::Pptx,
        FileContentType::Png,
        FileContentType::Jpeg,
        FileContentType::Gif,
        FileContentType::Svg,
        FileContentType::Zip,
        FileContentType::Rar,
        FileContentType::SevenZip,
        FileContentType::Json,
        FileContentType::Csv,
        FileContentType::Mp3,
        FileContentType::Mp4,
        FileContentType::OctetStream,
    ];

    /// The MIME type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileContentType::Pdf => "application/pdf",
            FileContentType::Txt => "text/plain",
            FileContentType::Doc => "application/msword",
            FileContentType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileContentType::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            FileContentType::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            FileContentType::Png => "image/png",
            FileContentType::Jpeg => "image/jpeg",
            FileContentType::Gif => "image/gif",
            FileContentType::Svg => "image/svg+xml",
            FileContentType::Zip => "application/zip",
            FileContentType::Rar => "application/vnd.rar",
            FileContentType::SevenZip => "application/x-7z-compressed",
            FileContentType::Json => "application/json",
            FileContentType::Csv => "text/csv",
            FileContentType::Mp3 => "audio/mpeg",
            FileContentType::Mp4 => "video/mp4",
            FileContentType::OctetStream => "application/octet-stream",
        }
    }

    /// Map a MIME type to its tag; unrecognized types fall back to
    /// [`FileContentType::OctetStream`].
    pub fn from_mime(mime: &mime::Mime) -> Self {
        let essence = mime.essence_str();
        match essence {
            // Registries disagree on the RAR type.
            "application/x-rar-compressed" => FileContentType::Rar,
            _ => Self::ALL
                .iter()
                .copied()
                .find(|t| t.as_str() == essence)
                .unwrap_or(FileContentType::OctetStream),
        }
    }

    /// Infer the type from a filename extension.
    pub fn from_filename(filename: &str) -> Self {
        // mime_guess has no entry for 7z.
        let is_7z = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("7z"));
        if is_7z {
            return FileContentType::SevenZip;
        }

        mime_guess::from_path(filename)
            .iter()
            .map(|m| Self::from_mime(&m))
            .find(|t| *t != FileContentType::OctetStream)
            .unwrap_or(FileContentType::OctetStream)
    }
}

impl Default for FileContentType {
    fn default() -> Self {
        FileContentType::OctetStream
    }
}

impl fmt::Display for FileContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileContentType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<mime::Mime>()
            .map(|m| Self::from_mime(&m))
            .unwrap_or(FileContentType::OctetStream))
    }
}

/// A named, typed attachment supplied with one send.
#[derive(Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    /// Filename shown to the recipient.
    pub filename: String,
    /// Content type tag.
    pub content_type: FileContentType,
    /// Raw bytes.
    pub data: Vec<u8>,
}

impl EmailAttachment {
    /// Create an attachment with an explicit type.
    pub fn new(
        filename: impl Into<String>,
        content_type: FileContentType,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            data: data.into(),
        }
    }

    /// Create an attachment whose type is inferred from the extension.
    ///
    /// ```
    /// use integrations_aws_ses_router::types::{EmailAttachment, FileContentType};
    ///
    /// let report = EmailAttachment::from_filename("report.pdf", b"%PDF-1.7".to_vec());
    /// assert_eq!(report.content_type, FileContentType::Pdf);
    ///
    /// let blob = EmailAttachment::from_filename("dump.bin", vec![0u8; 4]);
    /// assert_eq!(blob.content_type, FileContentType::OctetStream);
    /// ```
    pub fn from_filename(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let filename = filename.into();
        let content_type = FileContentType::from_filename(&filename);
        Self {
            filename,
            content_type,
            data: data.into(),
        }
    }

    /// Size of the content in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the content is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for EmailAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailAttachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}
