use serde::Serialize;

/// Read-only view of a Google Doc as returned by the Docs API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub document_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
    #[serde(skip)]
    pub body: Vec<StructuralBlock>,
    /// End index of the body, including the mandatory trailing newline.
    /// 1 when the body has no content.
    pub end_index: i64,
}

/// Body element, reduced to what text extraction needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralBlock {
    /// Text runs of one paragraph, in order
    Paragraph(Vec<String>),
    /// Rows of cells, each cell holding its own blocks
    Table(Vec<Vec<Vec<StructuralBlock>>>),
    TableOfContents(Vec<StructuralBlock>),
    /// Section breaks and anything else without text
    Other,
}

/// Drive file metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

/// Gmail message in one of the `full`, `metadata` or `raw` formats
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMessage {
    pub id: String,
    pub thread_id: String,
    pub label_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,
    /// Decoded RFC 822 message (`raw` format only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub mime_type: String,
    pub headers: Vec<MessageHeader>,
    /// Decoded body data, kept for `text/*` parts only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_snapshot_serialization_skips_body() {
        let snapshot = DocumentSnapshot {
            document_id: "doc1".to_string(),
            title: "Notes".to_string(),
            revision_id: None,
            body: vec![StructuralBlock::Paragraph(vec!["hi\n".to_string()])],
            end_index: 4,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"documentId": "doc1", "title": "Notes", "endIndex": 4})
        );
    }

    #[test]
    fn test_drive_file_serialization() {
        let file = DriveFile {
            id: "f1".to_string(),
            name: "Plan".to_string(),
            mime_type: "application/pdf".to_string(),
            web_view_link: Some("https://example.com/f1".to_string()),
        };

        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains("\"mimeType\":\"application/pdf\""));
        assert!(json.contains("\"webViewLink\""));
    }
}
