// Comment extraction from SourceCodeInfo
//
// Indexes location comments by their numeric descriptor path so the
// descriptor walk can pick up the docs of the element it is visiting.

use std::collections::HashMap;

use prost_types::FileDescriptorProto;

/// `FileDescriptorProto.message_type`
pub const FILE_MESSAGE_TYPE: i32 = 4;
/// `DescriptorProto.field`
pub const MESSAGE_FIELD: i32 = 2;
/// `DescriptorProto.nested_type`
pub const MESSAGE_NESTED_TYPE: i32 = 3;

#[derive(Debug, Default)]
pub struct CommentIndex {
    comments: HashMap<Vec<i32>, String>,
}

impl CommentIndex {
    pub fn from_file(file: &FileDescriptorProto) -> Self {
        let mut comments = HashMap::new();

        let Some(source_code_info) = file.source_code_info.as_ref() else {
            return Self { comments };
        };

        for location in &source_code_info.location {
            // Prefer leading, fall back to trailing
            let comment = location
                .leading_comments
                .as_deref()
                .or(location.trailing_comments.as_deref());

            let Some(comment) = comment else {
                continue;
            };

            let trimmed = trim_comment(comment);
            if !trimmed.is_empty() && !location.path.is_empty() {
                comments.insert(location.path.clone(), trimmed);
            }
        }

        Self { comments }
    }

    pub fn get(&self, path: &[i32]) -> Option<String> {
        self.comments.get(path).cloned()
    }
}

/// Trim and clean up a comment string.
fn trim_comment(comment: &str) -> String {
    // Remove leading/trailing whitespace from each line and rejoin
    comment
        .lines()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::SourceCodeInfo;
    use prost_types::source_code_info::Location;

    fn location(path: Vec<i32>, leading: Option<&str>, trailing: Option<&str>) -> Location {
        Location {
            path,
            leading_comments: leading.map(str::to_string),
            trailing_comments: trailing.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn indexes_leading_then_trailing_comments() {
        let file = FileDescriptorProto {
            source_code_info: Some(SourceCodeInfo {
                location: vec![
                    location(vec![4, 0], Some("  A person.\n   Really.  \n"), None),
                    location(vec![4, 0, 2, 1], None, Some(" trailing ")),
                    location(vec![4, 1], Some("   \n"), None),
                    location(vec![], Some("file level"), None),
                ],
                ..Default::default()
            }),
            ..Default::default()
        };

        let index = CommentIndex::from_file(&file);
        assert_eq!(index.get(&[4, 0]).as_deref(), Some("A person.\nReally."));
        assert_eq!(index.get(&[4, 0, 2, 1]).as_deref(), Some("trailing"));
        assert_eq!(index.get(&[4, 1]), None);
        assert_eq!(index.get(&[]), None);
    }

    #[test]
    fn missing_source_info_yields_empty_index() {
        let index = CommentIndex::from_file(&FileDescriptorProto::default());
        assert_eq!(index.get(&[4, 0]), None);
    }
}
