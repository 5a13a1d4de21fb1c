use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateCharacter,
}

#[derive(Debug, Clone)]
pub struct RosterError {
    pub code: RosterErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for RosterError {}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterDef {
    pub id: String,
    pub label: String,
    pub transform_frames: u32,
    /// Falls back to the playback default when absent.
    pub frame_rate: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterRoster {
    characters: Vec<CharacterDef>,
}

impl CharacterRoster {
    pub fn from_defs(characters: Vec<CharacterDef>) -> Self {
        Self { characters }
    }

    pub fn builtin() -> Self {
        Self::from_defs(vec![
            CharacterDef {
                id: "jett".to_string(),
                label: "Jett".to_string(),
                transform_frames: 465,
                frame_rate: None,
            },
            CharacterDef {
                id: "donnie".to_string(),
                label: "Donnie".to_string(),
                transform_frames: 289,
                frame_rate: None,
            },
        ])
    }

    pub fn get(&self, id: &str) -> Option<&CharacterDef> {
        self.characters.iter().find(|def| def.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.characters.iter().map(|def| def.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

pub fn load_roster(path: &Path) -> Result<CharacterRoster, RosterError> {
    let raw = fs::read_to_string(path).map_err(|source| RosterError {
        code: RosterErrorCode::ReadFile,
        message: format!("failed to read roster file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    })?;
    parse_roster(path, &raw)
}

pub fn parse_roster(file_path: &Path, raw: &str) -> Result<CharacterRoster, RosterError> {
    let doc = Document::parse(raw).map_err(|error| RosterError {
        code: RosterErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let source = XmlSource {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Characters" {
        return Err(source.error_at(
            RosterErrorCode::InvalidRoot,
            "root element must be <Characters>".to_string(),
            root,
        ));
    }

    let mut seen_ids = HashSet::<String>::new();
    let mut characters = Vec::<CharacterDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "Character" {
            return Err(source.error_at(
                RosterErrorCode::UnknownElement,
                format!(
                    "unsupported element <{}>; expected <Character>",
                    child.tag_name().name()
                ),
                child,
            ));
        }
        let def = parse_character(&source, child)?;
        if !seen_ids.insert(def.id.clone()) {
            return Err(source.error_at(
                RosterErrorCode::DuplicateCharacter,
                format!("duplicate character id '{}'", def.id),
                child,
            ));
        }
        characters.push(def);
    }

    Ok(CharacterRoster::from_defs(characters))
}

struct XmlSource<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl XmlSource<'_, '_> {
    fn error_at(&self, code: RosterErrorCode, message: String, node: Node<'_, '_>) -> RosterError {
        let pos = self.doc.text_pos_at(node.range().start);
        RosterError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_text(&self, node: Node<'_, '_>, field_name: &str) -> Result<String, RosterError> {
        let value = node.text().map(str::trim).unwrap_or_default().to_string();
        if value.is_empty() {
            return Err(self.error_at(
                RosterErrorCode::MissingField,
                format!("field <{field_name}> must not be empty"),
                node,
            ));
        }
        Ok(value)
    }
}

fn parse_character(source: &XmlSource<'_, '_>, node: Node<'_, '_>) -> Result<CharacterDef, RosterError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut id: Option<String> = None;
    let mut label: Option<String> = None;
    let mut transform_frames: Option<u32> = None;
    let mut frame_rate: Option<f32> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(source.error_at(
                RosterErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in <Character>"),
                field,
            ));
        }

        match field_name.as_str() {
            "id" => id = Some(source.required_text(field, "id")?),
            "label" => label = Some(source.required_text(field, "label")?),
            "transformFrames" => {
                let value = source.required_text(field, "transformFrames")?;
                let parsed = value.parse::<u32>().map_err(|_| {
                    source.error_at(
                        RosterErrorCode::InvalidValue,
                        format!("transformFrames '{value}' is not a valid frame count"),
                        field,
                    )
                })?;
                transform_frames = Some(parsed);
            }
            "frameRate" => {
                let value = source.required_text(field, "frameRate")?;
                let parsed = value.parse::<f32>().map_err(|_| {
                    source.error_at(
                        RosterErrorCode::InvalidValue,
                        format!("frameRate '{value}' is not a valid number"),
                        field,
                    )
                })?;
                if !parsed.is_finite() || parsed <= 0.0 {
                    return Err(source.error_at(
                        RosterErrorCode::InvalidValue,
                        "frameRate must be finite and > 0".to_string(),
                        field,
                    ));
                }
                frame_rate = Some(parsed);
            }
            _ => {
                return Err(source.error_at(
                    RosterErrorCode::UnknownField,
                    format!("unknown field <{field_name}> in <Character>"),
                    field,
                ))
            }
        }
    }

    let missing = |name: &str| {
        source.error_at(
            RosterErrorCode::MissingField,
            format!("missing required field <{name}> in <Character>"),
            node,
        )
    };
    Ok(CharacterDef {
        id: id.ok_or_else(|| missing("id"))?,
        label: label.ok_or_else(|| missing("label"))?,
        transform_frames: transform_frames.ok_or_else(|| missing("transformFrames"))?,
        frame_rate,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn parse(raw: &str) -> Result<CharacterRoster, RosterError> {
        parse_roster(Path::new("characters.xml"), raw)
    }

    #[test]
    fn parses_characters_in_file_order() {
        let roster = parse(
            r#"<Characters>
                <Character><id>jett</id><label>Jett</label><transformFrames>465</transformFrames></Character>
                <Character><id>donnie</id><label>Donnie</label><transformFrames>289</transformFrames><frameRate>24</frameRate></Character>
            </Characters>"#,
        )
        .expect("parse");

        assert_eq!(roster.ids().collect::<Vec<_>>(), vec!["jett", "donnie"]);
        assert_eq!(roster.get("jett").expect("jett").transform_frames, 465);
        assert_eq!(roster.get("donnie").expect("donnie").frame_rate, Some(24.0));
    }

    #[test]
    fn missing_frame_count_reports_location() {
        let err = parse(r#"<Characters><Character><id>jett</id><label>Jett</label></Character></Characters>"#)
            .expect_err("err");
        assert_eq!(err.code, RosterErrorCode::MissingField);
        assert!(err.message.contains("transformFrames"));
        assert_eq!(err.location.map(|loc| loc.line), Some(1));
    }

    #[test]
    fn unknown_field_errors() {
        let err = parse(
            r#"<Characters><Character><id>a</id><label>A</label><transformFrames>3</transformFrames><mood>x</mood></Character></Characters>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, RosterErrorCode::UnknownField);
    }

    #[test]
    fn negative_frame_count_is_invalid() {
        let err = parse(
            r#"<Characters><Character><id>a</id><label>A</label><transformFrames>-3</transformFrames></Character></Characters>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, RosterErrorCode::InvalidValue);
    }

    #[test]
    fn duplicate_ids_error() {
        let err = parse(
            r#"<Characters>
                <Character><id>a</id><label>A</label><transformFrames>3</transformFrames></Character>
                <Character><id>a</id><label>B</label><transformFrames>4</transformFrames></Character>
            </Characters>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, RosterErrorCode::DuplicateCharacter);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse(r#"<Characters><Character><id>a</id></Characters>"#).expect_err("err");
        assert_eq!(err.code, RosterErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn loads_roster_from_disk() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("characters.xml");
        fs::write(
            &path,
            r#"<Characters><Character><id>paul</id><label>Paul</label><transformFrames>12</transformFrames></Character></Characters>"#,
        )
        .expect("write");

        let roster = load_roster(&path).expect("load");
        assert_eq!(roster.len(), 1);
        assert!(roster.contains("paul"));

        let missing = load_roster(&temp.path().join("nope.xml")).expect_err("missing");
        assert_eq!(missing.code, RosterErrorCode::ReadFile);
    }
}
